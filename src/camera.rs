use std::f64::consts::TAU;

use crate::grid::{Grid, Point};

/// Per-session movement constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTuning {
    /// Milliseconds needed to cover one grid unit.
    pub speed: f64,
    /// Normalizer applied to `turn_rate`; larger turns slower.
    pub rotation_speed: f64,
    /// Angular velocity magnitude for a held turn, before normalization.
    pub turn_rate: f64,
    pub focal_min: f64,
    pub focal_max: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            speed: 100.0,
            rotation_speed: 1000.0,
            turn_rate: TAU,
            focal_min: 0.1,
            focal_max: 4.0,
        }
    }
}

/// What the input layer asks for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlIntent {
    /// -1 backward, 0 still, 1 forward. Other values are reduced to their sign.
    pub forward: i8,
    /// -1 counter-clockwise, 0 none, 1 clockwise.
    pub turn: i8,
    pub focal_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub pos: Point,
    /// Radians, kept in `[0, 2π)`.
    pub orientation: f64,
    pub focal_length: f64,
    pub motion: MotionTuning,
}

impl Player {
    /// Place a player on the grid's spawn pose.
    pub fn spawn(grid: &Grid, motion: MotionTuning, focal_length: f64) -> Self {
        Self {
            pos: grid.spawn_position(),
            orientation: wrap_angle(grid.spawn_orientation()),
            focal_length: focal_length.clamp(motion.focal_min, motion.focal_max),
            motion,
        }
    }

    /// Unit view direction.
    #[inline]
    pub fn direction(&self) -> (f64, f64) {
        (self.orientation.cos(), self.orientation.sin())
    }
}

/// Wrap an angle into `[0, 2π)`. Non-finite input maps to 0.
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Advance the player by `dt_ms` milliseconds of `intent`.
///
/// The turn is applied first and movement follows the new heading. A blocked
/// move slides along whichever single axis is still free: the full move is
/// tried, then x only, then y only, otherwise the player stays put. Every
/// accepted position has been checked against the grid, so a player that
/// starts on an empty cell never ends up inside a wall.
pub fn advance(player: Player, grid: &Grid, dt_ms: f64, intent: ControlIntent) -> Player {
    let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
    let motion = player.motion;
    let mut next = player;

    let turn = intent.turn.signum() as f64;
    next.orientation =
        wrap_angle(player.orientation + dt * turn * motion.turn_rate / motion.rotation_speed);

    let forward = intent.forward.signum() as f64;
    if forward != 0.0 && dt > 0.0 {
        let (cos, sin) = next.direction();
        let step = dt * forward / motion.speed;
        let candidate = Point::new(player.pos.x + step * cos, player.pos.y + step * sin);

        next.pos = if !grid.is_blocking_at(candidate) {
            candidate
        } else if !grid.is_blocking_at(Point::new(candidate.x, player.pos.y)) {
            Point::new(candidate.x, player.pos.y)
        } else if !grid.is_blocking_at(Point::new(player.pos.x, candidate.y)) {
            Point::new(player.pos.x, candidate.y)
        } else {
            player.pos
        };
    }

    if intent.focal_delta.is_finite() {
        next.focal_length =
            (player.focal_length + intent.focal_delta).clamp(motion.focal_min, motion.focal_max);
    }

    tracing::trace!(
        x = next.pos.x,
        y = next.pos.y,
        rot = next.orientation,
        focal = next.focal_length,
        "player advanced"
    );
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::grid_from_ascii;
    use std::f64::consts::{FRAC_PI_4, PI};

    fn room() -> Grid {
        grid_from_ascii(&["###", "#S#", "###"])
    }

    fn at(grid: &Grid, x: f64, y: f64, orientation: f64) -> Player {
        let mut p = Player::spawn(grid, MotionTuning::default(), 1.0);
        p.pos = Point::new(x, y);
        p.orientation = orientation;
        p
    }

    const FORWARD: ControlIntent = ControlIntent {
        forward: 1,
        turn: 0,
        focal_delta: 0.0,
    };

    #[test]
    fn spawn_uses_grid_pose() {
        let grid = room().with_spawn_orientation(-PI / 2.0);
        let p = Player::spawn(&grid, MotionTuning::default(), 1.0);
        assert_eq!(p.pos, Point::new(1.5, 1.5));
        assert!((p.orientation - 1.5 * PI).abs() < 1e-12);
        assert_eq!(p.focal_length, 1.0);
    }

    #[test]
    fn free_move_covers_dt_over_speed() {
        let grid = grid_from_ascii(&["#####", "#S  #", "#####"]);
        let p = advance(at(&grid, 1.5, 1.5, 0.0), &grid, 50.0, FORWARD);
        assert!((p.pos.x - 2.0).abs() < 1e-12);
        assert!((p.pos.y - 1.5).abs() < 1e-12);
    }

    #[test]
    fn backward_moves_against_heading() {
        let grid = grid_from_ascii(&["#####", "#  S#", "#####"]);
        let intent = ControlIntent {
            forward: -1,
            ..ControlIntent::default()
        };
        let p = advance(at(&grid, 3.5, 1.5, 0.0), &grid, 100.0, intent);
        assert!((p.pos.x - 2.5).abs() < 1e-12);
    }

    #[test]
    fn large_step_into_wall_stays_inside_room() {
        let grid = room();
        let p = advance(at(&grid, 1.5, 1.5, 0.0), &grid, 10_000.0, FORWARD);
        assert!(p.pos.x >= 1.5 && p.pos.x < 2.0);
        assert!(!grid.is_blocking_at(p.pos));
    }

    #[test]
    fn blocked_diagonal_slides_along_free_axis() {
        let grid = grid_from_ascii(&["#####", "#   #", "#   #", "#   #", "#####"]);
        let p = advance(at(&grid, 3.5, 1.5, FRAC_PI_4), &grid, 100.0, FORWARD);
        // x is blocked by the east wall, y is free.
        assert_eq!(p.pos.x, 3.5);
        assert!((p.pos.y - (1.5 + FRAC_PI_4.sin())).abs() < 1e-12);
    }

    #[test]
    fn slides_along_x_when_y_is_blocked() {
        let grid = grid_from_ascii(&["#####", "#   #", "#####"]);
        let p = advance(at(&grid, 1.5, 1.5, FRAC_PI_4), &grid, 100.0, FORWARD);
        assert_eq!(p.pos.y, 1.5);
        assert!((p.pos.x - (1.5 + FRAC_PI_4.cos())).abs() < 1e-12);
    }

    #[test]
    fn repeated_steps_never_enter_walls() {
        let grid = grid_from_ascii(&["######", "#    #", "#  # #", "#    #", "######"]);
        let mut p = at(&grid, 1.5, 1.5, 0.3);
        for i in 0..2_000 {
            let intent = ControlIntent {
                forward: 1,
                turn: if i % 97 < 20 { 1 } else { 0 },
                focal_delta: 0.0,
            };
            p = advance(p, &grid, 7.0 + (i % 13) as f64, intent);
            assert!(!grid.is_blocking_at(p.pos), "step {i} at {:?}", p.pos);
        }
    }

    #[test]
    fn orientation_stays_wrapped() {
        let grid = room();
        let mut p = at(&grid, 1.5, 1.5, 0.0);
        for (dt, turn) in [(1e7, 1), (3.3e6, -1), (0.0, 1), (12.5, -1), (1e12, 1)] {
            let intent = ControlIntent {
                forward: 0,
                turn,
                focal_delta: 0.0,
            };
            p = advance(p, &grid, dt, intent);
            assert!((0.0..TAU).contains(&p.orientation), "{}", p.orientation);
        }
    }

    #[test]
    fn turn_rate_matches_normalizer() {
        let grid = room();
        let intent = ControlIntent {
            forward: 0,
            turn: 1,
            focal_delta: 0.0,
        };
        // 2π per 1000 ms by default.
        let p = advance(at(&grid, 1.5, 1.5, 0.0), &grid, 250.0, intent);
        assert!((p.orientation - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn wrap_angle_edges() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert_eq!(wrap_angle(TAU), 0.0);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-12);
        assert!(wrap_angle(-1e-20) < TAU);
        assert_eq!(wrap_angle(f64::NAN), 0.0);
    }

    #[test]
    fn zero_and_invalid_dt_do_nothing() {
        let grid = room();
        let start = at(&grid, 1.5, 1.5, 1.0);
        assert_eq!(advance(start, &grid, 0.0, FORWARD).pos, start.pos);
        assert_eq!(advance(start, &grid, -5.0, FORWARD).pos, start.pos);
        assert_eq!(advance(start, &grid, f64::NAN, FORWARD).pos, start.pos);
    }

    #[test]
    fn focal_length_is_clamped() {
        let grid = room();
        let mut p = at(&grid, 1.5, 1.5, 0.0);
        let widen = ControlIntent {
            focal_delta: 100.0,
            ..ControlIntent::default()
        };
        p = advance(p, &grid, 1.0, widen);
        assert_eq!(p.focal_length, p.motion.focal_max);
        let narrow = ControlIntent {
            focal_delta: -100.0,
            ..ControlIntent::default()
        };
        p = advance(p, &grid, 1.0, narrow);
        assert_eq!(p.focal_length, p.motion.focal_min);
    }
}
