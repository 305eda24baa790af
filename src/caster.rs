//! Grid-line ray traversal.
//!
//! A ray is advanced from one grid-line crossing to the next, so only the
//! lines it actually crosses are visited. After every crossing the two cells
//! sharing that line are tested; the first wall found ends the cast.

use crate::grid::{Grid, Point, TextureId};

/// Nudge used when the ray sits exactly on a grid line, so that line is not
/// found again as the next crossing.
const BOUNDARY_EPSILON: f64 = 0.001;

/// Largest `f64` strictly below 1.0.
const BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

/// Family of grid lines a ray crossed to reach its hit point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// A vertical line `x = n`.
    X,
    /// A horizontal line `y = n`.
    Y,
}

/// Nearest wall face struck by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Euclidean distance from the ray origin to `point`.
    pub distance: f64,
    pub texture: TextureId,
    /// Horizontal sampling coordinate along the struck face, in `[0, 1)`.
    pub u: f64,
    /// Where the ray met the face. Kept for diagnostics; the projector only
    /// needs `distance`, `texture` and `u`.
    pub point: Point,
    /// Which line family the face lies on. Diagnostic, like `point`.
    pub axis: Axis,
}

/// Cast a ray from `origin` at `angle` radians.
///
/// `max_range` of `None` searches until a wall is hit or the ray leaves the
/// grid. Returns `None` when the ray leaves the grid, when the nearest wall
/// lies farther than `max_range`, or when the inputs are not finite.
///
/// When both axes reach their next line at exactly the same distance the
/// horizontal (`y = n`) crossing is taken.
pub fn cast(grid: &Grid, origin: Point, angle: f64, max_range: Option<f64>) -> Option<RayHit> {
    if !origin.is_finite() || !angle.is_finite() {
        return None;
    }
    let (sin_a, cos_a) = angle.sin_cos();
    cast_along(grid, origin, sin_a, cos_a, max_range)
}

/// Traversal for a ray with direction components `sin_a` (y) and `cos_a` (x).
fn cast_along(
    grid: &Grid,
    origin: Point,
    sin_a: f64,
    cos_a: f64,
    max_range: Option<f64>,
) -> Option<RayHit> {
    let (width, height) = (grid.width() as f64, grid.height() as f64);

    // Every interior line on each axis, plus the crossing that leaves the grid.
    let max_crossings = grid.width() + grid.height() + 1;

    let mut cur = origin;
    for _ in 0..max_crossings {
        let next_y = next_line(cur.y, sin_a > 0.0);
        let next_x = next_line(cur.x, cos_a > 0.0);

        let dist_y = line_distance(next_y - cur.y, sin_a);
        let dist_x = line_distance(next_x - cur.x, cos_a);

        let axis = if dist_x < dist_y {
            cur = Point::new(next_x, cur.y + dist_x * sin_a);
            Axis::X
        } else {
            cur = Point::new(cur.x + dist_y * cos_a, next_y);
            Axis::Y
        };

        let distance = origin.distance(cur);
        if max_range.is_some_and(|range| distance > range) {
            return None;
        }

        if let Some(texture) = wall_on_line(grid, cur, axis, sin_a, cos_a) {
            return Some(RayHit {
                distance,
                texture,
                u: face_coordinate(cur, axis, sin_a, cos_a),
                point: cur,
                axis,
            });
        }

        if cur.x < 0.0 || cur.x > width || cur.y < 0.0 || cur.y > height {
            return None;
        }
    }

    None
}

/// First grid line strictly past `coord` in the direction of travel. Only a
/// coordinate lying on a line is nudged; one that is merely close to a line
/// still finds that line, however small the gap.
#[inline]
fn next_line(coord: f64, positive: bool) -> f64 {
    if positive {
        let up = coord.ceil();
        if up > coord {
            up
        } else {
            (coord + BOUNDARY_EPSILON).ceil()
        }
    } else {
        let down = coord.floor();
        if down < coord {
            down
        } else {
            (coord - BOUNDARY_EPSILON).floor()
        }
    }
}

/// Parametric distance along the ray to travel `delta` on an axis whose
/// direction component is `component`. A zero component never reaches the line.
#[inline]
fn line_distance(delta: f64, component: f64) -> f64 {
    if component == 0.0 {
        f64::INFINITY
    } else {
        delta / component
    }
}

/// Test both cells that share the line `cur` sits on, the one ahead of the
/// ray first.
fn wall_on_line(grid: &Grid, cur: Point, axis: Axis, sin_a: f64, cos_a: f64) -> Option<TextureId> {
    match axis {
        Axis::X => {
            let line = cur.x as i64;
            let row = cur.y.floor() as i64;
            let (ahead, behind) = if cos_a > 0.0 {
                (line, line - 1)
            } else {
                (line - 1, line)
            };
            grid.wall_at(ahead, row).or_else(|| grid.wall_at(behind, row))
        }
        Axis::Y => {
            let line = cur.y as i64;
            let col = cur.x.floor() as i64;
            let (ahead, behind) = if sin_a > 0.0 {
                (line, line - 1)
            } else {
                (line - 1, line)
            };
            grid.wall_at(col, ahead).or_else(|| grid.wall_at(col, behind))
        }
    }
}

/// Fractional position of the hit along the struck face.
///
/// Mirrored per travel direction so every face reads the same way from the
/// viewer's side. For `x = n` faces the mirror applies when travelling toward
/// +x; for `y = n` faces it applies when travelling toward -y.
#[inline]
fn face_coordinate(cur: Point, axis: Axis, sin_a: f64, cos_a: f64) -> f64 {
    let (coord, mirrored) = match axis {
        Axis::X => (cur.y, cos_a > 0.0),
        Axis::Y => (cur.x, sin_a < 0.0),
    };
    let u = if mirrored {
        coord.ceil() - coord
    } else {
        coord - coord.floor()
    };
    u.clamp(0.0, BELOW_ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::grid_from_ascii;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    const TOL: f64 = 1e-9;

    fn room() -> Grid {
        grid_from_ascii(&["###", "#S#", "###"])
    }

    #[test]
    fn center_of_room_hits_east_wall_face_center() {
        let grid = room();
        let hit = cast(&grid, Point::new(1.5, 1.5), 0.0, None).expect("hit");
        assert!((hit.distance - 0.5).abs() < TOL);
        assert!((hit.u - 0.5).abs() < TOL);
        assert_eq!(hit.axis, Axis::X);
        assert_eq!(hit.texture, TextureId(0));
        assert_eq!(hit.point, Point::new(2.0, 1.5));
    }

    #[test]
    fn short_range_misses() {
        let grid = room();
        assert_eq!(cast(&grid, Point::new(1.5, 1.5), 0.0, Some(0.3)), None);
    }

    #[test]
    fn range_equal_to_wall_distance_still_hits() {
        let grid = room();
        let hit = cast(&grid, Point::new(1.5, 1.5), 0.0, Some(0.5));
        assert!(hit.is_some());
    }

    #[test]
    fn axis_aligned_rays_terminate_with_finite_distance() {
        let grid = room();
        for angle in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2] {
            let hit = cast(&grid, Point::new(1.5, 1.5), angle, None).expect("hit");
            assert!(hit.distance.is_finite(), "angle {angle}");
            assert!((hit.distance - 0.5).abs() < 1e-6, "angle {angle}");
            assert!((0.0..1.0).contains(&hit.u), "angle {angle}");
        }
    }

    #[test]
    fn axis_aligned_rays_in_open_grid_leave_without_hit() {
        let grid = grid_from_ascii(&["    ", "    ", "    "]);
        for angle in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2] {
            assert_eq!(cast(&grid, Point::new(1.5, 1.5), angle, None), None);
        }
    }

    #[test]
    fn single_wall_hit_from_the_west() {
        let grid = grid_from_ascii(&["     ", "     ", "   # ", "     ", "     "]);
        let hit = cast(&grid, Point::new(0.5, 2.5), 0.0, None).expect("hit");
        assert!((hit.distance - 2.5).abs() < TOL);
        assert_eq!(hit.axis, Axis::X);
    }

    #[test]
    fn single_wall_hit_from_the_north() {
        let grid = grid_from_ascii(&["     ", "     ", "   # ", "     ", "     "]);
        let hit = cast(&grid, Point::new(3.5, 0.5), FRAC_PI_2, None).expect("hit");
        assert!((hit.distance - 1.5).abs() < TOL);
        assert_eq!(hit.axis, Axis::Y);
    }

    #[test]
    fn single_wall_hit_on_a_diagonal() {
        let grid = grid_from_ascii(&["     ", "     ", "   # ", "     ", "     "]);
        let origin = Point::new(0.5, 0.5);
        // Toward the wall centre (3.5, 2.5); enters through the x = 3 face.
        let angle = (2.0f64).atan2(3.0);
        let hit = cast(&grid, origin, angle, None).expect("hit");
        let expected = (5.0 / 6.0) * 13.0f64.sqrt();
        assert!((hit.distance - expected).abs() < 1e-9);
        assert_eq!(hit.axis, Axis::X);
        assert!((hit.point.x - 3.0).abs() < TOL);
    }

    #[test]
    fn far_wall_beyond_range_is_no_hit() {
        let grid = grid_from_ascii(&["     ", "     ", "   # ", "     ", "     "]);
        let origin = Point::new(0.5, 2.5);
        assert_eq!(cast(&grid, origin, 0.0, Some(2.4)), None);
        assert!(cast(&grid, origin, 0.0, Some(2.6)).is_some());
    }

    #[test]
    fn texture_u_is_in_unit_interval_for_many_angles() {
        let grid = grid_from_ascii(&[
            "########", "#      #", "#  1   #", "#    2 #", "#      #", "########",
        ]);
        let origin = Point::new(1.7, 1.3);
        for i in 0..3600 {
            let angle = i as f64 * TAU / 3600.0;
            let hit = cast(&grid, origin, angle, None).expect("closed room always hits");
            assert!((0.0..1.0).contains(&hit.u), "angle {angle} gave u {}", hit.u);
            assert!(hit.distance.is_finite() && hit.distance >= 0.0);
        }
    }

    #[test]
    fn faces_are_mirrored_consistently() {
        let grid = room();
        let c = Point::new(1.25, 1.25);
        // Facing +x: the face coordinate runs opposite to +y.
        let east = cast(&grid, c, 0.0, None).unwrap();
        assert!((east.u - 0.75).abs() < TOL);
        // Facing -x: runs with +y.
        let west = cast(&grid, c, PI, None).unwrap();
        assert!((west.u - 0.25).abs() < 1e-6);
        // Facing +y: runs with +x.
        let south = cast(&grid, c, FRAC_PI_2, None).unwrap();
        assert!((south.u - 0.25).abs() < 1e-6);
        // Facing -y: runs opposite to +x.
        let north = cast(&grid, c, 3.0 * FRAC_PI_2, None).unwrap();
        assert!((north.u - 0.75).abs() < 1e-6);
    }

    #[test]
    fn origin_outside_grid_is_no_hit() {
        let grid = room();
        assert_eq!(cast(&grid, Point::new(-10.0, 1.5), PI, None), None);
        assert_eq!(cast(&grid, Point::new(1.5, 50.0), FRAC_PI_2, None), None);
    }

    #[test]
    fn non_finite_inputs_are_no_hit() {
        let grid = room();
        assert_eq!(cast(&grid, Point::new(1.5, 1.5), f64::NAN, None), None);
        assert_eq!(cast(&grid, Point::new(f64::NAN, 1.5), 0.0, None), None);
        assert_eq!(cast(&grid, Point::new(1.5, 1.5), f64::INFINITY, None), None);
    }

    #[test]
    fn unnormalized_angles_are_accepted() {
        let grid = room();
        let a = cast(&grid, Point::new(1.5, 1.5), 0.3, None).unwrap();
        let b = cast(&grid, Point::new(1.5, 1.5), 0.3 + 4.0 * TAU, None).unwrap();
        assert!((a.distance - b.distance).abs() < 1e-9);
    }

    #[test]
    fn origin_just_in_front_of_a_face_reports_the_gap() {
        let grid = grid_from_ascii(&["######", "#S  ##", "######"]);
        for (x, gap) in [(3.99, 0.01), (3.9995, 0.0005), (3.99999, 0.00001)] {
            let hit = cast(&grid, Point::new(x, 1.5), 0.0, None).expect("hit");
            assert!((hit.distance - gap).abs() < 1e-9, "from x={x}: {}", hit.distance);
            assert_eq!(hit.axis, Axis::X);
            assert_eq!(hit.point.x, 4.0);
        }
        // Same from the other side, travelling toward -x.
        let hit = cast(&grid, Point::new(1.0004, 1.5), PI, None).expect("hit");
        assert!((hit.distance - 0.0004).abs() < 1e-9);
    }

    #[test]
    fn crossing_close_to_a_line_still_stops_at_that_line() {
        // Crosses x = 2 at y = 1.0005, then must stop on y = 1 against (2, 0)
        // rather than skipping on to x = 3.
        let grid = grid_from_ascii(&["  #  ", " S   ", "     "]);
        let origin = Point::new(1.5, 1.5);
        let angle = (-0.4995f64).atan2(0.5);
        let hit = cast(&grid, origin, angle, None).expect("hit");
        assert_eq!(hit.axis, Axis::Y);
        assert_eq!(hit.point.y, 1.0);
        let expected = (0.5f64 / 0.4995 * 0.5).hypot(0.5);
        assert!((hit.distance - expected).abs() < 1e-9, "{}", hit.distance);
        assert!(hit.point.x > 2.0 && hit.point.x < 2.001);
    }

    #[test]
    fn exact_corner_takes_the_horizontal_line_and_checks_the_cell_behind() {
        // Through the corner (1, 1): the y = 1 crossing wins the tie. Its
        // ahead cell (1, 1) is empty, so the wall comes from behind, (1, 0).
        // The x = 1 crossing would have reported (0, 1) instead.
        let grid = grid_from_ascii(&[" 1 ", "2  ", "   "]);
        let hit = cast_along(&grid, Point::new(0.5, 0.5), 0.5, 0.5, None).expect("hit");
        assert_eq!(hit.axis, Axis::Y);
        assert_eq!(hit.texture, TextureId(1));
        assert_eq!(hit.point, Point::new(1.0, 1.0));
        assert!((hit.distance - 0.5f64.sqrt()).abs() < TOL);
    }

    #[test]
    fn wall_behind_the_crossed_line_is_found() {
        // Starting inside a wall: the first crossing's ahead cell is open.
        let grid = grid_from_ascii(&["   ", " # ", "   "]);
        let hit = cast(&grid, Point::new(1.5, 1.5), 0.0, None).expect("hit");
        assert_eq!(hit.axis, Axis::X);
        assert_eq!(hit.texture, TextureId(0));
        assert!((hit.distance - 0.5).abs() < TOL);
    }

    #[test]
    fn second_texture_is_reported() {
        let grid = grid_from_ascii(&["#####", "#S 2#", "#####"]);
        let hit = cast(&grid, grid.spawn_position(), 0.0, None).unwrap();
        assert_eq!(hit.texture, TextureId(2));
        assert!((hit.distance - 1.5).abs() < TOL);
    }
}
