use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::camera::Player;
use crate::caster::cast;
use crate::grid::{Grid, TextureId};
use crate::texture::{Gradient, PixelFormat, Rgb, Texture};

/// Tunable projection constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    /// Wall height on screen at depth 1, as a fraction of screen height.
    pub projection_scale: f64,
    /// Depth past which walls are fully fogged.
    pub fog_distance: f64,
    /// Fog alpha added per unit of depth.
    pub fog_rate: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            projection_scale: 1.3,
            fog_distance: 15.0,
            fog_rate: 15.0,
        }
    }
}

/// Placement of one textured wall strip on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStrip {
    pub x: usize,
    pub texture: TextureId,
    pub u: f64,
    /// Screen row of the strip's top edge; may be negative.
    pub top: f64,
    pub height: f64,
    /// Perpendicular depth of the hit.
    pub depth: f64,
    pub fog_alpha: u8,
}

/// Ray angle for `column`, relative to the view direction.
#[inline]
pub fn column_angle(column: usize, screen_width: usize, focal_length: f64) -> f64 {
    let x = column as f64 / screen_width as f64 - 0.5;
    x.atan2(focal_length)
}

#[inline]
pub fn fog_alpha(depth: f64, params: &ProjectionParams) -> u8 {
    if depth > params.fog_distance {
        255
    } else {
        (params.fog_rate * depth).clamp(0.0, 255.0) as u8
    }
}

/// Cast the ray for one screen column and place the wall strip it hits.
/// `None` leaves the background visible.
pub fn project_column(
    grid: &Grid,
    player: &Player,
    column: usize,
    screen_width: usize,
    screen_height: usize,
    params: &ProjectionParams,
) -> Option<ColumnStrip> {
    let ray_angle = column_angle(column, screen_width, player.focal_length);
    let hit = cast(grid, player.pos, player.orientation + ray_angle, None)?;

    // Project onto the view plane; raw ray length would bow walls outward.
    let z = hit.distance * ray_angle.cos();
    let h = screen_height as f64;
    let wall_height = h * params.projection_scale / z;
    if !(wall_height > 0.0 && wall_height.is_finite()) {
        return None;
    }

    Some(ColumnStrip {
        x: column,
        texture: hit.texture,
        u: hit.u,
        top: (h / 2.0) * (1.0 + 1.0 / z) - wall_height,
        height: wall_height,
        depth: z,
        fog_alpha: fog_alpha(z, params),
    })
}

/// Project every column. Columns are independent and are cast in parallel.
pub fn project_frame(
    grid: &Grid,
    player: &Player,
    screen_width: usize,
    screen_height: usize,
    params: &ProjectionParams,
) -> Vec<Option<ColumnStrip>> {
    (0..screen_width)
        .into_par_iter()
        .map(|x| project_column(grid, player, x, screen_width, screen_height, params))
        .collect()
}

/// Compositing target for a frame.
pub trait Framebuffer {
    fn size(&self) -> (usize, usize);

    /// Paint the ceiling over the top half and the floor over the bottom half.
    fn fill_background(&mut self, ceiling: &Gradient, floor: &Gradient);

    /// Draw `strip` sampled from `texture`, then the fog overlay on top of it.
    fn blit_column(&mut self, texture: &Texture, strip: &ColumnStrip);
}

/// Endpoint colours for the ceiling and floor gradients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackdropColors {
    pub ceiling_top: Rgb,
    pub ceiling_bottom: Rgb,
    pub floor_top: Rgb,
    pub floor_bottom: Rgb,
}

impl Default for BackdropColors {
    fn default() -> Self {
        Self {
            ceiling_top: Rgb(0, 0, 120),
            ceiling_bottom: Rgb(30, 0, 20),
            floor_top: Rgb(20, 20, 20),
            floor_bottom: Rgb(40, 40, 40),
        }
    }
}

/// Precomputed ceiling and floor surfaces for one framebuffer height.
#[derive(Debug, Clone, PartialEq)]
pub struct Backdrop {
    pub ceiling: Gradient,
    pub floor: Gradient,
}

impl Backdrop {
    pub fn new(screen_height: usize, colors: &BackdropColors, format: PixelFormat) -> Self {
        let ceiling_h = screen_height / 2;
        let floor_h = screen_height - ceiling_h;
        Self {
            ceiling: Gradient::vertical(ceiling_h, colors.ceiling_top, colors.ceiling_bottom, format),
            floor: Gradient::vertical(floor_h, colors.floor_top, colors.floor_bottom, format),
        }
    }
}

/// Background first, then every wall strip on top.
pub fn render_frame<F: Framebuffer>(
    fb: &mut F,
    grid: &Grid,
    player: &Player,
    backdrop: &Backdrop,
    params: &ProjectionParams,
) {
    let (width, height) = fb.size();
    fb.fill_background(&backdrop.ceiling, &backdrop.floor);

    let strips = project_frame(grid, player, width, height, params);
    for strip in strips.iter().flatten() {
        fb.blit_column(grid.texture(strip.texture), strip);
    }
}

/// Row-major CPU framebuffer.
pub struct PixelBuffer {
    pub pixels: Vec<u32>,
    width: usize,
    height: usize,
    format: PixelFormat,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        Self {
            pixels: vec![0; width * height],
            width,
            height,
            format,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[cfg(test)]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }
}

impl Framebuffer for PixelBuffer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn fill_background(&mut self, ceiling: &Gradient, floor: &Gradient) {
        let mid = self.height / 2;
        for y in 0..self.height {
            let color = if y < mid {
                ceiling.row(y)
            } else {
                floor.row(y - mid)
            };
            let row = y * self.width;
            self.pixels[row..row + self.width].fill(color);
        }
    }

    fn blit_column(&mut self, texture: &Texture, strip: &ColumnStrip) {
        if strip.x >= self.width || !(strip.height > 0.0) {
            return;
        }

        let y0 = strip.top.floor().max(0.0);
        let y1 = (strip.top + strip.height).ceil().min(self.height as f64);
        if y1 <= y0 {
            return;
        }

        let tx = texture.column_for(strip.u);
        let th = texture.height();
        for y in (y0 as usize)..(y1 as usize) {
            // sample at the pixel centre
            let v = ((y as f64 + 0.5) - strip.top) / strip.height;
            if !(0.0..1.0).contains(&v) {
                continue;
            }
            let ty = ((v * th as f64) as usize).min(th - 1);
            let px = self.format.darken(texture.texel(tx, ty), strip.fog_alpha);
            self.pixels[y * self.width + strip.x] = px;
        }
    }
}
