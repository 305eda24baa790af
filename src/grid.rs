use crate::texture::Texture;

/// Continuous position in grid units. Cell `(cx, cy)` spans
/// `[cx, cx + 1) x [cy, cy + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Integer cell containing this point.
    #[inline]
    pub fn cell(self) -> (i64, i64) {
        (self.x.floor() as i64, self.y.floor() as i64)
    }
}

/// Index into a grid's texture set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Empty,
    Wall(TextureId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
    #[error("grid dimensions must be positive, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },
    #[error("{width}x{height} grid has more cells than can be addressed")]
    TooLarge { width: usize, height: usize },
    #[error("expected {expected} cells for the grid, got {found}")]
    CellCount { expected: usize, found: usize },
    #[error("cell {index} uses texture {texture} but only {available} textures are loaded")]
    TextureOutOfRange {
        index: usize,
        texture: usize,
        available: usize,
    },
}

/// Immutable tile map. Owns the wall textures its cells refer to.
#[derive(Debug, Clone)]
pub struct Grid {
    name: String,
    width: usize,
    height: usize,
    cells: Vec<TileKind>, // row-major, x + y * width
    textures: Vec<Texture>,
    spawn_position: Point,
    spawn_orientation: f64,
}

impl Grid {
    /// Build a grid, checking the cell count and that every wall references
    /// a loaded texture.
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        cells: Vec<TileKind>,
        textures: Vec<Texture>,
        spawn_position: Point,
    ) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid { width, height });
        }
        let expected = width
            .checked_mul(height)
            .ok_or(GridError::TooLarge { width, height })?;
        if cells.len() != expected {
            return Err(GridError::CellCount {
                expected,
                found: cells.len(),
            });
        }
        for (index, cell) in cells.iter().enumerate() {
            if let TileKind::Wall(TextureId(texture)) = *cell {
                if texture >= textures.len() {
                    return Err(GridError::TextureOutOfRange {
                        index,
                        texture,
                        available: textures.len(),
                    });
                }
            }
        }

        Ok(Self {
            name: name.into(),
            width,
            height,
            cells,
            textures,
            spawn_position,
            spawn_orientation: 0.0,
        })
    }

    pub fn with_spawn_orientation(mut self, angle: f64) -> Self {
        self.spawn_orientation = angle;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn spawn_position(&self) -> Point {
        self.spawn_position
    }

    pub fn spawn_orientation(&self) -> f64 {
        self.spawn_orientation
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Texture for a wall id. Ids come from this grid's cells, which were
    /// validated against the texture set on construction.
    pub fn texture(&self, id: TextureId) -> &Texture {
        &self.textures[id.0]
    }

    pub fn cell_at(&self, x: i64, y: i64) -> Result<TileKind, GridError> {
        if x < 0 || y < 0 || x as u64 >= self.width as u64 || y as u64 >= self.height as u64 {
            return Err(GridError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.cells[x as usize + y as usize * self.width])
    }

    /// Whether the cell stops movement. Anything outside the grid counts as
    /// blocking, so the world edge behaves like a wall.
    pub fn is_blocking(&self, x: i64, y: i64) -> bool {
        !matches!(self.cell_at(x, y), Ok(TileKind::Empty))
    }

    /// `is_blocking` for the cell containing `p`. Non-finite points block.
    pub fn is_blocking_at(&self, p: Point) -> bool {
        if !p.is_finite() {
            return true;
        }
        let (x, y) = p.cell();
        self.is_blocking(x, y)
    }

    /// Texture of an in-bounds wall cell; `None` for empty or out-of-range.
    #[inline]
    pub fn wall_at(&self, x: i64, y: i64) -> Option<TextureId> {
        match self.cell_at(x, y) {
            Ok(TileKind::Wall(id)) => Some(id),
            _ => None,
        }
    }
}

/// Build a grid from ASCII rows: `' '` empty, `'S'` spawn, digits are walls
/// with that texture id, anything else is a wall with texture 0. Every
/// texture is a flat 8x8 block.
#[cfg(test)]
pub(crate) fn grid_from_ascii(rows: &[&str]) -> Grid {
    use crate::texture::{PixelFormat, Rgb};

    let height = rows.len();
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut cells = Vec::with_capacity(width * height);
    let mut spawn = Point::new(0.5, 0.5);
    let mut max_texture = 0;
    for (y, row) in rows.iter().enumerate() {
        let mut chars = row.chars();
        for x in 0..width {
            let cell = match chars.next() {
                None | Some(' ') => TileKind::Empty,
                Some('S') => {
                    spawn = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    TileKind::Empty
                }
                Some(c) => {
                    let id = c.to_digit(10).unwrap_or(0) as usize;
                    max_texture = max_texture.max(id);
                    TileKind::Wall(TextureId(id))
                }
            };
            cells.push(cell);
        }
    }
    let textures = (0..=max_texture)
        .map(|i| Texture::solid(8, 8, Rgb(200, (i * 40) as u8, 50), PixelFormat::XRGB8888))
        .collect();
    Grid::new("test", width, height, cells, textures, spawn).unwrap()
}
