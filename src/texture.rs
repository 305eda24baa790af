use serde::Deserialize;

/// 8-bit RGB triple. Deserializes from a three-element array (`[r, g, b]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Packed 32-bit pixel layout. Each channel occupies one byte at the given
/// bit offset; bits not covered by a channel stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub r_shift: u32,
    pub g_shift: u32,
    pub b_shift: u32,
}

impl PixelFormat {
    /// `0x00RRGGBB`, what softbuffer presents.
    pub const XRGB8888: Self = Self {
        r_shift: 16,
        g_shift: 8,
        b_shift: 0,
    };

    #[inline]
    pub fn pack(&self, c: Rgb) -> u32 {
        ((c.0 as u32) << self.r_shift) | ((c.1 as u32) << self.g_shift) | ((c.2 as u32) << self.b_shift)
    }

    #[inline]
    pub fn unpack(&self, px: u32) -> Rgb {
        Rgb(
            ((px >> self.r_shift) & 0xFF) as u8,
            ((px >> self.g_shift) & 0xFF) as u8,
            ((px >> self.b_shift) & 0xFF) as u8,
        )
    }

    /// Composite a black overlay with opacity `alpha` over `px`.
    #[inline]
    pub fn darken(&self, px: u32, alpha: u8) -> u32 {
        if alpha == 0 {
            return px;
        }
        let keep = 255 - alpha as u32;
        let Rgb(r, g, b) = self.unpack(px);
        let scale = |v: u8| ((v as u32 * keep) / 255) as u8;
        self.pack(Rgb(scale(r), scale(g), scale(b)))
    }
}

/// A wall texture, decoded once and stored in the target pixel format.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    texels: Vec<u32>, // row-major
}

impl Texture {
    /// Convert a decoded RGBA image into `format`. Alpha is dropped.
    pub fn from_rgba(img: &image::RgbaImage, format: PixelFormat) -> Self {
        let texels = img
            .pixels()
            .map(|p| {
                let [r, g, b, _a] = p.0;
                format.pack(Rgb(r, g, b))
            })
            .collect();
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            texels,
        }
    }

    /// Single-colour texture. Zero dimensions are bumped to one texel.
    #[cfg(test)]
    pub fn solid(width: usize, height: usize, color: Rgb, format: PixelFormat) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            texels: vec![format.pack(color); width * height],
        }
    }

    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Texel at (`x`, `y`), clamped to the texture edges.
    #[inline]
    pub fn texel(&self, x: usize, y: usize) -> u32 {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        self.texels.get(y * self.width + x).copied().unwrap_or(0)
    }

    /// Source column for a horizontal sampling coordinate `u` in `[0, 1)`.
    #[inline]
    pub fn column_for(&self, u: f64) -> usize {
        let col = (u.clamp(0.0, 1.0) * self.width as f64) as usize;
        col.min(self.width.saturating_sub(1))
    }
}

/// One packed colour per row; constant across the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    rows: Vec<u32>,
}

impl Gradient {
    /// Row 0 is `top`, fading linearly toward `bottom` at row `height`.
    pub fn vertical(height: usize, top: Rgb, bottom: Rgb, format: PixelFormat) -> Self {
        let h = height.max(1) as f64;
        let lerp = |b: u8, t: u8, y: usize| -> u8 {
            let w = (h - y as f64) / h;
            (b as f64 + (t as f64 - b as f64) * w) as u8
        };
        let rows = (0..height.max(1))
            .map(|y| {
                format.pack(Rgb(
                    lerp(bottom.0, top.0, y),
                    lerp(bottom.1, top.1, y),
                    lerp(bottom.2, top.2, y),
                ))
            })
            .collect();
        Self { rows }
    }

    #[cfg(test)]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn row(&self, y: usize) -> u32 {
        self.rows[y.min(self.rows.len() - 1)]
    }
}
