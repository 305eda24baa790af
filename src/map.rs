//! Map file loading.
//!
//! ```text
//! 0                      <- format version
//! Test Dungeon           <- name
//! 5 3 2                  <- width height texture_count
//! #=textures/brick.png   <- one legend line per texture
//! %=textures/stone.png
//! #####                  <- `height` rows of `width` tiles
//! #S  %
//! #####
//! ```
//!
//! Blank lines and lines starting with `#` are skipped before the map body,
//! apart from `#=` legend entries. Inside the body only blank lines are
//! skipped, so `#` works as a tile.
//! `' '` is empty floor, `'S'` is empty floor holding the spawn point, and
//! every legend character is a wall using that texture. Rows shorter than
//! the map width are padded with empty floor.

use std::path::{Path, PathBuf};

use crate::grid::{Grid, GridError, Point, TextureId, TileKind};
use crate::texture::{PixelFormat, Texture};

pub const MAP_VERSION: &str = "0";

/// Largest grid a map file may declare.
pub const MAX_CELLS: usize = 1 << 24;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported map version {found:?}, expected \"0\"")]
    Version { found: String },
    #[error("line {line}: {reason}")]
    Header { line: usize, reason: String },
    #[error("line {line}: malformed texture legend entry {entry:?}")]
    Legend { line: usize, entry: String },
    #[error("line {line}: legend character {ch:?} is declared twice")]
    DuplicateLegend { line: usize, ch: char },
    #[error("failed to load texture {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("line {line}, column {column}: unknown tile character {ch:?}")]
    UnknownTile {
        line: usize,
        column: usize,
        ch: char,
    },
    #[error("line {line}: row has {len} tiles but the map is {width} wide")]
    RowTooLong {
        line: usize,
        len: usize,
        width: usize,
    },
    #[error("map ended while reading the {0}")]
    UnexpectedEof(&'static str),
    #[error("expected {expected} map rows, found {found}")]
    MissingRows { expected: usize, found: usize },
    #[error("map has no spawn tile 'S'")]
    MissingSpawn,
    #[error("line {line}: second spawn tile 'S'")]
    DuplicateSpawn { line: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub ch: char,
    pub path: PathBuf,
}

/// Parsed map text. Texture paths are kept as written.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFile {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub legend: Vec<LegendEntry>,
    pub cells: Vec<TileKind>,
    pub spawn: Point,
}

enum Stage {
    Version,
    Name,
    Size,
    Legend,
    Body,
}

impl MapFile {
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let mut stage = Stage::Version;
        let mut name = String::new();
        let (mut width, mut height, mut texture_count) = (0, 0, 0);
        let mut legend: Vec<LegendEntry> = Vec::new();
        let mut cells: Vec<TileKind> = Vec::new();
        let mut rows = 0;
        let mut spawn = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            if line.is_empty() {
                continue;
            }
            if is_comment(&stage, line) {
                continue;
            }

            match stage {
                Stage::Version => {
                    let found = line.trim();
                    if found != MAP_VERSION {
                        return Err(LoadError::Version {
                            found: found.to_string(),
                        });
                    }
                    stage = Stage::Name;
                }
                Stage::Name => {
                    name = line.trim().to_string();
                    stage = Stage::Size;
                }
                Stage::Size => {
                    (width, height, texture_count) = parse_size(line, line_no)?;
                    tracing::debug!(width, height, texture_count, "map header");
                    cells.reserve(width * height);
                    stage = Stage::Legend;
                }
                Stage::Legend => {
                    let entry = parse_legend(line, line_no)?;
                    if legend.iter().any(|e| e.ch == entry.ch) {
                        return Err(LoadError::DuplicateLegend {
                            line: line_no,
                            ch: entry.ch,
                        });
                    }
                    legend.push(entry);
                    if legend.len() == texture_count {
                        stage = Stage::Body;
                    }
                }
                Stage::Body => {
                    if rows == height {
                        tracing::warn!(line = line_no, "ignoring text after the last map row");
                        break;
                    }
                    let len = line.chars().count();
                    if len > width {
                        return Err(LoadError::RowTooLong {
                            line: line_no,
                            len,
                            width,
                        });
                    }
                    for (col, ch) in line.chars().enumerate() {
                        let tile = match ch {
                            ' ' => TileKind::Empty,
                            'S' => {
                                if spawn.is_some() {
                                    return Err(LoadError::DuplicateSpawn { line: line_no });
                                }
                                spawn = Some(Point::new(col as f64 + 0.5, rows as f64 + 0.5));
                                TileKind::Empty
                            }
                            _ => match legend.iter().position(|e| e.ch == ch) {
                                Some(i) => TileKind::Wall(TextureId(i)),
                                None => {
                                    return Err(LoadError::UnknownTile {
                                        line: line_no,
                                        column: col + 1,
                                        ch,
                                    });
                                }
                            },
                        };
                        cells.push(tile);
                    }
                    cells.extend(std::iter::repeat_n(TileKind::Empty, width - len));
                    rows += 1;
                }
            }
        }

        match stage {
            Stage::Version => return Err(LoadError::UnexpectedEof("version")),
            Stage::Name => return Err(LoadError::UnexpectedEof("name")),
            Stage::Size => return Err(LoadError::UnexpectedEof("size line")),
            Stage::Legend => return Err(LoadError::UnexpectedEof("texture legend")),
            Stage::Body => {}
        }
        if rows < height {
            return Err(LoadError::MissingRows {
                expected: height,
                found: rows,
            });
        }

        Ok(Self {
            name,
            width,
            height,
            legend,
            cells,
            spawn: spawn.ok_or(LoadError::MissingSpawn)?,
        })
    }
}

/// `#` lines are comments outside the body, except that `#=` inside the
/// legend declares `#` as a wall tile.
fn is_comment(stage: &Stage, line: &str) -> bool {
    match stage {
        Stage::Body => false,
        Stage::Legend => line.starts_with('#') && !line.starts_with("#="),
        _ => line.starts_with('#'),
    }
}

fn parse_size(line: &str, line_no: usize) -> Result<(usize, usize, usize), LoadError> {
    let header = |reason: String| LoadError::Header {
        line: line_no,
        reason,
    };
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [w, h, n] = fields[..] else {
        return Err(header(format!(
            "expected `width height texture_count`, got {line:?}"
        )));
    };
    let num = |label: &str, tok: &str| -> Result<usize, LoadError> {
        match tok.parse::<usize>() {
            Ok(0) => Err(header(format!("{label} must be positive"))),
            Ok(v) => Ok(v),
            Err(e) => Err(header(format!("invalid {label} {tok:?}: {e}"))),
        }
    };
    let (width, height) = (num("width", w)?, num("height", h)?);
    match width.checked_mul(height) {
        Some(cells) if cells <= MAX_CELLS => {}
        _ => {
            return Err(header(format!(
                "{width}x{height} grid exceeds the {MAX_CELLS} cell limit"
            )));
        }
    }
    Ok((width, height, num("texture count", n)?))
}

fn parse_legend(line: &str, line_no: usize) -> Result<LegendEntry, LoadError> {
    let malformed = || LoadError::Legend {
        line: line_no,
        entry: line.to_string(),
    };
    let (key, path) = line.split_once('=').ok_or_else(malformed)?;
    let mut chars = key.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return Err(malformed());
    };
    let path = path.trim();
    if ch == ' ' || ch == 'S' || path.is_empty() {
        return Err(malformed());
    }
    Ok(LegendEntry {
        ch,
        path: PathBuf::from(path),
    })
}

impl Grid {
    /// Load a map file and decode its textures into `format`. Relative
    /// texture paths resolve against the map file's directory.
    pub fn load(path: &Path, format: PixelFormat) -> Result<Grid, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = MapFile::parse(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut textures = Vec::with_capacity(map.legend.len());
        for entry in &map.legend {
            let tex_path = base.join(&entry.path);
            let img = image::open(&tex_path).map_err(|source| LoadError::Image {
                path: tex_path.clone(),
                source,
            })?;
            let img = img.to_rgba8();
            tracing::debug!(
                ch = %entry.ch,
                path = %tex_path.display(),
                w = img.width(),
                h = img.height(),
                "texture loaded"
            );
            textures.push(Texture::from_rgba(&img, format));
        }

        let grid = Grid::new(
            map.name,
            map.width,
            map.height,
            map.cells,
            textures,
            map.spawn,
        )?;
        tracing::info!(
            path = %path.display(),
            name = grid.name(),
            width = grid.width(),
            height = grid.height(),
            textures = grid.texture_count(),
            "map loaded"
        );
        Ok(grid)
    }
}
