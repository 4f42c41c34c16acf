use crate::foundation::core::PixelSize;
use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::crs::Crs;
use crate::geo::envelope::Envelope;

/// Edge length of a pyramid tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;
/// Deepest zoom level a pyramid may declare.
pub const MAX_ZOOM: u8 = 18;

/// Slack used when snapping continuous tile coordinates to indices.
const INDEX_EPSILON: f64 = 1e-9;

/// One addressable tile: zoom level plus wrapped column and in-range row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level.
    pub zoom: u8,
    /// Column in `[0, 2^zoom)`.
    pub x: u32,
    /// Row in `[0, 2^zoom)`, 0 at the top of the world.
    pub y: u32,
}

impl TileCoord {
    /// Base-4 address interleaving the row and column bits, coarsest level first.
    /// Zoom 0 has the empty quadkey.
    pub fn quadkey(&self) -> String {
        let mut key = String::with_capacity(usize::from(self.zoom));
        for level in (1..=self.zoom).rev() {
            let mask = 1u32 << (level - 1);
            let mut digit = b'0';
            if self.x & mask != 0 {
                digit += 1;
            }
            if self.y & mask != 0 {
                digit += 2;
            }
            key.push(char::from(digit));
        }
        key
    }

    /// Substitute `{zoom}`, `{x}`, `{y}` and `{quadkey}` in `template`.
    pub fn url(&self, template: &str) -> String {
        let mut url = template
            .replace("{zoom}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string());
        if url.contains("{quadkey}") {
            url = url.replace("{quadkey}", &self.quadkey());
        }
        url
    }
}

/// Inclusive range of unwrapped tile indices at one zoom level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRange {
    /// Zoom level.
    pub zoom: u8,
    /// First column, may be negative or beyond the world (wrapped on resolve).
    pub x0: i64,
    /// Last column.
    pub x1: i64,
    /// First row.
    pub y0: i64,
    /// Last row.
    pub y1: i64,
}

impl TileRange {
    /// Columns covered.
    pub fn columns(&self) -> u64 {
        (self.x1 - self.x0 + 1) as u64
    }

    /// Rows covered.
    pub fn rows(&self) -> u64 {
        (self.y1 - self.y0 + 1) as u64
    }
}

/// Fixed hierarchy of square tiles over a world envelope; level `z` has `2^z x 2^z` tiles.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePyramid {
    world: Envelope,
    tile_size: u32,
    min_zoom: u8,
    max_zoom: u8,
}

impl TilePyramid {
    /// Pyramid over `world` with levels `min_zoom..=max_zoom`.
    pub fn new(world: Envelope, tile_size: u32, min_zoom: u8, max_zoom: u8) -> MapflowResult<Self> {
        if tile_size == 0 {
            return Err(MapflowError::validation("tile_size must be > 0"));
        }
        if min_zoom > max_zoom || max_zoom > MAX_ZOOM {
            return Err(MapflowError::validation(format!(
                "zoom range {min_zoom}..={max_zoom} must be ordered and within 0..={MAX_ZOOM}"
            )));
        }
        Ok(Self {
            world,
            tile_size,
            min_zoom,
            max_zoom,
        })
    }

    /// Standard web-Mercator pyramid (EPSG:3857, 256 px tiles, zoom 0..=18).
    pub fn web_mercator() -> Self {
        Self {
            world: Envelope::web_mercator_world(),
            tile_size: DEFAULT_TILE_SIZE,
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
        }
    }

    /// World envelope (also fixes the pyramid's CRS).
    pub fn world(&self) -> &Envelope {
        &self.world
    }

    /// Native CRS.
    pub fn crs(&self) -> &Crs {
        self.world.crs()
    }

    /// Coarsest level.
    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    /// Finest level.
    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Tile edge in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Tiles per axis at `zoom`.
    pub fn tiles_per_axis(zoom: u8) -> u32 {
        1u32 << zoom
    }

    /// Tile extent `(width, height)` in CRS units at `zoom`.
    pub fn tile_span(&self, zoom: u8) -> (f64, f64) {
        let n = f64::from(Self::tiles_per_axis(zoom));
        let (w, h) = self.world.size();
        (w / n, h / n)
    }

    /// Continuous zoom at which one pyramid pixel matches one request pixel, the finer of the
    /// two axes. `env` must already be in the pyramid CRS.
    pub fn continuous_zoom(&self, env: &Envelope, size: PixelSize) -> f64 {
        let (world_w, world_h) = self.world.size();
        let (env_w, env_h) = env.size();
        let ts = f64::from(self.tile_size);
        let ideal_w = env_w / f64::from(size.width) * ts;
        let ideal_h = env_h / f64::from(size.height) * ts;
        (world_w / ideal_w).log2().max((world_h / ideal_h).log2())
    }

    /// Integer zoom nearest to `z` (floor on ties), clamped to the pyramid's levels.
    pub fn snap_zoom(&self, z: f64) -> u8 {
        if z.is_nan() {
            return self.min_zoom;
        }
        let lo = z.floor();
        let hi = z.ceil();
        let picked = if (hi - z).abs() < (z - lo).abs() {
            hi
        } else {
            lo
        };
        picked.clamp(f64::from(self.min_zoom), f64::from(self.max_zoom)) as u8
    }

    /// Zoom level for a request covering `env` (pyramid CRS) with `size` pixels.
    pub fn select_zoom(&self, env: &Envelope, size: PixelSize) -> u8 {
        self.snap_zoom(self.continuous_zoom(env, size))
    }

    /// Tiles at `zoom` intersecting `env` (pyramid CRS). Columns are left unwrapped; rows are
    /// clipped to the world and `None` is returned when no row remains.
    pub fn tile_range(&self, env: &Envelope, zoom: u8) -> Option<TileRange> {
        let (span_x, span_y) = self.tile_span(zoom);
        let n = i64::from(Self::tiles_per_axis(zoom));

        let fx0 = (env.left() - self.world.left()) / span_x;
        let fx1 = (env.right() - self.world.left()) / span_x;
        let fy0 = (self.world.top() - env.top()) / span_y;
        let fy1 = (self.world.top() - env.bottom()) / span_y;

        let x0 = (fx0 + INDEX_EPSILON).floor() as i64;
        let x1 = ((fx1 - INDEX_EPSILON).ceil() as i64 - 1).max(x0);
        let y0 = ((fy0 + INDEX_EPSILON).floor() as i64).max(0);
        let y1 = ((fy1 - INDEX_EPSILON).ceil() as i64 - 1).min(n - 1);
        (y0 <= y1).then_some(TileRange {
            zoom,
            x0,
            x1,
            y0,
            y1,
        })
    }

    /// Wrap an unwrapped tile address; rows outside the world yield `None`.
    pub fn resolve(&self, zoom: u8, x: i64, y: i64) -> Option<TileCoord> {
        let n = i64::from(Self::tiles_per_axis(zoom));
        if !(0..n).contains(&y) {
            return None;
        }
        Some(TileCoord {
            zoom,
            x: x.rem_euclid(n) as u32,
            y: y as u32,
        })
    }

    /// Envelope of the unwrapped tile `(x, y)` at `zoom`.
    pub fn tile_envelope(&self, zoom: u8, x: i64, y: i64) -> MapflowResult<Envelope> {
        let (span_x, span_y) = self.tile_span(zoom);
        let left = self.world.left() + x as f64 * span_x;
        let top = self.world.top() - y as f64 * span_y;
        Envelope::new(left, left + span_x, top, top - span_y, self.crs().clone())
    }

    /// Envelope covered by a whole [`TileRange`].
    pub fn range_envelope(&self, range: &TileRange) -> MapflowResult<Envelope> {
        let (span_x, span_y) = self.tile_span(range.zoom);
        let left = self.world.left() + range.x0 as f64 * span_x;
        let right = self.world.left() + (range.x1 + 1) as f64 * span_x;
        let top = self.world.top() - range.y0 as f64 * span_y;
        let bottom = self.world.top() - (range.y1 + 1) as f64 * span_y;
        Envelope::new(left, right, top, bottom, self.crs().clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tiles/pyramid.rs"]
mod tests;
