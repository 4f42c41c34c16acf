use std::sync::Arc;

use crate::foundation::core::{PixelSize, Point, Rgba};
use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::envelope::Envelope;

/// Meaning of the bands of a [`Raster`], declared by whoever produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum BandLayout {
    /// Premultiplied red, green, blue, alpha in `[0, 1]`.
    Rgba,
    /// Opaque red, green, blue in `[0, 1]`.
    Rgb,
    /// Opaque luminance in `[0, 1]`.
    Gray,
    /// Straight luminance plus alpha in `[0, 1]`.
    GrayAlpha,
    /// One band of integer indices into a color table.
    Palette(Arc<[Rgba]>),
}

impl BandLayout {
    /// Number of interleaved bands per pixel.
    pub fn band_count(&self) -> usize {
        match self {
            Self::Rgba => 4,
            Self::Rgb => 3,
            Self::GrayAlpha => 2,
            Self::Gray | Self::Palette(_) => 1,
        }
    }

    /// Map one pixel's bands to premultiplied RGBA.
    pub fn to_rgba(&self, bands: &[f32]) -> [f32; 4] {
        match self {
            Self::Rgba => [bands[0], bands[1], bands[2], bands[3]],
            Self::Rgb => [bands[0], bands[1], bands[2], 1.0],
            Self::Gray => [bands[0], bands[0], bands[0], 1.0],
            Self::GrayAlpha => {
                let v = bands[0] * bands[1];
                [v, v, v, bands[1]]
            }
            Self::Palette(table) => {
                let idx = bands[0].round();
                if idx < 0.0 {
                    return [0.0; 4];
                }
                table
                    .get(idx as usize)
                    .map(|c| c.premultiplied())
                    .unwrap_or([0.0; 4])
            }
        }
    }
}

/// Affine mapping between pixel and CRS coordinates for a north-up raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform {
    /// CRS x of the left edge.
    pub origin_x: f64,
    /// CRS y of the top edge.
    pub origin_y: f64,
    /// CRS units per pixel along x (positive).
    pub scale_x: f64,
    /// CRS units per pixel along y (negative: rows grow downwards).
    pub scale_y: f64,
}

impl GeoTransform {
    /// Transform fitting `size` pixels exactly over `env`.
    pub fn for_grid(env: &Envelope, size: PixelSize) -> Self {
        let (w, h) = env.size();
        Self {
            origin_x: env.left(),
            origin_y: env.top(),
            scale_x: w / f64::from(size.width),
            scale_y: -h / f64::from(size.height),
        }
    }

    /// Continuous pixel coordinates `(col, row)` of a CRS point; pixel `i` spans `[i, i + 1)`.
    pub fn pixel_of(&self, p: Point) -> (f64, f64) {
        (
            (p.x - self.origin_x) / self.scale_x,
            (p.y - self.origin_y) / self.scale_y,
        )
    }

    /// CRS coordinates of the center of pixel `(col, row)`.
    pub fn center_of(&self, col: u32, row: u32) -> Point {
        Point::new(
            self.origin_x + (f64::from(col) + 0.5) * self.scale_x,
            self.origin_y + (f64::from(row) + 0.5) * self.scale_y,
        )
    }
}

/// Immutable multi-band pixel buffer tied to an [`Envelope`].
///
/// Bands are interleaved row-major `f32`. A pixel is invalid when the optional mask says so;
/// invalid pixels convert to transparent.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    size: PixelSize,
    envelope: Envelope,
    layout: BandLayout,
    data: Vec<f32>,
    mask: Option<Vec<bool>>,
    can_interpolate: bool,
}

impl Raster {
    /// Wrap interleaved band data. `data.len()` must equal `width * height * band_count`.
    pub fn new(
        size: PixelSize,
        envelope: Envelope,
        layout: BandLayout,
        data: Vec<f32>,
    ) -> MapflowResult<Self> {
        let expected = size
            .pixel_count()
            .checked_mul(layout.band_count())
            .ok_or_else(|| MapflowError::validation("raster buffer size overflow"))?;
        if data.len() != expected {
            return Err(MapflowError::validation(format!(
                "raster data has {} values, expected {expected} for {size} with {} bands",
                data.len(),
                layout.band_count()
            )));
        }
        let can_interpolate = !matches!(layout, BandLayout::Palette(_));
        Ok(Self {
            size,
            envelope,
            layout,
            data,
            mask: None,
            can_interpolate,
        })
    }

    /// Attach a validity mask (`true` = valid), one entry per pixel.
    pub fn with_mask(mut self, mask: Vec<bool>) -> MapflowResult<Self> {
        if mask.len() != self.size.pixel_count() {
            return Err(MapflowError::validation(format!(
                "raster mask has {} entries, expected {}",
                mask.len(),
                self.size.pixel_count()
            )));
        }
        self.mask = if mask.iter().all(|&v| v) {
            None
        } else {
            Some(mask)
        };
        Ok(self)
    }

    /// Override whether resampling may blend neighbouring pixels.
    pub fn with_interpolation(mut self, can_interpolate: bool) -> Self {
        self.can_interpolate = can_interpolate;
        self
    }

    /// Single-color RGBA raster.
    pub fn solid(envelope: Envelope, size: PixelSize, color: Rgba) -> Self {
        let px = color.premultiplied();
        let mut data = Vec::with_capacity(size.pixel_count() * 4);
        for _ in 0..size.pixel_count() {
            data.extend_from_slice(&px);
        }
        Self {
            size,
            envelope,
            layout: BandLayout::Rgba,
            data,
            mask: None,
            can_interpolate: true,
        }
    }

    /// Fully transparent RGBA raster.
    pub fn transparent(envelope: Envelope, size: PixelSize) -> Self {
        Self::solid(envelope, size, Rgba::transparent())
    }

    /// Pixel dimensions.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Geographic extent.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Band semantics.
    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Interleaved band values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Validity mask, `None` when every pixel is valid.
    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    /// Whether resampling may blend neighbouring pixels.
    pub fn can_interpolate(&self) -> bool {
        self.can_interpolate
    }

    /// Pixel-to-CRS affine transform.
    pub fn geo_transform(&self) -> GeoTransform {
        GeoTransform::for_grid(&self.envelope, self.size)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.size.width as usize) + (x as usize)
    }

    /// `true` unless the mask marks `(x, y)` invalid.
    pub fn is_valid(&self, x: u32, y: u32) -> bool {
        self.mask.as_ref().is_none_or(|m| m[self.index(x, y)])
    }

    /// Band values of pixel `(x, y)`.
    pub fn bands(&self, x: u32, y: u32) -> &[f32] {
        let n = self.layout.band_count();
        let i = self.index(x, y) * n;
        &self.data[i..i + n]
    }

    /// Premultiplied RGBA of pixel `(x, y)`; invalid pixels are transparent.
    pub fn rgba_at(&self, x: u32, y: u32) -> [f32; 4] {
        if !self.is_valid(x, y) {
            return [0.0; 4];
        }
        self.layout.to_rgba(self.bands(x, y))
    }

    /// Straight-alpha color of pixel `(x, y)`.
    pub fn color_at(&self, x: u32, y: u32) -> Rgba {
        Rgba::from_premultiplied(self.rgba_at(x, y))
    }

    /// Convert to the premultiplied RGBA layout with no mask.
    pub fn to_rgba(&self) -> Raster {
        if self.layout == BandLayout::Rgba && self.mask.is_none() {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.size.pixel_count() * 4);
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                data.extend_from_slice(&self.rgba_at(x, y));
            }
        }
        Raster {
            size: self.size,
            envelope: self.envelope.clone(),
            layout: BandLayout::Rgba,
            data,
            mask: None,
            can_interpolate: self.can_interpolate,
        }
    }

    /// Shared RGBA view: reuses `self` when it already is mask-free RGBA.
    pub fn into_rgba(self: Arc<Self>) -> Arc<Raster> {
        if self.layout == BandLayout::Rgba && self.mask.is_none() {
            self
        } else {
            Arc::new(self.to_rgba())
        }
    }

    /// Straight-alpha RGBA8 bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size.pixel_count() * 4);
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                let c = self.color_at(x, y);
                out.extend([c.r, c.g, c.b, c.a].map(|v| (v * 255.0).round() as u8));
            }
        }
        out
    }
}

/// Mutable premultiplied RGBA buffer used to assemble a new [`Raster`].
#[derive(Clone, Debug)]
pub struct RgbaCanvas {
    size: PixelSize,
    data: Vec<f32>,
    written: Vec<bool>,
}

impl RgbaCanvas {
    /// Transparent canvas of `size` pixels.
    pub fn new(size: PixelSize) -> Self {
        Self {
            size,
            data: vec![0.0; size.pixel_count() * 4],
            written: vec![false; size.pixel_count()],
        }
    }

    /// Canvas dimensions.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// `true` once any pixel has been written.
    pub fn is_touched(&self) -> bool {
        self.written.iter().any(|&w| w)
    }

    /// Copy the valid pixels of `src` with its top-left corner at `(x, y)`, clipping to the
    /// canvas.
    pub fn paste(&mut self, src: &Raster, x: u32, y: u32) {
        let w = src.size().width.min(self.size.width.saturating_sub(x));
        let h = src.size().height.min(self.size.height.saturating_sub(y));
        for sy in 0..h {
            for sx in 0..w {
                if !src.is_valid(sx, sy) {
                    continue;
                }
                let di = ((y + sy) as usize) * (self.size.width as usize) + (x + sx) as usize;
                self.data[di * 4..di * 4 + 4].copy_from_slice(&src.rgba_at(sx, sy));
                self.written[di] = true;
            }
        }
    }

    /// Finish into an RGBA raster placed at `envelope`.
    pub fn finish(self, envelope: Envelope) -> Raster {
        Raster {
            size: self.size,
            envelope,
            layout: BandLayout::Rgba,
            data: self.data,
            mask: None,
            can_interpolate: true,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
