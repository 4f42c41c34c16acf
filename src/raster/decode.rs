use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use crate::foundation::core::{PixelSize, Rgba};
use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::envelope::Envelope;
use crate::raster::buffer::{BandLayout, Raster};

/// Decode encoded image bytes into a raster placed at `envelope`.
///
/// Single-band images become [`BandLayout::Palette`] rasters holding raw indices when `palette`
/// is given; every other image keeps its natural band layout with values scaled to `[0, 1]`.
pub fn decode_raster(
    bytes: &[u8],
    envelope: Envelope,
    palette: Option<Arc<[Rgba]>>,
) -> MapflowResult<Raster> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| MapflowError::decode(format!("decode image from memory: {e}")))?;
    image_to_raster(img, envelope, palette)
}

/// Decode an image file from disk into a raster placed at `envelope`.
pub fn decode_raster_file(
    path: &Path,
    envelope: Envelope,
    palette: Option<Arc<[Rgba]>>,
) -> MapflowResult<Raster> {
    let img = image::open(path)
        .map_err(|e| MapflowError::decode(format!("decode '{}': {e}", path.display())))?;
    image_to_raster(img, envelope, palette)
}

fn image_to_raster(
    img: DynamicImage,
    envelope: Envelope,
    palette: Option<Arc<[Rgba]>>,
) -> MapflowResult<Raster> {
    let size = PixelSize::new(img.width(), img.height())?;
    let has_alpha = img.color().has_alpha();
    let channels = img.color().channel_count();

    let (layout, data) = match (channels, has_alpha, palette) {
        (1, _, Some(table)) => {
            let data: Vec<f32> = img.to_luma8().into_raw().into_iter().map(f32::from).collect();
            (BandLayout::Palette(table), data)
        }
        (1, _, None) => (BandLayout::Gray, normalize(img.to_luma8().into_raw())),
        (2, _, _) => (
            BandLayout::GrayAlpha,
            normalize(img.to_luma_alpha8().into_raw()),
        ),
        (_, false, _) => (BandLayout::Rgb, normalize(img.to_rgb8().into_raw())),
        (_, true, _) => {
            let mut data = normalize(img.to_rgba8().into_raw());
            premultiply_in_place(&mut data);
            (BandLayout::Rgba, data)
        }
    };

    Raster::new(size, envelope, layout, data)
}

fn normalize(raw: Vec<u8>) -> Vec<f32> {
    raw.into_iter().map(|v| f32::from(v) / 255.0).collect()
}

fn premultiply_in_place(rgba: &mut [f32]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3];
        px[0] *= a;
        px[1] *= a;
        px[2] *= a;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/decode.rs"]
mod tests;
