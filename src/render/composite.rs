use std::sync::Arc;

use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::transform::CrsTransformer;
use crate::graph::content::{Content, Request};
use crate::raster::buffer::{BandLayout, Raster};
use crate::render::reproject::warp;

/// Premultiplied RGBA pixel.
pub type PremulRgba = [f32; 4];

/// Porter-Duff "over": `src` (scaled by `opacity`) on top of `dst`.
pub fn over(dst: PremulRgba, src: PremulRgba, opacity: f32) -> PremulRgba {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] <= 0.0 {
        return dst;
    }

    let sa = src[3] * opacity;
    let inv = 1.0 - sa;

    let mut out = [0.0f32; 4];
    out[3] = sa + dst[3] * inv;
    for i in 0..3 {
        out[i] = src[i] * opacity + dst[i] * inv;
    }
    out
}

/// Blend the RGBA buffer `src` over `dst` pixel by pixel.
pub fn over_in_place(dst: &mut [f32], src: &[f32], opacity: f32) -> MapflowResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(MapflowError::validation(
            "over_in_place expects equal-length rgba buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// One compositing layer: content plus an opacity multiplier.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Pulled content; [`Content::None`] layers are skipped.
    pub content: Content,
    /// Multiplier applied to the layer's alpha.
    pub opacity: f32,
}

impl Layer {
    /// Fully opaque layer.
    pub fn new(content: Content) -> Self {
        Self {
            content,
            opacity: 1.0,
        }
    }
}

/// Left-fold "over" across `layers`, bottom-most first, landing in `req`'s grid.
///
/// Empty layers count as fully transparent; when every layer is empty the result is
/// [`Content::None`]. Layers whose grid differs from `req` are resampled into it first.
pub fn composite(
    layers: &[Layer],
    req: &Request,
    transformer: &dyn CrsTransformer,
) -> MapflowResult<Content> {
    let mut fitted = Vec::with_capacity(layers.len());
    for layer in layers {
        let Some(raster) = layer.content.as_raster() else {
            continue;
        };
        match fit_to_request(raster, req, transformer) {
            Ok(r) => fitted.push((r, layer.opacity)),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "dropping layer that cannot be resampled");
            }
            Err(e) => return Err(e),
        }
    }

    let mut iter = fitted.into_iter();
    let Some((first, first_opacity)) = iter.next() else {
        return Ok(Content::None);
    };
    let mut rest = iter.peekable();
    if rest.peek().is_none() && first_opacity >= 1.0 {
        return Ok(Content::Raster(first));
    }

    let mut acc = vec![0.0; first.data().len()];
    over_in_place(&mut acc, first.data(), first_opacity)?;
    for (layer, opacity) in rest {
        over_in_place(&mut acc, layer.data(), opacity)?;
    }

    Ok(Content::raster(Raster::new(
        req.size,
        req.envelope.clone(),
        BandLayout::Rgba,
        acc,
    )?))
}

/// RGBA raster exactly covering `req`, resampling when needed.
fn fit_to_request(
    raster: &Arc<Raster>,
    req: &Request,
    transformer: &dyn CrsTransformer,
) -> MapflowResult<Arc<Raster>> {
    if raster.size() == req.size && raster.envelope() == &req.envelope {
        return Ok(Arc::clone(raster).into_rgba());
    }
    let warped = warp(raster, &req.envelope, req.size, transformer)?;
    Ok(Arc::new(warped.to_rgba()))
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
