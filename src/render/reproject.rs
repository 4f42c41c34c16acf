use std::sync::Arc;

use crate::foundation::core::{PixelSize, Point};
use crate::foundation::error::MapflowResult;
use crate::foundation::math::pixel_centers;
use crate::geo::envelope::Envelope;
use crate::geo::transform::CrsTransformer;
use crate::graph::content::Content;
use crate::raster::buffer::Raster;

/// Warp `src` into the grid `(dst_env, size)`.
///
/// A source already in the destination CRS is returned unchanged. Transform failures yield
/// [`Content::None`], as does a warp that leaves no valid pixel.
pub fn reproject(
    src: &Arc<Raster>,
    dst_env: &Envelope,
    size: PixelSize,
    transformer: &dyn CrsTransformer,
) -> Content {
    if src.envelope().crs() == dst_env.crs() {
        return Content::Raster(Arc::clone(src));
    }
    resample(src, dst_env, size, transformer)
}

/// Like [`warp`], but degrading failures and fully invalid results to [`Content::None`].
pub fn resample(
    src: &Raster,
    dst_env: &Envelope,
    size: PixelSize,
    transformer: &dyn CrsTransformer,
) -> Content {
    match warp(src, dst_env, size, transformer) {
        Ok(r) if r.mask().is_some_and(|m| !m.contains(&true)) => Content::None,
        Ok(r) => Content::raster(r),
        Err(e) => {
            tracing::debug!(
                from = %src.envelope().crs(),
                to = %dst_env.crs(),
                error = %e,
                "reprojection failed, nothing to draw"
            );
            Content::None
        }
    }
}

/// Resample `src` onto the pixel grid `(dst_env, size)`, transforming coordinates when the
/// CRSes differ.
///
/// Destination pixels whose source location is unprojectable, outside the source, or masked in
/// the source are marked invalid. The band layout of `src` is kept. Sampling is bilinear when
/// `src.can_interpolate()`, nearest-neighbour otherwise.
pub fn warp(
    src: &Raster,
    dst_env: &Envelope,
    size: PixelSize,
    transformer: &dyn CrsTransformer,
) -> MapflowResult<Raster> {
    let xs: Vec<f64> = pixel_centers(dst_env.left(), dst_env.right(), size.width).collect();
    let ys: Vec<f64> = pixel_centers(dst_env.top(), dst_env.bottom(), size.height).collect();
    let mut grid = Vec::with_capacity(size.pixel_count());
    for &y in &ys {
        for &x in &xs {
            grid.push(Point::new(x, y));
        }
    }

    let src_crs = src.envelope().crs();
    let mapped: Vec<Option<Point>> = if src_crs == dst_env.crs() {
        grid.into_iter().map(Some).collect()
    } else {
        transformer.transform(dst_env.crs(), src_crs, &grid)?
    };

    let gt = src.geo_transform();
    let bands = src.layout().band_count();
    let mut data = vec![0.0f32; size.pixel_count() * bands];
    let mut mask = vec![false; size.pixel_count()];
    let mut px = vec![0.0f32; bands];

    for (i, p) in mapped.iter().enumerate() {
        let Some(p) = p else {
            continue;
        };
        let (u, v) = gt.pixel_of(*p);
        let ok = if src.can_interpolate() {
            sample_bilinear(src, u, v, &mut px)
        } else {
            sample_nearest(src, u, v, &mut px)
        };
        if ok {
            data[i * bands..(i + 1) * bands].copy_from_slice(&px);
            mask[i] = true;
        }
    }

    Ok(Raster::new(size, dst_env.clone(), src.layout().clone(), data)?
        .with_mask(mask)?
        .with_interpolation(src.can_interpolate()))
}

/// Source pixel containing continuous coordinates `(u, v)`, if inside the raster.
fn containing_pixel(src: &Raster, u: f64, v: f64) -> Option<(u32, u32)> {
    let s = src.size();
    if !(u >= 0.0 && v >= 0.0 && u < f64::from(s.width) && v < f64::from(s.height)) {
        return None;
    }
    Some((u.floor() as u32, v.floor() as u32))
}

fn sample_nearest(src: &Raster, u: f64, v: f64, out: &mut [f32]) -> bool {
    match containing_pixel(src, u, v) {
        Some((x, y)) if src.is_valid(x, y) => {
            out.copy_from_slice(src.bands(x, y));
            true
        }
        _ => false,
    }
}

fn sample_bilinear(src: &Raster, u: f64, v: f64, out: &mut [f32]) -> bool {
    match containing_pixel(src, u, v) {
        Some((x, y)) if src.is_valid(x, y) => {}
        _ => return false,
    }
    let s = src.size();
    let fx = u - 0.5;
    let fy = v - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = (fx - x0) as f32;
    let ty = (fy - y0) as f32;
    let clamp_x = |x: f64| x.clamp(0.0, f64::from(s.width - 1)) as u32;
    let clamp_y = |y: f64| y.clamp(0.0, f64::from(s.height - 1)) as u32;

    let taps = [
        (clamp_x(x0), clamp_y(y0), (1.0 - tx) * (1.0 - ty)),
        (clamp_x(x0 + 1.0), clamp_y(y0), tx * (1.0 - ty)),
        (clamp_x(x0), clamp_y(y0 + 1.0), (1.0 - tx) * ty),
        (clamp_x(x0 + 1.0), clamp_y(y0 + 1.0), tx * ty),
    ];

    out.fill(0.0);
    let mut total = 0.0f32;
    for (x, y, w) in taps {
        if w <= 0.0 || !src.is_valid(x, y) {
            continue;
        }
        for (o, b) in out.iter_mut().zip(src.bands(x, y)) {
            *o += b * w;
        }
        total += w;
    }
    if total <= 0.0 {
        return false;
    }
    if (total - 1.0).abs() > f32::EPSILON {
        for o in out.iter_mut() {
            *o /= total;
        }
    }
    true
}

#[cfg(test)]
#[path = "../../tests/unit/render/reproject.rs"]
mod tests;
