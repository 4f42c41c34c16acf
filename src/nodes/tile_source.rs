use std::sync::Arc;

use rayon::prelude::*;
use serde::Deserialize;

use crate::foundation::core::{PixelSize, Rgba};
use crate::foundation::error::{MapflowError, MapflowResult};
use crate::foundation::math::percentile_sorted;
use crate::geo::crs::Crs;
use crate::geo::envelope::Envelope;
use crate::graph::content::{Content, Request};
use crate::graph::pad::PadSpec;
use crate::nodes::RASTER_PAD;
use crate::raster::buffer::{Raster, RgbaCanvas};
use crate::raster::decode::decode_raster;
use crate::render::context::RenderContext;
use crate::render::reproject::{resample, warp};
use crate::tiles::pyramid::{DEFAULT_TILE_SIZE, MAX_ZOOM, TileRange, TilePyramid};

/// Fraction of the sorted per-sub-tile zooms picked as the shared zoom of a split request.
const ZOOM_PERCENTILE: f64 = 0.75;

fn default_crs() -> Crs {
    Crs::web_mercator()
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_max_zoom() -> u8 {
    MAX_ZOOM
}

fn default_max_tiles() -> usize {
    64
}

/// Parameters of a `tile_pyramid` node.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TilePyramidParams {
    /// URL template using `{zoom}`, `{x}`, `{y}` and/or `{quadkey}`.
    pub url: String,
    /// Native CRS of the pyramid.
    #[serde(default = "default_crs")]
    pub crs: Crs,
    /// World extent `[left, right, top, bottom]`; required unless `crs` is web Mercator.
    #[serde(default)]
    pub world: Option<[f64; 4]>,
    /// Tile edge in pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Coarsest zoom served.
    #[serde(default)]
    pub min_zoom: u8,
    /// Finest zoom served.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    /// Tiles one region may fetch before it is given up as too expensive.
    #[serde(default = "default_max_tiles")]
    pub max_tiles: usize,
    /// Color table for single-band tiles.
    #[serde(default)]
    pub palette: Option<Vec<Rgba>>,
}

/// Serves arbitrary requests from a web-map tile pyramid.
///
/// Requests up to one tile in size are served from a single zoom level. Larger requests are cut
/// into tile-sized sub-requests that share one zoom and are rendered concurrently on the fetch
/// pool. Tiles that are outside the pyramid, fail to fetch, or fail to decode stay transparent.
#[derive(Debug)]
pub struct TilePyramidNode {
    url: String,
    pyramid: TilePyramid,
    tile_px: PixelSize,
    max_tiles: usize,
    palette: Option<Arc<[Rgba]>>,
    outputs: Vec<PadSpec>,
}

struct SubRequest {
    x: u32,
    y: u32,
    req: Request,
}

impl TilePyramidNode {
    /// Validate `params` and build the pyramid description.
    pub fn new(params: TilePyramidParams) -> MapflowResult<Self> {
        let world = match params.world {
            Some([left, right, top, bottom]) => Envelope::new(left, right, top, bottom, params.crs)?,
            None if params.crs == Crs::web_mercator() => Envelope::web_mercator_world(),
            None => {
                return Err(MapflowError::validation(format!(
                    "tile pyramid in {} needs explicit world bounds",
                    params.crs
                )));
            }
        };
        let pyramid = TilePyramid::new(world, params.tile_size, params.min_zoom, params.max_zoom)?;
        if params.max_tiles == 0 {
            return Err(MapflowError::validation("max_tiles must be >= 1"));
        }
        Ok(Self {
            url: params.url,
            tile_px: PixelSize::new(params.tile_size, params.tile_size)?,
            pyramid,
            max_tiles: params.max_tiles,
            palette: params.palette.map(Arc::from),
            outputs: vec![PadSpec::raster(RASTER_PAD)],
        })
    }

    /// Pyramid geometry.
    pub fn pyramid(&self) -> &TilePyramid {
        &self.pyramid
    }

    pub(crate) fn outputs(&self) -> &[PadSpec] {
        &self.outputs
    }

    #[tracing::instrument(skip(self, ctx, req), fields(url = %self.url, size = %req.size))]
    pub(crate) fn pull(&self, ctx: &RenderContext, req: &Request) -> MapflowResult<Content> {
        let ts = self.pyramid.tile_size();
        if req.size.width <= ts && req.size.height <= ts {
            self.render_region(ctx, req, None)
        } else {
            self.render_split(ctx, req)
        }
    }

    /// Request envelope in the pyramid CRS, `None` when it cannot be reprojected.
    fn pyramid_envelope(&self, ctx: &RenderContext, req: &Request) -> MapflowResult<Option<Envelope>> {
        match req.envelope.transform_to(
            self.pyramid.crs(),
            ctx.tolerance_for(req),
            ctx.opts().reproject_mode,
            ctx.transformer(),
        ) {
            Ok(env) => Ok(Some(env)),
            Err(e) if e.is_recoverable() => {
                tracing::debug!(error = %e, "request not representable in pyramid crs");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn render_split(&self, ctx: &RenderContext, req: &Request) -> MapflowResult<Content> {
        let subs = split_request(req, self.pyramid.tile_size())?;

        let mut zooms = Vec::with_capacity(subs.len());
        for sub in &subs {
            if let Some(env) = self.pyramid_envelope(ctx, &sub.req)? {
                zooms.push(self.pyramid.select_zoom(&env, sub.req.size));
            }
        }
        zooms.sort_unstable();
        let Some(zoom) = percentile_sorted(&zooms, ZOOM_PERCENTILE) else {
            return Ok(Content::None);
        };
        tracing::debug!(zoom, sub_requests = subs.len(), "shared zoom for split request");

        let parts = ctx.fetch_pool().install(|| {
            subs.par_iter()
                .map(|sub| {
                    self.render_region(ctx, &sub.req, Some(zoom))
                        .map(|content| (sub.x, sub.y, content))
                })
                .collect::<Vec<_>>()
        });

        let mut canvas = RgbaCanvas::new(req.size);
        for part in parts {
            let (x, y, content) = part?;
            if let Some(raster) = content.as_raster() {
                canvas.paste(raster, x, y);
            }
        }
        if !canvas.is_touched() {
            return Ok(Content::None);
        }
        Ok(Content::raster(canvas.finish(req.envelope.clone())))
    }

    /// Serve `req` from one zoom level: stitch the covering tiles in the pyramid CRS, then warp
    /// the mosaic into the request grid.
    fn render_region(
        &self,
        ctx: &RenderContext,
        req: &Request,
        zoom: Option<u8>,
    ) -> MapflowResult<Content> {
        let Some(env) = self.pyramid_envelope(ctx, req)? else {
            return Ok(Content::None);
        };
        let zoom = zoom.unwrap_or_else(|| self.pyramid.select_zoom(&env, req.size));
        let Some(range) = self.pyramid.tile_range(&env, zoom) else {
            tracing::debug!(zoom, "request lies outside the pyramid rows");
            return Ok(Content::None);
        };
        let count = range.columns().saturating_mul(range.rows());
        if count > self.max_tiles as u64 {
            tracing::warn!(zoom, count, max = self.max_tiles, "too many tiles for one region, skipping");
            return Ok(Content::None);
        }
        tracing::debug!(zoom, x0 = range.x0, x1 = range.x1, y0 = range.y0, y1 = range.y1, "tile range");

        let Some(mosaic) = self.mosaic(ctx, &range)? else {
            return Ok(Content::None);
        };
        Ok(resample(&mosaic, &req.envelope, req.size, ctx.transformer()))
    }

    fn mosaic(&self, ctx: &RenderContext, range: &TileRange) -> MapflowResult<Option<Raster>> {
        let ts = self.pyramid.tile_size();
        let size = PixelSize::new(range.columns() as u32 * ts, range.rows() as u32 * ts)?;
        let slots: Vec<(i64, i64)> = (range.y0..=range.y1)
            .flat_map(|y| (range.x0..=range.x1).map(move |x| (x, y)))
            .collect();

        let tiles = ctx.fetch_pool().install(|| {
            slots
                .par_iter()
                .map(|&(x, y)| self.load_tile(ctx, range.zoom, x, y).map(|t| (x, y, t)))
                .collect::<Vec<_>>()
        });

        let mut canvas = RgbaCanvas::new(size);
        let mut interpolate = true;
        for (x, y, tile) in tiles.into_iter().flatten() {
            let px = (x - range.x0) as u32 * ts;
            let py = (y - range.y0) as u32 * ts;
            interpolate &= tile.can_interpolate();
            canvas.paste(&tile, px, py);
        }
        if !canvas.is_touched() {
            return Ok(None);
        }
        // The mosaic is RGBA, but categorical tiles must still be sampled nearest.
        let mosaic = canvas.finish(self.pyramid.range_envelope(range)?);
        Ok(Some(mosaic.with_interpolation(interpolate)))
    }

    /// Fetch and decode one tile at its unwrapped slot; any failure leaves the slot empty.
    fn load_tile(&self, ctx: &RenderContext, zoom: u8, x: i64, y: i64) -> Option<Raster> {
        let Some(coord) = self.pyramid.resolve(zoom, x, y) else {
            tracing::debug!(zoom, x, y, "tile row outside pyramid");
            return None;
        };
        let url = coord.url(&self.url);
        let bytes = match ctx.fetcher().fetch(&url) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%url, error = %e, "tile fetch failed");
                return None;
            }
        };
        let loaded = self.pyramid.tile_envelope(zoom, x, y).and_then(|env| {
            let tile = decode_raster(&bytes, env.clone(), self.palette.clone())?;
            if tile.size() == self.tile_px {
                Ok(tile)
            } else {
                warp(&tile, &env, self.tile_px, ctx.transformer())
            }
        });
        match loaded {
            Ok(tile) => Some(tile),
            Err(e) => {
                tracing::warn!(%url, error = %e, "tile decode failed");
                None
            }
        }
    }
}

/// Cut `req` into a grid of sub-requests at most `tile` pixels on a side.
fn split_request(req: &Request, tile: u32) -> MapflowResult<Vec<SubRequest>> {
    let PixelSize { width, height } = req.size;
    let (w, h) = (f64::from(width), f64::from(height));
    let mut subs = Vec::new();
    for y0 in (0..height).step_by(tile as usize) {
        let y1 = (y0 + tile).min(height);
        for x0 in (0..width).step_by(tile as usize) {
            let x1 = (x0 + tile).min(width);
            let env = req.envelope.sub_envelope(
                f64::from(x0) / w,
                f64::from(x1) / w,
                f64::from(y0) / h,
                f64::from(y1) / h,
            )?;
            subs.push(SubRequest {
                x: x0,
                y: y0,
                req: Request::new(env, PixelSize::new(x1 - x0, y1 - y0)?),
            });
        }
    }
    Ok(subs)
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/tile_source.rs"]
mod tests;
