use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::foundation::core::Rgba;
use crate::foundation::error::MapflowResult;
use crate::geo::crs::Crs;
use crate::geo::envelope::Envelope;
use crate::graph::content::{Content, Request};
use crate::graph::pad::PadSpec;
use crate::nodes::RASTER_PAD;
use crate::raster::buffer::Raster;
use crate::raster::decode::decode_raster_file;
use crate::render::context::RenderContext;
use crate::render::reproject::resample;

/// Parameters of a `raster_file` node.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterFileParams {
    /// Image file to decode (PNG, JPEG or WebP).
    pub path: PathBuf,
    /// Georeferenced extent of the image as `[left, right, top, bottom]`.
    pub bounds: [f64; 4],
    /// CRS of `bounds`.
    pub crs: Crs,
    /// Color table for single-band images; index `i` maps to `palette[i]`.
    #[serde(default)]
    pub palette: Option<Vec<Rgba>>,
    /// Force bilinear (`true`) or nearest (`false`) resampling.
    #[serde(default)]
    pub interpolate: Option<bool>,
}

/// Leaf source serving one georeferenced image.
///
/// The file is decoded on first pull and kept for the node's lifetime; a failed decode is
/// remembered and every later pull yields nothing.
#[derive(Debug)]
pub struct RasterFileNode {
    path: PathBuf,
    envelope: Envelope,
    palette: Option<Arc<[Rgba]>>,
    interpolate: Option<bool>,
    raster: OnceLock<Option<Arc<Raster>>>,
    outputs: Vec<PadSpec>,
}

impl RasterFileNode {
    /// Validate `params`; the file itself is not touched yet.
    pub fn new(params: RasterFileParams) -> MapflowResult<Self> {
        let [left, right, top, bottom] = params.bounds;
        let envelope = Envelope::new(left, right, top, bottom, params.crs)?;
        Ok(Self {
            path: params.path,
            envelope,
            palette: params.palette.map(Arc::from),
            interpolate: params.interpolate,
            raster: OnceLock::new(),
            outputs: vec![PadSpec::raster(RASTER_PAD)],
        })
    }

    pub(crate) fn outputs(&self) -> &[PadSpec] {
        &self.outputs
    }

    fn raster(&self) -> Option<&Arc<Raster>> {
        self.raster
            .get_or_init(|| {
                match decode_raster_file(&self.path, self.envelope.clone(), self.palette.clone()) {
                    Ok(r) => {
                        let r = match self.interpolate {
                            Some(flag) => r.with_interpolation(flag),
                            None => r,
                        };
                        tracing::debug!(path = %self.path.display(), size = %r.size(), "raster file decoded");
                        Some(Arc::new(r))
                    }
                    Err(e) => {
                        tracing::warn!(path = %self.path.display(), error = %e, "raster file unreadable");
                        None
                    }
                }
            })
            .as_ref()
    }

    pub(crate) fn pull(&self, ctx: &RenderContext, req: &Request) -> MapflowResult<Content> {
        let Some(raster) = self.raster() else {
            return Ok(Content::None);
        };
        Ok(resample(raster, &req.envelope, req.size, ctx.transformer()))
    }
}
