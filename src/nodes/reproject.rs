use serde::Deserialize;

use crate::foundation::error::MapflowResult;
use crate::geo::crs::Crs;
use crate::graph::content::{Content, Request};
use crate::graph::dataflow::PullCx;
use crate::graph::pad::PadSpec;
use crate::nodes::{Node, RASTER_PAD};
use crate::render::reproject::reproject;

/// Parameters of a `reproject` node.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReprojectParams {
    /// CRS the upstream node is pulled in.
    pub source_crs: Crs,
}

/// Pulls its input in a fixed CRS and warps the result into the request's CRS.
#[derive(Debug)]
pub struct ReprojectNode {
    source_crs: Crs,
    inputs: Vec<PadSpec>,
    outputs: Vec<PadSpec>,
}

impl ReprojectNode {
    /// Node pulling upstream in `params.source_crs`.
    pub fn new(params: ReprojectParams) -> Self {
        Self {
            source_crs: params.source_crs,
            inputs: vec![PadSpec::raster("input")],
            outputs: vec![PadSpec::raster(RASTER_PAD)],
        }
    }

    pub(crate) fn inputs(&self) -> &[PadSpec] {
        &self.inputs
    }

    pub(crate) fn outputs(&self) -> &[PadSpec] {
        &self.outputs
    }

    pub(crate) fn pull(&self, cx: &PullCx<'_, Node>, req: &Request) -> MapflowResult<Content> {
        let ctx = cx.ctx();
        let src_env = match req.envelope.transform_to(
            &self.source_crs,
            ctx.tolerance_for(req),
            ctx.opts().reproject_mode,
            ctx.transformer(),
        ) {
            Ok(env) => env,
            Err(e) if e.is_recoverable() => {
                tracing::debug!(
                    from = %req.envelope.crs(),
                    to = %self.source_crs,
                    error = %e,
                    "request not representable in source crs"
                );
                return Ok(Content::None);
            }
            Err(e) => return Err(e),
        };

        match cx.input(0, &Request::new(src_env, req.size))? {
            Content::Raster(r) => Ok(reproject(&r, &req.envelope, req.size, ctx.transformer())),
            _ => Ok(Content::None),
        }
    }
}
