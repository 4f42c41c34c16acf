use serde::Deserialize;

use crate::foundation::core::Rgba;
use crate::graph::content::{Content, Request};
use crate::graph::pad::PadSpec;
use crate::nodes::RASTER_PAD;
use crate::raster::buffer::Raster;

/// Parameters of a `solid` node.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolidParams {
    /// Fill color, straight alpha.
    pub color: Rgba,
}

/// Fills every request with one color, in whatever CRS the request uses.
#[derive(Debug)]
pub struct SolidNode {
    color: Rgba,
    outputs: Vec<PadSpec>,
}

impl SolidNode {
    /// Node filling with `params.color`.
    pub fn new(params: SolidParams) -> Self {
        Self {
            color: params.color,
            outputs: vec![PadSpec::raster(RASTER_PAD)],
        }
    }

    pub(crate) fn outputs(&self) -> &[PadSpec] {
        &self.outputs
    }

    pub(crate) fn pull(&self, req: &Request) -> Content {
        Content::raster(Raster::solid(req.envelope.clone(), req.size, self.color))
    }
}
