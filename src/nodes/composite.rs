use serde::Deserialize;

use crate::foundation::error::{MapflowError, MapflowResult};
use crate::graph::content::{Content, Request};
use crate::graph::dataflow::PullCx;
use crate::graph::pad::PadSpec;
use crate::nodes::{Node, RASTER_PAD};
use crate::render::composite::{Layer, composite};

fn default_layers() -> usize {
    2
}

fn default_opacity() -> f32 {
    1.0
}

/// Parameters of a `composite` node.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeParams {
    /// Number of `layerN` inputs, bottom-most is `layer0`.
    #[serde(default = "default_layers")]
    pub layers: usize,
}

/// Parameters of an `over` node.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverParams {
    /// Multiplier applied to the `top` input's alpha.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

/// Blends `layer0..layerN` bottom to top.
#[derive(Debug)]
pub struct CompositeNode {
    inputs: Vec<PadSpec>,
    outputs: Vec<PadSpec>,
}

impl CompositeNode {
    /// Node with `params.layers` inputs.
    pub fn new(params: CompositeParams) -> MapflowResult<Self> {
        if params.layers == 0 {
            return Err(MapflowError::validation("composite needs at least one layer"));
        }
        Ok(Self {
            inputs: (0..params.layers)
                .map(|i| PadSpec::raster(format!("layer{i}")))
                .collect(),
            outputs: vec![PadSpec::raster(RASTER_PAD)],
        })
    }

    pub(crate) fn inputs(&self) -> &[PadSpec] {
        &self.inputs
    }

    pub(crate) fn outputs(&self) -> &[PadSpec] {
        &self.outputs
    }

    pub(crate) fn pull(&self, cx: &PullCx<'_, Node>, req: &Request) -> MapflowResult<Content> {
        let layers = (0..self.inputs.len())
            .map(|i| cx.input(i, req).map(Layer::new))
            .collect::<MapflowResult<Vec<_>>>()?;
        composite(&layers, req, cx.ctx().transformer())
    }
}

/// Blends `top` over `bottom` with an opacity multiplier on `top`.
#[derive(Debug)]
pub struct OverNode {
    opacity: f32,
    inputs: Vec<PadSpec>,
    outputs: Vec<PadSpec>,
}

impl OverNode {
    /// Node blending with `params.opacity`, which must lie in `[0, 1]`.
    pub fn new(params: OverParams) -> MapflowResult<Self> {
        if !(0.0..=1.0).contains(&params.opacity) {
            return Err(MapflowError::validation(format!(
                "over opacity must be within [0, 1], got {}",
                params.opacity
            )));
        }
        Ok(Self {
            opacity: params.opacity,
            inputs: vec![PadSpec::raster("bottom"), PadSpec::raster("top")],
            outputs: vec![PadSpec::raster(RASTER_PAD)],
        })
    }

    pub(crate) fn inputs(&self) -> &[PadSpec] {
        &self.inputs
    }

    pub(crate) fn outputs(&self) -> &[PadSpec] {
        &self.outputs
    }

    pub(crate) fn pull(&self, cx: &PullCx<'_, Node>, req: &Request) -> MapflowResult<Content> {
        let layers = [
            Layer::new(cx.input(0, req)?),
            Layer {
                content: cx.input(1, req)?,
                opacity: self.opacity,
            },
        ];
        composite(&layers, req, cx.ctx().transformer())
    }
}
