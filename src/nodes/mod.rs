//! Concrete node kinds and their construction from configuration.

pub(crate) mod composite;
pub(crate) mod raster_file;
pub(crate) mod reproject;
pub(crate) mod solid;
pub(crate) mod tile_source;

use serde::Deserialize;

use crate::foundation::error::{MapflowError, MapflowResult};
use crate::graph::content::{Content, Request};
use crate::graph::dataflow::{GraphNode, PullCx};
use crate::graph::pad::PadSpec;

pub use composite::{CompositeNode, CompositeParams, OverNode, OverParams};
pub use raster_file::{RasterFileNode, RasterFileParams};
pub use reproject::{ReprojectNode, ReprojectParams};
pub use solid::{SolidNode, SolidParams};
pub use tile_source::{TilePyramidNode, TilePyramidParams};

/// Name of the single output pad every built-in node exposes.
pub const RASTER_PAD: &str = "raster";

/// Typed description of a node, resolved from a `{type, parameters}` config entry.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum NodeKind {
    /// Web-map tile pyramid source.
    TilePyramid(TilePyramidParams),
    /// Georeferenced image file.
    RasterFile(RasterFileParams),
    /// Constant color.
    Solid(SolidParams),
    /// Warp an input from a fixed source CRS.
    Reproject(ReprojectParams),
    /// Ordered "over" stack.
    Composite(CompositeParams),
    /// Two-layer "over" with opacity.
    Over(OverParams),
}

impl NodeKind {
    /// Resolve a config entry. Missing or `null` parameters count as `{}`.
    pub fn from_def(kind: &str, parameters: &serde_json::Value) -> MapflowResult<Self> {
        let parameters = match parameters {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other.clone(),
        };
        let tagged = serde_json::json!({ "type": kind, "parameters": parameters });
        serde_json::from_value(tagged).map_err(|e| MapflowError::node_construction(kind, e.to_string()))
    }

    /// Config `type` string of this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TilePyramid(_) => "tile_pyramid",
            Self::RasterFile(_) => "raster_file",
            Self::Solid(_) => "solid",
            Self::Reproject(_) => "reproject",
            Self::Composite(_) => "composite",
            Self::Over(_) => "over",
        }
    }
}

/// Every node kind the pipeline knows how to run.
#[derive(Debug)]
pub enum Node {
    /// See [`TilePyramidNode`].
    TilePyramid(TilePyramidNode),
    /// See [`RasterFileNode`].
    RasterFile(RasterFileNode),
    /// See [`SolidNode`].
    Solid(SolidNode),
    /// See [`ReprojectNode`].
    Reproject(ReprojectNode),
    /// See [`CompositeNode`].
    Composite(CompositeNode),
    /// See [`OverNode`].
    Over(OverNode),
}

impl Node {
    /// Construct the node described by `kind`, validating its parameters.
    pub fn build(kind: NodeKind) -> MapflowResult<Self> {
        Ok(match kind {
            NodeKind::TilePyramid(p) => Self::TilePyramid(TilePyramidNode::new(p)?),
            NodeKind::RasterFile(p) => Self::RasterFile(RasterFileNode::new(p)?),
            NodeKind::Solid(p) => Self::Solid(SolidNode::new(p)),
            NodeKind::Reproject(p) => Self::Reproject(ReprojectNode::new(p)),
            NodeKind::Composite(p) => Self::Composite(CompositeNode::new(p)?),
            NodeKind::Over(p) => Self::Over(OverNode::new(p)?),
        })
    }
}

/// Build a node from a raw `{type, parameters}` config entry.
pub fn build_node(name: &str, kind: &str, parameters: &serde_json::Value) -> MapflowResult<Node> {
    NodeKind::from_def(kind, parameters)
        .and_then(Node::build)
        .map_err(|e| match e {
            MapflowError::NodeConstruction { reason, .. } => {
                MapflowError::node_construction(name, reason)
            }
            other => MapflowError::node_construction(name, other.to_string()),
        })
}

impl GraphNode for Node {
    fn inputs(&self) -> &[PadSpec] {
        match self {
            Self::TilePyramid(_) | Self::RasterFile(_) | Self::Solid(_) => &[],
            Self::Reproject(n) => n.inputs(),
            Self::Composite(n) => n.inputs(),
            Self::Over(n) => n.inputs(),
        }
    }

    fn outputs(&self) -> &[PadSpec] {
        match self {
            Self::TilePyramid(n) => n.outputs(),
            Self::RasterFile(n) => n.outputs(),
            Self::Solid(n) => n.outputs(),
            Self::Reproject(n) => n.outputs(),
            Self::Composite(n) => n.outputs(),
            Self::Over(n) => n.outputs(),
        }
    }

    fn pull(&self, cx: &PullCx<'_, Self>, output: usize, req: &Request) -> MapflowResult<Content> {
        if output != 0 {
            return Ok(Content::None);
        }
        match self {
            Self::TilePyramid(n) => n.pull(cx.ctx(), req),
            Self::RasterFile(n) => n.pull(cx.ctx(), req),
            Self::Solid(n) => Ok(n.pull(req)),
            Self::Reproject(n) => n.pull(cx, req),
            Self::Composite(n) => n.pull(cx, req),
            Self::Over(n) => n.pull(cx, req),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/mod.rs"]
mod tests;
