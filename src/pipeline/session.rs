use std::collections::BTreeMap;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::envelope::Envelope;
use crate::graph::content::{Content, Request};
use crate::graph::damage::{DamageFn, SubscriptionId};
use crate::graph::dataflow::Graph;
use crate::graph::pad::{NodeId, PadRef};
use crate::nodes::{Node, build_node};
use crate::pipeline::config::{PadAddr, PipelineConfig};
use crate::render::context::RenderContext;

/// Side of the square box unsized renders are fitted into when the config names none.
pub const DEFAULT_OUTPUT_SIDE: u32 = 256;

/// A wired node graph plus its named outputs, built once from a [`PipelineConfig`].
///
/// Nodes whose kind is unknown or whose parameters are rejected are logged and left out; wiring
/// that references them then fails the build.
pub struct Pipeline {
    graph: Graph<Node>,
    outputs: BTreeMap<String, PadRef>,
    default_size: PixelSize,
    ctx: RenderContext,
}

impl Pipeline {
    /// Build the graph described by `config`, rendering through `ctx`.
    pub fn build(config: &PipelineConfig, ctx: RenderContext) -> MapflowResult<Self> {
        let mut graph = Graph::new();
        for (name, def) in &config.nodes {
            match build_node(name, &def.kind, &def.parameters) {
                Ok(node) => {
                    graph.add_node(name.clone(), node);
                }
                Err(e) => {
                    tracing::warn!(node = %name, kind = %def.kind, error = %e, "omitting node");
                }
            }
        }

        for [from, to] in &config.edges {
            let from: PadAddr = from.parse()?;
            let to: PadAddr = to.parse()?;
            let output = graph.output_pad(lookup(&graph, &from.node)?, &from.pad)?;
            let input = graph.input_pad(lookup(&graph, &to.node)?, &to.pad)?;
            graph.connect(output, input)?;
        }

        let mut outputs = BTreeMap::new();
        for (name, addr) in &config.outputs {
            let addr: PadAddr = addr.parse()?;
            let pad = graph.output_pad(lookup(&graph, &addr.node)?, &addr.pad)?;
            outputs.insert(name.clone(), pad);
        }

        let default_size = match config.default_size {
            Some(size) => size,
            None => PixelSize::new(DEFAULT_OUTPUT_SIDE, DEFAULT_OUTPUT_SIDE)?,
        };

        tracing::debug!(nodes = graph.len(), outputs = outputs.len(), "pipeline built");
        Ok(Self {
            graph,
            outputs,
            default_size,
            ctx,
        })
    }

    /// Names of the exposed outputs, sorted.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Callable handle on output `name`.
    pub fn output(&self, name: &str) -> MapflowResult<Output<'_>> {
        let (name, pad) = self
            .outputs
            .get_key_value(name)
            .ok_or_else(|| missing_output(name))?;
        Ok(Output {
            pipeline: self,
            name,
            pad: *pad,
        })
    }

    fn output_pad(&self, name: &str) -> MapflowResult<PadRef> {
        self.outputs
            .get(name)
            .copied()
            .ok_or_else(|| missing_output(name))
    }

    /// Underlying node graph.
    pub fn graph(&self) -> &Graph<Node> {
        &self.graph
    }

    /// Render resources shared by every pull.
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Box that unsized renders are fitted into.
    pub fn default_size(&self) -> PixelSize {
        self.default_size
    }

    /// Pixel size used for `envelope` when the caller passes none: the envelope's aspect ratio
    /// fitted inside [`Pipeline::default_size`].
    pub fn resolve_size(&self, envelope: &Envelope, size: Option<PixelSize>) -> PixelSize {
        size.unwrap_or_else(|| PixelSize::fit_aspect(envelope.aspect(), self.default_size))
    }

    /// Pull output `name` for `envelope`.
    ///
    /// Recoverable failures anywhere in the graph come back as [`Content::None`]; only structural
    /// errors are returned.
    pub fn render(
        &self,
        name: &str,
        envelope: &Envelope,
        size: Option<PixelSize>,
    ) -> MapflowResult<Content> {
        self.render_pad(name, self.output_pad(name)?, envelope, size)
    }

    #[tracing::instrument(skip(self, pad, envelope), fields(crs = %envelope.crs()))]
    fn render_pad(
        &self,
        name: &str,
        pad: PadRef,
        envelope: &Envelope,
        size: Option<PixelSize>,
    ) -> MapflowResult<Content> {
        let req = Request::new(envelope.clone(), self.resolve_size(envelope, size));
        match self.graph.pull(pad, &req, &self.ctx) {
            Err(e) if e.is_recoverable() => {
                tracing::warn!(output = name, error = %e, "render degraded to empty output");
                Ok(Content::None)
            }
            other => other,
        }
    }

    /// Call `f` whenever output `name` is damaged.
    pub fn subscribe(&mut self, name: &str, f: DamageFn) -> MapflowResult<SubscriptionId> {
        let pad = self.output_pad(name)?;
        self.graph.subscribe(pad, f)
    }

    /// Drop a subscription; `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.graph.unsubscribe(id)
    }

    /// Report that node `node` changed within `region` (`None` for everywhere). Subscribers of
    /// every output downstream of it are invoked before this returns.
    pub fn damage(&self, node: &str, region: Option<Envelope>) -> MapflowResult<()> {
        self.graph.damage(lookup(&self.graph, node)?, region)
    }
}

/// Borrowed handle on one named pipeline output.
#[derive(Clone, Copy, Debug)]
pub struct Output<'a> {
    pipeline: &'a Pipeline,
    name: &'a str,
    pad: PadRef,
}

impl Output<'_> {
    /// Output name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Pull this output; see [`Pipeline::render`].
    pub fn render(&self, envelope: &Envelope, size: Option<PixelSize>) -> MapflowResult<Content> {
        self.pipeline.render_pad(self.name, self.pad, envelope, size)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("nodes", &self.graph.len())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("default_size", &self.default_size)
            .finish_non_exhaustive()
    }
}

fn missing_output(name: &str) -> MapflowError {
    MapflowError::MissingPad(format!("no pipeline output named '{name}'"))
}

fn lookup(graph: &Graph<Node>, name: &str) -> MapflowResult<NodeId> {
    graph
        .node_id(name)
        .ok_or_else(|| MapflowError::MissingNode(name.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/session.rs"]
mod tests;
