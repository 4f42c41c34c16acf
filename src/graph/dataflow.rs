use std::collections::VecDeque;

use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::envelope::Envelope;
use crate::graph::content::{Content, Request};
use crate::graph::damage::{Damage, DamageBus, DamageFn, SubscriptionId};
use crate::graph::pad::{Direction, NodeId, PadRef, PadSpec};
use crate::render::context::RenderContext;

/// A node that can live in a [`Graph`].
///
/// Pads are fixed for the node's lifetime. `pull` computes output pad `output` for `req`,
/// reading upstream content through `cx`.
pub trait GraphNode: Send + Sync + Sized {
    /// Input pad declarations.
    fn inputs(&self) -> &[PadSpec];

    /// Output pad declarations.
    fn outputs(&self) -> &[PadSpec];

    /// Produce content for output pad `output`.
    fn pull(&self, cx: &PullCx<'_, Self>, output: usize, req: &Request) -> MapflowResult<Content>;
}

/// Upstream access handed to [`GraphNode::pull`].
pub struct PullCx<'a, N: GraphNode> {
    graph: &'a Graph<N>,
    node: NodeId,
    ctx: &'a RenderContext,
}

impl<'a, N: GraphNode> PullCx<'a, N> {
    /// Shared render resources.
    pub fn ctx(&self) -> &'a RenderContext {
        self.ctx
    }

    /// Node being pulled.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Pull through input pad `index`.
    ///
    /// Unconnected inputs yield [`Content::None`]; recoverable upstream failures are logged and
    /// degraded to [`Content::None`].
    pub fn input(&self, index: usize, req: &Request) -> MapflowResult<Content> {
        let pad = PadRef {
            node: self.node,
            direction: Direction::In,
            index,
        };
        match self.graph.pull(pad, req, self.ctx) {
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    node = self.graph.node_name(self.node),
                    input = index,
                    error = %e,
                    "upstream pull failed, treating input as empty"
                );
                Ok(Content::None)
            }
            other => other,
        }
    }
}

struct NodeEntry<N> {
    name: String,
    node: N,
    links: Vec<Option<PadRef>>,
}

/// Arena of named nodes and the links between their pads.
///
/// Nodes are addressed by [`NodeId`] and pads by [`PadRef`]; input pads store the handle of the
/// output pad feeding them, never the node itself. The graph is expected to be acyclic: pulling
/// a cyclic wiring recurses without bound.
pub struct Graph<N> {
    nodes: Vec<NodeEntry<N>>,
    damage: DamageBus,
}

impl<N: GraphNode> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: GraphNode> Graph<N> {
    /// Empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            damage: DamageBus::default(),
        }
    }

    /// Add a node; its input pads start unconnected.
    pub fn add_node(&mut self, name: impl Into<String>, node: N) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let links = vec![None; node.inputs().len()];
        self.nodes.push(NodeEntry {
            name: name.into(),
            node,
            links,
        });
        id
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when no node has been added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look a node up by name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|e| e.name == name)
            .map(|i| NodeId(i as u32))
    }

    /// Node payload.
    pub fn node(&self, id: NodeId) -> Option<&N> {
        self.nodes.get(id.0 as usize).map(|e| &e.node)
    }

    /// Configured node name, `"?"` for stale ids.
    pub fn node_name(&self, id: NodeId) -> &str {
        self.nodes
            .get(id.0 as usize)
            .map(|e| e.name.as_str())
            .unwrap_or("?")
    }

    fn entry(&self, id: NodeId) -> MapflowResult<&NodeEntry<N>> {
        self.nodes
            .get(id.0 as usize)
            .ok_or_else(|| MapflowError::MissingNode(format!("#{}", id.0)))
    }

    fn find_pad(&self, node: NodeId, name: &str, direction: Direction) -> MapflowResult<PadRef> {
        let entry = self.entry(node)?;
        let pads = match direction {
            Direction::In => entry.node.inputs(),
            Direction::Out => entry.node.outputs(),
        };
        pads.iter()
            .position(|p| p.name == name)
            .map(|index| PadRef {
                node,
                direction,
                index,
            })
            .ok_or_else(|| MapflowError::MissingPad(format!("{}:{name} ({direction})", entry.name)))
    }

    /// Handle of the output pad `name` on `node`.
    pub fn output_pad(&self, node: NodeId, name: &str) -> MapflowResult<PadRef> {
        self.find_pad(node, name, Direction::Out)
    }

    /// Handle of the input pad `name` on `node`.
    pub fn input_pad(&self, node: NodeId, name: &str) -> MapflowResult<PadRef> {
        self.find_pad(node, name, Direction::In)
    }

    /// Declaration behind a pad handle.
    pub fn pad_spec(&self, pad: PadRef) -> MapflowResult<&PadSpec> {
        let entry = self.entry(pad.node)?;
        let pads = match pad.direction {
            Direction::In => entry.node.inputs(),
            Direction::Out => entry.node.outputs(),
        };
        pads.get(pad.index)
            .ok_or_else(|| MapflowError::MissingPad(format!("{}#{}", entry.name, pad.index)))
    }

    fn describe(&self, pad: PadRef) -> String {
        match self.pad_spec(pad) {
            Ok(spec) => format!("{}:{}", self.node_name(pad.node), spec.name),
            Err(_) => format!("{}#{}", self.node_name(pad.node), pad.index),
        }
    }

    /// Link `output` to `input`, replacing any previous link on `input`.
    pub fn connect(&mut self, output: PadRef, input: PadRef) -> MapflowResult<()> {
        if output.direction != Direction::Out {
            return Err(MapflowError::direction(format!(
                "connection source {} is an {} pad",
                self.describe(output),
                output.direction
            )));
        }
        if input.direction != Direction::In {
            return Err(MapflowError::direction(format!(
                "connection target {} is an {} pad",
                self.describe(input),
                input.direction
            )));
        }
        let out_tag = self.pad_spec(output)?.tag;
        let in_tag = self.pad_spec(input)?.tag;
        if out_tag != in_tag {
            return Err(MapflowError::TypeMismatch {
                output: self.describe(output),
                output_tag: out_tag.to_string(),
                input: self.describe(input),
                input_tag: in_tag.to_string(),
            });
        }
        if let Some(prev) = self.nodes[input.node.0 as usize].links[input.index] {
            tracing::debug!(
                input = %self.describe(input),
                previous = %self.describe(prev),
                "replacing existing connection"
            );
        }
        self.nodes[input.node.0 as usize].links[input.index] = Some(output);
        Ok(())
    }

    /// Clear the link on `input`. Clearing an unconnected input is a no-op.
    pub fn disconnect(&mut self, input: PadRef) -> MapflowResult<()> {
        if input.direction != Direction::In {
            return Err(MapflowError::direction(format!(
                "cannot disconnect {} pad {}",
                input.direction,
                self.describe(input)
            )));
        }
        self.pad_spec(input)?;
        self.nodes[input.node.0 as usize].links[input.index] = None;
        Ok(())
    }

    /// Output pad currently feeding `input`.
    pub fn connection(&self, input: PadRef) -> Option<PadRef> {
        if input.direction != Direction::In {
            return None;
        }
        self.nodes
            .get(input.node.0 as usize)?
            .links
            .get(input.index)
            .copied()
            .flatten()
    }

    /// Pull `pad` for `req`.
    ///
    /// Output pads run their node; input pads forward to the connected output, or yield
    /// [`Content::None`] when unconnected. Pulling never changes the topology.
    pub fn pull(&self, pad: PadRef, req: &Request, ctx: &RenderContext) -> MapflowResult<Content> {
        match pad.direction {
            Direction::In => match self.connection(pad) {
                Some(upstream) => self.pull(upstream, req, ctx),
                None => Ok(Content::None),
            },
            Direction::Out => {
                let entry = self.entry(pad.node)?;
                if pad.index >= entry.node.outputs().len() {
                    return Ok(Content::None);
                }
                let cx = PullCx {
                    graph: self,
                    node: pad.node,
                    ctx,
                };
                entry.node.pull(&cx, pad.index, req)
            }
        }
    }

    /// Nodes with at least one input fed by `node`.
    pub fn downstream(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, e)| e.links.iter().flatten().any(|l| l.node == node))
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    /// Register `f` to be called when `pad` (an output pad) is damaged.
    pub fn subscribe(&mut self, pad: PadRef, f: DamageFn) -> MapflowResult<SubscriptionId> {
        if pad.direction != Direction::Out {
            return Err(MapflowError::direction(format!(
                "damage is reported on output pads, not {}",
                self.describe(pad)
            )));
        }
        self.pad_spec(pad)?;
        Ok(self.damage.subscribe(pad, f))
    }

    /// Remove a subscription; returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.damage.unsubscribe(id)
    }

    /// Mark every output of `node` and of everything downstream of it as damaged, invoking
    /// subscribers synchronously.
    pub fn damage(&self, node: NodeId, region: Option<Envelope>) -> MapflowResult<()> {
        self.entry(node)?;
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([node]);
        while let Some(id) = queue.pop_front() {
            let i = id.0 as usize;
            if std::mem::replace(&mut seen[i], true) {
                continue;
            }
            for index in 0..self.nodes[i].node.outputs().len() {
                self.damage.notify(&Damage {
                    pad: PadRef {
                        node: id,
                        direction: Direction::Out,
                        index,
                    },
                    region: region.clone(),
                });
            }
            queue.extend(self.downstream(id));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/dataflow.rs"]
mod tests;
