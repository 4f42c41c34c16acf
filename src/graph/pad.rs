use crate::graph::content::ContentTag;

/// Whether a pad consumes or produces content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Input pad: holds at most one link to an output pad.
    In,
    /// Output pad: pullable, may feed many inputs.
    Out,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::In => "input",
            Self::Out => "output",
        })
    }
}

/// Declaration of one named, typed pad on a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PadSpec {
    /// Pad name, unique per direction on its node.
    pub name: String,
    /// Content type flowing through the pad.
    pub tag: ContentTag,
}

impl PadSpec {
    /// Declare a pad.
    pub fn new(name: impl Into<String>, tag: ContentTag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }

    /// Declare a raster pad.
    pub fn raster(name: impl Into<String>) -> Self {
        Self::new(name, ContentTag::Raster)
    }
}

/// Index of a node in its graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Handle to one pad of one node. Handles never own the node they point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PadRef {
    /// Owning node.
    pub node: NodeId,
    /// Pad direction.
    pub direction: Direction,
    /// Position among the node's pads of that direction.
    pub index: usize,
}
