//! Typed pads, the node arena and pull evaluation.

pub(crate) mod content;
pub(crate) mod damage;
pub(crate) mod dataflow;
pub(crate) mod pad;
