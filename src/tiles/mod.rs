//! Tile pyramid addressing and tile byte fetching.

pub(crate) mod fetch;
pub(crate) mod pyramid;
