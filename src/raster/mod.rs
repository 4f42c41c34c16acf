//! In-memory rasters and image decoding.

pub(crate) mod buffer;
pub(crate) mod decode;
