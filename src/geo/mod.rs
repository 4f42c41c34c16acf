//! Coordinate reference systems, envelopes and point reprojection.

pub(crate) mod crs;
pub(crate) mod envelope;
pub(crate) mod transform;
