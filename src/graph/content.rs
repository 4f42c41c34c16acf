use std::sync::Arc;

use kurbo::BezPath;

use crate::foundation::core::PixelSize;
use crate::geo::crs::Crs;
use crate::geo::envelope::Envelope;
use crate::raster::buffer::Raster;

/// Type tag carried by every pad; connected pads must agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTag {
    /// Pixel content.
    Raster,
    /// Geometry content.
    Vector,
}

impl std::fmt::Display for ContentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Raster => "raster",
            Self::Vector => "vector",
        })
    }
}

/// Geometry payload of a vector pad. Rendering it is left to an external drawing backend.
#[derive(Clone, Debug, Default)]
pub struct VectorFeatures {
    /// Reference system of the path coordinates, when known.
    pub crs: Option<Crs>,
    /// Feature outlines.
    pub paths: Vec<BezPath>,
}

/// Result of pulling an output pad.
///
/// `None` is a regular value meaning "nothing to draw here", distinct from a pull error.
#[derive(Clone, Debug, Default)]
pub enum Content {
    /// Nothing to draw.
    #[default]
    None,
    /// A raster covering the request.
    Raster(Arc<Raster>),
    /// Vector features covering the request.
    Vector(Arc<VectorFeatures>),
}

impl Content {
    /// Wrap an owned raster.
    pub fn raster(r: Raster) -> Self {
        Self::Raster(Arc::new(r))
    }

    /// `true` for [`Content::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Tag of the payload, `None` for empty content.
    pub fn tag(&self) -> Option<ContentTag> {
        match self {
            Self::None => None,
            Self::Raster(_) => Some(ContentTag::Raster),
            Self::Vector(_) => Some(ContentTag::Vector),
        }
    }

    /// Raster payload, if any.
    pub fn as_raster(&self) -> Option<&Arc<Raster>> {
        match self {
            Self::Raster(r) => Some(r),
            _ => None,
        }
    }
}

/// Arguments of a pull: the region to cover and the pixel grid to cover it with.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    /// Region and CRS of the requested grid.
    pub envelope: Envelope,
    /// Requested pixel dimensions.
    pub size: PixelSize,
}

impl Request {
    /// Bundle an envelope and size.
    pub fn new(envelope: Envelope, size: PixelSize) -> Self {
        Self { envelope, size }
    }

    /// CRS units per pixel along x.
    pub fn resolution(&self) -> f64 {
        self.envelope.size().0 / f64::from(self.size.width)
    }
}
