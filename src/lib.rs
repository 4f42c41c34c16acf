//! Mapflow renders map imagery on demand through a pull-based dataflow graph.
//!
//! A [`Pipeline`] wires named nodes (tile pyramids, raster files, reprojectors, compositors)
//! from a JSON [`PipelineConfig`]. Pulling one of its outputs with an [`Envelope`] and a
//! [`PixelSize`] recursively pulls everything upstream and returns a [`Content`]:
//!
//! - [`Content::Raster`] holding a premultiplied RGBA (or other layout) [`Raster`]
//! - [`Content::None`] when there is nothing to draw, which is not an error
//!
//! Failed tiles, unprojectable regions and undecodable data degrade to transparent pixels or
//! [`Content::None`]; only wiring mistakes surface as [`MapflowError`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod geo;
pub(crate) mod graph;
pub(crate) mod nodes;
pub(crate) mod pipeline;
pub(crate) mod raster;
pub(crate) mod render;
pub(crate) mod tiles;

pub use crate::foundation::core::{PixelSize, Point, Rgba};
pub use crate::foundation::error::{FetchError, MapflowError, MapflowResult};

pub use crate::geo::crs::{Crs, EPSG_WEB_MERCATOR, EPSG_WGS84, WEB_MERCATOR_HALF_WORLD};
pub use crate::geo::envelope::{Boundary, Envelope, ReprojectMode};
pub use crate::geo::transform::{CrsTransformer, Proj4Transformer};

pub use crate::raster::buffer::{BandLayout, GeoTransform, Raster, RgbaCanvas};
pub use crate::raster::decode::{decode_raster, decode_raster_file};

pub use crate::graph::content::{Content, ContentTag, Request, VectorFeatures};
pub use crate::graph::damage::{Damage, DamageFn, SubscriptionId};
pub use crate::graph::dataflow::{Graph, GraphNode, PullCx};
pub use crate::graph::pad::{Direction, NodeId, PadRef, PadSpec};

pub use crate::render::composite::{Layer, PremulRgba, composite, over, over_in_place};
pub use crate::render::context::{RenderContext, RenderOpts};
pub use crate::render::reproject::{reproject, resample, warp};

pub use crate::tiles::fetch::{FsFetcher, HttpFetcher, SchemeFetcher, TileFetcher};
pub use crate::tiles::pyramid::{DEFAULT_TILE_SIZE, MAX_ZOOM, TileCoord, TilePyramid, TileRange};

pub use crate::nodes::{
    CompositeNode, CompositeParams, Node, NodeKind, OverNode, OverParams, RASTER_PAD,
    RasterFileNode, RasterFileParams, ReprojectNode, ReprojectParams, SolidNode, SolidParams,
    TilePyramidNode, TilePyramidParams, build_node,
};
pub use crate::pipeline::config::{NodeDef, PadAddr, PipelineConfig};
pub use crate::pipeline::session::{DEFAULT_OUTPUT_SIDE, Output, Pipeline};
