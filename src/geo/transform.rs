use std::f64::consts::PI;

use proj4rs::proj::Proj;

use crate::foundation::core::Point;
use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::crs::{Crs, EPSG_WEB_MERCATOR, EPSG_WGS84, WEB_MERCATOR_HALF_WORLD};

/// Point-set reprojection between coordinate reference systems.
///
/// Implementations return one entry per input point: `None` marks a point that cannot be
/// represented in the target CRS (e.g. a pole in Mercator). `Err` is reserved for failures that
/// affect the whole request, such as an unknown CRS definition.
pub trait CrsTransformer: Send + Sync {
    /// Transform `points` from `from` into `to`.
    fn transform(&self, from: &Crs, to: &Crs, points: &[Point])
    -> MapflowResult<Vec<Option<Point>>>;

    /// Transform a single point, failing with [`MapflowError::Projection`] if it has no image.
    fn project_point(&self, point: Point, from: &Crs, to: &Crs) -> MapflowResult<Point> {
        self.transform(from, to, &[point])?
            .pop()
            .flatten()
            .ok_or_else(|| {
                MapflowError::projection(format!("point ({}, {}) not representable in {to}", point.x, point.y))
            })
    }
}

/// Built-in transformer: inline spherical-Mercator math for EPSG:3857 <-> EPSG:4326 and
/// `proj4rs` for every other pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct Proj4Transformer;

enum Strategy {
    Identity,
    MercToGeo,
    GeoToMerc,
    Proj {
        src: Box<Proj>,
        dst: Box<Proj>,
        src_geographic: bool,
        dst_geographic: bool,
    },
}

impl Strategy {
    fn new(from: &Crs, to: &Crs) -> MapflowResult<Self> {
        if from == to {
            return Ok(Self::Identity);
        }
        match (from, to) {
            (Crs::Epsg(EPSG_WEB_MERCATOR), Crs::Epsg(EPSG_WGS84)) => return Ok(Self::MercToGeo),
            (Crs::Epsg(EPSG_WGS84), Crs::Epsg(EPSG_WEB_MERCATOR)) => return Ok(Self::GeoToMerc),
            _ => {}
        }
        Ok(Self::Proj {
            src: Box::new(parse_proj(from)?),
            dst: Box::new(parse_proj(to)?),
            src_geographic: from.is_geographic(),
            dst_geographic: to.is_geographic(),
        })
    }

    fn apply(&self, p: Point) -> Option<Point> {
        let out = match self {
            Self::Identity => p,
            Self::MercToGeo => Point::new(merc_x_to_lon(p.x), merc_y_to_lat(p.y)),
            Self::GeoToMerc => {
                if p.y.abs() >= 90.0 {
                    return None;
                }
                Point::new(lon_to_merc_x(p.x), lat_to_merc_y(p.y))
            }
            Self::Proj {
                src,
                dst,
                src_geographic,
                dst_geographic,
            } => {
                let mut pt = if *src_geographic {
                    (p.x.to_radians(), p.y.to_radians(), 0.0)
                } else {
                    (p.x, p.y, 0.0)
                };
                proj4rs::transform::transform(src, dst, &mut pt).ok()?;
                if *dst_geographic {
                    Point::new(pt.0.to_degrees(), pt.1.to_degrees())
                } else {
                    Point::new(pt.0, pt.1)
                }
            }
        };
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }
}

fn parse_proj(crs: &Crs) -> MapflowResult<Proj> {
    let def = crs
        .proj_string()
        .ok_or_else(|| MapflowError::projection(format!("{crs} is not supported")))?;
    Proj::from_proj_string(def)
        .map_err(|e| MapflowError::projection(format!("invalid projection {crs}: {e:?}")))
}

impl CrsTransformer for Proj4Transformer {
    fn transform(
        &self,
        from: &Crs,
        to: &Crs,
        points: &[Point],
    ) -> MapflowResult<Vec<Option<Point>>> {
        let strategy = Strategy::new(from, to)?;
        Ok(points.iter().map(|&p| strategy.apply(p)).collect())
    }
}

fn merc_x_to_lon(x: f64) -> f64 {
    x * 180.0 / WEB_MERCATOR_HALF_WORLD
}

fn merc_y_to_lat(y: f64) -> f64 {
    let y_rad = y * PI / WEB_MERCATOR_HALF_WORLD;
    (2.0 * y_rad.exp().atan() - PI / 2.0) * 180.0 / PI
}

fn lon_to_merc_x(lon: f64) -> f64 {
    lon * WEB_MERCATOR_HALF_WORLD / 180.0
}

fn lat_to_merc_y(lat: f64) -> f64 {
    let lat_rad = lat.to_radians();
    (PI / 4.0 + lat_rad / 2.0).tan().ln() * WEB_MERCATOR_HALF_WORLD / PI
}

#[cfg(test)]
#[path = "../../tests/unit/geo/transform.rs"]
mod tests;
