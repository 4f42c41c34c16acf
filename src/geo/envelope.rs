use kurbo::{BezPath, Shape};

use crate::foundation::core::Point;
use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::crs::Crs;
use crate::geo::transform::CrsTransformer;

/// Vertex cap per boundary edge when segmentizing.
const MAX_SEGMENTS_PER_EDGE: usize = 1024;

/// How vertices that fail to reproject are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReprojectMode {
    /// Any unprojectable vertex fails the whole transform.
    #[default]
    Strict,
    /// Unprojectable vertices are dropped; at least two must survive.
    Partial,
}

/// Axis-aligned rectangle in a specific CRS, y increasing upwards.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Envelope {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    crs: Crs,
}

impl Envelope {
    /// Create a validated envelope (`right > left`, `top > bottom`, finite bounds).
    pub fn new(left: f64, right: f64, top: f64, bottom: f64, crs: Crs) -> MapflowResult<Self> {
        if ![left, right, top, bottom].iter().all(|v| v.is_finite()) {
            return Err(MapflowError::validation("envelope bounds must be finite"));
        }
        if right <= left || top <= bottom {
            return Err(MapflowError::validation(format!(
                "envelope must satisfy right > left and top > bottom, got \
                 left={left} right={right} top={top} bottom={bottom}"
            )));
        }
        Ok(Self {
            left,
            right,
            top,
            bottom,
            crs,
        })
    }

    /// Full extent of the web-Mercator plane.
    pub fn web_mercator_world() -> Self {
        let h = crate::geo::crs::WEB_MERCATOR_HALF_WORLD;
        Self {
            left: -h,
            right: h,
            top: h,
            bottom: -h,
            crs: Crs::web_mercator(),
        }
    }

    /// Left (minimum x) bound.
    pub fn left(&self) -> f64 {
        self.left
    }

    /// Right (maximum x) bound.
    pub fn right(&self) -> f64 {
        self.right
    }

    /// Top (maximum y) bound.
    pub fn top(&self) -> f64 {
        self.top
    }

    /// Bottom (minimum y) bound.
    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    /// Reference system of the bounds.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// `(width, height)` in CRS units.
    pub fn size(&self) -> (f64, f64) {
        (self.right - self.left, self.top - self.bottom)
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        let (w, h) = self.size();
        w / h
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Sub-rectangle covering fractions `[x0, x1] x [y0, y1]` of this envelope, fractions measured
    /// from the top-left corner.
    pub fn sub_envelope(&self, x0: f64, x1: f64, y0: f64, y1: f64) -> MapflowResult<Self> {
        let (w, h) = self.size();
        Self::new(
            self.left + w * x0,
            self.left + w * x1,
            self.top - h * y0,
            self.top - h * y1,
            self.crs.clone(),
        )
    }

    /// Closed boundary polygon of this envelope with edges cut into chords of at most
    /// `tolerance` CRS units.
    pub fn boundary(&self, tolerance: f64) -> Boundary {
        Boundary::from_envelope(self, tolerance)
    }

    /// Reproject into `target` through the segmentized boundary.
    ///
    /// A same-CRS request returns the bounds unchanged.
    pub fn transform_to(
        &self,
        target: &Crs,
        tolerance: f64,
        mode: ReprojectMode,
        transformer: &dyn CrsTransformer,
    ) -> MapflowResult<Envelope> {
        if *target == self.crs {
            return Ok(self.clone());
        }
        self.boundary(tolerance)
            .transform(target, mode, transformer)?
            .envelope()
    }
}

/// Closed polygon in a specific CRS, derived from an [`Envelope`].
///
/// Boundaries are recomputed for each transform rather than edited in place.
#[derive(Clone, Debug, PartialEq)]
pub struct Boundary {
    points: Vec<Point>,
    crs: Crs,
}

impl Boundary {
    /// Segmentized outline of `env`, clockwise from the top-left corner.
    pub fn from_envelope(env: &Envelope, tolerance: f64) -> Self {
        let corners = [
            Point::new(env.left, env.top),
            Point::new(env.right, env.top),
            Point::new(env.right, env.bottom),
            Point::new(env.left, env.bottom),
        ];
        let mut points = Vec::new();
        for (i, &a) in corners.iter().enumerate() {
            let b = corners[(i + 1) % corners.len()];
            points.extend(segmentize_edge(a, b, tolerance));
        }
        Self {
            points,
            crs: env.crs.clone(),
        }
    }

    /// Polygon vertices (the closing edge back to the first vertex is implicit).
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Reference system of the vertices.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Reproject every vertex into `target`.
    pub fn transform(
        &self,
        target: &Crs,
        mode: ReprojectMode,
        transformer: &dyn CrsTransformer,
    ) -> MapflowResult<Boundary> {
        if *target == self.crs {
            return Ok(self.clone());
        }
        let projected = transformer.transform(&self.crs, target, &self.points)?;
        let total = projected.len();
        let points: Vec<Point> = projected.into_iter().flatten().collect();
        match mode {
            ReprojectMode::Strict if points.len() != total => {
                Err(MapflowError::projection(format!(
                    "{} of {total} boundary vertices cannot be projected from {} to {target}",
                    total - points.len(),
                    self.crs
                )))
            }
            ReprojectMode::Partial if points.len() < 2 => Err(MapflowError::projection(format!(
                "too few boundary vertices survive projection from {} to {target}",
                self.crs
            ))),
            _ => Ok(Boundary {
                points,
                crs: target.clone(),
            }),
        }
    }

    /// Bounding envelope of the vertices.
    pub fn envelope(&self) -> MapflowResult<Envelope> {
        let mut left = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut bottom = f64::INFINITY;
        let mut top = f64::NEG_INFINITY;
        for p in &self.points {
            left = left.min(p.x);
            right = right.max(p.x);
            bottom = bottom.min(p.y);
            top = top.max(p.y);
        }
        Envelope::new(left, right, top, bottom, self.crs.clone()).map_err(|_| {
            MapflowError::projection(format!("boundary in {} collapses to a degenerate envelope", self.crs))
        })
    }

    /// Non-zero winding containment test.
    pub fn contains(&self, p: Point) -> bool {
        let Some((&first, rest)) = self.points.split_first() else {
            return false;
        };
        let mut path = BezPath::new();
        path.move_to(first);
        for &q in rest {
            path.line_to(q);
        }
        path.close_path();
        path.contains(p)
    }
}

/// Points of edge `a -> b` (including `a`, excluding `b`) spaced at most `tolerance` apart.
fn segmentize_edge(a: Point, b: Point, tolerance: f64) -> impl Iterator<Item = Point> {
    let len = a.distance(b);
    let n = if tolerance.is_finite() && tolerance > 0.0 {
        ((len / tolerance).ceil() as usize).clamp(1, MAX_SEGMENTS_PER_EDGE)
    } else {
        1
    };
    (0..n).map(move |i| a.lerp(b, i as f64 / n as f64))
}

#[cfg(test)]
#[path = "../../tests/unit/geo/envelope.rs"]
mod tests;
