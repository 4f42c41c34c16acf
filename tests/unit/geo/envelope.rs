use super::*;
use crate::geo::crs::WEB_MERCATOR_HALF_WORLD;
use crate::geo::transform::Proj4Transformer;

fn merc(left: f64, right: f64, top: f64, bottom: f64) -> Envelope {
    Envelope::new(left, right, top, bottom, Crs::web_mercator()).unwrap()
}

#[test]
fn rejects_inverted_or_non_finite_bounds() {
    assert!(Envelope::new(1.0, 0.0, 1.0, 0.0, Crs::wgs84()).is_err());
    assert!(Envelope::new(0.0, 1.0, 0.0, 1.0, Crs::wgs84()).is_err());
    assert!(Envelope::new(0.0, f64::NAN, 1.0, 0.0, Crs::wgs84()).is_err());
}

#[test]
fn size_and_center() {
    let e = merc(-10.0, 30.0, 5.0, -15.0);
    assert_eq!(e.size(), (40.0, 20.0));
    assert_eq!(e.center(), Point::new(10.0, -5.0));
    assert_eq!(e.aspect(), 2.0);
}

#[test]
fn identity_transform_is_exact() {
    let e = merc(-1234.5, 6789.25, 42.0, -42.0);
    let out = e
        .transform_to(
            &Crs::web_mercator(),
            1.0,
            ReprojectMode::Strict,
            &Proj4Transformer,
        )
        .unwrap();
    assert_eq!(out, e);
}

#[test]
fn segmentize_respects_tolerance() {
    let e = merc(0.0, 10.0, 10.0, 0.0);
    let b = e.boundary(2.5);
    assert_eq!(b.points().len(), 16);
    for w in b.points().windows(2) {
        assert!(w[0].distance(w[1]) <= 2.5 + 1e-9);
    }
    assert_eq!(e.boundary(0.0).points().len(), 4);
}

#[test]
fn segmentized_transform_catches_bowed_edges() {
    // Parallels curve poleward away from the UTM central meridian, so the middle of the bottom
    // edge sits further south than either bottom corner.
    let geo = Envelope::new(9.0, 21.0, 60.0, 50.0, Crs::wgs84()).unwrap();
    let utm = Crs::Epsg(32633);
    let corners_only = geo
        .transform_to(&utm, f64::INFINITY, ReprojectMode::Strict, &Proj4Transformer)
        .unwrap();
    let dense = geo
        .transform_to(&utm, 1.0, ReprojectMode::Strict, &Proj4Transformer)
        .unwrap();
    assert!(dense.bottom() < corners_only.bottom() - 1000.0);
    assert!(dense.size().1 > corners_only.size().1);
}

#[test]
fn strict_mode_fails_on_poles_and_partial_mode_recovers() {
    let geo = Envelope::new(-10.0, 10.0, 90.0, 80.0, Crs::wgs84()).unwrap();
    let err = geo
        .transform_to(
            &Crs::web_mercator(),
            1.0,
            ReprojectMode::Strict,
            &Proj4Transformer,
        )
        .unwrap_err();
    assert!(matches!(err, MapflowError::Projection(_)));

    let partial = geo
        .transform_to(
            &Crs::web_mercator(),
            1.0,
            ReprojectMode::Partial,
            &Proj4Transformer,
        )
        .unwrap();
    assert_eq!(partial.crs(), &Crs::web_mercator());
    assert!(partial.bottom() > 0.0);
}

#[test]
fn world_bounds_map_to_lon_lat_limits() {
    let world = merc(
        -WEB_MERCATOR_HALF_WORLD,
        WEB_MERCATOR_HALF_WORLD,
        WEB_MERCATOR_HALF_WORLD,
        -WEB_MERCATOR_HALF_WORLD,
    );
    let geo = world
        .transform_to(&Crs::wgs84(), 1e6, ReprojectMode::Strict, &Proj4Transformer)
        .unwrap();
    assert!((geo.left() + 180.0).abs() < 1e-9);
    assert!((geo.right() - 180.0).abs() < 1e-9);
    assert!((geo.top() - 85.051_128_78).abs() < 1e-6);
}

#[test]
fn boundary_contains_uses_polygon() {
    let b = merc(0.0, 10.0, 10.0, 0.0).boundary(1.0);
    assert!(b.contains(Point::new(5.0, 5.0)));
    assert!(!b.contains(Point::new(15.0, 5.0)));
    assert!(!b.contains(Point::new(5.0, -0.5)));
}

#[test]
fn sub_envelope_measures_from_top_left() {
    let e = merc(0.0, 100.0, 100.0, 0.0);
    let s = e.sub_envelope(0.5, 1.0, 0.0, 0.25).unwrap();
    assert_eq!((s.left(), s.right(), s.top(), s.bottom()), (50.0, 100.0, 100.0, 75.0));
}
