use super::*;
use crate::geo::crs::WEB_MERCATOR_HALF_WORLD;

fn size(w: u32, h: u32) -> PixelSize {
    PixelSize::new(w, h).unwrap()
}

fn merc(left: f64, right: f64, top: f64, bottom: f64) -> Envelope {
    Envelope::new(left, right, top, bottom, Crs::web_mercator()).unwrap()
}

#[test]
fn full_world_at_one_tile_selects_zoom_0() {
    let p = TilePyramid::web_mercator();
    let world = p.world().clone();
    assert_eq!(p.select_zoom(&world, size(256, 256)), 0);

    let range = p.tile_range(&world, 0).unwrap();
    assert_eq!((range.x0, range.x1, range.y0, range.y1), (0, 0, 0, 0));
    let coord = p.resolve(0, range.x0, range.y0).unwrap();
    assert_eq!(coord, TileCoord { zoom: 0, x: 0, y: 0 });
    assert_eq!(coord.quadkey(), "");
}

#[test]
fn full_world_at_512_selects_zoom_1() {
    let p = TilePyramid::web_mercator();
    let world = p.world().clone();
    assert_eq!(p.select_zoom(&world, size(512, 512)), 1);
    let range = p.tile_range(&world, 1).unwrap();
    assert_eq!(range.columns(), 2);
    assert_eq!(range.rows(), 2);
}

#[test]
fn quadkey_interleaves_bits_coarsest_first() {
    assert_eq!(TileCoord { zoom: 3, x: 3, y: 5 }.quadkey(), "213");
    assert_eq!(TileCoord { zoom: 1, x: 1, y: 0 }.quadkey(), "1");
    assert_eq!(TileCoord { zoom: 1, x: 0, y: 1 }.quadkey(), "2");
    assert_eq!(TileCoord { zoom: 2, x: 3, y: 3 }.quadkey(), "33");
}

#[test]
fn url_template_substitution() {
    let c = TileCoord { zoom: 3, x: 3, y: 5 };
    assert_eq!(c.url("https://t/{zoom}/{x}/{y}.png"), "https://t/3/3/5.png");
    assert_eq!(c.url("https://t/q/{quadkey}"), "https://t/q/213");
}

#[test]
fn x_wraps_around_the_antimeridian() {
    let p = TilePyramid::web_mercator();
    for z in [1u8, 3, 7] {
        let n = i64::from(TilePyramid::tiles_per_axis(z));
        assert_eq!(p.resolve(z, -1, 0), p.resolve(z, n - 1, 0));
        assert_eq!(p.resolve(z, n, 0), p.resolve(z, 0, 0));
        assert_eq!(p.resolve(z, -1, 0).unwrap().x as i64, n - 1);
    }
}

#[test]
fn y_outside_world_is_skipped() {
    let p = TilePyramid::web_mercator();
    assert_eq!(p.resolve(2, 0, -1), None);
    assert_eq!(p.resolve(2, 0, 4), None);
    assert!(p.resolve(2, 0, 3).is_some());
}

#[test]
fn tile_range_keeps_unwrapped_columns_and_clips_rows() {
    let p = TilePyramid::web_mercator();
    let h = WEB_MERCATOR_HALF_WORLD;
    // Straddles the antimeridian on the left and pokes above the top of the world.
    let env = merc(-h * 1.25, -h * 0.75, h * 1.5, h * 0.5);
    let r = p.tile_range(&env, 2).unwrap();
    assert_eq!((r.x0, r.x1), (-1, 0));
    assert_eq!((r.y0, r.y1), (0, 0));

    let above = merc(-h * 0.5, h * 0.5, h * 3.0, h * 2.0);
    assert!(p.tile_range(&above, 2).is_none());
}

#[test]
fn zoom_never_decreases_as_resolution_gets_finer() {
    let p = TilePyramid::web_mercator();
    let env = merc(-1_000_000.0, 1_000_000.0, 1_000_000.0, -1_000_000.0);
    let mut last = 0;
    for side in [16u32, 32, 64, 128, 256, 512, 1024, 2048, 4096] {
        let z = p.select_zoom(&env, size(side, side));
        assert!(z >= last, "zoom dropped from {last} to {z} at {side}px");
        last = z;
    }
}

#[test]
fn snap_zoom_rounds_to_nearest_and_clamps() {
    let p = TilePyramid::web_mercator();
    assert_eq!(p.snap_zoom(2.4), 2);
    assert_eq!(p.snap_zoom(2.6), 3);
    assert_eq!(p.snap_zoom(2.5), 2);
    assert_eq!(p.snap_zoom(-3.0), 0);
    assert_eq!(p.snap_zoom(40.0), 18);
    assert_eq!(p.snap_zoom(f64::NAN), 0);
}

#[test]
fn continuous_zoom_takes_finer_axis() {
    let p = TilePyramid::web_mercator();
    let world = p.world().clone();
    // 1024 px wide means zoom 2 along x, 256 px tall means zoom 0 along y.
    let z = p.continuous_zoom(&world, size(1024, 256));
    assert!((z - 2.0).abs() < 1e-9);
}

#[test]
fn tile_envelopes_tile_the_world() {
    let p = TilePyramid::web_mercator();
    let h = WEB_MERCATOR_HALF_WORLD;
    let t = p.tile_envelope(1, 1, 1).unwrap();
    assert!((t.left() - 0.0).abs() < 1e-6);
    assert!((t.right() - h).abs() < 1e-6);
    assert!((t.top() - 0.0).abs() < 1e-6);
    assert!((t.bottom() + h).abs() < 1e-6);

    let wrapped = p.tile_envelope(1, -1, 0).unwrap();
    assert!((wrapped.left() + 2.0 * h).abs() < 1e-6);
}

#[test]
fn new_rejects_bad_zoom_range() {
    let world = TilePyramid::web_mercator().world().clone();
    assert!(TilePyramid::new(world.clone(), 256, 5, 2).is_err());
    assert!(TilePyramid::new(world.clone(), 256, 0, 19).is_err());
    assert!(TilePyramid::new(world, 0, 0, 4).is_err());
}
