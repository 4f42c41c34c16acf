use super::*;
use crate::geo::crs::Crs;

fn env() -> Envelope {
    Envelope::new(0.0, 4.0, 2.0, 0.0, Crs::web_mercator()).unwrap()
}

fn size(w: u32, h: u32) -> PixelSize {
    PixelSize::new(w, h).unwrap()
}

#[test]
fn new_checks_buffer_length() {
    assert!(Raster::new(size(2, 2), env(), BandLayout::Gray, vec![0.0; 3]).is_err());
    let r = Raster::new(size(2, 2), env(), BandLayout::Rgb, vec![0.0; 12]).unwrap();
    assert!(r.can_interpolate());
}

#[test]
fn palette_rasters_default_to_nearest() {
    let table: Arc<[Rgba]> = Arc::from(vec![Rgba::new(1.0, 0.0, 0.0, 1.0)]);
    let r = Raster::new(size(1, 1), env(), BandLayout::Palette(table), vec![0.0]).unwrap();
    assert!(!r.can_interpolate());
    assert_eq!(r.rgba_at(0, 0), [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn to_rgba_converts_layouts_and_masks() {
    let table: Arc<[Rgba]> = Arc::from(vec![
        Rgba::new(0.0, 1.0, 0.0, 1.0),
        Rgba::new(0.0, 0.0, 1.0, 0.5),
    ]);
    let r = Raster::new(
        size(4, 1),
        env(),
        BandLayout::Palette(table),
        vec![0.0, 1.0, 7.0, 1.0],
    )
    .unwrap()
    .with_mask(vec![true, true, true, false])
    .unwrap();
    let rgba = r.to_rgba();
    assert_eq!(rgba.layout(), &BandLayout::Rgba);
    assert!(rgba.mask().is_none());
    assert_eq!(rgba.bands(0, 0), &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(rgba.bands(1, 0), &[0.0, 0.0, 0.5, 0.5]);
    // out-of-table index and masked pixel are transparent
    assert_eq!(rgba.bands(2, 0), &[0.0; 4]);
    assert_eq!(rgba.bands(3, 0), &[0.0; 4]);
}

#[test]
fn gray_alpha_premultiplies() {
    let r = Raster::new(size(1, 1), env(), BandLayout::GrayAlpha, vec![0.8, 0.5]).unwrap();
    let px = r.rgba_at(0, 0);
    assert!((px[0] - 0.4).abs() < 1e-6);
    assert_eq!(px[3], 0.5);
}

#[test]
fn into_rgba_reuses_rgba_rasters() {
    let a = Arc::new(Raster::solid(env(), size(2, 2), Rgba::new(1.0, 0.0, 0.0, 1.0)));
    let b = Arc::clone(&a).into_rgba();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn full_mask_is_dropped() {
    let r = Raster::transparent(env(), size(2, 1))
        .with_mask(vec![true, true])
        .unwrap();
    assert!(r.mask().is_none());
    assert!(Raster::transparent(env(), size(2, 1)).with_mask(vec![true]).is_err());
}

#[test]
fn geo_transform_maps_pixel_centers() {
    let gt = GeoTransform::for_grid(&env(), size(4, 2));
    assert_eq!(gt.center_of(0, 0), Point::new(0.5, 1.5));
    assert_eq!(gt.center_of(3, 1), Point::new(3.5, 0.5));
    assert_eq!(gt.pixel_of(Point::new(2.0, 1.0)), (2.0, 1.0));
    assert_eq!(gt.pixel_of(Point::new(0.0, 2.0)), (0.0, 0.0));
}

#[test]
fn canvas_paste_clips_and_skips_invalid() {
    let mut canvas = RgbaCanvas::new(size(3, 2));
    assert!(!canvas.is_touched());
    let src = Raster::solid(env(), size(2, 2), Rgba::new(0.0, 1.0, 0.0, 1.0))
        .with_mask(vec![true, false, true, true])
        .unwrap();
    canvas.paste(&src, 2, 0);
    assert!(canvas.is_touched());
    let out = canvas.finish(env());
    assert_eq!(out.bands(2, 0), &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(out.bands(2, 1), &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(out.bands(0, 0), &[0.0; 4]);
}

#[test]
fn rgba8_output_is_straight_alpha() {
    let r = Raster::solid(env(), size(1, 1), Rgba::new(1.0, 0.0, 0.0, 0.5));
    assert_eq!(r.to_rgba8(), vec![255, 0, 0, 128]);
}
