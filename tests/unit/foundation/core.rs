use super::*;

#[test]
fn pixel_size_rejects_empty_axes() {
    assert!(PixelSize::new(0, 10).is_err());
    assert!(PixelSize::new(10, 0).is_err());
    assert_eq!(PixelSize::new(3, 4).unwrap().pixel_count(), 12);
}

#[test]
fn pixel_size_parses_wxh() {
    assert_eq!(
        "512x256".parse::<PixelSize>().unwrap(),
        PixelSize::new(512, 256).unwrap()
    );
    assert!("512".parse::<PixelSize>().is_err());
    assert!("0x5".parse::<PixelSize>().is_err());
}

#[test]
fn fit_aspect_keeps_longer_axis_at_bound() {
    let bounds = PixelSize::new(256, 256).unwrap();
    assert_eq!(
        PixelSize::fit_aspect(2.0, bounds),
        PixelSize::new(256, 128).unwrap()
    );
    assert_eq!(
        PixelSize::fit_aspect(0.5, bounds),
        PixelSize::new(128, 256).unwrap()
    );
    assert_eq!(PixelSize::fit_aspect(1e9, bounds).height, 1);
    assert_eq!(PixelSize::fit_aspect(f64::NAN, bounds), bounds);
}

#[test]
fn rgba_premultiply_roundtrips_for_visible_colors() {
    let c = Rgba::new(0.0, 0.0, 1.0, 0.5);
    assert_eq!(c.premultiplied(), [0.0, 0.0, 0.5, 0.5]);
    assert_eq!(Rgba::from_premultiplied(c.premultiplied()), c);
    assert_eq!(
        Rgba::from_premultiplied([0.3, 0.3, 0.3, 0.0]),
        Rgba::transparent()
    );
}

#[test]
fn rgba_deserializes_arrays_and_objects() {
    let a: Rgba = serde_json::from_str("[1, 0, 0, 0.25]").unwrap();
    assert_eq!(a, Rgba::new(1.0, 0.0, 0.0, 0.25));
    let b: Rgba = serde_json::from_str("[0, 1, 0]").unwrap();
    assert_eq!(b.a, 1.0);
    let c: Rgba = serde_json::from_str(r#"{"r": 2, "g": 0, "b": 0}"#).unwrap();
    assert_eq!(c, Rgba::new(1.0, 0.0, 0.0, 1.0));
}
