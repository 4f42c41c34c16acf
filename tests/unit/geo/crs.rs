use super::*;

#[test]
fn parses_epsg_forms() {
    assert_eq!("EPSG:3857".parse::<Crs>().unwrap(), Crs::web_mercator());
    assert_eq!("epsg:4326".parse::<Crs>().unwrap(), Crs::wgs84());
    assert_eq!("32633".parse::<Crs>().unwrap(), Crs::Epsg(32633));
    assert!("mercator".parse::<Crs>().is_err());
}

#[test]
fn parses_proj4_strings_verbatim() {
    let crs: Crs = "+proj=longlat +ellps=sphere".parse().unwrap();
    assert_eq!(crs.proj_string(), Some("+proj=longlat +ellps=sphere"));
    assert!(crs.is_geographic());
}

#[test]
fn utm_zones_resolve() {
    let north = Crs::Epsg(32633).proj_string().unwrap();
    assert!(north.contains("+zone=33 "));
    assert!(!north.contains("+south"));
    let south = Crs::Epsg(32760).proj_string().unwrap();
    assert!(south.contains("+zone=60 +south"));
    assert!(Crs::Epsg(99999).proj_string().is_none());
}

#[test]
fn serde_accepts_codes_and_strings() {
    let a: Crs = serde_json::from_str("3857").unwrap();
    let b: Crs = serde_json::from_str("\"EPSG:3857\"").unwrap();
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), "\"EPSG:3857\"");
}
