use std::collections::HashMap;
use std::sync::Mutex;

use super::*;
use crate::foundation::core::Point;
use crate::foundation::error::FetchError;
use crate::geo::envelope::ReprojectMode;
use crate::geo::transform::CrsTransformer;
use crate::geo::crs::WEB_MERCATOR_HALF_WORLD as H;
use crate::render::context::RenderOpts;
use crate::tiles::fetch::TileFetcher;

#[derive(Default)]
struct MemoryFetcher {
    tiles: HashMap<String, Vec<u8>>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.tiles.insert(url.to_string(), bytes);
        self
    }

    fn requested(&self) -> Vec<String> {
        let mut urls = self.requested.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

impl TileFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.tiles.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

fn png(color: [u8; 4], side: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(side, side, image::Rgba(color));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn node(extra: serde_json::Value) -> TilePyramidNode {
    let mut params = serde_json::json!({ "url": "mem://{zoom}/{x}/{y}" });
    if let (Some(p), Some(e)) = (params.as_object_mut(), extra.as_object()) {
        p.extend(e.clone());
    }
    TilePyramidNode::new(serde_json::from_value(params).unwrap()).unwrap()
}

fn ctx(fetcher: &Arc<MemoryFetcher>) -> RenderContext {
    RenderContext::new(RenderOpts::default())
        .unwrap()
        .with_fetcher(Arc::clone(fetcher) as Arc<dyn TileFetcher>)
}

fn request(left: f64, right: f64, top: f64, bottom: f64, w: u32, h: u32) -> Request {
    Request::new(
        Envelope::new(left, right, top, bottom, Crs::web_mercator()).unwrap(),
        PixelSize::new(w, h).unwrap(),
    )
}

fn assert_px(r: &Raster, x: u32, y: u32, expected: [f32; 4]) {
    let got = r.rgba_at(x, y);
    assert!(
        got.iter().zip(expected).all(|(a, b)| (a - b).abs() < 1e-4),
        "pixel ({x}, {y}) = {got:?}, expected {expected:?}"
    );
}

#[test]
fn full_world_request_fetches_the_root_tile() {
    let fetcher = Arc::new(MemoryFetcher::default().with("mem://0/0/0", png(RED, 256)));
    let out = node(serde_json::json!({}))
        .pull(&ctx(&fetcher), &request(-H, H, H, -H, 256, 256))
        .unwrap();
    let r = out.as_raster().unwrap();
    assert_eq!(r.size(), PixelSize::new(256, 256).unwrap());
    assert_px(r, 0, 0, [1.0, 0.0, 0.0, 1.0]);
    assert_px(r, 128, 128, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(fetcher.requested(), vec!["mem://0/0/0".to_string()]);
}

#[test]
fn columns_wrap_across_the_antimeridian() {
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .with("mem://1/1/0", png(BLUE, 256))
            .with("mem://1/0/0", png(RED, 256)),
    );
    // Half a tile west of the antimeridian, half a tile east of it, at zoom 1.
    let out = node(serde_json::json!({}))
        .pull(&ctx(&fetcher), &request(-1.5 * H, -0.5 * H, H, 0.0, 256, 256))
        .unwrap();
    let r = out.as_raster().unwrap();
    assert_px(r, 10, 100, [0.0, 0.0, 1.0, 1.0]);
    assert_px(r, 200, 100, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(
        fetcher.requested(),
        vec!["mem://1/0/0".to_string(), "mem://1/1/0".to_string()]
    );
}

#[test]
fn rows_beyond_the_pole_stay_transparent() {
    let fetcher = Arc::new(MemoryFetcher::default().with("mem://0/0/0", png(RED, 256)));
    let out = node(serde_json::json!({}))
        .pull(&ctx(&fetcher), &request(-H, 0.0, 2.0 * H, 0.0, 128, 256))
        .unwrap();
    let r = out.as_raster().unwrap();
    assert_px(r, 64, 10, [0.0; 4]);
    assert_px(r, 64, 200, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(fetcher.requested(), vec!["mem://0/0/0".to_string()]);
}

#[test]
fn request_entirely_above_the_world_is_none() {
    let fetcher = Arc::new(MemoryFetcher::default());
    let out = node(serde_json::json!({}))
        .pull(&ctx(&fetcher), &request(-H, H, 3.0 * H, 2.0 * H, 256, 256))
        .unwrap();
    assert!(out.is_none());
    assert!(fetcher.requested().is_empty());
}

#[test]
fn large_request_is_split_and_failed_tiles_leave_holes() {
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .with("mem://1/0/0", png(RED, 256))
            .with("mem://1/1/0", png(RED, 256))
            .with("mem://1/0/1", png(RED, 256)),
    );
    let out = node(serde_json::json!({}))
        .pull(&ctx(&fetcher), &request(-H, H, H, -H, 512, 512))
        .unwrap();
    let r = out.as_raster().unwrap();
    assert_eq!(r.size(), PixelSize::new(512, 512).unwrap());
    assert_px(r, 100, 100, [1.0, 0.0, 0.0, 1.0]);
    assert_px(r, 400, 100, [1.0, 0.0, 0.0, 1.0]);
    assert_px(r, 100, 400, [1.0, 0.0, 0.0, 1.0]);
    assert_px(r, 400, 400, [0.0; 4]);
    assert!(fetcher.requested().contains(&"mem://1/1/1".to_string()));
}

#[test]
fn all_tiles_failing_yields_none() {
    let fetcher = Arc::new(MemoryFetcher::default());
    let out = node(serde_json::json!({}))
        .pull(&ctx(&fetcher), &request(-H, H, H, -H, 256, 256))
        .unwrap();
    assert!(out.is_none());
}

#[test]
fn oversized_tiles_are_resampled_into_their_slot() {
    let fetcher = Arc::new(MemoryFetcher::default().with("mem://0/0/0", png(BLUE, 512)));
    let out = node(serde_json::json!({}))
        .pull(&ctx(&fetcher), &request(-H, H, H, -H, 64, 64))
        .unwrap();
    assert_px(out.as_raster().unwrap(), 32, 32, [0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn tile_cap_skips_expensive_regions() {
    let fetcher = Arc::new(
        MemoryFetcher::default()
            .with("mem://1/1/0", png(BLUE, 256))
            .with("mem://1/0/0", png(RED, 256)),
    );
    let out = node(serde_json::json!({ "max_tiles": 1 }))
        .pull(&ctx(&fetcher), &request(-1.5 * H, -0.5 * H, H, 0.0, 256, 256))
        .unwrap();
    assert!(out.is_none());
    assert!(fetcher.requested().is_empty());
}

#[test]
fn quadkey_templates_are_filled() {
    let fetcher = Arc::new(MemoryFetcher::default().with("mem://q/2", png(RED, 256)));
    // Bottom-left quarter of the world at zoom 1 has quadkey "2".
    let out = node(serde_json::json!({ "url": "mem://q/{quadkey}" }))
        .pull(&ctx(&fetcher), &request(-H, 0.0, 0.0, -H, 256, 256))
        .unwrap();
    assert_px(out.as_raster().unwrap(), 128, 128, [1.0, 0.0, 0.0, 1.0]);
}

fn split_palette_png() -> Vec<u8> {
    let img = image::GrayImage::from_fn(256, 256, |x, _| image::Luma([u8::from(x >= 128)]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn palette_tiles_are_never_blended() {
    let fetcher = Arc::new(MemoryFetcher::default().with("mem://0/0/0", split_palette_png()));
    let node = node(serde_json::json!({
        "max_zoom": 0,
        "palette": [[1, 0, 0, 1], [0, 0, 1, 1]]
    }));
    // Same resolution as the tile, shifted half a pixel east: every destination pixel center
    // falls on a tile pixel boundary.
    let half = H / 256.0;
    let out = node
        .pull(&ctx(&fetcher), &request(-H + half, half, H, -H, 128, 256))
        .unwrap();
    let r = out.as_raster().unwrap();
    assert!(!r.can_interpolate());
    assert_px(r, 10, 100, [1.0, 0.0, 0.0, 1.0]);
    let px = r.rgba_at(127, 100);
    assert!(
        px == [1.0, 0.0, 0.0, 1.0] || px == [0.0, 0.0, 1.0, 1.0],
        "class boundary pixel mixed two palette entries: {px:?}"
    );
}

const ROWS_CRS: u32 = 990_001;

/// Maps a unit-wide, eight-row-tall test CRS onto web Mercator so that row `i` (counted from the
/// top) covers exactly `2H / 2^ROW_ZOOMS[i]` meters vertically and a quarter of the world
/// horizontally.
struct StackedRows {
    ys: Vec<f64>,
}

const ROW_ZOOMS: [u32; 8] = [2, 3, 3, 4, 4, 4, 5, 6];

impl StackedRows {
    fn new() -> Self {
        let mut ys = vec![H];
        for z in ROW_ZOOMS {
            let last = ys[ys.len() - 1];
            ys.push(last - 2.0 * H / f64::from(1u32 << z));
        }
        Self { ys }
    }
}

impl CrsTransformer for StackedRows {
    fn transform(
        &self,
        from: &Crs,
        to: &Crs,
        points: &[Point],
    ) -> MapflowResult<Vec<Option<Point>>> {
        if *from != Crs::Epsg(ROWS_CRS) || *to != Crs::web_mercator() {
            return Err(MapflowError::projection(format!("{from} -> {to}")));
        }
        Ok(points
            .iter()
            .map(|p| {
                let t = (8.0 - p.y).clamp(0.0, 8.0);
                let k = (t.floor() as usize).min(7);
                let f = t - k as f64;
                let y = self.ys[k] + (self.ys[k + 1] - self.ys[k]) * f;
                Some(Point::new((p.x - 0.5) * H / 2.0, y))
            })
            .collect())
    }
}

#[test]
fn split_request_fetches_every_part_at_the_75th_percentile_zoom() {
    let node = node(serde_json::json!({ "tile_size": 16, "max_tiles": 4096 }));
    let req = Request::new(
        Envelope::new(0.0, 1.0, 8.0, 0.0, Crs::Epsg(ROWS_CRS)).unwrap(),
        PixelSize::new(16, 128).unwrap(),
    );

    let rows = StackedRows::new();
    let mut zooms: Vec<u8> = split_request(&req, 16)
        .unwrap()
        .iter()
        .map(|sub| {
            let env = sub
                .req
                .envelope
                .transform_to(&Crs::web_mercator(), 1e-3, ReprojectMode::Strict, &rows)
                .unwrap();
            node.pyramid().select_zoom(&env, sub.req.size)
        })
        .collect();
    zooms.sort_unstable();
    // floor(8 * 0.75) = 6: above the median (4) and below the finest part (6).
    assert_eq!(zooms, vec![2, 3, 3, 4, 4, 4, 5, 6]);

    let fetcher = Arc::new(MemoryFetcher::default());
    let cx = ctx(&fetcher).with_transformer(Arc::new(StackedRows::new()));
    let out = node.pull(&cx, &req).unwrap();
    assert!(out.is_none());

    let urls = fetcher.requested();
    assert!(!urls.is_empty());
    assert!(
        urls.iter().all(|u| u.starts_with("mem://5/")),
        "fetched outside the shared zoom: {urls:?}"
    );
    // The coarsest row starts at the top of the world, the finest one ends in tile row 23.
    assert!(urls.contains(&"mem://5/12/0".to_string()));
    assert!(urls.contains(&"mem://5/19/23".to_string()));
}

#[test]
fn split_request_covers_the_grid() {
    let req = request(0.0, 600.0, 300.0, 0.0, 600, 300);
    let subs = split_request(&req, 256).unwrap();
    assert_eq!(subs.len(), 6);
    let last = subs.last().unwrap();
    assert_eq!((last.x, last.y), (512, 256));
    assert_eq!(last.req.size, PixelSize::new(88, 44).unwrap());
    assert!((last.req.envelope.left() - 512.0).abs() < 1e-9);
    assert!((last.req.envelope.bottom() - 0.0).abs() < 1e-9);
    assert!((last.req.envelope.top() - 44.0).abs() < 1e-9);
}

#[test]
fn non_mercator_pyramid_needs_world_bounds() {
    let params: TilePyramidParams =
        serde_json::from_value(serde_json::json!({ "url": "x", "crs": "EPSG:4326" })).unwrap();
    assert!(TilePyramidNode::new(params).is_err());

    let params: TilePyramidParams = serde_json::from_value(serde_json::json!({
        "url": "x",
        "crs": "EPSG:4326",
        "world": [-180.0, 180.0, 90.0, -90.0]
    }))
    .unwrap();
    let node = TilePyramidNode::new(params).unwrap();
    assert_eq!(node.pyramid().crs(), &Crs::wgs84());
}

#[test]
fn unknown_parameters_are_rejected() {
    let res: Result<TilePyramidParams, _> =
        serde_json::from_value(serde_json::json!({ "url": "x", "zoom": 3 }));
    assert!(res.is_err());
}
