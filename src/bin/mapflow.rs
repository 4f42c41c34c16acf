use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mapflow", version)]
struct Cli {
    /// Log more (repeat for debug and trace output).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one pipeline output to a PNG.
    Render(RenderArgs),
    /// List the outputs a pipeline exposes.
    Outputs(OutputsArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Pipeline JSON.
    #[arg(long)]
    pipeline: PathBuf,

    /// Name of the output to render.
    #[arg(long)]
    output: String,

    /// Region as `LEFT,BOTTOM,RIGHT,TOP` in `--crs` units.
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: [f64; 4],

    /// CRS of `--bbox`, e.g. `EPSG:3857` or a `+proj=` string.
    #[arg(long, default_value = "EPSG:3857")]
    crs: mapflow::Crs,

    /// Pixel size `WxH`; derived from the bbox aspect ratio when omitted.
    #[arg(long)]
    size: Option<mapflow::PixelSize>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Maximum concurrent tile fetches.
    #[arg(long, default_value_t = 10)]
    fetch_workers: usize,

    /// Per-fetch timeout in seconds.
    #[arg(long, default_value_t = 10)]
    fetch_timeout: u64,

    /// Tolerate envelope corners that cannot be reprojected.
    #[arg(long, default_value_t = false)]
    partial_reprojection: bool,
}

#[derive(Parser, Debug)]
struct OutputsArgs {
    /// Pipeline JSON.
    #[arg(long)]
    pipeline: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Outputs(args) => cmd_outputs(args),
    }
}

fn parse_bbox(s: &str) -> Result<[f64; 4], String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    <[f64; 4]>::try_from(parts)
        .map_err(|parts| format!("expected LEFT,BOTTOM,RIGHT,TOP, got {} values", parts.len()))
}

fn load(path: &PathBuf, opts: mapflow::RenderOpts) -> anyhow::Result<mapflow::Pipeline> {
    let config = mapflow::PipelineConfig::from_path(path)?;
    let tiles_root = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let fetcher = mapflow::SchemeFetcher::new(
        mapflow::HttpFetcher::new(opts.fetch_timeout),
        mapflow::FsFetcher::with_root(tiles_root),
    );
    let ctx = mapflow::RenderContext::new(opts)?.with_fetcher(std::sync::Arc::new(fetcher));
    mapflow::Pipeline::build(&config, ctx)
        .with_context(|| format!("build pipeline '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let opts = mapflow::RenderOpts {
        fetch_workers: args.fetch_workers,
        fetch_timeout: Duration::from_secs(args.fetch_timeout),
        reproject_mode: if args.partial_reprojection {
            mapflow::ReprojectMode::Partial
        } else {
            mapflow::ReprojectMode::Strict
        },
        ..mapflow::RenderOpts::default()
    };
    let pipeline = load(&args.pipeline, opts)?;

    let [left, bottom, right, top] = args.bbox;
    let envelope = mapflow::Envelope::new(left, right, top, bottom, args.crs)?;
    let size = pipeline.resolve_size(&envelope, args.size);
    let content = pipeline.render(&args.output, &envelope, Some(size))?;

    let (data, width, height) = match content.as_raster() {
        Some(r) => (r.to_rgba8(), r.size().width, r.size().height),
        None => {
            tracing::info!(output = %args.output, "nothing to draw, writing transparent image");
            (vec![0u8; size.pixel_count() * 4], size.width, size.height)
        }
    };

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &data,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_outputs(args: OutputsArgs) -> anyhow::Result<()> {
    let pipeline = load(&args.pipeline, mapflow::RenderOpts::default())?;
    for name in pipeline.output_names() {
        println!("{name}");
    }
    Ok(())
}
