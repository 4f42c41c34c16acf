use std::sync::Arc;
use std::time::Duration;

use crate::foundation::error::{MapflowError, MapflowResult};
use crate::geo::envelope::ReprojectMode;
use crate::geo::transform::{CrsTransformer, Proj4Transformer};
use crate::graph::content::Request;
use crate::tiles::fetch::{FsFetcher, HttpFetcher, SchemeFetcher, TileFetcher};

/// Options shared by every pull through a pipeline.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Boundary segment length used when reprojecting envelopes, in destination pixels.
    pub reproject_tolerance_px: f64,
    /// Handling of boundary vertices that cannot be reprojected.
    pub reproject_mode: ReprojectMode,
    /// Maximum number of concurrent tile fetches.
    pub fetch_workers: usize,
    /// Per-fetch timeout.
    pub fetch_timeout: Duration,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            reproject_tolerance_px: 1.0,
            reproject_mode: ReprojectMode::Strict,
            fetch_workers: 10,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Process-lived resources handed to every pull: CRS transformer, tile fetcher and the bounded
/// fetch worker pool.
pub struct RenderContext {
    opts: RenderOpts,
    transformer: Arc<dyn CrsTransformer>,
    fetcher: Arc<dyn TileFetcher>,
    fetch_pool: rayon::ThreadPool,
}

impl RenderContext {
    /// Context using [`Proj4Transformer`] and a [`SchemeFetcher`] honoring `opts.fetch_timeout`.
    pub fn new(opts: RenderOpts) -> MapflowResult<Self> {
        let fetcher = SchemeFetcher::new(
            HttpFetcher::new(opts.fetch_timeout),
            FsFetcher::default(),
        );
        let fetch_pool = build_fetch_pool(opts.fetch_workers)?;
        Ok(Self {
            opts,
            transformer: Arc::new(Proj4Transformer),
            fetcher: Arc::new(fetcher),
            fetch_pool,
        })
    }

    /// Replace the CRS transformer.
    pub fn with_transformer(mut self, transformer: Arc<dyn CrsTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Replace the tile fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn TileFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Render options.
    pub fn opts(&self) -> &RenderOpts {
        &self.opts
    }

    /// CRS transformer.
    pub fn transformer(&self) -> &dyn CrsTransformer {
        self.transformer.as_ref()
    }

    /// Tile fetcher.
    pub fn fetcher(&self) -> &dyn TileFetcher {
        self.fetcher.as_ref()
    }

    /// Bounded pool for tile fetches.
    pub fn fetch_pool(&self) -> &rayon::ThreadPool {
        &self.fetch_pool
    }

    /// Boundary segment length in `req`'s CRS units.
    pub fn tolerance_for(&self, req: &Request) -> f64 {
        self.opts.reproject_tolerance_px * req.resolution()
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

fn build_fetch_pool(workers: usize) -> MapflowResult<rayon::ThreadPool> {
    if workers == 0 {
        return Err(MapflowError::validation("fetch_workers must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("mapflow-fetch-{i}"))
        .build()
        .map_err(|e| MapflowError::validation(format!("failed to build fetch thread pool: {e}")))
}
