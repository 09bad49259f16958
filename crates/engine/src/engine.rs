//! The interception engine.
//!
//! Owns the stores, the fetcher, and the lifecycle state. Request
//! handling lives here; the lifecycle transitions are in
//! [`lifecycle`](crate::lifecycle) and the strategies in
//! [`strategy`](crate::strategy).

use std::sync::Arc;

use tokio::sync::RwLock;

use overcast_core::{AppConfig, Error, StoreDb};

use crate::fetch::{Fetch, FetchConfig, HttpFetcher};
use crate::lifecycle::LifecycleState;
use crate::request::{EngineRequest, EngineResponse};
use crate::route::{RouteClass, classify};

/// Request-routing intermediary between the hosting application and the
/// network.
///
/// Clone-free by design: hosts hold it behind an `Arc` and call
/// [`handle`](Engine::handle) concurrently. Same-identity cache writes may
/// race; the last writer wins, which is safe for idempotent GET snapshots.
pub struct Engine {
    pub(crate) config: AppConfig,
    pub(crate) db: StoreDb,
    pub(crate) fetch: Arc<dyn Fetch>,
    pub(crate) state: RwLock<LifecycleState>,
}

impl Engine {
    /// Assemble an engine in the `Installing` state. Callers normally use
    /// [`bootstrap`](Engine::bootstrap) instead.
    pub fn new(config: AppConfig, db: StoreDb, fetch: Arc<dyn Fetch>) -> Self {
        Self { config, db, fetch, state: RwLock::new(LifecycleState::Installing) }
    }

    /// Open the configured database, build the HTTP fetcher, install this
    /// version, then run the startup version check: with no previously
    /// active version (or our own), activate immediately; otherwise stay
    /// `Waiting` for a promote command.
    pub async fn bootstrap(config: AppConfig) -> Result<Arc<Self>, Error> {
        let db = StoreDb::open(&config.db_path).await?;
        let fetch: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(FetchConfig::from_app(&config))?);
        let engine = Arc::new(Self::new(config, db, fetch));

        engine.install().await?;

        match engine.db.active_version().await? {
            Some(active) if active != engine.config.version => {
                tracing::info!(
                    installed = %engine.config.version,
                    active = %active,
                    "new version installed; waiting for promote"
                );
            }
            _ => engine.activate().await?,
        }

        Ok(engine)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Handle one request.
    ///
    /// Intercepted traffic always resolves to a response, real or
    /// synthesized; only bypass traffic (and anything handled before the
    /// engine is `Active`) can surface a network error, exactly as an
    /// uninterposed request would.
    pub async fn handle(&self, request: EngineRequest) -> Result<EngineResponse, Error> {
        if self.state().await != LifecycleState::Active {
            return Ok(EngineResponse::from_network(self.fetch.forward(&request).await?));
        }

        match classify(&request, &self.config) {
            RouteClass::Bypass => Ok(EngineResponse::from_network(self.fetch.forward(&request).await?)),
            RouteClass::StaticAsset => Ok(self.cache_first(&request).await),
            RouteClass::Api | RouteClass::Default => Ok(self.network_first(&request).await),
            RouteClass::Navigation => Ok(self.network_first_with_offline_page(&request).await),
        }
    }
}
