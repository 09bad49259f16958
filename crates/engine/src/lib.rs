//! Request-interception and caching engine (the offline layer).
//!
//! This crate sits between a hosting application and the network. Every
//! outgoing request passes through the route classifier, whose result
//! selects a caching strategy; strategies read and write the versioned
//! stores in `overcast-core` and/or perform the real network call. The
//! engine manages its own install → activate lifecycle, seeded from the
//! application-shell manifest and pruned on activation.

pub mod control;
pub mod engine;
pub mod fetch;
pub mod lifecycle;
pub mod request;
pub mod route;
pub mod strategy;

pub use control::{Command, ControlChannel};
pub use engine::Engine;
pub use fetch::{Fetch, FetchConfig, FetchResponse, HttpFetcher};
pub use lifecycle::LifecycleState;
pub use request::{EngineRequest, EngineResponse, ResponseSource};
pub use route::{RouteClass, classify};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted network for deterministic strategy and lifecycle tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::{StatusCode, header::HeaderMap};
    use url::Url;

    use overcast_core::{AppConfig, Error, StoreDb};

    use crate::engine::Engine;
    use crate::fetch::{Fetch, FetchResponse};
    use crate::request::EngineRequest;

    /// Canned responses keyed by URL, with a switchable outage mode and a
    /// request counter. Unknown URLs resolve as 404s.
    #[derive(Default)]
    pub struct ScriptedFetch {
        responses: Mutex<HashMap<String, (u16, Option<String>, Vec<u8>)>>,
        offline: AtomicBool,
        requests: AtomicUsize,
    }

    impl ScriptedFetch {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, url: &str, status: u16, content_type: &str, body: &[u8]) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, Some(content_type.to_string()), body.to_vec()));
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Network("simulated outage".into()));
            }

            let (status, content_type, body) = self
                .responses
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .unwrap_or((404, None, Vec::new()));

            Ok(FetchResponse {
                url: url.clone(),
                final_url: url.clone(),
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                content_type,
                headers: HeaderMap::new(),
                bytes: Bytes::from(body),
                fetch_ms: 0,
            })
        }

        async fn forward(&self, request: &EngineRequest) -> Result<FetchResponse, Error> {
            self.get(&request.url).await
        }
    }

    /// Engine over an in-memory database and the given scripted network.
    pub async fn engine_with(config: AppConfig, fetch: std::sync::Arc<ScriptedFetch>) -> Engine {
        let db = StoreDb::open_in_memory().await.unwrap();
        Engine::new(config, db, fetch)
    }

    /// Script a 200 for every shell-manifest path of `config`.
    pub fn seed_shell(fetch: &ScriptedFetch, config: &AppConfig) {
        let base = Url::parse(&config.base_url).unwrap();
        for path in &config.shell_manifest {
            let url = base.join(path).unwrap();
            let content_type = if path.ends_with(".json") { "application/json" } else { "text/html" };
            fetch.respond(url.as_str(), 200, content_type, format!("shell:{path}").as_bytes());
        }
    }
}
