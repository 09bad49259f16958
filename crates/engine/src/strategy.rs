//! Caching strategies.
//!
//! Strategies are infallible at the signature level: every intercepted
//! request resolves to an [`EngineResponse`], real or synthesized. Network
//! failures are recovered locally; store failures in the write-through
//! path degrade to warnings and never block the primary response.

use url::Url;

use overcast_core::store::request_identity;

use crate::engine::Engine;
use crate::fetch::FetchResponse;
use crate::request::{EngineRequest, EngineResponse};

impl Engine {
    /// Cache-first: serve any stored entry without touching the network;
    /// on a miss, fetch and capture.
    pub(crate) async fn cache_first(&self, request: &EngineRequest) -> EngineResponse {
        if let Some(entry) = self.lookup(&request.identity(), &request.url).await {
            tracing::debug!(url = %request.url, store = %entry.store, "cache hit");
            return EngineResponse::from_stored(entry);
        }

        match self.fetch.get(&request.url).await {
            Ok(response) => {
                self.write_through(request, &response).await;
                EngineResponse::from_network(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "offline with empty cache");
                EngineResponse::offline(&request.url)
            }
        }
    }

    /// Network-first: prefer a fresh response, refreshing the dynamic
    /// store on the way; fall back to cache only when the network fails.
    pub(crate) async fn network_first(&self, request: &EngineRequest) -> EngineResponse {
        match self.fetch.get(&request.url).await {
            Ok(response) => {
                self.write_through(request, &response).await;
                EngineResponse::from_network(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed; trying cache");
                match self.lookup(&request.identity(), &request.url).await {
                    Some(entry) => EngineResponse::from_stored(entry),
                    None => EngineResponse::offline(&request.url),
                }
            }
        }
    }

    /// Network-first whose terminal fallback is the offline document, so
    /// navigations never surface a raw connection error.
    pub(crate) async fn network_first_with_offline_page(&self, request: &EngineRequest) -> EngineResponse {
        match self.fetch.get(&request.url).await {
            Ok(response) => {
                self.write_through(request, &response).await;
                EngineResponse::from_network(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed; trying cache");
                if let Some(entry) = self.lookup(&request.identity(), &request.url).await {
                    return EngineResponse::from_stored(entry);
                }
                self.offline_document(&request.url).await
            }
        }
    }

    /// The seeded offline document if the shell holds one, else the fixed
    /// synthesized page.
    async fn offline_document(&self, url: &Url) -> EngineResponse {
        if let Ok(base) = Url::parse(&self.config.base_url) {
            if let Ok(offline_url) = base.join(&self.config.offline_path) {
                let identity = request_identity("GET", offline_url.as_str());
                if let Some(entry) = self.lookup(&identity, &offline_url).await {
                    return EngineResponse::from_stored(entry);
                }
            }
        }
        EngineResponse::offline_page(url)
    }

    /// Identity lookup that treats store errors as misses.
    async fn lookup(&self, identity: &str, url: &Url) -> Option<overcast_core::StoredResponse> {
        match self.db.match_identity(identity).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "store lookup failed; treating as miss");
                None
            }
        }
    }

    /// Best-effort capture into the dynamic store. Gated on a success
    /// status (error pages never poison the cache) and the body cap.
    async fn write_through(&self, request: &EngineRequest, response: &FetchResponse) {
        if !response.status.is_success() {
            return;
        }
        if response.bytes.len() > self.config.max_body_bytes {
            tracing::debug!(url = %request.url, bytes = response.bytes.len(), "body over cap; not cached");
            return;
        }

        let store = self.config.dynamic_store();
        let entry = response.to_stored(&store, request.method.as_str());
        if let Err(e) = self.db.put(&entry).await {
            tracing::warn!(url = %request.url, error = %e, "write-through failed; returning live response");
            return;
        }

        if let Some(max) = self.config.max_dynamic_entries {
            if let Err(e) = self.db.prune_oldest(&store, max).await {
                tracing::warn!(store = %store, error = %e, "dynamic store prune failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use url::Url;

    use overcast_core::AppConfig;

    use crate::request::{EngineRequest, ResponseSource};
    use crate::testing::{ScriptedFetch, engine_with};

    fn static_request(url: &str) -> EngineRequest {
        EngineRequest::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_cache_first_short_circuits_network() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.respond("https://example.com/style.css", 200, "text/css", b"a{color:red}");
        let engine = engine_with(AppConfig::default(), fetch.clone()).await;

        let request = static_request("https://example.com/style.css");

        // Miss populates the dynamic store.
        let first = engine.cache_first(&request).await;
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(fetch.request_count(), 1);

        // Hit returns without a network call, even with the network down.
        fetch.set_offline(true);
        let second = engine.cache_first(&request).await;
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.body, first.body);
        assert_eq!(fetch.request_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_offline_miss_synthesizes() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.set_offline(true);
        let engine = engine_with(AppConfig::default(), fetch).await;

        let response = engine.cache_first(&static_request("https://example.com/app.js")).await;

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.source, ResponseSource::Synthesized);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_cache_first_does_not_cache_error_status() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.respond("https://example.com/gone.css", 404, "text/html", b"not found");
        let engine = engine_with(AppConfig::default(), fetch.clone()).await;

        let request = static_request("https://example.com/gone.css");
        let response = engine.cache_first(&request).await;

        // The live 404 is returned unchanged but never stored.
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(engine.db.match_identity(&request.identity()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_first_prefers_fresh_then_replays_cached() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.respond("https://example.com/api/dogs", 200, "application/json", b"[\"rex\"]");
        let engine = engine_with(AppConfig::default(), fetch.clone()).await;

        let request = static_request("https://example.com/api/dogs");

        let live = engine.network_first(&request).await;
        assert_eq!(live.source, ResponseSource::Network);
        assert_eq!(live.body, &b"[\"rex\"]"[..]);

        // Offline replay of the same identity serves the captured body.
        fetch.set_offline(true);
        let replay = engine.network_first(&request).await;
        assert_eq!(replay.source, ResponseSource::Cache);
        assert_eq!(replay.body, live.body);
        assert_eq!(replay.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_network_first_refreshes_stale_entry() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.respond("https://example.com/api/dogs", 200, "application/json", b"[]");
        let engine = engine_with(AppConfig::default(), fetch.clone()).await;

        let request = static_request("https://example.com/api/dogs");
        engine.network_first(&request).await;

        // Fresh fetch overwrites the entry; last writer wins.
        fetch.respond("https://example.com/api/dogs", 200, "application/json", b"[\"rex\"]");
        engine.network_first(&request).await;

        fetch.set_offline(true);
        let replay = engine.network_first(&request).await;
        assert_eq!(replay.body, &b"[\"rex\"]"[..]);
    }

    #[tokio::test]
    async fn test_network_first_offline_no_cache_synthesizes() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.set_offline(true);
        let engine = engine_with(AppConfig::default(), fetch).await;

        let response = engine.network_first(&static_request("https://example.com/api/dogs")).await;

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.source, ResponseSource::Synthesized);
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_seeded_offline_document() {
        let fetch = Arc::new(ScriptedFetch::new());
        let config = AppConfig::default();
        let engine = engine_with(config.clone(), fetch.clone()).await;

        // Shell install seeded the offline document.
        let entry = overcast_core::StoredResponse::new(
            config.shell_store(),
            "GET",
            "http://localhost:3000/offline.html",
            200,
            Some("text/html".into()),
            None,
            b"<h1>offline page</h1>".to_vec(),
        );
        engine.db.put(&entry).await.unwrap();

        fetch.set_offline(true);
        let request = EngineRequest::navigation(Url::parse("http://localhost:3000/dogs/42").unwrap());
        let response = engine.network_first_with_offline_page(&request).await;

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body, &b"<h1>offline page</h1>"[..]);
    }

    #[tokio::test]
    async fn test_navigation_total_failure_synthesizes_html() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.set_offline(true);
        let engine = engine_with(AppConfig::default(), fetch).await;

        let request = EngineRequest::navigation(Url::parse("http://localhost:3000/").unwrap());
        let response = engine.network_first_with_offline_page(&request).await;

        assert!(!response.status.is_success());
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
        assert!(!response.body.is_empty());
    }

    #[tokio::test]
    async fn test_navigation_prefers_per_url_cache_over_offline_document() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.respond("http://localhost:3000/dogs/42", 200, "text/html", b"<h1>rex</h1>");
        let engine = engine_with(AppConfig::default(), fetch.clone()).await;

        let request = EngineRequest::navigation(Url::parse("http://localhost:3000/dogs/42").unwrap());
        engine.network_first_with_offline_page(&request).await;

        fetch.set_offline(true);
        let replay = engine.network_first_with_offline_page(&request).await;
        assert_eq!(replay.body, &b"<h1>rex</h1>"[..]);
    }

    #[tokio::test]
    async fn test_write_through_respects_body_cap() {
        let fetch = Arc::new(ScriptedFetch::new());
        fetch.respond("https://example.com/huge.js", 200, "text/javascript", &[0u8; 64]);
        let config = AppConfig { max_body_bytes: 16, ..Default::default() };
        let engine = engine_with(config, fetch.clone()).await;

        let request = static_request("https://example.com/huge.js");
        let response = engine.cache_first(&request).await;

        // Returned in full, just not cached.
        assert_eq!(response.body.len(), 64);
        assert!(engine.db.match_identity(&request.identity()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dynamic_store_capacity_bound() {
        let fetch = Arc::new(ScriptedFetch::new());
        let config = AppConfig { max_dynamic_entries: Some(2), ..Default::default() };
        let engine = engine_with(config.clone(), fetch.clone()).await;

        for i in 0..4 {
            let url = format!("https://example.com/api/item/{i}");
            fetch.respond(&url, 200, "application/json", b"{}");
            engine.network_first(&static_request(&url)).await;
        }

        assert!(engine.db.count_entries(&config.dynamic_store()).await.unwrap() <= 2);
    }
}
