//! Engine-level request and response types.
//!
//! An [`EngineRequest`] is what the hosting application hands to
//! [`Engine::handle`](crate::Engine::handle); an [`EngineResponse`] is what
//! it always gets back for intercepted traffic, real or synthesized.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::{
    Method, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use url::Url;

use overcast_core::StoredResponse;
use overcast_core::store::request_identity;

use crate::fetch::FetchResponse;

/// Fixed offline document served to navigations when neither network nor
/// cache can help and no seeded offline page exists.
const OFFLINE_DOCUMENT: &str = "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Offline</title></head>\n<body><h1>You are offline</h1><p>This page needs a network connection. \
Reconnect and try again.</p></body>\n</html>\n";

/// A request entering the engine.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub method: Method,
    pub url: Url,
    /// Top-level document load. Only the hosting application knows this.
    pub navigate: bool,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl EngineRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, navigate: false, headers: HeaderMap::new(), body: None }
    }

    /// Plain GET.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// GET flagged as a top-level navigation.
    pub fn navigation(url: Url) -> Self {
        Self { navigate: true, ..Self::new(Method::GET, url) }
    }

    /// The cache identity of this request.
    pub fn identity(&self) -> String {
        request_identity(self.method.as_str(), self.url.as_str())
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

/// What the engine returns for every intercepted request.
///
/// Never mutated after construction; the stored copy of a cached body is
/// independent of the one handed back here.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub url: String,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl EngineResponse {
    pub(crate) fn from_network(response: FetchResponse) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            content_type: response.content_type,
            headers: response.headers,
            body: response.bytes,
            source: ResponseSource::Network,
        }
    }

    pub(crate) fn from_stored(entry: StoredResponse) -> Self {
        Self {
            url: entry.url,
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            content_type: entry.content_type,
            headers: headers_from_json(entry.headers_json.as_deref()),
            body: Bytes::from(entry.body),
            source: ResponseSource::Cache,
        }
    }

    /// Generic offline response: empty body, service unavailable.
    pub(crate) fn offline(url: &Url) -> Self {
        Self {
            url: url.to_string(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            content_type: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            source: ResponseSource::Synthesized,
        }
    }

    /// Offline HTML document for navigations.
    pub(crate) fn offline_page(url: &Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        Self {
            url: url.to_string(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            content_type: Some("text/html".to_string()),
            headers,
            body: Bytes::from_static(OFFLINE_DOCUMENT.as_bytes()),
            source: ResponseSource::Synthesized,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Serialize headers as a sorted JSON object for storage. Values that are
/// not valid UTF-8 are skipped.
pub(crate) fn headers_to_json(headers: &HeaderMap) -> Option<String> {
    if headers.is_empty() {
        return None;
    }
    let map: BTreeMap<&str, &str> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    serde_json::to_string(&map).ok()
}

/// Rebuild a header map from its stored JSON form. Unparseable input
/// degrades to an empty map; the cached body is still served.
pub(crate) fn headers_from_json(json: Option<&str>) -> HeaderMap {
    let Some(json) = json else {
        return HeaderMap::new();
    };
    let Ok(map) = serde_json::from_str::<BTreeMap<String, String>>(json) else {
        return HeaderMap::new();
    };

    let mut headers = HeaderMap::new();
    for (name, value) in map {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
            headers.insert(name, value);
        }
    }
    headers
}
