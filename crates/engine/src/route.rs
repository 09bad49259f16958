//! Route classification.
//!
//! Pure mapping from an incoming request to the strategy that will handle
//! it. Checks run cheapest-and-most-definitive first: method, scheme,
//! API prefixes, static suffixes/prefixes, navigation flag.

use reqwest::Method;

use overcast_core::AppConfig;

use crate::request::EngineRequest;

/// What a request classified as. Computed once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Not intercepted; handed to the network unmodified.
    Bypass,
    /// API or uploaded-content traffic, served network-first.
    Api,
    /// Script/stylesheet/image/font traffic, served cache-first.
    StaticAsset,
    /// Top-level document load, network-first with the offline document
    /// as terminal fallback.
    Navigation,
    /// Any other GET, served network-first.
    Default,
}

/// Classify a request. No side effects.
pub fn classify(request: &EngineRequest, config: &AppConfig) -> RouteClass {
    if request.method != Method::GET {
        return RouteClass::Bypass;
    }

    match request.url.scheme() {
        "http" | "https" => {}
        _ => return RouteClass::Bypass,
    }

    let path = request.url.path();

    if config.api_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
        return RouteClass::Api;
    }

    if has_static_extension(path, &config.static_extensions)
        || config.static_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    {
        return RouteClass::StaticAsset;
    }

    if request.navigate {
        return RouteClass::Navigation;
    }

    RouteClass::Default
}

/// Extension check on the final path segment, case-insensitive. The query
/// string never reaches here; `Url::path` excludes it.
fn has_static_extension(path: &str, extensions: &[String]) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        }
        _ => false,
    }
}
