//! Response cache middleware.
//!
//! Serves repeated GET requests from [`ResponseStore`] until the entry expires.
//! Anything that is not a plain 200 is passed through untouched.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use super::{CacheConfig, ResponseKey, ResponseStore, store::CachedResponse};

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseStore>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(ResponseStore::new(&config));
        Self { config, store }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseKey::from_uri(request.uri());

    if let Some(cached) = cache.store.get(&key) {
        debug!(cache = "response", outcome = "hit", key = %key, "serving cached response");
        return build_response(cached);
    }

    debug!(cache = "response", outcome = "miss", key = %key, "rendering response");

    let response = next.run(request).await;
    if !is_cacheable(&response, cache.config.max_body_bytes) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(key = %key, error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if bytes.len() > cache.config.max_body_bytes {
        debug!(
            cache = "response",
            key = %key,
            body_bytes = bytes.len(),
            "body exceeds cache limit; not stored"
        );
        return Response::from_parts(parts, Body::from(bytes));
    }

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    cache.store.set(key, cached);

    Response::from_parts(parts, Body::from(bytes))
}

/// Only shared, successful responses of known bounded size are stored.
fn is_cacheable(response: &Response, max_body_bytes: usize) -> bool {
    if response.status() != StatusCode::OK || response.headers().contains_key(header::SET_COOKIE) {
        return false;
    }
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_none_or(|length| length <= max_body_bytes)
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Router, middleware::from_fn_with_state, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn counting_router(cache: CacheState, hits: Arc<AtomicUsize>) -> Router {
        let counter = hits.clone();
        Router::new()
            .route(
                "/",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        format!("render {n}")
                    }
                }),
            )
            .route(
                "/missing",
                get(|| async { (StatusCode::NOT_FOUND, "nope") }),
            )
            .route(
                "/session",
                get(|| async { ([(header::SET_COOKIE, "sid=1")], "private") }),
            )
            .layer(from_fn_with_state(cache, response_cache_layer))
    }

    async fn body_of(router: &Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, String::from_utf8(bytes.to_vec()).expect("utf8"))
    }

    #[tokio::test]
    async fn second_get_is_served_from_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_router(CacheState::new(CacheConfig::default()), hits.clone());

        assert_eq!(body_of(&router, "/").await.1, "render 1");
        assert_eq!(body_of(&router, "/").await.1, "render 1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert_eq!(body_of(&router, "/?page=2").await.1, "render 2");
    }

    #[tokio::test]
    async fn disabled_cache_always_renders() {
        let hits = Arc::new(AtomicUsize::new(0));
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let router = counting_router(CacheState::new(config), hits.clone());

        body_of(&router, "/").await;
        body_of(&router, "/").await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_ok_and_cookie_responses_are_not_stored() {
        let cache = CacheState::new(CacheConfig::default());
        let router = counting_router(cache.clone(), Arc::new(AtomicUsize::new(0)));

        assert_eq!(body_of(&router, "/missing").await.0, StatusCode::NOT_FOUND);
        assert_eq!(body_of(&router, "/session").await.0, StatusCode::OK);
        assert!(cache.store.is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_served_but_not_stored() {
        let config = CacheConfig {
            max_body_bytes: 4,
            ..Default::default()
        };
        let cache = CacheState::new(config);
        let hits = Arc::new(AtomicUsize::new(0));
        let router = counting_router(cache.clone(), hits.clone());

        assert_eq!(body_of(&router, "/").await, (StatusCode::OK, "render 1".to_string()));
        assert_eq!(body_of(&router, "/").await.1, "render 2");
        assert!(cache.store.is_empty());
    }

    #[tokio::test]
    async fn clear_forces_a_fresh_render() {
        let hits = Arc::new(AtomicUsize::new(0));
        let cache = CacheState::new(CacheConfig::default());
        let router = counting_router(cache.clone(), hits.clone());

        body_of(&router, "/").await;
        cache.store.clear();
        assert_eq!(body_of(&router, "/").await.1, "render 2");
    }
}
