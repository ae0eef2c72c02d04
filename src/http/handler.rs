//! The cache-check request handler.
//!
//! Each step short-circuits: method check, body decode, deadline derivation,
//! backend call, response encoding.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::Response;
use tokio::time::Instant;

use crate::backend::{self, BackendRequest, CacheBackend};
use crate::config::GatewayConfig;
use crate::http::{request, response};
use crate::observability::metrics;
use crate::resilience::timeouts;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn CacheBackend>,
    pub service_timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &GatewayConfig) -> Self {
        Self {
            backend,
            service_timeout: config.timeouts.service_timeout(),
            max_body_bytes: config.listener.max_body_bytes,
        }
    }
}

/// `POST <endpoint_path>`: ask the backend whether the prompt is cached.
pub async fn check_cache(State(state): State<AppState>, req: Request) -> Response {
    let response = handle(&state, req).await;
    metrics::record_request(response.status().as_u16());
    response
}

async fn handle(state: &AppState, req: Request) -> Response {
    let arrived = Instant::now();
    let request_id = request::request_id(req.headers());

    if req.method() != Method::POST {
        tracing::debug!(request_id = %request_id, method = %req.method(), "Rejected method");
        return response::method_not_allowed();
    }

    let caller_deadline = timeouts::caller_deadline(req.headers(), arrived);

    let api_req = match request::read_body(req.into_body(), state.max_body_bytes).await {
        Ok(bytes) => match request::decode(&bytes) {
            Ok(api_req) => api_req,
            Err(e) => {
                tracing::debug!(request_id = %request_id, error = %e, "Decoding error");
                return response::bad_request();
            }
        },
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Body read error");
            return response::bad_request();
        }
    };

    let deadline =
        timeouts::effective_deadline(Instant::now(), state.service_timeout, caller_deadline);

    let started = std::time::Instant::now();
    let backend_request = BackendRequest {
        prompt_text: api_req.prompt,
    };
    let reply = match backend::invoke(state.backend.as_ref(), backend_request, deadline).await {
        Ok(reply) => {
            metrics::record_backend_call("ok", started);
            reply
        }
        Err(e) => {
            metrics::record_backend_call(e.kind(), started);
            tracing::error!(request_id = %request_id, error = %e, "RPC error encountered");
            return response::internal_error();
        }
    };

    let api_res = response::CheckCacheApiResponse::from(reply);
    match serde_json::to_vec(&api_res) {
        Ok(payload) => response::json(payload),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Marshal error");
            response::internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendReply};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replies with a fixed result after an optional delay, recording every call.
    struct MockBackend {
        reply: BackendReply,
        delay: Duration,
        calls: Mutex<Vec<(BackendRequest, Instant)>>,
    }

    impl MockBackend {
        fn new(reply: BackendReply) -> Arc<Self> {
            Self::slow(reply, Duration::ZERO)
        }

        fn slow(reply: BackendReply, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply,
                delay,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(BackendRequest, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CacheBackend for MockBackend {
        async fn check_cache(
            &self,
            request: BackendRequest,
            deadline: Instant,
        ) -> Result<BackendReply, BackendError> {
            self.calls.lock().unwrap().push((request, deadline));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.reply.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn check_cache(
            &self,
            _request: BackendRequest,
            _deadline: Instant,
        ) -> Result<BackendReply, BackendError> {
            Err(BackendError::Rpc(tonic::Status::unavailable(
                "engine socket /tmp/sentinel.sock refused",
            )))
        }
    }

    fn hit() -> BackendReply {
        BackendReply {
            is_hit: true,
            cached_payload: "bar".into(),
            similarity_score: 0.92,
        }
    }

    fn app(backend: Arc<dyn CacheBackend>, service_timeout: Duration) -> axum::Router {
        let state = AppState {
            backend,
            service_timeout,
            max_body_bytes: 1024,
        };
        crate::http::server::router("/v1/cache/check", state)
    }

    fn post(body: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri("/v1/cache/check")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn maps_backend_reply_to_json() {
        let backend = MockBackend::new(hit());
        let res = app(backend.clone(), Duration::from_millis(15))
            .oneshot(post(r#"{"prompt": "foo"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "application/json");
        let value: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert_eq!(value["is_hit"], true);
        assert_eq!(value["cache_payload"], "bar");
        let score = value["similarity_score"].as_f64().unwrap();
        assert!((score - 0.92).abs() < 1e-6, "score was {}", score);

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.prompt_text, "foo");
    }

    #[tokio::test]
    async fn empty_prompt_is_forwarded() {
        let backend = MockBackend::new(hit());
        let res = app(backend.clone(), Duration::from_millis(15))
            .oneshot(post(r#"{"prompt": ""}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(backend.calls()[0].0.prompt_text, "");
    }

    #[tokio::test]
    async fn non_post_is_rejected_without_backend_call() {
        let backend = MockBackend::new(hit());
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let req = axum::http::Request::builder()
                .method(method.clone())
                .uri("/v1/cache/check")
                .body(Body::from(r#"{"prompt": "foo"}"#))
                .unwrap();
            let res = app(backend.clone(), Duration::from_millis(15))
                .oneshot(req)
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_backend_call() {
        let backend = MockBackend::new(hit());
        for body in ["", "{}", r#"{"prompt": 1}"#, "not json", r#"{"prompt": "foo""#] {
            let res = app(backend.clone(), Duration::from_millis(15))
                .oneshot(post(body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
            assert_eq!(body_string(res).await, "Bad Request");
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_bad_request() {
        let backend = MockBackend::new(hit());
        let prompt = "x".repeat(4096);
        let res = app(backend.clone(), Duration::from_millis(15))
            .oneshot(post(&format!(r#"{{"prompt": "{}"}}"#, prompt)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_yields_opaque_500() {
        let backend = MockBackend::slow(hit(), Duration::from_secs(1));
        let res = app(backend, Duration::from_millis(2))
            .oneshot(post(r#"{"prompt": "foo"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(res).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn backend_error_detail_is_not_exposed() {
        let res = app(Arc::new(FailingBackend), Duration::from_millis(15))
            .oneshot(post(r#"{"prompt": "foo"}"#))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(res).await;
        assert_eq!(body, "Internal Server Error");
        assert!(!body.contains("sentinel.sock"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_service_timeout_without_caller_budget() {
        let backend = MockBackend::new(hit());
        let now = Instant::now();
        app(backend.clone(), Duration::from_millis(15))
            .oneshot(post(r#"{"prompt": "foo"}"#))
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].1, now + Duration::from_millis(15));
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_caller_budget_tightens_deadline() {
        let backend = MockBackend::new(hit());
        let now = Instant::now();
        let mut req = post(r#"{"prompt": "foo"}"#);
        req.headers_mut()
            .insert(timeouts::X_REQUEST_TIMEOUT_MS, "3".parse().unwrap());

        app(backend.clone(), Duration::from_millis(15))
            .oneshot(req)
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].1, now + Duration::from_millis(3));
    }

    #[tokio::test(start_paused = true)]
    async fn longer_caller_budget_keeps_service_timeout() {
        let backend = MockBackend::new(hit());
        let now = Instant::now();
        let mut req = post(r#"{"prompt": "foo"}"#);
        req.headers_mut()
            .insert(timeouts::X_REQUEST_TIMEOUT_MS, "500".parse().unwrap());

        app(backend.clone(), Duration::from_millis(15))
            .oneshot(req)
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].1, now + Duration::from_millis(15));
    }

    #[tokio::test]
    async fn response_carries_request_id() {
        let backend = MockBackend::new(hit());
        let res = app(backend, Duration::from_millis(15))
            .oneshot(post(r#"{"prompt": "foo"}"#))
            .await
            .unwrap();
        assert!(res.headers().contains_key(request::X_REQUEST_ID));
    }
}
