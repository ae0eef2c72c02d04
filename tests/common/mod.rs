//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sentinel_gateway::backend::{BackendError, BackendReply, BackendRequest, CacheBackend};
use sentinel_gateway::lifecycle::{GatewayError, Lifecycle, Phase, StopReason};
use sentinel_gateway::GatewayConfig;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const WARMUP_PROMPT: &str = "warmup_signal";

/// A programmable engine stand-in.
///
/// Clones share the call counter, so a test can keep one copy and hand the
/// other to the gateway.
#[derive(Clone)]
pub struct MockEngine {
    reply: BackendReply,
    delay: Duration,
    fail: bool,
    calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl MockEngine {
    /// Answers every prompt immediately with `reply`.
    pub fn replying(reply: BackendReply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            fail: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Hit for "hello" style prompts.
    pub fn hit(payload: &str, score: f32) -> Self {
        Self::replying(BackendReply {
            is_hit: true,
            cached_payload: payload.to_string(),
            similarity_score: score,
        })
    }

    /// Sleeps before answering anything but the warmup prompt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails every call, warmup included.
    pub fn unreachable() -> Self {
        let mut engine = Self::hit("", 0.0);
        engine.fail = true;
        engine
    }

    /// Calls seen so far, warmup included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for MockEngine {
    async fn check_cache(
        &self,
        request: BackendRequest,
        _deadline: Instant,
    ) -> Result<BackendReply, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BackendError::Rpc(tonic::Status::unavailable(
                "connection refused",
            )));
        }
        if request.prompt_text != WARMUP_PROMPT && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }
}

/// Config bound to an ephemeral local port.
pub fn test_config(service_timeout_ms: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.service_timeout_ms = Some(service_timeout_ms);
    config.backend.warmup_timeout_ms = service_timeout_ms.max(1_000) * 2;
    config
}

/// A gateway running in the background.
#[allow(dead_code)]
pub struct RunningGateway {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    pub handle: JoinHandle<Result<(), GatewayError>>,
}

#[allow(dead_code)]
impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver a simulated SIGTERM.
    pub fn terminate(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Deliver SIGTERM and wait for the lifecycle to finish.
    pub async fn stop(mut self) -> Result<(), GatewayError> {
        self.terminate();
        self.handle.await.unwrap()
    }
}

/// Start a gateway and wait until it is serving.
pub async fn start_gateway(config: GatewayConfig, engine: MockEngine) -> RunningGateway {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let lifecycle = Lifecycle::new(config);
    let mut phases = lifecycle.subscribe();

    let handle = tokio::spawn(lifecycle.run(
        move |_| Ok(engine),
        async move {
            let _ = stop_rx.await;
            StopReason::Signal("SIGTERM")
        },
    ));

    let addr = tokio::time::timeout(Duration::from_secs(5), async {
        let phase = phases
            .wait_for(|p| matches!(p, Phase::Serving { .. }))
            .await
            .expect("gateway stopped before serving");
        match &*phase {
            Phase::Serving { local_addr } => *local_addr,
            other => panic!("unexpected phase {:?}", other),
        }
    })
    .await
    .expect("gateway did not start in time");

    RunningGateway {
        addr,
        stop: Some(stop_tx),
        handle,
    }
}

/// Client that never pools connections between tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// POST a prompt to the default endpoint.
#[allow(dead_code)]
pub async fn check(
    client: &reqwest::Client,
    gateway: &RunningGateway,
    prompt: &str,
) -> reqwest::Response {
    client
        .post(gateway.url("/v1/cache/check"))
        .header("content-type", "application/json")
        .body(serde_json::json!({ "prompt": prompt }).to_string())
        .send()
        .await
        .expect("gateway unreachable")
}
