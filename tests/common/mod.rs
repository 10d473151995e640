#![allow(dead_code)]

use axum::extract::ConnectInfo;
use axum_test::TestServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::Layer;

use snaplink::application::services::{AuthService, FailMode, LinkService, RateLimiter};
use snaplink::domain::click_event::ClickEvent;
use snaplink::domain::repositories::LinkRepository;
use snaplink::infrastructure::cache::{KeyValueStore, MemoryStore, ResolutionCache};
use snaplink::infrastructure::persistence::MemoryLinkRepository;
use snaplink::state::AppState;

pub const BASE_URL: &str = "http://sho.rt";

/// Injects a fixed peer address, standing in for `into_make_service_with_connect_info`.
#[derive(Clone)]
pub struct MockConnectInfoLayer(pub SocketAddr);

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService {
            inner,
            addr: self.0,
        }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
    addr: SocketAddr,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(ConnectInfo(self.addr));
        self.inner.call(req)
    }
}

/// Running router backed by in-process stores.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub clicks: mpsc::Receiver<ClickEvent>,
}

impl TestApp {
    /// Bearer header value for `owner_id`.
    pub fn bearer(&self, owner_id: i64) -> String {
        format!("Bearer {}", self.state.auth_service.issue(owner_id))
    }

    /// Creates a link through the API and returns the `data` object.
    pub async fn create_link(&self, owner_id: i64, url: &str, expiration: i64) -> serde_json::Value {
        let response = self
            .server
            .post("/api/url")
            .add_header("Authorization", self.bearer(owner_id))
            .json(&serde_json::json!({ "originalUrl": url, "expiration": expiration }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<serde_json::Value>()["data"].clone()
    }
}

pub fn create_test_state(rate_limit: i64) -> (AppState, mpsc::Receiver<ClickEvent>) {
    let (tx, rx) = mpsc::channel(100);

    let repository: Arc<dyn LinkRepository> = Arc::new(MemoryLinkRepository::new());
    let kv_store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let cache = ResolutionCache::new(kv_store.clone(), Duration::from_secs(1));
    let limiter = RateLimiter::new(
        kv_store.clone(),
        rate_limit,
        Duration::from_secs(60),
        Duration::from_secs(1),
        FailMode::Open,
    );

    let link_service = Arc::new(LinkService::new(
        repository.clone(),
        cache,
        limiter,
        tx.clone(),
        BASE_URL.to_string(),
    ));
    let auth_service = Arc::new(AuthService::new(
        "test-signing-secret".to_string(),
        3600,
    ));

    let state = AppState {
        link_service,
        auth_service,
        kv_store,
        repository,
        click_sender: tx,
        behind_proxy: false,
    };

    (state, rx)
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_rate_limit(1000)
}

pub fn spawn_app_with_rate_limit(rate_limit: i64) -> TestApp {
    let (state, clicks) = create_test_state(rate_limit);
    let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
    let app = snaplink::routes::router(state.clone()).layer(MockConnectInfoLayer(addr));

    TestApp {
        server: TestServer::new(app).unwrap(),
        state,
        clicks,
    }
}
