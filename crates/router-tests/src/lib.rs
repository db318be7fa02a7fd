//! End-to-end test harness for the router management gateway
//!
//! [`TestServer`] runs the real HTTP stack on an ephemeral localhost port,
//! backed by a [`SimRouter`], and talks to it with `reqwest`.
//!
//! # Test Structure
//!
//! - `e2e.rs` - HTTP scenarios over TCP, shared-session behavior, MCP over a
//!   duplex stream

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use router_api::{create_router, AppState};
use router_core::{Credentials, DispatchConfig, Dispatcher, SessionConfig, SessionManager};
use router_sim::SimRouter;
use serde_json::Value;
use tokio::task::JoinHandle;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "test-password";

/// Build a dispatcher over `sim` with the harness credentials
pub fn dispatcher(sim: &SimRouter, session: SessionConfig, dispatch: DispatchConfig) -> Dispatcher {
    let creds = Credentials::new("192.168.1.1", USERNAME, PASSWORD);
    Dispatcher::new(
        SessionManager::new(Arc::new(sim.clone()), creds, session),
        dispatch,
    )
}

/// HTTP server on 127.0.0.1 with a random port, stopped on drop
pub struct TestServer {
    pub sim: SimRouter,
    pub dispatcher: Arc<Dispatcher>,
    addr: SocketAddr,
    client: Client,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start with default session and dispatch settings
    pub async fn start() -> Self {
        Self::start_with(SessionConfig::default(), DispatchConfig::default()).await
    }

    pub async fn start_with(session: SessionConfig, dispatch: DispatchConfig) -> Self {
        let sim = SimRouter::new(USERNAME, PASSWORD);
        let dispatcher = Arc::new(dispatcher(&sim, session, dispatch));
        let app = create_router(AppState::new(dispatcher.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            sim,
            dispatcher,
            addr,
            client: Client::new(),
            task,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Send a request and return status plus parsed JSON body
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url(), path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.expect("send request");
        let status = response.status();
        let body = response.json::<Value>().await.expect("JSON response body");
        (status, body)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, None).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
