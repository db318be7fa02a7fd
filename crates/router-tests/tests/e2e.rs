//! End-to-end tests over real sockets
//!
//! HTTP requests go through a TCP listener with `reqwest`; the MCP server is
//! driven over an in-memory duplex pipe. Both share one dispatcher where a
//! test needs to observe one front end from the other.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use router_core::{ClientError, DispatchConfig, SessionConfig, SessionPolicy};
use router_mcp::McpServer;
use router_tests::TestServer;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn shared() -> SessionConfig {
    SessionConfig {
        policy: SessionPolicy::Shared,
        serialize_calls: true,
    }
}

#[tokio::test]
async fn devices_over_tcp() {
    let server = TestServer::start().await;
    let clients = json!({
        "AA:BB:CC:DD:EE:01": {"name": "laptop", "ip": "192.168.1.20", "online": true},
        "AA:BB:CC:DD:EE:02": {"name": "phone", "ip": "192.168.1.21", "online": false}
    });
    server.sim.set_clients(clients.clone());

    let (status, body) = server.get("/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "devices": clients }));

    // Unchanged state, identical envelope
    let (_, again) = server.get("/devices").await;
    assert_eq!(again, body);
    assert_eq!(server.sim.stats().connects, 2);
    assert_eq!(server.sim.stats().disconnects, 2);
}

#[tokio::test]
async fn reboot_failure_maps_to_server_error() {
    let server = TestServer::start().await;
    server
        .sim
        .fail_apply(Some(ClientError::Device("timeout".to_string())));

    let (status, body) = server.post("/reboot", json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "Error rebooting router: timeout"}));
    assert_eq!(server.sim.stats().disconnects, 1);
}

#[tokio::test]
async fn unknown_data_type_is_rejected_before_connecting() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/router-data/bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"detail": "Invalid data type: bogus"}));
    assert_eq!(server.sim.stats().connects, 0);

    let (status, body) = server.get("/router-data/temperature").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_type"], json!("TEMPERATURE"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let server = TestServer::start().await;
    let response = reqwest::get(format!("{}/nope", server.base_url()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shared_session_authenticates_once_under_load() {
    let server = Arc::new(TestServer::start_with(shared(), DispatchConfig::default()).await);
    server.sim.set_latency(Duration::from_millis(20));

    let mut tasks = Vec::new();
    for path in ["/cpu", "/ram", "/wan", "/led", "/devices", "/temperature"] {
        let server = server.clone();
        tasks.push(tokio::spawn(async move { server.get(path).await }));
    }
    for task in tasks {
        let (status, _) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let stats = server.sim.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.disconnects, 0);
    assert_eq!(stats.max_concurrent_calls, 1);
    assert!(server.dispatcher.sessions().has_cached_session().await);
}

#[tokio::test]
async fn shared_session_without_gate_runs_calls_concurrently() {
    let session = SessionConfig {
        policy: SessionPolicy::Shared,
        serialize_calls: false,
    };
    let server = Arc::new(TestServer::start_with(session, DispatchConfig::default()).await);
    server.sim.set_latency(Duration::from_millis(100));

    let mut tasks = Vec::new();
    for path in ["/cpu", "/ram", "/wan", "/led", "/devices", "/temperature"] {
        let server = server.clone();
        tasks.push(tokio::spawn(async move { server.get(path).await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().0, StatusCode::OK);
    }

    let stats = server.sim.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.disconnects, 0);
    assert!(
        stats.max_concurrent_calls > 1,
        "calls on the shared handle were serialized: {stats:?}"
    );
}

#[tokio::test]
async fn per_call_sessions_run_in_parallel() {
    let server = Arc::new(TestServer::start().await);
    server.sim.set_latency(Duration::from_millis(50));

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let server = server.clone();
        tasks.push(tokio::spawn(async move { server.get("/cpu").await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().0, StatusCode::OK);
    }

    let stats = server.sim.stats();
    assert_eq!(stats.connects, 4);
    assert_eq!(stats.disconnects, 4);
    assert!(!server.dispatcher.sessions().has_cached_session().await);
}

#[tokio::test]
async fn shared_session_reconnects_after_device_failure() {
    let server = TestServer::start_with(shared(), DispatchConfig::default()).await;

    assert_eq!(server.get("/cpu").await.0, StatusCode::OK);
    server
        .sim
        .fail_fetch(Some(ClientError::Network("connection reset".to_string())));
    let (status, body) = server.get("/cpu").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"detail": "Error fetching CPU usage: Network error: connection reset"})
    );
    assert!(!server.dispatcher.sessions().has_cached_session().await);

    server.sim.fail_fetch(None);
    assert_eq!(server.get("/cpu").await.0, StatusCode::OK);
    assert_eq!(server.sim.stats().connects, 2);
}

#[tokio::test]
async fn shared_session_reconnects_after_router_logout() {
    let server = TestServer::start_with(shared(), DispatchConfig::default()).await;

    assert_eq!(server.get("/wan").await.0, StatusCode::OK);
    server.sim.drop_sessions();
    assert_eq!(server.get("/wan").await.0, StatusCode::OK);
    assert_eq!(server.sim.stats().connects, 2);
}

#[tokio::test]
async fn disconnect_tears_down_shared_session() {
    let server = TestServer::start_with(shared(), DispatchConfig::default()).await;

    let (_, body) = server.post("/disconnect", json!({})).await;
    assert_eq!(
        body,
        json!({"success": true, "message": "No active router session"})
    );

    assert_eq!(server.get("/identity").await.0, StatusCode::OK);
    let (status, body) = server.post("/disconnect", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "message": "Disconnected from router"})
    );
    assert_eq!(server.sim.stats().disconnects, 1);
    assert!(!server.dispatcher.sessions().has_cached_session().await);
}

#[tokio::test]
async fn slow_router_times_out_with_gateway_timeout() {
    let dispatch = DispatchConfig {
        operation_timeout_secs: 1,
        ..DispatchConfig::default()
    };
    let server = TestServer::start_with(SessionConfig::default(), dispatch).await;
    server.sim.set_latency(Duration::from_secs(3));

    let (status, body) = server.get("/ram").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        body,
        json!({"detail": "Error fetching RAM usage: Operation timed out after 1s"})
    );
}

/// Write `messages` to an MCP server over a duplex pipe, return the replies
async fn mcp_exchange(server: McpServer, messages: &[Value]) -> Vec<Value> {
    let (client, server_side) = tokio::io::duplex(1 << 20);
    let (server_read, server_write) = tokio::io::split(server_side);
    let serving = tokio::spawn(async move { server.serve(server_read, server_write).await });

    let (client_read, mut client_write) = tokio::io::split(client);
    for message in messages {
        client_write
            .write_all(format!("{message}\n").as_bytes())
            .await
            .unwrap();
    }
    client_write.shutdown().await.unwrap();

    let mut replies = Vec::new();
    let mut lines = BufReader::new(client_read).lines();
    while replies.len() < messages.iter().filter(|m| m.get("id").is_some()).count() {
        let line = lines.next_line().await.unwrap().expect("reply line");
        replies.push(serde_json::from_str(&line).unwrap());
    }
    serving.await.unwrap().unwrap();
    replies
}

#[tokio::test]
async fn mcp_and_http_share_router_state() {
    let http = TestServer::start().await;
    let mcp = McpServer::new(http.dispatcher.clone());

    let replies = mcp_exchange(
        mcp,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26"}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "set_led_state", "arguments": {"enable": false}}}),
        ],
    )
    .await;

    assert_eq!(replies.len(), 2);
    let call = replies.iter().find(|r| r["id"] == json!(2)).unwrap();
    assert_eq!(
        call["result"]["structuredContent"],
        json!({"success": true, "message": "Applied LED off"})
    );

    let (status, body) = http.get("/led").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"led": {"state": "off"}}));
}

#[tokio::test]
async fn mcp_reports_operation_errors_as_results() {
    let http = TestServer::start().await;
    http.sim.set_bands(vec![router_core::Band::FiveGhz]);
    let mcp = McpServer::new(http.dispatcher.clone());

    let replies = mcp_exchange(
        mcp,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "set_wifi_radio_state",
                              "arguments": {"band": "2.4ghz", "enable": false}}}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "not_a_tool", "arguments": {}}}),
        ],
    )
    .await;

    let radio = replies.iter().find(|r| r["id"] == json!(1)).unwrap();
    assert_eq!(radio["result"]["isError"], json!(false));
    let message = radio["result"]["structuredContent"]["error"]
        .as_str()
        .unwrap();
    assert!(message.contains("not supported"), "{message}");
    assert_eq!(http.sim.stats().applies, 0);

    let unknown = replies.iter().find(|r| r["id"] == json!(2)).unwrap();
    assert_eq!(unknown["error"]["code"], json!(-32602));
}
