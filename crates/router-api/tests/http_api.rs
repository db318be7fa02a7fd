//! HTTP API tests against the simulated router
//!
//! Requests go through the full axum router in-process (`tower::ServiceExt`);
//! the simulator's counters show what reached the router.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use router_api::{create_router, AppState};
use router_core::{
    Band, ClientError, Credentials, DispatchConfig, Dispatcher, SessionConfig, SessionManager,
};
use router_sim::SimRouter;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(sim: &SimRouter, password: &str, dispatch: DispatchConfig) -> Router {
    let creds = Credentials::new("192.168.1.1", "admin", password);
    let sessions = SessionManager::new(Arc::new(sim.clone()), creds, SessionConfig::default());
    let dispatcher = Dispatcher::new(sessions, dispatch);
    create_router(AppState::new(Arc::new(dispatcher)))
}

fn app(sim: &SimRouter) -> Router {
    app_with(sim, "secret", DispatchConfig::default())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn root_banner() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Router API is running"}));
}

#[tokio::test]
async fn health_does_not_touch_the_router() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["session_policy"], json!("per_call"));
    assert_eq!(sim.stats().connects, 0);
}

#[tokio::test]
async fn devices_are_returned_under_devices_key() {
    let sim = SimRouter::new("admin", "secret");
    let clients = json!({"AA:BB:CC:DD:EE:01": {"name": "laptop", "online": true}});
    sim.set_clients(clients.clone());

    let (status, body) = send(app(&sim), Method::GET, "/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "devices": clients }));

    let stats = sim.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.disconnects, 1);
}

#[tokio::test]
async fn unknown_data_type_is_bad_request() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::GET, "/router-data/bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"detail": "Invalid data type: bogus"}));
    assert_eq!(sim.stats().connects, 0);
}

#[tokio::test]
async fn generic_data_route_is_case_insensitive() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::GET, "/router-data/wan", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_type"], json!("WAN"));
    assert_eq!(body["data"]["status"], json!("connected"));
}

#[tokio::test]
async fn available_data_types_lists_catalog_without_session() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::GET, "/available-data-types", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_types"].as_array().unwrap().len(), 29);
    assert_eq!(sim.stats().connects, 0);
}

#[tokio::test]
async fn reboot_device_failure_is_internal_error_with_context() {
    let sim = SimRouter::new("admin", "secret");
    sim.fail_apply(Some(ClientError::Device("timeout".to_string())));

    let (status, body) = send(app(&sim), Method::POST, "/reboot", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "Error rebooting router: timeout"}));
    assert_eq!(sim.stats().disconnects, 1);
}

#[tokio::test]
async fn reboot_success_carries_note() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::POST, "/reboot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        body["note"],
        json!("It may take 1-2 minutes for the router to come back online.")
    );
    assert_eq!(sim.state().reboot_count, 1);
}

#[tokio::test]
async fn bad_credentials_are_bad_gateway() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) =
        send(app_with(&sim, "wrong", DispatchConfig::default()), Method::GET, "/wan", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["detail"],
        json!("Error fetching WAN status: Authentication failed: Invalid username or password")
    );
}

#[tokio::test(start_paused = true)]
async fn slow_router_is_gateway_timeout() {
    let sim = SimRouter::new("admin", "secret");
    sim.set_latency(Duration::from_secs(10));
    let dispatch = DispatchConfig {
        operation_timeout_secs: 2,
        ..DispatchConfig::default()
    };

    let (status, body) = send(app_with(&sim, "secret", dispatch), Method::GET, "/cpu", None).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        body["detail"],
        json!("Error fetching CPU usage: Operation timed out after 2s")
    );
}

#[tokio::test]
async fn empty_result_is_informational_success() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::GET, "/dsl", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "No DSL data available"}));
}

#[tokio::test]
async fn led_change_is_visible_on_next_read() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(
        app(&sim),
        Method::POST,
        "/led",
        Some(json!({"enable": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "Applied LED off"}));

    let (_, body) = send(app(&sim), Method::GET, "/led", None).await;
    assert_eq!(body, json!({"led": {"state": "off"}}));
}

#[tokio::test]
async fn unsupported_band_is_rejected_before_apply() {
    let sim = SimRouter::new("admin", "secret");
    sim.set_bands(vec![Band::FiveGhz]);

    let (status, body) = send(
        app(&sim),
        Method::POST,
        "/wlan/radio",
        Some(json!({"band": "2.4ghz", "enable": false})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        json!("Error setting WiFi radio state: Band 2.4ghz is not supported by this router")
    );
    assert_eq!(sim.stats().applies, 0);
}

#[tokio::test]
async fn invalid_band_name_never_connects() {
    let sim = SimRouter::new("admin", "secret");
    let (status, _) = send(
        app(&sim),
        Method::POST,
        "/wlan/radio",
        Some(json!({"band": "60ghz", "enable": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(sim.stats().connects, 0);
}

#[tokio::test]
async fn path_id_is_bound_and_range_checked() {
    let sim = SimRouter::new("admin", "secret");
    let (status, _) = send(
        app(&sim),
        Method::POST,
        "/vpn/openvpn/clients/2",
        Some(json!({"enable": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(sim.state().openvpn_clients[1]);

    let (status, body) = send(
        app(&sim),
        Method::POST,
        "/vpn/openvpn/clients/9",
        Some(json!({"enable": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], json!("client_id must be between 1 and 5"));
}

#[tokio::test]
async fn query_parameters_are_coerced() {
    let sim = SimRouter::new("admin", "secret");
    let (status, body) = send(app(&sim), Method::GET, "/identity?force=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["model"], json!("RT-AX86U"));
    assert_eq!(sim.stats().identity_calls, 1);
}

#[tokio::test]
async fn port_forwarding_rules_can_be_added_and_removed() {
    let sim = SimRouter::new("admin", "secret");
    let rule = json!({
        "name": "nas",
        "external_port": 8443,
        "internal_ip": "192.168.1.30",
        "internal_port": 443,
        "protocol": "tcp"
    });
    let (status, _) = send(app(&sim), Method::POST, "/port-forwarding/rules", Some(rule)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sim.state().port_forward_rules.len(), 1);

    let (status, body) = send(
        app(&sim),
        Method::DELETE,
        "/port-forwarding/rules",
        Some(json!({"external_port": 8443, "protocol": "tcp"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(sim.state().port_forward_rules.is_empty());
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let sim = SimRouter::new("admin", "secret");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/led")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app(&sim).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(sim.stats().connects, 0);
}

#[tokio::test]
async fn missing_feature_is_bad_request() {
    let sim = SimRouter::new("admin", "secret");
    sim.update_state(|state| state.identity.capabilities.aura = false);

    let (status, body) = send(
        app(&sim),
        Method::POST,
        "/aura",
        Some(json!({"mode": "rainbow"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"detail": "Error setting Aura mode: Not supported: Aura RGB is not available on RT-AX86U"})
    );
    assert_eq!(sim.stats().applies, 1);
}
