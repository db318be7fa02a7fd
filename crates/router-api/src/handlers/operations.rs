//! Operation handlers
//!
//! Every route maps to one catalog operation. Query parameters, the JSON body
//! and the path parameter are merged into the operation's argument object and
//! handed to the dispatcher; string inputs are coerced to the declared
//! parameter type first.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Json;
use router_core::{catalog, Envelope, ParamType};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// HTTP method of an operation route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Delete,
}

impl Verb {
    fn filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Delete => MethodFilter::DELETE,
        }
    }
}

/// An HTTP route bound to a catalog operation
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub verb: Verb,
    pub path: &'static str,
    pub operation: &'static str,
    /// Argument the single path parameter binds to
    pub path_arg: Option<&'static str>,
}

const fn get(path: &'static str, operation: &'static str) -> Route {
    Route {
        verb: Verb::Get,
        path,
        operation,
        path_arg: None,
    }
}

const fn post(path: &'static str, operation: &'static str) -> Route {
    Route {
        verb: Verb::Post,
        path,
        operation,
        path_arg: None,
    }
}

const fn post_with(path: &'static str, operation: &'static str, arg: &'static str) -> Route {
    Route {
        verb: Verb::Post,
        path,
        operation,
        path_arg: Some(arg),
    }
}

pub static ROUTES: &[Route] = &[
    get("/devices", "get_connected_devices"),
    get("/wlan", "get_wlan_status"),
    get("/guest-wlan", "get_guest_wlan_status"),
    get("/network", "get_network_stats"),
    get("/parental-control", "get_parental_control"),
    get("/aimesh", "get_aimesh_nodes"),
    get("/system", "get_system_info"),
    get("/cpu", "get_cpu_usage"),
    get("/ram", "get_ram_usage"),
    get("/temperature", "get_temperature"),
    get("/wan", "get_wan_status"),
    get("/port-forwarding", "get_port_forwarding"),
    get("/vpn/openvpn/clients", "get_openvpn_client_status"),
    get("/vpn/openvpn/servers", "get_openvpn_server_status"),
    get("/vpn/wireguard/clients", "get_wireguard_client_status"),
    get("/vpn/wireguard/servers", "get_wireguard_server_status"),
    get("/vpn/fusion", "get_vpn_fusion_status"),
    get("/led", "get_led_state"),
    get("/aura", "get_aura_state"),
    get("/firmware", "get_firmware_info"),
    get("/firmware/notes", "get_firmware_notes"),
    get("/boot-time", "get_boot_time"),
    get("/dsl", "get_dsl_status"),
    get("/ports", "get_port_status"),
    get("/device-map", "get_device_map"),
    get("/flags", "get_router_flags"),
    get("/speedtest", "get_speedtest_status"),
    get("/speedtest/result", "get_speedtest_result"),
    get("/ping", "get_ping_status"),
    Route {
        verb: Verb::Get,
        path: "/router-data/{data_type}",
        operation: "get_router_data",
        path_arg: Some("data_type"),
    },
    get("/identity", "get_router_identity"),
    get("/available-data-types", "list_data_types"),
    post("/reboot", "reboot_router"),
    post("/services/restart", "restart_service"),
    post("/wlan/radio", "set_wifi_radio_state"),
    post("/guest-wlan", "set_guest_wlan_state"),
    post("/led", "set_led_state"),
    post("/aura", "set_aura_mode"),
    post_with("/vpn/openvpn/clients/{id}", "control_openvpn_client", "client_id"),
    post_with("/vpn/openvpn/servers/{id}", "control_openvpn_server", "server_id"),
    post_with("/vpn/wireguard/clients/{id}", "control_wireguard_client", "client_id"),
    post_with("/vpn/wireguard/servers/{id}", "control_wireguard_server", "server_id"),
    post_with("/vpn/fusion/{id}", "control_vpn_fusion", "profile_id"),
    post("/parental-control/block", "set_parental_block"),
    post("/port-forwarding/state", "set_port_forwarding_state"),
    post("/port-forwarding/rules", "add_port_forwarding_rule"),
    Route {
        verb: Verb::Delete,
        path: "/port-forwarding/rules",
        operation: "remove_port_forwarding_rule",
        path_arg: None,
    },
    post("/firmware/check", "check_firmware_update"),
    post("/firmware/upgrade", "upgrade_firmware"),
    post("/speedtest", "run_speedtest"),
    post("/disconnect", "disconnect_router"),
];

impl Route {
    /// Axum method router invoking this route's operation
    pub fn method_router(&self) -> MethodRouter<AppState> {
        let operation = self.operation;
        match self.path_arg {
            Some(arg) => on(
                self.verb.filter(),
                move |State(state): State<AppState>,
                      Path(value): Path<String>,
                      Query(query): Query<HashMap<String, String>>,
                      body: Bytes| async move {
                    invoke(&state, operation, Some((arg, value)), query, body).await
                },
            ),
            None => on(
                self.verb.filter(),
                move |State(state): State<AppState>,
                      Query(query): Query<HashMap<String, String>>,
                      body: Bytes| async move {
                    invoke(&state, operation, None, query, body).await
                },
            ),
        }
    }
}

/// Merge the request inputs into an argument object and dispatch
pub async fn invoke(
    state: &AppState,
    operation: &'static str,
    path_arg: Option<(&'static str, String)>,
    query: HashMap<String, String>,
    body: Bytes,
) -> Result<Json<Envelope>, ApiError> {
    let mut args = Map::new();
    for (key, value) in query {
        let coerced = coerce(operation, &key, value);
        args.insert(key, coerced);
    }
    if !body.is_empty() {
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(fields)) => args.extend(fields),
            Ok(Value::Null) => {}
            Ok(_) => {
                return Err(ApiError::BadRequest(
                    "Request body must be a JSON object".to_string(),
                ))
            }
            Err(e) => return Err(ApiError::BadRequest(format!("Invalid JSON body: {}", e))),
        }
    }
    if let Some((key, value)) = path_arg {
        args.insert(key.to_string(), coerce(operation, key, value));
    }

    let envelope = state
        .dispatcher()
        .invoke(operation, &Value::Object(args))
        .await?;
    Ok(Json(envelope))
}

/// Convert a textual input to the declared parameter type where it parses
fn coerce(operation: &str, key: &str, value: String) -> Value {
    let ty = catalog::find(operation)
        .and_then(|op| op.param(key))
        .map(|p| p.ty);
    match ty {
        Some(ParamType::Boolean) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => Value::String(value),
        },
        Some(ParamType::Integer { .. }) => match value.trim().parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(value),
        },
        _ => Value::String(value),
    }
}
