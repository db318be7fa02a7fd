//! Operation catalog
//!
//! Static table of every operation exposed through the transport skins. The
//! table is the single source for tool names, descriptions, parameter schemas
//! and envelope keys; reads are thin named wrappers around fetch-by-kind.

use serde_json::{json, Map, Value};

use crate::models::{AuraMode, Band, DataKind, Protocol, Service};

/// Type of an operation parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Boolean,
    /// Integer within an inclusive range
    Integer { min: i64, max: i64 },
    Text,
    /// One of a fixed set of names (aliases may also be accepted)
    Choice(&'static [&'static str]),
    MacAddress,
    Ipv4Address,
}

/// Default applied when an optional parameter is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Bool(bool),
    Int(i64),
}

impl ParamDefault {
    pub fn to_value(self) -> Value {
        match self {
            ParamDefault::Bool(b) => Value::Bool(b),
            ParamDefault::Int(i) => Value::from(i),
        }
    }
}

/// A declared operation parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<ParamDefault>,
}

impl ParamSpec {
    const fn required(name: &'static str, description: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            description,
            ty,
            required: true,
            default: None,
        }
    }

    const fn optional(
        name: &'static str,
        description: &'static str,
        ty: ParamType,
        default: Option<ParamDefault>,
    ) -> Self {
        Self {
            name,
            description,
            ty,
            required: false,
            default,
        }
    }

    /// JSON Schema fragment for this parameter
    pub fn schema(&self) -> Value {
        let mut schema = match self.ty {
            ParamType::Boolean => json!({"type": "boolean"}),
            ParamType::Integer { min, max } => {
                json!({"type": "integer", "minimum": min, "maximum": max})
            }
            ParamType::Text => json!({"type": "string", "minLength": 1}),
            ParamType::Choice(names) => json!({"type": "string", "enum": names}),
            ParamType::MacAddress => json!({
                "type": "string",
                "pattern": "^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$"
            }),
            ParamType::Ipv4Address => json!({"type": "string", "format": "ipv4"}),
        };
        if let Value::Object(ref mut map) = schema {
            map.insert("description".into(), Value::from(self.description));
            if let Some(default) = self.default {
                map.insert("default".into(), default.to_value());
            }
        }
        schema
    }
}

/// What an operation does once its arguments are valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Fetch one fixed data kind
    Read(DataKind),
    /// Fetch a caller-chosen data kind
    ReadAny,
    Identity,
    /// Static list of data kinds; needs no session
    DataTypes,
    Reboot,
    RestartService,
    WifiRadio,
    GuestWlan,
    Led,
    Aura,
    OpenvpnClient,
    OpenvpnServer,
    WireguardClient,
    WireguardServer,
    VpnFusion,
    ParentalBlock,
    PortForwardingState,
    AddPortForwardRule,
    RemovePortForwardRule,
    FirmwareCheck,
    FirmwareUpgrade,
    Speedtest,
    Disconnect,
}

/// Immutable definition of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Stable wire name (tool name)
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    pub kind: OperationKind,
    /// Envelope key for successful reads
    pub key: &'static str,
    /// Prefix of error messages (e.g. "Error rebooting router")
    pub error_context: &'static str,
}

impl OperationSpec {
    const fn read(
        name: &'static str,
        kind: DataKind,
        key: &'static str,
        description: &'static str,
        error_context: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            params: &[],
            kind: OperationKind::Read(kind),
            key,
            error_context,
        }
    }

    const fn action(
        name: &'static str,
        kind: OperationKind,
        params: &'static [ParamSpec],
        description: &'static str,
        error_context: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            params,
            kind,
            key: "success",
            error_context,
        }
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether the operation changes router state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self.kind,
            OperationKind::Read(_)
                | OperationKind::ReadAny
                | OperationKind::Identity
                | OperationKind::DataTypes
        )
    }

    /// JSON Schema of the argument object
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in self.params {
            properties.insert(param.name.to_string(), param.schema());
            if param.required {
                required.push(Value::from(param.name));
            }
        }
        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }
}

/// Look up an operation by wire name
pub fn find(name: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|op| op.name == name)
}

const ENABLE: ParamSpec = ParamSpec::required(
    "enable",
    "true to turn the feature on, false to turn it off",
    ParamType::Boolean,
);

const BAND: ParamSpec = ParamSpec::required("band", "Wireless band", ParamType::Choice(Band::NAMES));

const DATA_TYPE_NAMES: [&str; 29] = {
    let mut names = [""; 29];
    let mut i = 0;
    while i < DataKind::ALL.len() {
        names[i] = DataKind::ALL[i].as_str();
        i += 1;
    }
    names
};

const DATA_TYPE: ParamSpec = ParamSpec::required(
    "data_type",
    "Data category to fetch (case-insensitive), see list_data_types",
    ParamType::Choice(&DATA_TYPE_NAMES),
);

const FORCE: ParamSpec = ParamSpec::optional(
    "force",
    "Bypass the client's identity cache",
    ParamType::Boolean,
    Some(ParamDefault::Bool(false)),
);

const SERVICE: ParamSpec = ParamSpec::required(
    "service",
    "Service to restart",
    ParamType::Choice(Service::NAMES),
);

const GUEST_INDEX: ParamSpec = ParamSpec::optional(
    "index",
    "Guest network slot on the band",
    ParamType::Integer { min: 1, max: 3 },
    Some(ParamDefault::Int(1)),
);

const AURA_MODE: ParamSpec = ParamSpec::required(
    "mode",
    "Lighting effect",
    ParamType::Choice(AuraMode::NAMES),
);

const AURA_BRIGHTNESS: ParamSpec = ParamSpec::optional(
    "brightness",
    "Brightness level, 0 (dark) to 128 (full)",
    ParamType::Integer { min: 0, max: 128 },
    None,
);

const OPENVPN_CLIENT_ID: ParamSpec = ParamSpec::required(
    "client_id",
    "OpenVPN client instance",
    ParamType::Integer { min: 1, max: 5 },
);

const OPENVPN_SERVER_ID: ParamSpec = ParamSpec::required(
    "server_id",
    "OpenVPN server instance",
    ParamType::Integer { min: 1, max: 2 },
);

const WIREGUARD_CLIENT_ID: ParamSpec = ParamSpec::required(
    "client_id",
    "WireGuard client instance",
    ParamType::Integer { min: 1, max: 5 },
);

const WIREGUARD_SERVER_ID: ParamSpec = ParamSpec::required(
    "server_id",
    "WireGuard server instance",
    ParamType::Integer { min: 1, max: 1 },
);

const VPN_FUSION_ID: ParamSpec = ParamSpec::required(
    "profile_id",
    "VPN fusion profile",
    ParamType::Integer {
        min: 1,
        max: u32::MAX as i64,
    },
);

const PORT: ParamType = ParamType::Integer { min: 1, max: 65535 };

const PROTOCOL: ParamSpec = ParamSpec::required(
    "protocol",
    "Transport protocol",
    ParamType::Choice(Protocol::NAMES),
);

/// Every operation, in presentation order
pub static OPERATIONS: &[OperationSpec] = &[
    // Reads
    OperationSpec::read(
        "get_connected_devices",
        DataKind::Clients,
        "devices",
        "Get the list of devices connected to the router, keyed by MAC address.",
        "Error fetching connected devices",
    ),
    OperationSpec::read(
        "get_wlan_status",
        DataKind::Wlan,
        "wlan",
        "Get wireless network settings and radio state for every band.",
        "Error fetching WLAN status",
    ),
    OperationSpec::read(
        "get_guest_wlan_status",
        DataKind::Gwlan,
        "guest_wlan",
        "Get guest wireless networks for every band.",
        "Error fetching guest WLAN status",
    ),
    OperationSpec::read(
        "get_network_stats",
        DataKind::Network,
        "network",
        "Get traffic counters and current rates per interface.",
        "Error fetching network statistics",
    ),
    OperationSpec::read(
        "get_parental_control",
        DataKind::ParentalControl,
        "parental_control",
        "Get parental control state and the list of blocked devices.",
        "Error fetching parental control",
    ),
    OperationSpec::read(
        "get_aimesh_nodes",
        DataKind::Aimesh,
        "aimesh",
        "Get AiMesh nodes and their status.",
        "Error fetching AiMesh nodes",
    ),
    OperationSpec::read(
        "get_system_info",
        DataKind::Sysinfo,
        "sysinfo",
        "Get load averages and system counters.",
        "Error fetching system information",
    ),
    OperationSpec::read(
        "get_cpu_usage",
        DataKind::Cpu,
        "cpu",
        "Get CPU usage per core.",
        "Error fetching CPU usage",
    ),
    OperationSpec::read(
        "get_ram_usage",
        DataKind::Ram,
        "ram",
        "Get memory usage.",
        "Error fetching RAM usage",
    ),
    OperationSpec::read(
        "get_temperature",
        DataKind::Temperature,
        "temperature",
        "Get CPU and radio temperatures.",
        "Error fetching temperature",
    ),
    OperationSpec::read(
        "get_wan_status",
        DataKind::Wan,
        "wan",
        "Get WAN connection status, addressing and DNS servers.",
        "Error fetching WAN status",
    ),
    OperationSpec::read(
        "get_port_forwarding",
        DataKind::PortForwarding,
        "port_forwarding",
        "Get the port forwarding switch and configured rules.",
        "Error fetching port forwarding",
    ),
    OperationSpec::read(
        "get_openvpn_client_status",
        DataKind::OpenvpnClient,
        "openvpn_client",
        "Get the state of every OpenVPN client instance.",
        "Error fetching OpenVPN client status",
    ),
    OperationSpec::read(
        "get_openvpn_server_status",
        DataKind::OpenvpnServer,
        "openvpn_server",
        "Get the state of every OpenVPN server instance.",
        "Error fetching OpenVPN server status",
    ),
    OperationSpec::read(
        "get_wireguard_client_status",
        DataKind::WireguardClient,
        "wireguard_client",
        "Get the state of every WireGuard client instance.",
        "Error fetching WireGuard client status",
    ),
    OperationSpec::read(
        "get_wireguard_server_status",
        DataKind::WireguardServer,
        "wireguard_server",
        "Get the state of the WireGuard server.",
        "Error fetching WireGuard server status",
    ),
    OperationSpec::read(
        "get_vpn_fusion_status",
        DataKind::Vpnc,
        "vpn_fusion",
        "Get VPN fusion profiles and which are active.",
        "Error fetching VPN fusion status",
    ),
    OperationSpec::read(
        "get_led_state",
        DataKind::Led,
        "led",
        "Get whether the status LEDs are on.",
        "Error fetching LED state",
    ),
    OperationSpec::read(
        "get_aura_state",
        DataKind::Aura,
        "aura",
        "Get the Aura RGB lighting mode and brightness.",
        "Error fetching Aura state",
    ),
    OperationSpec::read(
        "get_firmware_info",
        DataKind::Firmware,
        "firmware",
        "Get the installed firmware version and any available update.",
        "Error fetching firmware info",
    ),
    OperationSpec::read(
        "get_firmware_notes",
        DataKind::FirmwareNote,
        "firmware_notes",
        "Get release notes for the available firmware update.",
        "Error fetching firmware notes",
    ),
    OperationSpec::read(
        "get_boot_time",
        DataKind::Boottime,
        "boot_time",
        "Get the boot timestamp and uptime.",
        "Error fetching boot time",
    ),
    OperationSpec::read(
        "get_dsl_status",
        DataKind::Dsl,
        "dsl",
        "Get DSL line status (DSL models only).",
        "Error fetching DSL status",
    ),
    OperationSpec::read(
        "get_port_status",
        DataKind::Ports,
        "ports",
        "Get link state and speed of the physical ports.",
        "Error fetching port status",
    ),
    OperationSpec::read(
        "get_device_map",
        DataKind::Devicemap,
        "device_map",
        "Get the device map summary.",
        "Error fetching device map",
    ),
    OperationSpec::read(
        "get_router_flags",
        DataKind::Flags,
        "flags",
        "Get internal router flags (e.g. pending reboot).",
        "Error fetching router flags",
    ),
    OperationSpec::read(
        "get_speedtest_status",
        DataKind::Speedtest,
        "speedtest",
        "Get speed test configuration and history.",
        "Error fetching speed test status",
    ),
    OperationSpec::read(
        "get_speedtest_result",
        DataKind::SpeedtestResult,
        "speedtest_result",
        "Get the result of the latest speed test.",
        "Error fetching speed test result",
    ),
    OperationSpec::read(
        "get_ping_status",
        DataKind::Ping,
        "ping",
        "Get connectivity check results.",
        "Error fetching ping status",
    ),
    OperationSpec {
        name: "get_router_data",
        description: "Fetch any category of router data by name (see list_data_types).",
        params: &[DATA_TYPE],
        kind: OperationKind::ReadAny,
        key: "data",
        error_context: "Error fetching router data",
    },
    OperationSpec {
        name: "get_router_identity",
        description: "Get the router model, firmware version, capabilities and radio bands.",
        params: &[FORCE],
        kind: OperationKind::Identity,
        key: "identity",
        error_context: "Error fetching router identity",
    },
    OperationSpec {
        name: "list_data_types",
        description: "List every data category get_router_data accepts.",
        params: &[],
        kind: OperationKind::DataTypes,
        key: "data_types",
        error_context: "Error listing data types",
    },
    // Mutations
    OperationSpec::action(
        "reboot_router",
        OperationKind::Reboot,
        &[],
        "Reboot the router. The router is offline for 1-2 minutes afterwards.",
        "Error rebooting router",
    ),
    OperationSpec::action(
        "restart_service",
        OperationKind::RestartService,
        &[SERVICE],
        "Restart a single router service.",
        "Error restarting service",
    ),
    OperationSpec::action(
        "set_wifi_radio_state",
        OperationKind::WifiRadio,
        &[BAND, ENABLE],
        "Turn the radio of one wireless band on or off.",
        "Error setting WiFi radio state",
    ),
    OperationSpec::action(
        "set_guest_wlan_state",
        OperationKind::GuestWlan,
        &[BAND, GUEST_INDEX, ENABLE],
        "Turn a guest wireless network on or off.",
        "Error setting guest WLAN state",
    ),
    OperationSpec::action(
        "set_led_state",
        OperationKind::Led,
        &[ENABLE],
        "Turn the status LEDs on or off.",
        "Error setting LED state",
    ),
    OperationSpec::action(
        "set_aura_mode",
        OperationKind::Aura,
        &[AURA_MODE, AURA_BRIGHTNESS],
        "Set the Aura RGB lighting effect.",
        "Error setting Aura mode",
    ),
    OperationSpec::action(
        "control_openvpn_client",
        OperationKind::OpenvpnClient,
        &[OPENVPN_CLIENT_ID, ENABLE],
        "Start or stop an OpenVPN client instance.",
        "Error controlling OpenVPN client",
    ),
    OperationSpec::action(
        "control_openvpn_server",
        OperationKind::OpenvpnServer,
        &[OPENVPN_SERVER_ID, ENABLE],
        "Start or stop an OpenVPN server instance.",
        "Error controlling OpenVPN server",
    ),
    OperationSpec::action(
        "control_wireguard_client",
        OperationKind::WireguardClient,
        &[WIREGUARD_CLIENT_ID, ENABLE],
        "Start or stop a WireGuard client instance.",
        "Error controlling WireGuard client",
    ),
    OperationSpec::action(
        "control_wireguard_server",
        OperationKind::WireguardServer,
        &[WIREGUARD_SERVER_ID, ENABLE],
        "Start or stop the WireGuard server.",
        "Error controlling WireGuard server",
    ),
    OperationSpec::action(
        "control_vpn_fusion",
        OperationKind::VpnFusion,
        &[VPN_FUSION_ID, ENABLE],
        "Activate or deactivate a VPN fusion profile.",
        "Error controlling VPN fusion",
    ),
    OperationSpec::action(
        "set_parental_block",
        OperationKind::ParentalBlock,
        &[
            ParamSpec::required("mac", "MAC address of the device", ParamType::MacAddress),
            ParamSpec::required(
                "block",
                "true to block internet access, false to unblock",
                ParamType::Boolean,
            ),
        ],
        "Block or unblock internet access for one device.",
        "Error setting parental block",
    ),
    OperationSpec::action(
        "set_port_forwarding_state",
        OperationKind::PortForwardingState,
        &[ENABLE],
        "Turn port forwarding on or off as a whole.",
        "Error setting port forwarding state",
    ),
    OperationSpec::action(
        "add_port_forwarding_rule",
        OperationKind::AddPortForwardRule,
        &[
            ParamSpec::required("name", "Rule label", ParamType::Text),
            ParamSpec::required("external_port", "Port on the WAN side", PORT),
            ParamSpec::required(
                "internal_ip",
                "LAN address to forward to",
                ParamType::Ipv4Address,
            ),
            ParamSpec::optional(
                "internal_port",
                "Port on the LAN host, defaults to external_port",
                PORT,
                None,
            ),
            PROTOCOL,
        ],
        "Add a port forwarding rule.",
        "Error adding port forwarding rule",
    ),
    OperationSpec::action(
        "remove_port_forwarding_rule",
        OperationKind::RemovePortForwardRule,
        &[
            ParamSpec::required("external_port", "Port on the WAN side", PORT),
            PROTOCOL,
        ],
        "Remove the port forwarding rule for an external port and protocol.",
        "Error removing port forwarding rule",
    ),
    OperationSpec::action(
        "check_firmware_update",
        OperationKind::FirmwareCheck,
        &[],
        "Ask the router to check for a firmware update. Poll get_firmware_info for the result.",
        "Error checking for firmware update",
    ),
    OperationSpec::action(
        "upgrade_firmware",
        OperationKind::FirmwareUpgrade,
        &[],
        "Start a firmware upgrade. The router reboots when the upgrade completes.",
        "Error upgrading firmware",
    ),
    OperationSpec::action(
        "run_speedtest",
        OperationKind::Speedtest,
        &[],
        "Run a speed test and wait for its result.",
        "Error running speed test",
    ),
    OperationSpec::action(
        "disconnect_router",
        OperationKind::Disconnect,
        &[],
        "Drop the cached router session. The next call reconnects.",
        "Error disconnecting from router",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let mut seen = HashSet::new();
        for op in OPERATIONS {
            assert!(seen.insert(op.name), "duplicate operation {}", op.name);
        }
    }

    #[test]
    fn every_data_kind_has_a_named_read() {
        for kind in DataKind::ALL {
            assert!(
                OPERATIONS
                    .iter()
                    .any(|op| op.kind == OperationKind::Read(kind)),
                "no read for {}",
                kind
            );
        }
    }

    #[test]
    fn input_schema_lists_required_params() {
        let op = find("set_wifi_radio_state").unwrap();
        let schema = op.input_schema();
        assert_eq!(schema["required"], json!(["band", "enable"]));
        assert_eq!(
            schema["properties"]["band"]["enum"],
            json!(["2.4ghz", "5ghz", "5ghz2", "6ghz"])
        );
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn parameterless_schema_has_no_required_key() {
        let schema = find("reboot_router").unwrap().input_schema();
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn data_type_choice_lists_every_kind() {
        let schema = find("get_router_data").unwrap().input_schema();
        let names = schema["properties"]["data_type"]["enum"].as_array().unwrap();
        assert_eq!(names.len(), DataKind::ALL.len());
        assert_eq!(names[0], json!("CLIENTS"));
    }
}
