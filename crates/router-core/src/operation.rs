//! Typed operations decoded from a name and a JSON argument object
//!
//! Decoding is pure: it never touches the network. Everything a caller can get
//! wrong (unknown operation, unknown or missing argument, wrong type, value
//! out of range, bad enum name, malformed MAC or IP) is rejected here with an
//! [`OperationError::Validation`].

use std::net::Ipv4Addr;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::catalog::{self, OperationKind, OperationSpec, ParamType};
use crate::error::{OperationError, OperationResult};
use crate::models::{Action, Band, DataKind, MacAddress, PortForwardRule};

/// What the dispatcher has to do for a decoded operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch one data kind
    Fetch(DataKind),
    /// Read the router identity
    Identity { force: bool },
    /// Static data type catalog; needs no session
    DataTypes,
    /// Apply one mutation
    Apply(Action),
    /// Apply a mutation on a band the router must have (identity check first)
    ApplyOnBand { band: Band, action: Action },
    /// Start a speed test and wait for its result
    Speedtest,
    /// Drop the shared session
    Disconnect,
}

/// A validated operation, ready to dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub spec: &'static OperationSpec,
    pub request: Request,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Decode a named call.
    ///
    /// `args` may be `null` (no arguments) or a JSON object.
    pub fn from_call(name: &str, args: &Value) -> OperationResult<Self> {
        let spec = catalog::find(name)
            .ok_or_else(|| OperationError::Validation(format!("Unknown operation: {}", name)))?;
        let empty = Map::new();
        let args = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => {
                return Err(OperationError::Validation(
                    "Arguments must be a JSON object".to_string(),
                ))
            }
        };
        let reader = ArgReader::new(spec, args)?;
        let request = decode(spec, &reader).map_err(OperationError::Validation)?;
        Ok(Operation { spec, request })
    }
}

fn decode(spec: &OperationSpec, args: &ArgReader<'_>) -> Result<Request, String> {
    let request = match spec.kind {
        OperationKind::Read(kind) => Request::Fetch(kind),
        OperationKind::ReadAny => Request::Fetch(args.parse("data_type")?),
        OperationKind::Identity => Request::Identity {
            force: args.bool("force")?,
        },
        OperationKind::DataTypes => Request::DataTypes,
        OperationKind::Reboot => Request::Apply(Action::Reboot),
        OperationKind::RestartService => Request::Apply(Action::RestartService {
            service: args.parse("service")?,
        }),
        OperationKind::WifiRadio => {
            let band: Band = args.parse("band")?;
            Request::ApplyOnBand {
                band,
                action: Action::SetWlanRadio {
                    band,
                    enable: args.bool("enable")?,
                },
            }
        }
        OperationKind::GuestWlan => {
            let band: Band = args.parse("band")?;
            Request::ApplyOnBand {
                band,
                action: Action::SetGuestWlan {
                    band,
                    index: args.int("index")?,
                    enable: args.bool("enable")?,
                },
            }
        }
        OperationKind::Led => Request::Apply(Action::SetLed {
            enable: args.bool("enable")?,
        }),
        OperationKind::Aura => Request::Apply(Action::SetAuraMode {
            mode: args.parse("mode")?,
            brightness: args.opt_int("brightness")?,
        }),
        OperationKind::OpenvpnClient => Request::Apply(Action::SetOpenvpnClient {
            id: args.int("client_id")?,
            enable: args.bool("enable")?,
        }),
        OperationKind::OpenvpnServer => Request::Apply(Action::SetOpenvpnServer {
            id: args.int("server_id")?,
            enable: args.bool("enable")?,
        }),
        OperationKind::WireguardClient => Request::Apply(Action::SetWireguardClient {
            id: args.int("client_id")?,
            enable: args.bool("enable")?,
        }),
        OperationKind::WireguardServer => Request::Apply(Action::SetWireguardServer {
            id: args.int("server_id")?,
            enable: args.bool("enable")?,
        }),
        OperationKind::VpnFusion => Request::Apply(Action::SetVpnFusion {
            profile_id: args.int("profile_id")?,
            enable: args.bool("enable")?,
        }),
        OperationKind::ParentalBlock => Request::Apply(Action::SetParentalBlock {
            mac: args.parse::<MacAddress>("mac")?,
            block: args.bool("block")?,
        }),
        OperationKind::PortForwardingState => Request::Apply(Action::SetPortForwarding {
            enable: args.bool("enable")?,
        }),
        OperationKind::AddPortForwardRule => Request::Apply(Action::AddPortForwardRule {
            rule: PortForwardRule {
                name: args.text("name")?,
                external_port: args.int("external_port")?,
                internal_ip: args.ipv4("internal_ip")?,
                internal_port: args.opt_int("internal_port")?,
                protocol: args.parse("protocol")?,
            },
        }),
        OperationKind::RemovePortForwardRule => Request::Apply(Action::RemovePortForwardRule {
            external_port: args.int("external_port")?,
            protocol: args.parse("protocol")?,
        }),
        OperationKind::FirmwareCheck => Request::Apply(Action::FirmwareCheck),
        OperationKind::FirmwareUpgrade => Request::Apply(Action::FirmwareUpgrade),
        OperationKind::Speedtest => Request::Speedtest,
        OperationKind::Disconnect => Request::Disconnect,
    };
    Ok(request)
}

/// Typed access to an argument object, checked against the declared parameters
struct ArgReader<'a> {
    spec: &'a OperationSpec,
    args: &'a Map<String, Value>,
}

impl<'a> ArgReader<'a> {
    fn new(spec: &'a OperationSpec, args: &'a Map<String, Value>) -> OperationResult<Self> {
        if let Some(unknown) = args.keys().find(|k| spec.param(k).is_none()) {
            return Err(OperationError::Validation(format!(
                "Unknown argument for {}: {}",
                spec.name, unknown
            )));
        }
        Ok(Self { spec, args })
    }

    /// Raw value with the declared default applied; `None` when optional and absent
    fn value(&self, name: &str) -> Result<Option<Value>, String> {
        let param = self
            .spec
            .param(name)
            .ok_or_else(|| format!("{} takes no argument {}", self.spec.name, name))?;
        match self.args.get(name) {
            Some(Value::Null) | None => {
                if let Some(default) = param.default {
                    Ok(Some(default.to_value()))
                } else if param.required {
                    Err(format!("Missing required argument: {}", name))
                } else {
                    Ok(None)
                }
            }
            Some(value) => Ok(Some(value.clone())),
        }
    }

    fn bool(&self, name: &str) -> Result<bool, String> {
        match self.value(name)? {
            Some(Value::Bool(b)) => Ok(b),
            Some(_) => Err(format!("{} must be a boolean", name)),
            None => Err(format!("Missing required argument: {}", name)),
        }
    }

    fn opt_int<T: TryFrom<i64>>(&self, name: &str) -> Result<Option<T>, String> {
        let Some(value) = self.value(name)? else {
            return Ok(None);
        };
        let n = value
            .as_i64()
            .ok_or_else(|| format!("{} must be an integer", name))?;
        if let Some(ParamType::Integer { min, max }) = self.spec.param(name).map(|p| p.ty) {
            if n < min || n > max {
                return Err(format!("{} must be between {} and {}", name, min, max));
            }
        }
        T::try_from(n)
            .map(Some)
            .map_err(|_| format!("{} is out of range", name))
    }

    fn int<T: TryFrom<i64>>(&self, name: &str) -> Result<T, String> {
        self.opt_int(name)?
            .ok_or_else(|| format!("Missing required argument: {}", name))
    }

    fn text(&self, name: &str) -> Result<String, String> {
        match self.value(name)? {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(Value::String(_)) => Err(format!("{} must not be empty", name)),
            Some(_) => Err(format!("{} must be a string", name)),
            None => Err(format!("Missing required argument: {}", name)),
        }
    }

    fn parse<T: FromStr<Err = String>>(&self, name: &str) -> Result<T, String> {
        self.text(name)?.parse()
    }

    fn ipv4(&self, name: &str) -> Result<Ipv4Addr, String> {
        let text = self.text(name)?;
        text.parse()
            .map_err(|_| format!("Invalid IPv4 address: {}", text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuraMode, Protocol, Service};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn decode_ok(name: &str, args: Value) -> Request {
        Operation::from_call(name, &args).unwrap().request
    }

    fn decode_err(name: &str, args: Value) -> String {
        match Operation::from_call(name, &args) {
            Err(OperationError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn named_read_maps_to_fixed_kind() {
        assert_eq!(
            decode_ok("get_connected_devices", Value::Null),
            Request::Fetch(DataKind::Clients)
        );
    }

    #[test]
    fn generic_read_uppercases_data_type() {
        assert_eq!(
            decode_ok("get_router_data", json!({"data_type": "port_forwarding"})),
            Request::Fetch(DataKind::PortForwarding)
        );
    }

    #[test]
    fn radio_change_carries_band_for_identity_check() {
        assert_eq!(
            decode_ok("set_wifi_radio_state", json!({"band": "5G", "enable": false})),
            Request::ApplyOnBand {
                band: Band::FiveGhz,
                action: Action::SetWlanRadio {
                    band: Band::FiveGhz,
                    enable: false
                }
            }
        );
    }

    #[test]
    fn guest_index_defaults_to_one() {
        let request = decode_ok(
            "set_guest_wlan_state",
            json!({"band": "2.4ghz", "enable": true}),
        );
        assert!(matches!(
            request,
            Request::ApplyOnBand {
                action: Action::SetGuestWlan { index: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn identity_force_defaults_to_false() {
        assert_eq!(
            decode_ok("get_router_identity", json!({})),
            Request::Identity { force: false }
        );
    }

    #[test]
    fn port_forward_rule_is_fully_typed() {
        let request = decode_ok(
            "add_port_forwarding_rule",
            json!({
                "name": "nas",
                "external_port": 8443,
                "internal_ip": "192.168.1.20",
                "protocol": "TCP"
            }),
        );
        assert_eq!(
            request,
            Request::Apply(Action::AddPortForwardRule {
                rule: PortForwardRule {
                    name: "nas".to_string(),
                    external_port: 8443,
                    internal_ip: Ipv4Addr::new(192, 168, 1, 20),
                    internal_port: None,
                    protocol: Protocol::Tcp,
                }
            })
        );
    }

    #[test]
    fn enums_accept_their_names() {
        assert_eq!(
            decode_ok("restart_service", json!({"service": "restart_firewall"})),
            Request::Apply(Action::RestartService {
                service: Service::Firewall
            })
        );
        assert_eq!(
            decode_ok("set_aura_mode", json!({"mode": "rainbow", "brightness": 64})),
            Request::Apply(Action::SetAuraMode {
                mode: AuraMode::Rainbow,
                brightness: Some(64)
            })
        );
    }

    #[rstest]
    #[case("get_nothing", json!({}), "Unknown operation: get_nothing")]
    #[case("get_router_data", json!({"data_type": "bogus"}), "Invalid data type: bogus")]
    #[case("get_router_data", json!({}), "Missing required argument: data_type")]
    #[case(
        "set_wifi_radio_state",
        json!({"band": "7ghz", "enable": true}),
        "Invalid band: 7ghz. Expected one of: 2.4ghz, 5ghz, 5ghz2, 6ghz"
    )]
    #[case("set_wifi_radio_state", json!({"band": "5ghz", "enable": "yes"}), "enable must be a boolean")]
    #[case("set_led_state", json!({}), "Missing required argument: enable")]
    #[case("control_openvpn_client", json!({"client_id": -1, "enable": true}), "client_id must be between 1 and 5")]
    #[case("control_openvpn_client", json!({"client_id": 6, "enable": true}), "client_id must be between 1 and 5")]
    #[case("control_wireguard_server", json!({"server_id": 2, "enable": true}), "server_id must be between 1 and 1")]
    #[case("control_vpn_fusion", json!({"profile_id": 0, "enable": true}), "profile_id must be between 1 and 4294967295")]
    #[case("control_openvpn_server", json!({"server_id": 1.5, "enable": true}), "server_id must be an integer")]
    #[case("set_parental_block", json!({"mac": "not-a-mac", "block": true}), "Invalid MAC address: not-a-mac")]
    #[case("set_aura_mode", json!({"mode": "disco"}), "Invalid Aura mode: disco. Expected one of: off, static, breathing, evolution, rainbow, wave, marquee")]
    #[case("set_aura_mode", json!({"mode": "wave", "brightness": 200}), "brightness must be between 0 and 128")]
    #[case("reboot_router", json!({"force": true}), "Unknown argument for reboot_router: force")]
    #[case("reboot_router", json!([1, 2]), "Arguments must be a JSON object")]
    #[case(
        "add_port_forwarding_rule",
        json!({"name": "x", "external_port": 80, "internal_ip": "10.0.0.300", "protocol": "tcp"}),
        "Invalid IPv4 address: 10.0.0.300"
    )]
    #[case(
        "remove_port_forwarding_rule",
        json!({"external_port": 0, "protocol": "tcp"}),
        "external_port must be between 1 and 65535"
    )]
    fn invalid_input_is_rejected(#[case] name: &str, #[case] args: Value, #[case] expected: &str) {
        assert_eq!(decode_err(name, args), expected);
    }
}
