//! Side-effecting router actions

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::Band;

/// A mutation the router client can apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Reboot,
    RestartService { service: Service },
    SetWlanRadio { band: Band, enable: bool },
    SetGuestWlan { band: Band, index: u8, enable: bool },
    SetLed { enable: bool },
    SetAuraMode {
        mode: AuraMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        brightness: Option<u8>,
    },
    SetOpenvpnClient { id: u8, enable: bool },
    SetOpenvpnServer { id: u8, enable: bool },
    SetWireguardClient { id: u8, enable: bool },
    SetWireguardServer { id: u8, enable: bool },
    SetVpnFusion { profile_id: u32, enable: bool },
    SetParentalBlock { mac: MacAddress, block: bool },
    SetPortForwarding { enable: bool },
    AddPortForwardRule { rule: PortForwardRule },
    RemovePortForwardRule { external_port: u16, protocol: Protocol },
    FirmwareCheck,
    FirmwareUpgrade,
    SpeedtestStart,
}

fn on_off(enable: bool) -> &'static str {
    if enable {
        "on"
    } else {
        "off"
    }
}

impl Action {
    /// Short human-readable summary (e.g. "5ghz radio off")
    pub fn describe(&self) -> String {
        match self {
            Action::Reboot => "reboot".to_string(),
            Action::RestartService { service } => format!("restart of {}", service),
            Action::SetWlanRadio { band, enable } => {
                format!("{} radio {}", band, on_off(*enable))
            }
            Action::SetGuestWlan {
                band,
                index,
                enable,
            } => format!("{} guest network {} {}", band, index, on_off(*enable)),
            Action::SetLed { enable } => format!("LED {}", on_off(*enable)),
            Action::SetAuraMode { mode, .. } => format!("Aura mode {}", mode),
            Action::SetOpenvpnClient { id, enable } => {
                format!("OpenVPN client {} {}", id, on_off(*enable))
            }
            Action::SetOpenvpnServer { id, enable } => {
                format!("OpenVPN server {} {}", id, on_off(*enable))
            }
            Action::SetWireguardClient { id, enable } => {
                format!("WireGuard client {} {}", id, on_off(*enable))
            }
            Action::SetWireguardServer { id, enable } => {
                format!("WireGuard server {} {}", id, on_off(*enable))
            }
            Action::SetVpnFusion { profile_id, enable } => {
                format!("VPN fusion profile {} {}", profile_id, on_off(*enable))
            }
            Action::SetParentalBlock { mac, block } => {
                if *block {
                    format!("block of {}", mac)
                } else {
                    format!("unblock of {}", mac)
                }
            }
            Action::SetPortForwarding { enable } => format!("port forwarding {}", on_off(*enable)),
            Action::AddPortForwardRule { rule } => format!(
                "port forwarding rule {} ({}/{})",
                rule.name, rule.external_port, rule.protocol
            ),
            Action::RemovePortForwardRule {
                external_port,
                protocol,
            } => format!(
                "removal of port forwarding rule {}/{}",
                external_port, protocol
            ),
            Action::FirmwareCheck => "firmware update check".to_string(),
            Action::FirmwareUpgrade => "firmware upgrade".to_string(),
            Action::SpeedtestStart => "speed test start".to_string(),
        }
    }
}

/// Router services that can be restarted individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Wireless,
    Firewall,
    Dnsmasq,
    Httpd,
    Upnp,
    Qos,
    Ddns,
}

impl Service {
    pub const NAMES: &'static [&'static str] = &[
        "wireless", "firewall", "dnsmasq", "httpd", "upnp", "qos", "ddns",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Wireless => "wireless",
            Service::Firewall => "firewall",
            Service::Dnsmasq => "dnsmasq",
            Service::Httpd => "httpd",
            Service::Upnp => "upnp",
            Service::Qos => "qos",
            Service::Ddns => "ddns",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("restart_").unwrap_or(&lower);
        match name {
            "wireless" => Ok(Service::Wireless),
            "firewall" => Ok(Service::Firewall),
            "dnsmasq" => Ok(Service::Dnsmasq),
            "httpd" => Ok(Service::Httpd),
            "upnp" => Ok(Service::Upnp),
            "qos" => Ok(Service::Qos),
            "ddns" => Ok(Service::Ddns),
            _ => Err(format!(
                "Invalid service: {}. Expected one of: {}",
                s,
                Service::NAMES.join(", ")
            )),
        }
    }
}

/// Aura RGB lighting effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuraMode {
    Off,
    Static,
    Breathing,
    Evolution,
    Rainbow,
    Wave,
    Marquee,
}

impl AuraMode {
    pub const NAMES: &'static [&'static str] = &[
        "off",
        "static",
        "breathing",
        "evolution",
        "rainbow",
        "wave",
        "marquee",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuraMode::Off => "off",
            AuraMode::Static => "static",
            AuraMode::Breathing => "breathing",
            AuraMode::Evolution => "evolution",
            AuraMode::Rainbow => "rainbow",
            AuraMode::Wave => "wave",
            AuraMode::Marquee => "marquee",
        }
    }
}

impl std::fmt::Display for AuraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuraMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(AuraMode::Off),
            "static" => Ok(AuraMode::Static),
            "breathing" => Ok(AuraMode::Breathing),
            "evolution" => Ok(AuraMode::Evolution),
            "rainbow" => Ok(AuraMode::Rainbow),
            "wave" => Ok(AuraMode::Wave),
            "marquee" => Ok(AuraMode::Marquee),
            _ => Err(format!(
                "Invalid Aura mode: {}. Expected one of: {}",
                s,
                AuraMode::NAMES.join(", ")
            )),
        }
    }
}

/// Transport protocol of a port forwarding rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Both,
}

impl Protocol {
    pub const NAMES: &'static [&'static str] = &["tcp", "udp", "both"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Both => "both",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "both" | "tcp/udp" => Ok(Protocol::Both),
            _ => Err(format!(
                "Invalid protocol: {}. Expected one of: tcp, udp, both",
                s
            )),
        }
    }
}

/// A port forwarding rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortForwardRule {
    pub name: String,
    pub external_port: u16,
    pub internal_ip: Ipv4Addr,
    /// Defaults to `external_port` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_port: Option<u16>,
    pub protocol: Protocol,
}

/// MAC address, normalised to uppercase colon-separated form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MacAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let octets: Vec<&str> = trimmed.split(|c| c == ':' || c == '-').collect();
        let valid = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
        if !valid {
            return Err(format!("Invalid MAC address: {}", s));
        }
        Ok(MacAddress(octets.join(":").to_ascii_uppercase()))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_is_normalised() {
        let mac: MacAddress = "aa-bb-cc-dd-ee-0f".parse().unwrap();
        assert_eq!(mac.as_str(), "AA:BB:CC:DD:EE:0F");
    }

    #[test]
    fn mac_rejects_wrong_shape() {
        assert!("aa:bb:cc:dd:ee".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee:zz".parse::<MacAddress>().is_err());
        assert!("aabb.ccdd.eeff".parse::<MacAddress>().is_err());
    }

    #[test]
    fn service_accepts_restart_prefix() {
        assert_eq!(
            "restart_wireless".parse::<Service>().unwrap(),
            Service::Wireless
        );
    }

    #[test]
    fn action_serializes_with_tag() {
        let json = serde_json::to_value(Action::SetLed { enable: true }).unwrap();
        assert_eq!(json, serde_json::json!({"action": "set_led", "enable": true}));
    }

    #[test]
    fn describe_names_band_and_state() {
        let action = Action::SetWlanRadio {
            band: Band::FiveGhz,
            enable: false,
        };
        assert_eq!(action.describe(), "5ghz radio off");
    }
}
