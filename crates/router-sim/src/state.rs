//! Simulated router state
//!
//! Plain data plus the two functions the handle needs: render a [`DataKind`]
//! as JSON and apply an [`Action`]. Reads never mutate, so repeated reads of
//! unchanged state render identical payloads.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use router_core::{
    Action, AuraMode, Band, ClientError, ClientResult, DataKind, Identity, IdentityCapabilities,
    PortForwardRule, Protocol,
};
use serde_json::{json, Map, Value};
use tokio::time::Instant;

const OPENVPN_CLIENTS: usize = 5;
const OPENVPN_SERVERS: usize = 2;
const WIREGUARD_CLIENTS: usize = 5;
const GUEST_SLOTS: u8 = 3;

/// A speed test started on the simulated router
#[derive(Debug, Clone)]
struct SpeedtestRun {
    started: Instant,
    duration: Duration,
}

/// Everything the simulated router knows about itself
#[derive(Debug, Clone)]
pub struct RouterState {
    pub identity: Identity,
    pub clients: Value,
    pub radios: BTreeMap<Band, bool>,
    pub guest_networks: BTreeMap<(Band, u8), bool>,
    pub led: bool,
    pub aura_mode: AuraMode,
    pub aura_brightness: u8,
    pub openvpn_clients: [bool; OPENVPN_CLIENTS],
    pub openvpn_servers: [bool; OPENVPN_SERVERS],
    pub wireguard_clients: [bool; WIREGUARD_CLIENTS],
    pub wireguard_server: bool,
    /// Profile id -> (description, active)
    pub vpn_fusion: BTreeMap<u32, (String, bool)>,
    pub parental_control: bool,
    pub blocked: BTreeSet<String>,
    pub port_forwarding: bool,
    pub port_forward_rules: Vec<PortForwardRule>,
    pub firmware_available: Option<String>,
    pub firmware_checked: bool,
    pub boot_time: DateTime<Utc>,
    pub reboot_count: u32,
    pub restarted_services: Vec<String>,
    pub speedtest_duration: Duration,
    speedtest: Option<SpeedtestRun>,
}

impl Default for RouterState {
    fn default() -> Self {
        let identity = Identity {
            model: "RT-AX86U".to_string(),
            firmware: "3.0.0.4.388_24198".to_string(),
            serial: Some("L9IAX1234567".to_string()),
            mac: Some("04:D9:F5:00:00:01".to_string()),
            capabilities: IdentityCapabilities {
                aura: true,
                led: true,
                aimesh: true,
                dsl: false,
                vpn_fusion: true,
                wireguard: true,
                speedtest: true,
            },
            bands: vec![Band::TwoGhz, Band::FiveGhz],
        };
        let radios = identity.bands.iter().map(|b| (*b, true)).collect();
        let guest_networks = identity
            .bands
            .iter()
            .flat_map(|b| (1..=GUEST_SLOTS).map(move |i| ((*b, i), false)))
            .collect();
        let mut vpn_fusion = BTreeMap::new();
        vpn_fusion.insert(1, ("Internet".to_string(), true));
        vpn_fusion.insert(2, ("Office VPN".to_string(), false));

        Self {
            identity,
            clients: default_clients(),
            radios,
            guest_networks,
            led: true,
            aura_mode: AuraMode::Static,
            aura_brightness: 128,
            openvpn_clients: [false; OPENVPN_CLIENTS],
            openvpn_servers: [false; OPENVPN_SERVERS],
            wireguard_clients: [false; WIREGUARD_CLIENTS],
            wireguard_server: false,
            vpn_fusion,
            parental_control: true,
            blocked: BTreeSet::new(),
            port_forwarding: true,
            port_forward_rules: Vec::new(),
            firmware_available: Some("3.0.0.4.388_24243".to_string()),
            firmware_checked: false,
            // Fixed so that reads stay stable between calls
            boot_time: Utc
                .with_ymd_and_hms(2026, 1, 5, 6, 30, 0)
                .single()
                .unwrap_or_default(),
            reboot_count: 0,
            restarted_services: Vec::new(),
            speedtest_duration: Duration::from_secs(20),
            speedtest: None,
        }
    }
}

fn default_clients() -> Value {
    json!({
        "3C:22:FB:11:22:33": {
            "name": "macbook-pro",
            "ip": "192.168.1.20",
            "connection": "5ghz",
            "online": true,
            "rssi": -48
        },
        "B8:27:EB:44:55:66": {
            "name": "raspberrypi",
            "ip": "192.168.1.30",
            "connection": "wired",
            "online": true
        },
        "F0:18:98:77:88:99": {
            "name": "iphone",
            "ip": "192.168.1.41",
            "connection": "2.4ghz",
            "online": false,
            "rssi": -71
        }
    })
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

impl RouterState {
    fn capability(&self, enabled: bool, feature: &str) -> ClientResult<()> {
        if enabled {
            Ok(())
        } else {
            Err(ClientError::NotSupported(format!(
                "{} is not available on {}",
                feature, self.identity.model
            )))
        }
    }

    fn band_available(&self, band: Band) -> ClientResult<()> {
        if self.identity.supports_band(band) {
            Ok(())
        } else {
            Err(ClientError::Device(format!("Band {} is not available", band)))
        }
    }

    fn speedtest_result(&self) -> Option<Value> {
        let run = self.speedtest.as_ref()?;
        if run.started.elapsed() < run.duration {
            return None;
        }
        Some(json!({
            "download_mbps": 842.6,
            "upload_mbps": 41.3,
            "ping_ms": 9.8,
            "jitter_ms": 1.2,
            "server": "Example ISP - Frankfurt"
        }))
    }

    /// Render one data kind; `None` when the router has nothing for it
    pub fn render(&self, kind: DataKind) -> Option<Value> {
        let caps = &self.identity.capabilities;
        let value = match kind {
            DataKind::Clients => self.clients.clone(),
            DataKind::Wlan => {
                let mut bands = Map::new();
                for (band, enabled) in &self.radios {
                    let channel = if *band == Band::TwoGhz { 6 } else { 36 };
                    bands.insert(
                        band.to_string(),
                        json!({
                            "ssid": format!("HomeNet-{}", band),
                            "radio": on_off(*enabled),
                            "channel": channel,
                        }),
                    );
                }
                Value::Object(bands)
            }
            DataKind::Gwlan => {
                let mut networks = Map::new();
                for ((band, index), enabled) in &self.guest_networks {
                    networks.insert(
                        format!("{}_{}", band, index),
                        json!({
                            "ssid": format!("HomeNet-Guest-{}", index),
                            "enabled": enabled,
                        }),
                    );
                }
                Value::Object(networks)
            }
            DataKind::Network => json!({
                "wan": {"rx_bytes": 48_213_911_552u64, "tx_bytes": 6_114_200_117u64, "rx_rate": 1_250_000, "tx_rate": 96_000},
                "lan": {"rx_bytes": 5_901_442_001u64, "tx_bytes": 47_008_553_120u64, "rx_rate": 88_000, "tx_rate": 1_190_000}
            }),
            DataKind::ParentalControl => json!({
                "enabled": self.parental_control,
                "blocked": self.blocked.iter().collect::<Vec<_>>(),
            }),
            DataKind::Aimesh => {
                if !caps.aimesh {
                    return None;
                }
                json!([
                    {"model": self.identity.model, "role": "router", "online": true},
                    {"model": "RT-AX58U", "role": "node", "online": true, "ip": "192.168.1.2"}
                ])
            }
            DataKind::Sysinfo => json!({
                "load_avg": [0.21, 0.18, 0.12],
                "processes": 142,
                "connections": {"active": 311, "max": 300_000}
            }),
            DataKind::Cpu => json!({
                "total": 7.5,
                "cores": [{"core": 1, "usage": 9.0}, {"core": 2, "usage": 6.0}]
            }),
            DataKind::Ram => json!({"total_kb": 1_048_576, "used_kb": 412_332, "usage": 39.3}),
            DataKind::Temperature => json!({"cpu": 71.2, "2.4ghz": 48.5, "5ghz": 52.0}),
            DataKind::Wan => json!({
                "status": "connected",
                "ip": "203.0.113.17",
                "gateway": "203.0.113.1",
                "dns": ["1.1.1.1", "9.9.9.9"],
                "protocol": "dhcp"
            }),
            DataKind::PortForwarding => json!({
                "enabled": self.port_forwarding,
                "rules": self.port_forward_rules,
            }),
            DataKind::OpenvpnClient => instances(&self.openvpn_clients),
            DataKind::OpenvpnServer => instances(&self.openvpn_servers),
            DataKind::WireguardClient => {
                if !caps.wireguard {
                    return None;
                }
                instances(&self.wireguard_clients)
            }
            DataKind::WireguardServer => {
                if !caps.wireguard {
                    return None;
                }
                json!({"1": {"state": on_off(self.wireguard_server)}})
            }
            DataKind::Vpnc => {
                if !caps.vpn_fusion {
                    return None;
                }
                let profiles: Map<String, Value> = self
                    .vpn_fusion
                    .iter()
                    .map(|(id, (desc, active))| {
                        (id.to_string(), json!({"description": desc, "active": active}))
                    })
                    .collect();
                Value::Object(profiles)
            }
            DataKind::Led => {
                if !caps.led {
                    return None;
                }
                json!({"state": on_off(self.led)})
            }
            DataKind::Aura => {
                if !caps.aura {
                    return None;
                }
                json!({"mode": self.aura_mode, "brightness": self.aura_brightness})
            }
            DataKind::Firmware => json!({
                "current": self.identity.firmware,
                "available": self.firmware_available,
                "update_available": self.firmware_available.is_some(),
            }),
            DataKind::FirmwareNote => {
                let version = self.firmware_available.as_ref()?;
                json!({
                    "version": version,
                    "notes": "Security fixes and improved WiFi stability."
                })
            }
            DataKind::Boottime => json!({
                "datetime": self.boot_time.to_rfc3339(),
                "timestamp": self.boot_time.timestamp(),
            }),
            DataKind::Dsl => {
                if !caps.dsl {
                    return None;
                }
                json!({"line_state": "up", "sync_down_kbps": 100_000, "sync_up_kbps": 40_000})
            }
            DataKind::Ports => json!({
                "wan": [{"port": 0, "link": true, "speed_mbps": 1000}],
                "lan": [
                    {"port": 1, "link": true, "speed_mbps": 1000},
                    {"port": 2, "link": false, "speed_mbps": 0},
                    {"port": 3, "link": true, "speed_mbps": 100},
                    {"port": 4, "link": false, "speed_mbps": 0}
                ]
            }),
            DataKind::Devicemap => json!({
                "clients_online": self.online_clients(),
                "wan_status": "connected",
                "model": self.identity.model,
            }),
            DataKind::Flags => json!({
                "reboot": false,
                "firmware_checked": self.firmware_checked,
            }),
            DataKind::Speedtest => {
                if !caps.speedtest {
                    return None;
                }
                json!({
                    "running": self.speedtest.is_some() && self.speedtest_result().is_none(),
                    "history_size": usize::from(self.speedtest_result().is_some()),
                })
            }
            DataKind::SpeedtestResult => self.speedtest_result()?,
            DataKind::Ping => json!({"target": "8.8.8.8", "latency_ms": 12.4, "loss": 0.0}),
        };
        Some(value)
    }

    fn online_clients(&self) -> usize {
        self.clients
            .as_object()
            .map(|c| c.values().filter(|d| d["online"] == json!(true)).count())
            .unwrap_or(0)
    }

    /// Apply a mutation. `Ok(false)` means the router did not confirm it.
    pub fn apply(&mut self, action: &Action) -> ClientResult<bool> {
        let caps = self.identity.capabilities.clone();
        match action {
            Action::Reboot => {
                self.reboot();
            }
            Action::RestartService { service } => {
                self.restarted_services.push(service.to_string());
            }
            Action::SetWlanRadio { band, enable } => {
                self.band_available(*band)?;
                self.radios.insert(*band, *enable);
            }
            Action::SetGuestWlan {
                band,
                index,
                enable,
            } => {
                self.band_available(*band)?;
                match self.guest_networks.get_mut(&(*band, *index)) {
                    Some(slot) => *slot = *enable,
                    None => {
                        return Err(ClientError::Device(format!(
                            "Guest network {} does not exist on {}",
                            index, band
                        )))
                    }
                }
            }
            Action::SetLed { enable } => {
                self.capability(caps.led, "LED control")?;
                self.led = *enable;
            }
            Action::SetAuraMode { mode, brightness } => {
                self.capability(caps.aura, "Aura RGB")?;
                self.aura_mode = *mode;
                if let Some(level) = brightness {
                    self.aura_brightness = *level;
                }
            }
            Action::SetOpenvpnClient { id, enable } => {
                set_instance(&mut self.openvpn_clients, *id, *enable, "OpenVPN client")?
            }
            Action::SetOpenvpnServer { id, enable } => {
                set_instance(&mut self.openvpn_servers, *id, *enable, "OpenVPN server")?
            }
            Action::SetWireguardClient { id, enable } => {
                self.capability(caps.wireguard, "WireGuard")?;
                set_instance(&mut self.wireguard_clients, *id, *enable, "WireGuard client")?
            }
            Action::SetWireguardServer { id, enable } => {
                self.capability(caps.wireguard, "WireGuard")?;
                if *id != 1 {
                    return Err(ClientError::Device(format!("WireGuard server {} does not exist", id)));
                }
                self.wireguard_server = *enable;
            }
            Action::SetVpnFusion { profile_id, enable } => {
                self.capability(caps.vpn_fusion, "VPN fusion")?;
                match self.vpn_fusion.get_mut(profile_id) {
                    Some((_, active)) => *active = *enable,
                    None => {
                        return Err(ClientError::Device(format!(
                            "VPN fusion profile {} does not exist",
                            profile_id
                        )))
                    }
                }
            }
            Action::SetParentalBlock { mac, block } => {
                if *block {
                    self.blocked.insert(mac.to_string());
                } else {
                    self.blocked.remove(mac.as_str());
                }
            }
            Action::SetPortForwarding { enable } => {
                self.port_forwarding = *enable;
            }
            Action::AddPortForwardRule { rule } => {
                if self
                    .port_forward_rules
                    .iter()
                    .any(|r| r.external_port == rule.external_port && overlaps(r.protocol, rule.protocol))
                {
                    return Err(ClientError::Device(format!(
                        "A rule for external port {} ({}) already exists",
                        rule.external_port, rule.protocol
                    )));
                }
                self.port_forward_rules.push(rule.clone());
            }
            Action::RemovePortForwardRule {
                external_port,
                protocol,
            } => {
                let before = self.port_forward_rules.len();
                self.port_forward_rules
                    .retain(|r| !(r.external_port == *external_port && r.protocol == *protocol));
                return Ok(self.port_forward_rules.len() < before);
            }
            Action::FirmwareCheck => {
                self.firmware_checked = true;
            }
            Action::FirmwareUpgrade => match self.firmware_available.take() {
                Some(version) => {
                    self.identity.firmware = version;
                    self.reboot();
                }
                None => return Ok(false),
            },
            Action::SpeedtestStart => {
                self.capability(caps.speedtest, "Speed test")?;
                self.speedtest = Some(SpeedtestRun {
                    started: Instant::now(),
                    duration: self.speedtest_duration,
                });
            }
        }
        Ok(true)
    }

    fn reboot(&mut self) {
        self.boot_time = Utc::now();
        self.reboot_count += 1;
        self.speedtest = None;
    }
}

fn overlaps(a: Protocol, b: Protocol) -> bool {
    a == b || a == Protocol::Both || b == Protocol::Both
}

fn instances(states: &[bool]) -> Value {
    let map: Map<String, Value> = states
        .iter()
        .enumerate()
        .map(|(i, on)| ((i + 1).to_string(), json!({"state": on_off(*on)})))
        .collect();
    Value::Object(map)
}

fn set_instance(states: &mut [bool], id: u8, enable: bool, what: &str) -> ClientResult<()> {
    let slot = usize::from(id)
        .checked_sub(1)
        .and_then(|i| states.get_mut(i))
        .ok_or_else(|| ClientError::Device(format!("{} {} does not exist", what, id)))?;
    *slot = enable;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use router_core::{MacAddress, Service};

    #[test]
    fn every_kind_renders_or_is_absent_by_capability() {
        let state = RouterState::default();
        for kind in DataKind::ALL {
            let rendered = state.render(kind);
            match kind {
                DataKind::Dsl | DataKind::SpeedtestResult => assert!(rendered.is_none(), "{}", kind),
                _ => assert!(rendered.is_some(), "{}", kind),
            }
        }
    }

    #[test]
    fn reads_are_stable() {
        let state = RouterState::default();
        for kind in DataKind::ALL {
            assert_eq!(state.render(kind), state.render(kind));
        }
    }

    #[test]
    fn led_change_is_visible() {
        let mut state = RouterState::default();
        assert!(state.apply(&Action::SetLed { enable: false }).unwrap());
        assert_eq!(state.render(DataKind::Led), Some(json!({"state": "off"})));
    }

    #[test]
    fn missing_band_is_a_device_error() {
        let mut state = RouterState::default();
        let err = state
            .apply(&Action::SetWlanRadio {
                band: Band::SixGhz,
                enable: true,
            })
            .unwrap_err();
        assert_eq!(err, ClientError::Device("Band 6ghz is not available".to_string()));
    }

    #[test]
    fn parental_block_round_trips_through_render() {
        let mut state = RouterState::default();
        let mac: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        state
            .apply(&Action::SetParentalBlock {
                mac: mac.clone(),
                block: true,
            })
            .unwrap();
        assert_eq!(
            state.render(DataKind::ParentalControl).unwrap()["blocked"],
            json!(["AA:BB:CC:DD:EE:FF"])
        );
        state
            .apply(&Action::SetParentalBlock { mac, block: false })
            .unwrap();
        assert_eq!(
            state.render(DataKind::ParentalControl).unwrap()["blocked"],
            json!([])
        );
    }

    #[test]
    fn duplicate_port_forward_rule_is_rejected() {
        let mut state = RouterState::default();
        let rule = PortForwardRule {
            name: "ssh".to_string(),
            external_port: 2222,
            internal_ip: "192.168.1.30".parse().unwrap(),
            internal_port: Some(22),
            protocol: Protocol::Tcp,
        };
        state
            .apply(&Action::AddPortForwardRule { rule: rule.clone() })
            .unwrap();
        let both = PortForwardRule {
            protocol: Protocol::Both,
            ..rule
        };
        assert!(state
            .apply(&Action::AddPortForwardRule { rule: both })
            .is_err());
        assert!(state
            .apply(&Action::RemovePortForwardRule {
                external_port: 2222,
                protocol: Protocol::Tcp
            })
            .unwrap());
        assert!(!state
            .apply(&Action::RemovePortForwardRule {
                external_port: 2222,
                protocol: Protocol::Tcp
            })
            .unwrap());
    }

    #[test]
    fn firmware_upgrade_installs_available_version() {
        let mut state = RouterState::default();
        assert!(state.apply(&Action::FirmwareUpgrade).unwrap());
        assert_eq!(state.identity.firmware, "3.0.0.4.388_24243");
        assert_eq!(state.reboot_count, 1);
        assert!(state.render(DataKind::FirmwareNote).is_none());
        assert!(!state.apply(&Action::FirmwareUpgrade).unwrap());
    }

    #[test]
    fn unknown_instance_ids_are_device_errors() {
        let mut state = RouterState::default();
        assert!(state
            .apply(&Action::SetOpenvpnServer { id: 3, enable: true })
            .is_err());
        assert!(state
            .apply(&Action::SetVpnFusion {
                profile_id: 9,
                enable: true
            })
            .is_err());
        state
            .apply(&Action::RestartService {
                service: Service::Httpd,
            })
            .unwrap();
        assert_eq!(state.restarted_services, vec!["httpd".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn speedtest_result_appears_after_duration() {
        let mut state = RouterState::default();
        state.apply(&Action::SpeedtestStart).unwrap();
        assert!(state.render(DataKind::SpeedtestResult).is_none());
        tokio::time::advance(Duration::from_secs(21)).await;
        assert!(state.render(DataKind::SpeedtestResult).is_some());
    }
}
