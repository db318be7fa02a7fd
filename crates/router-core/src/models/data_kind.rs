//! Router data categories

use serde::{Deserialize, Serialize};

/// Category of router status or configuration to fetch.
///
/// The wire name is the uppercase identifier (`CLIENTS`, `PORT_FORWARDING`,
/// ...). Parsing uppercases its input first, so `clients` is accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataKind {
    Clients,
    Wlan,
    Gwlan,
    Network,
    ParentalControl,
    Aimesh,
    Sysinfo,
    Cpu,
    Ram,
    Temperature,
    Wan,
    PortForwarding,
    OpenvpnClient,
    OpenvpnServer,
    WireguardClient,
    WireguardServer,
    Vpnc,
    Led,
    Aura,
    Firmware,
    FirmwareNote,
    Boottime,
    Dsl,
    Ports,
    Devicemap,
    Flags,
    Speedtest,
    SpeedtestResult,
    Ping,
}

impl DataKind {
    /// Every kind, in catalog order
    pub const ALL: [DataKind; 29] = [
        DataKind::Clients,
        DataKind::Wlan,
        DataKind::Gwlan,
        DataKind::Network,
        DataKind::ParentalControl,
        DataKind::Aimesh,
        DataKind::Sysinfo,
        DataKind::Cpu,
        DataKind::Ram,
        DataKind::Temperature,
        DataKind::Wan,
        DataKind::PortForwarding,
        DataKind::OpenvpnClient,
        DataKind::OpenvpnServer,
        DataKind::WireguardClient,
        DataKind::WireguardServer,
        DataKind::Vpnc,
        DataKind::Led,
        DataKind::Aura,
        DataKind::Firmware,
        DataKind::FirmwareNote,
        DataKind::Boottime,
        DataKind::Dsl,
        DataKind::Ports,
        DataKind::Devicemap,
        DataKind::Flags,
        DataKind::Speedtest,
        DataKind::SpeedtestResult,
        DataKind::Ping,
    ];

    /// Uppercase wire name
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataKind::Clients => "CLIENTS",
            DataKind::Wlan => "WLAN",
            DataKind::Gwlan => "GWLAN",
            DataKind::Network => "NETWORK",
            DataKind::ParentalControl => "PARENTAL_CONTROL",
            DataKind::Aimesh => "AIMESH",
            DataKind::Sysinfo => "SYSINFO",
            DataKind::Cpu => "CPU",
            DataKind::Ram => "RAM",
            DataKind::Temperature => "TEMPERATURE",
            DataKind::Wan => "WAN",
            DataKind::PortForwarding => "PORT_FORWARDING",
            DataKind::OpenvpnClient => "OPENVPN_CLIENT",
            DataKind::OpenvpnServer => "OPENVPN_SERVER",
            DataKind::WireguardClient => "WIREGUARD_CLIENT",
            DataKind::WireguardServer => "WIREGUARD_SERVER",
            DataKind::Vpnc => "VPNC",
            DataKind::Led => "LED",
            DataKind::Aura => "AURA",
            DataKind::Firmware => "FIRMWARE",
            DataKind::FirmwareNote => "FIRMWARE_NOTE",
            DataKind::Boottime => "BOOTTIME",
            DataKind::Dsl => "DSL",
            DataKind::Ports => "PORTS",
            DataKind::Devicemap => "DEVICEMAP",
            DataKind::Flags => "FLAGS",
            DataKind::Speedtest => "SPEEDTEST",
            DataKind::SpeedtestResult => "SPEEDTEST_RESULT",
            DataKind::Ping => "PING",
        }
    }

    /// Lowercase label used in informational messages
    pub fn label(&self) -> &'static str {
        match self {
            DataKind::Clients => "connected devices",
            DataKind::Wlan => "WLAN",
            DataKind::Gwlan => "guest WLAN",
            DataKind::Network => "network statistics",
            DataKind::ParentalControl => "parental control",
            DataKind::Aimesh => "AiMesh",
            DataKind::Sysinfo => "system information",
            DataKind::Cpu => "CPU usage",
            DataKind::Ram => "RAM usage",
            DataKind::Temperature => "temperature",
            DataKind::Wan => "WAN",
            DataKind::PortForwarding => "port forwarding",
            DataKind::OpenvpnClient => "OpenVPN client",
            DataKind::OpenvpnServer => "OpenVPN server",
            DataKind::WireguardClient => "WireGuard client",
            DataKind::WireguardServer => "WireGuard server",
            DataKind::Vpnc => "VPN fusion",
            DataKind::Led => "LED",
            DataKind::Aura => "Aura RGB",
            DataKind::Firmware => "firmware",
            DataKind::FirmwareNote => "firmware release notes",
            DataKind::Boottime => "boot time",
            DataKind::Dsl => "DSL",
            DataKind::Ports => "port status",
            DataKind::Devicemap => "device map",
            DataKind::Flags => "router flags",
            DataKind::Speedtest => "speed test",
            DataKind::SpeedtestResult => "speed test result",
            DataKind::Ping => "ping",
        }
    }

    /// One-line description for the data type catalog
    pub fn description(&self) -> &'static str {
        match self {
            DataKind::Clients => "Connected client devices keyed by MAC address",
            DataKind::Wlan => "Wireless network settings and radio state per band",
            DataKind::Gwlan => "Guest wireless networks per band",
            DataKind::Network => "Traffic counters and rates per interface",
            DataKind::ParentalControl => "Parental control state and blocked devices",
            DataKind::Aimesh => "AiMesh nodes and their status",
            DataKind::Sysinfo => "Load averages and system counters",
            DataKind::Cpu => "CPU usage per core",
            DataKind::Ram => "Memory usage",
            DataKind::Temperature => "Temperature sensors (CPU and radios)",
            DataKind::Wan => "WAN connection status and addressing",
            DataKind::PortForwarding => "Port forwarding switch and rules",
            DataKind::OpenvpnClient => "OpenVPN client instances",
            DataKind::OpenvpnServer => "OpenVPN server instances",
            DataKind::WireguardClient => "WireGuard client instances",
            DataKind::WireguardServer => "WireGuard server instances",
            DataKind::Vpnc => "VPN fusion profiles",
            DataKind::Led => "Status LED state",
            DataKind::Aura => "Aura RGB lighting mode",
            DataKind::Firmware => "Installed firmware and available updates",
            DataKind::FirmwareNote => "Release notes for the available firmware",
            DataKind::Boottime => "Boot timestamp and uptime",
            DataKind::Dsl => "DSL line status",
            DataKind::Ports => "Physical port link state",
            DataKind::Devicemap => "Device map summary",
            DataKind::Flags => "Internal router flags",
            DataKind::Speedtest => "Speed test configuration and history",
            DataKind::SpeedtestResult => "Result of the latest speed test",
            DataKind::Ping => "Connectivity check results",
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        DataKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == upper)
            .ok_or_else(|| format!("Invalid data type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("clients".parse::<DataKind>().unwrap(), DataKind::Clients);
        assert_eq!(
            "Port_Forwarding".parse::<DataKind>().unwrap(),
            DataKind::PortForwarding
        );
    }

    #[test]
    fn unknown_kind_keeps_original_input_in_message() {
        let err = "bogus".parse::<DataKind>().unwrap_err();
        assert_eq!(err, "Invalid data type: bogus");
    }

    #[test]
    fn serde_name_matches_wire_name() {
        for kind in DataKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }
}
