//! Router identity

use serde::{Deserialize, Serialize};

use super::Band;

/// Static description of the connected router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Model name (e.g. "RT-AX88U")
    pub model: String,
    /// Installed firmware version
    pub firmware: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// LAN MAC address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// Optional feature support
    pub capabilities: IdentityCapabilities,
    /// Radio bands this router has
    pub bands: Vec<Band>,
}

impl Identity {
    pub fn supports_band(&self, band: Band) -> bool {
        self.bands.contains(&band)
    }
}

/// Optional features reported by the router
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCapabilities {
    /// Aura RGB lighting
    pub aura: bool,
    /// Controllable status LED
    pub led: bool,
    pub aimesh: bool,
    pub dsl: bool,
    pub vpn_fusion: bool,
    pub wireguard: bool,
    /// Built-in (Ookla) speed test
    pub speedtest: bool,
}
