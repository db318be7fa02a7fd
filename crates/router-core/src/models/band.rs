//! Wireless bands

use serde::{Deserialize, Serialize};

/// Radio band of a wireless interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "2.4ghz")]
    TwoGhz,
    #[serde(rename = "5ghz")]
    FiveGhz,
    /// Second 5 GHz radio on tri-band routers
    #[serde(rename = "5ghz2")]
    FiveGhz2,
    #[serde(rename = "6ghz")]
    SixGhz,
}

impl Band {
    /// Canonical wire names, in the order advertised to clients
    pub const NAMES: &'static [&'static str] = &["2.4ghz", "5ghz", "5ghz2", "6ghz"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::TwoGhz => "2.4ghz",
            Band::FiveGhz => "5ghz",
            Band::FiveGhz2 => "5ghz2",
            Band::SixGhz => "6ghz",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2.4ghz" | "2g" | "2.4g" => Ok(Band::TwoGhz),
            "5ghz" | "5g" => Ok(Band::FiveGhz),
            "5ghz2" | "5g2" => Ok(Band::FiveGhz2),
            "6ghz" | "6g" => Ok(Band::SixGhz),
            _ => Err(format!(
                "Invalid band: {}. Expected one of: {}",
                s,
                Band::NAMES.join(", ")
            )),
        }
    }
}
