//! Router connection settings

use serde::{Deserialize, Serialize};

/// Address and credentials of the managed router.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Hostname or IP address of the router
    pub hostname: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Use HTTPS instead of plain HTTP
    #[serde(default)]
    pub use_ssl: bool,
    /// Non-default management port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Credentials {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            use_ssl: false,
            port: None,
        }
    }

    /// Base URL of the router's management interface
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{}://{}:{}", scheme, self.hostname, port),
            None => format!("{}://{}", scheme, self.hostname),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .field("port", &self.port)
            .finish()
    }
}
