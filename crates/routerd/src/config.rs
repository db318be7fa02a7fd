//! Daemon configuration
//!
//! TOML file plus environment overrides. The router password is never taken
//! from a literal in the binary: it comes from the file, `ROUTER_PASSWORD`,
//! or the variable named by `router.password_env`.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use router_core::{Credentials, DispatchConfig, SessionConfig, SpeedtestConfig};
use serde::Deserialize;

/// Complete daemon configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub speedtest: SpeedtestConfig,
    #[serde(default)]
    pub simulator: SimulatorSection,
}

/// `[router]`: where and how to log in
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_username")]
    pub username: String,
    /// Plain password; prefer `password_env`
    pub password: Option<String>,
    /// Name of the environment variable holding the password
    pub password_env: Option<String>,
    #[serde(default)]
    pub use_ssl: bool,
    pub port: Option<u16>,
}

fn default_hostname() -> String {
    "192.168.1.1".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            username: default_username(),
            password: None,
            password_env: None,
            use_ssl: false,
            port: None,
        }
    }
}

/// `[server]`: HTTP listener
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_operation_timeout() -> u64 {
    DispatchConfig::default().operation_timeout_secs
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

/// `[simulator]`: the in-process demo router
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Added delay per router call
    #[serde(default)]
    pub latency_ms: u64,
    /// How long a simulated speed test runs
    #[serde(default = "default_speedtest_secs")]
    pub speedtest_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_speedtest_secs() -> u64 {
    20
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            latency_ms: 0,
            speedtest_secs: default_speedtest_secs(),
        }
    }
}

impl SimulatorSection {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn speedtest_duration(&self) -> Duration {
        Duration::from_secs(self.speedtest_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Reject timing values that would disable deadlines or polling backoff
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.operation_timeout_secs == 0 {
            bail!("dispatch.operation_timeout_secs must be greater than 0");
        }
        let speedtest = &self.speedtest;
        if speedtest.deadline_secs == 0 {
            bail!("speedtest.deadline_secs must be greater than 0");
        }
        if speedtest.initial_backoff_ms == 0 {
            bail!("speedtest.initial_backoff_ms must be greater than 0");
        }
        if speedtest.initial_backoff_ms > speedtest.max_backoff_ms {
            bail!(
                "speedtest.initial_backoff_ms ({}) must not exceed speedtest.max_backoff_ms ({})",
                speedtest.initial_backoff_ms,
                speedtest.max_backoff_ms
            );
        }
        Ok(())
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply `ROUTER_HOST`, `ROUTER_USERNAME` and `ROUTER_USE_SSL`
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = env("ROUTER_HOST") {
            self.router.hostname = host;
        }
        if let Some(user) = env("ROUTER_USERNAME") {
            self.router.username = user;
        }
        if let Some(flag) = env("ROUTER_USE_SSL") {
            self.router.use_ssl = parse_flag(&flag)
                .with_context(|| format!("Invalid ROUTER_USE_SSL value: {flag}"))?;
        }
        Ok(())
    }

    /// Resolve login credentials.
    ///
    /// Password lookup order: `ROUTER_PASSWORD`, the variable named by
    /// `password_env`, then `router.password`.
    pub fn credentials(&self, env: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let router = &self.router;
        if router.hostname.trim().is_empty() {
            bail!("Router hostname is not configured (set ROUTER_HOST or router.hostname)");
        }
        if router.username.trim().is_empty() {
            bail!("Router username is not configured (set ROUTER_USERNAME or router.username)");
        }

        let password = env("ROUTER_PASSWORD")
            .or_else(|| router.password_env.as_deref().and_then(&env))
            .or_else(|| router.password.clone())
            .filter(|p| !p.is_empty());
        let Some(password) = password else {
            match &router.password_env {
                Some(var) => bail!("Router password is not configured: {var} is not set"),
                None => bail!(
                    "Router password is not configured (set ROUTER_PASSWORD or router.password_env)"
                ),
            }
        };

        let mut credentials = Credentials::new(&router.hostname, &router.username, password);
        credentials.use_ssl = router.use_ssl;
        credentials.port = router.port;
        Ok(credentials)
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            operation_timeout_secs: self.dispatch.operation_timeout_secs,
            speedtest: self.speedtest.clone(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
