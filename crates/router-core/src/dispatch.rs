//! Operation dispatcher
//!
//! Turns a named call into a result [`Envelope`]: decode and validate the
//! arguments, run the router-client call(s) inside a scoped session, shape
//! the payload under the operation's key. Every failure ends up as an error
//! envelope; nothing is retried.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::{OperationKind, OperationSpec};
use crate::envelope::Envelope;
use crate::error::{OperationError, OperationResult};
use crate::models::{Action, DataKind};
use crate::operation::{Operation, Request};
use crate::session::{Session, SessionManager};

/// Speed test polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedtestConfig {
    /// First wait before polling the result
    pub initial_backoff_ms: u64,
    /// Upper bound of the doubling backoff
    pub max_backoff_ms: u64,
    /// Give up waiting (the test keeps running on the router)
    pub deadline_secs: u64,
}

impl Default for SpeedtestConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 2000,
            max_backoff_ms: 10_000,
            deadline_secs: 90,
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Deadline for session acquisition plus the router-client call(s)
    pub operation_timeout_secs: u64,
    pub speedtest: SpeedtestConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 30,
            speedtest: SpeedtestConfig::default(),
        }
    }
}

impl DispatchConfig {
    fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Shortest wait between speed-test result polls
pub const MIN_POLL_BACKOFF: Duration = Duration::from_millis(100);

impl SpeedtestConfig {
    /// First and largest poll wait, never below [`MIN_POLL_BACKOFF`]
    fn backoff_bounds(&self) -> (Duration, Duration) {
        let max = Duration::from_millis(self.max_backoff_ms).max(MIN_POLL_BACKOFF);
        let initial = Duration::from_millis(self.initial_backoff_ms).clamp(MIN_POLL_BACKOFF, max);
        (initial, max)
    }
}

const REBOOT_MESSAGE: &str = "Reboot command sent successfully. The router will restart now.";
const REBOOT_NOTE: &str = "It may take 1-2 minutes for the router to come back online.";

/// Executes catalog operations against a router through a [`SessionManager`]
pub struct Dispatcher {
    sessions: SessionManager,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(sessions: SessionManager, config: DispatchConfig) -> Self {
        Self { sessions, config }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Decode and run a named call. Never fails: errors become error envelopes.
    pub async fn call(&self, name: &str, args: &Value) -> Envelope {
        match self.invoke(name, args).await {
            Ok(envelope) => envelope,
            Err(err) => err.into(),
        }
    }

    /// Decode and run a named call, keeping the error kind for the caller
    pub async fn invoke(&self, name: &str, args: &Value) -> OperationResult<Envelope> {
        let operation = Operation::from_call(name, args).inspect_err(|e| {
            debug!(operation = name, error = %e, "Rejected invalid call");
        })?;
        self.execute(&operation).await
    }

    /// Run an already validated operation
    pub async fn execute(&self, operation: &Operation) -> OperationResult<Envelope> {
        let started = Instant::now();
        let result = self.run(operation.spec, &operation.request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(
                operation = operation.name(),
                policy = %self.sessions.policy(),
                elapsed_ms,
                "Operation completed"
            ),
            Err(e) => warn!(
                operation = operation.name(),
                policy = %self.sessions.policy(),
                kind = e.kind(),
                error = %e,
                elapsed_ms,
                "Operation failed"
            ),
        }
        result
    }

    async fn run(&self, spec: &'static OperationSpec, request: &Request) -> OperationResult<Envelope> {
        let context = spec.error_context;
        match request {
            Request::DataTypes => Ok(data_types()),
            Request::Fetch(kind) => {
                let kind = *kind;
                debug!(data_kind = %kind, "Fetching router data");
                let payload = self
                    .scoped(context, |session| async move { session.fetch(kind, None).await })
                    .await?;
                Ok(match payload {
                    None | Some(Value::Null) => {
                        Envelope::info(format!("No {} data available", kind.label()))
                    }
                    Some(payload) => {
                        let envelope = Envelope::success(spec.key, payload);
                        if spec.kind == OperationKind::ReadAny {
                            envelope.with("data_type", kind.as_str())
                        } else {
                            envelope
                        }
                    }
                })
            }
            Request::Identity { force } => {
                let force = *force;
                let identity = self
                    .scoped(context, |session| async move { session.identity(force).await })
                    .await?;
                let payload = serde_json::to_value(identity).map_err(|e| OperationError::Device {
                    context,
                    message: e.to_string(),
                })?;
                Ok(Envelope::success(spec.key, payload))
            }
            Request::Apply(action) => {
                let applied = {
                    let action = action.clone();
                    self.scoped(context, |session| async move { session.apply(action).await })
                        .await?
                };
                if applied && matches!(action, Action::Reboot | Action::FirmwareUpgrade) {
                    // The router is going down; a cached session would be dead anyway
                    self.sessions.disconnect().await;
                }
                Ok(mutation_envelope(action, applied))
            }
            Request::ApplyOnBand { band, action } => {
                let band = *band;
                let action = action.clone();
                let outcome = self
                    .scoped(context, |session| {
                        let action = action.clone();
                        async move {
                            let identity = session.identity(false).await?;
                            if !identity.supports_band(band) {
                                return Ok(None);
                            }
                            session.apply(action).await.map(Some)
                        }
                    })
                    .await?;
                match outcome {
                    Some(applied) => Ok(mutation_envelope(&action, applied)),
                    None => Err(OperationError::Unsupported {
                        context,
                        message: format!("Band {} is not supported by this router", band),
                    }),
                }
            }
            Request::Speedtest => self.run_speedtest(context).await,
            Request::Disconnect => {
                let message = if self.sessions.disconnect().await {
                    "Disconnected from router"
                } else {
                    "No active router session"
                };
                Ok(Envelope::mutation(true, message))
            }
        }
    }

    async fn scoped<T, F, Fut>(&self, context: &'static str, f: F) -> OperationResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: std::future::Future<Output = crate::error::ClientResult<T>>,
    {
        self.sessions
            .scoped(self.config.operation_timeout(), f)
            .await
            .map_err(|e| e.into_operation_error(context))
    }

    /// Start a speed test and poll for its result with exponential backoff.
    ///
    /// Runs under the speed-test deadline plus the operation timeout; the
    /// polling itself stops at the speed-test deadline and reports the test as
    /// started instead of failing.
    async fn run_speedtest(&self, context: &'static str) -> OperationResult<Envelope> {
        let settings = self.config.speedtest.clone();
        let wait = Duration::from_secs(settings.deadline_secs);
        let outer = wait.saturating_add(self.config.operation_timeout());

        let (started, result) = self
            .sessions
            .scoped(outer, |session| async move {
                if !session.apply(Action::SpeedtestStart).await? {
                    return Ok((false, None));
                }
                let poll = poll_speedtest(&session, &settings);
                match tokio::time::timeout(wait, poll).await {
                    Ok(result) => result.map(|v| (true, Some(v))),
                    Err(_) => Ok((true, None)),
                }
            })
            .await
            .map_err(|e| e.into_operation_error(context))?;

        Ok(match (started, result) {
            (false, _) => mutation_envelope(&Action::SpeedtestStart, false),
            (true, Some(result)) => {
                Envelope::mutation(true, "Speed test completed").with("speedtest_result", result)
            }
            (true, None) => Envelope::mutation(true, "Speed test started").with(
                "note",
                "The result is not ready yet. Poll get_speedtest_result for it.",
            ),
        })
    }
}

async fn poll_speedtest(
    session: &Session,
    settings: &SpeedtestConfig,
) -> crate::error::ClientResult<Value> {
    let (mut backoff, max) = settings.backoff_bounds();
    loop {
        tokio::time::sleep(backoff).await;
        match session.fetch(DataKind::SpeedtestResult, None).await? {
            Some(result) if !result.is_null() => return Ok(result),
            _ => debug!(backoff_ms = backoff.as_millis() as u64, "Speed test still running"),
        }
        backoff = backoff.saturating_mul(2).min(max);
    }
}

fn mutation_envelope(action: &Action, applied: bool) -> Envelope {
    if !applied {
        return Envelope::mutation(false, format!("Router did not confirm {}", action.describe()));
    }
    match action {
        Action::Reboot => Envelope::mutation(true, REBOOT_MESSAGE).with("note", REBOOT_NOTE),
        Action::FirmwareUpgrade => Envelope::mutation(true, "Firmware upgrade started.").with(
            "note",
            "The router reboots when the upgrade completes. Poll get_firmware_info afterwards.",
        ),
        Action::FirmwareCheck => Envelope::mutation(true, "Firmware update check requested.")
            .with("note", "Poll get_firmware_info for the result."),
        other => Envelope::mutation(true, format!("Applied {}", other.describe())),
    }
}

fn data_types() -> Envelope {
    let kinds: Vec<Value> = DataKind::ALL
        .iter()
        .map(|kind| json!({"name": kind.as_str(), "description": kind.description()}))
        .collect();
    Envelope::success("data_types", Value::Array(kinds))
}
