//! Periodic task scheduling
//!
//! The sync task only depends on the [`TaskScheduler`] trait. [`LocalScheduler`]
//! is the in-process implementation used by the agent: one tokio loop per
//! task, an initial delay, a fixed frequency and a per-invocation timeout.

use crate::error::ConfigError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default time between invocations (1 hour)
pub const DEFAULT_FREQUENCY: Duration = Duration::from_secs(60 * 60);

/// Default bound on a single invocation (2 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Default delay before the first invocation, giving the host time to boot
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Whether invocations may overlap across host instances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleScope {
    /// Only one runner across all instances
    #[default]
    Global,
    /// Every instance runs its own copy
    Local,
}

impl fmt::Display for ScheduleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleScope::Global => write!(f, "global"),
            ScheduleScope::Local => write!(f, "local"),
        }
    }
}

/// A configured duration: `"1h 30m"` or `{ hours: 1, minutes: 30 }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    Human(String),
    Parts(DurationParts),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DurationParts {
    #[serde(default)]
    pub days: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
    #[serde(default)]
    pub milliseconds: u64,
}

impl DurationParts {
    /// `None` when the total does not fit in a [`Duration`]
    fn to_duration(&self) -> Option<Duration> {
        let secs = self
            .days
            .checked_mul(86_400)?
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)?;
        Duration::from_secs(secs).checked_add(Duration::from_millis(self.milliseconds))
    }
}

impl DurationSpec {
    /// Convert to a [`Duration`]; `key` names the setting in error messages
    pub fn resolve(&self, key: &str) -> Result<Duration, ConfigError> {
        match self {
            DurationSpec::Human(text) => {
                humantime::parse_duration(text.trim()).map_err(|e| ConfigError::InvalidDuration {
                    key: key.to_string(),
                    message: format!("{:?}: {}", text, e),
                })
            }
            DurationSpec::Parts(parts) => {
                parts.to_duration().ok_or_else(|| ConfigError::InvalidDuration {
                    key: key.to_string(),
                    message: format!("{:?} is out of range", parts),
                })
            }
        }
    }
}

/// Immutable schedule of a registered task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskScheduleDefinition {
    pub id: String,
    pub frequency: Duration,
    pub timeout: Duration,
    pub initial_delay: Duration,
    pub scope: ScheduleScope,
}

impl TaskScheduleDefinition {
    pub fn with_defaults(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            frequency: DEFAULT_FREQUENCY,
            timeout: DEFAULT_TIMEOUT,
            initial_delay: DEFAULT_INITIAL_DELAY,
            scope: ScheduleScope::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency.is_zero() {
            return Err(ConfigError::ZeroDuration {
                key: "dx.schedule.frequency".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                key: "dx.schedule.timeout".to_string(),
            });
        }
        Ok(())
    }
}

/// Unit of work invoked on every tick
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Run once. Implementations handle their own failures.
    async fn run(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid schedule: {0}")]
    InvalidDefinition(#[from] ConfigError),

    #[error("task `{0}` is already scheduled")]
    DuplicateTask(String),

    #[error("scheduler has been shut down")]
    ShutDown,
}

/// Periodic execution service
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn schedule_task(
        &self,
        definition: TaskScheduleDefinition,
        task: Arc<dyn ScheduledTask>,
    ) -> Result<(), ScheduleError>;
}

/// In-process scheduler built on tokio intervals
///
/// Invocations of a task run inline in that task's loop, so they never
/// overlap within the process. There is no cross-host coordination; the
/// definition's scope is only reported.
pub struct LocalScheduler {
    shutdown_tx: broadcast::Sender<()>,
    state: Mutex<SchedulerState>,
}

#[derive(Default)]
struct SchedulerState {
    task_ids: HashSet<String>,
    handles: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Number of task loops currently registered
    pub async fn task_count(&self) -> usize {
        self.state.lock().await.task_ids.len()
    }

    /// Signal every task loop to stop and wait for them to exit
    pub async fn shutdown(&self) {
        let handles = {
            let mut state = self.state.lock().await;
            state.stopped = true;
            std::mem::take(&mut state.handles)
        };

        let _ = self.shutdown_tx.send(());

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduled task loop ended abnormally");
            }
        }

        info!("Scheduler stopped");
    }
}

#[async_trait]
impl TaskScheduler for LocalScheduler {
    async fn schedule_task(
        &self,
        definition: TaskScheduleDefinition,
        task: Arc<dyn ScheduledTask>,
    ) -> Result<(), ScheduleError> {
        definition.validate()?;

        let mut state = self.state.lock().await;
        if state.stopped {
            return Err(ScheduleError::ShutDown);
        }
        if !state.task_ids.insert(definition.id.clone()) {
            return Err(ScheduleError::DuplicateTask(definition.id));
        }

        info!(
            task_id = %definition.id,
            frequency_secs = definition.frequency.as_secs(),
            timeout_secs = definition.timeout.as_secs(),
            initial_delay_ms = definition.initial_delay.as_millis() as u64,
            scope = %definition.scope,
            "Scheduled task registered"
        );

        let shutdown = self.shutdown_tx.subscribe();
        state
            .handles
            .push(tokio::spawn(run_task_loop(definition, task, shutdown)));

        Ok(())
    }
}

async fn run_task_loop(
    definition: TaskScheduleDefinition,
    task: Arc<dyn ScheduledTask>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::select! {
        _ = tokio::time::sleep(definition.initial_delay) => {}
        _ = shutdown.recv() => {
            info!(task_id = %definition.id, "Scheduled task cancelled before first run");
            return;
        }
    }

    let mut ticker = interval(definition.frequency);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let start = Instant::now();

                match tokio::time::timeout(definition.timeout, task.run()).await {
                    Ok(()) => {
                        debug!(
                            task_id = %definition.id,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Scheduled task invocation complete"
                        );
                    }
                    Err(_) => {
                        warn!(
                            task_id = %definition.id,
                            timeout_secs = definition.timeout.as_secs(),
                            "Scheduled task timed out and was cancelled"
                        );
                    }
                }
            }
            _ = shutdown.recv() => {
                info!(task_id = %definition.id, "Shutting down scheduled task");
                break;
            }
        }
    }
}
