//! Logging initialization and the tracing observer.
//!
//! Logs go to stderr so that stdout stays reserved for outputs and workflow
//! commands.

use meshnode_reconcile::{Observer, WaitEvent, WaiterState};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{Config, LogFormat};
use crate::reconciler::{AbsentReason, ReconcileEvent};

/// Initialize tracing (prefer RUST_LOG, fallback to MESHNODE_LOG_LEVEL).
pub fn init(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Forwards reconciler events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer<ReconcileEvent> for TracingObserver {
    fn observe(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::Searching { name } => info!(name = %name, "Searching for virtual node"),
            ReconcileEvent::Found { name } => info!(name = %name, "Virtual node found"),
            ReconcileEvent::FoundInactive { name } => {
                warn!(name = %name, "Virtual node found, but it is INACTIVE")
            }
            ReconcileEvent::Absent { name, reason } => match reason {
                AbsentReason::NotFound => {
                    info!(name = %name, "Unable to find virtual node, creating")
                }
                AbsentReason::Deleted => {
                    info!(name = %name, "Virtual node found, but it is DELETED; creating")
                }
            },
            ReconcileEvent::Created { name } => info!(name = %name, "Virtual node created"),
            ReconcileEvent::Deleting { name } => info!(name = %name, "Deleting virtual node"),
            ReconcileEvent::WaitingForDeletion { name } => {
                info!(name = %name, "Waiting for virtual node to be deleted")
            }
            ReconcileEvent::Deleted { name } => info!(name = %name, "Virtual node deleted"),
            ReconcileEvent::Wait(wait) => observe_wait(wait),
        }
    }
}

fn observe_wait(event: &WaitEvent) {
    match event {
        WaitEvent::Attempt { attempt } => debug!(attempt, "Polling virtual node"),
        WaitEvent::Retrying {
            attempt,
            delay,
            elapsed,
        } => info!(
            attempt,
            delay_secs = delay.as_secs_f64(),
            elapsed_secs = elapsed.as_secs(),
            "Virtual node still exists, polling again"
        ),
        WaitEvent::Finished {
            state,
            attempts,
            elapsed,
        } => match state {
            WaiterState::TimedOut | WaiterState::Failed => warn!(
                state = %state,
                attempts,
                elapsed_secs = elapsed.as_secs(),
                "Stopped waiting for deletion"
            ),
            _ => info!(
                state = %state,
                attempts,
                elapsed_secs = elapsed.as_secs(),
                "Done waiting for deletion"
            ),
        },
    }
}
