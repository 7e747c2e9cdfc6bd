//! Run operations in the background with streamed progress.

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use fileworks_core::{OperationError, OpsConfig};

use crate::operation::{Operation, Summary};
use crate::progress::{Progress, ProgressSnapshot};

/// Message sent from a running operation.
#[derive(Debug)]
pub enum OperationEvent {
    /// Periodic progress update.
    Progress(ProgressSnapshot),
    /// The operation finished. Always the last event.
    Complete(Result<Summary, OperationError>),
}

/// Spawns operations onto the blocking thread pool.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct OperationExecutor {
    config: OpsConfig,
}

impl OperationExecutor {
    /// Create a new executor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with explicit settings.
    pub fn with_config(config: OpsConfig) -> Self {
        Self { config }
    }

    /// Start `operation` and return a handle to observe or cancel it.
    pub fn spawn<O: Operation>(&self, operation: O) -> OperationHandle {
        let (tx, rx) = mpsc::channel(self.config.channel_size);
        let cancel = CancellationToken::new();
        let progress = operation.progress();
        let interval = self.config.progress_interval();

        let token = cancel.clone();
        let observer = progress.clone();
        let operation_type = operation.operation_type();

        tokio::spawn(async move {
            let mut task = tokio::task::spawn_blocking(move || operation.execute(&token));
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let joined = loop {
                tokio::select! {
                    joined = &mut task => break joined,
                    _ = ticker.tick() => {
                        // Progress is lossy; a full channel just skips a tick.
                        let _ = tx.try_send(OperationEvent::Progress(observer.snapshot()));
                    }
                }
            };

            let result = joined.unwrap_or_else(|e| {
                tracing::error!(operation = %operation_type, error = %e, "operation task failed");
                Err(OperationError::Aborted(e.to_string()))
            });
            let _ = tx.send(OperationEvent::Complete(result)).await;
        });

        OperationHandle {
            events: rx,
            cancel,
            progress,
        }
    }
}

/// Handle to an operation started by [`OperationExecutor::spawn`].
#[derive(Debug)]
pub struct OperationHandle {
    events: mpsc::Receiver<OperationEvent>,
    cancel: CancellationToken,
    progress: Progress,
}

impl OperationHandle {
    /// Ask the operation to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this operation when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live counters of the operation.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Receive the next event, or `None` once the operation has completed and
    /// all events were read.
    pub async fn recv(&mut self) -> Option<OperationEvent> {
        self.events.recv().await
    }

    /// Wait for the operation to finish, discarding progress events.
    pub async fn wait(mut self) -> Result<Summary, OperationError> {
        while let Some(event) = self.events.recv().await {
            if let OperationEvent::Complete(result) = event {
                return result;
            }
        }
        Err(OperationError::Aborted(
            "event channel closed before completion".to_string(),
        ))
    }
}
