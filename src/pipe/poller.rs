//! Background driver for a [`FakeNetworkPipe`] on the tokio runtime

use crate::pipe::FakeNetworkPipe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Stops the poller task when shut down or dropped
pub struct PollerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stop polling and wait for the task to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("pipe poller ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Call `network_process` whenever the pipe reports work is due, at most
/// `NETWORK_PROCESS_MAX_WAIT_MS` apart.
///
/// Must be called from within a tokio runtime.
pub fn spawn_network_process(pipe: Arc<FakeNetworkPipe>) -> PollerHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        tracing::debug!("pipe poller started");
        loop {
            let wait_ms = pipe.time_until_next_process().max(1) as u64;
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {
                    pipe.network_process();
                }
            }
        }
        // Flush whatever is already due
        pipe.network_process();
        tracing::debug!("pipe poller stopped");
    });

    PollerHandle {
        shutdown: Some(shutdown_tx),
        task: Some(task),
    }
}
