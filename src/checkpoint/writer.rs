use crate::checkpoint::{Checkpoint, CheckpointResult, CheckpointStore};
use crate::frontier::FrontierState;
use tokio::task::JoinHandle;

/// Writes checkpoints on the blocking pool, one at a time and in order
///
/// `schedule` returns as soon as the previous write has finished and the new
/// one is started, so the crawl loop never waits on the current write.
/// Failed writes are logged and skipped; the next snapshot supersedes them.
#[derive(Debug)]
pub struct CheckpointWriter {
    store: CheckpointStore,
    config_hash: Option<String>,
    in_flight: Option<JoinHandle<CheckpointResult<()>>>,
    /// Last snapshot handed to a write that has not failed
    last: Option<FrontierState>,
    written: u64,
}

impl CheckpointWriter {
    pub fn new(store: CheckpointStore, config_hash: Option<String>) -> Self {
        Self {
            store,
            config_hash,
            in_flight: None,
            last: None,
            written: 0,
        }
    }

    /// Starts writing `state`, unless it equals the last snapshot written
    pub async fn schedule(&mut self, state: FrontierState) {
        self.wait().await;

        if self.last.as_ref() == Some(&state) {
            return;
        }

        let store = self.store.clone();
        let checkpoint = Checkpoint::new(state.clone(), self.config_hash.clone());
        self.in_flight = Some(tokio::task::spawn_blocking(move || store.save(&checkpoint)));
        self.last = Some(state);
    }

    /// Waits for the pending write; returns false if it failed
    pub async fn wait(&mut self) -> bool {
        let Some(handle) = self.in_flight.take() else {
            return true;
        };

        let error = match handle.await {
            Ok(Ok(())) => {
                self.written += 1;
                return true;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(
            "Checkpoint write to {} failed, continuing: {}",
            self.store.path().display(),
            error
        );
        self.last = None;
        false
    }

    /// Number of checkpoints written successfully
    pub fn written(&self) -> u64 {
        self.written
    }
}
