use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::IndexerConfig;
use crate::error::QueueError;
use crate::indexer::builder::IndexBuilder;

pub const SEARCH_BUILD_EVENT: &str = "search/build";

/// Asynchronous request to rebuild search artifacts for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBuildEvent {
    pub name: String,
    pub data: SearchBuildData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBuildData {
    pub user_id: Uuid,
}

impl SearchBuildEvent {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            name: SEARCH_BUILD_EVENT.to_string(),
            data: SearchBuildData { user_id },
        }
    }
}

pub type RebuildReceiver = mpsc::UnboundedReceiver<SearchBuildEvent>;

/// Producer side of the rebuild pipeline. Events become visible to the batch
/// trigger only after `delay`, so a burst of edits lands in one batch.
#[derive(Clone)]
pub struct RebuildQueue {
    tx: mpsc::UnboundedSender<SearchBuildEvent>,
    delay: Duration,
}

impl RebuildQueue {
    pub fn new(delay: Duration) -> (Self, RebuildReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, delay }, rx)
    }

    /// Schedule a rebuild event for `user_id`. Fire-and-forget: the caller
    /// only learns whether the event could be scheduled, never whether it
    /// was delivered.
    pub fn enqueue(&self, user_id: Uuid) -> Result<(), QueueError> {
        if self.tx.is_closed() {
            return Err(QueueError::Closed);
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        let tx = self.tx.clone();
        let delay = self.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(SearchBuildEvent::for_user(user_id)).is_err() {
                tracing::warn!(user_id = %user_id, "rebuild queue closed before event was delivered");
            }
        });
        Ok(())
    }
}

/// Coalesces rebuild events into batches of at most `max_size`, flushing a
/// partial batch `timeout` after its first event.
#[derive(Debug, Clone, Copy)]
pub struct BatchTrigger {
    pub max_size: usize,
    pub timeout: Duration,
}

impl BatchTrigger {
    pub fn from_config(config: &IndexerConfig) -> Self {
        Self {
            max_size: config.batch_max_size.max(1),
            timeout: config.batch_timeout(),
        }
    }

    /// Wait for the next batch. Returns the distinct user ids in arrival
    /// order, or `None` once every producer is gone and the channel is drained.
    pub async fn next_batch(&self, rx: &mut RebuildReceiver) -> Option<Vec<Uuid>> {
        let first = rx.recv().await?;
        let mut events = vec![first];
        let deadline = Instant::now() + self.timeout;

        while events.len() < self.max_size {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(event)) => events.push(event),
                // Channel closed or batch window elapsed: flush what we have
                Ok(None) | Err(_) => break,
            }
        }

        let mut ids: Vec<Uuid> = Vec::with_capacity(events.len());
        for event in events {
            if !ids.contains(&event.data.user_id) {
                ids.push(event.data.user_id);
            }
        }
        Some(ids)
    }
}

/// Consume rebuild events until the queue closes, running the builder once
/// per batch. Builder runs are spawned, so a slow run never blocks the next
/// batch from forming.
///
/// Events pending at the last shutdown are gone, so a sweep over every stale
/// user is started before the first batch.
pub async fn run_batch_trigger(
    mut rx: RebuildReceiver,
    builder: Arc<IndexBuilder>,
    trigger: BatchTrigger,
) {
    tracing::info!(
        max_size = trigger.max_size,
        timeout_secs = trigger.timeout.as_secs(),
        "search build trigger started"
    );

    let sweeper = builder.clone();
    tokio::spawn(async move {
        match sweeper.sweep_stale().await {
            Ok(report) if report.candidates > 0 => tracing::info!(
                candidates = report.candidates,
                embeddings_updated = report.embeddings_updated,
                text_indexes_updated = report.text_indexes_updated,
                "startup sweep rebuilt stale profiles"
            ),
            Ok(_) => tracing::debug!("startup sweep found no stale profiles"),
            Err(e) => tracing::error!(error = %e, "startup sweep failed"),
        }
    });

    while let Some(ids) = trigger.next_batch(&mut rx).await {
        tracing::debug!(batch = ids.len(), "dispatching search build");
        let builder = builder.clone();
        tokio::spawn(async move {
            if let Err(e) = builder.run(&ids).await {
                tracing::error!(batch = ids.len(), error = %e, "search build failed");
            }
        });
    }

    tracing::info!("search build trigger stopped");
}
