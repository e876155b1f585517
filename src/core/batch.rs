//! Background batch generation with progress fan-out.
//!
//! A batch runs its episodes one at a time on a spawned task, sharing the
//! engine behind a `tokio::sync::Mutex` so assembly and ledger writes never
//! overlap. Progress snapshots go to every subscriber of the batch id;
//! delivery is at most once and a failed send is ignored. The final event
//! closes every subscription of its batch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::pipeline::{GeneratedEpisode, ScriptEngine};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid episode range {0}..={1}")]
    InvalidRange(u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Processing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeOutcome {
    Completed,
    Failed,
}

/// Per-episode entry in a batch status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: u32,
    pub status: EpisodeOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EpisodeRecord {
    fn completed(generated: &GeneratedEpisode) -> Self {
        EpisodeRecord {
            episode: generated.episode,
            status: EpisodeOutcome::Completed,
            word_count: Some(generated.text.chars().count()),
            is_valid: generated.validation.as_ref().map(|v| v.is_valid()),
            error: None,
        }
    }

    fn failed(episode: u32, error: String) -> Self {
        EpisodeRecord {
            episode,
            status: EpisodeOutcome::Failed,
            word_count: None,
            is_valid: None,
            error: Some(error),
        }
    }
}

/// Snapshot of a batch. `completed_episodes` counts successes only;
/// `progress` is that count as a percentage of the range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub batch_id: String,
    pub total_episodes: u32,
    pub completed_episodes: u32,
    pub progress: f64,
    pub current_episode: u32,
    pub state: BatchState,
    pub episodes: Vec<EpisodeRecord>,
}

impl BatchStatus {
    fn new(batch_id: String, request: &BatchRequest) -> Self {
        BatchStatus {
            batch_id,
            total_episodes: request.end - request.start + 1,
            completed_episodes: 0,
            progress: 0.0,
            current_episode: request.start,
            state: BatchState::Processing,
            episodes: Vec::new(),
        }
    }

    fn push(&mut self, record: EpisodeRecord) {
        if record.status == EpisodeOutcome::Completed {
            self.completed_episodes += 1;
        }
        self.progress = f64::from(self.completed_episodes) / f64::from(self.total_episodes) * 100.0;
        self.episodes.push(record);
    }

    pub fn failed_episodes(&self) -> Vec<u32> {
        self.episodes
            .iter()
            .filter(|r| r.status == EpisodeOutcome::Failed)
            .map(|r| r.episode)
            .collect()
    }
}

/// Message pushed to subscribers: a snapshot after each episode, then one
/// final snapshot when the batch ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ProgressEvent {
    Progress(BatchStatus),
    Completed(BatchStatus),
    Cancelled(BatchStatus),
}

impl ProgressEvent {
    pub fn status(&self) -> &BatchStatus {
        match self {
            ProgressEvent::Progress(s) | ProgressEvent::Completed(s) | ProgressEvent::Cancelled(s) => s,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, ProgressEvent::Progress(_))
    }
}

#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub batch_id: String,
    pub receiver: UnboundedReceiver<ProgressEvent>,
}

/// Subscriber lists keyed by batch id.
#[derive(Debug, Clone, Default)]
pub struct ProgressHub {
    subscribers: Arc<Mutex<HashMap<String, Vec<(u64, UnboundedSender<ProgressEvent>)>>>>,
    next_id: Arc<AtomicU64>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, batch_id: &str) -> Subscription {
        let (tx, rx) = unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .await
            .entry(batch_id.to_string())
            .or_default()
            .push((id, tx));
        Subscription {
            id,
            batch_id: batch_id.to_string(),
            receiver: rx,
        }
    }

    /// Explicit disconnect. The batch entry goes once its last subscriber
    /// leaves.
    pub async fn unsubscribe(&self, batch_id: &str, id: u64) {
        let mut subscribers = self.subscribers.lock().await;
        if let Some(list) = subscribers.get_mut(batch_id) {
            list.retain(|(sid, _)| *sid != id);
            if list.is_empty() {
                subscribers.remove(batch_id);
            }
        }
    }

    /// Send to every current subscriber and return how many accepted it.
    /// A closed receiver is skipped, not removed.
    pub async fn publish(&self, batch_id: &str, event: ProgressEvent) -> usize {
        let subscribers = self.subscribers.lock().await;
        let Some(list) = subscribers.get(batch_id) else {
            return 0;
        };
        let mut delivered = 0;
        for (id, tx) in list {
            match tx.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::debug!(batch_id, subscriber = id, "progress send dropped"),
            }
        }
        delivered
    }

    /// Drop every subscriber of `batch_id`. Receivers drain what was
    /// already sent and then see the channel closed.
    pub async fn close(&self, batch_id: &str) -> usize {
        self.subscribers
            .lock()
            .await
            .remove(batch_id)
            .map_or(0, |list| list.len())
    }

    pub async fn subscriber_count(&self, batch_id: &str) -> usize {
        self.subscribers
            .lock()
            .await
            .get(batch_id)
            .map_or(0, Vec::len)
    }
}

/// Latest status of every batch started through a runner.
#[derive(Debug, Clone, Default)]
pub struct BatchRegistry {
    batches: Arc<Mutex<HashMap<String, BatchStatus>>>,
}

impl BatchRegistry {
    pub async fn get(&self, batch_id: &str) -> Option<BatchStatus> {
        self.batches.lock().await.get(batch_id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.batches.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn update(&self, status: &BatchStatus) {
        self.batches
            .lock()
            .await
            .insert(status.batch_id.clone(), status.clone());
    }
}

/// An inclusive episode range to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub start: u32,
    pub end: u32,
    /// Write each successful episode to the script archive.
    #[serde(default)]
    pub archive: bool,
}

impl BatchRequest {
    pub fn new(start: u32, end: u32) -> Self {
        BatchRequest {
            start,
            end,
            archive: false,
        }
    }

    pub fn archived(mut self) -> Self {
        self.archive = true;
        self
    }
}

/// A started batch. `subscription` was registered before the task was
/// spawned, so it sees every event.
#[derive(Debug)]
pub struct BatchHandle {
    pub batch_id: String,
    pub subscription: Subscription,
    pub task: JoinHandle<BatchStatus>,
}

#[derive(Debug, Clone)]
pub struct BatchRunner {
    engine: Arc<Mutex<ScriptEngine>>,
    registry: BatchRegistry,
    hub: ProgressHub,
    cancels: Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
}

impl BatchRunner {
    pub fn new(engine: ScriptEngine) -> Self {
        Self::from_shared(Arc::new(Mutex::new(engine)))
    }

    pub fn from_shared(engine: Arc<Mutex<ScriptEngine>>) -> Self {
        BatchRunner {
            engine,
            registry: BatchRegistry::default(),
            hub: ProgressHub::new(),
            cancels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> Arc<Mutex<ScriptEngine>> {
        Arc::clone(&self.engine)
    }

    pub fn registry(&self) -> &BatchRegistry {
        &self.registry
    }

    pub fn hub(&self) -> &ProgressHub {
        &self.hub
    }

    /// Register a batch and spawn its task. Must be called inside a tokio
    /// runtime.
    pub async fn start(&self, request: BatchRequest) -> Result<BatchHandle, BatchError> {
        if request.start == 0 || request.end < request.start {
            return Err(BatchError::InvalidRange(request.start, request.end));
        }
        let simple = Uuid::new_v4().simple().to_string();
        let batch_id = format!("batch_{}", &simple[..8]);
        let status = BatchStatus::new(batch_id.clone(), &request);
        self.registry.update(&status).await;

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancels
            .lock()
            .await
            .insert(batch_id.clone(), Arc::clone(&cancel));
        let subscription = self.hub.subscribe(&batch_id).await;

        tracing::info!(
            batch_id = %batch_id,
            start = request.start,
            end = request.end,
            "batch started"
        );
        let runner = self.clone();
        let task = tokio::spawn(async move { runner.run(status, request, cancel).await });

        Ok(BatchHandle {
            batch_id,
            subscription,
            task,
        })
    }

    /// Ask a running batch to stop before its next episode. Returns false
    /// for unknown or finished batches.
    pub async fn cancel(&self, batch_id: &str) -> bool {
        match self.cancels.lock().await.get(batch_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                tracing::info!(batch_id, "batch cancel requested");
                true
            }
            None => false,
        }
    }

    async fn run(self, mut status: BatchStatus, request: BatchRequest, cancel: Arc<AtomicBool>) -> BatchStatus {
        let batch_id = status.batch_id.clone();

        for episode in request.start..=request.end {
            if cancel.load(Ordering::SeqCst) {
                status.state = BatchState::Cancelled;
                break;
            }
            status.current_episode = episode;
            self.registry.update(&status).await;

            let record = {
                let mut engine = self.engine.lock().await;
                match engine.generate(episode) {
                    Ok(generated) => {
                        engine.record(&generated);
                        if request.archive {
                            if let Err(e) = engine.archive_episode(&generated) {
                                tracing::warn!(episode, error = %e, "failed to archive script");
                            }
                        }
                        EpisodeRecord::completed(&generated)
                    }
                    Err(e) => {
                        tracing::warn!(batch_id = %batch_id, episode, error = %e, "episode failed");
                        EpisodeRecord::failed(episode, e.to_string())
                    }
                }
            };
            status.push(record);
            self.registry.update(&status).await;
            self.hub
                .publish(&batch_id, ProgressEvent::Progress(status.clone()))
                .await;
            tokio::task::yield_now().await;
        }

        if let Err(e) = self.engine.lock().await.save() {
            tracing::warn!(batch_id = %batch_id, error = %e, "failed to save ledger");
        }

        let event = if status.state == BatchState::Cancelled {
            ProgressEvent::Cancelled(status.clone())
        } else {
            status.state = BatchState::Completed;
            ProgressEvent::Completed(status.clone())
        };
        self.registry.update(&status).await;
        self.cancels.lock().await.remove(&batch_id);
        self.hub.publish(&batch_id, event).await;
        self.hub.close(&batch_id).await;

        tracing::info!(
            batch_id = %batch_id,
            completed = status.completed_episodes,
            failed = status.failed_episodes().len(),
            state = ?status.state,
            "batch finished"
        );
        status
    }
}
