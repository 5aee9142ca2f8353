//! engine::service
//!
//! Serialized access to a [`GraphModel`] from many tasks.
//!
//! # Ordering
//!
//! Update requests queue on a single `tokio::sync::Mutex` slot. Tokio's mutex
//! is fair, so cycles run one at a time in the order they were requested,
//! and a cycle always runs to completion before the next one starts.
//!
//! # Notification
//!
//! Every successful cycle publishes its snapshot and sends one
//! [`ModelChanged`] to each subscriber. Failed cycles publish nothing.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tracing::debug;

use super::model::{GraphModel, GraphOptions, GraphSnapshot};
use super::update::{UpdateError, UpdateSummary};
use crate::backend::Backend;

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Sent once per successful update cycle. Re-read the snapshot on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelChanged;

/// A graph model bound to a backend, safe to share between tasks.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lanegraph::backend::mock::MockBackend;
/// use lanegraph::engine::{GraphOptions, GraphService};
///
/// # tokio_test::block_on(async {
/// let service = GraphService::new(Arc::new(MockBackend::new()), GraphOptions::default());
/// let mut changes = service.subscribe();
///
/// service.request_update().await.unwrap();
/// assert!(changes.try_recv().is_ok());
/// assert!(service.snapshot().is_empty());
/// # });
/// ```
pub struct GraphService {
    backend: Arc<dyn Backend>,
    model: Mutex<GraphModel>,
    published: watch::Sender<Arc<GraphSnapshot>>,
    changed: broadcast::Sender<ModelChanged>,
}

impl std::fmt::Debug for GraphService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphService")
            .field("backend", &self.backend.name())
            .field("commits", &self.snapshot().len())
            .finish()
    }
}

impl GraphService {
    /// Create a service around an empty model.
    pub fn new(backend: Arc<dyn Backend>, options: GraphOptions) -> Self {
        Self::with_model(backend, GraphModel::new(options))
    }

    /// Create a service around an existing model.
    pub fn with_model(backend: Arc<dyn Backend>, model: GraphModel) -> Self {
        let (published, _) = watch::channel(model.snapshot());
        let (changed, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            backend,
            model: Mutex::new(model),
            published,
            changed,
        }
    }

    /// Run one update cycle, after every cycle requested before it.
    ///
    /// # Errors
    ///
    /// Returns the cycle's [`UpdateError`]. The published snapshot is left
    /// as it was and no notification is sent.
    pub async fn request_update(&self) -> Result<UpdateSummary, UpdateError> {
        let mut model = self.model.lock().await;
        let summary = model.update(self.backend.as_ref()).await?;

        self.published.send_replace(model.snapshot());
        // No subscribers is fine
        let receivers = self.changed.send(ModelChanged).unwrap_or(0);
        debug!(receivers, "model change published");
        Ok(summary)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.published.borrow().clone()
    }

    /// Receive one [`ModelChanged`] per successful cycle.
    pub fn subscribe(&self) -> broadcast::Receiver<ModelChanged> {
        self.changed.subscribe()
    }

    /// Watch the published snapshot directly.
    pub fn watch(&self) -> watch::Receiver<Arc<GraphSnapshot>> {
        self.published.subscribe()
    }

    /// The error from the most recent cycle, if it failed.
    ///
    /// Waits for any cycle in flight.
    pub async fn last_error(&self) -> Option<UpdateError> {
        self.model.lock().await.last_error().cloned()
    }
}
