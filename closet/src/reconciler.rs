//! Real-time reconciliation of remote snapshots into local state.
//!
//! The remote store pushes a full snapshot of the item collection after
//! every confirmed write, from any device or tab. Each snapshot replaces
//! all confirmed items; records still pending under a temporary id are
//! untouched because they live in a different id namespace and are
//! removed by their own `add_item` call.

use crate::engine::{closet_collection, schedule_collection, Closet, MutationError};
use crate::model::{wire, ClothingItem};
use crate::state::SharedState;
use docstore::{CollectionPath, DocumentStore, OrderBy, Snapshot};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Where the subscription currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Unsubscribed,
    Subscribing,
    Live,
    Error,
}

pub(crate) struct SyncTask {
    handle: JoinHandle<()>,
}

impl Closet {
    /// Observe the subscription state machine.
    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Establish the live subscription for the current session.
    ///
    /// Any prior subscription is disposed first; at most one is active
    /// per session. The schedule and settings have no subscription and
    /// are loaded once here.
    pub async fn start_sync(&self) -> Result<(), MutationError> {
        let user = self.require_user()?;
        self.stop_sync();
        self.status_tx.send_replace(SyncStatus::Subscribing);

        self.load_schedule().await;
        if let Err(error) = self.load_settings().await {
            tracing::warn!(%error, "Loading settings failed");
        }

        let store = self.store.clone();
        let state = self.state.clone();
        let status = self.status_tx.clone();
        let collection = closet_collection(&user);
        let handle = tokio::spawn(reconcile_loop(store, collection, state, status));

        *self.sync.lock().expect("sync lock poisoned") = Some(SyncTask { handle });
        Ok(())
    }

    /// Tear down the live subscription. Idempotent; called on logout and
    /// on drop so no subscription outlives the session.
    pub fn stop_sync(&self) {
        if let Some(task) = self.sync.lock().expect("sync lock poisoned").take() {
            task.handle.abort();
        }
        self.status_tx.send_replace(SyncStatus::Unsubscribed);
    }

    /// Tear down and re-establish synchronization from scratch.
    ///
    /// Clears everything sourced from the remote store (pending
    /// optimistic records stay), reseeds items with a one-shot query so
    /// consumers are not staring at an empty closet while the
    /// subscription comes up, then resubscribes.
    pub async fn resync(&self) -> Result<(), MutationError> {
        let user = self.require_user()?;
        self.stop_sync();

        self.state.mutate(|state| state.clear_synced());

        match self
            .store
            .query(&closet_collection(&user), Some(OrderBy::CreatedAtDesc))
            .await
        {
            Ok(snapshot) => {
                let items = decode_snapshot(snapshot);
                self.state.mutate(|state| state.replace_durable(items));
            }
            Err(error) => tracing::warn!(%error, "Reseeding items during resync failed"),
        }

        self.start_sync().await
    }

    async fn load_schedule(&self) {
        let Ok(user) = self.require_user() else {
            return;
        };
        let schedule = match self.store.query(&schedule_collection(&user), None).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(%error, "Loading schedule failed");
                return;
            }
        };

        self.state.mutate(|state| {
            for (id, doc) in &schedule {
                match wire::schedule_entry_from_document(doc) {
                    Ok((date, entry)) => {
                        state.schedule.insert(date, entry);
                    }
                    Err(error) => {
                        tracing::warn!(%id, %error, "Quarantined malformed schedule document");
                    }
                }
            }
        });
    }
}

async fn reconcile_loop(
    store: Arc<dyn DocumentStore>,
    collection: CollectionPath,
    state: SharedState,
    status: watch::Sender<SyncStatus>,
) {
    let mut subscription = match store
        .subscribe(&collection, Some(OrderBy::CreatedAtDesc))
        .await
    {
        Ok(subscription) => subscription,
        Err(error) => {
            tracing::warn!(%error, "Subscribing to item collection failed");
            status.send_replace(SyncStatus::Error);
            return;
        }
    };

    while let Some(snapshot) = subscription.next_snapshot().await {
        let items = decode_snapshot(snapshot);
        state.mutate(|state| state.replace_durable(items));
        status.send_replace(SyncStatus::Live);
    }

    tracing::warn!("Item snapshot stream ended");
    status.send_replace(SyncStatus::Error);
}

/// Decode a raw snapshot through the validation boundary. Malformed
/// documents are quarantined, never propagated as partial records.
fn decode_snapshot(snapshot: Snapshot) -> Vec<ClothingItem> {
    snapshot
        .into_iter()
        .filter_map(|(id, doc)| match wire::item_from_document(id.clone(), &doc) {
            Ok(item) => Some(item),
            Err(error) => {
                tracing::warn!(%id, %error, "Quarantined malformed item document");
                None
            }
        })
        .collect()
}
