//! Local closet state for one session.
//!
//! A single store per session, mutated only by the mutation engine and
//! the reconciler. Every mutation happens under one lock acquisition and
//! is then published through a watch channel, so readers always observe
//! whole batches, never a half-applied one.

use crate::model::{ClothingItem, ItemId, ItemUpdate, ScheduleEntry, ScheduleUpdate, UserSettings};
use chrono::{DateTime, NaiveDate, Utc};
use docstore::DocId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Default)]
pub(crate) struct ClosetState {
    /// Optimistic records first, then confirmed items newest-first.
    pub items: Vec<ClothingItem>,
    pub schedule: BTreeMap<NaiveDate, ScheduleEntry>,
    pub settings: Option<UserSettings>,
}

impl ClosetState {
    pub fn insert_optimistic(&mut self, item: ClothingItem) {
        self.items.insert(0, item);
    }

    pub fn remove_item(&mut self, id: &ItemId) -> Option<ClothingItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn apply_update(&mut self, id: &DocId, update: &ItemUpdate) {
        let target = ItemId::Durable(id.clone());
        let Some(item) = self.items.iter_mut().find(|item| item.id == target) else {
            return;
        };
        if let Some(kind) = &update.kind {
            item.kind = kind.clone();
        }
        if let Some(color) = &update.color {
            item.color = color.clone();
        }
        if let Some(style) = &update.style {
            item.style = style.clone();
        }
        if let Some(tags) = &update.tags {
            item.tags = tags.clone();
        }
        if let Some(rating) = update.rating {
            item.rating = rating;
        }
        if let Some(refresh_cycle) = update.refresh_cycle {
            item.refresh_cycle = refresh_cycle;
        }
    }

    /// Wear transition for a whole batch. Ids not present locally are
    /// skipped. Returns the per-item state to persist.
    pub fn mark_worn(&mut self, ids: &[DocId], worn_at: DateTime<Utc>) -> Vec<(DocId, u32)> {
        let mut updated = Vec::new();
        for id in ids {
            let target = ItemId::Durable(id.clone());
            if let Some(item) = self.items.iter_mut().find(|item| item.id == target) {
                item.last_worn = Some(worn_at);
                item.wear_count += 1;
                updated.push((id.clone(), item.wear_count));
            }
        }
        updated
    }

    /// Replace all confirmed items with an authoritative snapshot,
    /// keeping still-pending optimistic records in front. Temp and
    /// durable records are never matched against each other.
    pub fn replace_durable(&mut self, mut snapshot: Vec<ClothingItem>) {
        snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut items: Vec<ClothingItem> = self
            .items
            .drain(..)
            .filter(ClothingItem::is_optimistic)
            .collect();
        items.extend(snapshot);
        self.items = items;
    }

    pub fn upsert_schedule(&mut self, date: NaiveDate, update: &ScheduleUpdate) {
        self.schedule.entry(date).or_default().apply(update);
    }

    /// Drop everything sourced from the remote store; pending optimistic
    /// records stay.
    pub fn clear_synced(&mut self) {
        self.items.retain(ClothingItem::is_optimistic);
        self.schedule.clear();
        self.settings = None;
    }
}

/// Shared handle to the session state.
#[derive(Clone)]
pub(crate) struct SharedState {
    inner: Arc<Mutex<ClosetState>>,
    items_tx: Arc<watch::Sender<Vec<ClothingItem>>>,
}

impl SharedState {
    pub fn new() -> Self {
        let (items_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Mutex::new(ClosetState::default())),
            items_tx: Arc::new(items_tx),
        }
    }

    /// Run a mutation under the state lock, then publish the resulting
    /// items snapshot as one atomic update.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut ClosetState) -> R) -> R {
        let mut state = self.inner.lock().expect("state lock poisoned");
        let result = f(&mut state);
        self.items_tx.send_replace(state.items.clone());
        result
    }

    pub fn read<R>(&self, f: impl FnOnce(&ClosetState) -> R) -> R {
        let state = self.inner.lock().expect("state lock poisoned");
        f(&state)
    }

    pub fn watch_items(&self) -> watch::Receiver<Vec<ClothingItem>> {
        self.items_tx.subscribe()
    }
}
