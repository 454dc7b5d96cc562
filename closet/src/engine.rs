//! Optimistic mutation engine.
//!
//! Every operation mutates local state synchronously, before the first
//! suspension point, so consumers observe the change with zero latency;
//! the remote store is updated afterwards. `add_item` rolls back on
//! failure; the remaining operations accept temporary drift and let the
//! next authoritative snapshot correct it.

use crate::availability::is_available;
use crate::collab::{AuthProvider, Classification, Classifier, Recommender, UserId};
use crate::model::{
    wire, ClothingItem, Criteria, ImageRef, ItemId, ItemUpdate, NewItem, Outfit, ScheduleEntry,
    ScheduleUpdate, TempId, UserSettings, DEFAULT_RATING,
};
use crate::reconciler::{SyncStatus, SyncTask};
use crate::state::SharedState;
use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use docstore::{
    BlobPayload, BlobStore, CollectionPath, DocId, DocPath, DocumentStore, WriteMode,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("no active user session")]
    NotAuthenticated,
    #[error("image upload failed")]
    UploadFailed(#[source] anyhow::Error),
    #[error("remote persistence failed")]
    PersistFailed(#[source] anyhow::Error),
}

/// The per-session closet context.
///
/// Created when a user session becomes active and dropped at logout;
/// dropping tears down the live subscription.
pub struct Closet {
    pub(crate) auth: Arc<dyn AuthProvider>,
    pub(crate) store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    classifier: Arc<dyn Classifier>,
    recommender: Arc<dyn Recommender>,
    upload_timeout: Duration,
    pub(crate) state: SharedState,
    pub(crate) sync: Mutex<Option<SyncTask>>,
    pub(crate) status_tx: watch::Sender<SyncStatus>,
}

impl Closet {
    pub fn new(
        config: &closet_env::Config,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        classifier: Arc<dyn Classifier>,
        recommender: Arc<dyn Recommender>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Unsubscribed);
        Self {
            auth,
            store,
            blobs,
            classifier,
            recommender,
            upload_timeout: config.store.upload_timeout(),
            state: SharedState::new(),
            sync: Mutex::new(None),
            status_tx,
        }
    }

    /// Current items, optimistic records first, then newest-first.
    pub fn items(&self) -> Vec<ClothingItem> {
        self.state.read(|state| state.items.clone())
    }

    /// Watch the item list; a new value is published after every local
    /// mutation and every reconciled snapshot.
    pub fn watch_items(&self) -> watch::Receiver<Vec<ClothingItem>> {
        self.state.watch_items()
    }

    pub fn schedule(&self) -> BTreeMap<NaiveDate, ScheduleEntry> {
        self.state.read(|state| state.schedule.clone())
    }

    pub(crate) fn require_user(&self) -> Result<UserId, MutationError> {
        self.auth.current_user().ok_or(MutationError::NotAuthenticated)
    }

    /// Add a new item to the closet.
    ///
    /// The record appears in local state immediately under a temporary
    /// id. The image is uploaded (bounded by the configured timeout) and
    /// the record persisted; the confirmed record then arrives through
    /// the subscription stream. On any failure the temporary record is
    /// removed and local state is back to its pre-call shape. No
    /// automatic retry; the caller decides.
    pub async fn add_item(&self, new_item: NewItem) -> Result<DocId, MutationError> {
        let user = self.require_user()?;

        let temp_id = TempId::random();
        let item = ClothingItem {
            id: ItemId::Temp(temp_id),
            image: new_item.image,
            kind: new_item.kind,
            color: new_item.color,
            style: new_item.style,
            tags: new_item.tags,
            rating: DEFAULT_RATING,
            wear_count: 0,
            last_worn: None,
            refresh_cycle: new_item.refresh_cycle,
            created_at: Utc::now(),
        };
        self.state
            .mutate(|state| state.insert_optimistic(item.clone()));

        let result = self.persist_new_item(&user, item).await;

        // The temporary record is purged exactly once, on confirmation and
        // on rollback alike. The confirmed record is not inserted here; it
        // arrives via the snapshot stream, which would otherwise race this
        // insert into a duplicate.
        self.state
            .mutate(|state| state.remove_item(&ItemId::Temp(temp_id)));

        match &result {
            Ok(id) => tracing::debug!(%id, "Item confirmed by remote store"),
            Err(error) => tracing::warn!(%error, "Adding item failed, local state rolled back"),
        }
        result
    }

    async fn persist_new_item(
        &self,
        user: &UserId,
        mut item: ClothingItem,
    ) -> Result<DocId, MutationError> {
        if let ImageRef::Inline(data_url) = &item.image {
            let blob_path = format!("users/{}/closet/{}.jpg", user, Uuid::new_v4());
            let upload = self
                .blobs
                .upload(&blob_path, BlobPayload::DataUrl(data_url.clone()));

            let url = match tokio::time::timeout(self.upload_timeout, upload).await {
                Ok(Ok(url)) => url,
                Ok(Err(error)) => return Err(MutationError::UploadFailed(error.into())),
                Err(_) => {
                    return Err(MutationError::UploadFailed(anyhow!(
                        "upload timed out after {:?}",
                        self.upload_timeout
                    )))
                }
            };
            item.image = ImageRef::Remote(url);
        }

        let doc = wire::item_to_document(&item).map_err(MutationError::PersistFailed)?;
        let id = self
            .store
            .add(&closet_collection(user), doc)
            .await
            .map_err(|error| MutationError::PersistFailed(error.into()))?;
        Ok(id)
    }

    /// Apply a partial update to an item.
    ///
    /// Local state keeps the optimistic value even when the remote write
    /// fails; the next snapshot corrects any drift.
    pub async fn update_item(&self, id: &DocId, update: ItemUpdate) -> Result<(), MutationError> {
        let user = self.require_user()?;

        self.state.mutate(|state| state.apply_update(id, &update));

        let path = closet_collection(&user).doc(id);
        let doc = wire::item_update_document(&update);
        if let Err(error) = self.store.set(&path, doc, WriteMode::Merge).await {
            tracing::warn!(%id, %error, "Failed to persist item update");
            return Err(MutationError::PersistFailed(error.into()));
        }
        Ok(())
    }

    /// Remove an item. Same drift policy as [`Closet::update_item`]: the
    /// local removal stands even if the remote delete fails.
    pub async fn delete_item(&self, id: &DocId) -> Result<(), MutationError> {
        let user = self.require_user()?;

        self.state
            .mutate(|state| state.remove_item(&ItemId::Durable(id.clone())));

        let path = closet_collection(&user).doc(id);
        if let Err(error) = self.store.delete(&path).await {
            tracing::warn!(%id, %error, "Failed to persist item deletion");
            return Err(MutationError::PersistFailed(error.into()));
        }
        Ok(())
    }

    /// Upsert the schedule entry for a date.
    ///
    /// Field-level merge on both sides: fields present in `update`
    /// overwrite, everything previously written for that date is kept.
    pub async fn add_to_schedule(
        &self,
        date: NaiveDate,
        update: ScheduleUpdate,
    ) -> Result<(), MutationError> {
        let user = self.require_user()?;

        self.state.mutate(|state| state.upsert_schedule(date, &update));

        let path = schedule_collection(&user).doc(&DocId::new(date.to_string()));
        let doc = wire::schedule_update_document(date, &update);
        if let Err(error) = self.store.set(&path, doc, WriteMode::Merge).await {
            tracing::warn!(%date, %error, "Failed to persist schedule entry");
            return Err(MutationError::PersistFailed(error.into()));
        }
        Ok(())
    }

    pub async fn save_settings(&self, settings: UserSettings) -> Result<(), MutationError> {
        let user = self.require_user()?;

        self.state
            .mutate(|state| state.settings = Some(settings.clone()));

        let doc = wire::settings_to_document(&settings).map_err(MutationError::PersistFailed)?;
        if let Err(error) = self.store.set(&settings_path(&user), doc, WriteMode::Merge).await {
            tracing::warn!(%error, "Failed to persist user settings");
            return Err(MutationError::PersistFailed(error.into()));
        }
        Ok(())
    }

    pub async fn load_settings(&self) -> Result<Option<UserSettings>, MutationError> {
        let user = self.require_user()?;

        let doc = self
            .store
            .get(&settings_path(&user))
            .await
            .map_err(|error| MutationError::PersistFailed(error.into()))?;

        let settings = match doc {
            Some(doc) => match wire::settings_from_document(&doc) {
                Ok(settings) => Some(settings),
                Err(error) => {
                    tracing::warn!(%error, "Quarantined malformed settings document");
                    None
                }
            },
            None => None,
        };

        self.state
            .mutate(|state| state.settings = settings.clone());
        Ok(settings)
    }

    /// Classify an item photo, falling back to a manual-entry placeholder
    /// so item creation is never blocked on the classifier.
    pub async fn classify_or_fallback(&self, image: &ImageRef) -> Classification {
        match self.classifier.classify(image).await {
            Ok(classification) if classification.is_usable() => classification,
            Ok(_) => {
                tracing::warn!("Classifier returned an unusable result, using placeholder");
                Classification::manual_fallback()
            }
            Err(error) => {
                tracing::warn!(%error, "Classification failed, using placeholder");
                Classification::manual_fallback()
            }
        }
    }

    /// Suggest outfits from the currently-available items.
    ///
    /// Recommender failure yields an empty list, never an error; ids the
    /// recommender invents are filtered out.
    pub async fn suggest_outfits(&self, criteria: &Criteria) -> Vec<Outfit> {
        let now = Utc::now();
        let available: Vec<ClothingItem> = self.state.read(|state| {
            state
                .items
                .iter()
                .filter(|item| is_available(item, now))
                .cloned()
                .collect()
        });

        match self.recommender.suggest(&available, criteria).await {
            Ok(outfits) => {
                let known: HashSet<&DocId> = available
                    .iter()
                    .filter_map(|item| item.id.as_durable())
                    .collect();
                outfits
                    .into_iter()
                    .map(|mut outfit| {
                        outfit.item_ids.retain(|id| known.contains(id));
                        outfit
                    })
                    .filter(|outfit| !outfit.item_ids.is_empty())
                    .collect()
            }
            Err(error) => {
                tracing::warn!(%error, "Outfit suggestion failed");
                Vec::new()
            }
        }
    }
}

impl Drop for Closet {
    fn drop(&mut self) {
        self.stop_sync();
    }
}

pub(crate) fn closet_collection(user: &UserId) -> CollectionPath {
    CollectionPath::new(format!("users/{user}/closet"))
}

pub(crate) fn schedule_collection(user: &UserId) -> CollectionPath {
    CollectionPath::new(format!("users/{user}/schedule"))
}

pub(crate) fn settings_path(user: &UserId) -> DocPath {
    CollectionPath::new("users").doc(&DocId::new(user.as_str()))
}
