//! Wear-cycle transitions for scheduled outfits.

use crate::engine::{closet_collection, Closet, MutationError};
use crate::model::wire;
use chrono::{NaiveDate, NaiveTime, Utc};
use docstore::{DocId, WriteMode};

impl Closet {
    /// Mark a batch of items as worn on the given date (today when
    /// absent): set `last_worn` and bump `wear_count` for every listed
    /// item present locally.
    ///
    /// The batch lands in local state under a single lock acquisition, so
    /// no reader sees half of it applied. Persistence is per item, not a
    /// transaction: a partial remote failure is logged and left for the
    /// next snapshot to correct.
    pub async fn mark_as_worn(
        &self,
        item_ids: &[DocId],
        date: Option<NaiveDate>,
    ) -> Result<(), MutationError> {
        let user = self.require_user()?;

        let worn_at = match date {
            Some(date) => date.and_time(NaiveTime::MIN).and_utc(),
            None => Utc::now(),
        };

        let updated = self
            .state
            .mutate(|state| state.mark_worn(item_ids, worn_at));

        for (id, wear_count) in updated {
            let doc = match wire::wear_update_document(worn_at, wear_count) {
                Ok(doc) => doc,
                Err(error) => {
                    tracing::warn!(%id, %error, "Failed to encode wear update");
                    continue;
                }
            };
            let path = closet_collection(&user).doc(&id);
            if let Err(error) = self.store.set(&path, doc, WriteMode::Merge).await {
                tracing::warn!(%id, %error, "Failed to persist wear update");
            }
        }
        Ok(())
    }
}
