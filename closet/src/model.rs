pub(crate) mod wire;

use crate::collab::Classification;
use chrono::{DateTime, Utc};
use closet_feed::DailyForecast;
use docstore::DocId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::Url;
use uuid::Uuid;

pub(crate) const DEFAULT_RATING: u8 = 3;
pub(crate) const DEFAULT_REFRESH_CYCLE_DAYS: u32 = 1;

/// Client-generated placeholder id, used only while a record exists
/// locally but has not been confirmed by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempId(Uuid);

impl TempId {
    pub(crate) fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "temp-{}", self.0)
    }
}

/// Item identifier.
///
/// Temporary and durable ids live in separate namespaces; the two
/// variants never compare equal and are never merged. Only durable ids
/// ever reach the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    Temp(TempId),
    Durable(DocId),
}

impl ItemId {
    pub fn is_optimistic(&self) -> bool {
        matches!(self, ItemId::Temp(_))
    }

    pub fn as_durable(&self) -> Option<&DocId> {
        match self {
            ItemId::Temp(_) => None,
            ItemId::Durable(id) => Some(id),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Temp(id) => id.fmt(f),
            ItemId::Durable(id) => id.fmt(f),
        }
    }
}

/// Reference to an item's photo.
///
/// Inline payloads exist only between capture and upload; persisted
/// records always carry a durable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// An encoded `data:` URL, not yet uploaded.
    Inline(String),
    /// Durable reference into blob storage.
    Remote(Url),
}

impl ImageRef {
    pub fn is_inline(&self) -> bool {
        matches!(self, ImageRef::Inline(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Inline(data_url) => data_url,
            ImageRef::Remote(url) => url.as_str(),
        }
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.starts_with("data:") {
            return Ok(ImageRef::Inline(s));
        }
        Url::parse(&s).map(ImageRef::Remote).map_err(D::Error::custom)
    }
}

/// A single garment in the closet.
#[derive(Debug, Clone, PartialEq)]
pub struct ClothingItem {
    pub id: ItemId,
    pub image: ImageRef,
    pub kind: String,
    pub color: String,
    pub style: String,
    pub tags: Vec<String>,
    /// 1-5, defaults to 3 on creation.
    pub rating: u8,
    pub wear_count: u32,
    /// `None` means never worn, always available.
    pub last_worn: Option<DateTime<Utc>>,
    /// Days that must elapse after `last_worn` before the item is
    /// available again.
    pub refresh_cycle: u32,
    /// Sort key for item listings (newest first).
    pub created_at: DateTime<Utc>,
}

impl ClothingItem {
    pub fn is_optimistic(&self) -> bool {
        self.id.is_optimistic()
    }
}

/// Input to `add_item`: the captured image plus its classification.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub image: ImageRef,
    pub kind: String,
    pub color: String,
    pub style: String,
    pub tags: Vec<String>,
    pub refresh_cycle: u32,
}

impl NewItem {
    pub fn from_classification(image: ImageRef, classification: Classification) -> Self {
        Self {
            image,
            kind: classification.kind,
            color: classification.color,
            style: classification.style,
            tags: classification.tags,
            refresh_cycle: classification.refresh_cycle,
        }
    }
}

/// Partial item update; absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub kind: Option<String>,
    pub color: Option<String>,
    pub style: Option<String>,
    pub tags: Option<Vec<String>>,
    pub rating: Option<u8>,
    pub refresh_cycle: Option<u32>,
}

/// Inputs an outfit was generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    pub destination: String,
    pub temperature: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<DailyForecast>,
}

/// A suggested outfit: a short description plus the items composing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outfit {
    pub summary: String,
    pub item_ids: Vec<DocId>,
}

/// Planned outfit for one calendar date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleEntry {
    pub item_ids: Vec<DocId>,
    pub summary: Option<String>,
    pub note: Option<String>,
    pub criteria: Option<Criteria>,
}

impl ScheduleEntry {
    /// Field-level merge: present fields overwrite, absent fields are
    /// preserved.
    pub(crate) fn apply(&mut self, update: &ScheduleUpdate) {
        if let Some(item_ids) = &update.item_ids {
            self.item_ids = item_ids.clone();
        }
        if let Some(summary) = &update.summary {
            self.summary = Some(summary.clone());
        }
        if let Some(note) = &update.note {
            self.note = Some(note.clone());
        }
        if let Some(criteria) = &update.criteria {
            self.criteria = Some(criteria.clone());
        }
    }
}

/// Partial schedule write for one date.
#[derive(Debug, Clone, Default)]
pub struct ScheduleUpdate {
    pub item_ids: Option<Vec<DocId>>,
    pub summary: Option<String>,
    pub note: Option<String>,
    pub criteria: Option<Criteria>,
}

/// Per-user settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_discriminates_on_data_prefix() {
        let inline: ImageRef =
            serde_json::from_str("\"data:image/jpeg;base64,AAAA\"").unwrap();
        assert!(inline.is_inline());

        let remote: ImageRef =
            serde_json::from_str("\"https://blobs.invalid/users/u1/closet/a.jpg\"").unwrap();
        assert!(!remote.is_inline());

        assert!(serde_json::from_str::<ImageRef>("\"not a url\"").is_err());
    }

    #[test]
    fn temp_and_durable_ids_never_compare_equal() {
        let temp = ItemId::Temp(TempId::random());
        let durable = ItemId::Durable(DocId::new("doc-1"));

        assert_ne!(temp, durable);
        assert!(temp.is_optimistic());
        assert!(!durable.is_optimistic());
        assert_eq!(temp.as_durable(), None);
    }

    #[test]
    fn schedule_merge_preserves_unrelated_fields() {
        let mut entry = ScheduleEntry::default();
        entry.apply(&ScheduleUpdate {
            item_ids: Some(vec![DocId::new("doc-1"), DocId::new("doc-2")]),
            ..Default::default()
        });
        entry.apply(&ScheduleUpdate {
            note: Some("dinner".to_owned()),
            ..Default::default()
        });

        assert_eq!(entry.item_ids, vec![DocId::new("doc-1"), DocId::new("doc-2")]);
        assert_eq!(entry.note.as_deref(), Some("dinner"));
        assert_eq!(entry.summary, None);
    }
}
