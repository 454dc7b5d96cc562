//! Conversion between the typed model and schemaless store documents.
//!
//! Deserialization is the validation boundary: documents missing required
//! fields fail here and are quarantined by the caller instead of
//! propagating partial shapes into local state.

use super::{
    ClothingItem, Criteria, ImageRef, ItemId, ItemUpdate, ScheduleEntry, ScheduleUpdate,
    UserSettings, DEFAULT_RATING, DEFAULT_REFRESH_CYCLE_DAYS,
};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use docstore::{DocId, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    #[serde(rename = "type")]
    kind: String,
    color: String,
    style: String,
    image_url: ImageRef,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_rating")]
    rating: u8,
    #[serde(default)]
    wear_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_worn: Option<DateTime<Utc>>,
    #[serde(default = "default_refresh_cycle")]
    refresh_cycle: u32,
    created_at: DateTime<Utc>,
}

fn default_rating() -> u8 {
    DEFAULT_RATING
}

fn default_refresh_cycle() -> u32 {
    DEFAULT_REFRESH_CYCLE_DAYS
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireScheduleEntry {
    date: String,
    #[serde(default)]
    item_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    criteria: Option<Criteria>,
}

fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(Document(map)),
        other => bail!("expected an object, got {other:?}"),
    }
}

fn from_document<T: for<'de> Deserialize<'de>>(doc: &Document) -> Result<T> {
    serde_json::from_value(Value::Object(doc.0.clone())).context("malformed document")
}

pub(crate) fn item_to_document(item: &ClothingItem) -> Result<Document> {
    if item.image.is_inline() {
        bail!("inline image must be uploaded before the item is persisted");
    }
    to_document(&WireItem {
        kind: item.kind.clone(),
        color: item.color.clone(),
        style: item.style.clone(),
        image_url: item.image.clone(),
        tags: item.tags.clone(),
        rating: item.rating,
        wear_count: item.wear_count,
        last_worn: item.last_worn,
        refresh_cycle: item.refresh_cycle,
        created_at: item.created_at,
    })
}

pub(crate) fn item_from_document(id: DocId, doc: &Document) -> Result<ClothingItem> {
    let wire: WireItem = from_document(doc)?;
    Ok(ClothingItem {
        id: ItemId::Durable(id),
        image: wire.image_url,
        kind: wire.kind,
        color: wire.color,
        style: wire.style,
        tags: wire.tags,
        rating: wire.rating,
        wear_count: wire.wear_count,
        last_worn: wire.last_worn,
        refresh_cycle: wire.refresh_cycle,
        created_at: wire.created_at,
    })
}

/// Partial document for a field-level item update.
pub(crate) fn item_update_document(update: &ItemUpdate) -> Document {
    let mut doc = Document::new();
    if let Some(kind) = &update.kind {
        doc.0.insert("type".to_owned(), Value::String(kind.clone()));
    }
    if let Some(color) = &update.color {
        doc.0.insert("color".to_owned(), Value::String(color.clone()));
    }
    if let Some(style) = &update.style {
        doc.0.insert("style".to_owned(), Value::String(style.clone()));
    }
    if let Some(tags) = &update.tags {
        doc.0.insert(
            "tags".to_owned(),
            Value::Array(tags.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(rating) = update.rating {
        doc.0.insert("rating".to_owned(), rating.into());
    }
    if let Some(refresh_cycle) = update.refresh_cycle {
        doc.0.insert("refreshCycle".to_owned(), refresh_cycle.into());
    }
    doc
}

/// Partial document for a wear transition.
pub(crate) fn wear_update_document(worn_at: DateTime<Utc>, wear_count: u32) -> Result<Document> {
    let mut doc = Document::new();
    doc.0
        .insert("lastWorn".to_owned(), serde_json::to_value(worn_at)?);
    doc.0.insert("wearCount".to_owned(), wear_count.into());
    Ok(doc)
}

/// Partial schedule document; always carries the date so the entry is
/// self-describing.
pub(crate) fn schedule_update_document(date: NaiveDate, update: &ScheduleUpdate) -> Document {
    let mut doc = Document::new();
    doc.0
        .insert("date".to_owned(), Value::String(date.to_string()));
    if let Some(item_ids) = &update.item_ids {
        doc.0.insert(
            "itemIds".to_owned(),
            Value::Array(
                item_ids
                    .iter()
                    .map(|id| Value::String(id.as_str().to_owned()))
                    .collect(),
            ),
        );
    }
    if let Some(summary) = &update.summary {
        doc.0
            .insert("summary".to_owned(), Value::String(summary.clone()));
    }
    if let Some(note) = &update.note {
        doc.0.insert("note".to_owned(), Value::String(note.clone()));
    }
    if let Some(criteria) = &update.criteria {
        if let Ok(value) = serde_json::to_value(criteria) {
            doc.0.insert("criteria".to_owned(), value);
        }
    }
    doc
}

pub(crate) fn schedule_entry_from_document(doc: &Document) -> Result<(NaiveDate, ScheduleEntry)> {
    let wire: WireScheduleEntry = from_document(doc)?;
    let date: NaiveDate = wire
        .date
        .parse()
        .with_context(|| format!("invalid schedule date {:?}", wire.date))?;
    let entry = ScheduleEntry {
        item_ids: wire.item_ids.into_iter().map(DocId::new).collect(),
        summary: wire.summary,
        note: wire.note,
        criteria: wire.criteria,
    };
    Ok((date, entry))
}

pub(crate) fn settings_to_document(settings: &UserSettings) -> Result<Document> {
    to_document(settings)
}

pub(crate) fn settings_from_document(doc: &Document) -> Result<UserSettings> {
    from_document(doc)
}
