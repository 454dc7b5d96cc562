//! Client-side contract for the remote document database and blob store.
//!
//! Documents are schemaless key/value maps. The store assigns durable ids
//! on [`DocumentStore::add`]; writes are either merged (partial) or
//! full-replace. Subscribers receive full collection snapshots after every
//! confirmed write, from any device, until the [`Subscription`] is dropped.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// A schemaless document as stored remotely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(pub Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Overwrite the fields present in `patch`, leaving all others intact.
    pub fn merge_from(&mut self, patch: Document) {
        for (field, value) in patch.0 {
            self.0.insert(field, value);
        }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Identifier assigned by the remote store when a document is created.
///
/// Opaque to clients. Client-generated placeholder ids live in a different
/// type entirely and never reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a collection, e.g. `users/u1/closet`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn doc(&self, id: &DocId) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.clone(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a single document within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: CollectionPath,
    id: DocId,
}

impl DocPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &DocId {
        &self.id
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// How a [`DocumentStore::set`] write is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Patch the fields present in the written document, keep the rest.
    Merge,
    /// Overwrite the whole document.
    Replace,
}

/// Orderings the store can apply to queries and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// Descending by the `createdAt` field.
    CreatedAtDesc,
}

/// A full authoritative listing of a collection.
pub type Snapshot = Vec<(DocId, Document)>;

/// Live feed of collection snapshots.
///
/// Dropping the subscription unsubscribes; the store stops delivering
/// snapshots once the receiving side is gone. Rapid writes may be coalesced
/// into a single snapshot, so not every intermediate state is observed.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self { receiver }
    }

    /// Next snapshot, or `None` once the store side has gone away.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocPath),
    #[error("write rejected by store: {0}")]
    Rejected(String),
    #[error("transport failure")]
    Transport(#[source] anyhow::Error),
    #[error("failed to decode document")]
    Decode(#[source] serde_json::Error),
}

/// The remote document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    async fn set(&self, path: &DocPath, doc: Document, mode: WriteMode) -> Result<(), StoreError>;

    /// Create a document with a store-assigned id.
    async fn add(&self, collection: &CollectionPath, doc: Document) -> Result<DocId, StoreError>;

    /// Idempotent; deleting an absent document is not an error.
    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &CollectionPath,
        order: Option<OrderBy>,
    ) -> Result<Snapshot, StoreError>;

    /// Subscribe to snapshots of a collection. The first snapshot reflects
    /// the current contents and is delivered without waiting for a write.
    async fn subscribe(
        &self,
        collection: &CollectionPath,
        order: Option<OrderBy>,
    ) -> Result<Subscription, StoreError>;
}

/// Payload accepted by the blob store.
#[derive(Debug, Clone)]
pub enum BlobPayload {
    /// An inline `data:` URL, uploaded as-is.
    DataUrl(String),
    Bytes(Vec<u8>),
}

/// The remote blob store, used only for item images.
///
/// Uploads can be slow or hang entirely; callers are expected to bound
/// them with a client-side timeout.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, payload: BlobPayload) -> Result<Url, StoreError>;
}
