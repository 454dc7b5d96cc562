//! In-memory implementation of the store contracts.
//!
//! Backs tests and local development. Implements the full contract,
//! including snapshot fan-out to live subscriptions, and adds failure
//! injection hooks so callers can exercise their rollback paths.

use crate::{
    BlobPayload, BlobStore, CollectionPath, DocId, DocPath, Document, DocumentStore, OrderBy,
    Snapshot, StoreError, Subscription, WriteMode,
};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};
use url::Url;

/// In-memory document and blob store.
///
/// Durable ids are issued from a `doc-{n}` counter, a namespace disjoint
/// from anything clients generate locally.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, BTreeMap<DocId, Document>>,
    subscribers: Vec<Subscriber>,
    blobs: BTreeMap<String, BlobPayload>,
    next_id: u64,
    fail_doc_writes: u32,
    fail_uploads: u32,
    upload_gate: Option<Arc<Semaphore>>,
}

struct Subscriber {
    collection: String,
    order: Option<OrderBy>,
    tx: mpsc::UnboundedSender<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` document writes (set/add/delete) fail.
    pub fn fail_next_doc_writes(&self, n: u32) {
        self.inner.lock().expect("store lock poisoned").fail_doc_writes = n;
    }

    /// Make the next `n` blob uploads fail.
    pub fn fail_next_uploads(&self, n: u32) {
        self.inner.lock().expect("store lock poisoned").fail_uploads = n;
    }

    /// Gate uploads behind a semaphore with no permits. Each
    /// `add_permits(1)` on the returned handle lets one upload proceed;
    /// until then the upload hangs, like a stalled connection would.
    pub fn gate_uploads(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.inner.lock().expect("store lock poisoned").upload_gate = Some(gate.clone());
        gate
    }

    /// Number of blobs that have been uploaded.
    pub fn uploaded_blob_count(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").blobs.len()
    }

    /// Drop every live subscription, as a severed connection would.
    /// Subscribers observe the end of their snapshot stream.
    pub fn sever_subscriptions(&self) {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .subscribers
            .clear();
    }

    fn take_doc_write_failure(inner: &mut Inner) -> Result<(), StoreError> {
        if inner.fail_doc_writes > 0 {
            inner.fail_doc_writes -= 1;
            return Err(StoreError::Rejected("injected write failure".to_owned()));
        }
        Ok(())
    }
}

fn created_at(doc: &Document) -> Option<&str> {
    doc.get("createdAt").and_then(Value::as_str)
}

fn snapshot_of(docs: &BTreeMap<DocId, Document>, order: Option<OrderBy>) -> Snapshot {
    let mut snapshot: Snapshot = docs
        .iter()
        .map(|(id, doc)| (id.clone(), doc.clone()))
        .collect();
    if let Some(OrderBy::CreatedAtDesc) = order {
        snapshot.sort_by(|(_, a), (_, b)| created_at(b).cmp(&created_at(a)));
    }
    snapshot
}

impl Inner {
    fn publish(&mut self, collection: &str) {
        let docs = self.collections.entry(collection.to_owned()).or_default();
        let docs = docs.clone();
        self.subscribers.retain(|sub| {
            if sub.collection != collection {
                return true;
            }
            // A send failure means the subscription was dropped; prune it.
            sub.tx.send(snapshot_of(&docs, sub.order)).is_ok()
        });
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .collections
            .get(path.collection().as_str())
            .and_then(|docs| docs.get(path.id()))
            .cloned())
    }

    async fn set(&self, path: &DocPath, doc: Document, mode: WriteMode) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        Self::take_doc_write_failure(&mut inner)?;

        let docs = inner
            .collections
            .entry(path.collection().as_str().to_owned())
            .or_default();
        match mode {
            WriteMode::Replace => {
                docs.insert(path.id().clone(), doc);
            }
            WriteMode::Merge => {
                docs.entry(path.id().clone()).or_default().merge_from(doc);
            }
        }
        inner.publish(path.collection().as_str());
        Ok(())
    }

    async fn add(&self, collection: &CollectionPath, doc: Document) -> Result<DocId, StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        Self::take_doc_write_failure(&mut inner)?;

        inner.next_id += 1;
        let id = DocId::new(format!("doc-{}", inner.next_id));
        inner
            .collections
            .entry(collection.as_str().to_owned())
            .or_default()
            .insert(id.clone(), doc);
        inner.publish(collection.as_str());
        Ok(id)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        Self::take_doc_write_failure(&mut inner)?;

        let removed = inner
            .collections
            .get_mut(path.collection().as_str())
            .and_then(|docs| docs.remove(path.id()));
        if removed.is_some() {
            inner.publish(path.collection().as_str());
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        order: Option<OrderBy>,
    ) -> Result<Snapshot, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let docs = inner.collections.get(collection.as_str());
        Ok(docs.map(|docs| snapshot_of(docs, order)).unwrap_or_default())
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        order: Option<OrderBy>,
    ) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("store lock poisoned");

        let docs = inner
            .collections
            .entry(collection.as_str().to_owned())
            .or_default();
        let initial = snapshot_of(docs, order);
        tx.send(initial)
            .map_err(|_| StoreError::Transport(anyhow!("subscriber channel closed")))?;

        inner.subscribers.push(Subscriber {
            collection: collection.as_str().to_owned(),
            order,
            tx,
        });
        Ok(Subscription::new(rx))
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn upload(&self, path: &str, payload: BlobPayload) -> Result<Url, StoreError> {
        let gate = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            if inner.fail_uploads > 0 {
                inner.fail_uploads -= 1;
                return Err(StoreError::Transport(anyhow!("injected upload failure")));
            }
            inner.upload_gate.clone()
        };

        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| StoreError::Transport(anyhow!("upload gate closed")))?;
            permit.forget();
        }

        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.blobs.insert(path.to_owned(), payload);
        let url = format!("https://blobs.invalid/{path}")
            .parse()
            .map_err(|e| StoreError::Transport(anyhow!("blob url: {e}")))?;
        Ok(url)
    }
}
