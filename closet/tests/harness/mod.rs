#![allow(dead_code)]

use async_trait::async_trait;
use closet::{
    AuthProvider, Classification, Classifier, Closet, ClothingItem, Criteria, ImageRef, NewItem,
    Outfit, Recommender, SyncStatus, UserId,
};
use docstore::memory::MemoryStore;
use docstore::{CollectionPath, DocId, Document};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const USER: &str = "user-1";

const WAIT: Duration = Duration::from_secs(5);

pub struct FakeAuth {
    user: Mutex<Option<UserId>>,
}

impl FakeAuth {
    pub fn signed_in() -> Arc<Self> {
        Arc::new(Self {
            user: Mutex::new(Some(UserId::new(USER))),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self {
            user: Mutex::new(None),
        })
    }

    pub fn sign_out(&self) {
        *self.user.lock().unwrap() = None;
    }
}

impl AuthProvider for FakeAuth {
    fn current_user(&self) -> Option<UserId> {
        self.user.lock().unwrap().clone()
    }
}

pub struct FakeClassifier {
    result: Mutex<Option<Classification>>,
}

impl FakeClassifier {
    pub fn returning(classification: Classification) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(classification)),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, _image: &ImageRef) -> anyhow::Result<Classification> {
        self.result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("classifier offline"))
    }
}

pub struct FakeRecommender {
    outfits: Mutex<Option<Vec<Outfit>>>,
    last_available: Mutex<Vec<ClothingItem>>,
}

impl FakeRecommender {
    pub fn with_outfits(outfits: Vec<Outfit>) -> Arc<Self> {
        Arc::new(Self {
            outfits: Mutex::new(Some(outfits)),
            last_available: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            outfits: Mutex::new(None),
            last_available: Mutex::new(Vec::new()),
        })
    }

    /// The available items passed into the most recent `suggest` call.
    pub fn last_available(&self) -> Vec<ClothingItem> {
        self.last_available.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recommender for FakeRecommender {
    async fn suggest(
        &self,
        available: &[ClothingItem],
        _criteria: &Criteria,
    ) -> anyhow::Result<Vec<Outfit>> {
        *self.last_available.lock().unwrap() = available.to_vec();
        self.outfits
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("recommender offline"))
    }
}

pub struct TestCloset {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<FakeAuth>,
    pub classifier: Arc<FakeClassifier>,
    pub recommender: Arc<FakeRecommender>,
    pub closet: Closet,
}

pub fn signed_in_closet() -> TestCloset {
    build_closet(
        Arc::new(MemoryStore::new()),
        FakeAuth::signed_in(),
        FakeClassifier::returning(shirt_classification()),
        FakeRecommender::with_outfits(vec![]),
    )
}

/// A second session (another device or tab) against an existing store.
pub fn signed_in_closet_sharing_store(other: &TestCloset) -> TestCloset {
    build_closet(
        other.store.clone(),
        FakeAuth::signed_in(),
        FakeClassifier::returning(shirt_classification()),
        FakeRecommender::with_outfits(vec![]),
    )
}

pub fn signed_out_closet() -> TestCloset {
    build_closet(
        Arc::new(MemoryStore::new()),
        FakeAuth::signed_out(),
        FakeClassifier::returning(shirt_classification()),
        FakeRecommender::with_outfits(vec![]),
    )
}

pub fn closet_with_recommender(recommender: Arc<FakeRecommender>) -> TestCloset {
    build_closet(
        Arc::new(MemoryStore::new()),
        FakeAuth::signed_in(),
        FakeClassifier::returning(shirt_classification()),
        recommender,
    )
}

pub fn signed_in_closet_with_classifier(classifier: Arc<FakeClassifier>) -> TestCloset {
    build_closet(
        Arc::new(MemoryStore::new()),
        FakeAuth::signed_in(),
        classifier,
        FakeRecommender::with_outfits(vec![]),
    )
}

fn build_closet(
    store: Arc<MemoryStore>,
    auth: Arc<FakeAuth>,
    classifier: Arc<FakeClassifier>,
    recommender: Arc<FakeRecommender>,
) -> TestCloset {
    // First caller in the process wins; later calls are a no-op.
    let _ = closet::common::tracing_util::init(tracing_subscriber::filter::LevelFilter::DEBUG);

    let config = closet_env::Config::default();

    let closet = Closet::new(
        &config,
        auth.clone(),
        store.clone(),
        store.clone(),
        classifier.clone(),
        recommender.clone(),
    );

    TestCloset {
        store,
        auth,
        classifier,
        recommender,
        closet,
    }
}

pub fn shirt_classification() -> Classification {
    Classification {
        kind: "shirt".to_owned(),
        color: "blue".to_owned(),
        style: "casual".to_owned(),
        tags: vec!["cotton".to_owned()],
        refresh_cycle: 7,
    }
}

/// A new item carrying a not-yet-uploaded inline image.
pub fn inline_shirt() -> NewItem {
    NewItem::from_classification(
        ImageRef::Inline("data:image/jpeg;base64,AAAA".to_owned()),
        shirt_classification(),
    )
}

pub fn closet_collection() -> CollectionPath {
    CollectionPath::new(format!("users/{USER}/closet"))
}

pub fn raw_doc(value: Value) -> Document {
    match value {
        Value::Object(map) => Document(map),
        other => panic!("expected object, got {other:?}"),
    }
}

/// Write an item document directly into the store, the way another
/// device of the same user would.
pub async fn seed_remote_item(store: &MemoryStore, created_at: &str) -> DocId {
    use docstore::DocumentStore;

    store
        .add(
            &closet_collection(),
            raw_doc(json!({
                "type": "shirt",
                "color": "blue",
                "style": "casual",
                "imageUrl": "https://blobs.invalid/seeded.jpg",
                "createdAt": created_at,
            })),
        )
        .await
        .unwrap()
}

pub async fn seed_remote_item_worn(
    store: &MemoryStore,
    created_at: &str,
    last_worn: &str,
    refresh_cycle: u32,
) -> DocId {
    use docstore::DocumentStore;

    store
        .add(
            &closet_collection(),
            raw_doc(json!({
                "type": "shirt",
                "color": "blue",
                "style": "casual",
                "imageUrl": "https://blobs.invalid/seeded.jpg",
                "createdAt": created_at,
                "lastWorn": last_worn,
                "refreshCycle": refresh_cycle,
            })),
        )
        .await
        .unwrap()
}

/// Block until the item list satisfies the predicate, then return it.
pub async fn wait_for_items(
    closet: &Closet,
    predicate: impl FnMut(&Vec<ClothingItem>) -> bool,
) -> Vec<ClothingItem> {
    let mut rx = closet.watch_items();
    let items = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for items")
        .expect("items channel closed");
    items.clone()
}

pub async fn wait_for_status(closet: &Closet, wanted: SyncStatus) {
    let mut rx = closet.sync_status();
    tokio::time::timeout(WAIT, rx.wait_for(|status| *status == wanted))
        .await
        .expect("timed out waiting for sync status")
        .expect("status channel closed");
}
