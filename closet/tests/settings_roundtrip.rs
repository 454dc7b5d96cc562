pub mod harness;

use closet::{MutationError, UserSettings};
use docstore::{CollectionPath, DocId, DocumentStore, WriteMode};
use serde_json::json;

#[tokio::test]
async fn settings_are_saved_with_merge_and_loaded_back() {
    let t = harness::signed_in_closet();

    t.closet
        .save_settings(UserSettings {
            api_key: Some("sk-test".to_owned()),
        })
        .await
        .unwrap();

    let loaded = t.closet.load_settings().await.unwrap();
    assert_eq!(loaded.unwrap().api_key.as_deref(), Some("sk-test"));
}

#[tokio::test]
async fn saving_settings_does_not_clobber_unrelated_fields() {
    let t = harness::signed_in_closet();
    let path = CollectionPath::new("users").doc(&DocId::new(harness::USER));

    // Another surface stored its own field on the user document.
    t.store
        .set(
            &path,
            harness::raw_doc(json!({"theme": "dark"})),
            WriteMode::Merge,
        )
        .await
        .unwrap();

    t.closet
        .save_settings(UserSettings {
            api_key: Some("sk-test".to_owned()),
        })
        .await
        .unwrap();

    let doc = t.store.get(&path).await.unwrap().unwrap();
    assert_eq!(doc.get("theme"), Some(&json!("dark")));
    assert_eq!(doc.get("apiKey"), Some(&json!("sk-test")));
}

#[tokio::test]
async fn loading_settings_requires_a_session() {
    let t = harness::signed_out_closet();

    let result = t.closet.load_settings().await;

    assert!(matches!(result, Err(MutationError::NotAuthenticated)));
}
