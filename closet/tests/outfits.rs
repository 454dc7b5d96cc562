pub mod harness;

use closet::{Classification, Criteria, ImageRef, NewItem, Outfit, SyncStatus};
use docstore::DocId;

fn criteria() -> Criteria {
    Criteria {
        destination: "office".to_owned(),
        temperature: "mild".to_owned(),
        style: "casual".to_owned(),
        forecast: None,
    }
}

#[tokio::test]
async fn suggestions_draw_only_from_available_items() {
    let t = harness::closet_with_recommender(harness::FakeRecommender::with_outfits(vec![]));
    let available = harness::seed_remote_item(&t.store, "2024-05-01T00:00:00Z").await;
    // Worn yesterday with a 7 day cycle: resting, not available.
    let yesterday = chrono::Utc::now() - chrono::Duration::days(1);
    harness::seed_remote_item_worn(
        &t.store,
        "2024-05-02T00:00:00Z",
        &yesterday.to_rfc3339(),
        7,
    )
    .await;

    t.closet.start_sync().await.unwrap();
    harness::wait_for_items(&t.closet, |items| items.len() == 2).await;

    t.closet.suggest_outfits(&criteria()).await;

    let seen = t.recommender.last_available();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id.as_durable(), Some(&available));
}

#[tokio::test]
async fn invented_item_ids_are_filtered_out() {
    let recommender = harness::FakeRecommender::with_outfits(vec![
        Outfit {
            summary: "blue on blue".to_owned(),
            item_ids: vec![DocId::new("doc-1"), DocId::new("doc-999")],
        },
        Outfit {
            summary: "imaginary".to_owned(),
            item_ids: vec![DocId::new("doc-998")],
        },
    ]);
    let t = harness::closet_with_recommender(recommender);
    let real = harness::seed_remote_item(&t.store, "2024-05-01T00:00:00Z").await;
    assert_eq!(real, DocId::new("doc-1"));

    t.closet.start_sync().await.unwrap();
    harness::wait_for_items(&t.closet, |items| items.len() == 1).await;

    let outfits = t.closet.suggest_outfits(&criteria()).await;

    assert_eq!(outfits.len(), 1);
    assert_eq!(outfits[0].item_ids, vec![real]);
}

#[tokio::test]
async fn recommender_failure_yields_an_empty_list() {
    let t = harness::closet_with_recommender(harness::FakeRecommender::failing());
    harness::seed_remote_item(&t.store, "2024-05-01T00:00:00Z").await;
    t.closet.start_sync().await.unwrap();
    harness::wait_for_status(&t.closet, SyncStatus::Live).await;

    let outfits = t.closet.suggest_outfits(&criteria()).await;

    assert!(outfits.is_empty());
}

#[tokio::test]
async fn classification_failure_falls_back_instead_of_blocking_creation() {
    let t = harness::signed_in_closet_with_classifier(harness::FakeClassifier::failing());
    t.closet.start_sync().await.unwrap();
    harness::wait_for_status(&t.closet, SyncStatus::Live).await;

    let image = ImageRef::Inline("data:image/jpeg;base64,AAAA".to_owned());
    let classification = t.closet.classify_or_fallback(&image).await;
    assert_eq!(classification, Classification::manual_fallback());

    t.closet
        .add_item(NewItem::from_classification(image, classification))
        .await
        .unwrap();

    let items = harness::wait_for_items(&t.closet, |items| {
        items.len() == 1 && !items[0].is_optimistic()
    })
    .await;
    assert_eq!(items[0].kind, "unknown");
    assert_eq!(items[0].tags, vec!["manual-entry".to_owned()]);
    assert_eq!(items[0].refresh_cycle, 7);
}
