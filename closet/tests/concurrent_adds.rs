pub mod harness;

use closet::SyncStatus;
use std::sync::Arc;

/// Two adds issued without awaiting the first: both temp records appear,
/// and each settles independently of the other's timing.
#[tokio::test]
async fn unawaited_adds_settle_independently() {
    let t = Arc::new(harness::signed_in_closet());
    t.closet.start_sync().await.unwrap();
    harness::wait_for_status(&t.closet, SyncStatus::Live).await;

    let gate = t.store.gate_uploads();

    let first = {
        let t = t.clone();
        tokio::spawn(async move { t.closet.add_item(harness::inline_shirt()).await })
    };
    let second = {
        let t = t.clone();
        tokio::spawn(async move { t.closet.add_item(harness::inline_shirt()).await })
    };

    // Both uploads are stuck; both optimistic records are visible.
    harness::wait_for_items(&t.closet, |items| {
        items.len() == 2 && items.iter().all(|item| item.is_optimistic())
    })
    .await;

    // Let one upload through: one record settles, the other stays pending.
    gate.add_permits(1);
    harness::wait_for_items(&t.closet, |items| {
        items.len() == 2
            && items.iter().filter(|item| item.is_optimistic()).count() == 1
    })
    .await;

    gate.add_permits(1);
    let items = harness::wait_for_items(&t.closet, |items| {
        items.len() == 2 && items.iter().all(|item| !item.is_optimistic())
    })
    .await;

    let first_id = first.await.unwrap().unwrap();
    let second_id = second.await.unwrap().unwrap();
    let mut confirmed: Vec<_> = items
        .iter()
        .map(|item| item.id.as_durable().unwrap().clone())
        .collect();
    confirmed.sort();
    let mut expected = vec![first_id, second_id];
    expected.sort();
    assert_eq!(confirmed, expected);
}
