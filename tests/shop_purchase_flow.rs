/// Integration tests for the shop over the seeded starter catalog: browsing,
/// discounted purchases, limits, and refunds end to end.
use petkeep::balance;
use petkeep::errors::PetKeepError;
use petkeep::shop::{browse_catalog, purchase, purchase_stats, request_refund};
use petkeep::storage::{PetKeepStore, PetKeepStoreBuilder};
use petkeep::types::{PurchaseStatus, UserRecord};
use tempfile::tempdir;

fn setup_store() -> (tempfile::TempDir, PetKeepStore, String) {
    let dir = tempdir().unwrap();
    let store = PetKeepStoreBuilder::new(dir.path()).open().unwrap();
    let user = UserRecord::new("shopper");
    let user_id = user.id.clone();
    store.put_user(user).unwrap();
    (dir, store, user_id)
}

#[test]
fn seeded_catalog_is_browsable_by_level() {
    let (_dir, store, _) = setup_store();
    let level_one = browse_catalog(&store, 1).unwrap();
    let level_five = browse_catalog(&store, 5).unwrap();
    // Level gates hide the high-tier items from a fresh account.
    assert!(level_one.len() < level_five.len());
    assert!(level_one.iter().all(|item| item.min_level <= 1));
}

#[test]
fn discounted_purchase_and_refund_round_trip() {
    let (_dir, store, user_id) = setup_store();
    // deluxe_feast: 100 points, 20% discount capped at 15, min level 3.
    let mut user = store.get_user(&user_id).unwrap();
    user.level = 3;
    user.points = 200;
    store.put_user(user).unwrap();

    let record = purchase(&store, &user_id, "deluxe_feast", 2, None).unwrap();
    assert_eq!(record.unit_price, 85);
    assert_eq!(record.total_price, 170);
    assert_eq!(record.status, PurchaseStatus::Completed);
    assert_eq!(store.get_user(&user_id).unwrap().points, 30);

    let refunded = request_refund(&store, &user_id, &record.id, Some("wrong size")).unwrap();
    assert_eq!(refunded.status, PurchaseStatus::Refunded);
    assert_eq!(store.get_user(&user_id).unwrap().points, 200);
}

#[test]
fn level_gate_blocks_fresh_accounts() {
    let (_dir, store, user_id) = setup_store();
    balance::add_points(&store, &user_id, 1000).unwrap();
    let err = purchase(&store, &user_id, "deluxe_feast", 1, None).unwrap_err();
    assert!(matches!(err, PetKeepError::NotPurchasable(_)));
}

#[test]
fn daily_limited_tonic_stops_at_two() {
    let (_dir, store, user_id) = setup_store();
    balance::add_points(&store, &user_id, 1000).unwrap();

    purchase(&store, &user_id, "herbal_tonic", 2, None).unwrap();
    let err = purchase(&store, &user_id, "herbal_tonic", 1, None).unwrap_err();
    assert!(matches!(err, PetKeepError::LimitExceeded { .. }));
}

#[test]
fn finite_stock_runs_out() {
    let (_dir, store, user_id) = setup_store();
    // cozy_cushion is seeded with 50 in stock.
    balance::add_points(&store, &user_id, 100_000).unwrap();

    purchase(&store, &user_id, "cozy_cushion", 50, None).unwrap();
    let err = purchase(&store, &user_id, "cozy_cushion", 1, None).unwrap_err();
    // Stock hit zero, so the purchasability gate trips first.
    assert!(matches!(err, PetKeepError::NotPurchasable(_)));
    assert_eq!(store.get_item("cozy_cushion").unwrap().stock, 0);
    assert_eq!(store.get_item("cozy_cushion").unwrap().sold_count, 50);
}

#[test]
fn stats_accumulate_over_purchases() {
    let (_dir, store, user_id) = setup_store();
    balance::add_points(&store, &user_id, 1000).unwrap();

    purchase(&store, &user_id, "basic_kibble", 3, None).unwrap();
    purchase(&store, &user_id, "squeaky_ball", 1, None).unwrap();

    let stats = purchase_stats(&store, &user_id, chrono::Utc::now()).unwrap();
    assert_eq!(stats.total_purchases, 2);
    assert_eq!(stats.total_spent, 3 * 20 + 35);
    assert_eq!(stats.unique_items, 2);
    assert_eq!(stats.today_purchases, 2);
}
