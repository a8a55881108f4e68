//! Starter shop catalog inserted into an empty store so a fresh install has
//! something to sell.

use crate::types::{
    DiscountInfo, DiscountKind, ItemKind, ItemRarity, LimitWindow, PurchaseLimit, ShopItemRecord,
};

/// Item ids seeded into a fresh catalog, in sort order.
pub const STARTER_ITEM_IDS: [&str; 6] = [
    "basic_kibble",
    "squeaky_ball",
    "herbal_tonic",
    "cozy_cushion",
    "deluxe_feast",
    "lucky_charm",
];

/// Build the starter catalog. Prices are in points.
pub fn starter_catalog() -> Vec<ShopItemRecord> {
    let mut items = Vec::new();

    let mut kibble = ShopItemRecord::new("basic_kibble", "Basic Kibble", "food", ItemKind::Food, 20);
    kibble.description = "Everyday dry food. Fills the bowl, nothing fancy.".to_string();
    kibble.sort_order = 1;
    items.push(kibble);

    let mut ball =
        ShopItemRecord::new("squeaky_ball", "Squeaky Ball", "toy", ItemKind::Toy, 35);
    ball.description = "A bouncy ball with an irresistible squeak.".to_string();
    ball.rarity = ItemRarity::Uncommon;
    ball.sort_order = 2;
    items.push(ball);

    let mut tonic = ShopItemRecord::new(
        "herbal_tonic",
        "Herbal Tonic",
        "medicine",
        ItemKind::Medicine,
        60,
    );
    tonic.description = "Restores a sick pet's strength.".to_string();
    tonic.purchase_limit = Some(PurchaseLimit {
        window: LimitWindow::Daily,
        quantity: 2,
    });
    tonic.sort_order = 3;
    items.push(tonic);

    let mut cushion = ShopItemRecord::new(
        "cozy_cushion",
        "Cozy Cushion",
        "decoration",
        ItemKind::Decoration,
        120,
    );
    cushion.description = "A plush corner for afternoon naps.".to_string();
    cushion.rarity = ItemRarity::Rare;
    cushion.stock = 50;
    cushion.sort_order = 4;
    items.push(cushion);

    let mut feast = ShopItemRecord::new(
        "deluxe_feast",
        "Deluxe Feast",
        "food",
        ItemKind::Food,
        100,
    );
    feast.description = "A gourmet spread for special occasions.".to_string();
    feast.rarity = ItemRarity::Epic;
    feast.discount = Some(DiscountInfo {
        kind: DiscountKind::Percentage,
        value: 20.0,
        max_discount: Some(15),
        starts_at: None,
        ends_at: None,
    });
    feast.min_level = 3;
    feast.sort_order = 5;
    items.push(feast);

    let mut charm = ShopItemRecord::new(
        "lucky_charm",
        "Lucky Charm",
        "special",
        ItemKind::Special,
        300,
    );
    charm.description = "Said to bring fortunate days. Limited run.".to_string();
    charm.rarity = ItemRarity::Legendary;
    charm.stock = 10;
    charm.min_level = 5;
    charm.purchase_limit = Some(PurchaseLimit {
        window: LimitWindow::Total,
        quantity: 1,
    });
    charm.sort_order = 6;
    items.push(charm);

    items
}
