use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const PET_SCHEMA_VERSION: u8 = 1;
pub const CHECKIN_SCHEMA_VERSION: u8 = 1;
pub const INTERACTION_SCHEMA_VERSION: u8 = 1;
pub const ITEM_SCHEMA_VERSION: u8 = 1;
pub const PURCHASE_SCHEMA_VERSION: u8 = 1;

/// Points granted to every newly created account.
pub const NEW_USER_POINTS: i64 = 100;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ============================================================================
// Users
// ============================================================================

/// Account-level balances and progression. Points and experience are only
/// mutated through the balance operations, never directly by rule code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub nickname: String,
    pub points: i64,
    pub level: u32,
    pub experience: i64,
    #[serde(default)]
    pub consecutive_checkins: u32,
    #[serde(default)]
    pub total_checkins: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(nickname: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            nickname: nickname.to_string(),
            points: NEW_USER_POINTS,
            level: 1,
            experience: 0,
            consecutive_checkins: 0,
            total_checkins: 0,
            created_at: now,
            updated_at: now,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    /// Experience required to advance past the current level.
    pub fn next_level_experience(&self) -> i64 {
        i64::from(self.level) * 100
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Pets
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PetSpecies {
    Cat,
    Dog,
    Rabbit,
    Hamster,
    Bird,
    Fish,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PetGender {
    Male,
    Female,
    Unknown,
}

/// Derived pet condition. Always recomputed from the four attributes after
/// any mutation, never set independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PetStatus {
    Healthy,
    Sick,
    Hungry,
    Tired,
    Sad,
    Happy,
}

/// A pet owned by exactly one user. Attributes stay in `[0, 100]`; experience
/// and level only grow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PetRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub species: PetSpecies,
    #[serde(default)]
    pub breed: Option<String>,
    pub gender: PetGender,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    pub health: i32,
    pub happiness: i32,
    pub energy: i32,
    pub hunger: i32,
    pub experience: i64,
    pub level: u32,
    pub status: PetStatus,
    #[serde(default)]
    pub total_feedings: u32,
    #[serde(default)]
    pub total_playings: u32,
    #[serde(default)]
    pub total_carings: u32,
    #[serde(default)]
    pub last_feed_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_play_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_care_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_interaction_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PetRecord {
    pub fn new(owner_id: &str, name: &str, species: PetSpecies) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            species,
            breed: None,
            gender: PetGender::Unknown,
            birthday: None,
            description: None,
            health: 100,
            happiness: 100,
            energy: 100,
            hunger: 100,
            experience: 0,
            level: 1,
            status: PetStatus::Healthy,
            total_feedings: 0,
            total_playings: 0,
            total_carings: 0,
            last_feed_time: None,
            last_play_time: None,
            last_care_time: None,
            last_interaction_time: Some(now),
            created_at: now,
            updated_at: now,
            schema_version: PET_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Check-ins
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckInKind {
    Daily,
    MakeUp,
}

/// Structured reward attached to a check-in: final point/experience numbers
/// plus any item and badge grants for the streak tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckInRewards {
    pub points: i64,
    pub experience: i64,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub badges: Vec<String>,
}

/// One check-in per user per calendar day. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckInRecord {
    pub id: String,
    pub user_id: String,
    pub check_in_date: NaiveDate,
    pub kind: CheckInKind,
    pub points_earned: i64,
    pub experience_earned: i64,
    pub consecutive_days: u32,
    pub is_bonus_day: bool,
    pub multiplier: f64,
    pub rewards: CheckInRewards,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl CheckInRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: &str,
        check_in_date: NaiveDate,
        kind: CheckInKind,
        consecutive_days: u32,
        is_bonus_day: bool,
        multiplier: f64,
        rewards: CheckInRewards,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            check_in_date,
            kind,
            points_earned: rewards.points,
            experience_earned: rewards.experience,
            consecutive_days,
            is_bonus_day,
            multiplier,
            rewards,
            notes,
            created_at: Utc::now(),
            schema_version: CHECKIN_SCHEMA_VERSION,
        }
    }
}

// ============================================================================
// Interactions
// ============================================================================

/// All interaction kinds the API accepts. Only the first five carry resolver
/// rules; the rest are recorded by the product but resolve to an
/// `InvalidInteraction` error here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Feed,
    Play,
    Care,
    Clean,
    Medicine,
    Exercise,
    Sleep,
    Bath,
    Training,
    Photo,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Feed => "feed",
            InteractionKind::Play => "play",
            InteractionKind::Care => "care",
            InteractionKind::Clean => "clean",
            InteractionKind::Medicine => "medicine",
            InteractionKind::Exercise => "exercise",
            InteractionKind::Sleep => "sleep",
            InteractionKind::Bath => "bath",
            InteractionKind::Training => "training",
            InteractionKind::Photo => "photo",
        }
    }
}

impl std::str::FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "feed" => Ok(InteractionKind::Feed),
            "play" => Ok(InteractionKind::Play),
            "care" => Ok(InteractionKind::Care),
            "clean" => Ok(InteractionKind::Clean),
            "medicine" => Ok(InteractionKind::Medicine),
            "exercise" => Ok(InteractionKind::Exercise),
            "sleep" => Ok(InteractionKind::Sleep),
            "bath" => Ok(InteractionKind::Bath),
            "training" => Ok(InteractionKind::Training),
            "photo" => Ok(InteractionKind::Photo),
            other => Err(format!("unknown interaction kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionResult {
    Success,
    Failed,
}

/// Signed attribute deltas produced by one interaction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeChanges {
    pub health: i32,
    pub happiness: i32,
    pub energy: i32,
    pub hunger: i32,
}

/// Attribute snapshot taken around an interaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PetStateSnapshot {
    pub health: i32,
    pub happiness: i32,
    pub energy: i32,
    pub hunger: i32,
    pub level: u32,
}

impl PetStateSnapshot {
    pub fn of(pet: &PetRecord) -> Self {
        Self {
            health: pet.health,
            happiness: pet.happiness,
            energy: pet.energy,
            hunger: pet.hunger,
            level: pet.level,
        }
    }
}

/// Append-only log entry describing one pet interaction, written
/// alongside the pet mutation it describes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub id: String,
    pub user_id: String,
    pub pet_id: String,
    pub kind: InteractionKind,
    pub result: InteractionResult,
    #[serde(default)]
    pub item: Option<String>,
    pub intensity: u8,
    pub experience_gained: i64,
    pub points_gained: i64,
    pub duration_secs: u32,
    pub attribute_changes: AttributeChanges,
    pub pet_state_before: PetStateSnapshot,
    pub pet_state_after: PetStateSnapshot,
    pub level_up_occurred: bool,
    #[serde(default)]
    pub new_level: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl InteractionRecord {
    /// Weighted sum of attribute movement: positive deltas count in full,
    /// drains at reduced weight, level-ups add a flat bonus. Floored at 0.
    pub fn effectiveness_score(&self) -> i64 {
        let c = &self.attribute_changes;
        let mut score = 0.0;
        for v in [c.health, c.happiness] {
            score += if v > 0 { f64::from(v) } else { f64::from(v) * 0.5 };
        }
        for v in [c.energy, c.hunger] {
            score += if v > 0 { f64::from(v) } else { f64::from(v) * 0.3 };
        }
        if self.level_up_occurred {
            score += 50.0;
        }
        score.round().max(0.0) as i64
    }

    pub fn is_effective(&self) -> bool {
        self.result == InteractionResult::Success && self.effectiveness_score() > 0
    }
}

// ============================================================================
// Shop catalog
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Food,
    Toy,
    Medicine,
    Decoration,
    Special,
    Consumable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    Inactive,
    OutOfStock,
    ComingSoon,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

/// Time-boxed discount. Percentage discounts may cap the absolute cut.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountInfo {
    pub kind: DiscountKind,
    pub value: f64,
    #[serde(default)]
    pub max_discount: Option<i64>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LimitWindow {
    Daily,
    Weekly,
    Monthly,
    Total,
}

/// Per-user purchase cap inside a calendar-aligned window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseLimit {
    pub window: LimitWindow,
    pub quantity: u32,
}

/// One attribute effect an item applies when used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemEffect {
    pub attribute: String,
    pub value: i32,
}

/// Catalog entry. `stock == -1` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopItemRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub kind: ItemKind,
    pub rarity: ItemRarity,
    pub status: ItemStatus,
    pub price: i64,
    #[serde(default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub discount: Option<DiscountInfo>,
    #[serde(default)]
    pub purchase_limit: Option<PurchaseLimit>,
    pub stock: i64,
    #[serde(default)]
    pub sold_count: u32,
    #[serde(default)]
    pub view_count: u32,
    pub min_level: u32,
    #[serde(default)]
    pub available_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub available_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub effects: Vec<ItemEffect>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort_order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ShopItemRecord {
    pub fn new(id: &str, name: &str, category: &str, kind: ItemKind, price: i64) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            kind,
            rarity: ItemRarity::Common,
            status: ItemStatus::Active,
            price,
            original_price: None,
            discount: None,
            purchase_limit: None,
            stock: -1,
            sold_count: 0,
            view_count: 0,
            min_level: 1,
            available_from: None,
            available_to: None,
            effects: Vec::new(),
            tags: Vec::new(),
            sort_order: 0,
            created_at: now,
            updated_at: now,
            schema_version: ITEM_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Purchases
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

/// Price breakdown captured at purchase time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentDetails {
    pub points_used: i64,
    pub original_price: i64,
    pub final_price: i64,
    pub discount_applied: i64,
}

/// Immutable copy of the item fields at purchase time, so history survives
/// later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub id: String,
    pub name: String,
    pub category: String,
    pub kind: ItemKind,
    pub rarity: ItemRarity,
}

impl ItemSnapshot {
    pub fn of(item: &ShopItemRecord) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            kind: item.kind,
            rarity: item.rarity,
        }
    }
}

/// One purchase transaction. State machine:
/// pending -> completed | failed | cancelled; completed -> refunded (24h).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRecord {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub total_price: i64,
    pub status: PurchaseStatus,
    pub payment: PaymentDetails,
    pub item_snapshot: ItemSnapshot,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refunded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pet_starts_at_full_attributes() {
        let pet = PetRecord::new("owner-1", "Mochi", PetSpecies::Cat);
        assert_eq!(pet.health, 100);
        assert_eq!(pet.happiness, 100);
        assert_eq!(pet.energy, 100);
        assert_eq!(pet.hunger, 100);
        assert_eq!(pet.experience, 0);
        assert_eq!(pet.level, 1);
        assert_eq!(pet.status, PetStatus::Healthy);
        assert!(pet.last_interaction_time.is_some());
    }

    #[test]
    fn new_user_gets_starting_points() {
        let user = UserRecord::new("alice");
        assert_eq!(user.points, NEW_USER_POINTS);
        assert_eq!(user.level, 1);
        assert_eq!(user.next_level_experience(), 100);
    }

    #[test]
    fn interaction_kind_parses_from_str() {
        assert_eq!("feed".parse::<InteractionKind>(), Ok(InteractionKind::Feed));
        assert_eq!(
            "MEDICINE".parse::<InteractionKind>(),
            Ok(InteractionKind::Medicine)
        );
        assert!("cuddle".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn effectiveness_score_weighs_drains_lighter() {
        let record = InteractionRecord {
            id: "i".into(),
            user_id: "u".into(),
            pet_id: "p".into(),
            kind: InteractionKind::Play,
            result: InteractionResult::Success,
            item: None,
            intensity: 5,
            experience_gained: 15,
            points_gained: 8,
            duration_secs: 0,
            attribute_changes: AttributeChanges {
                health: 0,
                happiness: 25,
                energy: -10,
                hunger: -5,
            },
            pet_state_before: PetStateSnapshot {
                health: 100,
                happiness: 60,
                energy: 80,
                hunger: 70,
                level: 1,
            },
            pet_state_after: PetStateSnapshot {
                health: 100,
                happiness: 85,
                energy: 70,
                hunger: 65,
                level: 1,
            },
            level_up_occurred: false,
            new_level: None,
            notes: None,
            created_at: Utc::now(),
            schema_version: INTERACTION_SCHEMA_VERSION,
        };
        // 25 - 10*0.3 - 5*0.3 = 20.5 -> 21
        assert_eq!(record.effectiveness_score(), 21);
        assert!(record.is_effective());
    }
}
