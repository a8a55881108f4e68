use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use sled::IVec;

use crate::errors::PetKeepError;
use crate::types::{
    CheckInRecord, InteractionRecord, PetRecord, PurchaseRecord, ShopItemRecord, UserRecord,
    CHECKIN_SCHEMA_VERSION, INTERACTION_SCHEMA_VERSION, ITEM_SCHEMA_VERSION, PET_SCHEMA_VERSION,
    PURCHASE_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

const TREE_PRIMARY: &str = "petkeep";
const TREE_CHECKINS: &str = "petkeep_checkins";
const TREE_INTERACTIONS: &str = "petkeep_interactions";
const TREE_PURCHASES: &str = "petkeep_purchases";
const TREE_CATALOG: &str = "petkeep_catalog";

fn timestamp_nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct PetKeepStoreBuilder {
    path: PathBuf,
    seed_catalog: bool,
}

impl PetKeepStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_catalog: true,
        }
    }

    /// Opt out of seeding the starter catalog during initialization
    /// (useful for targeted tests).
    pub fn without_catalog_seed(mut self) -> Self {
        self.seed_catalog = false;
        self
    }

    pub fn open(self) -> Result<PetKeepStore, PetKeepError> {
        PetKeepStore::open_with_options(self.path, self.seed_catalog)
    }
}

/// Sled-backed persistence for users, pets, check-ins, interactions,
/// the shop catalog, and purchase history.
pub struct PetKeepStore {
    _db: sled::Db,
    primary: sled::Tree,
    checkins: sled::Tree,
    interactions: sled::Tree,
    purchases: sled::Tree,
    catalog: sled::Tree,
}

impl PetKeepStore {
    /// Open (or create) the store rooted at `path`. The starter shop catalog
    /// is inserted if the catalog tree is still empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PetKeepError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, seed_catalog: bool) -> Result<Self, PetKeepError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let checkins = db.open_tree(TREE_CHECKINS)?;
        let interactions = db.open_tree(TREE_INTERACTIONS)?;
        let purchases = db.open_tree(TREE_PURCHASES)?;
        let catalog = db.open_tree(TREE_CATALOG)?;
        let store = Self {
            _db: db,
            primary,
            checkins,
            interactions,
            purchases,
            catalog,
        };

        if seed_catalog {
            store.seed_catalog_if_empty()?;
        }

        Ok(store)
    }

    fn user_key(user_id: &str) -> Vec<u8> {
        format!("users:{user_id}").into_bytes()
    }

    fn pet_key(pet_id: &str) -> Vec<u8> {
        format!("pets:{pet_id}").into_bytes()
    }

    fn checkin_key(user_id: &str, date: NaiveDate) -> Vec<u8> {
        format!("checkins:{user_id}:{}", date.format("%Y-%m-%d")).into_bytes()
    }

    fn checkin_prefix(user_id: &str) -> Vec<u8> {
        format!("checkins:{user_id}:").into_bytes()
    }

    fn interaction_key(record: &InteractionRecord) -> Vec<u8> {
        format!(
            "interactions:{}:{:020}:{}",
            record.pet_id,
            timestamp_nanos(record.created_at),
            record.id
        )
        .into_bytes()
    }

    fn purchase_key(record: &PurchaseRecord) -> Vec<u8> {
        format!(
            "purchases:{}:{:020}:{}",
            record.user_id,
            timestamp_nanos(record.created_at),
            record.id
        )
        .into_bytes()
    }

    fn item_key(item_id: &str) -> Vec<u8> {
        format!("items:{item_id}").into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, PetKeepError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, PetKeepError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert or update a user record.
    pub fn put_user(&self, mut user: UserRecord) -> Result<(), PetKeepError> {
        user.schema_version = USER_SCHEMA_VERSION;
        user.touch();
        let key = Self::user_key(&user.id);
        let bytes = Self::serialize(&user)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a user record by id.
    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, PetKeepError> {
        let key = Self::user_key(user_id);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(PetKeepError::NotFound(format!("user: {user_id}")));
        };
        let record: UserRecord = Self::deserialize(bytes)?;
        if record.schema_version != USER_SCHEMA_VERSION {
            return Err(PetKeepError::SchemaMismatch {
                entity: "user",
                expected: USER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// List all user ids currently stored.
    pub fn list_user_ids(&self) -> Result<Vec<String>, PetKeepError> {
        let mut ids = Vec::new();
        for entry in self.primary.scan_prefix(b"users:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text.strip_prefix("users:") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Pets
    // ------------------------------------------------------------------

    /// Insert or update a pet record.
    pub fn put_pet(&self, mut pet: PetRecord) -> Result<(), PetKeepError> {
        pet.schema_version = PET_SCHEMA_VERSION;
        pet.touch();
        let key = Self::pet_key(&pet.id);
        let bytes = Self::serialize(&pet)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a pet record by id, without applying decay. Rule code goes
    /// through `pet::get_pet` so attributes reflect elapsed time.
    pub fn get_pet_raw(&self, pet_id: &str) -> Result<PetRecord, PetKeepError> {
        let key = Self::pet_key(pet_id);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(PetKeepError::NotFound(format!("pet: {pet_id}")));
        };
        let record: PetRecord = Self::deserialize(bytes)?;
        if record.schema_version != PET_SCHEMA_VERSION {
            return Err(PetKeepError::SchemaMismatch {
                entity: "pet",
                expected: PET_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// List all pets owned by a user.
    pub fn list_pets_by_owner(&self, owner_id: &str) -> Result<Vec<PetRecord>, PetKeepError> {
        let mut pets = Vec::new();
        for entry in self.primary.scan_prefix(b"pets:") {
            let (_, value) = entry?;
            let record: PetRecord = Self::deserialize(value)?;
            if record.owner_id == owner_id {
                pets.push(record);
            }
        }
        Ok(pets)
    }

    pub fn count_pets_by_owner(&self, owner_id: &str) -> Result<usize, PetKeepError> {
        Ok(self.list_pets_by_owner(owner_id)?.len())
    }

    /// Remove a pet record. Interactions referencing it are kept as history.
    pub fn delete_pet(&self, pet_id: &str) -> Result<(), PetKeepError> {
        let key = Self::pet_key(pet_id);
        if self.primary.remove(&key)?.is_none() {
            return Err(PetKeepError::NotFound(format!("pet: {pet_id}")));
        }
        self.primary.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Check-ins
    // ------------------------------------------------------------------

    /// Insert a check-in record. The key embeds `(user, date)`, so at most
    /// one record can exist per user per calendar day.
    pub fn put_check_in(&self, mut record: CheckInRecord) -> Result<(), PetKeepError> {
        record.schema_version = CHECKIN_SCHEMA_VERSION;
        let key = Self::checkin_key(&record.user_id, record.check_in_date);
        let bytes = Self::serialize(&record)?;
        self.checkins.insert(key, bytes)?;
        self.checkins.flush()?;
        Ok(())
    }

    /// Fetch the check-in for a user on a specific date, if any.
    pub fn get_check_in(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<CheckInRecord>, PetKeepError> {
        let key = Self::checkin_key(user_id, date);
        let Some(bytes) = self.checkins.get(&key)? else {
            return Ok(None);
        };
        let record: CheckInRecord = Self::deserialize(bytes)?;
        if record.schema_version != CHECKIN_SCHEMA_VERSION {
            return Err(PetKeepError::SchemaMismatch {
                entity: "check_in",
                expected: CHECKIN_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    /// List a user's check-ins in ascending date order (the key embeds the
    /// date in sortable form).
    pub fn list_check_ins(&self, user_id: &str) -> Result<Vec<CheckInRecord>, PetKeepError> {
        let prefix = Self::checkin_prefix(user_id);
        let mut records = Vec::new();
        for entry in self.checkins.scan_prefix(&prefix) {
            let (_, value) = entry?;
            records.push(Self::deserialize(value)?);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------

    /// Append an interaction log entry.
    pub fn append_interaction(&self, mut record: InteractionRecord) -> Result<(), PetKeepError> {
        record.schema_version = INTERACTION_SCHEMA_VERSION;
        let key = Self::interaction_key(&record);
        let bytes = Self::serialize(&record)?;
        self.interactions.insert(key, bytes)?;
        self.interactions.flush()?;
        Ok(())
    }

    /// List a pet's interactions, most recent first, capped at `limit`
    /// (0 = no cap).
    pub fn list_interactions_for_pet(
        &self,
        pet_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, PetKeepError> {
        let prefix = format!("interactions:{pet_id}:").into_bytes();
        let mut records = Vec::new();
        for entry in self.interactions.scan_prefix(&prefix) {
            let (_, value) = entry?;
            records.push(Self::deserialize(value)?);
        }
        records.reverse();
        if limit > 0 {
            records.truncate(limit);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Purchases
    // ------------------------------------------------------------------

    /// Insert or update a purchase record. The key is derived from immutable
    /// fields, so status transitions overwrite in place.
    pub fn put_purchase(&self, mut record: PurchaseRecord) -> Result<(), PetKeepError> {
        record.schema_version = PURCHASE_SCHEMA_VERSION;
        record.updated_at = Utc::now();
        let key = Self::purchase_key(&record);
        let bytes = Self::serialize(&record)?;
        self.purchases.insert(key, bytes)?;
        self.purchases.flush()?;
        Ok(())
    }

    /// Fetch one of a user's purchases by id.
    pub fn get_purchase(
        &self,
        user_id: &str,
        purchase_id: &str,
    ) -> Result<PurchaseRecord, PetKeepError> {
        for record in self.list_purchases(user_id)? {
            if record.id == purchase_id {
                return Ok(record);
            }
        }
        Err(PetKeepError::NotFound(format!("purchase: {purchase_id}")))
    }

    /// List a user's purchases in creation order.
    pub fn list_purchases(&self, user_id: &str) -> Result<Vec<PurchaseRecord>, PetKeepError> {
        let prefix = format!("purchases:{user_id}:").into_bytes();
        let mut records = Vec::new();
        for entry in self.purchases.scan_prefix(&prefix) {
            let (_, value) = entry?;
            let record: PurchaseRecord = Self::deserialize(value)?;
            if record.schema_version != PURCHASE_SCHEMA_VERSION {
                return Err(PetKeepError::SchemaMismatch {
                    entity: "purchase",
                    expected: PURCHASE_SCHEMA_VERSION,
                    found: record.schema_version,
                });
            }
            records.push(record);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Shop catalog
    // ------------------------------------------------------------------

    /// Insert or update a catalog item.
    pub fn put_item(&self, mut item: ShopItemRecord) -> Result<(), PetKeepError> {
        item.schema_version = ITEM_SCHEMA_VERSION;
        item.touch();
        let key = Self::item_key(&item.id);
        let bytes = Self::serialize(&item)?;
        self.catalog.insert(key, bytes)?;
        self.catalog.flush()?;
        Ok(())
    }

    /// Fetch a catalog item by id.
    pub fn get_item(&self, item_id: &str) -> Result<ShopItemRecord, PetKeepError> {
        let key = Self::item_key(item_id);
        let Some(bytes) = self.catalog.get(&key)? else {
            return Err(PetKeepError::NotFound(format!("item: {item_id}")));
        };
        let record: ShopItemRecord = Self::deserialize(bytes)?;
        if record.schema_version != ITEM_SCHEMA_VERSION {
            return Err(PetKeepError::SchemaMismatch {
                entity: "item",
                expected: ITEM_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// List the full catalog.
    pub fn list_items(&self) -> Result<Vec<ShopItemRecord>, PetKeepError> {
        let mut items = Vec::new();
        for entry in self.catalog.scan_prefix(b"items:") {
            let (_, value) = entry?;
            items.push(Self::deserialize(value)?);
        }
        Ok(items)
    }

    pub fn seed_catalog_if_empty(&self) -> Result<usize, PetKeepError> {
        if self.catalog.scan_prefix(b"items:").next().is_some() {
            return Ok(0);
        }
        let mut inserted = 0usize;
        for item in crate::state::starter_catalog() {
            self.put_item(item)?;
            inserted += 1;
        }
        Ok(inserted)
    }
}
