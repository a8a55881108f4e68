//! Pet attribute model: derived status, lazy time decay, level progression,
//! and the store-mediated pet lifecycle (create, read-with-decay, remove).
//!
//! Decay is computed on read, never by a timer: every path that loads a pet
//! first applies the hours elapsed since its last interaction.

use chrono::{DateTime, Utc};
use log::info;

use crate::errors::PetKeepError;
use crate::storage::PetKeepStore;
use crate::types::{PetRecord, PetSpecies, PetStatus};

/// Most pets an owner can keep at once.
pub const MAX_PETS_PER_OWNER: usize = 5;

/// Map the four attributes to a status. The first matching rule wins, so the
/// precedence is sick > hungry > tired > sad > happy > healthy.
pub fn compute_status(health: i32, happiness: i32, energy: i32, hunger: i32) -> PetStatus {
    if health < 30 {
        PetStatus::Sick
    } else if hunger < 30 {
        PetStatus::Hungry
    } else if energy < 30 {
        PetStatus::Tired
    } else if happiness < 30 {
        PetStatus::Sad
    } else if happiness > 80 && health > 80 {
        PetStatus::Happy
    } else {
        PetStatus::Healthy
    }
}

impl PetRecord {
    /// Recompute the derived status from the current attributes.
    pub fn update_status(&mut self) {
        self.status = compute_status(self.health, self.happiness, self.energy, self.hunger);
    }

    /// Mean of the four attributes, rounded.
    pub fn overall_score(&self) -> i32 {
        let sum = self.health + self.happiness + self.energy + self.hunger;
        (f64::from(sum) / 4.0).round() as i32
    }

    pub fn needs_care(&self) -> bool {
        self.health < 50 || self.happiness < 50 || self.energy < 30 || self.hunger < 30
    }

    pub fn next_level_experience(&self) -> i64 {
        i64::from(self.level) * 100
    }

    pub fn can_level_up(&self) -> bool {
        self.experience >= self.next_level_experience()
    }

    /// Resolve all pending level-ups, returning how many levels were gained.
    /// Each level costs `level * 100` and restores +10 health/happiness/energy
    /// (capped at 100). The rising cost guarantees the loop terminates.
    pub fn level_up(&mut self) -> u32 {
        let mut gained = 0;
        while self.can_level_up() {
            self.experience -= self.next_level_experience();
            self.level += 1;
            gained += 1;
            self.health = (self.health + 10).min(100);
            self.happiness = (self.happiness + 10).min(100);
            self.energy = (self.energy + 10).min(100);
        }
        gained
    }

    /// Apply natural decay for the whole hours elapsed since the last
    /// interaction (or creation). Hunger drains fastest; low hunger or energy
    /// drags health down too. The anchor timestamp is NOT advanced here
    /// (only interactions move it), so calls within the same hour are no-ops.
    /// Returns the number of hours applied.
    pub fn apply_decay(&mut self, now: DateTime<Utc>) -> i64 {
        let anchor = self.last_interaction_time.unwrap_or(self.created_at);
        let hours = (now - anchor).num_hours();
        if hours <= 0 {
            return 0;
        }
        let h = hours as i32;
        self.hunger = (self.hunger - 2 * h).max(0);
        self.energy = (self.energy - h).max(0);
        self.happiness = (self.happiness - h).max(0);
        if self.hunger < 20 || self.energy < 20 {
            self.health = (self.health - h).max(0);
        }
        self.update_status();
        hours
    }

    /// Approximate age in months: elapsed days divided by 30, not
    /// calendar-accurate.
    pub fn age_months(&self, now: DateTime<Utc>) -> u32 {
        let Some(birthday) = self.birthday else {
            return 0;
        };
        let days = (now.date_naive() - birthday).num_days().abs();
        (days / 30) as u32
    }
}

/// Fields accepted when creating a pet.
#[derive(Debug, Clone, Default)]
pub struct NewPet {
    pub name: String,
    pub species: Option<PetSpecies>,
    pub breed: Option<String>,
    pub gender: Option<crate::types::PetGender>,
    pub birthday: Option<chrono::NaiveDate>,
    pub description: Option<String>,
}

/// Summary of an owner's pets.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerPetStats {
    pub total_pets: usize,
    pub healthy_pets: usize,
    pub pets_needing_care: usize,
    pub average_level: u32,
    pub total_interactions: u32,
    pub most_active_pet: Option<String>,
}

/// Create a pet for `owner_id`, enforcing the per-owner cap.
pub fn create_pet(
    store: &PetKeepStore,
    owner_id: &str,
    new_pet: NewPet,
) -> Result<PetRecord, PetKeepError> {
    store.get_user(owner_id)?;

    let name = new_pet.name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(PetKeepError::Validation(
            "pet name must be 1-100 characters".to_string(),
        ));
    }

    let owned = store.count_pets_by_owner(owner_id)?;
    if owned >= MAX_PETS_PER_OWNER {
        return Err(PetKeepError::PetLimitReached(MAX_PETS_PER_OWNER));
    }

    let mut pet = PetRecord::new(
        owner_id,
        name,
        new_pet.species.unwrap_or(PetSpecies::Cat),
    );
    pet.breed = new_pet.breed;
    if let Some(gender) = new_pet.gender {
        pet.gender = gender;
    }
    pet.birthday = new_pet.birthday;
    pet.description = new_pet.description;

    store.put_pet(pet.clone())?;
    info!("user {} created pet {}", owner_id, pet.id);
    Ok(pet)
}

/// Load a pet with decay applied and persisted, verifying ownership.
pub fn get_pet(
    store: &PetKeepStore,
    owner_id: &str,
    pet_id: &str,
) -> Result<PetRecord, PetKeepError> {
    let mut pet = store.get_pet_raw(pet_id)?;
    if pet.owner_id != owner_id {
        return Err(PetKeepError::PermissionDenied(format!(
            "pet {pet_id} belongs to another user"
        )));
    }
    if pet.apply_decay(Utc::now()) > 0 {
        store.put_pet(pet.clone())?;
    }
    Ok(pet)
}

/// List an owner's pets with decay applied and persisted.
pub fn list_pets(store: &PetKeepStore, owner_id: &str) -> Result<Vec<PetRecord>, PetKeepError> {
    let now = Utc::now();
    let mut pets = store.list_pets_by_owner(owner_id)?;
    for pet in &mut pets {
        if pet.apply_decay(now) > 0 {
            store.put_pet(pet.clone())?;
        }
    }
    Ok(pets)
}

/// Remove a pet, verifying ownership first.
pub fn remove_pet(store: &PetKeepStore, owner_id: &str, pet_id: &str) -> Result<(), PetKeepError> {
    let pet = store.get_pet_raw(pet_id)?;
    if pet.owner_id != owner_id {
        return Err(PetKeepError::PermissionDenied(format!(
            "pet {pet_id} belongs to another user"
        )));
    }
    store.delete_pet(pet_id)?;
    info!("user {} removed pet {}", owner_id, pet_id);
    Ok(())
}

/// Aggregate stats over an owner's pets.
pub fn owner_pet_stats(
    store: &PetKeepStore,
    owner_id: &str,
) -> Result<OwnerPetStats, PetKeepError> {
    let pets = list_pets(store, owner_id)?;
    let total_pets = pets.len();
    let healthy_pets = pets
        .iter()
        .filter(|p| p.status == PetStatus::Healthy)
        .count();
    let pets_needing_care = pets.iter().filter(|p| p.needs_care()).count();
    let average_level = if total_pets > 0 {
        let sum: u32 = pets.iter().map(|p| p.level).sum();
        (f64::from(sum) / total_pets as f64).round() as u32
    } else {
        0
    };
    let interactions_of =
        |p: &PetRecord| p.total_feedings + p.total_playings + p.total_carings;
    let total_interactions = pets.iter().map(interactions_of).sum();
    let most_active_pet = pets
        .iter()
        .max_by_key(|p| interactions_of(p))
        .map(|p| p.id.clone());

    Ok(OwnerPetStats {
        total_pets,
        healthy_pets,
        pets_needing_care,
        average_level,
        total_interactions,
        most_active_pet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PetKeepStoreBuilder;
    use crate::types::UserRecord;
    use chrono::Duration;
    use tempfile::tempdir;

    fn setup() -> (PetKeepStore, String) {
        let dir = tempdir().unwrap();
        let store = PetKeepStoreBuilder::new(dir.path()).open().unwrap();
        let user = UserRecord::new("tester");
        let id = user.id.clone();
        store.put_user(user).unwrap();
        (store, id)
    }

    #[test]
    fn status_precedence_first_match_wins() {
        // Sick beats every other condition.
        assert_eq!(compute_status(20, 10, 10, 10), PetStatus::Sick);
        // Hungry before tired even when both apply.
        assert_eq!(compute_status(90, 90, 10, 10), PetStatus::Hungry);
        assert_eq!(compute_status(90, 90, 10, 90), PetStatus::Tired);
        assert_eq!(compute_status(90, 10, 90, 90), PetStatus::Sad);
        assert_eq!(compute_status(90, 90, 90, 90), PetStatus::Happy);
        // Happy needs BOTH happiness and health above 80.
        assert_eq!(compute_status(80, 90, 90, 90), PetStatus::Healthy);
        assert_eq!(compute_status(50, 50, 50, 50), PetStatus::Healthy);
    }

    #[test]
    fn overall_score_and_needs_care() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        pet.health = 55;
        pet.happiness = 60;
        pet.energy = 70;
        pet.hunger = 40;
        // (55+60+70+40)/4 = 56.25 -> 56
        assert_eq!(pet.overall_score(), 56);
        assert!(!pet.needs_care());
        pet.hunger = 25;
        assert!(pet.needs_care());
    }

    #[test]
    fn level_up_does_not_overshoot() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        pet.experience = 250;
        // Level 1 -> 2 costs 100 (150 left); level 2 -> 3 would cost 200,
        // so the loop stops at level 2.
        let gained = pet.level_up();
        assert_eq!(gained, 1);
        assert_eq!(pet.level, 2);
        assert_eq!(pet.experience, 150);
    }

    #[test]
    fn level_up_handles_multi_level_jump() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        pet.health = 50;
        pet.experience = 100 + 200 + 30;
        let gained = pet.level_up();
        assert_eq!(gained, 2);
        assert_eq!(pet.level, 3);
        assert_eq!(pet.experience, 30);
        // Two level-ups each restore +10 health.
        assert_eq!(pet.health, 70);
    }

    #[test]
    fn decay_drains_per_hour_and_recomputes_status() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        let now = Utc::now();
        pet.last_interaction_time = Some(now - Duration::hours(10));
        let hours = pet.apply_decay(now);
        assert_eq!(hours, 10);
        assert_eq!(pet.hunger, 80);
        assert_eq!(pet.energy, 90);
        assert_eq!(pet.happiness, 90);
        // Hunger and energy both still >= 20, so health is untouched.
        assert_eq!(pet.health, 100);
    }

    #[test]
    fn decay_low_hunger_drags_health_down() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        let now = Utc::now();
        pet.hunger = 25;
        pet.last_interaction_time = Some(now - Duration::hours(5));
        pet.apply_decay(now);
        // 25 - 10 = 15 < 20 triggers the health drain.
        assert_eq!(pet.hunger, 15);
        assert_eq!(pet.health, 95);
    }

    #[test]
    fn decay_within_the_same_hour_is_a_noop() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        let now = Utc::now();
        pet.last_interaction_time = Some(now - Duration::hours(3));
        pet.apply_decay(now);
        let snapshot = pet.clone();
        // Seconds later, still inside the same hour bucket: nothing changes.
        assert_eq!(pet.apply_decay(now + Duration::seconds(30)), 0);
        assert_eq!(pet, snapshot);
    }

    #[test]
    fn decay_clamps_at_zero() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        let now = Utc::now();
        pet.last_interaction_time = Some(now - Duration::hours(200));
        pet.apply_decay(now);
        assert_eq!(pet.hunger, 0);
        assert_eq!(pet.energy, 0);
        assert_eq!(pet.status, PetStatus::Sick);
    }

    #[test]
    fn age_is_thirty_day_months() {
        let mut pet = PetRecord::new("o", "Mochi", PetSpecies::Cat);
        let now = Utc::now();
        assert_eq!(pet.age_months(now), 0);
        pet.birthday = Some(now.date_naive() - Duration::days(95));
        assert_eq!(pet.age_months(now), 3);
    }

    #[test]
    fn create_pet_enforces_owner_cap() {
        let (store, owner) = setup();
        for i in 0..MAX_PETS_PER_OWNER {
            create_pet(
                &store,
                &owner,
                NewPet {
                    name: format!("pet-{i}"),
                    ..NewPet::default()
                },
            )
            .unwrap();
        }
        let err = create_pet(
            &store,
            &owner,
            NewPet {
                name: "one-too-many".to_string(),
                ..NewPet::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PetKeepError::PetLimitReached(_)));
    }

    #[test]
    fn create_pet_rejects_blank_names() {
        let (store, owner) = setup();
        let err = create_pet(
            &store,
            &owner,
            NewPet {
                name: "   ".to_string(),
                ..NewPet::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PetKeepError::Validation(_)));
    }

    #[test]
    fn get_pet_checks_ownership() {
        let (store, owner) = setup();
        let pet = create_pet(
            &store,
            &owner,
            NewPet {
                name: "Mochi".to_string(),
                ..NewPet::default()
            },
        )
        .unwrap();
        assert!(get_pet(&store, &owner, &pet.id).is_ok());
        let err = get_pet(&store, "someone-else", &pet.id).unwrap_err();
        assert!(matches!(err, PetKeepError::PermissionDenied(_)));
    }

    #[test]
    fn owner_stats_aggregate() {
        let (store, owner) = setup();
        let a = create_pet(
            &store,
            &owner,
            NewPet {
                name: "A".to_string(),
                ..NewPet::default()
            },
        )
        .unwrap();
        create_pet(
            &store,
            &owner,
            NewPet {
                name: "B".to_string(),
                ..NewPet::default()
            },
        )
        .unwrap();

        let mut busy = store.get_pet_raw(&a.id).unwrap();
        busy.total_feedings = 3;
        store.put_pet(busy).unwrap();

        let stats = owner_pet_stats(&store, &owner).unwrap();
        assert_eq!(stats.total_pets, 2);
        assert_eq!(stats.total_interactions, 3);
        assert_eq!(stats.most_active_pet, Some(a.id));
    }
}
