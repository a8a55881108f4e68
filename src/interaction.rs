//! Interaction resolver: maps an action to attribute deltas and rewards,
//! applies them to the pet, resolves level-ups, and appends the log entry.
//!
//! The caller-facing flow is load -> decay -> resolve -> persist -> credit;
//! points always reach the owner through the balance service.

use chrono::{DateTime, Utc};
use log::info;

use crate::balance;
use crate::errors::PetKeepError;
use crate::pet;
use crate::storage::PetKeepStore;
use crate::types::{
    AttributeChanges, InteractionKind, InteractionRecord, InteractionResult, PetRecord,
    PetStateSnapshot, INTERACTION_SCHEMA_VERSION,
};

/// Default interaction intensity when the caller does not supply one.
/// Recorded on the log entry; it never scales the deltas.
pub const DEFAULT_INTENSITY: u8 = 5;

/// Caller-supplied interaction parameters.
#[derive(Debug, Clone)]
pub struct InteractionRequest {
    pub kind: InteractionKind,
    pub item: Option<String>,
    pub intensity: Option<u8>,
    pub duration_secs: u32,
    pub notes: Option<String>,
}

impl InteractionRequest {
    pub fn new(kind: InteractionKind) -> Self {
        Self {
            kind,
            item: None,
            intensity: None,
            duration_secs: 0,
            notes: None,
        }
    }
}

/// What one resolved interaction did.
#[derive(Debug, Clone)]
pub struct InteractionReport {
    pub record: InteractionRecord,
    pub pet: PetRecord,
    pub message: String,
    pub experience_gained: i64,
    pub points_gained: i64,
    pub leveled_up: bool,
    pub new_level: Option<u32>,
}

/// Per-pet entry in a batch outcome.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub pet_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub experience_gained: i64,
    pub points_gained: i64,
    pub leveled_up: bool,
}

/// Aggregate result of a batch interaction.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total_pets: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_experience_gained: i64,
    pub total_points_gained: i64,
    pub level_ups: usize,
    pub entries: Vec<BatchEntry>,
}

/// Apply one action's deltas to the pet, returning the recorded changes,
/// rewards, and the user-facing message. Counters and per-action timestamps
/// are bumped here; experience, level-ups, and status are the caller's job.
fn apply_action(
    pet: &mut PetRecord,
    kind: InteractionKind,
    now: DateTime<Utc>,
) -> Result<(AttributeChanges, i64, i64, String), PetKeepError> {
    let mut changes = AttributeChanges::default();
    let experience;
    let points;
    let message;

    match kind {
        InteractionKind::Feed => {
            let hunger_gain = (100 - pet.hunger).min(30);
            pet.hunger = (pet.hunger + hunger_gain).min(100);
            pet.health = (pet.health + 5).min(100);
            pet.total_feedings += 1;
            pet.last_feed_time = Some(now);
            changes.hunger = hunger_gain;
            changes.health = 5;
            experience = 10;
            points = 5;
            message = "Your pet ate happily!".to_string();
        }
        InteractionKind::Play => {
            let happiness_gain = (100 - pet.happiness).min(25);
            pet.happiness = (pet.happiness + happiness_gain).min(100);
            pet.energy = (pet.energy - 10).max(0);
            pet.hunger = (pet.hunger - 5).max(0);
            pet.total_playings += 1;
            pet.last_play_time = Some(now);
            changes.happiness = happiness_gain;
            changes.energy = -10;
            changes.hunger = -5;
            experience = 15;
            points = 8;
            message = "Your pet had a great time playing!".to_string();
        }
        InteractionKind::Care => {
            let health_gain = (100 - pet.health).min(20);
            let energy_gain = (100 - pet.energy).min(15);
            pet.health = (pet.health + health_gain).min(100);
            pet.energy = (pet.energy + energy_gain).min(100);
            pet.happiness = (pet.happiness + 10).min(100);
            pet.total_carings += 1;
            pet.last_care_time = Some(now);
            changes.health = health_gain;
            changes.energy = energy_gain;
            changes.happiness = 10;
            experience = 12;
            points = 6;
            message = "Your pet felt your affection!".to_string();
        }
        InteractionKind::Clean => {
            pet.health = (pet.health + 10).min(100);
            pet.happiness = (pet.happiness + 15).min(100);
            changes.health = 10;
            changes.happiness = 15;
            experience = 8;
            points = 4;
            message = "Your pet is clean and tidy!".to_string();
        }
        InteractionKind::Medicine => {
            if pet.health < 70 {
                let health_gain = (100 - pet.health).min(40);
                pet.health = (pet.health + health_gain).min(100);
                changes.health = health_gain;
                experience = 5;
                points = 3;
                message = "Your pet's health has improved!".to_string();
            } else {
                // Healthy enough: a successful interaction with no effect.
                experience = 0;
                points = 0;
                message = "Your pet does not need medicine right now.".to_string();
            }
        }
        other => {
            return Err(PetKeepError::InvalidInteraction(
                other.as_str().to_string(),
            ));
        }
    }

    Ok((changes, experience, points, message))
}

/// Resolve one interaction end to end: ownership check, decay, deltas,
/// level-up (with its +20 point bonus), persistence, log entry, and the
/// point credit to the owner's balance.
pub fn interact(
    store: &PetKeepStore,
    user_id: &str,
    pet_id: &str,
    request: &InteractionRequest,
) -> Result<InteractionReport, PetKeepError> {
    let intensity = request.intensity.unwrap_or(DEFAULT_INTENSITY);
    if !(1..=10).contains(&intensity) {
        return Err(PetKeepError::Validation(format!(
            "intensity must be 1-10, got {intensity}"
        )));
    }

    let now = Utc::now();
    let mut pet = store.get_pet_raw(pet_id)?;
    if pet.owner_id != user_id {
        return Err(PetKeepError::PermissionDenied(format!(
            "pet {pet_id} belongs to another user"
        )));
    }

    pet.apply_decay(now);
    let before = PetStateSnapshot::of(&pet);

    let (changes, experience_gained, mut points_gained, message) =
        apply_action(&mut pet, request.kind, now)?;

    pet.experience += experience_gained;
    let levels_gained = pet.level_up();
    let leveled_up = levels_gained > 0;
    if leveled_up {
        points_gained += 20;
    }
    pet.update_status();
    pet.last_interaction_time = Some(now);

    let after = PetStateSnapshot::of(&pet);
    store.put_pet(pet.clone())?;

    let record = InteractionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        pet_id: pet_id.to_string(),
        kind: request.kind,
        result: InteractionResult::Success,
        item: request.item.clone(),
        intensity,
        experience_gained,
        points_gained,
        duration_secs: request.duration_secs,
        attribute_changes: changes,
        pet_state_before: before,
        pet_state_after: after,
        level_up_occurred: leveled_up,
        new_level: leveled_up.then_some(pet.level),
        notes: request.notes.clone(),
        created_at: now,
        schema_version: INTERACTION_SCHEMA_VERSION,
    };
    store.append_interaction(record.clone())?;

    if points_gained > 0 {
        balance::add_points(store, user_id, points_gained)?;
    }

    info!(
        "user {} performed {} on pet {} (+{} exp, +{} pts)",
        user_id,
        request.kind.as_str(),
        pet_id,
        experience_gained,
        points_gained
    );

    Ok(InteractionReport {
        record,
        pet,
        message,
        experience_gained,
        points_gained,
        leveled_up,
        new_level: leveled_up.then_some(after.level),
    })
}

/// Run the same interaction across several pets sequentially. One pet
/// failing does not abort the batch; failures are collected per entry.
pub fn batch_interact(
    store: &PetKeepStore,
    user_id: &str,
    pet_ids: &[String],
    request: &InteractionRequest,
) -> Result<BatchReport, PetKeepError> {
    let mut report = BatchReport {
        total_pets: pet_ids.len(),
        ..BatchReport::default()
    };

    for pet_id in pet_ids {
        match interact(store, user_id, pet_id, request) {
            Ok(outcome) => {
                report.successful += 1;
                report.total_experience_gained += outcome.experience_gained;
                report.total_points_gained += outcome.points_gained;
                if outcome.leveled_up {
                    report.level_ups += 1;
                }
                report.entries.push(BatchEntry {
                    pet_id: pet_id.clone(),
                    success: true,
                    error: None,
                    experience_gained: outcome.experience_gained,
                    points_gained: outcome.points_gained,
                    leveled_up: outcome.leveled_up,
                });
            }
            Err(err) => {
                report.failed += 1;
                report.entries.push(BatchEntry {
                    pet_id: pet_id.clone(),
                    success: false,
                    error: Some(err.to_string()),
                    experience_gained: 0,
                    points_gained: 0,
                    leveled_up: false,
                });
            }
        }
    }

    Ok(report)
}

/// Recent interaction summary for one pet.
#[derive(Debug, Clone)]
pub struct PetInteractionSummary {
    pub pet_id: String,
    pub total_interactions: usize,
    pub favorite_kind: Option<InteractionKind>,
    pub total_level_ups: usize,
    pub recent: Vec<InteractionRecord>,
}

/// Summarize a pet's interaction history (most recent `recent_limit`
/// entries included verbatim).
pub fn pet_interaction_summary(
    store: &PetKeepStore,
    user_id: &str,
    pet_id: &str,
    recent_limit: usize,
) -> Result<PetInteractionSummary, PetKeepError> {
    pet::get_pet(store, user_id, pet_id)?;
    let all = store.list_interactions_for_pet(pet_id, 0)?;

    let mut counts: std::collections::HashMap<InteractionKind, usize> =
        std::collections::HashMap::new();
    for record in &all {
        *counts.entry(record.kind).or_insert(0) += 1;
    }
    let favorite_kind = counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(kind, _)| kind);
    let total_level_ups = all.iter().filter(|r| r.level_up_occurred).count();

    let mut recent = all.clone();
    recent.truncate(recent_limit);

    Ok(PetInteractionSummary {
        pet_id: pet_id.to_string(),
        total_interactions: all.len(),
        favorite_kind,
        total_level_ups,
        recent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::NewPet;
    use crate::storage::PetKeepStoreBuilder;
    use crate::types::{PetSpecies, UserRecord};
    use tempfile::tempdir;

    fn setup() -> (PetKeepStore, String, String) {
        let dir = tempdir().unwrap();
        let store = PetKeepStoreBuilder::new(dir.path()).open().unwrap();
        let user = UserRecord::new("tester");
        let user_id = user.id.clone();
        store.put_user(user).unwrap();
        let pet = crate::pet::create_pet(
            &store,
            &user_id,
            NewPet {
                name: "Mochi".to_string(),
                species: Some(PetSpecies::Cat),
                ..NewPet::default()
            },
        )
        .unwrap();
        (store, user_id, pet.id)
    }

    fn set_attrs(store: &PetKeepStore, pet_id: &str, h: i32, hap: i32, e: i32, hun: i32) {
        let mut pet = store.get_pet_raw(pet_id).unwrap();
        pet.health = h;
        pet.happiness = hap;
        pet.energy = e;
        pet.hunger = hun;
        store.put_pet(pet).unwrap();
    }

    #[test]
    fn feed_tops_up_hunger_and_credits_points() {
        let (store, user_id, pet_id) = setup();
        set_attrs(&store, &pet_id, 80, 80, 80, 60);

        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Feed),
        )
        .unwrap();

        assert_eq!(outcome.pet.hunger, 90);
        assert_eq!(outcome.pet.health, 85);
        assert_eq!(outcome.record.attribute_changes.hunger, 30);
        assert_eq!(outcome.experience_gained, 10);
        assert_eq!(outcome.points_gained, 5);
        assert_eq!(outcome.pet.total_feedings, 1);
        assert!(outcome.pet.last_feed_time.is_some());

        // Owner balance credited through the balance service.
        assert_eq!(store.get_user(&user_id).unwrap().points, 105);
    }

    #[test]
    fn feed_near_full_clamps_the_gain() {
        let (store, user_id, pet_id) = setup();
        set_attrs(&store, &pet_id, 80, 80, 80, 90);
        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Feed),
        )
        .unwrap();
        assert_eq!(outcome.record.attribute_changes.hunger, 10);
        assert_eq!(outcome.pet.hunger, 100);
    }

    #[test]
    fn play_boosts_happiness_and_drains_energy() {
        let (store, user_id, pet_id) = setup();
        set_attrs(&store, &pet_id, 80, 60, 80, 70);
        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Play),
        )
        .unwrap();
        assert_eq!(outcome.pet.happiness, 85);
        assert_eq!(outcome.pet.energy, 70);
        assert_eq!(outcome.pet.hunger, 65);
        assert_eq!(outcome.experience_gained, 15);
        assert_eq!(outcome.points_gained, 8);
        assert_eq!(outcome.pet.total_playings, 1);
    }

    #[test]
    fn care_restores_health_and_energy() {
        let (store, user_id, pet_id) = setup();
        set_attrs(&store, &pet_id, 50, 50, 50, 70);
        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Care),
        )
        .unwrap();
        assert_eq!(outcome.pet.health, 70);
        assert_eq!(outcome.pet.energy, 65);
        assert_eq!(outcome.pet.happiness, 60);
        assert_eq!(outcome.record.attribute_changes.health, 20);
        assert_eq!(outcome.record.attribute_changes.energy, 15);
    }

    #[test]
    fn medicine_only_helps_a_sick_pet() {
        let (store, user_id, pet_id) = setup();
        set_attrs(&store, &pet_id, 40, 80, 80, 80);
        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Medicine),
        )
        .unwrap();
        assert_eq!(outcome.pet.health, 80);
        assert_eq!(outcome.experience_gained, 5);
        assert_eq!(outcome.points_gained, 3);
    }

    #[test]
    fn medicine_on_a_healthy_pet_is_a_successful_noop() {
        let (store, user_id, pet_id) = setup();
        set_attrs(&store, &pet_id, 85, 80, 80, 80);
        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Medicine),
        )
        .unwrap();
        assert_eq!(outcome.pet.health, 85);
        assert_eq!(outcome.experience_gained, 0);
        assert_eq!(outcome.points_gained, 0);
        assert_eq!(outcome.record.result, InteractionResult::Success);
        // No points means no balance movement.
        assert_eq!(store.get_user(&user_id).unwrap().points, 100);
    }

    #[test]
    fn unhandled_kinds_are_rejected() {
        let (store, user_id, pet_id) = setup();
        let err = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Photo),
        )
        .unwrap_err();
        assert!(matches!(err, PetKeepError::InvalidInteraction(_)));
        // Nothing was recorded for the failed action.
        assert!(store.list_interactions_for_pet(&pet_id, 0).unwrap().is_empty());
    }

    #[test]
    fn level_up_awards_bonus_points() {
        let (store, user_id, pet_id) = setup();
        let mut pet = store.get_pet_raw(&pet_id).unwrap();
        pet.experience = 95;
        store.put_pet(pet).unwrap();

        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Feed),
        )
        .unwrap();
        // 95 + 10 = 105 >= 100: level up, +20 bonus on top of feed's 5.
        assert!(outcome.leveled_up);
        assert_eq!(outcome.new_level, Some(2));
        assert_eq!(outcome.points_gained, 25);
        assert_eq!(outcome.pet.experience, 5);
        assert_eq!(store.get_user(&user_id).unwrap().points, 125);
    }

    #[test]
    fn snapshots_bracket_the_change() {
        let (store, user_id, pet_id) = setup();
        set_attrs(&store, &pet_id, 80, 60, 80, 70);
        let outcome = interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Play),
        )
        .unwrap();
        let before = outcome.record.pet_state_before;
        let after = outcome.record.pet_state_after;
        let c = outcome.record.attribute_changes;
        assert_eq!(after.happiness, (before.happiness + c.happiness).min(100));
        assert_eq!(after.energy, (before.energy + c.energy).clamp(0, 100));
        assert_eq!(after.hunger, (before.hunger + c.hunger).clamp(0, 100));
    }

    #[test]
    fn intensity_out_of_range_is_rejected() {
        let (store, user_id, pet_id) = setup();
        let mut request = InteractionRequest::new(InteractionKind::Feed);
        request.intensity = Some(11);
        let err = interact(&store, &user_id, &pet_id, &request).unwrap_err();
        assert!(matches!(err, PetKeepError::Validation(_)));
    }

    #[test]
    fn batch_isolates_per_pet_failures() {
        let (store, user_id, pet_id) = setup();
        let ids = vec![pet_id.clone(), "missing-pet".to_string()];
        let report = batch_interact(
            &store,
            &user_id,
            &ids,
            &InteractionRequest::new(InteractionKind::Feed),
        )
        .unwrap();
        assert_eq!(report.total_pets, 2);
        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);
        assert!(report.entries[0].success);
        assert!(!report.entries[1].success);
        assert!(report.entries[1].error.is_some());
    }

    #[test]
    fn summary_tracks_favorite_kind() {
        let (store, user_id, pet_id) = setup();
        for _ in 0..2 {
            interact(
                &store,
                &user_id,
                &pet_id,
                &InteractionRequest::new(InteractionKind::Feed),
            )
            .unwrap();
        }
        interact(
            &store,
            &user_id,
            &pet_id,
            &InteractionRequest::new(InteractionKind::Play),
        )
        .unwrap();

        let summary = pet_interaction_summary(&store, &user_id, &pet_id, 2).unwrap();
        assert_eq!(summary.total_interactions, 3);
        assert_eq!(summary.favorite_kind, Some(InteractionKind::Feed));
        assert_eq!(summary.recent.len(), 2);
    }
}
