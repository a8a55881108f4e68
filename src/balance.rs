//! Single owner of user point and experience balances.
//!
//! Every rule-set (interactions, check-ins, shop) credits or debits through
//! these operations; none of them writes `UserRecord` balance fields
//! directly.

use log::info;

use crate::errors::PetKeepError;
use crate::storage::PetKeepStore;
use crate::types::UserRecord;

/// Credit (or, with a negative delta, debit) a user's points unconditionally.
/// Callers that need an insufficient-balance guard use [`deduct_points`].
pub fn add_points(
    store: &PetKeepStore,
    user_id: &str,
    delta: i64,
) -> Result<UserRecord, PetKeepError> {
    let mut user = store.get_user(user_id)?;
    user.points += delta;
    store.put_user(user.clone())?;
    Ok(user)
}

/// Debit points, rejecting the whole operation when the balance is short.
pub fn deduct_points(
    store: &PetKeepStore,
    user_id: &str,
    amount: i64,
) -> Result<UserRecord, PetKeepError> {
    let mut user = store.get_user(user_id)?;
    if user.points < amount {
        return Err(PetKeepError::InsufficientPoints {
            have: user.points,
            need: amount,
        });
    }
    user.points -= amount;
    store.put_user(user.clone())?;
    Ok(user)
}

/// Credit experience and resolve any account level-ups. The loop handles a
/// single grant that spans several levels.
pub fn add_experience(
    store: &PetKeepStore,
    user_id: &str,
    experience: i64,
) -> Result<UserRecord, PetKeepError> {
    let mut user = store.get_user(user_id)?;
    let old_level = user.level;
    user.experience += experience;
    while user.experience >= user.next_level_experience() {
        user.experience -= user.next_level_experience();
        user.level += 1;
    }
    if user.level > old_level {
        info!(
            "user {} levelled up: {} -> {}",
            user_id, old_level, user.level
        );
    }
    store.put_user(user.clone())?;
    Ok(user)
}
