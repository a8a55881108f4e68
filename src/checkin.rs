//! Daily check-in streak engine: consecutive-day tracking, tiered rewards
//! with streak multipliers, bonus days, paid make-up check-ins, and
//! exact-match milestone achievements.

use chrono::{Datelike, Duration, NaiveDate};
use log::info;

use crate::balance;
use crate::errors::PetKeepError;
use crate::storage::PetKeepStore;
use crate::types::{CheckInKind, CheckInRecord, CheckInRewards};

/// Base reward before streak tiers and multipliers.
const BASE_POINTS: i64 = 10;
const BASE_EXPERIENCE: i64 = 5;

/// Streak-tier reward items, lowest tier first.
const TIER_7_ITEM: &str = "初级宠物食物";
const TIER_14_ITEM: &str = "中级宠物食物";
const TIER_30_ITEM: &str = "高级宠物食物";
/// Badge granted with every check-in at streak >= 7.
const WEEK_STREAK_BADGE: &str = "一周签到达人";

/// Points charged per day of distance for a make-up check-in.
const MAKE_UP_COST_PER_DAY: i64 = 10;
/// How far back a missed day can still be made up.
const MAKE_UP_WINDOW_DAYS: i64 = 7;

/// Streak milestones that fire an achievement tag, by exact match only.
const STREAK_MILESTONES: [(u32, &str); 3] = [
    (7, "连续签到一周"),
    (30, "连续签到一月"),
    (100, "连续签到百日"),
];
/// Lifetime check-in count milestones, also exact match.
const TOTAL_MILESTONES: [(u32, &str); 4] = [
    (10, "签到新手"),
    (50, "签到达人"),
    (100, "签到专家"),
    (365, "签到大师"),
];

/// Result of a check-in attempt. `accepted == false` means the day was
/// already checked in (a refusal, not an error) and `record` holds the
/// existing row.
#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub accepted: bool,
    pub message: String,
    pub record: CheckInRecord,
    pub points_awarded: i64,
    pub experience_awarded: i64,
    pub is_bonus_day: bool,
    pub new_streak_record: bool,
    pub next_bonus_in_days: u32,
    pub achievements: Vec<String>,
}

/// Result of a successful make-up check-in.
#[derive(Debug, Clone)]
pub struct MakeUpOutcome {
    pub record: CheckInRecord,
    pub cost_points: i64,
    pub points_awarded: i64,
    pub experience_awarded: i64,
}

/// A user's check-in statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckInStats {
    pub total_check_ins: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_points_earned: i64,
    pub total_experience_earned: i64,
    pub this_month_check_ins: usize,
    pub bonus_days: usize,
}

/// What checking in today would yield.
#[derive(Debug, Clone)]
pub struct CheckInStatusReport {
    pub can_check_in: bool,
    pub has_checked_in_today: bool,
    pub today: Option<CheckInRecord>,
    pub current_streak: u32,
    pub estimated_points: i64,
    pub estimated_experience: i64,
    pub estimated_multiplier: f64,
    pub next_bonus_in_days: u32,
}

/// Tiered base reward for a streak length. Tiers supersede each other:
/// only the highest matching tier's bonus applies.
pub fn reward_table(consecutive_days: u32) -> CheckInRewards {
    let mut points = BASE_POINTS;
    let mut experience = BASE_EXPERIENCE;
    let mut items = Vec::new();
    let mut badges = Vec::new();

    if consecutive_days >= 30 {
        points += 20;
        experience += 10;
        items.push(TIER_30_ITEM.to_string());
    } else if consecutive_days >= 14 {
        points += 15;
        experience += 8;
        items.push(TIER_14_ITEM.to_string());
    } else if consecutive_days >= 7 {
        points += 10;
        experience += 5;
        items.push(TIER_7_ITEM.to_string());
        badges.push(WEEK_STREAK_BADGE.to_string());
    }

    CheckInRewards {
        points,
        experience,
        items,
        badges,
    }
}

/// Streak multiplier applied to the base reward.
pub fn multiplier(consecutive_days: u32) -> f64 {
    if consecutive_days >= 30 {
        3.0
    } else if consecutive_days >= 14 {
        2.5
    } else if consecutive_days >= 7 {
        2.0
    } else if consecutive_days >= 3 {
        1.5
    } else {
        1.0
    }
}

pub fn is_bonus_day(consecutive_days: u32) -> bool {
    consecutive_days > 0 && consecutive_days % 7 == 0
}

/// Streak length a check-in on `date` would have: the day itself plus every
/// existing prior day, walking backward one point lookup at a time until the
/// first gap.
pub fn consecutive_days(
    store: &PetKeepStore,
    user_id: &str,
    date: NaiveDate,
) -> Result<u32, PetKeepError> {
    let mut streak = 1u32;
    let mut cursor = date - Duration::days(1);
    while store.get_check_in(user_id, cursor)?.is_some() {
        streak += 1;
        cursor -= Duration::days(1);
    }
    Ok(streak)
}

/// Milestone achievement tags for this check-in. Equality, not
/// threshold-or-above, so each fires exactly once per natural progression.
fn achievements_for(consecutive: u32, total_check_ins: u32) -> Vec<String> {
    let mut tags = Vec::new();
    for (milestone, tag) in STREAK_MILESTONES {
        if consecutive == milestone {
            tags.push(tag.to_string());
        }
    }
    for (milestone, tag) in TOTAL_MILESTONES {
        if total_check_ins == milestone {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn next_bonus_in_days(consecutive_days: u32) -> u32 {
    let remaining = 7 - (consecutive_days % 7);
    if remaining == 7 {
        0
    } else {
        remaining
    }
}

fn round_scaled(base: i64, factor: f64) -> i64 {
    (base as f64 * factor).round() as i64
}

/// Perform today's check-in. Checking in twice the same day is refused (not
/// an error): the outcome carries the existing record and zero awards.
pub fn check_in(
    store: &PetKeepStore,
    user_id: &str,
    today: NaiveDate,
    notes: Option<&str>,
) -> Result<CheckInOutcome, PetKeepError> {
    store.get_user(user_id)?;

    if let Some(existing) = store.get_check_in(user_id, today)? {
        return Ok(CheckInOutcome {
            accepted: false,
            message: "Already checked in today.".to_string(),
            next_bonus_in_days: next_bonus_in_days(existing.consecutive_days),
            is_bonus_day: existing.is_bonus_day,
            record: existing,
            points_awarded: 0,
            experience_awarded: 0,
            new_streak_record: false,
            achievements: Vec::new(),
        });
    }

    let streak = consecutive_days(store, user_id, today)?;
    let base = reward_table(streak);
    let bonus_day = is_bonus_day(streak);
    let factor = multiplier(streak);
    let final_points = round_scaled(base.points, factor);
    let final_experience = round_scaled(base.experience, factor);

    let longest_before = longest_streak(&store.list_check_ins(user_id)?);

    let record = CheckInRecord::new(
        user_id,
        today,
        CheckInKind::Daily,
        streak,
        bonus_day,
        factor,
        CheckInRewards {
            points: final_points,
            experience: final_experience,
            items: base.items,
            badges: base.badges,
        },
        notes.map(str::to_string),
    );
    store.put_check_in(record.clone())?;

    balance::add_points(store, user_id, final_points)?;
    balance::add_experience(store, user_id, final_experience)?;

    // Keep the account-level streak counters in step with the row history.
    let mut user = store.get_user(user_id)?;
    user.consecutive_checkins = streak;
    user.total_checkins += 1;
    let total_check_ins = user.total_checkins;
    store.put_user(user)?;

    let achievements = achievements_for(streak, total_check_ins);

    info!(
        "user {} checked in: streak {}, +{} pts, +{} exp",
        user_id, streak, final_points, final_experience
    );

    Ok(CheckInOutcome {
        accepted: true,
        message: if bonus_day {
            format!("Checked in {streak} days in a row: bonus day!")
        } else {
            "Check-in complete!".to_string()
        },
        record,
        points_awarded: final_points,
        experience_awarded: final_experience,
        is_bonus_day: bonus_day,
        new_streak_record: streak > longest_before,
        next_bonus_in_days: next_bonus_in_days(streak),
        achievements,
    })
}

/// Retroactively check in a missed day. The target must be strictly in the
/// past, at most seven days back, and not already checked. The fee is
/// `days_diff * 10` points; the reward is the standard one at the target
/// date's streak, halved (multiplier forced to 0.5, never a bonus day).
pub fn make_up_check_in(
    store: &PetKeepStore,
    user_id: &str,
    target: NaiveDate,
    today: NaiveDate,
    reason: Option<&str>,
) -> Result<MakeUpOutcome, PetKeepError> {
    let user = store.get_user(user_id)?;

    if target >= today {
        return Err(PetKeepError::DateInFuture(target));
    }
    let days_diff = (today - target).num_days();
    if days_diff > MAKE_UP_WINDOW_DAYS {
        return Err(PetKeepError::DateTooOld(target));
    }
    if store.get_check_in(user_id, target)?.is_some() {
        return Err(PetKeepError::AlreadyCheckedIn(target));
    }

    let cost = days_diff * MAKE_UP_COST_PER_DAY;
    if user.points < cost {
        return Err(PetKeepError::InsufficientPoints {
            have: user.points,
            need: cost,
        });
    }
    balance::deduct_points(store, user_id, cost)?;

    let streak = consecutive_days(store, user_id, target)?;
    let base = reward_table(streak);
    let final_points = round_scaled(base.points, 0.5);
    let final_experience = round_scaled(base.experience, 0.5);

    let notes = format!("make-up: {}", reason.unwrap_or("user request"));
    let record = CheckInRecord::new(
        user_id,
        target,
        CheckInKind::MakeUp,
        streak,
        false,
        0.5,
        CheckInRewards {
            points: final_points,
            experience: final_experience,
            items: base.items,
            badges: base.badges,
        },
        Some(notes),
    );
    store.put_check_in(record.clone())?;

    balance::add_points(store, user_id, final_points)?;
    balance::add_experience(store, user_id, final_experience)?;

    let mut user = store.get_user(user_id)?;
    user.total_checkins += 1;
    store.put_user(user)?;

    info!(
        "user {} made up {} for {} pts, earned {} pts back",
        user_id, target, cost, final_points
    );

    Ok(MakeUpOutcome {
        record,
        cost_points: cost,
        points_awarded: final_points,
        experience_awarded: final_experience,
    })
}

/// Longest run of consecutive dates in an ascending record list.
fn longest_streak(records: &[CheckInRecord]) -> u32 {
    if records.is_empty() {
        return 0;
    }
    let mut longest = 1u32;
    let mut current = 1u32;
    for pair in records.windows(2) {
        let gap = (pair[1].check_in_date - pair[0].check_in_date).num_days();
        if gap == 1 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }
    longest
}

/// The streak currently standing as of `today`: counts back from today if
/// checked, otherwise from yesterday.
fn standing_streak(
    store: &PetKeepStore,
    user_id: &str,
    today: NaiveDate,
) -> Result<u32, PetKeepError> {
    let mut streak = 0u32;
    if store.get_check_in(user_id, today)?.is_some() {
        streak += 1;
    }
    let mut cursor = today - Duration::days(1);
    while store.get_check_in(user_id, cursor)?.is_some() {
        streak += 1;
        cursor -= Duration::days(1);
    }
    Ok(streak)
}

/// Aggregate a user's check-in history.
pub fn user_checkin_stats(
    store: &PetKeepStore,
    user_id: &str,
    today: NaiveDate,
) -> Result<CheckInStats, PetKeepError> {
    store.get_user(user_id)?;
    let records = store.list_check_ins(user_id)?;

    let month_start = today.with_day(1).unwrap_or(today);
    Ok(CheckInStats {
        total_check_ins: records.len(),
        current_streak: standing_streak(store, user_id, today)?,
        longest_streak: longest_streak(&records),
        total_points_earned: records.iter().map(|r| r.points_earned).sum(),
        total_experience_earned: records.iter().map(|r| r.experience_earned).sum(),
        this_month_check_ins: records
            .iter()
            .filter(|r| r.check_in_date >= month_start)
            .count(),
        bonus_days: records.iter().filter(|r| r.is_bonus_day).count(),
    })
}

/// Preview of today's check-in state and the reward the next check-in
/// would carry.
pub fn check_in_status(
    store: &PetKeepStore,
    user_id: &str,
    today: NaiveDate,
) -> Result<CheckInStatusReport, PetKeepError> {
    store.get_user(user_id)?;
    let today_record = store.get_check_in(user_id, today)?;
    let has_checked_in_today = today_record.is_some();
    let current = standing_streak(store, user_id, today)?;

    let next_streak = if has_checked_in_today {
        current
    } else {
        current + 1
    };
    let base = reward_table(next_streak);
    let factor = multiplier(next_streak);

    Ok(CheckInStatusReport {
        can_check_in: !has_checked_in_today,
        has_checked_in_today,
        today: today_record,
        current_streak: current,
        estimated_points: round_scaled(base.points, factor),
        estimated_experience: round_scaled(base.experience, factor),
        estimated_multiplier: factor,
        next_bonus_in_days: next_bonus_in_days(next_streak),
    })
}
