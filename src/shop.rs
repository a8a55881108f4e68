//! Shop purchase engine: discount pricing, purchasability gates, per-user
//! limit windows, the pending -> completed purchase sequence, refunds, and
//! cancellation.
//!
//! Every domain check runs before the first write, so the
//! debit -> stock -> complete tail can only fail on storage errors, which
//! mark the purchase `failed` with the causing reason instead of losing it.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use log::{error, info};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::balance;
use crate::errors::PetKeepError;
use crate::storage::PetKeepStore;
use crate::types::{
    DiscountKind, ItemSnapshot, ItemStatus, LimitWindow, PaymentDetails, PurchaseRecord,
    PurchaseStatus, ShopItemRecord, PURCHASE_SCHEMA_VERSION,
};

/// How long after completion a purchase stays refundable.
const REFUND_WINDOW_HOURS: i64 = 24;

impl ShopItemRecord {
    /// Whether the discount exists and `now` falls inside its validity
    /// window (open-ended bounds are unbounded).
    pub fn is_discount_valid(&self, now: DateTime<Utc>) -> bool {
        let Some(discount) = &self.discount else {
            return false;
        };
        if let Some(start) = discount.starts_at {
            if now < start {
                return false;
            }
        }
        if let Some(end) = discount.ends_at {
            if now > end {
                return false;
            }
        }
        true
    }

    /// Effective price at `now`: the list price unless a valid discount
    /// applies. Percentage cuts may be capped; the result never goes
    /// negative.
    pub fn current_price(&self, now: DateTime<Utc>) -> i64 {
        let Some(discount) = &self.discount else {
            return self.price;
        };
        if !self.is_discount_valid(now) {
            return self.price;
        }
        let cut = match discount.kind {
            DiscountKind::Percentage => {
                let amount = (self.price as f64 * discount.value / 100.0).round() as i64;
                match discount.max_discount {
                    Some(cap) => amount.min(cap),
                    None => amount,
                }
            }
            DiscountKind::Fixed => discount.value.round() as i64,
        };
        (self.price - cut).max(0)
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock == -1 || self.stock > 0
    }

    /// Whether `now` is inside the item's availability window.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        if let Some(from) = self.available_from {
            if now < from {
                return false;
            }
        }
        if let Some(to) = self.available_to {
            if now > to {
                return false;
            }
        }
        true
    }

    pub fn can_purchase(&self, user_level: u32, now: DateTime<Utc>) -> bool {
        self.status == ItemStatus::Active
            && self.is_in_stock()
            && user_level >= self.min_level
            && self.is_available(now)
    }
}

impl PurchaseRecord {
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = PurchaseStatus::Completed;
        self.completed_at = Some(now);
    }

    pub fn cancel(&mut self, reason: Option<&str>, now: DateTime<Utc>) {
        self.status = PurchaseStatus::Cancelled;
        self.cancelled_at = Some(now);
        if let Some(reason) = reason {
            self.notes = Some(reason.to_string());
        }
    }

    pub fn refund(&mut self, reason: Option<&str>, now: DateTime<Utc>) {
        self.status = PurchaseStatus::Refunded;
        self.refunded_at = Some(now);
        if let Some(reason) = reason {
            self.notes = Some(reason.to_string());
        }
    }

    pub fn fail(&mut self, reason: &str) {
        self.status = PurchaseStatus::Failed;
        self.failure_reason = Some(reason.to_string());
    }

    /// Refundable while completed and inside the 24-hour window.
    pub fn can_refund(&self, now: DateTime<Utc>) -> bool {
        self.status == PurchaseStatus::Completed
            && self
                .completed_at
                .is_some_and(|at| now - at <= Duration::hours(REFUND_WINDOW_HOURS))
    }

    pub fn can_cancel(&self) -> bool {
        self.status == PurchaseStatus::Pending
    }

    /// Points saved against the undiscounted price.
    pub fn saved_amount(&self) -> i64 {
        (self.payment.original_price - self.total_price).max(0)
    }
}

/// Priced quote for a purchase that passed every gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseQuote {
    pub unit_price: i64,
    pub total_price: i64,
}

/// A user's purchase statistics (completed purchases only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseStats {
    pub total_purchases: usize,
    pub total_spent: i64,
    pub this_month_purchases: usize,
    pub this_month_spent: i64,
    pub today_purchases: usize,
    pub today_spent: i64,
    pub unique_items: usize,
    pub total_saved: i64,
}

fn transaction_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("TXN{}{}", now.timestamp_millis(), suffix.to_uppercase())
}

/// Start of the limit window containing `now`. Daily resets at midnight,
/// weekly on the most recent Sunday, monthly on the 1st; `total` never
/// resets.
fn window_start(window: LimitWindow, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    match window {
        LimitWindow::Daily => today.and_time(NaiveTime::MIN).and_utc(),
        LimitWindow::Weekly => {
            let back = i64::from(today.weekday().num_days_from_sunday());
            (today - Duration::days(back))
                .and_time(NaiveTime::MIN)
                .and_utc()
        }
        LimitWindow::Monthly => today
            .with_day(1)
            .unwrap_or(today)
            .and_time(NaiveTime::MIN)
            .and_utc(),
        LimitWindow::Total => DateTime::UNIX_EPOCH,
    }
}

/// Quantity of `item` the user has completed inside the window so far.
fn purchased_in_window(
    store: &PetKeepStore,
    user_id: &str,
    item_id: &str,
    since: DateTime<Utc>,
) -> Result<i64, PetKeepError> {
    let mut total = 0i64;
    for record in store.list_purchases(user_id)? {
        if record.item_id == item_id
            && record.status == PurchaseStatus::Completed
            && record.created_at >= since
        {
            total += i64::from(record.quantity);
        }
    }
    Ok(total)
}

/// Run every purchase gate and price the request, without mutating
/// anything. Errors are the typed refusals the purchase path uses.
pub fn evaluate_purchase(
    store: &PetKeepStore,
    item: &ShopItemRecord,
    user_id: &str,
    user_level: u32,
    user_points: i64,
    quantity: u32,
    now: DateTime<Utc>,
) -> Result<PurchaseQuote, PetKeepError> {
    if quantity == 0 {
        return Err(PetKeepError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    if !item.can_purchase(user_level, now) {
        return Err(PetKeepError::NotPurchasable(item.id.clone()));
    }
    if item.stock != -1 && item.stock < i64::from(quantity) {
        return Err(PetKeepError::InsufficientStock {
            available: item.stock,
            requested: quantity,
        });
    }
    if let Some(limit) = item.purchase_limit {
        let since = window_start(limit.window, now);
        let purchased = purchased_in_window(store, user_id, &item.id, since)?;
        if purchased + i64::from(quantity) > i64::from(limit.quantity) {
            return Err(PetKeepError::LimitExceeded {
                purchased,
                limit: limit.quantity,
            });
        }
    }

    let unit_price = item.current_price(now);
    let total_price = unit_price * i64::from(quantity);
    if user_points < total_price {
        return Err(PetKeepError::InsufficientPoints {
            have: user_points,
            need: total_price,
        });
    }

    Ok(PurchaseQuote {
        unit_price,
        total_price,
    })
}

/// Execute a purchase: gate checks, then pending record -> point debit ->
/// stock decrement -> sold-count increment -> completed. A storage failure
/// after the pending write marks the purchase failed with the cause.
pub fn purchase(
    store: &PetKeepStore,
    user_id: &str,
    item_id: &str,
    quantity: u32,
    notes: Option<&str>,
) -> Result<PurchaseRecord, PetKeepError> {
    let now = Utc::now();
    let user = store.get_user(user_id)?;
    let mut item = store.get_item(item_id)?;

    let quote = evaluate_purchase(
        store,
        &item,
        user_id,
        user.level,
        user.points,
        quantity,
        now,
    )?;

    let mut record = PurchaseRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        item_id: item_id.to_string(),
        quantity,
        unit_price: quote.unit_price,
        total_price: quote.total_price,
        status: PurchaseStatus::Pending,
        payment: PaymentDetails {
            points_used: quote.total_price,
            original_price: item.price * i64::from(quantity),
            final_price: quote.total_price,
            discount_applied: (item.price - quote.unit_price) * i64::from(quantity),
        },
        item_snapshot: ItemSnapshot::of(&item),
        completed_at: None,
        cancelled_at: None,
        refunded_at: None,
        failure_reason: None,
        notes: notes.map(str::to_string),
        transaction_id: transaction_id(now),
        created_at: now,
        updated_at: now,
        schema_version: PURCHASE_SCHEMA_VERSION,
    };
    store.put_purchase(record.clone())?;

    let mut settle = || -> Result<(), PetKeepError> {
        balance::deduct_points(store, user_id, quote.total_price)?;
        if item.stock != -1 {
            item.stock -= i64::from(quantity);
        }
        item.sold_count += quantity;
        store.put_item(item.clone())?;
        Ok(())
    };

    if let Err(err) = settle() {
        error!("purchase {} failed to settle: {}", record.id, err);
        record.fail(&err.to_string());
        store.put_purchase(record)?;
        return Err(err);
    }

    record.complete(Utc::now());
    store.put_purchase(record.clone())?;

    info!(
        "user {} bought {} x{} for {} points ({})",
        user_id, item_id, quantity, quote.total_price, record.transaction_id
    );

    Ok(record)
}

/// Refund a completed purchase inside the 24-hour window: points come back,
/// finite stock is restored, and the sold count floors at zero.
pub fn request_refund(
    store: &PetKeepStore,
    user_id: &str,
    purchase_id: &str,
    reason: Option<&str>,
) -> Result<PurchaseRecord, PetKeepError> {
    let now = Utc::now();
    let mut record = store.get_purchase(user_id, purchase_id)?;
    if !record.can_refund(now) {
        return Err(PetKeepError::NotRefundable(purchase_id.to_string()));
    }

    balance::add_points(store, user_id, record.total_price)?;

    // Restore stock if the item still exists and tracks a finite count.
    if let Ok(mut item) = store.get_item(&record.item_id) {
        if item.stock != -1 {
            item.stock += i64::from(record.quantity);
            item.sold_count = item.sold_count.saturating_sub(record.quantity);
            store.put_item(item)?;
        }
    }

    record.refund(reason, now);
    store.put_purchase(record.clone())?;

    info!(
        "user {} refunded purchase {} for {} points",
        user_id, purchase_id, record.total_price
    );

    Ok(record)
}

/// Cancel a purchase that is still pending.
pub fn cancel_purchase(
    store: &PetKeepStore,
    user_id: &str,
    purchase_id: &str,
    reason: Option<&str>,
) -> Result<PurchaseRecord, PetKeepError> {
    let mut record = store.get_purchase(user_id, purchase_id)?;
    if !record.can_cancel() {
        return Err(PetKeepError::NotCancellable(purchase_id.to_string()));
    }
    record.cancel(reason, Utc::now());
    store.put_purchase(record.clone())?;
    Ok(record)
}

/// Catalog entries a user of `user_level` can see: active items at or below
/// their level. Listing counts as a view.
pub fn browse_catalog(
    store: &PetKeepStore,
    user_level: u32,
) -> Result<Vec<ShopItemRecord>, PetKeepError> {
    let mut items: Vec<ShopItemRecord> = store
        .list_items()?
        .into_iter()
        .filter(|item| item.status == ItemStatus::Active && item.min_level <= user_level)
        .collect();
    items.sort_by_key(|item| item.sort_order);
    for item in &mut items {
        item.view_count += 1;
        store.put_item(item.clone())?;
    }
    Ok(items)
}

/// Aggregate a user's completed purchases.
pub fn purchase_stats(
    store: &PetKeepStore,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<PurchaseStats, PetKeepError> {
    let completed: Vec<PurchaseRecord> = store
        .list_purchases(user_id)?
        .into_iter()
        .filter(|p| p.status == PurchaseStatus::Completed)
        .collect();

    let month_start = window_start(LimitWindow::Monthly, now);
    let day_start = window_start(LimitWindow::Daily, now);
    let this_month: Vec<&PurchaseRecord> = completed
        .iter()
        .filter(|p| p.created_at >= month_start)
        .collect();
    let today: Vec<&PurchaseRecord> = completed
        .iter()
        .filter(|p| p.created_at >= day_start)
        .collect();
    let unique_items = completed
        .iter()
        .map(|p| p.item_id.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len();

    Ok(PurchaseStats {
        total_purchases: completed.len(),
        total_spent: completed.iter().map(|p| p.total_price).sum(),
        this_month_purchases: this_month.len(),
        this_month_spent: this_month.iter().map(|p| p.total_price).sum(),
        today_purchases: today.len(),
        today_spent: today.iter().map(|p| p.total_price).sum(),
        unique_items,
        total_saved: completed.iter().map(|p| p.saved_amount()).sum(),
    })
}
