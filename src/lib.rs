//! # Petkeep - Virtual Pet Care and Rewards Engine
//!
//! Petkeep is the rules core of a virtual-pet gamification backend: pets
//! with time-decaying attributes, reward-bearing interactions, daily
//! check-in streaks, and a points-denominated shop with purchase limits and
//! refunds. It is designed to sit behind any host API layer: every
//! operation is a plain function over an embedded store.
//!
//! ## Features
//!
//! - **Pet Attribute Model**: health/happiness/energy/hunger on a 0-100
//!   scale, derived status, lazy hour-by-hour decay computed on read (no
//!   background timers), and multi-level level-up resolution.
//! - **Interaction Resolver**: feed/play/care/clean/medicine with a fixed
//!   delta table, append-only interaction log with before/after snapshots,
//!   and level-up point bonuses.
//! - **Check-in Streaks**: consecutive-day tracking, tiered rewards with
//!   streak multipliers, bonus days, paid make-up check-ins, and milestone
//!   achievements.
//! - **Points Shop**: discount pricing with validity windows,
//!   level/stock/availability gates, calendar-aligned purchase limits, and
//!   a 24-hour refund window.
//! - **Embedded Persistence**: sled-backed record store with
//!   schema-versioned bincode serialization.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use petkeep::checkin;
//! use petkeep::storage::PetKeepStore;
//! use petkeep::types::UserRecord;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = PetKeepStore::open("data")?;
//!     let user = UserRecord::new("alice");
//!     let user_id = user.id.clone();
//!     store.put_user(user)?;
//!
//!     let today = chrono::Utc::now().date_naive();
//!     let outcome = checkin::check_in(&store, &user_id, today, None)?;
//!     println!("earned {} points", outcome.points_awarded);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`pet`] - attribute model, decay, level progression, pet lifecycle
//! - [`interaction`] - interaction resolver and batch interactions
//! - [`checkin`] - daily check-in streak engine
//! - [`shop`] - purchase engine, refunds, catalog browsing
//! - [`balance`] - the single owner of user point/experience balances
//! - [`storage`] - sled-backed persistence for all records
//! - [`types`] - record structs and enums shared across the engine
//! - [`state`] - starter catalog seeding
//! - [`config`] - TOML configuration for the CLI host
//! - [`errors`] - the crate-wide error taxonomy

pub mod balance;
pub mod checkin;
pub mod config;
pub mod errors;
pub mod interaction;
pub mod pet;
pub mod shop;
pub mod state;
pub mod storage;
pub mod types;

pub use errors::PetKeepError;
pub use storage::{PetKeepStore, PetKeepStoreBuilder};
