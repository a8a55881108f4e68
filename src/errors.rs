use thiserror::Error;

/// Errors that can arise from the petkeep rules engine and its storage layer.
#[derive(Debug, Error)]
pub enum PetKeepError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Bad input shape or range, rejected before any state is touched.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Accessing an entity the caller does not own.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Interaction kind the resolver does not handle.
    #[error("invalid interaction: {0}")]
    InvalidInteraction(String),

    /// An owner already holds the maximum number of pets.
    #[error("pet limit reached ({0} pets)")]
    PetLimitReached(usize),

    /// A check-in already exists for the target date.
    #[error("already checked in on {0}")]
    AlreadyCheckedIn(chrono::NaiveDate),

    /// Make-up check-in target is further back than the allowed window.
    #[error("date too old: {0}")]
    DateTooOld(chrono::NaiveDate),

    /// Make-up check-in target is today or in the future.
    #[error("date not in the past: {0}")]
    DateInFuture(chrono::NaiveDate),

    /// The user's point balance cannot cover the operation.
    #[error("insufficient points: have {have}, need {need}")]
    InsufficientPoints { have: i64, need: i64 },

    /// Item fails one of the purchasability gates (status, level, window).
    #[error("item not purchasable: {0}")]
    NotPurchasable(String),

    /// Requested quantity exceeds remaining stock.
    #[error("insufficient stock: {available} left, {requested} requested")]
    InsufficientStock { available: i64, requested: u32 },

    /// Purchase would exceed the item's per-user limit window.
    #[error("purchase limit exceeded: {purchased} already bought, limit {limit}")]
    LimitExceeded { purchased: i64, limit: u32 },

    /// Purchase is not completed or its refund window has closed.
    #[error("purchase not refundable: {0}")]
    NotRefundable(String),

    /// Purchase is not in a cancellable state.
    #[error("purchase not cancellable: {0}")]
    NotCancellable(String),
}
