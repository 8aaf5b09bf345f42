use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// An account with this email already exists.
    #[error("Email is already registered")]
    EmailTaken,

    /// The teacher already has a slot with the same day and bounds.
    #[error("Time slot already exists")]
    DuplicateSlot,

    /// No available slot covers the requested booking window.
    #[error("Teacher is not available at the selected time")]
    SlotUnavailable,

    /// An active booking already overlaps the requested window.
    #[error("Time slot is already booked")]
    SlotTaken,

    /// The booking already carries a rating, or is no longer reviewable.
    #[error("Booking already reviewed")]
    AlreadyReviewed,

    /// The booking's status changed between read and write.
    #[error("Booking status changed concurrently")]
    StaleStatus,

    /// JSON column (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Map "no rows" to [`StoreError::NotFound`], everything else to `Sqlite`.
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// Whether `e` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
