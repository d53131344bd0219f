//! Allocation failures.

use thiserror::Error;

use crate::entity_class::EntityClass;

/// SQLSTATE codes that mean "another transaction got there first, try again".
const RETRYABLE_SQLSTATES: [&str; 3] = [
    "55P03", // lock_not_available (lock_timeout expired)
    "40001", // serialization_failure
    "40P01", // deadlock_detected
];

/// SQLSTATE for numeric_value_out_of_range, raised when a BIGINT counter overflows.
const OUT_OF_RANGE_SQLSTATE: &str = "22003";

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

pub(crate) fn is_out_of_range(err: &sqlx::Error) -> bool {
    sqlstate(err).as_deref() == Some(OUT_OF_RANGE_SQLSTATE)
}

#[derive(Debug, Error)]
pub enum AllocationError {
    /// Caller passed a class tag other than `teacher` or `student`.
    #[error("unrecognized entity class '{0}', expected 'teacher' or 'student'")]
    InvalidEntityClass(String),

    /// Caller passed a year that is not a positive 4-digit integer.
    #[error("invalid allocation year {0}, expected a 4-digit year")]
    InvalidYear(i64),

    /// An identifier already in the ledger could not be parsed back into a
    /// sequence number. Never resolved by falling back to 1000.
    #[error("corrupt ledger entry '{identifier}': {reason}")]
    CorruptLedgerEntry { identifier: String, reason: String },

    /// The counter was contended. Stores report `attempts: 1` and the
    /// allocator overwrites it with the total once retries are exhausted.
    #[error("identifier allocation conflicted after {attempts} attempt(s): {reason}")]
    AllocationConflict { attempts: u32, reason: String },

    /// The identifier was already taken when the caller tried to record it
    /// (scan-based ledgers only). The whole allocate-and-insert must restart.
    #[error("identifier {0} has already been issued")]
    DuplicateIdentifier(String),

    #[error("sequence for {class} in {year} is exhausted")]
    SequenceExhausted { class: EntityClass, year: u16 },

    #[error("allocation store error: {0}")]
    Store(#[source] sqlx::Error),
}

impl AllocationError {
    /// True when repeating the same store operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AllocationError::AllocationConflict { .. })
    }

    /// True when the failure came from the caller's input rather than the ledger.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AllocationError::InvalidEntityClass(_) | AllocationError::InvalidYear(_)
        )
    }
}

impl From<sqlx::Error> for AllocationError {
    fn from(err: sqlx::Error) -> Self {
        match sqlstate(&err) {
            Some(code) if RETRYABLE_SQLSTATES.contains(&code.as_str()) => {
                AllocationError::AllocationConflict {
                    attempts: 1,
                    reason: err.to_string(),
                }
            }
            _ => AllocationError::Store(err),
        }
    }
}
