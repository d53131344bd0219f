//! PostgreSQL-backed ledgers.
//!
//! Both stores borrow the caller's connection so that allocation joins
//! the caller's transaction: the identifier becomes durable exactly when
//! the owning entity row does, and an aborted creation consumes nothing.

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::entity_class::EntityClass;
use crate::error::{AllocationError, is_out_of_range};
use crate::identifier::{Year, next_after_highest};
use crate::store::SequenceStore;

// $3 is the highest sequence already present in the entity table. The
// counter never returns a value at or below it.
const ADVANCE_COUNTER: &str = r#"
    INSERT INTO id_counters (entity_class, year, last_value)
    VALUES ($1, $2, $3 + 1)
    ON CONFLICT (entity_class, year)
    DO UPDATE SET last_value = GREATEST(id_counters.last_value, $3) + 1, updated_at = NOW()
    RETURNING last_value
"#;

// Longest suffix first, then string order: numeric order for a fixed prefix.
const HIGHEST_EMPLOYEE_ID: &str = r#"
    SELECT employee_id FROM teachers
    WHERE employee_id LIKE $1
    ORDER BY LENGTH(employee_id) DESC, employee_id DESC
    LIMIT 1
"#;

const HIGHEST_STUDENT_ID: &str = r#"
    SELECT student_id FROM students
    WHERE student_id LIKE $1
    ORDER BY LENGTH(student_id) DESC, student_id DESC
    LIMIT 1
"#;

async fn highest_issued(
    conn: &mut PgConnection,
    class: EntityClass,
    year: Year,
) -> Result<Option<String>, sqlx::Error> {
    let query = match class {
        EntityClass::Teacher => HIGHEST_EMPLOYEE_ID,
        EntityClass::Student => HIGHEST_STUDENT_ID,
    };

    sqlx::query_scalar::<_, String>(query)
        .bind(format!("{}%", year))
        .fetch_optional(conn)
        .await
}

/// Column holding the issued identifier for `class`.
pub fn identifier_column(class: EntityClass) -> &'static str {
    match class {
        EntityClass::Teacher => "employee_id",
        EntityClass::Student => "student_id",
    }
}

/// Unique constraint that rejects a duplicate identifier for `class`.
pub fn identifier_constraint(class: EntityClass) -> &'static str {
    match class {
        EntityClass::Teacher => "teachers_employee_id_key",
        EntityClass::Student => "students_student_id_key",
    }
}

/// Counter design: one `id_counters` row per (entity class, year),
/// advanced with a single atomic upsert `... RETURNING`.
///
/// The row lock is held until the caller's transaction ends, so concurrent
/// registrations for the same partition queue behind each other instead of
/// computing the same value. Each attempt runs in a savepoint with a
/// `lock_timeout`; a timeout surfaces as a retryable
/// [`AllocationError::AllocationConflict`] and leaves the outer
/// transaction usable.
///
/// Every advance continues after the highest identifier already present
/// in the entity table, not only the one that creates the row. Identifiers
/// written by the scan design or by other writers are skipped over, and a
/// duplicate-identifier replay moves past the taken value.
pub struct PgCounterStore<'c> {
    conn: &'c mut PgConnection,
    lock_timeout: Duration,
}

impl<'c> PgCounterStore<'c> {
    pub fn new(conn: &'c mut PgConnection, lock_timeout: Duration) -> Self {
        Self { conn, lock_timeout }
    }

    async fn advance(&mut self, class: EntityClass, year: Year) -> Result<i64, AllocationError> {
        let exhausted = |e: sqlx::Error| {
            if is_out_of_range(&e) {
                AllocationError::SequenceExhausted {
                    class,
                    year: year.value(),
                }
            } else {
                AllocationError::from(e)
            }
        };

        let mut savepoint = self.conn.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *savepoint)
            .await?;

        let highest = highest_issued(&mut *savepoint, class, year).await?;
        let floor = next_after_highest(highest.as_deref(), year)? - 1;
        let floor = i64::try_from(floor).map_err(|_| AllocationError::SequenceExhausted {
            class,
            year: year.value(),
        })?;
        debug!(entity_class = %class, year = %year, floor, "Advancing id counter");

        let value: i64 = sqlx::query_scalar(ADVANCE_COUNTER)
            .bind(class.as_str())
            .bind(year.value() as i32)
            .bind(floor)
            .fetch_one(&mut *savepoint)
            .await
            .map_err(exhausted)?;

        savepoint.commit().await?;
        Ok(value)
    }
}

#[async_trait]
impl SequenceStore for PgCounterStore<'_> {
    #[instrument(skip(self), fields(store = "pg_counter"))]
    async fn next_sequence(
        &mut self,
        class: EntityClass,
        year: Year,
    ) -> Result<u64, AllocationError> {
        let value = self.advance(class, year).await?;

        u64::try_from(value).map_err(|_| AllocationError::CorruptLedgerEntry {
            identifier: format!("id_counters({}, {})", class, year),
            reason: format!("negative counter value {}", value),
        })
    }
}

/// Scan design: the entity tables are the ledger.
///
/// Performs no writes. Two concurrent callers can derive the same value;
/// the unique constraints on `teachers.employee_id` and
/// `students.student_id` reject the second insert, and the caller must
/// restart the whole allocate-and-insert sequence. Deleting the newest
/// entity of a year makes its identifier available again.
pub struct PgScanLedger<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgScanLedger<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SequenceStore for PgScanLedger<'_> {
    #[instrument(skip(self), fields(store = "pg_scan"))]
    async fn next_sequence(
        &mut self,
        class: EntityClass,
        year: Year,
    ) -> Result<u64, AllocationError> {
        let highest = highest_issued(self.conn, class, year).await?;
        next_after_highest(highest.as_deref(), year)
    }
}
