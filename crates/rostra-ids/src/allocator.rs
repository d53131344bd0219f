use std::time::Duration;
use tracing::{debug, warn};

use crate::entity_class::EntityClass;
use crate::error::AllocationError;
use crate::identifier::{Identifier, Year};
use crate::store::SequenceStore;

/// Turns sequence numbers from a [`SequenceStore`] into identifiers,
/// retrying contended increments a bounded number of times.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(25),
        }
    }
}

impl IdAllocator {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Linear backoff before retry `attempt`, saturating at `Duration::MAX`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Allocates the next identifier for `class` in `year`.
    ///
    /// With a counter store the returned identifier is already reserved.
    /// With a scan-based ledger it is only a candidate: the caller records
    /// it and restarts on [`AllocationError::DuplicateIdentifier`].
    pub async fn allocate<S>(
        &self,
        store: &mut S,
        class: EntityClass,
        year: Year,
    ) -> Result<Identifier, AllocationError>
    where
        S: SequenceStore + ?Sized,
    {
        let mut attempt = 1;
        let sequence = loop {
            match store.next_sequence(class, year).await {
                Ok(sequence) => break sequence,
                Err(AllocationError::AllocationConflict { reason, .. }) => {
                    if attempt >= self.max_attempts {
                        warn!(
                            entity_class = %class,
                            year = %year,
                            attempts = attempt,
                            "Giving up on contended identifier allocation"
                        );
                        return Err(AllocationError::AllocationConflict {
                            attempts: attempt,
                            reason,
                        });
                    }
                    debug!(entity_class = %class, year = %year, attempt, %reason, "Allocation contended, retrying");
                    tokio::time::sleep(self.backoff_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let identifier = Identifier::new(year, sequence).map_err(|e| {
            AllocationError::CorruptLedgerEntry {
                identifier: format!("{}{}", year, sequence),
                reason: e.to_string(),
            }
        })?;

        debug!(entity_class = %class, year = %year, identifier = %identifier, attempt, "Allocated identifier");
        Ok(identifier)
    }

    /// [`allocate`](Self::allocate) for the current UTC year.
    pub async fn allocate_current_year<S>(
        &self,
        store: &mut S,
        class: EntityClass,
    ) -> Result<Identifier, AllocationError>
    where
        S: SequenceStore + ?Sized,
    {
        let year = Year::current()?;
        self.allocate(store, class, year).await
    }

    /// String-tag form used at process boundaries: validates `class` and
    /// `year` before touching the store and returns the textual identifier.
    pub async fn allocate_tagged<S>(
        &self,
        store: &mut S,
        class: &str,
        year: i64,
    ) -> Result<String, AllocationError>
    where
        S: SequenceStore + ?Sized,
    {
        let class: EntityClass = class.parse()?;
        let year = Year::new(year)?;
        let identifier = self.allocate(store, class, year).await?;
        Ok(identifier.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCounterStore;
    use async_trait::async_trait;

    /// Fails with a conflict a fixed number of times before delegating.
    struct FlakyStore {
        conflicts_left: u32,
        calls: u32,
        inner: MemoryCounterStore,
    }

    impl FlakyStore {
        fn new(conflicts: u32) -> Self {
            Self {
                conflicts_left: conflicts,
                calls: 0,
                inner: MemoryCounterStore::new(),
            }
        }
    }

    #[async_trait]
    impl SequenceStore for FlakyStore {
        async fn next_sequence(
            &mut self,
            class: EntityClass,
            year: Year,
        ) -> Result<u64, AllocationError> {
            self.calls += 1;
            if self.conflicts_left > 0 {
                self.conflicts_left -= 1;
                return Err(AllocationError::AllocationConflict {
                    attempts: 1,
                    reason: "lock timeout".to_string(),
                });
            }
            let mut inner = &self.inner;
            inner.next_sequence(class, year).await
        }
    }

    /// Hands back a fixed value regardless of state.
    struct FixedStore(u64);

    #[async_trait]
    impl SequenceStore for FixedStore {
        async fn next_sequence(&mut self, _: EntityClass, _: Year) -> Result<u64, AllocationError> {
            Ok(self.0)
        }
    }

    fn fast() -> IdAllocator {
        IdAllocator::new(3, Duration::from_millis(1))
    }

    fn y2025() -> Year {
        Year::new(2025).unwrap()
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mut store = FlakyStore::new(2);
        let id = fast()
            .allocate(&mut store, EntityClass::Teacher, y2025())
            .await
            .unwrap();
        assert_eq!(id.to_string(), "20251000");
        assert_eq!(store.calls, 3);
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_max_attempts() {
        let mut store = FlakyStore::new(10);
        let err = fast()
            .allocate(&mut store, EntityClass::Student, y2025())
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::AllocationConflict { attempts: 3, .. }));
        assert_eq!(store.calls, 3);
        // Nothing was consumed by the failed attempts
        assert_eq!(store.inner.last_issued(EntityClass::Student, y2025()), None);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_are_not_retried() {
        struct Broken(u32);

        #[async_trait]
        impl SequenceStore for Broken {
            async fn next_sequence(&mut self, _: EntityClass, _: Year) -> Result<u64, AllocationError> {
                self.0 += 1;
                Err(AllocationError::CorruptLedgerEntry {
                    identifier: "2025abcd".to_string(),
                    reason: "non-digit".to_string(),
                })
            }
        }

        let mut store = Broken(0);
        let err = fast()
            .allocate(&mut store, EntityClass::Teacher, y2025())
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::CorruptLedgerEntry { .. }));
        assert_eq!(store.0, 1);
    }

    #[tokio::test]
    async fn test_sequence_below_first_is_corrupt() {
        let err = fast()
            .allocate(&mut FixedStore(42), EntityClass::Teacher, y2025())
            .await
            .unwrap_err();
        assert!(
            matches!(err, AllocationError::CorruptLedgerEntry { ref identifier, .. } if identifier == "202542")
        );
    }

    #[tokio::test]
    async fn test_allocate_tagged() {
        let store = MemoryCounterStore::new();
        let allocator = fast();
        let mut handle = &store;

        assert_eq!(
            allocator.allocate_tagged(&mut handle, "teacher", 2025).await.unwrap(),
            "20251000"
        );
        assert_eq!(
            allocator.allocate_tagged(&mut handle, "student", 2025).await.unwrap(),
            "20251000"
        );

        let err = allocator
            .allocate_tagged(&mut handle, "admin", 2025)
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidEntityClass(ref tag) if tag == "admin"));

        let err = allocator
            .allocate_tagged(&mut handle, "teacher", 25)
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidYear(25)));

        // Rejected calls reserve nothing
        assert_eq!(store.last_issued(EntityClass::Teacher, y2025()), Some(1000));
    }

    #[tokio::test]
    async fn test_allocate_current_year_uses_wall_clock() {
        let store = MemoryCounterStore::new();
        let id = fast()
            .allocate_current_year(&mut &store, EntityClass::Student)
            .await
            .unwrap();
        assert_eq!(id.year(), Year::current().unwrap());
        assert_eq!(id.sequence(), 1000);
    }

    #[test]
    fn test_new_clamps_attempts() {
        assert_eq!(IdAllocator::new(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(IdAllocator::default().max_attempts(), 5);
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let allocator = IdAllocator::new(5, Duration::from_millis(25));
        assert_eq!(allocator.backoff_for(3), Duration::from_millis(75));

        let huge = IdAllocator::new(5, Duration::MAX);
        assert_eq!(huge.backoff_for(1), Duration::MAX);
        assert_eq!(huge.backoff_for(4), Duration::MAX);
    }
}
