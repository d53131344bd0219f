//! In-process ledgers.
//!
//! [`MemoryCounterStore`] is the counter design for a single-instance
//! deployment where this process is the only writer. [`MemoryLedger`]
//! models the scan-based design over a set of issued identifiers, and
//! exists mostly to exercise that design's behavior without a database.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use tracing::debug;

use crate::allocator::IdAllocator;
use crate::entity_class::EntityClass;
use crate::error::AllocationError;
use crate::identifier::{FIRST_SEQUENCE, Identifier, Year, next_after_highest, numerically_highest};
use crate::store::SequenceStore;

/// One counter per (entity class, year), each advanced under its shard lock.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<(EntityClass, Year), u64>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues a partition after `last_issued`, e.g. when restoring state.
    /// Never moves a counter backwards.
    pub fn seed(&self, class: EntityClass, year: Year, last_issued: u64) {
        self.counters
            .entry((class, year))
            .and_modify(|current| *current = (*current).max(last_issued))
            .or_insert(last_issued);
    }

    /// Most recently issued sequence number, if the partition has been used.
    pub fn last_issued(&self, class: EntityClass, year: Year) -> Option<u64> {
        self.counters.get(&(class, year)).map(|v| *v)
    }

    fn advance(&self, class: EntityClass, year: Year) -> Result<u64, AllocationError> {
        let mut counter = self
            .counters
            .entry((class, year))
            .or_insert(FIRST_SEQUENCE - 1);

        let next = counter
            .checked_add(1)
            .ok_or(AllocationError::SequenceExhausted {
                class,
                year: year.value(),
            })?;
        *counter = next;
        Ok(next)
    }
}

#[async_trait]
impl SequenceStore for &MemoryCounterStore {
    async fn next_sequence(
        &mut self,
        class: EntityClass,
        year: Year,
    ) -> Result<u64, AllocationError> {
        self.advance(class, year)
    }
}

/// Issued identifiers per entity class, queried by "highest with this year
/// prefix". Entries are kept as raw strings so that malformed historical
/// data can be loaded and detected.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: DashMap<EntityClass, BTreeSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly allocated identifier, failing if it is already taken.
    pub fn record(&self, class: EntityClass, identifier: &Identifier) -> Result<(), AllocationError> {
        let raw = identifier.to_string();
        if self.entries.entry(class).or_default().insert(raw.clone()) {
            Ok(())
        } else {
            Err(AllocationError::DuplicateIdentifier(raw))
        }
    }

    /// Loads an existing entry verbatim, without validating it.
    pub fn insert_raw(&self, class: EntityClass, raw: impl Into<String>) -> bool {
        self.entries.entry(class).or_default().insert(raw.into())
    }

    /// Removes an entry, as deleting the owning entity row would.
    pub fn remove(&self, class: EntityClass, identifier: &Identifier) -> bool {
        self.entries
            .get_mut(&class)
            .is_some_and(|mut set| set.remove(&identifier.to_string()))
    }

    pub fn contains(&self, class: EntityClass, identifier: &Identifier) -> bool {
        self.entries
            .get(&class)
            .is_some_and(|set| set.contains(&identifier.to_string()))
    }

    pub fn len(&self, class: EntityClass) -> usize {
        self.entries.get(&class).map_or(0, |set| set.len())
    }

    pub fn is_empty(&self, class: EntityClass) -> bool {
        self.len(class) == 0
    }

    /// Highest entry carrying `year` as its prefix.
    pub fn highest(&self, class: EntityClass, year: Year) -> Option<String> {
        let prefix = year.to_string();
        self.entries.get(&class).and_then(|set| {
            numerically_highest(
                set.iter()
                    .filter(|raw| raw.starts_with(&prefix))
                    .map(String::as_str),
            )
            .map(str::to_string)
        })
    }

    /// Allocates and records in one step, restarting from the scan whenever
    /// a concurrent caller recorded the same identifier first.
    pub async fn allocate_and_record(
        &self,
        allocator: &IdAllocator,
        class: EntityClass,
        year: Year,
    ) -> Result<Identifier, AllocationError> {
        let mut attempt = 1;
        loop {
            let mut ledger = self;
            let identifier = allocator.allocate(&mut ledger, class, year).await?;

            match self.record(class, &identifier) {
                Ok(()) => return Ok(identifier),
                Err(AllocationError::DuplicateIdentifier(taken))
                    if attempt < allocator.max_attempts() =>
                {
                    debug!(entity_class = %class, identifier = %taken, attempt, "Identifier taken, rescanning");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SequenceStore for &MemoryLedger {
    async fn next_sequence(
        &mut self,
        class: EntityClass,
        year: Year,
    ) -> Result<u64, AllocationError> {
        next_after_highest(self.highest(class, year).as_deref(), year)
    }
}
