//! # Rostra IDs
//!
//! Allocation of human-readable, year-prefixed identifiers for teachers
//! (employee IDs) and students (student IDs).
//!
//! An identifier is the 4-digit allocation year followed by a decimal
//! sequence number that starts at 1000 for every (entity class, year)
//! partition: `20251000`, `20251001`, ... Teacher and student numbering
//! are independent.
//!
//! # Ledger designs
//!
//! Two [`SequenceStore`] families derive the next sequence number:
//!
//! | Store | Design | Recycles after delete | Race-free |
//! |-------|--------|-----------------------|-----------|
//! | [`MemoryCounterStore`], [`PgCounterStore`] | counter per partition, atomic increment | no | yes |
//! | [`MemoryLedger`], [`PgScanLedger`] | highest issued identifier + 1 | yes | no, needs a unique constraint and retry |
//!
//! [`IdAllocator`] wraps either one with bounded retries on contention.
//!
//! # Example
//!
//! ```ignore
//! use rostra_ids::{EntityClass, IdAllocator, MemoryCounterStore, Year};
//!
//! let store = MemoryCounterStore::new();
//! let allocator = IdAllocator::default();
//! let year = Year::new(2025)?;
//!
//! let first = allocator.allocate(&mut &store, EntityClass::Teacher, year).await?;
//! let second = allocator.allocate(&mut &store, EntityClass::Teacher, year).await?;
//! assert_eq!(first.to_string(), "20251000");
//! assert_eq!(second.to_string(), "20251001");
//! ```

pub mod allocator;
pub mod entity_class;
pub mod error;
pub mod identifier;
pub mod memory;
pub mod postgres;
pub mod store;

pub use allocator::IdAllocator;
pub use entity_class::EntityClass;
pub use error::AllocationError;
pub use identifier::{FIRST_SEQUENCE, Identifier, IdentifierParseError, Year};
pub use memory::{MemoryCounterStore, MemoryLedger};
pub use postgres::{PgCounterStore, PgScanLedger, identifier_column, identifier_constraint};
pub use store::SequenceStore;
