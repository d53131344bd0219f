use async_trait::async_trait;

use crate::entity_class::EntityClass;
use crate::error::AllocationError;
use crate::identifier::Year;

/// Source of sequence numbers for (entity class, year) partitions.
///
/// Counter stores reserve the returned number: it will never be handed out
/// again, even if the caller drops it. Scan-based ledgers only derive it
/// from what has already been recorded, so two callers racing may both
/// receive the same number and the loser finds out when recording.
#[async_trait]
pub trait SequenceStore: Send {
    async fn next_sequence(
        &mut self,
        class: EntityClass,
        year: Year,
    ) -> Result<u64, AllocationError>;
}

