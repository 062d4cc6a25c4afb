//! Batch Aggregator: New raw rows into one report job.

use tracing::info;

use bridge_module::protocol::INSTRUCTION_HEADER;

use crate::row_store::{RowStatus, RowStore, StoreError};

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    /// The raw table has no data rows at all.
    EmptySource,
    /// Rows exist, but every one has already been folded into a job.
    AlreadyProcessed,
    /// A job description covering `row_ids`, which are now marked
    /// Processed.
    Job {
        description: String,
        row_ids: Vec<i64>,
    },
}

pub struct BatchAggregator<'a> {
    store: &'a RowStore,
}

impl<'a> BatchAggregator<'a> {
    pub fn new(store: &'a RowStore) -> Self {
        Self { store }
    }

    /// Fold every New row, in table order, into one job description.
    ///
    /// Included rows are marked Processed before the job is handed back:
    /// a crash between here and the launch loses the batch instead of
    /// duplicating it on the next run. That ordering is the pipeline's
    /// at-most-once guarantee and must not be flipped to mark-on-success.
    pub fn aggregate(&self) -> Result<AggregateOutcome, StoreError> {
        let notes = self.store.list_raw_notes()?;
        if notes.is_empty() {
            return Ok(AggregateOutcome::EmptySource);
        }

        let new_notes: Vec<_> = notes
            .iter()
            .filter(|note| note.status == RowStatus::New)
            .collect();
        if new_notes.is_empty() {
            return Ok(AggregateOutcome::AlreadyProcessed);
        }

        let mut description = String::from(INSTRUCTION_HEADER);
        let mut row_ids = Vec::with_capacity(new_notes.len());
        for note in &new_notes {
            description.push_str(&format!(
                "MEETING: {}\nCONTENT: {}\n\n",
                note.subject, note.body
            ));
            row_ids.push(note.id);
        }

        self.store.mark_raw_processed(&row_ids)?;
        info!("aggregated {} notes into one report job", row_ids.len());
        Ok(AggregateOutcome::Job {
            description,
            row_ids,
        })
    }
}
