//! Mail Collector: labeled threads into raw note rows.

use tracing::{debug, info, warn};

use crate::mail::{MailError, MailSource};
use crate::row_store::{RowStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

pub struct MailCollector<'a> {
    store: &'a RowStore,
    source_label: String,
    done_label: String,
}

impl<'a> MailCollector<'a> {
    pub fn new(
        store: &'a RowStore,
        source_label: impl Into<String>,
        done_label: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source_label: source_label.into(),
            done_label: done_label.into(),
        }
    }

    /// Ingest every thread carrying the source label and not the done
    /// label; returns how many rows were appended.
    ///
    /// The relabel is the sole guard against duplicate ingestion and runs
    /// only after the append succeeds. A store failure leaves the thread
    /// eligible for the next run; a relabel failure after the append can
    /// at worst re-ingest one thread on retry.
    pub fn collect<S: MailSource>(&self, source: &mut S) -> Result<usize, CollectError> {
        let threads = source.search(&self.source_label, &self.done_label)?;
        let mut appended = 0;
        for thread in &threads {
            let Some(message) = thread.first_message() else {
                warn!("thread {} has no messages; skipping", thread.id);
                continue;
            };
            self.store
                .append_raw_note(message.received_at, &message.subject, &message.body)?;
            source.relabel(&thread.id, &self.source_label, &self.done_label)?;
            debug!("ingested thread {} ({})", thread.id, message.subject);
            appended += 1;
        }
        info!("collected {} new meeting notes", appended);
        Ok(appended)
    }

    /// Move every done-labeled thread back under the source label so the
    /// next collect ingests it again; returns how many threads moved.
    pub fn reset_labels<S: MailSource>(&self, source: &mut S) -> Result<usize, CollectError> {
        let threads = source.search(&self.done_label, &self.source_label)?;
        for thread in &threads {
            source.relabel(&thread.id, &self.done_label, &self.source_label)?;
        }
        info!(
            "reset {} threads back to label {:?}",
            threads.len(),
            self.source_label
        );
        Ok(threads.len())
    }
}
