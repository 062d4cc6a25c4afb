//! Mail-source abstraction.
//!
//! The pipeline needs exactly two things from the mail system:
//! label-filtered search and relabeling. Everything behind those calls is
//! out of scope, so the mail system is a trait with an in-memory
//! implementation for tests and a JSON-file one the CLI operates on.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub received_at: DateTime<Utc>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailThread {
    pub id: String,
    pub labels: BTreeSet<String>,
    pub messages: Vec<MailMessage>,
}

impl MailThread {
    /// Only a thread's opening message carries the meeting summary;
    /// replies are never read.
    pub fn first_message(&self) -> Option<&MailMessage> {
        self.messages.first()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("unknown thread `{0}`")]
    UnknownThread(String),
    #[error("mail file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("mail file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait MailSource {
    /// Threads carrying `with_label` and not carrying `without_label`.
    fn search(&self, with_label: &str, without_label: &str) -> Result<Vec<MailThread>, MailError>;

    /// Swap one label for another on a thread. The swap is what removes
    /// the thread from the next search, so it doubles as processing state.
    fn relabel(&mut self, thread_id: &str, remove: &str, add: &str) -> Result<(), MailError>;
}

fn matching_threads(threads: &[MailThread], with_label: &str, without_label: &str) -> Vec<MailThread> {
    threads
        .iter()
        .filter(|thread| {
            thread.labels.contains(with_label) && !thread.labels.contains(without_label)
        })
        .cloned()
        .collect()
}

fn relabel_in_place(
    threads: &mut [MailThread],
    thread_id: &str,
    remove: &str,
    add: &str,
) -> Result<(), MailError> {
    let thread = threads
        .iter_mut()
        .find(|thread| thread.id == thread_id)
        .ok_or_else(|| MailError::UnknownThread(thread_id.to_string()))?;
    thread.labels.remove(remove);
    thread.labels.insert(add.to_string());
    Ok(())
}

/// In-memory mail source for tests and wiring demos.
#[derive(Debug, Default)]
pub struct MemoryMailSource {
    threads: Vec<MailThread>,
}

impl MemoryMailSource {
    pub fn new(threads: Vec<MailThread>) -> Self {
        Self { threads }
    }
}

impl MailSource for MemoryMailSource {
    fn search(&self, with_label: &str, without_label: &str) -> Result<Vec<MailThread>, MailError> {
        Ok(matching_threads(&self.threads, with_label, without_label))
    }

    fn relabel(&mut self, thread_id: &str, remove: &str, add: &str) -> Result<(), MailError> {
        relabel_in_place(&mut self.threads, thread_id, remove, add)
    }
}

/// Mail source backed by a JSON file of threads. Label changes are
/// written back immediately so state survives across CLI runs.
#[derive(Debug)]
pub struct JsonFileMailSource {
    path: PathBuf,
    threads: Vec<MailThread>,
}

impl JsonFileMailSource {
    /// Load the thread file; a missing file is an empty mailbox, not an
    /// error, so a fresh setup works before any mail has been exported.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MailError> {
        let path = path.as_ref().to_path_buf();
        let threads = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, threads })
    }

    fn save(&self) -> Result<(), MailError> {
        let raw = serde_json::to_string_pretty(&self.threads)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl MailSource for JsonFileMailSource {
    fn search(&self, with_label: &str, without_label: &str) -> Result<Vec<MailThread>, MailError> {
        Ok(matching_threads(&self.threads, with_label, without_label))
    }

    fn relabel(&mut self, thread_id: &str, remove: &str, add: &str) -> Result<(), MailError> {
        relabel_in_place(&mut self.threads, thread_id, remove, add)?;
        self.save()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn thread(id: &str, labels: &[&str], subject: &str, body: &str) -> MailThread {
        MailThread {
            id: id.to_string(),
            labels: labels.iter().map(|label| label.to_string()).collect(),
            messages: vec![MailMessage {
                received_at: Utc::now(),
                subject: subject.to_string(),
                body: body.to_string(),
            }],
        }
    }

    #[test]
    fn search_filters_on_both_labels() {
        let source = MemoryMailSource::new(vec![
            thread("t1", &["zoom notes"], "a", "x"),
            thread("t2", &["zoom notes", "zoom notes processed"], "b", "y"),
            thread("t3", &["other"], "c", "z"),
        ]);
        let hits = source.search("zoom notes", "zoom notes processed").expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "t1");
    }

    #[test]
    fn relabel_moves_a_thread_out_of_the_search() {
        let mut source = MemoryMailSource::new(vec![thread("t1", &["zoom notes"], "a", "x")]);
        source
            .relabel("t1", "zoom notes", "zoom notes processed")
            .expect("relabel");
        assert!(source
            .search("zoom notes", "zoom notes processed")
            .expect("search")
            .is_empty());
        assert_eq!(
            source
                .search("zoom notes processed", "zoom notes")
                .expect("search")
                .len(),
            1
        );
    }

    #[test]
    fn relabel_unknown_thread_is_an_error() {
        let mut source = MemoryMailSource::default();
        let err = source.relabel("nope", "a", "b").expect_err("unknown");
        assert!(matches!(err, MailError::UnknownThread(_)));
    }

    #[test]
    fn json_file_source_persists_label_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("threads.json");
        let threads = vec![thread("t1", &["zoom notes"], "Weekly Sync", "Shipped X")];
        std::fs::write(&path, serde_json::to_string_pretty(&threads).unwrap())
            .expect("write fixture");

        let mut source = JsonFileMailSource::load(&path).expect("load");
        assert_eq!(
            source
                .search("zoom notes", "zoom notes processed")
                .expect("search")
                .len(),
            1
        );
        source
            .relabel("t1", "zoom notes", "zoom notes processed")
            .expect("relabel");

        let reloaded = JsonFileMailSource::load(&path).expect("reload");
        assert!(reloaded
            .search("zoom notes", "zoom notes processed")
            .expect("search")
            .is_empty());
    }

    #[test]
    fn missing_file_is_an_empty_mailbox() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = JsonFileMailSource::load(dir.path().join("absent.json")).expect("load");
        assert!(source.search("any", "other").expect("search").is_empty());
    }
}
