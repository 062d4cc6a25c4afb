//! Hosted side of the meeting-notes report pipeline.
//!
//! Moves labeled mail threads into a raw-notes table, folds New rows into
//! a single report job, hands the job to the browser through a URL
//! fragment, and receives the scraped report rows back over a webhook.
//! The status columns in the row store are the only durable coordination
//! state between the two execution contexts.

pub mod aggregator;
pub mod collector;
pub mod config;
pub mod launcher;
pub mod mail;
pub mod row_store;
pub mod server;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
