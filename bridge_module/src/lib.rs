//! Browser-side bridge between the report pipeline and the external chat page.
//!
//! The hosted pipeline cannot call the chat service as an API; the only way
//! in is the page itself. This crate owns everything that crosses that
//! boundary: the hand-off protocol (URL fragment out, webhook back), the
//! bounded polling primitive, the page abstraction, and the automation
//! agent that carries one job through the page and posts the scraped
//! result table home.

pub mod agent;
pub mod delivery;
pub mod page;
pub mod poll;
pub mod protocol;
pub mod scrape;

pub use agent::{AgentConfig, AgentError, AgentPhase, BridgeAgent, DeliveryReport};
pub use page::ChatPage;
pub use protocol::WebhookPayload;
