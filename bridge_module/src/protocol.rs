//! Wire contract shared by the hosted pipeline and the browser-side agent.
//!
//! Two channels exist between the execution contexts: the URL fragment
//! carrying the job description out, and the webhook carrying scraped rows
//! back. Both schemas live here so neither side can drift.

use serde::{Deserialize, Serialize};

/// Fixed header prepended to every job description. It tells the chat
/// model what table shape to produce and doubles as the safety gate the
/// agent checks before acting on a fragment.
pub const INSTRUCTION_HEADER: &str = "Create a table with columns: Date, Meeting Name, Accomplishments, Upcoming, Risks, Decisions. Use bullets for text within cells. Data source:\n\n";

/// Prefix the agent matches case-insensitively against incoming fragments.
const INSTRUCTION_PREFIX: &str = "create a table with columns";

/// Number of data columns in a generated report row.
pub const REPORT_COLUMNS: usize = 6;

/// Marker contained in the receiver's response body when the batch was
/// stored.
pub const SUCCESS_MARKER: &str = "Success";

/// Marker contained in the receiver's response body when the key did not
/// match.
pub const UNAUTHORIZED_MARKER: &str = "Unauthorized";

/// Payload the agent POSTs to the webhook receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub key: String,
    #[serde(rename = "tableData")]
    pub table_data: Vec<Vec<String>>,
}

/// True when `text` begins with the instruction header. Guards the agent
/// against acting on the page's own routing fragments.
pub fn starts_with_instruction_header(text: &str) -> bool {
    text.trim_start()
        .to_lowercase()
        .starts_with(INSTRUCTION_PREFIX)
}

/// Percent-encode a job description for the fragment channel.
pub fn encode_fragment(job: &str) -> String {
    urlencoding::encode(job).into_owned()
}

/// Decode a fragment back into a job description. Accepts the value with
/// or without its leading `#`; returns `None` for empty or undecodable
/// input.
pub fn decode_fragment(fragment: &str) -> Option<String> {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw).ok()?;
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Substring check over the receiver's response body. The canonical
/// response wraps the marker, so equality would reject valid replies.
pub fn response_indicates_success(body: &str) -> bool {
    body.contains(SUCCESS_MARKER)
}
