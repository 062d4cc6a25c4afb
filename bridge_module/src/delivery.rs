//! Webhook delivery of scraped rows back to the hosted pipeline.

use std::time::Duration;

use crate::protocol::{response_indicates_success, WebhookPayload};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The webhook endpoint could not be reached at all.
    #[error("webhook unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered without the success marker. The body is
    /// preserved verbatim for the operator.
    #[error("webhook rejected delivery: {body}")]
    Rejected { body: String },
}

/// POST the payload and check the response body for the success marker.
///
/// There is deliberately no retry here: by the time the agent delivers,
/// the hosted side has already marked the batch processed, so a blind
/// retry could only duplicate rows. A failed delivery is reported and the
/// operator decides.
pub fn deliver(webhook_url: &str, payload: &WebhookPayload) -> Result<String, DeliveryError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(DELIVERY_TIMEOUT)
        .build()?;
    let body = client.post(webhook_url).json(payload).send()?.text()?;
    if response_indicates_success(&body) {
        Ok(body)
    } else {
        Err(DeliveryError::Rejected { body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            key: "test-key".to_string(),
            table_data: vec![vec!["2024-01-01".to_string(), "Weekly Sync".to_string()]],
        }
    }

    #[test]
    fn posts_payload_and_accepts_success_marker() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "key": "test-key",
                "tableData": [["2024-01-01", "Weekly Sync"]],
            })))
            .with_body("Success: stored 1 rows")
            .create();

        let body = deliver(&server.url(), &payload()).expect("delivered");
        assert!(body.contains("Success"));
        mock.assert();
    }

    #[test]
    fn rejection_preserves_body_and_does_not_retry() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/")
            .with_body("Unauthorized")
            .expect(1)
            .create();

        let err = deliver(&server.url(), &payload()).expect_err("rejected");
        match err {
            DeliveryError::Rejected { body } => assert_eq!(body, "Unauthorized"),
            other => panic!("unexpected error: {other}"),
        }
        mock.assert();
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let err = deliver("http://127.0.0.1:1/", &payload()).expect_err("unreachable");
        assert!(matches!(err, DeliveryError::Transport(_)));
    }
}
