//! Webhook Receiver: scraped report rows back into the processed table.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tracing::{error, info, warn};

use bridge_module::protocol::{WebhookPayload, UNAUTHORIZED_MARKER};

use crate::config::PipelineConfig;
use crate::row_store::{ReportRow, RowStore};
use crate::BoxError;

pub struct AppState {
    pub secret_key: String,
    pub store: RowStore,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", post(receive))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn receive(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    apply_payload(&state.store, &state.secret_key, &body)
}

/// Apply one webhook payload, independent of the HTTP plumbing.
///
/// The whole batch is validated and normalized before anything is
/// appended, and the append itself is one transaction, so the caller
/// never observes a partially stored batch. Re-posting an identical
/// payload appends the rows again; the webhook offers no deduplication.
pub fn apply_payload(store: &RowStore, secret_key: &str, body: &[u8]) -> (StatusCode, String) {
    let payload: WebhookPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("webhook payload did not parse: {err}");
            return (StatusCode::BAD_REQUEST, format!("Bad Request: {err}"));
        }
    };

    if payload.key != secret_key {
        warn!("webhook call rejected: key mismatch");
        return (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MARKER.to_string());
    }

    let rows: Vec<ReportRow> = payload
        .table_data
        .iter()
        .map(|cells| ReportRow::from_cells(cells))
        .collect();

    match store.append_report_rows(&rows) {
        Ok(count) => {
            info!("stored {count} report rows");
            (StatusCode::OK, format!("Success: stored {count} rows"))
        }
        Err(err) => {
            error!("failed to store report rows: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: {err}"),
            )
        }
    }
}

pub async fn run_server(config: &PipelineConfig, store: RowStore) -> Result<(), BoxError> {
    let state = Arc::new(AppState {
        secret_key: config.secret_key.clone(),
        store,
    });
    let app = router(state).layer(DefaultBodyLimit::max(config.inbound_body_max_bytes));

    let host: IpAddr = config
        .host
        .parse()
        .map_err(|_| format!("invalid host: {}", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    info!("webhook receiver listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_store::RowStatus;

    fn test_store() -> (tempfile::TempDir, RowStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RowStore::new(dir.path().join("store.db")).expect("store");
        (dir, store)
    }

    fn body(key: &str, rows: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({ "key": key, "tableData": rows })).unwrap()
    }

    #[test]
    fn wrong_key_yields_unauthorized_and_no_rows() {
        let (_dir, store) = test_store();
        let (status, text) = apply_payload(
            &store,
            "right-key",
            &body("wrong-key", serde_json::json!([["d", "m", "a", "u", "r", "x"]])),
        );
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(text.contains("Unauthorized"));
        assert!(store.list_processed().expect("list").is_empty());
    }

    #[test]
    fn short_rows_are_padded_and_stored_as_new() {
        let (_dir, store) = test_store();
        let (status, text) = apply_payload(
            &store,
            "key",
            &body("key", serde_json::json!([["d", "m", "a", "u", "r"]])),
        );
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Success"));

        let records = store.list_processed().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cells, ["d", "m", "a", "u", "r", ""]);
        assert_eq!(records[0].status, RowStatus::New);
    }

    #[test]
    fn identical_payloads_append_twice() {
        let (_dir, store) = test_store();
        let payload = body("key", serde_json::json!([["d", "m", "a", "u", "r", "x"]]));
        apply_payload(&store, "key", &payload);
        apply_payload(&store, "key", &payload);
        assert_eq!(store.list_processed().expect("list").len(), 2);
    }

    #[test]
    fn malformed_batch_stores_nothing() {
        let (_dir, store) = test_store();

        let (status, _) = apply_payload(&store, "key", b"not json at all");
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // One bad cell poisons the whole batch; no partial append.
        let mixed = body(
            "key",
            serde_json::json!([["good", "row"], ["bad", 42]]),
        );
        let (status, text) = apply_payload(&store, "key", &mixed);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(text.contains("Bad Request"));
        assert!(store.list_processed().expect("list").is_empty());
    }

    #[test]
    fn empty_batch_is_a_successful_no_op() {
        let (_dir, store) = test_store();
        let (status, text) = apply_payload(&store, "key", &body("key", serde_json::json!([])));
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Success"));
        assert!(store.list_processed().expect("list").is_empty());
    }
}
