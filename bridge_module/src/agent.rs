//! Polling state machine that carries one report job through the chat page.
//!
//! Triggered on page load and on in-page fragment changes (the target page
//! is a single-page application that never fully reloads). One job in
//! flight per browsing context; triggers that arrive while a job is
//! running are ignored until the machine returns to Idle.

use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::delivery::{self, DeliveryError};
use crate::page::ChatPage;
use crate::poll::{poll_until, PollPolicy, PollTimeout};
use crate::protocol::{self, WebhookPayload};
use crate::scrape::{parse_selector, InvalidSelector, TableScraper};

/// Agent tuning: where to deliver, how to recognize the page affordances,
/// and how patiently to wait for them. Selector defaults match the chat
/// page this bridge was built against; they are configuration because the
/// page can change them at any time.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub webhook_url: String,
    pub secret_key: String,
    pub input_selector: String,
    pub submit_selector: String,
    pub busy_selector: String,
    pub table_selector: String,
    /// Wait for the input surface and submit control to exist.
    pub ready_poll: PollPolicy,
    /// Wait for generation to finish and a result table to appear.
    pub response_poll: PollPolicy,
    /// Pause between writing the input and clicking submit.
    pub submit_settle: Duration,
    /// Pause between the completion condition holding and the scrape.
    pub render_settle: Duration,
}

impl AgentConfig {
    pub fn new(webhook_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            secret_key: secret_key.into(),
            input_selector: r#"div[contenteditable="true"]"#.to_string(),
            submit_selector: r#"button[aria-label="Send message"]"#.to_string(),
            busy_selector: r#"button[aria-label="Stop generating"]"#.to_string(),
            table_selector: "table".to_string(),
            ready_poll: PollPolicy::new(Duration::from_secs(1), Duration::from_secs(60)),
            response_poll: PollPolicy::new(Duration::from_secs(2), Duration::from_secs(300)),
            submit_settle: Duration::from_millis(800),
            render_settle: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    Dispatching,
    Submitting,
    AwaitingResponse,
    Scraping,
    Delivering,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Selector(#[from] InvalidSelector),
    #[error("page never became ready: {0}")]
    PageNeverReady(PollTimeout),
    #[error("generation did not complete: {0}")]
    GenerationTimedOut(PollTimeout),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// What the agent reports to the operator after a successful delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub rows_delivered: usize,
    pub response_body: String,
}

pub struct BridgeAgent {
    config: AgentConfig,
    input: Selector,
    submit: Selector,
    busy: Selector,
    table: Selector,
    scraper: TableScraper,
    phase: AgentPhase,
}

impl BridgeAgent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let input = parse_selector(&config.input_selector)?;
        let submit = parse_selector(&config.submit_selector)?;
        let busy = parse_selector(&config.busy_selector)?;
        let table = parse_selector(&config.table_selector)?;
        let scraper = TableScraper::new(&config.table_selector)?;
        Ok(Self {
            config,
            input,
            submit,
            busy,
            table,
            scraper,
            phase: AgentPhase::Idle,
        })
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Entry point for page-load and fragment-change events.
    ///
    /// Returns `Ok(None)` when there was nothing to do: no fragment, a
    /// fragment that fails the instruction-header gate (the page's own
    /// routing state), or a job already in flight. A matching fragment is
    /// consumed before any page interaction so a later navigation cannot
    /// re-trigger the same job.
    pub fn on_navigation<P: ChatPage>(
        &mut self,
        page: &mut P,
    ) -> Result<Option<DeliveryReport>, AgentError> {
        if self.phase != AgentPhase::Idle {
            warn!(phase = ?self.phase, "navigation while a job is in flight; trigger ignored");
            return Ok(None);
        }
        let Some(raw) = page.fragment() else {
            return Ok(None);
        };
        let Some(job) = protocol::decode_fragment(&raw) else {
            return Ok(None);
        };
        if !protocol::starts_with_instruction_header(&job) {
            debug!("fragment present but not a report job; staying idle");
            return Ok(None);
        }

        let result = self.run_job(page, &job);
        // Every exit path, success or failure, frees the machine for the
        // next job; a failed unit of work does not wedge the agent.
        self.phase = AgentPhase::Idle;
        result.map(Some)
    }

    fn run_job<P: ChatPage>(
        &mut self,
        page: &mut P,
        job: &str,
    ) -> Result<DeliveryReport, AgentError> {
        self.phase = AgentPhase::Dispatching;
        page.clear_fragment();
        info!("report job detected; waiting for the page to become ready");
        poll_until(self.config.ready_poll, || {
            let document = Html::parse_document(&page.html());
            document.select(&self.input).next().is_some()
                && document.select(&self.submit).next().is_some()
        })
        .map_err(AgentError::PageNeverReady)?;

        self.phase = AgentPhase::Submitting;
        page.set_input_text(job);
        page.notify_input_changed();
        std::thread::sleep(self.config.submit_settle);
        page.click_submit();
        info!("job submitted; watching for the response table");

        self.phase = AgentPhase::AwaitingResponse;
        // Both halves of the condition matter: a table alone may be a
        // stale one from an earlier turn, still on screen while the new
        // generation runs.
        poll_until(self.config.response_poll, || {
            let document = Html::parse_document(&page.html());
            document.select(&self.busy).next().is_none()
                && document.select(&self.table).next().is_some()
        })
        .map_err(AgentError::GenerationTimedOut)?;

        self.phase = AgentPhase::Scraping;
        std::thread::sleep(self.config.render_settle);
        let rows = self.scraper.extract(&page.html());
        info!("scraped {} data rows", rows.len());

        self.phase = AgentPhase::Delivering;
        let payload = WebhookPayload {
            key: self.config.secret_key.clone(),
            table_data: rows,
        };
        let response_body = delivery::deliver(&self.config.webhook_url, &payload)?;
        info!("delivery acknowledged: {}", response_body.trim());
        Ok(DeliveryReport {
            rows_delivered: payload.table_data.len(),
            response_body,
        })
    }

    #[cfg(test)]
    fn force_phase(&mut self, phase: AgentPhase) {
        self.phase = phase;
    }
}
