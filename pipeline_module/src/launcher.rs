//! Bridge Launcher: job description into the browser via the URL fragment.

use tracing::info;

use bridge_module::protocol::encode_fragment;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// No browsing context could be opened (the popup-blocked case). By
    /// this point the batch is already marked Processed, so the operator
    /// must reset the mail labels and re-collect to retry it.
    #[error("could not open a browser window for the report job: {0}")]
    BrowserOpen(#[from] std::io::Error),
}

pub struct BridgeLauncher {
    chat_page_url: String,
}

impl BridgeLauncher {
    pub fn new(chat_page_url: impl Into<String>) -> Self {
        Self {
            chat_page_url: chat_page_url.into(),
        }
    }

    /// The fragment is the entire hand-off: the hosted side cannot call
    /// into the page, and the page consumes only interactively-typed
    /// input, so the URL itself carries the job.
    pub fn launch_url(&self, job: &str) -> String {
        format!("{}#{}", self.chat_page_url, encode_fragment(job))
    }

    /// Open the chat page with the job in the fragment.
    pub fn launch(&self, job: &str) -> Result<(), LaunchError> {
        let url = self.launch_url(job);
        open::that(&url)?;
        info!("opened chat page with a {}-byte job fragment", url.len());
        Ok(())
    }
}
