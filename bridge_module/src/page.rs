//! The agent's view of the chat page.
//!
//! The agent never touches a DOM directly; everything it needs from the
//! page goes through this trait, so the same state machine drives a real
//! browser binding or a scripted page in tests. Which selectors identify
//! the affordances is configuration ([`crate::agent::AgentConfig`]), not
//! part of this contract.

pub trait ChatPage {
    /// Current URL fragment, if any. May include the leading `#`.
    fn fragment(&self) -> Option<String>;

    /// Remove the fragment so later in-page navigations cannot re-trigger
    /// the same job.
    fn clear_fragment(&mut self);

    /// Snapshot of the page's current DOM as HTML.
    fn html(&self) -> String;

    /// Write the job text into the message input surface.
    fn set_input_text(&mut self, text: &str);

    /// Fire the synthetic input event the page's reactivity listens for.
    /// Mutating the input surface alone is not observed by the page.
    fn notify_input_changed(&mut self);

    /// Activate the submit control.
    fn click_submit(&mut self);
}
