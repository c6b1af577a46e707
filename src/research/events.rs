//! Advisory progress events streamed to clients while a report runs.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Event keys, one per stage that reports progress
pub mod keys {
    pub const GENERATE_QUERIES: &str = "generating_questions";
    pub const RAG_ANSWER: &str = "rag_answer";
    pub const RELEVANCY: &str = "relevancy_checker";
    pub const WEB_ANSWER: &str = "web_answer";
    pub const WRITE: &str = "section_writer";
    pub const REFLECT: &str = "reflect_on_summary";
    pub const FINALIZE: &str = "final_report";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: String,
    pub text: String,
}

/// Optional sender half; emitting never blocks and never fails the run
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, stage: &str, text: impl Into<String>) {
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is listening anymore
            let _ = tx.send(ProgressEvent {
                stage: stage.to_string(),
                text: text.into(),
            });
        }
    }
}
