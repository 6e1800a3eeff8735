//! Chat front-end for the plan advisor

use async_trait::async_trait;
use tracing::debug;

use advisor_agent::{Orchestrator, Reply};
use advisor_session::TurnContent;

pub mod shell;
pub mod terminal;

pub use shell::{ChatError, ChatShell, ShellState};

pub const TITLE: &str = "💬 Plan Recommender Chatbot";

pub const DESCRIPTION: &str = "This AI-powered chatbot helps users find the best telecom plans \
based on their needs. It analyzes user queries and provides personalized plan recommendations \
using advanced Generative AI techniques. Simply type your requirements, and the chatbot will \
suggest the most suitable telecom plans for you!";

pub const INPUT_PLACEHOLDER: &str = "Type your message here...";

/// Shown when a reply has no displayable text
pub const FALLBACK: &str = "Sorry, I couldn't process your request.";

/// Anything that can answer a user query
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn handle(&self, query: &str) -> Reply;
}

#[async_trait]
impl QueryHandler for Orchestrator {
    async fn handle(&self, query: &str) -> Reply {
        self.process_query(query).await
    }
}

/// Text to show for a turn
///
/// Structured content shows its `output` string; plain text shows as is.
pub fn display_text(content: &TurnContent) -> String {
    match content {
        TurnContent::Text(text) => text.clone(),
        TurnContent::Structured(value) => match value.get("output").and_then(|o| o.as_str()) {
            Some(output) => output.to_string(),
            None => {
                debug!("Reply has no text output: {}", value);
                FALLBACK.to_string()
            }
        },
    }
}
