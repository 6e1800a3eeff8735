//! Plan advisor agent
//!
//! A ReAct reasoning loop over a hosted model, with a SQL toolkit for the
//! plan database and a Python tool for arithmetic and comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod executor;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod tools;

pub use executor::{AgentExecutor, AgentOutput, ExecutorConfig};
pub use orchestrator::{Orchestrator, QueryFailure, Reply};
pub use parser::{AgentAction, AgentFinish, AgentStep};
pub use prompt::PromptTemplate;
pub use tools::{ToolRegistry, ToolTrait};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] advisor_config::ConfigError),

    #[error(transparent)]
    Provider(#[from] advisor_provider::ProviderError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("could not parse model output: {0}")]
    OutputParse(String),

    #[error("agent stopped after {0} iterations without a final answer")]
    MaxIterations(u32),

    #[error("prompt is missing values for: {0}")]
    Prompt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Coarse failure category surfaced to the chat layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Provider,
    Database,
    Tool,
    OutputParse,
    IterationLimit,
    Io,
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Config(_) | AgentError::Prompt(_) => ErrorKind::Configuration,
            AgentError::Provider(_) => ErrorKind::Provider,
            AgentError::Database(_) => ErrorKind::Database,
            AgentError::Tool { .. } => ErrorKind::Tool,
            AgentError::OutputParse(_) => ErrorKind::OutputParse,
            AgentError::MaxIterations(_) => ErrorKind::IterationLimit,
            AgentError::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Provider => "provider",
            ErrorKind::Database => "database",
            ErrorKind::Tool => "tool",
            ErrorKind::OutputParse => "output_parse",
            ErrorKind::IterationLimit => "iteration_limit",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AgentError::MaxIterations(20).kind(),
            ErrorKind::IterationLimit
        );
        assert_eq!(
            AgentError::OutputParse("x".into()).kind(),
            ErrorKind::OutputParse
        );
        assert_eq!(
            AgentError::Tool {
                tool: "Python_REPL".into(),
                message: "spawn failed".into()
            }
            .kind(),
            ErrorKind::Tool
        );
        assert_eq!(
            AgentError::Config(advisor_config::ConfigError::MissingApiKey(
                "GOOGLE_API_KEY".into()
            ))
            .kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AgentError::MaxIterations(20).to_string(),
            "agent stopped after 20 iterations without a final answer"
        );
        assert_eq!(
            AgentError::Config(advisor_config::ConfigError::MissingApiKey(
                "GOOGLE_API_KEY".into()
            ))
            .to_string(),
            "GOOGLE_API_KEY environment variable not set"
        );
        assert_eq!(ErrorKind::IterationLimit.to_string(), "iteration_limit");
    }
}
