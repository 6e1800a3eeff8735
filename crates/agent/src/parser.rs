//! Parsing of ReAct-style model output

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub const FINAL_ANSWER: &str = "Final Answer:";

const MISSING_ACTION: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
const MISSING_ACTION_INPUT: &str = "Invalid Format: Missing 'Action Input:' after 'Action:'";
const BOTH_ANSWER_AND_ACTION: &str =
    "Parsing LLM output produced both a final answer and a parse-able action:: ";

/// Observation used when a parse error carries no hint of its own
pub const INVALID_RESPONSE: &str = "Invalid or incomplete response";

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: String,
    /// Model text that produced the call, replayed in the scratchpad
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFinish {
    pub output: String,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    Action(AgentAction),
    Finish(AgentFinish),
}

/// Model output that is neither a usable action nor a final answer
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    message: String,
    observation: Option<String>,
    llm_output: String,
}

impl ParseError {
    fn unparseable(text: &str, observation: Option<&str>) -> Self {
        Self {
            message: format!("Could not parse LLM output: `{}`", text),
            observation: observation.map(String::from),
            llm_output: text.to_string(),
        }
    }

    /// What the model is told on its next step
    pub fn observation(&self) -> &str {
        self.observation.as_deref().unwrap_or(INVALID_RESPONSE)
    }

    /// Text replayed in the scratchpad for the failed step
    pub fn log(&self) -> &str {
        if self.observation.is_some() {
            &self.llm_output
        } else {
            &self.message
        }
    }

    pub fn llm_output(&self) -> &str {
        &self.llm_output
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("valid regex")
    })
}

fn action_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Action\s*\d*\s*:").expect("valid regex"))
}

fn action_input_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Action\s*\d*\s*Input\s*\d*\s*:").expect("valid regex"))
}

/// Parse one completion into a tool call or a final answer
pub fn parse(text: &str) -> Result<AgentStep, ParseError> {
    let includes_answer = text.contains(FINAL_ANSWER);

    if let Some(caps) = action_re().captures(text) {
        if includes_answer {
            return Err(ParseError {
                message: format!("{}{}", BOTH_ANSWER_AND_ACTION, text),
                observation: None,
                llm_output: text.to_string(),
            });
        }

        let tool = caps[1].trim().to_string();
        let tool_input = caps[2].trim_matches(' ').trim_matches('"').to_string();
        return Ok(AgentStep::Action(AgentAction {
            tool,
            tool_input,
            log: text.to_string(),
        }));
    }

    if includes_answer {
        let output = text
            .rsplit(FINAL_ANSWER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        return Ok(AgentStep::Finish(AgentFinish {
            output,
            log: text.to_string(),
        }));
    }

    if !action_label_re().is_match(text) {
        Err(ParseError::unparseable(text, Some(MISSING_ACTION)))
    } else if !action_input_label_re().is_match(text) {
        Err(ParseError::unparseable(text, Some(MISSING_ACTION_INPUT)))
    } else {
        Err(ParseError::unparseable(text, None))
    }
}
