//! Agent toolkit
//!
//! Tools take the raw `Action Input` text and return an observation string.

pub mod python;
pub mod sql;

pub use python::PythonReplTool;
pub use sql::{
    ListTablesTool, QueryCheckerTool, QueryTool, SchemaTool, SqlDatabase,
};

use async_trait::async_trait;

pub type ToolError = Box<dyn std::error::Error + Send + Sync>;

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn execute(&self, input: &str) -> Result<String, ToolError>;
}

/// Ordered tool registry
///
/// Registration order is the order tools appear in the prompt.
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, replacing any tool with the same name in place
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let boxed: BoxedTool = Box::new(tool);
        match self.tools.iter().position(|t| t.name() == boxed.name()) {
            Some(idx) => self.tools[idx] = boxed,
            None => self.tools.push(boxed),
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// One `name: description` line per tool
    pub fn render_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn execute(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("tool '{}' not found", name))?;
        tool.execute(input).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip surrounding whitespace, a markdown fence and a leading language tag.
///
/// Backticks are only removed as a matched ``` fence or a single pair
/// wrapping the whole input, so backtick-quoted identifiers survive.
pub(crate) fn strip_code_fence(input: &str, tag: &str) -> String {
    let mut text = input.trim();
    if let Some(inner) = text.strip_prefix("```") {
        text = inner.strip_suffix("```").unwrap_or(inner);
    } else if let Some(inner) = text
        .strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .filter(|t| !t.contains('`'))
    {
        text = inner;
    }

    let text = text.trim_start();
    if let Some(head) = text.get(..tag.len()) {
        let rest = &text[tag.len()..];
        if head.eq_ignore_ascii_case(tag)
            && rest.chars().next().map_or(true, char::is_whitespace)
        {
            return rest.trim().to_string();
        }
    }
    text.trim().to_string()
}
