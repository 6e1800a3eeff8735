//! Advisor prompt template

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::parser::AgentAction;
use crate::tools::ToolRegistry;
use crate::{AgentError, Result};

/// Prompt sent on every reasoning step.
///
/// The indentation and the single-space blank lines are part of the text the
/// model sees and are kept exactly.
pub const ADVISOR_TEMPLATE: &str = concat!(
    "You are a telecom service advisor who helps customers find the best plan for their needs.\n",
    " \n",
    "        When recommending plans, consider:\n",
    "        1. The customer's usage patterns (data, voice, SMS)\n",
    "        2. Number of people/devices that will use the plan\n",
    "        3. Special requirements (international calling, streaming, etc.)\n",
    "        4. Budget constraints\n",
    " \n",
    "        Always explain WHY a particular plan is a good fit for their needs.\n",
    " \n",
    "        If the customer asks for a plan that is not available, suggest the closest alternative.\n",
    " \n",
    "        You have access to the following tools:\n",
    " \n",
    "        {tools}\n",
    " \n",
    "        Use the following format:\n",
    " \n",
    "        Question: the input question you must answer\n",
    "        Thought: you should always think about what to do\n",
    "        Action: the action to take, should be one of [{tool_names}]\n",
    "        Action Input: the input to the action\n",
    "        Observation: the result of the action\n",
    "        ... (this Thought/Action/Action Input/Observation can repeat N times)\n",
    "        Thought: I now know the final answer\n",
    "        Final Answer: the final answer to the original input question\n",
    " \n",
    "        Question : {input}\n",
    "        Thought : {agent_scratchpad}\n",
    "        ",
);

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Template with `{name}` placeholders, some of which may be bound up front
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    partials: HashMap<String, String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            partials: HashMap::new(),
        }
    }

    /// Bind a variable once for every later `format` call
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.partials.insert(name.into(), value.into());
        self
    }

    /// Placeholders not yet bound by `partial`, in order of first appearance
    pub fn input_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for cap in placeholder().captures_iter(&self.template) {
            let name = &cap[1];
            if !self.partials.contains_key(name) && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Substitute every placeholder in a single pass.
    ///
    /// Substituted values are not scanned again, so braces inside a question
    /// or an observation come through untouched.
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut missing: Vec<String> = Vec::new();
        let rendered = placeholder().replace_all(&self.template, |cap: &Captures| {
            let name = &cap[1];
            let value = values
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
                .or_else(|| self.partials.get(name).cloned());

            value.unwrap_or_else(|| {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                String::new()
            })
        });

        if !missing.is_empty() {
            return Err(AgentError::Prompt(missing.join(", ")));
        }
        Ok(rendered.into_owned())
    }
}

/// The advisor template with tool descriptions and names bound
pub fn advisor_prompt(tools: &ToolRegistry) -> PromptTemplate {
    PromptTemplate::new(ADVISOR_TEMPLATE)
        .partial("tools", tools.render_descriptions())
        .partial("tool_names", tools.names().join(", "))
}

/// Replay earlier steps in the same format the model writes them
pub fn format_scratchpad(steps: &[(AgentAction, String)]) -> String {
    let mut thoughts = String::new();
    for (action, observation) in steps {
        thoughts.push_str(&action.log);
        thoughts.push_str("\nObservation: ");
        thoughts.push_str(observation);
        thoughts.push_str("\nThought: ");
    }
    thoughts
}
