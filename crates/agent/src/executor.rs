//! Reasoning loop - drives the model through Thought/Action/Observation steps

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use advisor_config::Config;
use advisor_provider::{ChatParams, Provider};

use crate::parser::{self, AgentAction, AgentStep};
use crate::prompt::{advisor_prompt, format_scratchpad, PromptTemplate};
use crate::tools::ToolRegistry;
use crate::{AgentError, Result};

/// Generation halts here so the loop, not the model, writes observations
pub const STOP_SEQUENCE: &str = "\nObservation";

/// Tool name recorded for steps where the model output could not be parsed
pub const EXCEPTION_TOOL: &str = "_Exception";

/// Reasoning loop settings
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_iterations: u32,
    pub handle_parsing_errors: bool,
    pub verbose: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExecutorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.default_model(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            max_iterations: config.max_iterations(),
            handle_parsing_errors: config.agent.handle_parsing_errors,
            verbose: config.agent.verbose,
        }
    }
}

/// Result of one agent run
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput {
    pub input: String,
    pub output: String,
    pub intermediate_steps: Vec<(AgentAction, String)>,
}

/// Runs the ReAct loop against a model and a set of tools
pub struct AgentExecutor {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    prompt: PromptTemplate,
    config: ExecutorConfig,
}

impl AgentExecutor {
    /// Create an executor using the advisor prompt for these tools
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry, config: ExecutorConfig) -> Self {
        let prompt = advisor_prompt(&tools);
        Self {
            provider,
            tools,
            prompt,
            config,
        }
    }

    /// Replace the prompt. It must take `input` and `agent_scratchpad`.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Answer one question, calling tools until the model gives a final answer
    pub async fn invoke(&self, input: &str) -> Result<AgentOutput> {
        self.chain_log(format_args!("Entering new AgentExecutor chain..."));

        let mut steps: Vec<(AgentAction, String)> = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            debug!("Agent iteration {}", iteration);

            let scratchpad = format_scratchpad(&steps);
            let prompt = self
                .prompt
                .format(&[("input", input), ("agent_scratchpad", &scratchpad)])?;

            let params = ChatParams {
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                ..ChatParams::prompt(&self.config.model, prompt)
            }
            .with_stop(STOP_SEQUENCE);

            let response = self.provider.chat(params).await?;
            let text = response.text_or_empty();

            match parser::parse(text) {
                Ok(AgentStep::Finish(finish)) => {
                    self.chain_log(format_args!("{}", finish.log));
                    self.chain_log(format_args!("Finished chain."));
                    return Ok(AgentOutput {
                        input: input.to_string(),
                        output: finish.output,
                        intermediate_steps: steps,
                    });
                }
                Ok(AgentStep::Action(action)) => {
                    self.chain_log(format_args!("{}", action.log));
                    let observation = self.run_tool(&action).await?;
                    self.chain_log(format_args!("Observation: {}", observation));
                    steps.push((action, observation));
                }
                Err(e) => {
                    if !self.config.handle_parsing_errors {
                        return Err(AgentError::OutputParse(e.to_string()));
                    }
                    let observation = e.observation().to_string();
                    self.chain_log(format_args!("{}", e.llm_output()));
                    self.chain_log(format_args!("Observation: {}", observation));
                    steps.push((
                        AgentAction {
                            tool: EXCEPTION_TOOL.to_string(),
                            tool_input: observation.clone(),
                            log: e.log().to_string(),
                        },
                        observation,
                    ));
                }
            }
        }

        Err(AgentError::MaxIterations(self.config.max_iterations))
    }

    async fn run_tool(&self, action: &AgentAction) -> Result<String> {
        match self.tools.get(&action.tool) {
            Some(tool) => {
                debug!("Executing tool: {}", action.tool);
                tool.execute(&action.tool_input)
                    .await
                    .map_err(|e| AgentError::Tool {
                        tool: action.tool.clone(),
                        message: e.to_string(),
                    })
            }
            None => Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                action.tool,
                self.tools.names().join(", ")
            )),
        }
    }

    fn chain_log(&self, line: std::fmt::Arguments<'_>) {
        if self.config.verbose {
            info!("{}", line);
        } else {
            debug!("{}", line);
        }
    }
}
