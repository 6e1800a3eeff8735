//! Query orchestration - wires the model, the plan database and the tools

use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use advisor_config::Config;
use advisor_provider::{GeminiProvider, Provider};

use crate::executor::{AgentExecutor, AgentOutput, ExecutorConfig};
use crate::tools::{
    ListTablesTool, PythonReplTool, QueryCheckerTool, QueryTool, SchemaTool, SqlDatabase,
    ToolRegistry,
};
use crate::{ErrorKind, Result};

/// A failed query, as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub kind: ErrorKind,
    pub details: String,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error processing your query: {}", self.details)
    }
}

/// Outcome of `process_query`
#[derive(Debug, Clone)]
pub enum Reply {
    Answer(AgentOutput),
    Failed(QueryFailure),
}

impl Reply {
    /// The answer as a structured value, or the failure as plain text
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Reply::Answer(out) => json!({
                "input": out.input,
                "agent_scratchpad": [],
                "output": out.output,
            }),
            Reply::Failed(failure) => serde_json::Value::String(failure.to_string()),
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Reply::Answer(_))
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            Reply::Answer(_) => None,
            Reply::Failed(failure) => Some(failure.kind),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Answer(out) => f.write_str(&out.output),
            Reply::Failed(failure) => write!(f, "{}", failure),
        }
    }
}

/// Owns the reasoning loop and everything it needs
pub struct Orchestrator {
    executor: AgentExecutor,
    database: Arc<SqlDatabase>,
}

impl Orchestrator {
    /// Build from configuration, talking to Gemini.
    ///
    /// Fails with `MissingApiKey` before any client or database is created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let provider = GeminiProvider::new(
            api_key,
            config.model.api_base.clone(),
            Some(config.default_model()),
        );
        Self::with_provider(config, Arc::new(provider))
    }

    /// Build with a given model provider, opening the configured database
    pub fn with_provider(config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        let database = SqlDatabase::open(config.database_path(), config.database.sample_rows)?;
        Ok(Self::with_parts(config, provider, Arc::new(database)))
    }

    /// Build from already-constructed parts
    pub fn with_parts(
        config: &Config,
        provider: Arc<dyn Provider>,
        database: Arc<SqlDatabase>,
    ) -> Self {
        let tools = Self::register_tools(config, &provider, &database);
        info!(
            "Advisor ready with {} tools on model {}",
            tools.len(),
            config.default_model()
        );

        let executor = AgentExecutor::new(provider, tools, ExecutorConfig::from_config(config));
        Self { executor, database }
    }

    fn register_tools(
        config: &Config,
        provider: &Arc<dyn Provider>,
        database: &Arc<SqlDatabase>,
    ) -> ToolRegistry {
        let mut tools = ToolRegistry::new();

        // SQL toolkit
        tools.register(QueryTool::new(Arc::clone(database)));
        tools.register(SchemaTool::new(Arc::clone(database)));
        tools.register(ListTablesTool::new(Arc::clone(database)));
        tools.register(QueryCheckerTool::new(
            Arc::clone(provider),
            config.default_model(),
            config.model.temperature,
            database.dialect(),
        ));

        let python = &config.toolkit.python;
        tools.register(PythonReplTool::new(&python.interpreter, python.timeout_secs));

        tools
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tools().names()
    }

    pub fn database(&self) -> &SqlDatabase {
        &self.database
    }

    /// Run one query through the reasoning loop
    pub async fn run(&self, query: &str) -> Result<AgentOutput> {
        self.executor.invoke(query).await
    }

    /// Run one query; every failure becomes a `Reply::Failed`
    pub async fn process_query(&self, query: &str) -> Reply {
        match self.run(query).await {
            Ok(output) => Reply::Answer(output),
            Err(e) => {
                let failure = QueryFailure {
                    kind: e.kind(),
                    details: e.to_string(),
                };
                debug!("Query failed ({}): {}", failure.kind, failure.details);
                Reply::Failed(failure)
            }
        }
    }
}
