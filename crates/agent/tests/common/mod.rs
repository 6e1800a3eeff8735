//! Shared fixtures for agent integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mockall::mock;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use advisor_agent::tools::SqlDatabase;
use advisor_config::Config;
use advisor_provider::{ChatParams, ChatResponse, Provider, ProviderError};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

/// Replays canned completions in order and records every request
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatParams>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatParams> {
        self.requests.lock().unwrap().clone()
    }

    /// Text of the single user message of each request
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|p| p.messages[0].content.clone())
            .collect()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(params);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(ChatResponse::text(reply)),
            None => Err(ProviderError::Api("script exhausted".to_string())),
        }
    }

    fn default_model(&self) -> String {
        "gemini-2.0-flash".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub const SEED_SQL: &str = "
CREATE TABLE plans (
    plan_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    data_gb INTEGER,
    voice_minutes TEXT,
    sms TEXT,
    max_lines INTEGER,
    monthly_price REAL
);
INSERT INTO plans VALUES (1, 'Basic', 2, '300', '100', 1, 15.0);
INSERT INTO plans VALUES (2, 'Family Share', 10, 'unlimited', 'unlimited', 4, 45.0);
INSERT INTO plans VALUES (3, 'Unlimited Plus', NULL, 'unlimited', 'unlimited', 2, 70.0);
INSERT INTO plans VALUES (4, 'Student', 5, '500', 'unlimited', 1, 20.0);
CREATE TABLE customers (
    customer_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    plan_id INTEGER REFERENCES plans(plan_id)
);
INSERT INTO customers VALUES (1, 'Ana', 2);
";

/// Plan database with the standard seed data
pub fn seeded_db(dir: &Path) -> PathBuf {
    let path = dir.join("telecom.db");
    let db = SqlDatabase::open(&path, 3).unwrap();
    db.execute_batch(SEED_SQL).unwrap();
    path
}

/// Config pointing at `db_path`, with an API key variable nobody sets
pub fn test_config(db_path: &Path) -> Config {
    let mut config = Config::default();
    config.database.path = db_path.to_string_lossy().to_string();
    config.model.api_key_env = "ADVISOR_AGENT_TEST_UNSET_KEY".to_string();
    config.agent.verbose = false;
    config
}

pub fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
