//! Tests for query orchestration over a real plan database

mod common;

use std::sync::Arc;
use tempfile::TempDir;

use advisor_agent::tools::SqlDatabase;
use advisor_agent::{AgentError, ErrorKind, Orchestrator, Reply};
use advisor_config::ConfigError;
use advisor_provider::{ChatResponse, ProviderError};
use common::{seeded_db, test_config, MockProvider, ScriptedProvider};

const SCENARIO: &str = "I need a plan with 10GB data and unlimited calls for 2 people";

#[test]
fn test_missing_api_key_fails_before_anything_is_built() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("never-created.db");
    let config = test_config(&db_path);

    let err = match Orchestrator::from_config(&config) {
        Ok(_) => panic!("construction should fail without an API key"),
        Err(e) => e,
    };

    assert!(matches!(
        err,
        AgentError::Config(ConfigError::MissingApiKey(ref name)) if name == "ADVISOR_AGENT_TEST_UNSET_KEY"
    ));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!db_path.exists());
}

#[test]
fn test_tools_registered_in_order() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&seeded_db(dir.path()));

    let orchestrator =
        Orchestrator::with_provider(&config, Arc::new(ScriptedProvider::new(Vec::<String>::new())))
            .unwrap();

    assert_eq!(
        orchestrator.tool_names(),
        vec![
            "sql_db_query",
            "sql_db_schema",
            "sql_db_list_tables",
            "sql_db_query_checker",
            "Python_REPL",
        ]
    );
}

#[tokio::test]
async fn test_scenario_prompt_and_answer() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&seeded_db(dir.path()));

    let provider = Arc::new(ScriptedProvider::new([
        "I should see what tables exist.\nAction: sql_db_list_tables\nAction Input: ",
        "Look for a fitting plan.\nAction: sql_db_query\nAction Input: SELECT name, monthly_price FROM plans WHERE data_gb >= 10 AND voice_minutes = 'unlimited' AND max_lines >= 2",
        "I now know the final answer\nFinal Answer: Family Share at 45.0 per month covers 10GB and unlimited calls for up to 4 lines.",
    ]));
    let orchestrator = Orchestrator::with_provider(&config, provider.clone()).unwrap();

    let reply = orchestrator.process_query(SCENARIO).await;

    let out = match reply {
        Reply::Answer(out) => out,
        Reply::Failed(f) => panic!("unexpected failure: {}", f),
    };
    assert!(out.output.starts_with("Family Share at 45.0"));
    assert_eq!(out.intermediate_steps.len(), 2);
    assert_eq!(out.intermediate_steps[0].1, "customers, plans");
    assert_eq!(out.intermediate_steps[1].1, "[('Family Share', 45.0)]");

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 3);
    let first = &prompts[0];
    assert!(first.contains(&format!("Question : {}\n", SCENARIO)));
    assert!(first.contains("\n        sql_db_query: "));
    assert!(first.contains("\nsql_db_schema: "));
    assert!(first.contains(
        "\nPython_REPL: A Python shell. Use this to execute python commands. \
         Input should be a valid python command. \
         If you want to see the output of a value, you should print it out with `print(...)`.\n \n"
    ));
    assert!(first.contains(
        "should be one of [sql_db_query, sql_db_schema, sql_db_list_tables, sql_db_query_checker, Python_REPL]"
    ));
}

#[tokio::test]
async fn test_schema_tool_through_loop() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&seeded_db(dir.path()));

    let provider = Arc::new(ScriptedProvider::new([
        "Action: sql_db_schema\nAction Input: plans, invoices",
        "Action: sql_db_schema\nAction Input: plans",
        "Final Answer: ok",
    ]));
    let orchestrator = Orchestrator::with_provider(&config, provider).unwrap();

    let out = orchestrator.run("describe").await.unwrap();

    assert_eq!(
        out.intermediate_steps[0].1,
        "Error: table_names [\"invoices\"] not found in database"
    );
    assert!(out.intermediate_steps[1].1.contains("3 rows from plans table:"));
}

#[tokio::test]
async fn test_query_checker_uses_model() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&seeded_db(dir.path()));

    let provider = Arc::new(ScriptedProvider::new([
        "Action: sql_db_query_checker\nAction Input: SELECT name FROM plans",
        "SELECT name FROM plans;",
        "Final Answer: checked",
    ]));
    let orchestrator = Orchestrator::with_provider(&config, provider.clone()).unwrap();

    let out = orchestrator.run("check").await.unwrap();

    assert_eq!(out.intermediate_steps[0].1, "SELECT name FROM plans;");
    let checker_prompt = &provider.prompts()[1];
    assert!(checker_prompt.starts_with("\nSELECT name FROM plans\nDouble check the sqlite query above"));
    assert!(provider.requests()[1].stop.is_empty());
}

#[tokio::test]
async fn test_sql_error_is_an_observation() {
    let db = SqlDatabase::open_in_memory(3).unwrap();
    db.execute_batch(common::SEED_SQL).unwrap();
    let config = test_config(std::path::Path::new(":memory:"));

    let provider = Arc::new(ScriptedProvider::new([
        "Action: sql_db_query\nAction Input: SELECT price FROM plans",
        "Final Answer: recovered",
    ]));
    let orchestrator = Orchestrator::with_parts(&config, provider, Arc::new(db));

    let out = orchestrator.run("q").await.unwrap();

    assert!(out.intermediate_steps[0].1.starts_with("Error: "));
    assert_eq!(out.output, "recovered");
}

#[tokio::test]
async fn test_process_query_never_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&seeded_db(dir.path()));

    let mut mock = MockProvider::new();
    mock.expect_chat()
        .returning(|_| Err(ProviderError::Api("API key not valid".to_string())));
    let orchestrator = Orchestrator::with_provider(&config, Arc::new(mock)).unwrap();

    let reply = orchestrator.process_query(SCENARIO).await;

    assert_eq!(reply.failure_kind(), Some(ErrorKind::Provider));
    assert_eq!(
        reply.to_string(),
        "Error processing your query: model API error: API key not valid"
    );
}

#[tokio::test]
async fn test_process_query_reports_iteration_limit() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&seeded_db(dir.path()));
    config.agent.max_iterations = 2;

    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(2)
        .returning(|_| Ok(ChatResponse::text("Action: sql_db_list_tables\nAction Input: ")));
    let orchestrator = Orchestrator::with_provider(&config, Arc::new(mock)).unwrap();

    let reply = orchestrator.process_query("q").await;

    assert_eq!(reply.failure_kind(), Some(ErrorKind::IterationLimit));
    assert_eq!(
        reply.to_value(),
        serde_json::json!(
            "Error processing your query: agent stopped after 2 iterations without a final answer"
        )
    );
}
