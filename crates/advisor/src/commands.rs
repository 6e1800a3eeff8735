//! Plan advisor command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use advisor_agent::tools::SqlDatabase;
use advisor_agent::Orchestrator;
use advisor_chat::{terminal, ChatShell, QueryHandler};
use advisor_config::{self, Config};
use advisor_session::{FileStore, MemoryStore, SessionStore};

/// Build the orchestrator, failing early when the API key is missing
fn start_advisor(config: &Config) -> Result<Arc<dyn QueryHandler>> {
    let orchestrator =
        Orchestrator::from_config(config).context("Failed to start the advisor")?;
    debug!("Tools: {}", orchestrator.tool_names().join(", "));
    Ok(Arc::new(orchestrator))
}

/// Initialize config and data directories
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing plan advisor...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = advisor_config::init().await?;

    println!("\n◆ Plan advisor initialized");
    println!("\nNext steps:");
    println!(
        "  1. Export {} (or put it in a .env file)",
        config.model.api_key_env
    );
    println!(
        "  2. Point database.path in {} at your plan database",
        advisor_config::config_path().display()
    );
    println!("  3. Ask away: advisor ask -m \"Which plan suits 2 people with 10GB?\"");

    Ok(())
}

/// Answer one question and print the reply
pub async fn ask_command(message: String) -> Result<()> {
    let config = Config::load().await?;
    let handler = start_advisor(&config)?;

    let mut shell = ChatShell::new(handler, Arc::new(MemoryStore::new()));
    let answer = shell.submit(&message).await;
    println!("{}", answer);

    Ok(())
}

/// Interactive chat
pub async fn chat_command(session: Option<String>, persist: bool) -> Result<()> {
    let config = Config::load().await?;
    let handler = start_advisor(&config)?;

    let store: Arc<dyn SessionStore> = if persist || config.session.persist {
        let dir = advisor_config::sessions_dir();
        info!("Saving transcripts to {:?}", dir);
        Arc::new(FileStore::new(&dir).context("Failed to open sessions directory")?)
    } else {
        Arc::new(MemoryStore::new())
    };

    let mut shell = match session {
        Some(id) => ChatShell::resume(handler, store, &id)
            .await
            .with_context(|| format!("Failed to load session {}", id))?,
        None => ChatShell::new(handler, store),
    };

    terminal::run_stdio(&mut shell).await?;
    Ok(())
}

/// Show configuration and database status
pub async fn status_command() -> Result<()> {
    let config_path = advisor_config::config_path();

    println!("◆ Plan Advisor Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await?;
    println!("Model:     {}", config.default_model());
    println!(
        "API Key:   {} {}",
        config.model.api_key_env,
        if config.has_api_key() {
            "[Set]"
        } else {
            "[Missing]"
        }
    );

    let db_path = config.database_path();
    if db_path.exists() {
        let db = SqlDatabase::open(&db_path, config.database.sample_rows)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        let tables = db.table_names()?;
        println!(
            "Database:  {} [OK] ({} tables: {})",
            db_path.display(),
            tables.len(),
            tables.join(", ")
        );
    } else {
        println!("Database:  {} [Missing]", db_path.display());
    }

    println!(
        "Sessions:  {}",
        if config.session.persist {
            "[Persisted]"
        } else {
            "[In memory]"
        }
    );
    println!("Max iterations: {}", config.max_iterations());

    println!("\n◆ Ready");

    Ok(())
}
