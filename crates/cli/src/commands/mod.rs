pub mod ask;
pub mod chat;
pub mod config;
pub mod migrate;
pub mod seed;

use std::sync::Arc;

use serde::Serialize;
use sommelier_agent::llm::GuardedLlm;
use sommelier_agent::{SessionRuntime, Sommelier};
use sommelier_core::config::{AppConfig, LoadOptions};
use sommelier_db::repositories::{
    SqlCatalogRepository, SqlInteractionRepository, SqlSessionRepository,
};
use sommelier_db::{connect_with_settings, migrations, DbPool};
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            session_id: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// A successful turn: the assistant reply plus the session it belongs to.
    pub fn reply(command: &str, session_id: &str, reply: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            session_id: Some(session_id.to_string()),
            message: reply.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            session_id: None,
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Error triple threaded through the async part of a command.
pub(crate) type Failure = (&'static str, String, u8);

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and applies pending migrations. An in-memory database lives on a
/// single connection, so its pool is capped at one.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let max_connections = if config.database.url.contains(":memory:") {
        1
    } else {
        config.database.max_connections
    };
    let pool = connect_with_settings(&config.database.url, max_connections, config.database.timeout_secs)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

/// Wires the assistant over the SQL catalog, session store and interaction log.
pub(crate) fn build_session_runtime(config: &AppConfig, pool: DbPool) -> Result<SessionRuntime, Failure> {
    let llm = GuardedLlm::from_config(&config.llm)
        .map_err(|error| ("llm_config", format!("text generation client: {error}"), 2u8))?;
    let catalog = Arc::new(SqlCatalogRepository::new(pool.clone()));
    let sessions = Arc::new(SqlSessionRepository::new(pool.clone()));
    let interactions = Arc::new(SqlInteractionRepository::new(pool));
    let assistant =
        Sommelier::new(catalog, llm, config.assistant.clone()).with_interactions(interactions);
    Ok(SessionRuntime::new(assistant, sessions))
}
