use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use sommelier_core::config::AppConfig;
use toml::Value;

use crate::commands::{load_config, CommandResult};

pub fn run() -> CommandResult {
    match load_config("config") {
        Ok(config) => CommandResult::success("config", render(&config)),
        Err(failure) => failure,
    }
}

/// Effective values with the layer each one came from. Secrets are redacted.
pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let assistant = &config.assistant;

    let fields: Vec<(&str, String, Option<&str>)> = vec![
        ("database.url", config.database.url.clone(), Some("SOMMELIER_DATABASE_URL")),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            Some("SOMMELIER_DATABASE_MAX_CONNECTIONS"),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            Some("SOMMELIER_DATABASE_TIMEOUT_SECS"),
        ),
        ("llm.provider", format!("{:?}", config.llm.provider), Some("SOMMELIER_LLM_PROVIDER")),
        ("llm.model", config.llm.model.clone(), Some("SOMMELIER_LLM_MODEL")),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            Some("SOMMELIER_LLM_BASE_URL"),
        ),
        ("llm.api_key", api_key, Some("SOMMELIER_LLM_API_KEY")),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), Some("SOMMELIER_LLM_TIMEOUT_SECS")),
        ("llm.max_retries", config.llm.max_retries.to_string(), Some("SOMMELIER_LLM_MAX_RETRIES")),
        ("assistant.timezone", assistant.timezone.clone(), Some("SOMMELIER_ASSISTANT_TIMEZONE")),
        (
            "assistant.cheap_price_ceiling",
            assistant.cheap_price_ceiling.to_string(),
            Some("SOMMELIER_ASSISTANT_CHEAP_PRICE_CEILING"),
        ),
        (
            "assistant.premium_price_floor",
            assistant.premium_price_floor.to_string(),
            Some("SOMMELIER_ASSISTANT_PREMIUM_PRICE_FLOOR"),
        ),
        (
            "assistant.context_ttl_secs",
            assistant.context_ttl_secs.to_string(),
            Some("SOMMELIER_ASSISTANT_CONTEXT_TTL_SECS"),
        ),
        ("assistant.context_capacity", assistant.context_capacity.to_string(), None),
        ("assistant.candidate_window", assistant.candidate_window.to_string(), None),
        (
            "assistant.result_limit",
            assistant.result_limit.to_string(),
            Some("SOMMELIER_ASSISTANT_RESULT_LIMIT"),
        ),
        ("assistant.rotation_floor", assistant.rotation_floor.to_string(), None),
        (
            "assistant.category_similarity_threshold",
            assistant.category_similarity_threshold.to_string(),
            None,
        ),
        ("assistant.product_match_threshold", assistant.product_match_threshold.to_string(), None),
        ("assistant.max_message_chars", assistant.max_message_chars.to_string(), None),
        ("logging.level", config.logging.level.clone(), Some("SOMMELIER_LOGGING_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), Some("SOMMELIER_LOGGING_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("sommelier.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/sommelier.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a key's vendor prefix (`sk-`) and nothing else.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
