use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::MemoryPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Conversation policy: business thresholds and session limits.
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub timezone: String,
    pub cheap_price_ceiling: Decimal,
    pub premium_price_floor: Decimal,
    pub context_ttl_secs: i64,
    pub context_capacity: usize,
    pub candidate_window: usize,
    pub result_limit: usize,
    pub rotation_floor: usize,
    pub category_similarity_threshold: f64,
    pub product_match_threshold: f64,
    pub max_message_chars: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    Ollama,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://sommelier.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Disabled,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 20,
                max_retries: 1,
            },
            assistant: AssistantConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Asuncion".to_string(),
            cheap_price_ceiling: Decimal::from(10),
            premium_price_floor: Decimal::from(25),
            context_ttl_secs: crate::memory::DEFAULT_CONTEXT_TTL_SECS,
            context_capacity: crate::memory::DEFAULT_CONTEXT_CAPACITY,
            candidate_window: 30,
            result_limit: 6,
            rotation_floor: 3,
            category_similarity_threshold: 0.35,
            product_match_threshold: 0.6,
            max_message_chars: 1000,
        }
    }
}

impl AssistantConfig {
    /// Local timezone for greetings; validation guarantees the name parses.
    pub fn tz(&self) -> Tz {
        self.timezone.parse::<Tz>().unwrap_or(chrono_tz::UTC)
    }

    pub fn memory_policy(&self) -> MemoryPolicy {
        MemoryPolicy {
            ttl: chrono::Duration::seconds(self.context_ttl_secs),
            capacity: self.context_capacity,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama|disabled)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("sommelier.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(assistant) = patch.assistant {
            let target = &mut self.assistant;
            if let Some(timezone) = assistant.timezone {
                target.timezone = timezone;
            }
            if let Some(value) = assistant.cheap_price_ceiling {
                target.cheap_price_ceiling = value;
            }
            if let Some(value) = assistant.premium_price_floor {
                target.premium_price_floor = value;
            }
            if let Some(value) = assistant.context_ttl_secs {
                target.context_ttl_secs = value;
            }
            if let Some(value) = assistant.context_capacity {
                target.context_capacity = value;
            }
            if let Some(value) = assistant.candidate_window {
                target.candidate_window = value;
            }
            if let Some(value) = assistant.result_limit {
                target.result_limit = value;
            }
            if let Some(value) = assistant.rotation_floor {
                target.rotation_floor = value;
            }
            if let Some(value) = assistant.category_similarity_threshold {
                target.category_similarity_threshold = value;
            }
            if let Some(value) = assistant.product_match_threshold {
                target.product_match_threshold = value;
            }
            if let Some(value) = assistant.max_message_chars {
                target.max_message_chars = value;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SOMMELIER_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SOMMELIER_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("SOMMELIER_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SOMMELIER_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("SOMMELIER_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SOMMELIER_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SOMMELIER_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SOMMELIER_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SOMMELIER_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SOMMELIER_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("SOMMELIER_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SOMMELIER_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_env("SOMMELIER_LLM_MAX_RETRIES", &value)?;
        }

        let assistant = &mut self.assistant;
        if let Some(value) = read_env("SOMMELIER_ASSISTANT_TIMEZONE") {
            assistant.timezone = value;
        }
        if let Some(value) = read_env("SOMMELIER_ASSISTANT_CHEAP_PRICE_CEILING") {
            assistant.cheap_price_ceiling =
                parse_env("SOMMELIER_ASSISTANT_CHEAP_PRICE_CEILING", &value)?;
        }
        if let Some(value) = read_env("SOMMELIER_ASSISTANT_PREMIUM_PRICE_FLOOR") {
            assistant.premium_price_floor =
                parse_env("SOMMELIER_ASSISTANT_PREMIUM_PRICE_FLOOR", &value)?;
        }
        if let Some(value) = read_env("SOMMELIER_ASSISTANT_CONTEXT_TTL_SECS") {
            assistant.context_ttl_secs = parse_env("SOMMELIER_ASSISTANT_CONTEXT_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("SOMMELIER_ASSISTANT_RESULT_LIMIT") {
            assistant.result_limit = parse_env("SOMMELIER_ASSISTANT_RESULT_LIMIT", &value)?;
        }

        let log_level =
            read_env("SOMMELIER_LOGGING_LEVEL").or_else(|| read_env("SOMMELIER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SOMMELIER_LOGGING_FORMAT").or_else(|| read_env("SOMMELIER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(timezone) = overrides.timezone {
            self.assistant.timezone = timezone;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_assistant(&self.assistant)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("sommelier.toml"), PathBuf::from("config/sommelier.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_retries > 1 {
        return Err(ConfigError::Validation(
            "llm.max_retries must be 0 or 1; text generation is retried at most once".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
        LlmProvider::Disabled => {}
    }

    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.timezone.parse::<Tz>().is_err() {
        return Err(ConfigError::Validation(format!(
            "assistant.timezone `{}` is not an IANA timezone name",
            assistant.timezone
        )));
    }

    if assistant.cheap_price_ceiling <= Decimal::ZERO
        || assistant.premium_price_floor < assistant.cheap_price_ceiling
    {
        return Err(ConfigError::Validation(
            "assistant.cheap_price_ceiling must be positive and not above premium_price_floor"
                .to_string(),
        ));
    }

    if assistant.context_ttl_secs <= 0 || assistant.context_capacity == 0 {
        return Err(ConfigError::Validation(
            "assistant.context_ttl_secs and context_capacity must be greater than zero".to_string(),
        ));
    }

    if assistant.result_limit == 0 || assistant.candidate_window < assistant.result_limit {
        return Err(ConfigError::Validation(
            "assistant.candidate_window must be at least result_limit, which must be positive"
                .to_string(),
        ));
    }

    if assistant.rotation_floor > assistant.result_limit {
        return Err(ConfigError::Validation(
            "assistant.rotation_floor must not exceed result_limit".to_string(),
        ));
    }

    for (name, value) in [
        ("category_similarity_threshold", assistant.category_similarity_threshold),
        ("product_match_threshold", assistant.product_match_threshold),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "assistant.{name} must be in range (0, 1]"
            )));
        }
    }

    if assistant.max_message_chars == 0 {
        return Err(ConfigError::Validation(
            "assistant.max_message_chars must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    assistant: Option<AssistantPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    timezone: Option<String>,
    cheap_price_ceiling: Option<Decimal>,
    premium_price_floor: Option<Decimal>,
    context_ttl_secs: Option<i64>,
    context_capacity: Option<usize>,
    candidate_window: Option<usize>,
    result_limit: Option<usize>,
    rotation_floor: Option<usize>,
    category_similarity_threshold: Option<f64>,
    product_match_threshold: Option<f64>,
    max_message_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
