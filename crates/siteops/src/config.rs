//! Configuration resolution.
//!
//! Settings are gathered field by field from an ordered list of
//! [`ConfigSource`]s (CLI flags, JSON file, environment). Anything still
//! missing is requested through a [`Prompter`] when one is configured.
//! The merged result is validated into a [`ResetConfig`] before any remote
//! call is made.
//!
//! # Environment
//!
//! - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_SECRET_TOKEN`, `TELEGRAM_WEBHOOK_URL`
//! - `TELEGRAM_ALLOWED_UPDATES` (comma separated), `TELEGRAM_MAX_CONNECTIONS`
//! - `SUPABASE_URL` (or `NEXT_PUBLIC_SUPABASE_URL`), `SUPABASE_SERVICE_ROLE_KEY`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::report::StatusSink;
use crate::types::{Secret, TableName, WebhookConfig};

/// Marker left in template config files.
const PLACEHOLDER_MARKER: &str = "YOUR";

/// Default dotenv file loaded before reading the environment.
pub const DEFAULT_ENV_FILE: &str = ".env.local";

static BOT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:[A-Za-z0-9_-]+$").expect("valid regex"));

// =============================================================================
// Fields
// =============================================================================

/// A string setting that may come from any source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    BotToken,
    SecretToken,
    WebhookUrl,
    StoreUrl,
    ServiceKey,
}

impl Field {
    /// Stable name used in errors and logs.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::BotToken => "bot_token",
            Self::SecretToken => "secret_token",
            Self::WebhookUrl => "webhook_url",
            Self::StoreUrl => "store_url",
            Self::ServiceKey => "service_role_key",
        }
    }

    /// Environment variables checked in order.
    #[must_use]
    pub const fn env_vars(self) -> &'static [&'static str] {
        match self {
            Self::BotToken => &["TELEGRAM_BOT_TOKEN"],
            Self::SecretToken => &["TELEGRAM_SECRET_TOKEN"],
            Self::WebhookUrl => &["TELEGRAM_WEBHOOK_URL"],
            Self::StoreUrl => &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"],
            Self::ServiceKey => &["SUPABASE_SERVICE_ROLE_KEY"],
        }
    }

    const fn prompt(self) -> &'static str {
        match self {
            Self::BotToken => "Telegram Bot Token (from @BotFather)",
            Self::SecretToken => "Telegram Secret Token (1-256 chars: A-Z a-z 0-9 _ -)",
            Self::WebhookUrl => "Webhook URL (https://...)",
            Self::StoreUrl => "Supabase URL (https://xxx.supabase.co)",
            Self::ServiceKey => "Supabase Service Role Key",
        }
    }

    const fn is_secret(self) -> bool {
        matches!(self, Self::BotToken | Self::SecretToken | Self::ServiceKey)
    }
}

/// Settings collected from one source. Absent and blank values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSettings {
    values: HashMap<Field, String>,
    pub allowed_updates: Option<Vec<String>>,
    /// Unparsed; checked only when a webhook is being resolved.
    pub max_connections: Option<String>,
}

impl RawSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; blank values are ignored.
    pub fn set(&mut self, field: Field, value: Option<String>) {
        if let Some(value) = value.map(|v| v.trim().to_string()) {
            if !value.is_empty() {
                self.values.insert(field, value);
            }
        }
    }

    #[must_use]
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }
}

// =============================================================================
// Sources
// =============================================================================

/// A place settings can be read from.
pub trait ConfigSource: Send + Sync {
    /// Human-readable name ("environment", "config file ...").
    fn name(&self) -> String;

    /// Read whatever this source provides.
    fn load(&self) -> Result<RawSettings, ConfigError>;
}

impl ConfigSource for RawSettings {
    fn name(&self) -> String {
        "command line".to_string()
    }

    fn load(&self) -> Result<RawSettings, ConfigError> {
        Ok(self.clone())
    }
}

/// JSON config file.
///
/// Two layouts are accepted:
///
/// ```json
/// { "telegram": { "bot_token": "...", "secret_token": "...", "webhook_url": "..." },
///   "supabase": { "url": "...", "service_role_key": "..." } }
/// ```
///
/// ```json
/// { "telegram_bot_token": "...", "telegram_secret_token": "...", "webhook_url": "..." }
/// ```
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Nested(NestedFile),
    Flat(FlatFile),
}

#[derive(Deserialize)]
struct NestedFile {
    telegram: TelegramSection,
    supabase: Option<SupabaseSection>,
}

#[derive(Deserialize)]
struct TelegramSection {
    bot_token: Option<String>,
    secret_token: Option<String>,
    webhook_url: Option<String>,
    allowed_updates: Option<Vec<String>>,
    max_connections: Option<u32>,
}

#[derive(Deserialize)]
struct SupabaseSection {
    url: Option<String>,
    service_role_key: Option<String>,
}

#[derive(Deserialize)]
struct FlatFile {
    telegram_bot_token: Option<String>,
    telegram_secret_token: Option<String>,
    webhook_url: Option<String>,
    supabase_url: Option<String>,
    supabase_service_role_key: Option<String>,
    allowed_updates: Option<Vec<String>>,
    max_connections: Option<u32>,
}

impl From<ConfigFile> for RawSettings {
    fn from(file: ConfigFile) -> Self {
        let mut raw = RawSettings::new();
        match file {
            ConfigFile::Nested(nested) => {
                raw.set(Field::BotToken, nested.telegram.bot_token);
                raw.set(Field::SecretToken, nested.telegram.secret_token);
                raw.set(Field::WebhookUrl, nested.telegram.webhook_url);
                raw.allowed_updates = nested.telegram.allowed_updates;
                raw.max_connections = nested.telegram.max_connections.map(|n| n.to_string());
                if let Some(supabase) = nested.supabase {
                    raw.set(Field::StoreUrl, supabase.url);
                    raw.set(Field::ServiceKey, supabase.service_role_key);
                }
            }
            ConfigFile::Flat(flat) => {
                raw.set(Field::BotToken, flat.telegram_bot_token);
                raw.set(Field::SecretToken, flat.telegram_secret_token);
                raw.set(Field::WebhookUrl, flat.webhook_url);
                raw.set(Field::StoreUrl, flat.supabase_url);
                raw.set(Field::ServiceKey, flat.supabase_service_role_key);
                raw.allowed_updates = flat.allowed_updates;
                raw.max_connections = flat.max_connections.map(|n| n.to_string());
            }
        }
        raw
    }
}

impl ConfigSource for JsonFileSource {
    fn name(&self) -> String {
        format!("config file {}", self.path.display())
    }

    fn load(&self) -> Result<RawSettings, ConfigError> {
        let path = self.path.display().to_string();
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        debug!(path = %self.path.display(), "Loaded config file");
        Ok(file.into())
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variables, read through an injectable lookup.
pub struct EnvSource {
    lookup: Lookup,
}

impl EnvSource {
    /// Read the process environment.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self {
            lookup: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read from a fixed map (tests).
    #[must_use]
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self {
            lookup: Box::new(move |key| vars.get(key).cloned()),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> String {
        "environment".to_string()
    }

    fn load(&self) -> Result<RawSettings, ConfigError> {
        let mut raw = RawSettings::new();
        for field in [
            Field::BotToken,
            Field::SecretToken,
            Field::WebhookUrl,
            Field::StoreUrl,
            Field::ServiceKey,
        ] {
            let value = field.env_vars().iter().find_map(|key| self.var(key));
            raw.set(field, value);
        }

        raw.allowed_updates = self.var("TELEGRAM_ALLOWED_UPDATES").map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });
        raw.max_connections = self
            .var("TELEGRAM_MAX_CONNECTIONS")
            .map(|v| v.trim().to_string());
        Ok(raw)
    }
}

/// Load a dotenv file into the process environment. Returns `false` when the
/// file does not exist. Variables already set are not overridden.
///
/// # Errors
/// Returns [`ConfigError::Io`] if the file exists but cannot be parsed.
pub fn load_dotenv(path: &Path) -> Result<bool, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "No dotenv file");
        return Ok(false);
    }
    dotenvy::from_path(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: std::io::Error::other(e.to_string()),
    })?;
    info!(path = %path.display(), "Loaded dotenv file");
    Ok(true)
}

// =============================================================================
// Prompting
// =============================================================================

/// Interactive fallback for missing settings.
pub trait Prompter: Send + Sync {
    /// Ask for a value. Secret values must not be echoed.
    fn prompt(&self, label: &str, secret: bool) -> Result<String, ConfigError>;
}

/// Terminal prompts via `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, label: &str, secret: bool) -> Result<String, ConfigError> {
        use dialoguer::{theme::ColorfulTheme, Input, Password};

        let theme = ColorfulTheme::default();
        let value = if secret {
            Password::with_theme(&theme)
                .with_prompt(format!("Enter {label}"))
                .interact()
        } else {
            Input::<String>::with_theme(&theme)
                .with_prompt(format!("Enter {label}"))
                .interact_text()
        };
        value
            .map(|v| v.trim().to_string())
            .map_err(|e| ConfigError::Prompt(e.to_string()))
    }
}

// =============================================================================
// Resolved configuration
// =============================================================================

/// Backlog store connection and the tables to drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_url: String,
    pub service_key: Secret,
    /// Column used in the delete predicate and verify projection.
    pub primary_key: String,
    pub tables: Vec<TableName>,
}

/// Fully validated configuration for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetConfig {
    pub bot_token: Secret,
    pub webhook: WebhookConfig,
    pub store: Option<StoreConfig>,
}

/// What a command needs resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Bot token only (inspection).
    BotOnly,
    /// Bot token and desired webhook.
    Webhook,
    /// Store credentials only.
    StoreOnly,
    /// Webhook and store.
    Full,
}

impl Requirement {
    fn fields(self) -> &'static [Field] {
        match self {
            Self::BotOnly => &[Field::BotToken],
            Self::Webhook => &[Field::BotToken, Field::SecretToken, Field::WebhookUrl],
            Self::StoreOnly => &[Field::StoreUrl, Field::ServiceKey],
            Self::Full => &[
                Field::BotToken,
                Field::SecretToken,
                Field::WebhookUrl,
                Field::StoreUrl,
                Field::ServiceKey,
            ],
        }
    }
}

/// Options that only come from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainOptions {
    pub tables: Vec<TableName>,
    pub primary_key: String,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self {
            tables: TableName::defaults(),
            primary_key: "id".to_string(),
        }
    }
}

/// Merges sources, prompts for gaps, and validates.
pub struct ConfigResolver<'a> {
    sources: Vec<Box<dyn ConfigSource + 'a>>,
    prompter: Option<Box<dyn Prompter + 'a>>,
    sink: &'a dyn StatusSink,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(sink: &'a dyn StatusSink) -> Self {
        Self {
            sources: Vec::new(),
            prompter: None,
            sink,
        }
    }

    /// Add a source. Earlier sources take precedence.
    #[must_use]
    pub fn source(mut self, source: impl ConfigSource + 'a) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    #[must_use]
    pub fn prompter(mut self, prompter: impl Prompter + 'a) -> Self {
        self.prompter = Some(Box::new(prompter));
        self
    }

    /// Merge every source, then prompt for required fields still missing.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a source fails, a prompt fails, or a
    /// required field is still missing.
    pub fn collect(&self, requirement: Requirement) -> Result<RawSettings, ConfigError> {
        let mut loaded = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            loaded.push((source.name(), source.load()?));
        }

        let mut merged = RawSettings::new();
        for &field in requirement.fields() {
            let found = loaded
                .iter()
                .find_map(|(name, raw)| raw.get(field).map(|v| (name, v.to_string())));

            let value = match (found, &self.prompter) {
                (Some((name, value)), _) => {
                    self.sink.success(&format!("{} found in {name}", field.key()));
                    value
                }
                (None, Some(prompter)) => {
                    self.sink
                        .info(&format!("{} not found, asking", field.key()));
                    prompter.prompt(field.prompt(), field.is_secret())?
                }
                (None, None) => return Err(ConfigError::Missing(field.key())),
            };
            merged.set(field, Some(value));
            if merged.get(field).is_none() {
                return Err(ConfigError::Missing(field.key()));
            }
        }

        merged.allowed_updates = loaded.iter().find_map(|(_, r)| r.allowed_updates.clone());
        merged.max_connections = loaded
            .iter()
            .find_map(|(_, r)| r.max_connections.clone());
        Ok(merged)
    }

    /// Collect and validate.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on any missing, placeholder, or invalid value.
    pub fn resolve(
        &self,
        requirement: Requirement,
        drain: &DrainOptions,
    ) -> Result<ResolvedConfig, ConfigError> {
        let raw = self.collect(requirement)?;
        validate(&raw, requirement, drain)
    }
}

/// Validated output; which parts are present depends on the [`Requirement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub bot_token: Option<Secret>,
    pub webhook: Option<WebhookConfig>,
    pub store: Option<StoreConfig>,
}

impl ResolvedConfig {
    /// Convert to a full [`ResetConfig`] when the webhook part is present.
    #[must_use]
    pub fn into_reset(self) -> Option<ResetConfig> {
        Some(ResetConfig {
            bot_token: self.bot_token?,
            webhook: self.webhook?,
            store: self.store,
        })
    }
}

fn required<'s>(raw: &'s RawSettings, field: Field) -> Result<&'s str, ConfigError> {
    let value = raw.get(field).ok_or(ConfigError::Missing(field.key()))?;
    if value.contains(PLACEHOLDER_MARKER) {
        return Err(ConfigError::Placeholder(field.key()));
    }
    Ok(value)
}

/// Validate merged settings for `requirement`.
///
/// # Errors
/// Returns [`ConfigError`] on any missing, placeholder, or invalid value.
pub fn validate(
    raw: &RawSettings,
    requirement: Requirement,
    drain: &DrainOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let fields = requirement.fields();

    let bot_token = if fields.contains(&Field::BotToken) {
        let token = required(raw, Field::BotToken)?;
        if !BOT_TOKEN_RE.is_match(token) {
            return Err(ConfigError::Invalid {
                field: "bot_token",
                reason: "expected <bot id>:<secret> as issued by @BotFather".to_string(),
            });
        }
        Some(Secret::new(token))
    } else {
        None
    };

    let webhook = if fields.contains(&Field::WebhookUrl) {
        let url = required(raw, Field::WebhookUrl)?;
        let secret = Secret::new(required(raw, Field::SecretToken)?);
        let mut webhook = WebhookConfig::new(url, secret)?;
        if let Some(kinds) = &raw.allowed_updates {
            webhook = webhook.with_allowed_updates(kinds.iter().cloned());
        }
        if let Some(max) = &raw.max_connections {
            let max = max.parse().map_err(|_| ConfigError::Invalid {
                field: "max_connections",
                reason: format!("'{max}' is not a number"),
            })?;
            webhook = webhook.with_max_connections(max)?;
        }
        Some(webhook)
    } else {
        None
    };

    let store = if fields.contains(&Field::StoreUrl) {
        let base_url = required(raw, Field::StoreUrl)?;
        let parsed = url::Url::parse(base_url).map_err(|e| ConfigError::Invalid {
            field: "store_url",
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "store_url",
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        if drain.tables.is_empty() {
            return Err(ConfigError::Invalid {
                field: "table",
                reason: "at least one table is required".to_string(),
            });
        }
        Some(StoreConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: Secret::new(required(raw, Field::ServiceKey)?),
            primary_key: drain.primary_key.clone(),
            tables: drain.tables.clone(),
        })
    } else {
        None
    };

    Ok(ResolvedConfig {
        bot_token,
        webhook,
        store,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use super::*;
    use crate::report::MemorySink;

    const BOT_TOKEN: &str = "123456:AAbbCC-dd_ee";

    fn env(pairs: &[(&str, &str)]) -> EnvSource {
        EnvSource::from_map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    fn full_env() -> EnvSource {
        env(&[
            ("TELEGRAM_BOT_TOKEN", BOT_TOKEN),
            ("TELEGRAM_SECRET_TOKEN", "s3cr3t-32chars-minimum"),
            ("TELEGRAM_WEBHOOK_URL", "https://example.org/webhook"),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://xyz.supabase.co/"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service-key"),
        ])
    }

    struct ScriptedPrompter {
        answers: Mutex<Vec<String>>,
        asked: Mutex<Vec<(String, bool)>>,
    }

    impl Prompter for ScriptedPrompter {
        fn prompt(&self, label: &str, secret: bool) -> Result<String, ConfigError> {
            self.asked.lock().unwrap().push((label.to_string(), secret));
            Ok(self.answers.lock().unwrap().remove(0))
        }
    }

    #[test]
    fn test_resolve_from_env() {
        let sink = MemorySink::new();
        let resolved = ConfigResolver::new(&sink)
            .source(full_env())
            .resolve(Requirement::Full, &DrainOptions::default())
            .unwrap();

        let reset = resolved.into_reset().unwrap();
        assert_eq!(reset.bot_token.expose(), BOT_TOKEN);
        assert_eq!(reset.webhook.url(), "https://example.org/webhook");
        let store = reset.store.unwrap();
        assert_eq!(store.base_url, "https://xyz.supabase.co");
        assert_eq!(store.tables, TableName::defaults());
        assert!(sink.contains("bot_token found in environment"));
    }

    #[test]
    fn test_earlier_source_wins() {
        let sink = MemorySink::new();
        let flags = RawSettings::new().with(Field::WebhookUrl, "https://override.example.org/hook");
        let resolved = ConfigResolver::new(&sink)
            .source(flags)
            .source(full_env())
            .resolve(Requirement::Webhook, &DrainOptions::default())
            .unwrap();

        assert_eq!(
            resolved.webhook.unwrap().url(),
            "https://override.example.org/hook"
        );
        assert!(resolved.store.is_none());
    }

    #[test]
    fn test_missing_without_prompter() {
        let sink = MemorySink::new();
        let err = ConfigResolver::new(&sink)
            .source(env(&[("TELEGRAM_BOT_TOKEN", BOT_TOKEN)]))
            .resolve(Requirement::Webhook, &DrainOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("secret_token")));
    }

    #[test]
    fn test_prompts_for_missing_secret() {
        let sink = MemorySink::new();
        let prompter = ScriptedPrompter {
            answers: Mutex::new(vec!["s3cr3t-32chars-minimum".to_string()]),
            asked: Mutex::new(Vec::new()),
        };
        let resolver = ConfigResolver::new(&sink)
            .source(env(&[
                ("TELEGRAM_BOT_TOKEN", BOT_TOKEN),
                ("TELEGRAM_WEBHOOK_URL", "https://example.org/webhook"),
            ]))
            .prompter(prompter);
        let resolved = resolver
            .resolve(Requirement::Webhook, &DrainOptions::default())
            .unwrap();

        assert_eq!(
            resolved.webhook.unwrap().secret_token().expose(),
            "s3cr3t-32chars-minimum"
        );
        assert!(sink.contains("secret_token not found"));
    }

    #[test]
    fn test_placeholder_rejected() {
        let sink = MemorySink::new();
        let err = ConfigResolver::new(&sink)
            .source(env(&[
                ("TELEGRAM_BOT_TOKEN", "YOUR_BOT_TOKEN"),
                ("TELEGRAM_SECRET_TOKEN", "s3cr3t"),
                ("TELEGRAM_WEBHOOK_URL", "https://example.org/webhook"),
            ]))
            .resolve(Requirement::Webhook, &DrainOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder("bot_token")));
    }

    #[test]
    fn test_malformed_bot_token_rejected() {
        let raw = RawSettings::new().with(Field::BotToken, "not-a-token");
        let err = validate(&raw, Requirement::BotOnly, &DrainOptions::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "bot_token", .. }));
    }

    #[test]
    fn test_env_tunables() {
        let raw = env(&[
            ("TELEGRAM_ALLOWED_UPDATES", "message, edited_message,,callback_query"),
            ("TELEGRAM_MAX_CONNECTIONS", "10"),
        ])
        .load()
        .unwrap();
        assert_eq!(
            raw.allowed_updates,
            Some(vec![
                "message".to_string(),
                "edited_message".to_string(),
                "callback_query".to_string()
            ])
        );
        assert_eq!(raw.max_connections.as_deref(), Some("10"));
    }

    #[test]
    fn test_bad_max_connections_only_fails_webhook_commands() {
        let vars = [
            ("TELEGRAM_BOT_TOKEN", BOT_TOKEN),
            ("TELEGRAM_SECRET_TOKEN", "s3cr3t-32chars-minimum"),
            ("TELEGRAM_WEBHOOK_URL", "https://example.org/webhook"),
            ("SUPABASE_URL", "https://xyz.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service-key"),
            ("TELEGRAM_MAX_CONNECTIONS", "many"),
        ];
        let sink = MemorySink::new();
        let drain = DrainOptions::default();

        for requirement in [Requirement::BotOnly, Requirement::StoreOnly] {
            let resolved = ConfigResolver::new(&sink)
                .source(env(&vars))
                .resolve(requirement, &drain);
            assert!(resolved.is_ok(), "{requirement:?} should ignore the tunable");
        }

        for requirement in [Requirement::Webhook, Requirement::Full] {
            let err = ConfigResolver::new(&sink)
                .source(env(&vars))
                .resolve(requirement, &drain)
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { field: "max_connections", .. }));
        }
    }

    #[test]
    fn test_json_nested_layout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "telegram": {{
                    "bot_token": "{BOT_TOKEN}",
                    "secret_token": "s3cr3t-32chars-minimum",
                    "webhook_url": "https://example.org/webhook",
                    "max_connections": 20
                }},
                "supabase": {{ "url": "https://xyz.supabase.co", "service_role_key": "key" }}
            }}"#
        )
        .unwrap();

        let raw = JsonFileSource::new(file.path()).load().unwrap();
        assert_eq!(raw.get(Field::BotToken), Some(BOT_TOKEN));
        assert_eq!(raw.get(Field::StoreUrl), Some("https://xyz.supabase.co"));
        assert_eq!(raw.max_connections.as_deref(), Some("20"));

        let resolved = validate(&raw, Requirement::Full, &DrainOptions::default()).unwrap();
        assert_eq!(resolved.webhook.unwrap().max_connections(), 20);
    }

    #[test]
    fn test_json_flat_layout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "telegram_bot_token": "{BOT_TOKEN}",
                "telegram_secret_token": "random_32_chars_string",
                "webhook_url": "https://example.org/webhook"
            }}"#
        )
        .unwrap();

        let raw = JsonFileSource::new(file.path()).load().unwrap();
        assert_eq!(raw.get(Field::SecretToken), Some("random_32_chars_string"));
        assert_eq!(raw.get(Field::ServiceKey), None);
    }

    #[test]
    fn test_json_missing_file() {
        let err = JsonFileSource::new("/nonexistent/telegram-config.json")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_json_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        let err = JsonFileSource::new(file.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_store_requires_tables() {
        let raw = RawSettings::new()
            .with(Field::StoreUrl, "https://xyz.supabase.co")
            .with(Field::ServiceKey, "key");
        let drain = DrainOptions {
            tables: vec![],
            primary_key: "id".to_string(),
        };
        assert!(validate(&raw, Requirement::StoreOnly, &drain).is_err());
    }

    #[test]
    fn test_load_dotenv_missing_file() {
        assert!(!load_dotenv(Path::new("/nonexistent/.env.local")).unwrap());
    }
}
