//! CLI subcommands and the argument groups they share.

pub mod drain;
pub mod reset;
pub mod seed;
pub mod status;
pub mod webhook;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use siteops::config::{
    load_dotenv, ConfigResolver, DrainOptions, EnvSource, Field, JsonFileSource, RawSettings,
    Requirement, ResolvedConfig, TerminalPrompter, DEFAULT_ENV_FILE,
};
use siteops::drain::DrainReport;
use siteops::reconcile::{Convergence, ConvergencePolicy, ReconciliationResult};
use siteops::report::{self, StatusSink};
use siteops::telegram::client::API_BASE_URL;
use siteops::TableName;

/// Where settings come from.
#[derive(Args, Clone)]
pub struct ConfigArgs {
    /// JSON config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dotenv file loaded before reading the environment
    #[arg(long, value_name = "FILE", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Fail on missing settings instead of prompting
    #[arg(long)]
    pub non_interactive: bool,

    /// Webhook callback URL (overrides file and environment)
    #[arg(long, value_name = "URL")]
    pub webhook_url: Option<String>,

    /// Update kind to subscribe to (repeatable)
    #[arg(long = "allowed-update", value_name = "KIND")]
    pub allowed_updates: Vec<String>,

    /// Maximum concurrent webhook connections (1-100)
    #[arg(long, value_name = "N")]
    pub max_connections: Option<u32>,

    /// Backlog store project URL (overrides file and environment)
    #[arg(long, value_name = "URL")]
    pub store_url: Option<String>,

    /// Bot API base URL, for a self-hosted Bot API server
    #[arg(long, env = "TELEGRAM_API_URL", default_value = API_BASE_URL)]
    pub api_url: String,
}

impl ConfigArgs {
    fn flag_settings(&self) -> RawSettings {
        let mut flags = RawSettings::new();
        flags.set(Field::WebhookUrl, self.webhook_url.clone());
        flags.set(Field::StoreUrl, self.store_url.clone());
        if !self.allowed_updates.is_empty() {
            flags.allowed_updates = Some(self.allowed_updates.clone());
        }
        flags.max_connections = self.max_connections.map(|n| n.to_string());
        flags
    }

    /// Resolve settings: flags, then config file, then environment, then prompts.
    pub fn resolve(
        &self,
        sink: &dyn StatusSink,
        requirement: Requirement,
        drain: &DrainOptions,
    ) -> Result<ResolvedConfig> {
        if load_dotenv(&self.env_file)? {
            sink.info(&format!("Loaded {}", self.env_file.display()));
        }

        let mut resolver = ConfigResolver::new(sink).source(self.flag_settings());
        if let Some(path) = &self.config {
            resolver = resolver.source(JsonFileSource::new(path));
        }
        resolver = resolver.source(EnvSource::from_process_env());
        if !self.non_interactive && std::io::stdin().is_terminal() {
            resolver = resolver.prompter(TerminalPrompter);
        }

        Ok(resolver.resolve(requirement, drain)?)
    }
}

/// Which tables to drain.
#[derive(Args, Clone)]
pub struct TableArgs {
    /// Backlog table to drain (repeatable; default: telegram_jobs, telegram_submissions)
    #[arg(long = "table", value_name = "NAME")]
    pub tables: Vec<TableName>,

    /// Column used to match every row
    #[arg(long, value_name = "COLUMN", default_value = "id")]
    pub primary_key: String,
}

impl TableArgs {
    pub fn options(&self) -> DrainOptions {
        DrainOptions {
            tables: if self.tables.is_empty() {
                TableName::defaults()
            } else {
                self.tables.clone()
            },
            primary_key: self.primary_key.clone(),
        }
    }
}

/// How long to wait for the webhook change to become visible.
#[derive(Args, Clone)]
pub struct PollArgs {
    /// Maximum getWebhookInfo polls per settle phase
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub poll_attempts: u32,

    /// Overall wait per settle phase, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 15)]
    pub poll_timeout_secs: u64,

    /// Fail the run when the installed URL is not observed
    #[arg(long)]
    pub strict_verify: bool,
}

impl PollArgs {
    pub fn policy(&self) -> ConvergencePolicy {
        ConvergencePolicy {
            max_attempts: self.poll_attempts,
            timeout: Duration::from_secs(self.poll_timeout_secs),
            ..ConvergencePolicy::default()
        }
    }
}

/// Print the per-table drain lines.
pub fn print_drain_summary(reports: &[DrainReport]) {
    for r in reports {
        report::print_check_result(&r.summary(), !r.existed || r.verified_empty);
    }
}

/// Print the webhook part of the final summary.
pub fn print_reconcile_summary(result: &ReconciliationResult) {
    report::print_check_result("Webhook deleted", result.deleted);
    report::print_check_result("Webhook recreated", result.set);
    report::print_check_result("Webhook verified", result.verified);
    if result.convergence == Convergence::ConvergedWithWarning {
        report::print_kv("Observed URL", &result.final_url);
    }
}
