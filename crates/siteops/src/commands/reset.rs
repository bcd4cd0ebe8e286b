use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};

use siteops::config::{Requirement, ResetConfig};
use siteops::report::{self, ConsoleSink, StatusSink};
use siteops::store::client::project_ref;
use siteops::{BotApiClient, PostgrestClient, ResetFlow};

use super::{print_drain_summary, print_reconcile_summary, ConfigArgs, PollArgs, TableArgs};

/// Drain backlog tables and reinstall the webhook
#[derive(Args)]
pub struct ResetCommand {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    tables: TableArgs,

    #[command(flatten)]
    poll: PollArgs,

    /// Reinstall the webhook without touching the backlog tables
    #[arg(long)]
    skip_drain: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

impl ResetCommand {
    pub async fn run(&self) -> Result<()> {
        report::print_section("🚀 Telegram Bot Reset");
        let sink = ConsoleSink;

        // Step 1: Resolve configuration
        sink.step(1, 4, "Loading configuration");
        let requirement = if self.skip_drain {
            Requirement::Webhook
        } else {
            Requirement::Full
        };
        let reset = self
            .config
            .resolve(&sink, requirement, &self.tables.options())?
            .into_reset()
            .context("webhook settings were not resolved")?;

        println!();
        print_config_summary(&reset);
        println!();

        if !self.confirm()? {
            println!("{}", "Reset cancelled.".yellow());
            return Ok(());
        }

        // Steps 2 and 3: drain, then reconcile
        let api = BotApiClient::with_base_url(reset.bot_token.clone(), &self.config.api_url)?;
        let store = reset
            .store
            .as_ref()
            .map(|s| PostgrestClient::new(&s.base_url, s.service_key.clone(), &s.primary_key))
            .transpose()?;

        let mut flow = ResetFlow::new(&api, &sink)
            .with_policy(self.poll.policy())
            .strict_verify(self.poll.strict_verify);
        if let Some(store) = &store {
            flow = flow.with_store(store);
        }
        let tables = reset
            .store
            .as_ref()
            .map(|s| s.tables.clone())
            .unwrap_or_default();

        let summary = flow.run(&reset.webhook, &tables).await?;

        // Step 4: Report
        sink.step(4, 4, "Summary");
        report::print_section("📋 Reset Summary");
        print_drain_summary(&summary.drain);
        if let Some(result) = &summary.reconciliation {
            print_reconcile_summary(result);
        }
        println!();

        if summary.is_clean() {
            sink.success("Bot reset complete");
        } else {
            sink.warning("Bot reset finished with warnings");
        }
        Ok(())
    }

    fn confirm(&self) -> Result<bool> {
        if self.yes || self.config.non_interactive || !std::io::stdin().is_terminal() {
            return Ok(true);
        }
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Proceed with reset?")
            .default(true)
            .interact()?;
        Ok(proceed)
    }
}

fn print_config_summary(reset: &ResetConfig) {
    report::print_kv("Bot token", &reset.bot_token.masked());
    report::print_kv("Webhook URL", reset.webhook.url());
    report::print_kv("Secret token", &reset.webhook.secret_token().masked());
    report::print_kv(
        "Allowed updates",
        &reset.webhook.allowed_updates().join(", "),
    );
    report::print_kv(
        "Max connections",
        &reset.webhook.max_connections().to_string(),
    );
    if let Some(store) = &reset.store {
        report::print_kv("Store", &store.base_url);
        if let Some(project) = project_ref(&store.base_url) {
            report::print_kv("Supabase project", &project);
        }
        let names: Vec<&str> = store.tables.iter().map(|t| t.as_str()).collect();
        report::print_kv("Tables", &names.join(", "));
    }
}
