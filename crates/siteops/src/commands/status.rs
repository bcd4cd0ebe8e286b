use anyhow::{Context, Result};
use clap::Args;

use siteops::config::{DrainOptions, Requirement};
use siteops::report::{self, ConsoleSink};
use siteops::{BotApiClient, WebhookApi};

use super::ConfigArgs;

/// Show what the Bot API reports for the webhook
#[derive(Args)]
pub struct StatusCommand {
    #[command(flatten)]
    config: ConfigArgs,

    /// Print the raw state as JSON
    #[arg(long)]
    json: bool,
}

impl StatusCommand {
    pub async fn run(&self) -> Result<()> {
        let sink = ConsoleSink;
        let bot_token = self
            .config
            .resolve(&sink, Requirement::BotOnly, &DrainOptions::default())?
            .bot_token
            .context("bot token was not resolved")?;

        let api = BotApiClient::with_base_url(bot_token, &self.config.api_url)?;
        let state = api
            .get_webhook_info()
            .await
            .context("failed to read webhook info")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(());
        }

        report::print_section("🔗 Webhook Status");
        if state.is_set() {
            report::print_kv("URL", &state.current_url);
        } else {
            report::print_kv("URL", "(not set)");
        }
        report::print_kv("Pending updates", &state.pending_update_count.to_string());
        if let Some(max) = state.max_connections {
            report::print_kv("Max connections", &max.to_string());
        }
        if let Some(kinds) = &state.allowed_updates {
            report::print_kv("Allowed updates", &kinds.join(", "));
        }
        if let Some(message) = &state.last_error_message {
            let when = state
                .last_error_at()
                .map_or_else(|| "unknown time".to_string(), |at| at.to_rfc3339());
            report::print_kv("Last error", &format!("{message} ({when})"));
        }
        Ok(())
    }
}
