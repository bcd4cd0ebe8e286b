use anyhow::{bail, Context, Result};
use clap::Args;

use siteops::config::{DrainOptions, Requirement};
use siteops::report::{self, ConsoleSink, StatusSink};
use siteops::{BotApiClient, Convergence, WebhookReconciler};

use super::{print_reconcile_summary, ConfigArgs, PollArgs};

/// Remove and reinstall the webhook without draining any table
#[derive(Args)]
pub struct WebhookCommand {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    poll: PollArgs,
}

impl WebhookCommand {
    pub async fn run(&self) -> Result<()> {
        report::print_section("🔗 Telegram Webhook");
        let sink = ConsoleSink;

        sink.step(1, 3, "Loading configuration");
        let reset = self
            .config
            .resolve(&sink, Requirement::Webhook, &DrainOptions::default())?
            .into_reset()
            .context("webhook settings were not resolved")?;
        report::print_kv("Webhook URL", reset.webhook.url());

        sink.step(2, 3, "Managing Telegram webhook");
        let api = BotApiClient::with_base_url(reset.bot_token.clone(), &self.config.api_url)?;
        let result = WebhookReconciler::new(&api, &sink)
            .with_policy(self.poll.policy())
            .reconcile(&reset.webhook)
            .await?;

        sink.step(3, 3, "Summary");
        print_reconcile_summary(&result);

        if result.convergence == Convergence::ConvergedWithWarning {
            if self.poll.strict_verify {
                bail!(
                    "webhook not verified: expected {}, observed '{}'",
                    reset.webhook.url(),
                    result.final_url
                );
            }
            sink.warning("Webhook installed but not yet visible");
        } else {
            sink.success("Webhook installed and verified");
        }
        Ok(())
    }
}
