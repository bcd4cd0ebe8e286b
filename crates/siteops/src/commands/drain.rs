use anyhow::{Context, Result};
use clap::Args;

use siteops::config::Requirement;
use siteops::drain::all_verified_empty;
use siteops::report::{self, ConsoleSink, StatusSink};
use siteops::store::client::project_ref;
use siteops::{PostgrestClient, QueueDrainer};

use super::{print_drain_summary, ConfigArgs, TableArgs};

/// Clear the backlog tables without touching the webhook
#[derive(Args)]
pub struct DrainCommand {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    tables: TableArgs,
}

impl DrainCommand {
    pub async fn run(&self) -> Result<()> {
        report::print_section("🧹 Backlog Drain");
        let sink = ConsoleSink;

        sink.step(1, 3, "Loading configuration");
        let store_config = self
            .config
            .resolve(&sink, Requirement::StoreOnly, &self.tables.options())?
            .store
            .context("store settings were not resolved")?;
        report::print_kv("Store", &store_config.base_url);
        if let Some(project) = project_ref(&store_config.base_url) {
            report::print_kv("Supabase project", &project);
        }

        sink.step(2, 3, "Resetting backlog tables");
        let store = PostgrestClient::new(
            &store_config.base_url,
            store_config.service_key.clone(),
            &store_config.primary_key,
        )?;
        let reports = QueueDrainer::new(&store, &sink)
            .drain(&store_config.tables)
            .await;

        sink.step(3, 3, "Summary");
        print_drain_summary(&reports);
        if all_verified_empty(&reports) {
            sink.success("Backlog tables are empty");
        } else {
            sink.warning("Some tables could not be confirmed empty");
        }
        Ok(())
    }
}
