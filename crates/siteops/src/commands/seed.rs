use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use siteops::report::{self, ConsoleSink, StatusSink};
use siteops::wxr::{SiteInfo, WxrBuilder};

/// Write a WordPress import file with seed categories and articles
#[derive(Args)]
pub struct SeedCommand {
    /// Output file
    #[arg(short, long, value_name = "FILE", default_value = "seed_content.wxr.xml")]
    output: PathBuf,

    /// Site URL written into the channel and article links
    #[arg(long, value_name = "URL")]
    site_url: Option<String>,

    /// Site title written into the channel
    #[arg(long, value_name = "TITLE")]
    site_title: Option<String>,
}

impl SeedCommand {
    pub fn run(&self) -> Result<()> {
        let sink = ConsoleSink;

        let mut site = SiteInfo::default();
        if let Some(url) = &self.site_url {
            site.url = url.trim_end_matches('/').to_string();
        }
        if let Some(title) = &self.site_title {
            site.title.clone_from(title);
        }

        let builder = WxrBuilder::with_seed_content(site);
        let document = builder.render(Utc::now());
        std::fs::write(&self.output, document)
            .with_context(|| format!("failed to write {}", self.output.display()))?;

        sink.success(&format!(
            "Wrote {} articles to {}",
            builder.article_count(),
            self.output.display()
        ));
        report::print_kv("Import with", "WordPress → Tools → Import → WordPress");
        Ok(())
    }
}
