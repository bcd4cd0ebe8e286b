//! Operator maintenance tooling for the content site.
//!
//! - Reset the Telegram bot: drain the backlog tables in the PostgREST store,
//!   then remove and reinstall the webhook and wait for it to converge.
//! - Generate a WordPress (WXR) import file of seed articles.
//!
//! # Example
//!
//! ```no_run
//! use siteops::{
//!     BotApiClient, ConsoleSink, PostgrestClient, ResetFlow, Secret, TableName, WebhookConfig,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let sink = ConsoleSink;
//! let api = BotApiClient::new(Secret::new("123456:token"))?;
//! let store = PostgrestClient::new("https://xyz.supabase.co", Secret::new("key"), "id")?;
//! let desired = WebhookConfig::new("https://example.org/webhook", Secret::new("s3cr3t"))?;
//!
//! let summary = ResetFlow::new(&api, &sink)
//!     .with_store(&store)
//!     .run(&desired, &TableName::defaults())
//!     .await?;
//! assert!(summary.reconciliation.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod drain;
pub mod error;
pub mod flow;
pub mod reconcile;
pub mod report;
pub mod store;
pub mod telegram;
pub mod types;
pub mod wxr;

pub use config::{ConfigResolver, ResetConfig, StoreConfig};
pub use drain::{DrainReport, QueueDrainer};
pub use error::{ApiError, ConfigError, ReconcileError, StoreError};
pub use flow::{FlowError, ResetFlow, RunSummary};
pub use reconcile::{Convergence, ConvergencePolicy, ReconciliationResult, WebhookReconciler};
pub use report::{ConsoleSink, MemorySink, StatusSink};
pub use store::{BacklogStore, PostgrestClient};
pub use telegram::{BotApiClient, WebhookApi};
pub use types::{Secret, TableName, WebhookConfig, WebhookState};
