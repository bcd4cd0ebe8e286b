//! Backlog store access (PostgREST-style REST over Postgres tables).

pub mod client;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::TableName;

pub use client::PostgrestClient;

/// Outcome of a delete-all request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Rows (if any) were removed.
    Cleared,
    /// The table does not exist.
    NotFound,
}

/// Outcome of a verification read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowProbe {
    /// Number of rows returned, bounded by the requested limit.
    Rows(usize),
    /// The table does not exist.
    NotFound,
}

/// Operations the drainer needs from the backlog store.
#[async_trait]
pub trait BacklogStore: Send + Sync {
    /// Delete every row of `table`.
    async fn delete_all(&self, table: &TableName) -> Result<DeleteOutcome, StoreError>;

    /// Read at most `limit` rows of `table`, projecting only the key column.
    async fn probe(&self, table: &TableName, limit: usize) -> Result<RowProbe, StoreError>;
}
