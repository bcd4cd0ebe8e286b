//! Best-effort draining of backlog tables.
//!
//! Each table gets exactly one delete attempt and one verification read.
//! Nothing here is fatal: failures become warnings and the next table is
//! processed. Tables are independent, so a run may end with some tables
//! cleared and others not.

use serde::Serialize;
use tracing::{info, warn};

use crate::report::StatusSink;
use crate::store::{BacklogStore, DeleteOutcome, RowProbe};
use crate::types::TableName;

/// Rows requested by the verification read.
const VERIFY_LIMIT: usize = 1;

/// Per-table drain outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub table_name: TableName,
    /// False when the store reported the table as not found.
    pub existed: bool,
    pub cleared_successfully: bool,
    pub verified_empty: bool,
}

impl DrainReport {
    fn new(table_name: TableName) -> Self {
        Self {
            table_name,
            existed: true,
            cleared_successfully: false,
            verified_empty: false,
        }
    }

    /// One-line summary for the final report.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.existed {
            return format!("{} not found (skipped)", self.table_name);
        }
        match (self.cleared_successfully, self.verified_empty) {
            (true, true) => format!("{} cleared and verified empty", self.table_name),
            (true, false) => format!("{} cleared, emptiness not confirmed", self.table_name),
            (false, true) => format!("{} empty (delete failed)", self.table_name),
            (false, false) => format!("{} not cleared", self.table_name),
        }
    }
}

/// Whether every existing table was verified empty.
#[must_use]
pub fn all_verified_empty(reports: &[DrainReport]) -> bool {
    reports.iter().filter(|r| r.existed).all(|r| r.verified_empty)
}

/// Drains backlog tables through a [`BacklogStore`].
pub struct QueueDrainer<'a, S: BacklogStore + ?Sized> {
    store: &'a S,
    sink: &'a dyn StatusSink,
}

impl<'a, S: BacklogStore + ?Sized> QueueDrainer<'a, S> {
    pub fn new(store: &'a S, sink: &'a dyn StatusSink) -> Self {
        Self { store, sink }
    }

    /// Drain `tables` in order, one report per table.
    pub async fn drain(&self, tables: &[TableName]) -> Vec<DrainReport> {
        let mut reports = Vec::with_capacity(tables.len());
        for table in tables {
            reports.push(self.drain_one(table).await);
        }
        reports
    }

    async fn drain_one(&self, table: &TableName) -> DrainReport {
        let mut report = DrainReport::new(table.clone());

        self.sink.info(&format!("Deleting all rows from {table}..."));
        match self.store.delete_all(table).await {
            Ok(DeleteOutcome::Cleared) => {
                report.cleared_successfully = true;
                self.sink.success(&format!("{table} cleared"));
            }
            Ok(DeleteOutcome::NotFound) => {
                report.existed = false;
                self.sink.warning(&format!("{table} not found (skipped)"));
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to clear table");
                self.sink.warning(&format!("{table} clear failed: {e}"));
            }
        }

        self.sink.info(&format!("Verifying {table}..."));
        match self.store.probe(table, VERIFY_LIMIT).await {
            Ok(RowProbe::Rows(0)) => {
                report.verified_empty = true;
                self.sink.success(&format!("{table} is empty"));
            }
            Ok(RowProbe::Rows(_)) => {
                self.sink.warning(&format!("{table} still has data"));
            }
            Ok(RowProbe::NotFound) => {
                report.existed = false;
                self.sink
                    .warning(&format!("{table} not found during verify (skipped)"));
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to verify table");
                self.sink.warning(&format!("{table} verify failed: {e}"));
            }
        }

        info!(
            table = %table,
            existed = report.existed,
            cleared = report.cleared_successfully,
            verified_empty = report.verified_empty,
            "Table drain finished"
        );
        report
    }
}
