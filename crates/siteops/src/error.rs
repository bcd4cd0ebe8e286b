//! Error types for configuration, the Bot API, and the backlog store.

use thiserror::Error;

/// Errors raised while resolving or validating configuration.
///
/// All of these are fatal and are raised before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field has no value in any source.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A field still carries the template placeholder.
    #[error("Setting {0} still contains a placeholder value")]
    Placeholder(&'static str),

    /// A field is present but not acceptable.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for any accepted layout.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Interactive prompt failed or was cancelled.
    #[error("Prompt failed: {0}")]
    Prompt(String),
}

/// Errors returned by the webhook control API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with `ok: false`.
    #[error("API rejected request{}: {description}", code_suffix(*code))]
    Rejected {
        code: Option<i64>,
        description: String,
    },

    /// Non-success status without a usable envelope.
    #[error("API returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors returned by the backlog store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Unexpected status code.
    #[error("Store returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fatal reconciliation failure.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The install-subscription call failed. The bot may be left with no
    /// active subscription.
    #[error("Failed to install webhook: {0}")]
    InstallFailed(#[source] ApiError),
}

fn code_suffix(code: Option<i64>) -> String {
    code.map(|c| format!(" (code {c})")).unwrap_or_default()
}

/// Render an error and its sources on one line. A source whose text is
/// already part of the line is not repeated.
#[must_use]
pub fn display_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut line = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !line.contains(&text) {
            line.push_str(": ");
            line.push_str(&text);
        }
        source = cause.source();
    }
    line
}

/// Truncate a response body for log and error output.
pub(crate) fn truncate_body(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        body.to_string()
    } else {
        let mut out: String = body.chars().take(max).collect();
        out.push('…');
        out
    }
}
