//! Per-record error taxonomy.
//!
//! Everything that can go wrong while turning one inventory identifier into
//! a STAC item is an [`IngestError`]. The batch runner uses
//! [`IngestError::is_fatal`] to decide whether the run stops, and
//! [`IngestError::ledger_category`] to pick the tag written to the error
//! ledger. Plumbing outside the per-record path (config, CLI, sinks) uses
//! `anyhow` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing credential configuration or a failed token exchange.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A metadata endpoint answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Source { status: u16, url: String },

    /// Metadata that parsed as JSON but is missing fields or is
    /// semantically invalid.
    #[error("invalid metadata: {0}")]
    Data(String),

    /// A response body that is not JSON.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// Connection-level failure talking to a metadata endpoint.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

impl IngestError {
    pub fn data(msg: impl Into<String>) -> Self {
        IngestError::Data(msg.into())
    }

    /// Only credential failures stop a batch; no token means no progress.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Auth(_))
    }

    /// Short tag recorded next to the identifier in the error ledger.
    pub fn ledger_category(&self) -> String {
        match self {
            IngestError::Source { status, .. } => status.to_string(),
            _ => "other".to_string(),
        }
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
