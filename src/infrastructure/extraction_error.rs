//! Extraction error taxonomy
//!
//! Field- and position-level failures are recoverable and never leave the
//! extraction loop; only `SessionFault` crosses the per-URL boundary.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Node not found within {timeout_ms}ms: {locator}")]
    NotFound { locator: String, timeout_ms: u64 },

    #[error("Could not parse {field} from '{raw}': {reason}")]
    ParseError {
        field: String,
        raw: String,
        reason: String,
    },

    #[error("Browser session fault: {message}")]
    SessionFault { message: String },
}

impl ExtractionError {
    /// Create a not-found error for a locator and the wait that elapsed
    pub fn not_found(locator: impl ToString, timeout_ms: u64) -> Self {
        Self::NotFound {
            locator: locator.to_string(),
            timeout_ms,
        }
    }

    /// Not-found error for a wait of `timeout`, saturating at `u64::MAX` ms
    pub fn not_found_after(locator: impl ToString, timeout: Duration) -> Self {
        Self::not_found(locator, u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    }

    /// Create a parse error for a field's raw text
    pub fn parse_error(field: impl ToString, raw: &str, reason: &str) -> Self {
        Self::ParseError {
            field: field.to_string(),
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a session fault from any displayable cause
    pub fn session_fault(message: impl ToString) -> Self {
        Self::SessionFault {
            message: message.to_string(),
        }
    }

    /// Stable label used in log lines and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ParseError { .. } => "parse_error",
            Self::SessionFault { .. } => "session_fault",
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::ParseError { .. } => true,
            Self::SessionFault { .. } => false,
        }
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;
