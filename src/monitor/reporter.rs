//! Error reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Broad class of a reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Validation,
    Strategy,
    Persistence,
}

/// How urgently a reported error needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Structured descriptor sent alongside a reported error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable summary
    pub message: String,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Originating component
    pub component: String,
    /// Snapshot of the offending data
    pub details: Value,
}

/// Sink for unexpected internal failures
pub trait ErrorReporter: Send + Sync {
    fn report_error(&self, error: &(dyn std::error::Error + 'static), context: &ErrorContext);
}

/// Reporter writing errors to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_error(&self, error: &(dyn std::error::Error + 'static), context: &ErrorContext) {
        tracing::error!(
            code = %context.code,
            category = ?context.category,
            severity = ?context.severity,
            component = %context.component,
            details = %context.details,
            error = %error,
            "{}",
            context.message
        );
    }
}
