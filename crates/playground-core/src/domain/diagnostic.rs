//! Normalized diagnostic types.

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic.
///
/// The evaluator is inconsistent about casing (`"error"` in diagnostics,
/// `"ERROR"` in log lines), so both spellings are accepted on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[serde(alias = "WARNING", alias = "Warning", alias = "warn", alias = "WARN")]
    Warning,
    #[serde(alias = "ERROR", alias = "Error")]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic exactly as the evaluator reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDiagnostic {
    pub severity: Severity,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub detail: String,

    /// Evaluator-specific payload (e.g. `{"code": "required"}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl RawDiagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            extra: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            extra: None,
        }
    }

    /// The `extra.code` tag, if the evaluator attached one.
    pub fn code(&self) -> Option<&str> {
        self.extra.as_ref()?.get("code")?.as_str()
    }
}

/// One problem to surface in the diagnostics panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    /// Scoped to a single parameter.
    Parameter {
        parameter_name: String,
        severity: Severity,
        summary: String,
        detail: String,
    },

    /// Evaluator-wide problem, or an ERROR-level evaluator log line.
    TopLevel {
        severity: Severity,
        summary: String,
        detail: String,
    },

    /// The evaluator call itself failed.
    Internal { summary: String, detail: String },
}

impl Diagnostic {
    /// Internal diagnostics are always errors.
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Parameter { severity, .. } | Diagnostic::TopLevel { severity, .. } => {
                *severity
            }
            Diagnostic::Internal { .. } => Severity::Error,
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            Diagnostic::Parameter { summary, .. }
            | Diagnostic::TopLevel { summary, .. }
            | Diagnostic::Internal { summary, .. } => summary,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Diagnostic::Parameter { detail, .. }
            | Diagnostic::TopLevel { detail, .. }
            | Diagnostic::Internal { detail, .. } => detail,
        }
    }

    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            Diagnostic::Parameter { parameter_name, .. } => Some(parameter_name),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.severity().as_str().to_uppercase())?;
        if let Some(name) = self.parameter_name() {
            write!(f, " ({})", name)?;
        }
        write!(f, ": {}", self.summary())?;
        if !self.detail().is_empty() {
            write!(f, "\n{}", self.detail())?;
        }
        Ok(())
    }
}
