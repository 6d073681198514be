//! Diagnostic normalizer for evaluator responses.
//!
//! Folds evaluator log lines, evaluator-wide diagnostics, and per-parameter
//! diagnostics into one ordered [`Diagnostic`] list. Failures of the
//! evaluator call itself become a single internal diagnostic.

use crate::domain::{Diagnostic, EvaluatorError, PreviewOutput, Severity};

/// Normalize an evaluator response into the diagnostics feed.
///
/// Order is fixed: ERROR-level log lines, then evaluator-wide diagnostics,
/// then per-parameter diagnostics. Source order is kept within each group.
/// Lower-severity log lines are dropped; they duplicate explicit diagnostics.
pub fn normalize(output: &PreviewOutput) -> Vec<Diagnostic> {
    let from_logs = output
        .parser_logs
        .iter()
        .filter(|log| log.is_error())
        .map(|log| Diagnostic::TopLevel {
            severity: Severity::Error,
            summary: log.msg.clone(),
            detail: log.err.clone().unwrap_or_default(),
        });

    let top_level = output.diags.iter().flatten().map(|d| Diagnostic::TopLevel {
        severity: d.severity,
        summary: d.summary.clone(),
        detail: d.detail.clone(),
    });

    let per_parameter = output.parameters().iter().flat_map(|p| {
        p.present_diagnostics().map(|d| Diagnostic::Parameter {
            parameter_name: p.name.clone(),
            severity: d.severity,
            summary: d.summary.clone(),
            detail: d.detail.clone(),
        })
    });

    from_logs.chain(top_level).chain(per_parameter).collect()
}

/// Decode the evaluator's raw JSON string.
///
/// A missing string and unparsable JSON are both errors; callers convert
/// them with [`internal_diagnostic`].
pub fn decode_response(raw: Option<&str>) -> Result<PreviewOutput, EvaluatorError> {
    let raw = raw.ok_or(EvaluatorError::MissingOutput)?;
    Ok(serde_json::from_str(raw)?)
}

/// The single diagnostic raised when the evaluator call fails.
pub fn internal_diagnostic(err: &EvaluatorError) -> Diagnostic {
    Diagnostic::Internal {
        summary: err.kind().to_string(),
        detail: err.to_string(),
    }
}
