//! Structured lifecycle events for the recompute loop.
//!
//! Every event is an `info!` record with an `event` field, so a JSON log
//! stream can be filtered with `event == "recompute.finished"` and similar.

use tracing::info;

use crate::reconcile::ReconcileStats;

/// Span that tags everything logged by one playground loop.
///
/// Attach it with `tracing::Instrument` rather than entering it, since the
/// loop holds it across awaits.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("playground.session", session_id = %session_id)
}

/// An evaluator call was started.
pub fn emit_recompute_started(seq: u64, template_bytes: usize, values: usize) {
    info!(
        event = "recompute.started",
        seq = seq,
        template_bytes = template_bytes,
        values = values,
    );
}

/// An evaluator call resolved, one way or the other.
pub fn emit_recompute_finished(seq: u64, duration_ms: u64, success: bool, diagnostics: usize) {
    info!(
        event = "recompute.finished",
        seq = seq,
        duration_ms = duration_ms,
        success = success,
        diagnostics = diagnostics,
    );
}

/// A snapshot was merged into the held parameter list.
pub fn emit_reconcile_applied(stats: &ReconcileStats) {
    info!(
        event = "reconcile.applied",
        kept = stats.kept,
        created = stats.created,
        dropped = stats.dropped,
    );
}

/// The evaluator call failed; the error becomes an internal diagnostic.
pub fn emit_recompute_failed(seq: u64, kind: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "recompute.failed", seq = seq, kind = %kind, error = %error);
}

/// A template was stored for sharing.
pub fn emit_share_stored(id: &str, bytes: usize) {
    info!(event = "share.stored", id = %id, bytes = bytes);
}

/// A share request was refused.
pub fn emit_share_rejected(reason: &str, bytes: usize) {
    tracing::warn!(event = "share.rejected", reason = %reason, bytes = bytes);
}
