//! Debounce and recompute scheduler.
//!
//! A pure state machine; the driver in [`crate::playground`] feeds it edits
//! and clock readings and starts an evaluator call whenever [`poll`]
//! returns `true`. At most one call is outstanding at a time.
//!
//! [`poll`]: RecomputeScheduler::poll

use std::time::Duration;

use tokio::time::Instant;

/// What kind of edit restarted the settle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// The template source changed.
    Template,
    /// A form field value changed.
    Field,
    /// Owner switch or form reset; recompute right away.
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Pending { deadline: Instant },
    InFlight { queued: bool },
}

#[derive(Debug, Clone)]
pub struct RecomputeScheduler {
    state: SchedulerState,
    settle_window: Duration,
    field_settle_window: Duration,
    /// Window used when a queued edit is released after a call resolves.
    queued_window: Duration,
}

impl RecomputeScheduler {
    pub fn new(settle_window: Duration, field_settle_window: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            settle_window,
            field_settle_window,
            queued_window: settle_window,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn window(&self, kind: EditKind) -> Duration {
        match kind {
            EditKind::Template => self.settle_window,
            EditKind::Field => self.field_settle_window,
            EditKind::Immediate => Duration::ZERO,
        }
    }

    /// Record an edit. Restarts the settle window, or queues a follow-up
    /// when a call is already running.
    pub fn on_edit(&mut self, kind: EditKind, now: Instant) {
        let window = self.window(kind);
        match self.state {
            SchedulerState::Idle | SchedulerState::Pending { .. } => {
                self.state = SchedulerState::Pending {
                    deadline: now + window,
                };
            }
            SchedulerState::InFlight { queued } => {
                if !queued || window < self.queued_window {
                    self.queued_window = window;
                }
                self.state = SchedulerState::InFlight { queued: true };
            }
        }
    }

    /// Returns `true` exactly when the caller should start an evaluator call.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Pending { deadline } if now >= deadline => {
                self.state = SchedulerState::InFlight { queued: false };
                true
            }
            _ => false,
        }
    }

    /// The outstanding call finished, successfully or not.
    pub fn on_resolved(&mut self, now: Instant) {
        self.state = match self.state {
            SchedulerState::InFlight { queued: true } => SchedulerState::Pending {
                deadline: now + self.queued_window,
            },
            SchedulerState::InFlight { queued: false } => SchedulerState::Idle,
            other => other,
        };
        self.queued_window = self.settle_window;
    }

    /// Deadline of the pending recompute, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, SchedulerState::InFlight { .. })
    }

    /// True while a recompute is pending or running.
    pub fn is_recomputing(&self) -> bool {
        !matches!(self.state, SchedulerState::Idle)
    }
}
