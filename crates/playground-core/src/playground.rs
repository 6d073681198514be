//! The recompute loop.
//!
//! [`spawn_playground`] moves a [`PlaygroundSession`] into a tokio task that
//! consumes [`Edit`]s, debounces them through the [`RecomputeScheduler`],
//! runs at most one evaluator call at a time, and publishes a fresh
//! [`PlaygroundView`] after every transition. Dropping or closing the edit
//! sender ends the loop once any running call has resolved; the final
//! session is handed back through [`PlaygroundHandle::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::OptionFuture;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

use crate::config::PlaygroundConfig;
use crate::domain::{Diagnostic, EvaluatorError, PlaygroundError, Result, WorkspaceOwner};
use crate::evaluator::Evaluator;
use crate::form::{AutofillValue, BuildParameter, FieldError};
use crate::metrics::METRICS;
use crate::obs;
use crate::reconcile::ReconciledParameter;
use crate::scheduler::{EditKind, RecomputeScheduler};
use crate::session::PlaygroundSession;

/// Capacity of the edit channel.
const EDIT_BUFFER: usize = 64;

type CallOutcome = std::result::Result<Option<String>, EvaluatorError>;

/// A user action sent to the loop.
#[derive(Debug, Clone)]
pub enum Edit {
    Template(String),
    Value { name: String, value: String },
    ResetForm,
    Owner(WorkspaceOwner),
    LastBuild(Vec<BuildParameter>),
    Autofill(Vec<AutofillValue>),
    ToggleDiagnostics(Option<bool>),
    /// Recompute now without changing anything.
    Recompute,
}

/// Everything a renderer needs, published after every transition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaygroundView {
    /// In display order.
    pub parameters: Vec<ReconciledParameter>,
    pub diagnostics: Vec<Diagnostic>,
    pub show_diagnostics: bool,
    pub is_recomputing: bool,
    pub first_invalid: Option<FieldError>,
    /// Evaluator calls that have resolved so far.
    pub evaluations: u64,
}

impl PlaygroundView {
    fn capture(session: &PlaygroundSession, is_recomputing: bool, evaluations: u64) -> Self {
        Self {
            parameters: session.sorted_parameters().into_iter().cloned().collect(),
            diagnostics: session.diagnostics(),
            show_diagnostics: session.show_diagnostics(),
            is_recomputing,
            first_invalid: session.first_invalid(),
            evaluations,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaygroundOptions {
    pub settle_window: Duration,
    pub field_settle_window: Duration,
    /// `None` disables the bound.
    pub evaluator_timeout: Option<Duration>,
    /// Evaluate once as soon as the loop starts.
    pub evaluate_on_start: bool,
}

impl Default for PlaygroundOptions {
    fn default() -> Self {
        Self::from(&PlaygroundConfig::default())
    }
}

impl From<&PlaygroundConfig> for PlaygroundOptions {
    fn from(config: &PlaygroundConfig) -> Self {
        Self {
            settle_window: config.settle_window(),
            field_settle_window: config.field_settle_window(),
            evaluator_timeout: config.evaluator_timeout(),
            evaluate_on_start: true,
        }
    }
}

/// Client side of a running loop.
pub struct PlaygroundHandle {
    edits: mpsc::Sender<Edit>,
    view: watch::Receiver<PlaygroundView>,
    task: JoinHandle<PlaygroundSession>,
}

impl PlaygroundHandle {
    pub async fn send(&self, edit: Edit) -> Result<()> {
        self.edits
            .send(edit)
            .await
            .map_err(|_| PlaygroundError::Closed)
    }

    /// The most recently published view.
    pub fn view(&self) -> PlaygroundView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaygroundView> {
        self.view.clone()
    }

    /// Wait until a published view satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, predicate: F) -> Result<PlaygroundView>
    where
        F: FnMut(&PlaygroundView) -> bool,
    {
        let view = self
            .view
            .wait_for(predicate)
            .await
            .map_err(|_| PlaygroundError::Closed)?;
        Ok(view.clone())
    }

    /// Close the edit channel and wait for the loop to finish.
    pub async fn shutdown(self) -> Result<PlaygroundSession> {
        let PlaygroundHandle { edits, task, .. } = self;
        drop(edits);
        task.await
            .map_err(|e| PlaygroundError::Task(e.to_string()))
    }
}

/// Start the loop on the current tokio runtime.
pub fn spawn_playground(
    session: PlaygroundSession,
    evaluator: Arc<dyn Evaluator>,
    options: PlaygroundOptions,
) -> PlaygroundHandle {
    let (edit_tx, edit_rx) = mpsc::channel(EDIT_BUFFER);
    let (view_tx, view_rx) = watch::channel(PlaygroundView::capture(&session, false, 0));

    let driver = Driver {
        scheduler: RecomputeScheduler::new(options.settle_window, options.field_settle_window),
        session,
        evaluator,
        timeout: options.evaluator_timeout,
        view: view_tx,
        in_flight: None,
        seq: 0,
        evaluations: 0,
        started_at: Instant::now(),
    };
    let span = obs::session_span(&uuid::Uuid::new_v4().to_string());
    let task = tokio::spawn(
        driver
            .run(edit_rx, options.evaluate_on_start)
            .instrument(span),
    );

    PlaygroundHandle {
        edits: edit_tx,
        view: view_rx,
        task,
    }
}

enum Wake {
    Edit(Option<Edit>),
    Deadline,
    Resolved(std::result::Result<CallOutcome, JoinError>),
}

struct Driver {
    session: PlaygroundSession,
    scheduler: RecomputeScheduler,
    evaluator: Arc<dyn Evaluator>,
    timeout: Option<Duration>,
    view: watch::Sender<PlaygroundView>,
    in_flight: Option<JoinHandle<CallOutcome>>,
    seq: u64,
    evaluations: u64,
    started_at: Instant,
}

impl Driver {
    async fn run(
        mut self,
        mut edits: mpsc::Receiver<Edit>,
        evaluate_on_start: bool,
    ) -> PlaygroundSession {
        if evaluate_on_start {
            self.scheduler.on_edit(EditKind::Immediate, Instant::now());
        }
        let mut open = true;

        loop {
            if open && self.scheduler.poll(Instant::now()) {
                self.start_call();
            }
            self.publish();

            if !open && self.in_flight.is_none() {
                break;
            }

            let wake = {
                let deadline: OptionFuture<_> = self
                    .scheduler
                    .deadline()
                    .filter(|_| open)
                    .map(tokio::time::sleep_until)
                    .into();
                let call: OptionFuture<_> = self.in_flight.as_mut().into();

                tokio::select! {
                    edit = edits.recv(), if open => Wake::Edit(edit),
                    Some(()) = deadline => Wake::Deadline,
                    Some(joined) = call => Wake::Resolved(joined),
                    else => break,
                }
            };

            match wake {
                Wake::Edit(Some(edit)) => self.apply_edit(edit),
                Wake::Edit(None) => {
                    debug!("edit channel closed");
                    open = false;
                }
                Wake::Deadline => {}
                Wake::Resolved(joined) => {
                    self.in_flight = None;
                    self.finish_call(joined);
                }
            }
        }

        METRICS.flush();
        self.session
    }

    fn apply_edit(&mut self, edit: Edit) {
        let now = Instant::now();
        match edit {
            Edit::Template(template) => {
                self.session.set_template(template);
                self.scheduler.on_edit(EditKind::Template, now);
            }
            Edit::Value { name, value } => match self.session.set_value(&name, value) {
                Ok(()) => self.scheduler.on_edit(EditKind::Field, now),
                Err(e) => warn!(error = %e, "ignoring edit"),
            },
            Edit::ResetForm => {
                self.session.reset_form();
                self.scheduler.on_edit(EditKind::Immediate, now);
            }
            Edit::Owner(owner) => {
                self.session.set_owner(owner);
                self.scheduler.on_edit(EditKind::Immediate, now);
            }
            Edit::LastBuild(values) => self.session.set_last_build(values),
            Edit::Autofill(values) => self.session.set_autofill(values),
            Edit::ToggleDiagnostics(open) => self.session.toggle_diagnostics(open),
            Edit::Recompute => self.scheduler.on_edit(EditKind::Immediate, now),
        }
    }

    fn start_call(&mut self) {
        self.seq += 1;
        self.started_at = Instant::now();

        let request = self.session.evaluation_request();
        obs::emit_recompute_started(self.seq, self.session.template().len(), request.values.len());
        METRICS.inc_evaluator_calls();

        let evaluator = Arc::clone(&self.evaluator);
        let timeout = self.timeout;
        self.in_flight = Some(tokio::spawn(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, evaluator.evaluate(&request))
                    .await
                    .unwrap_or_else(|_| {
                        Err(EvaluatorError::Timeout {
                            timeout_ms: limit.as_millis() as u64,
                        })
                    }),
                None => evaluator.evaluate(&request).await,
            }
        }));
    }

    fn finish_call(&mut self, joined: std::result::Result<CallOutcome, JoinError>) {
        let duration_ms = self.started_at.elapsed().as_millis() as u64;
        self.evaluations += 1;

        let outcome = joined.unwrap_or_else(|e| {
            if e.is_panic() {
                warn!(seq = self.seq, "evaluator task panicked");
            }
            Err(EvaluatorError::Unknown)
        });

        let applied = outcome.and_then(|raw| self.session.apply_response(raw.as_deref()));
        let success = match applied {
            Ok(stats) => {
                obs::emit_reconcile_applied(&stats);
                METRICS.record_reconcile(stats.kept, stats.created);
                true
            }
            Err(e) => {
                obs::emit_recompute_failed(self.seq, e.kind(), &e);
                METRICS.inc_evaluator_failures();
                self.session.apply_failure(&e);
                false
            }
        };

        obs::emit_recompute_finished(
            self.seq,
            duration_ms,
            success,
            self.session.evaluator_diagnostics().len(),
        );
        self.scheduler.on_resolved(Instant::now());
    }

    fn publish(&self) {
        let view = PlaygroundView::capture(
            &self.session,
            self.scheduler.is_recomputing(),
            self.evaluations,
        );
        self.view.send_replace(view);
    }
}
