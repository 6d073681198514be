//! Parameters playground core library
//!
//! Reconciles successive evaluator snapshots of a template's declared
//! parameters, validates user input against their constraints, normalizes
//! evaluator diagnostics, and paces evaluator calls behind a debounce
//! scheduler.

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod evaluator;
pub mod form;
pub mod metrics;
pub mod obs;
pub mod playground;
pub mod reconcile;
pub mod scheduler;
pub mod session;
pub mod telemetry;
pub mod validation;

pub use domain::{
    parse_logfmt, Diagnostic, EvaluatorError, FormType, IdentityToken, LogLine,
    MonotonicDirection, NullableString, ParameterDefinition, ParameterOption, ParameterStyling,
    ParameterType, ParameterValidation, PlaygroundError, PreviewOutput, PreviewParameters,
    RawDiagnostic, RbacRole, Result, Severity, WorkspaceOwner, MOCK_OWNER_NAMES,
};

pub use config::{ConfigError, PlaygroundConfig, DEFAULT_MAX_SHARE_BYTES};
pub use diagnostics::{decode_response, internal_diagnostic, normalize};
pub use evaluator::{
    EvaluationRequest, Evaluator, ProcessEvaluator, StaticEvaluator, TEMPLATE_FILE_NAME,
};
pub use form::{
    check_field, committed_values, is_valid_option, parse_string_list, AutofillSource,
    AutofillValue, BuildParameter, FieldError, FormValueStore,
};
pub use playground::{spawn_playground, Edit, PlaygroundHandle, PlaygroundOptions, PlaygroundView};
pub use reconcile::{
    reconcile, same_field, ComparableParameter, ReconcileStats, ReconciledParameter,
    Reconciliation,
};
pub use scheduler::{EditKind, RecomputeScheduler, SchedulerState};
pub use session::PlaygroundSession;
pub use validation::{compile, validate_value, FieldValidator, ValidationOutcome};

/// Crate version, reported by the binaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
