//! Domain models for the parameters playground.
//!
//! Canonical definitions for the core entities:
//! - `ParameterDefinition`: one declared input field in an evaluator snapshot
//! - `PreviewOutput`: the raw evaluator response
//! - `Diagnostic`: a normalized problem report
//! - `WorkspaceOwner`: the caller identity a preview is evaluated for

pub mod diagnostic;
pub mod error;
pub mod owner;
pub mod parameter;
pub mod snapshot;

// Re-export main types and errors
pub use diagnostic::{Diagnostic, RawDiagnostic, Severity};
pub use error::{EvaluatorError, PlaygroundError, Result};
pub use owner::{RbacRole, WorkspaceOwner, MOCK_OWNER_NAMES};
pub use parameter::{
    FormType, IdentityToken, MonotonicDirection, NullableString, ParameterDefinition,
    ParameterOption, ParameterStyling, ParameterType, ParameterValidation,
};
pub use snapshot::{parse_logfmt, LogLine, PreviewOutput, PreviewParameters};
