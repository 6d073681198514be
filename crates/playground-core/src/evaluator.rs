//! Evaluator boundary.
//!
//! An evaluator takes the template files, the user's values, and the owner,
//! and returns the raw JSON response string. [`ProcessEvaluator`] runs an
//! external program; [`StaticEvaluator`] replays a canned response.

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::domain::{EvaluatorError, WorkspaceOwner};

/// File name the template source is evaluated under.
pub const TEMPLATE_FILE_NAME: &str = "main.tf";

/// Everything one evaluation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// File name to file contents.
    pub files: BTreeMap<String, String>,
    /// User-entered values by parameter name.
    pub values: BTreeMap<String, String>,
    pub owner: WorkspaceOwner,
}

impl EvaluationRequest {
    /// A request with the template stored as [`TEMPLATE_FILE_NAME`].
    pub fn for_template(
        template: impl Into<String>,
        values: BTreeMap<String, String>,
        owner: WorkspaceOwner,
    ) -> Self {
        let mut files = BTreeMap::new();
        files.insert(TEMPLATE_FILE_NAME.to_string(), template.into());
        Self {
            files,
            values,
            owner,
        }
    }
}

/// Produces raw evaluator responses.
///
/// `Ok(None)` means the evaluator ran but produced nothing.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, request: &EvaluationRequest)
        -> Result<Option<String>, EvaluatorError>;
}

/// Runs an external program per request.
///
/// The request is written to the child's stdin as JSON and the response is
/// read from stdout. A non-zero exit is a rejection carrying stderr.
#[derive(Debug, Clone)]
pub struct ProcessEvaluator {
    command: Vec<String>,
}

impl ProcessEvaluator {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }
}

#[async_trait]
impl Evaluator for ProcessEvaluator {
    async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<Option<String>, EvaluatorError> {
        let (exe, args) = self
            .command
            .split_first()
            .ok_or(EvaluatorError::NotConfigured)?;

        let input = serde_json::to_vec(request)?;

        let mut child = Command::new(exe)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                // Dropping closes the pipe so the child sees EOF.
            }
            Ok::<_, std::io::Error>(())
        };

        // stdin and stdout are serviced concurrently.
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        if let Err(e) = fed {
            if output.status.success() {
                return Err(e.into());
            }
        }
        debug!(
            exe = %exe,
            status = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            "evaluator process exited"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exit status {}", output.status.code().unwrap_or(-1))
            } else {
                stderr
            };
            return Err(EvaluatorError::Rejected(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!stdout.is_empty()).then_some(stdout))
    }
}

/// Always answers with the same response.
#[derive(Debug, Clone, Default)]
pub struct StaticEvaluator {
    response: Option<String>,
}

impl StaticEvaluator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    /// An evaluator that never produces output.
    pub fn empty() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl Evaluator for StaticEvaluator {
    async fn evaluate(
        &self,
        _request: &EvaluationRequest,
    ) -> Result<Option<String>, EvaluatorError> {
        Ok(self.response.clone())
    }
}
