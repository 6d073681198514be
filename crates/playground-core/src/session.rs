//! Playground session state.
//!
//! `PlaygroundSession` is plain owned data. Every user action and every
//! evaluator response is a method call that moves it to the next state; the
//! driver in [`crate::playground`] is the only thing that holds one across
//! awaits.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::diagnostics::{decode_response, internal_diagnostic, normalize};
use crate::domain::{
    Diagnostic, EvaluatorError, PlaygroundError, PreviewOutput, Result, Severity, WorkspaceOwner,
};
use crate::evaluator::EvaluationRequest;
use crate::form::{self, AutofillValue, BuildParameter, FieldError, FormValueStore};
use crate::reconcile::{display_order, reconcile, ReconcileStats, ReconciledParameter};

#[derive(Debug, Clone)]
pub struct PlaygroundSession {
    template: String,
    owner: WorkspaceOwner,
    form: FormValueStore,
    parameters: Vec<ReconciledParameter>,
    evaluator_diagnostics: Vec<Diagnostic>,
    last_output: Option<PreviewOutput>,
    /// The last response exactly as the evaluator sent it.
    raw_output: Option<String>,
    /// Values of the last committed build, for monotonic constraints.
    last_build: HashMap<String, String>,
    autofill: Vec<AutofillValue>,
    show_diagnostics: bool,
}

impl Default for PlaygroundSession {
    fn default() -> Self {
        Self::new(String::new(), WorkspaceOwner::default())
    }
}

impl PlaygroundSession {
    pub fn new(template: impl Into<String>, owner: WorkspaceOwner) -> Self {
        Self {
            template: template.into(),
            owner,
            form: FormValueStore::new(),
            parameters: Vec::new(),
            evaluator_diagnostics: Vec::new(),
            last_output: None,
            raw_output: None,
            last_build: HashMap::new(),
            autofill: Vec::new(),
            show_diagnostics: true,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn owner(&self) -> &WorkspaceOwner {
        &self.owner
    }

    pub fn form(&self) -> &FormValueStore {
        &self.form
    }

    /// Parameters in snapshot order.
    pub fn parameters(&self) -> &[ReconciledParameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ReconciledParameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    pub fn last_output(&self) -> Option<&PreviewOutput> {
        self.last_output.as_ref()
    }

    /// Diagnostics from the last evaluator response or failure.
    pub fn evaluator_diagnostics(&self) -> &[Diagnostic] {
        &self.evaluator_diagnostics
    }

    // ------------------------------------------------------------------
    // Evaluator results
    // ------------------------------------------------------------------

    /// Decode and take a raw evaluator response, keeping the text for export.
    pub fn apply_response(
        &mut self,
        raw: Option<&str>,
    ) -> std::result::Result<ReconcileStats, EvaluatorError> {
        let output = decode_response(raw)?;
        let stats = self.apply_output(output);
        self.raw_output = raw.map(str::to_string);
        Ok(stats)
    }

    /// Take a successful, already decoded evaluator response.
    pub fn apply_output(&mut self, output: PreviewOutput) -> ReconcileStats {
        self.evaluator_diagnostics = normalize(&output);

        let form = &self.form;
        let autofill = &self.autofill;
        let merged = reconcile(&self.parameters, output.parameters().to_vec(), |d| {
            form.resolve_with_autofill(d, autofill)
        });

        debug!(
            parameters = merged.parameters.len(),
            diagnostics = self.evaluator_diagnostics.len(),
            "applied evaluator output"
        );

        self.parameters = merged.parameters;
        self.last_output = Some(output);
        self.raw_output = None;
        merged.stats
    }

    /// Take a failed evaluator call. The held parameters stay as they are.
    pub fn apply_failure(&mut self, err: &EvaluatorError) {
        self.evaluator_diagnostics = vec![internal_diagnostic(err)];
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
    }

    /// Record a value typed into a field.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let param = self
            .parameters
            .iter_mut()
            .find(|p| p.definition.name == name)
            .ok_or_else(|| PlaygroundError::UnknownParameter(name.to_string()))?;
        param.current_value = value.clone();
        self.form.set(name, value);
        Ok(())
    }

    /// Forget all user values and remount every field at its initial value.
    pub fn reset_form(&mut self) {
        self.form.clear();
        for param in &mut self.parameters {
            param.remount();
            param.current_value = self
                .form
                .resolve_with_autofill(&param.definition, &self.autofill);
        }
    }

    /// Switch the owner. The form is reset as well.
    pub fn set_owner(&mut self, owner: WorkspaceOwner) {
        self.owner = owner;
        self.reset_form();
    }

    pub fn set_last_build(&mut self, values: Vec<BuildParameter>) {
        self.last_build = values.into_iter().map(|b| (b.name, b.value)).collect();
    }

    /// Autofill values apply to fields mounted from now on.
    pub fn set_autofill(&mut self, values: Vec<AutofillValue>) {
        self.autofill = values;
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    /// Snapshot of the inputs for the next evaluator call.
    pub fn evaluation_request(&self) -> EvaluationRequest {
        let values: BTreeMap<String, String> = self
            .form
            .as_map()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        EvaluationRequest::for_template(self.template.clone(), values, self.owner.clone())
    }

    /// Evaluator diagnostics followed by local validation failures.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let local = self
            .validate_form()
            .into_iter()
            .map(|e| Diagnostic::Parameter {
                parameter_name: e.name,
                severity: Severity::Error,
                summary: e.message,
                detail: String::new(),
            });
        self.evaluator_diagnostics.iter().cloned().chain(local).collect()
    }

    pub fn show_diagnostics(&self) -> bool {
        self.show_diagnostics
    }

    /// Open or close the diagnostics panel; `None` flips it.
    pub fn toggle_diagnostics(&mut self, open: Option<bool>) {
        self.show_diagnostics = open.unwrap_or(!self.show_diagnostics);
    }

    /// Parameters in display order.
    pub fn sorted_parameters(&self) -> Vec<&ReconciledParameter> {
        display_order(&self.parameters)
    }

    /// Every field that fails form validation, in display order.
    pub fn validate_form(&self) -> Vec<FieldError> {
        self.sorted_parameters()
            .into_iter()
            .filter_map(|p| {
                let last = self.last_build.get(p.name()).map(String::as_str);
                form::check_field(&p.definition, &p.current_value, last).err()
            })
            .collect()
    }

    /// The first invalid field in display order.
    pub fn first_invalid(&self) -> Option<FieldError> {
        self.validate_form().into_iter().next()
    }

    pub fn committed_values(&self) -> Vec<BuildParameter> {
        form::committed_values(&self.parameters)
    }

    /// Committed values, refused while any field is invalid.
    pub fn submit(&self) -> Result<Vec<BuildParameter>> {
        match self.first_invalid() {
            Some(FieldError { name, message }) => {
                Err(PlaygroundError::InvalidParameter { name, message })
            }
            None => Ok(self.committed_values()),
        }
    }

    /// The last evaluator response as it was received, or pretty JSON of the
    /// decoded output when it was applied without its raw text.
    pub fn export_output(&self) -> Result<Option<String>> {
        if let Some(raw) = &self.raw_output {
            return Ok(Some(raw.clone()));
        }
        self.last_output
            .as_ref()
            .map(serde_json::to_string_pretty)
            .transpose()
            .map_err(PlaygroundError::from)
    }
}
