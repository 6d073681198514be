//! Identity reconciliation between consecutive parameter snapshots.
//!
//! The evaluator re-emits every parameter on each run with a fresh identity
//! token. To keep render keys and in-flight values stable, each incoming
//! definition is matched against the previously held list through a
//! [`ComparableParameter`] projection that leaves out the two volatile
//! fields (`value` and the identity token).

use serde::Serialize;

use crate::domain::{
    FormType, IdentityToken, NullableString, ParameterDefinition, ParameterOption,
    ParameterStyling, ParameterType, ParameterValidation, RawDiagnostic,
};

/// Projection of a definition used for structural matching.
///
/// Two definitions describe "the same field" iff their projections are equal.
#[derive(Debug, PartialEq)]
pub struct ComparableParameter<'a> {
    pub name: &'a str,
    pub display_name: &'a str,
    pub description: &'a str,
    pub param_type: ParameterType,
    pub form_type: FormType,
    pub options: &'a [ParameterOption],
    pub validations: &'a [ParameterValidation],
    pub default_value: &'a NullableString,
    pub required: bool,
    pub mutable: bool,
    pub ephemeral: bool,
    pub order: i64,
    pub icon: &'a str,
    pub styling: &'a ParameterStyling,
    pub diagnostics: &'a [Option<RawDiagnostic>],
}

impl<'a> From<&'a ParameterDefinition> for ComparableParameter<'a> {
    fn from(p: &'a ParameterDefinition) -> Self {
        Self {
            name: &p.name,
            display_name: &p.display_name,
            description: &p.description,
            param_type: p.param_type,
            form_type: p.form_type,
            options: &p.options,
            validations: &p.validations,
            default_value: &p.default_value,
            required: p.required,
            mutable: p.mutable,
            ephemeral: p.ephemeral,
            order: p.order,
            icon: &p.icon,
            styling: &p.styling,
            diagnostics: &p.diagnostics,
        }
    }
}

/// Whether `a` and `b` describe the same field, ignoring value and identity.
pub fn same_field(a: &ParameterDefinition, b: &ParameterDefinition) -> bool {
    ComparableParameter::from(a) == ComparableParameter::from(b)
}

/// A definition plus the state that survives snapshot replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledParameter {
    pub definition: ParameterDefinition,
    /// Render key; stable while an equivalent definition keeps appearing.
    pub identity: IdentityToken,
    /// The value shown in the form.
    pub current_value: String,
}

impl ReconciledParameter {
    pub fn new(mut definition: ParameterDefinition, current_value: String) -> Self {
        let identity = IdentityToken::fresh();
        definition.identity = identity;
        Self {
            definition,
            identity,
            current_value,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Assign a fresh render key.
    pub fn remount(&mut self) {
        self.identity = IdentityToken::fresh();
        self.definition.identity = self.identity;
    }
}

/// Counters describing one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub kept: usize,
    pub created: usize,
    pub dropped: usize,
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub parameters: Vec<ReconciledParameter>,
    pub stats: ReconcileStats,
}

/// Merge an incoming snapshot into the previously held parameter list.
///
/// For each incoming definition, the first unmatched previous entry with an
/// equal projection donates its identity and `current_value`; the incoming
/// definition supplies everything else. Unmatched definitions get a fresh
/// identity and a value from `seed`. Previous entries that match nothing are
/// dropped. Result order follows `incoming`.
pub fn reconcile<F>(
    previous: &[ReconciledParameter],
    incoming: Vec<ParameterDefinition>,
    mut seed: F,
) -> Reconciliation
where
    F: FnMut(&ParameterDefinition) -> String,
{
    let mut claimed = vec![false; previous.len()];
    let mut stats = ReconcileStats::default();

    let parameters = incoming
        .into_iter()
        .map(|mut definition| {
            let wanted = ComparableParameter::from(&definition);
            let found = previous.iter().enumerate().position(|(i, prev)| {
                !claimed[i] && ComparableParameter::from(&prev.definition) == wanted
            });

            match found {
                Some(i) => {
                    claimed[i] = true;
                    stats.kept += 1;
                    let prev = &previous[i];
                    definition.identity = prev.identity;
                    ReconciledParameter {
                        definition,
                        identity: prev.identity,
                        current_value: prev.current_value.clone(),
                    }
                }
                None => {
                    stats.created += 1;
                    let value = seed(&definition);
                    ReconciledParameter::new(definition, value)
                }
            }
        })
        .collect();

    stats.dropped = claimed.iter().filter(|c| !**c).count();

    Reconciliation { parameters, stats }
}

/// Stable sort by `order`; ties keep snapshot order.
pub fn display_order(parameters: &[ReconciledParameter]) -> Vec<&ReconciledParameter> {
    let mut sorted: Vec<&ReconciledParameter> = parameters.iter().collect();
    sorted.sort_by_key(|p| p.definition.order);
    sorted
}
