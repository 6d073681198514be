//! Form value store.
//!
//! Holds what the user has typed, keyed by parameter name, and decides the
//! value a field shows when it is first mounted: the user's own entry, an
//! autofill value when one applies, the declared default, or empty.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FormType, ParameterDefinition};
use crate::reconcile::{display_order, ReconciledParameter};
use crate::validation;

/// Where an autofill value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutofillSource {
    UserHistory,
    Url,
    ActiveBuild,
}

/// A value offered for a field before the user touches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillValue {
    pub name: String,
    pub value: String,
    pub source: AutofillSource,
}

impl AutofillValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>, source: AutofillSource) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source,
        }
    }
}

/// One `name = value` pair as submitted with a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParameter {
    pub name: String,
    pub value: String,
}

impl BuildParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A field that failed form validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{name}: {message}")]
pub struct FieldError {
    pub name: String,
    pub message: String,
}

/// Why a list value could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error parsing parameter of type list(string), {0}")]
pub struct ListParseError(String);

/// User-entered values by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValueStore {
    values: HashMap<String, String>,
}

impl FormValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entered values, sorted by name.
    pub fn user_values(&self) -> Vec<BuildParameter> {
        let mut out: Vec<BuildParameter> = self
            .values
            .iter()
            .map(|(name, value)| BuildParameter::new(name, value))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// The same values as a map, for the evaluator request.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// User value, else the valid default, else empty.
    pub fn resolve(&self, definition: &ParameterDefinition) -> String {
        self.get(&definition.name)
            .or_else(|| definition.valid_default())
            .unwrap_or_default()
            .to_string()
    }

    /// Like [`resolve`](Self::resolve), with autofill consulted between the
    /// user value and the default. Ephemeral fields never autofill, and an
    /// autofill value must be non-empty and acceptable to the field.
    pub fn resolve_with_autofill(
        &self,
        definition: &ParameterDefinition,
        autofill: &[AutofillValue],
    ) -> String {
        if let Some(value) = self.get(&definition.name) {
            return value.to_string();
        }

        if !definition.ephemeral {
            let offered = autofill
                .iter()
                .find(|a| a.name == definition.name)
                .filter(|a| !a.value.is_empty() && is_valid_option(definition, &a.value));
            if let Some(a) = offered {
                return a.value.clone();
            }
        }

        definition.valid_default().unwrap_or_default().to_string()
    }

    /// Seed a build-parameter list for a fresh form.
    pub fn initial_values(
        &self,
        parameters: &[ParameterDefinition],
        autofill: &[AutofillValue],
    ) -> Vec<BuildParameter> {
        parameters
            .iter()
            .map(|p| BuildParameter::new(&p.name, self.resolve_with_autofill(p, autofill)))
            .collect()
    }
}

/// Current value of every field, in display order.
pub fn committed_values(parameters: &[ReconciledParameter]) -> Vec<BuildParameter> {
    display_order(parameters)
        .into_iter()
        .map(|p| BuildParameter::new(p.name(), &p.current_value))
        .collect()
}

/// Whether `value` is acceptable for an option-backed field.
///
/// Multi-select wants a JSON array sharing at least one entry with the
/// options. Other fields with options want an exact option value. Fields
/// without options accept anything.
pub fn is_valid_option(definition: &ParameterDefinition, value: &str) -> bool {
    let options: Vec<&str> = definition.options.iter().map(|o| o.value.value.as_str()).collect();

    if definition.form_type == FormType::MultiSelect {
        return match serde_json::from_str::<serde_json::Value>(value) {
            Ok(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|i| i.as_str())
                .any(|i| options.contains(&i)),
            _ => false,
        };
    }

    if !options.is_empty() {
        return options.contains(&value);
    }

    true
}

/// Read a JSON string array. Empty text is an empty list.
pub fn parse_string_list(text: &str) -> Result<Vec<String>, ListParseError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<String>>(text).map_err(|e| ListParseError(e.to_string()))
}

/// Full form check for one field: required, option membership, list shape,
/// then the compiled constraint validator.
pub fn check_field(
    definition: &ParameterDefinition,
    value: &str,
    last_committed: Option<&str>,
) -> Result<(), FieldError> {
    let fail = |message: String| FieldError {
        name: definition.name.clone(),
        message,
    };

    if value.is_empty() && definition.required {
        return Err(fail(format!("{} is required.", definition.label())));
    }

    // Empty is "no selection" for option and list fields; the constraint
    // validator still sees it (an empty number reads as 0).
    match definition.form_type {
        _ if value.is_empty() => {}
        FormType::Dropdown | FormType::Radio if !definition.options.is_empty() => {
            if !definition.option_values().any(|o| o == value) {
                return Err(fail(format!(
                    "\"{}\" is not a valid option for {}.",
                    value,
                    definition.label()
                )));
            }
        }
        FormType::MultiSelect | FormType::TagSelect => {
            let items = parse_string_list(value).map_err(|e| fail(e.to_string()))?;
            if definition.form_type == FormType::MultiSelect {
                let options: Vec<&str> = definition.option_values().collect();
                if let Some(bad) = items.iter().find(|i| !options.contains(&i.as_str())) {
                    return Err(fail(format!(
                        "\"{}\" is not a valid option for {}.",
                        bad,
                        definition.label()
                    )));
                }
            }
        }
        _ => {}
    }

    match validation::validate_value(definition, value, last_committed) {
        validation::ValidationOutcome::Pass => Ok(()),
        validation::ValidationOutcome::Fail { message } => Err(fail(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParameterOption, ParameterType, ParameterValidation};

    fn dropdown() -> ParameterDefinition {
        ParameterDefinition::new("region", ParameterType::String, FormType::Dropdown)
            .with_option(ParameterOption::new("US", "us"))
            .with_option(ParameterOption::new("EU", "eu"))
            .with_default("us")
    }

    fn multi() -> ParameterDefinition {
        ParameterDefinition::new("ides", ParameterType::ListString, FormType::MultiSelect)
            .with_option(ParameterOption::new("VS Code", "vscode"))
            .with_option(ParameterOption::new("Vim", "vim"))
    }

    #[test]
    fn test_resolve_prefers_user_value() {
        let mut store = FormValueStore::new();
        let param = dropdown();
        assert_eq!(store.resolve(&param), "us");

        store.set("region", "eu");
        assert_eq!(store.resolve(&param), "eu");

        store.clear();
        assert_eq!(store.resolve(&param), "us");
    }

    #[test]
    fn test_resolve_without_valid_default_is_empty() {
        let store = FormValueStore::new();
        let param = ParameterDefinition::new("x", ParameterType::String, FormType::Input);
        assert_eq!(store.resolve(&param), "");
    }

    #[test]
    fn test_autofill_used_when_valid_option() {
        let store = FormValueStore::new();
        let autofill = vec![AutofillValue::new("region", "eu", AutofillSource::Url)];
        assert_eq!(store.resolve_with_autofill(&dropdown(), &autofill), "eu");
    }

    #[test]
    fn test_autofill_rejected_when_not_an_option() {
        let store = FormValueStore::new();
        let autofill = vec![AutofillValue::new("region", "mars", AutofillSource::Url)];
        assert_eq!(store.resolve_with_autofill(&dropdown(), &autofill), "us");
    }

    #[test]
    fn test_autofill_skipped_for_ephemeral() {
        let store = FormValueStore::new();
        let mut param = dropdown();
        param.ephemeral = true;
        let autofill = vec![AutofillValue::new(
            "region",
            "eu",
            AutofillSource::UserHistory,
        )];
        assert_eq!(store.resolve_with_autofill(&param, &autofill), "us");
    }

    #[test]
    fn test_autofill_empty_value_ignored() {
        let store = FormValueStore::new();
        let autofill = vec![AutofillValue::new("region", "", AutofillSource::ActiveBuild)];
        assert_eq!(store.resolve_with_autofill(&dropdown(), &autofill), "us");
    }

    #[test]
    fn test_user_value_beats_autofill() {
        let mut store = FormValueStore::new();
        store.set("region", "us");
        let autofill = vec![AutofillValue::new("region", "eu", AutofillSource::Url)];
        assert_eq!(store.resolve_with_autofill(&dropdown(), &autofill), "us");
    }

    #[test]
    fn test_initial_values() {
        let store = FormValueStore::new();
        let params = vec![
            dropdown(),
            ParameterDefinition::new("name", ParameterType::String, FormType::Input),
        ];
        let autofill = vec![AutofillValue::new("name", "dev", AutofillSource::Url)];
        let values = store.initial_values(&params, &autofill);
        assert_eq!(
            values,
            vec![
                BuildParameter::new("region", "us"),
                BuildParameter::new("name", "dev")
            ]
        );
    }

    #[test]
    fn test_is_valid_option_multi_select() {
        let param = multi();
        assert!(is_valid_option(&param, r#"["vim","emacs"]"#));
        assert!(!is_valid_option(&param, r#"["emacs"]"#));
        assert!(!is_valid_option(&param, "vim"));
        assert!(!is_valid_option(&param, "[]"));
    }

    #[test]
    fn test_is_valid_option_free_text() {
        let param = ParameterDefinition::new("n", ParameterType::String, FormType::Input);
        assert!(is_valid_option(&param, "anything"));
    }

    #[test]
    fn test_parse_string_list() {
        assert_eq!(parse_string_list("").expect("empty"), Vec::<String>::new());
        assert_eq!(
            parse_string_list(r#"["a","b"]"#).expect("list"),
            vec!["a".to_string(), "b".to_string()]
        );
        let err = parse_string_list("{").unwrap_err();
        assert!(err.to_string().contains("list(string)"));
        assert!(parse_string_list("[1]").is_err());
    }

    #[test]
    fn test_check_field_required() {
        let param =
            ParameterDefinition::new("name", ParameterType::String, FormType::Input).required();
        let err = check_field(&param, "", None).unwrap_err();
        assert_eq!(err.name, "name");
        assert!(err.message.contains("required"));
        assert!(check_field(&param, "x", None).is_ok());
    }

    #[test]
    fn test_check_field_dropdown_membership() {
        assert!(check_field(&dropdown(), "eu", None).is_ok());
        assert!(check_field(&dropdown(), "mars", None).is_err());
        assert!(check_field(&dropdown(), "", None).is_ok());
    }

    #[test]
    fn test_check_field_multi_select() {
        assert!(check_field(&multi(), r#"["vim"]"#, None).is_ok());
        assert!(check_field(&multi(), r#"["vim","emacs"]"#, None).is_err());
        assert!(check_field(&multi(), "not json", None).is_err());
    }

    #[test]
    fn test_check_field_tag_select_any_strings() {
        let param = ParameterDefinition::new("tags", ParameterType::ListString, FormType::TagSelect);
        assert!(check_field(&param, r#"["x","y"]"#, None).is_ok());
        assert!(check_field(&param, "x", None).is_err());
    }

    #[test]
    fn test_check_field_runs_validator() {
        let param = ParameterDefinition::new("cpu", ParameterType::Number, FormType::Input)
            .with_validation(ParameterValidation {
                validation_min: Some(1),
                validation_max: Some(10),
                ..Default::default()
            });
        let err = check_field(&param, "11", None).unwrap_err();
        assert!(err.message.contains("greater than"));
    }

    #[test]
    fn test_check_field_empty_number_checked_against_min() {
        let param = ParameterDefinition::new("cpu", ParameterType::Number, FormType::Input)
            .with_validation(ParameterValidation {
                validation_min: Some(1),
                validation_max: Some(10),
                ..Default::default()
            });
        let err = check_field(&param, "", None).unwrap_err();
        assert_eq!(err.name, "cpu");
        assert_eq!(
            err.message,
            "Value \"\" is less than 1; it must be between 1 and 10."
        );

        let unbounded = ParameterDefinition::new("note", ParameterType::String, FormType::Input);
        assert!(check_field(&unbounded, "", None).is_ok());
    }

    #[test]
    fn test_user_values_sorted() {
        let mut store = FormValueStore::new();
        store.set("b", "2");
        store.set("a", "1");
        let names: Vec<String> = store.user_values().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
