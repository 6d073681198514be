//! Parameter definitions as emitted by the evaluator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::diagnostic::RawDiagnostic;

/// A string that may be null on the evaluator side.
///
/// `value` is only meaningful when `valid` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NullableString {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub valid: bool,
}

impl NullableString {
    pub fn valid(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            valid: true,
        }
    }

    pub fn null() -> Self {
        Self::default()
    }

    /// The value, if the evaluator marked it valid.
    pub fn as_valid(&self) -> Option<&str> {
        self.valid.then_some(self.value.as_str())
    }
}

/// Render key for a parameter.
///
/// Assigned fresh for every snapshot; never used for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityToken(Uuid);

impl IdentityToken {
    pub fn fresh() -> Self {
        IdentityToken(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdentityToken {
    fn default() -> Self {
        Self::fresh()
    }
}

impl std::fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared value type of a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    #[default]
    #[serde(rename = "string")]
    String,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "list(string)")]
    ListString,
    #[serde(other)]
    Unknown,
}

/// Widget used to render a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormType {
    #[default]
    Input,
    Textarea,
    Dropdown,
    Radio,
    MultiSelect,
    TagSelect,
    Switch,
    Checkbox,
    Slider,
    Error,
    #[serde(other)]
    Unknown,
}

impl FormType {
    /// Widgets whose value must be one of the declared options.
    pub fn is_option_backed(&self) -> bool {
        matches!(self, FormType::Dropdown | FormType::Radio | FormType::MultiSelect)
    }

    /// Widgets whose value is a JSON-encoded list of strings.
    pub fn is_list(&self) -> bool {
        matches!(self, FormType::MultiSelect | FormType::TagSelect)
    }
}

/// One selectable option for dropdown, radio, and multi-select fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub value: NullableString,
    #[serde(default)]
    pub icon: String,
}

impl ParameterOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            value: NullableString::valid(value),
            icon: String::new(),
        }
    }
}

/// Direction a monotonic numeric parameter may move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonotonicDirection {
    Increasing,
    Decreasing,
}

impl MonotonicDirection {
    /// Parse the evaluator's spelling. Empty or unknown strings mean no constraint.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "increasing" => Some(MonotonicDirection::Increasing),
            "decreasing" => Some(MonotonicDirection::Decreasing),
            _ => None,
        }
    }
}

/// One constraint record. Any subset of the fields may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValidation {
    /// Custom message template; `{min}`, `{max}`, `{value}` are substituted.
    #[serde(default)]
    pub validation_error: Option<String>,
    #[serde(default)]
    pub validation_regex: Option<String>,
    #[serde(default)]
    pub validation_min: Option<i64>,
    #[serde(default)]
    pub validation_max: Option<i64>,
    #[serde(default)]
    pub validation_monotonic: Option<String>,
}

impl ParameterValidation {
    pub fn custom_message(&self) -> Option<&str> {
        self.validation_error.as_deref().filter(|m| !m.is_empty())
    }

    pub fn regex(&self) -> Option<&str> {
        self.validation_regex.as_deref().filter(|r| !r.is_empty())
    }

    pub fn monotonic(&self) -> Option<MonotonicDirection> {
        self.validation_monotonic
            .as_deref()
            .and_then(MonotonicDirection::parse)
    }
}

/// Presentation hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterStyling {
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub label: Option<String>,
}

/// One declared input field for the current template revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type", default)]
    pub param_type: ParameterType,

    #[serde(default)]
    pub form_type: FormType,

    #[serde(default)]
    pub options: Vec<ParameterOption>,

    #[serde(default)]
    pub validations: Vec<ParameterValidation>,

    /// The evaluator's view of the current value.
    #[serde(default)]
    pub value: NullableString,

    #[serde(default)]
    pub default_value: NullableString,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub mutable: bool,

    /// Always resets to the declared default; ignores autofill.
    #[serde(default)]
    pub ephemeral: bool,

    #[serde(default)]
    pub order: i64,

    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub styling: ParameterStyling,

    /// Problems scoped to this field. The evaluator may emit `null` entries.
    #[serde(default)]
    pub diagnostics: Vec<Option<RawDiagnostic>>,

    #[serde(rename = "uuid", default)]
    pub identity: IdentityToken,
}

impl ParameterDefinition {
    /// Minimal definition, mostly useful for building snapshots by hand.
    pub fn new(name: impl Into<String>, param_type: ParameterType, form_type: FormType) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            param_type,
            form_type,
            options: Vec::new(),
            validations: Vec::new(),
            value: NullableString::null(),
            default_value: NullableString::null(),
            required: false,
            mutable: true,
            ephemeral: false,
            order: 0,
            icon: String::new(),
            styling: ParameterStyling::default(),
            diagnostics: Vec::new(),
            identity: IdentityToken::fresh(),
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = NullableString::valid(value);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = NullableString::valid(value);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_validation(mut self, validation: ParameterValidation) -> Self {
        self.validations.push(validation);
        self
    }

    pub fn with_option(mut self, option: ParameterOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// `display_name` when set, otherwise `name`.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// The declared default, if the evaluator marked it valid.
    pub fn valid_default(&self) -> Option<&str> {
        self.default_value.as_valid()
    }

    /// Values of all options the evaluator marked valid.
    pub fn option_values(&self) -> impl Iterator<Item = &str> {
        self.options.iter().filter_map(|o| o.value.as_valid())
    }

    /// Non-null diagnostics attached to this field.
    pub fn present_diagnostics(&self) -> impl Iterator<Item = &RawDiagnostic> {
        self.diagnostics.iter().flatten()
    }
}
