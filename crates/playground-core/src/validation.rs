//! Validation rule compiler.
//!
//! Turns a parameter's declared type and constraint records into a
//! [`FieldValidator`]. Only `number` and `string` parameters carry
//! constraints; other types always pass here, and `required`/option
//! membership are checked by the form layer.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{MonotonicDirection, ParameterDefinition, ParameterType};

/// Result of checking one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Pass,
    Fail { message: String },
}

impl ValidationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationOutcome::Pass)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Pass => None,
            ValidationOutcome::Fail { message } => Some(message),
        }
    }
}

/// Custom error template declared by a constraint.
#[derive(Debug, Clone)]
struct MessageTemplate {
    template: String,
    min: Option<i64>,
    max: Option<i64>,
}

impl MessageTemplate {
    /// Textual replacement; an absent bound renders as the empty string.
    fn render(&self, value: &str) -> String {
        let min = self.min.map(|m| m.to_string()).unwrap_or_default();
        let max = self.max.map(|m| m.to_string()).unwrap_or_default();
        self.template
            .replace("{min}", &min)
            .replace("{max}", &max)
            .replace("{value}", value)
    }
}

#[derive(Debug, Clone)]
struct NumberRules {
    min: Option<i64>,
    max: Option<i64>,
    /// Direction plus the last committed value it is checked against.
    monotonic: Option<(MonotonicDirection, String)>,
}

#[derive(Debug, Clone)]
enum Rules {
    Unconstrained,
    Number(NumberRules),
    Pattern(Regex),
    BadPattern { pattern: String, error: String },
}

/// A compiled per-field validator.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    rules: Rules,
    template: Option<MessageTemplate>,
}

/// Compile a validator for `parameter`.
///
/// `last_committed` is the value from the last committed build, used by
/// monotonic constraints. Without it, monotonic constraints are skipped.
pub fn compile(parameter: &ParameterDefinition, last_committed: Option<&str>) -> FieldValidator {
    let validations = &parameter.validations;
    let min = validations.iter().find_map(|v| v.validation_min);
    let max = validations.iter().find_map(|v| v.validation_max);

    let template = validations
        .iter()
        .find_map(|v| v.custom_message())
        .map(|t| MessageTemplate {
            template: t.to_string(),
            min,
            max,
        });

    let rules = match parameter.param_type {
        ParameterType::Number => {
            let monotonic = validations
                .iter()
                .find_map(|v| v.monotonic())
                .zip(last_committed.map(str::to_string));
            Rules::Number(NumberRules {
                min,
                max,
                monotonic,
            })
        }
        ParameterType::String => match validations.iter().find_map(|v| v.regex()) {
            None => Rules::Unconstrained,
            Some(pattern) => match Regex::new(pattern) {
                Ok(re) => Rules::Pattern(re),
                Err(e) => Rules::BadPattern {
                    pattern: pattern.to_string(),
                    error: e.to_string(),
                },
            },
        },
        _ => Rules::Unconstrained,
    };

    FieldValidator { rules, template }
}

/// Compile and check in one step.
pub fn validate_value(
    parameter: &ParameterDefinition,
    value: &str,
    last_committed: Option<&str>,
) -> ValidationOutcome {
    compile(parameter, last_committed).check(value)
}

impl FieldValidator {
    /// Check `value`. The first violated rule wins.
    pub fn check(&self, value: &str) -> ValidationOutcome {
        match &self.rules {
            Rules::Unconstrained => ValidationOutcome::Pass,
            Rules::Number(rules) => self.check_number(rules, value),
            Rules::Pattern(re) => {
                if value.is_empty() || re.is_match(value) {
                    ValidationOutcome::Pass
                } else {
                    self.fail(
                        value,
                        format!("Value \"{}\" does not match the pattern {}.", value, re.as_str()),
                    )
                }
            }
            Rules::BadPattern { pattern, error } => ValidationOutcome::Fail {
                message: format!("Invalid validation regex {}: {}", pattern, error),
            },
        }
    }

    /// Whether this validator can ever fail.
    pub fn is_constrained(&self) -> bool {
        !matches!(self.rules, Rules::Unconstrained)
    }

    fn check_number(&self, rules: &NumberRules, value: &str) -> ValidationOutcome {
        let n = parse_number(value);

        match (rules.min, rules.max) {
            (Some(min), None) if n < min as f64 => {
                return self.fail(
                    value,
                    format!("Value {} is less than the minimum of {}.", shown(value), min),
                );
            }
            (None, Some(max)) if n > max as f64 => {
                return self.fail(
                    value,
                    format!("Value {} is greater than the maximum of {}.", shown(value), max),
                );
            }
            (Some(min), Some(max)) if n < min as f64 => {
                return self.fail(
                    value,
                    format!(
                        "Value {} is less than {}; it must be between {} and {}.",
                        shown(value),
                        min,
                        min,
                        max
                    ),
                );
            }
            (Some(min), Some(max)) if n > max as f64 => {
                return self.fail(
                    value,
                    format!(
                        "Value {} is greater than {}; it must be between {} and {}.",
                        shown(value),
                        max,
                        min,
                        max
                    ),
                );
            }
            _ => {}
        }

        if let Some((direction, last)) = &rules.monotonic {
            let previous = parse_number(last);
            match direction {
                MonotonicDirection::Increasing if previous > n => {
                    return self.fail(
                        value,
                        format!("Value must only ever increase (last value was {})", last),
                    );
                }
                MonotonicDirection::Decreasing if previous < n => {
                    return self.fail(
                        value,
                        format!("Value must only ever decrease (last value was {})", last),
                    );
                }
                _ => {}
            }
        }

        ValidationOutcome::Pass
    }

    fn fail(&self, value: &str, default_message: String) -> ValidationOutcome {
        let message = match &self.template {
            Some(template) if !value.is_empty() => template.render(value),
            _ => default_message,
        };
        ValidationOutcome::Fail { message }
    }
}

/// Value as quoted in default messages; empty text shows as `""`.
fn shown(value: &str) -> &str {
    if value.is_empty() {
        "\"\""
    } else {
        value
    }
}

/// Numeric reading of form text. Empty text is 0; anything unparsable is NaN,
/// which never violates a bound.
fn parse_number(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FormType, ParameterValidation};

    fn number_param(min: Option<i64>, max: Option<i64>) -> ParameterDefinition {
        ParameterDefinition::new("cpu", ParameterType::Number, FormType::Input).with_validation(
            ParameterValidation {
                validation_min: min,
                validation_max: max,
                ..Default::default()
            },
        )
    }

    fn monotonic_param(direction: &str) -> ParameterDefinition {
        ParameterDefinition::new("disk", ParameterType::Number, FormType::Input).with_validation(
            ParameterValidation {
                validation_monotonic: Some(direction.to_string()),
                ..Default::default()
            },
        )
    }

    fn regex_param(pattern: &str, error: Option<&str>) -> ParameterDefinition {
        ParameterDefinition::new("name", ParameterType::String, FormType::Input).with_validation(
            ParameterValidation {
                validation_regex: Some(pattern.to_string()),
                validation_error: error.map(str::to_string),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_bounds_both_sides() {
        let validator = compile(&number_param(Some(1), Some(10)), None);

        let low = validator.check("0");
        assert!(low.message().expect("fail").contains("less than"));

        let high = validator.check("11");
        assert!(high.message().expect("fail").contains("greater than"));

        assert!(validator.check("5").is_pass());
        assert!(validator.check("1").is_pass());
        assert!(validator.check("10").is_pass());
    }

    #[test]
    fn test_min_only() {
        let validator = compile(&number_param(Some(3), None), None);
        assert!(validator.check("2").message().expect("fail").contains("less than"));
        assert!(validator.check("1000").is_pass());
    }

    #[test]
    fn test_max_only() {
        let validator = compile(&number_param(None, Some(3)), None);
        assert!(validator
            .check("4")
            .message()
            .expect("fail")
            .contains("greater than"));
        assert!(validator.check("-50").is_pass());
    }

    #[test]
    fn test_bounds_found_across_separate_constraints() {
        let param = ParameterDefinition::new("cpu", ParameterType::Number, FormType::Slider)
            .with_validation(ParameterValidation {
                validation_min: Some(2),
                ..Default::default()
            })
            .with_validation(ParameterValidation {
                validation_max: Some(4),
                ..Default::default()
            });
        let validator = compile(&param, None);
        assert!(!validator.check("1").is_pass());
        assert!(!validator.check("5").is_pass());
        assert!(validator.check("3").is_pass());
    }

    #[test]
    fn test_empty_number_reads_as_zero() {
        let validator = compile(&number_param(Some(1), None), None);
        assert_eq!(
            validator.check("").message(),
            Some("Value \"\" is less than the minimum of 1.")
        );
    }

    #[test]
    fn test_unparsable_number_passes_bounds() {
        let validator = compile(&number_param(Some(1), Some(10)), None);
        assert!(validator.check("abc").is_pass());
    }

    #[test]
    fn test_monotonic_increasing() {
        let validator = compile(&monotonic_param("increasing"), Some("5"));
        let outcome = validator.check("4");
        assert!(outcome.message().expect("fail").contains("increase"));
        assert!(outcome.message().expect("fail").contains("5"));
        assert!(validator.check("6").is_pass());
        assert!(validator.check("5").is_pass());
    }

    #[test]
    fn test_monotonic_decreasing() {
        let validator = compile(&monotonic_param("decreasing"), Some("5"));
        assert!(!validator.check("6").is_pass());
        assert!(validator.check("4").is_pass());
    }

    #[test]
    fn test_monotonic_without_prior_value_is_skipped() {
        let validator = compile(&monotonic_param("increasing"), None);
        assert!(validator.check("-100").is_pass());
    }

    #[test]
    fn test_bounds_checked_before_monotonic() {
        let param = number_param(Some(1), Some(10)).with_validation(ParameterValidation {
            validation_monotonic: Some("increasing".to_string()),
            ..Default::default()
        });
        let validator = compile(&param, Some("8"));
        let msg = validator.check("0").message().expect("fail").to_string();
        assert!(msg.contains("less than"));
        assert!(!msg.contains("increase"));
    }

    #[test]
    fn test_custom_message_substitution() {
        let mut param = number_param(Some(1), Some(10));
        param.validations[0].validation_error =
            Some("{value} is not within {min}..{max}".to_string());
        let validator = compile(&param, None);
        assert_eq!(
            validator.check("42").message(),
            Some("42 is not within 1..10")
        );
    }

    #[test]
    fn test_custom_message_missing_bound_renders_empty() {
        let mut param = number_param(Some(1), None);
        param.validations[0].validation_error = Some("min={min} max={max}".to_string());
        assert_eq!(
            compile(&param, None).check("0").message(),
            Some("min=1 max=")
        );
    }

    #[test]
    fn test_regex() {
        let validator = compile(&regex_param("^[a-z]+$", None), None);
        assert!(validator.check("hello").is_pass());
        assert!(validator.check("").is_pass());
        let msg = validator.check("Hello1").message().expect("fail").to_string();
        assert!(msg.contains("does not match"));
    }

    #[test]
    fn test_regex_custom_message() {
        let validator = compile(&regex_param("^[a-z]+$", Some("bad name: {value}")), None);
        assert_eq!(validator.check("X").message(), Some("bad name: X"));
    }

    #[test]
    fn test_invalid_regex_fails_with_pattern() {
        let validator = compile(&regex_param("([a-z", None), None);
        let msg = validator.check("abc").message().expect("fail").to_string();
        assert!(msg.contains("([a-z"));
    }

    #[test]
    fn test_string_without_regex_always_passes() {
        let param = ParameterDefinition::new("s", ParameterType::String, FormType::Textarea);
        let validator = compile(&param, None);
        assert!(!validator.is_constrained());
        assert!(validator.check("anything").is_pass());
    }

    #[test]
    fn test_bool_and_list_types_pass() {
        let param = ParameterDefinition::new("b", ParameterType::Bool, FormType::Switch)
            .with_validation(ParameterValidation {
                validation_min: Some(5),
                ..Default::default()
            });
        assert!(validate_value(&param, "false", None).is_pass());

        let list = ParameterDefinition::new("l", ParameterType::ListString, FormType::TagSelect);
        assert!(validate_value(&list, "[]", None).is_pass());
    }
}
