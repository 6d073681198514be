//! Evaluator response shape.
//!
//! A `PreviewOutput` is decoded fresh for every evaluator response and
//! discarded when the next one arrives.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::diagnostic::RawDiagnostic;
use super::parameter::ParameterDefinition;

/// Parameters produced by a successful evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewParameters {
    #[serde(default, alias = "Parameters")]
    pub parameters: Vec<ParameterDefinition>,
}

/// One structured evaluator log record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub level: String,

    #[serde(default)]
    pub msg: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,

    /// Any other attributes on the record.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LogLine {
    pub fn is_error(&self) -> bool {
        self.level.eq_ignore_ascii_case("error")
    }
}

/// Raw evaluator response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewOutput {
    /// `None` when evaluation failed outright; `diags` then explains why.
    #[serde(default)]
    pub output: Option<PreviewParameters>,

    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub diags: Vec<Option<RawDiagnostic>>,

    #[serde(default, deserialize_with = "deserialize_parser_logs")]
    pub parser_logs: Vec<LogLine>,
}

impl PreviewOutput {
    /// Parameters in snapshot order (empty when there is no output).
    pub fn parameters(&self) -> &[ParameterDefinition] {
        self.output
            .as_ref()
            .map(|o| o.parameters.as_slice())
            .unwrap_or_default()
    }

    pub fn with_parameters(parameters: Vec<ParameterDefinition>) -> Self {
        Self {
            output: Some(PreviewParameters { parameters }),
            diags: Vec::new(),
            parser_logs: Vec::new(),
        }
    }
}

fn deserialize_nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParserLogs {
    Records(Vec<LogLine>),
    Text(String),
}

/// Parser logs arrive either as structured records or as a logfmt text blob.
fn deserialize_parser_logs<'de, D>(deserializer: D) -> Result<Vec<LogLine>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawParserLogs>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(RawParserLogs::Records(lines)) => lines,
        Some(RawParserLogs::Text(text)) => parse_logfmt(&text),
    })
}

/// Parse logfmt lines (`key=value key="quoted value"`) into log records.
///
/// Blank lines are skipped. Keys without `=` are recorded with an empty value.
pub fn parse_logfmt(text: &str) -> Vec<LogLine> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut record = LogLine::default();
            for (key, value) in logfmt_pairs(line) {
                match key.as_str() {
                    "level" => record.level = value,
                    "msg" => record.msg = value,
                    "err" => record.err = Some(value),
                    _ => {
                        record.extra.insert(key, Value::String(value));
                    }
                }
            }
            record
        })
        .collect()
}

fn logfmt_pairs(line: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }

        let mut value = String::new();
        if chars.next_if_eq(&'=').is_some() {
            if chars.next_if_eq(&'"').is_some() {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(other) => value.push(other),
                            None => break,
                        },
                        '"' => break,
                        other => value.push(other),
                    }
                }
            } else {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }
            }
        }

        if !key.is_empty() {
            pairs.push((key, value));
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_minimal_response() {
        let out: PreviewOutput =
            serde_json::from_str(r#"{"output": null, "diags": null}"#).expect("deserialize");
        assert!(out.output.is_none());
        assert!(out.diags.is_empty());
        assert!(out.parser_logs.is_empty());
        assert!(out.parameters().is_empty());
    }

    #[test]
    fn test_decode_structured_logs() {
        let out: PreviewOutput = serde_json::from_value(serde_json::json!({
            "output": { "parameters": [] },
            "diags": [null],
            "parser_logs": [
                { "level": "ERROR", "msg": "bad block", "err": "unexpected token", "source": "main.tf" },
                { "level": "DEBUG", "msg": "noise" }
            ]
        }))
        .expect("deserialize");

        assert_eq!(out.diags, vec![None]);
        assert_eq!(out.parser_logs.len(), 2);
        assert!(out.parser_logs[0].is_error());
        assert_eq!(out.parser_logs[0].err.as_deref(), Some("unexpected token"));
        assert_eq!(out.parser_logs[0].extra["source"], "main.tf");
        assert!(!out.parser_logs[1].is_error());
    }

    #[test]
    fn test_decode_text_logs() {
        let out: PreviewOutput = serde_json::from_value(serde_json::json!({
            "output": null,
            "diags": [],
            "parser_logs": "time=2025-01-01T00:00:00Z level=ERROR msg=\"failed to parse\" err=\"line 3: \\\"x\\\" unexpected\"\nlevel=INFO msg=done\n"
        }))
        .expect("deserialize");

        assert_eq!(out.parser_logs.len(), 2);
        let first = &out.parser_logs[0];
        assert_eq!(first.level, "ERROR");
        assert_eq!(first.msg, "failed to parse");
        assert_eq!(first.err.as_deref(), Some("line 3: \"x\" unexpected"));
        assert_eq!(first.extra["time"], "2025-01-01T00:00:00Z");
        assert_eq!(out.parser_logs[1].msg, "done");
    }

    #[test]
    fn test_capitalized_parameters_alias() {
        let out: PreviewOutput = serde_json::from_value(serde_json::json!({
            "output": { "Parameters": [ { "name": "a", "type": "string", "form_type": "input" } ] },
            "diags": []
        }))
        .expect("deserialize");
        assert_eq!(out.parameters().len(), 1);
    }

    #[test]
    fn test_logfmt_bare_key() {
        let lines = parse_logfmt("level=ERROR orphan msg=x");
        assert_eq!(lines[0].extra["orphan"], "");
        assert_eq!(lines[0].msg, "x");
    }
}
