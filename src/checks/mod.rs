//! Declarative checks over decoded command output

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

pub mod query;

pub use query::{is_truthy, Query};

use crate::error::{ScenarioError, ScenarioResult};
use crate::harness::Kwargs;

/// A query paired with an expectation
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Equals {
        query: String,
        expected: Value,
        ignore_case: bool,
    },
    Exists {
        query: String,
    },
    NotExists {
        query: String,
    },
    /// The query evaluates to JSON null (a missing field)
    IsNull {
        query: String,
    },
    NotNull {
        query: String,
    },
    GreaterThan {
        query: String,
        expected: Value,
    },
    Length {
        query: String,
        expected: usize,
    },
    Contains {
        query: String,
        needle: Value,
    },
    Pattern {
        query: String,
        pattern: String,
    },
    IsEmpty,
}

impl Check {
    pub fn equals(query: impl Into<String>, expected: impl Into<Value>) -> Self {
        Check::Equals {
            query: query.into(),
            expected: expected.into(),
            ignore_case: false,
        }
    }

    pub fn equals_ignore_case(query: impl Into<String>, expected: impl Into<Value>) -> Self {
        Check::Equals {
            query: query.into(),
            expected: expected.into(),
            ignore_case: true,
        }
    }

    pub fn exists(query: impl Into<String>) -> Self {
        Check::Exists {
            query: query.into(),
        }
    }

    pub fn not_exists(query: impl Into<String>) -> Self {
        Check::NotExists {
            query: query.into(),
        }
    }

    pub fn is_null(query: impl Into<String>) -> Self {
        Check::IsNull {
            query: query.into(),
        }
    }

    pub fn not_null(query: impl Into<String>) -> Self {
        Check::NotNull {
            query: query.into(),
        }
    }

    pub fn greater_than(query: impl Into<String>, expected: impl Into<Value>) -> Self {
        Check::GreaterThan {
            query: query.into(),
            expected: expected.into(),
        }
    }

    pub fn length(query: impl Into<String>, expected: usize) -> Self {
        Check::Length {
            query: query.into(),
            expected,
        }
    }

    pub fn contains(query: impl Into<String>, needle: impl Into<Value>) -> Self {
        Check::Contains {
            query: query.into(),
            needle: needle.into(),
        }
    }

    pub fn pattern(query: impl Into<String>, pattern: impl Into<String>) -> Self {
        Check::Pattern {
            query: query.into(),
            pattern: pattern.into(),
        }
    }

    pub fn is_empty() -> Self {
        Check::IsEmpty
    }

    /// Evaluate against `output`, the decoded result of `command`
    pub fn verify(&self, command: &str, output: &Value, kwargs: &Kwargs) -> ScenarioResult<()> {
        let fail = |query: &str, expected: String, actual: &Value| ScenarioError::CheckFailed {
            command: command.to_string(),
            query: query.to_string(),
            expected,
            actual: display(actual),
        };

        match self {
            Check::Equals {
                query,
                expected,
                ignore_case,
            } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                let expected = kwargs.render_json(expected)?;
                if loosely_equal(&actual, &expected, *ignore_case) {
                    Ok(())
                } else {
                    Err(fail(&query, display(&expected), &actual))
                }
            }
            Check::Exists { query } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                if is_truthy(&actual) {
                    Ok(())
                } else {
                    Err(fail(&query, "a value".to_string(), &actual))
                }
            }
            Check::NotExists { query } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                if is_truthy(&actual) {
                    Err(fail(&query, "no value".to_string(), &actual))
                } else {
                    Ok(())
                }
            }
            Check::IsNull { query } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                if actual.is_null() {
                    Ok(())
                } else {
                    Err(fail(&query, "null".to_string(), &actual))
                }
            }
            Check::NotNull { query } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                if actual.is_null() {
                    Err(fail(&query, "not null".to_string(), &actual))
                } else {
                    Ok(())
                }
            }
            Check::GreaterThan { query, expected } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                let expected = kwargs.render_json(expected)?;
                if compare(&actual, &expected) == Some(Ordering::Greater) {
                    Ok(())
                } else {
                    Err(fail(&query, format!("> {}", display(&expected)), &actual))
                }
            }
            Check::Length { query, expected } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                let length = match &actual {
                    Value::Array(items) => Some(items.len()),
                    Value::Object(map) => Some(map.len()),
                    Value::String(s) => Some(s.chars().count()),
                    _ => None,
                };
                if length == Some(*expected) {
                    Ok(())
                } else {
                    Err(fail(&query, format!("length {expected}"), &actual))
                }
            }
            Check::Contains { query, needle } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                let needle = kwargs.render_json(needle)?;
                let found = match (&actual, &needle) {
                    (Value::Array(items), needle) => items
                        .iter()
                        .any(|item| loosely_equal(item, needle, false)),
                    (Value::String(haystack), needle) => haystack.contains(&display(needle)),
                    _ => false,
                };
                if found {
                    Ok(())
                } else {
                    Err(fail(&query, format!("containing {}", display(&needle)), &actual))
                }
            }
            Check::Pattern { query, pattern } => {
                let (query, actual) = evaluate(query, output, kwargs)?;
                let pattern = kwargs.render(pattern)?;
                let regex = Regex::new(&pattern).map_err(|err| ScenarioError::InvalidQuery {
                    query: pattern.clone(),
                    message: err.to_string(),
                })?;
                if !actual.is_null() && regex.is_match(&display(&actual)) {
                    Ok(())
                } else {
                    Err(fail(&query, format!("matching /{pattern}/"), &actual))
                }
            }
            Check::IsEmpty => {
                if output.is_null() {
                    Ok(())
                } else {
                    Err(fail("@", "empty output".to_string(), output))
                }
            }
        }
    }
}

/// Verify every check in order, stopping at the first failure
pub fn verify_all(
    checks: &[Check],
    command: &str,
    output: &Value,
    kwargs: &Kwargs,
) -> ScenarioResult<()> {
    checks
        .iter()
        .try_for_each(|check| check.verify(command, output, kwargs))
}

fn evaluate(query: &str, output: &Value, kwargs: &Kwargs) -> ScenarioResult<(String, Value)> {
    let rendered = kwargs.render(query)?;
    let value = Query::parse(&rendered)?.evaluate(output)?;
    Ok((rendered, value))
}

/// Strings as themselves, everything else as compact JSON
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equal as JSON, or equal once rendered as text
pub fn loosely_equal(actual: &Value, expected: &Value, ignore_case: bool) -> bool {
    if ignore_case {
        display(actual).to_lowercase() == display(expected).to_lowercase()
    } else {
        actual == expected || display(actual) == display(expected)
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
