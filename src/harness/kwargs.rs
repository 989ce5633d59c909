//! Keyword arguments and template rendering
//!
//! Templates use `{name}` placeholders and `{{` / `}}` for literal braces.
//! Rendering is single-pass: substituted values are never scanned again.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ScenarioError, ScenarioResult};

/// Keyword arguments scoped to one scenario execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    values: BTreeMap<String, Value>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Insert every pair, overwriting existing keys
    pub fn update<K, V, I>(&mut self, pairs: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The value of `key` rendered the way a template would render it
    pub fn text(&self, key: &str) -> ScenarioResult<String> {
        self.values
            .get(key)
            .map(render_value)
            .ok_or_else(|| ScenarioError::MissingKeyword {
                name: key.to_string(),
                template: format!("{{{key}}}"),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute every `{name}` placeholder in `template`
    pub fn render(&self, template: &str) -> ScenarioResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        out.push('{');
                        continue;
                    }

                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }

                    if !closed {
                        return Err(invalid_template(template, offset, "unclosed '{'"));
                    }
                    if name.is_empty() || !name.chars().all(is_keyword_char) {
                        return Err(invalid_template(
                            template,
                            offset,
                            &format!("invalid keyword name '{name}'"),
                        ));
                    }

                    let value =
                        self.values
                            .get(&name)
                            .ok_or_else(|| ScenarioError::MissingKeyword {
                                name: name.clone(),
                                template: template.to_string(),
                            })?;
                    out.push_str(&render_value(value));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        out.push('}');
                    } else {
                        return Err(invalid_template(template, offset, "single '}'"));
                    }
                }
                _ => out.push(ch),
            }
        }

        Ok(out)
    }

    /// Render every string inside a JSON value, leaving other types untouched
    pub fn render_json(&self, value: &Value) -> ScenarioResult<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.render(s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.render_json(item))
                    .collect::<ScenarioResult<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                let mut rendered = serde_json::Map::new();
                for (key, item) in map {
                    rendered.insert(key.clone(), self.render_json(item)?);
                }
                Value::Object(rendered)
            }
            other => other.clone(),
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kwargs = Kwargs::new();
        kwargs.update(iter);
        kwargs
    }
}

/// Render a keyword value as command-line text
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => value.to_string(),
    }
}

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn invalid_template(template: &str, offset: usize, message: &str) -> ScenarioError {
    ScenarioError::InvalidTemplate {
        template: template.to_string(),
        offset,
        message: message.to_string(),
    }
}
