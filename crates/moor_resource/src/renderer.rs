//! Template rendering over document values.
//!
//! A resource template is an ordinary manifest whose scalars may contain
//! `{{variable}}` placeholders. Rendering walks the whole value tree,
//! substitutes placeholders in string scalars from the caller's context,
//! and reinterprets a fully-numeric result as an integer. The visitor is
//! stateless; sequences keep their order and mappings their keys.

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::{ResourceError, ResourceResult};

/// Renderer for resource template values.
pub struct ResourceRenderer {
    variable_pattern: Regex,
}

impl Default for ResourceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self {
            // Match {{variable_name}} pattern
            variable_pattern: Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}")
                .expect("static pattern"),
        }
    }

    /// Render a whole value tree: every reachable scalar is visited,
    /// containers are rebuilt in order.
    pub fn render_value(&self, value: &Value, context: &Mapping) -> ResourceResult<Value> {
        match value {
            Value::String(scalar) => self.render_scalar(scalar, context),
            Value::Sequence(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    rendered.push(self.render_value(item, context)?);
                }
                Ok(Value::Sequence(rendered))
            }
            Value::Mapping(mapping) => {
                let mut rendered = Mapping::new();
                for (key, item) in mapping {
                    rendered.insert(key.clone(), self.render_value(item, context)?);
                }
                Ok(Value::Mapping(rendered))
            }
            // numbers, booleans, and nulls carry no placeholders
            other => Ok(other.clone()),
        }
    }

    /// Substitute placeholders in one string scalar, then opportunistically
    /// reinterpret the result as an integer.
    fn render_scalar(&self, scalar: &str, context: &Mapping) -> ResourceResult<Value> {
        let rendered = self.render_str(scalar, context)?;
        match rendered.parse::<i64>() {
            Ok(number) => Ok(Value::Number(number.into())),
            Err(_) => Ok(Value::String(rendered)),
        }
    }

    /// Substitute `{{var}}` placeholders from the context. A placeholder
    /// with no matching context variable, or one bound to a sequence or
    /// mapping, fails the render.
    pub fn render_str(&self, text: &str, context: &Mapping) -> ResourceResult<String> {
        for captures in self.variable_pattern.captures_iter(text) {
            let variable = &captures[1];
            let Some(value) = lookup(context, variable) else {
                return Err(ResourceError::UnresolvedVariable {
                    variable: variable.to_string(),
                    scalar: text.to_string(),
                });
            };
            if stringify(value).is_none() {
                return Err(ResourceError::NonScalarVariable {
                    variable: variable.to_string(),
                    scalar: text.to_string(),
                });
            }
        }
        let rendered = self
            .variable_pattern
            .replace_all(text, |captures: &regex::Captures| {
                lookup(context, &captures[1]).and_then(stringify).unwrap_or_default()
            });
        Ok(rendered.to_string())
    }
}

fn lookup<'a>(context: &'a Mapping, variable: &str) -> Option<&'a Value> {
    context.get(Value::String(variable.to_string()))
}

/// Stringify a scalar context value; containers have no text form.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
