//! Numeric request inputs and the schema that validates them.
//!
//! Inputs are an ordered list of named numeric fields. The first field is the
//! "primary" field that sweep detection looks at by default, so parsers build
//! the list in schema order rather than in whatever order the wire format used.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::{GatewayError, GatewayResult};

/// Ordered list of named numeric fields presented to a backend function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericFields {
    fields: Vec<(String, f64)>,
}

impl NumericFields {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field, keeping insertion order
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.push(name, value);
        self
    }

    /// Set a field. An existing field keeps its position.
    pub fn push(&mut self, name: &str, value: f64) {
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name.to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// First field in order
    pub fn primary(&self) -> Option<f64> {
        self.fields.first().map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for NumericFields {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut fields = NumericFields::new();
        for (name, value) in iter {
            fields.push(&name.into(), value);
        }
        fields
    }
}

/// Required input fields, in primary-first order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSchema {
    pub fields: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            fields: vec![
                "volatility".to_string(),
                "correlation".to_string(),
                "liquidity".to_string(),
            ],
        }
    }
}

impl InputSchema {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Check an already-built input against the schema.
    ///
    /// Every required field must be present and every value finite. An empty
    /// schema still rejects empty inputs.
    pub fn validate(&self, input: &NumericFields) -> GatewayResult<()> {
        if input.is_empty() {
            return Err(GatewayError::InvalidInput("no input fields".to_string()));
        }

        for name in &self.fields {
            if input.get(name).is_none() {
                return Err(GatewayError::InvalidInput(format!(
                    "missing field '{}'",
                    name
                )));
            }
        }

        if let Some((name, value)) = input.iter().find(|(_, v)| !v.is_finite()) {
            return Err(GatewayError::InvalidInput(format!(
                "field '{}' is not a finite number: {}",
                name, value
            )));
        }

        Ok(())
    }

    /// Build inputs from a JSON object body.
    ///
    /// Schema fields come first in schema order and must be numeric. Extra
    /// numeric fields follow in key order; other extra keys are ignored, the
    /// same way unknown query parameters are.
    pub fn parse_json(&self, body: &JsonValue) -> GatewayResult<NumericFields> {
        let object = body
            .as_object()
            .ok_or_else(|| GatewayError::InvalidInput("body must be a JSON object".to_string()))?;

        let mut fields = NumericFields::new();
        for name in &self.fields {
            let value = object
                .get(name)
                .ok_or_else(|| GatewayError::InvalidInput(format!("missing field '{}'", name)))?;
            fields.push(name, json_number(name, value)?);
        }

        for (name, value) in object {
            if self.fields.iter().any(|f| f == name) {
                continue;
            }
            if let Some(number) = value.as_f64() {
                fields.push(name, number);
            }
        }

        self.validate(&fields)?;
        Ok(fields)
    }

    /// Build inputs from decoded query parameters. Unknown parameters are ignored.
    pub fn parse_query(&self, params: &HashMap<String, String>) -> GatewayResult<NumericFields> {
        let mut fields = NumericFields::new();
        for name in &self.fields {
            let raw = params
                .get(name)
                .ok_or_else(|| GatewayError::InvalidInput(format!("missing field '{}'", name)))?;
            let value: f64 = raw.trim().parse().map_err(|_| {
                GatewayError::InvalidInput(format!("field '{}' is not numeric: '{}'", name, raw))
            })?;
            fields.push(name, value);
        }

        self.validate(&fields)?;
        Ok(fields)
    }
}

fn json_number(name: &str, value: &JsonValue) -> GatewayResult<f64> {
    value.as_f64().ok_or_else(|| {
        GatewayError::InvalidInput(format!("field '{}' is not numeric: {}", name, value))
    })
}
