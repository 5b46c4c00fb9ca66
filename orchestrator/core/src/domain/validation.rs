// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Output Validation Domain
//!
//! Validators inspect the [`StateDelta`] an agent produced and return a list
//! of human-readable problems. An empty list means the output is accepted.
//! The self-correction wrapper (`crate::application::reflexion`) feeds these
//! messages back to the agent on retry.
//!
//! ## Key Concepts
//!
//! | Type | Checks |
//! |------|--------|
//! | `NonEmptyValidator` | response text is present and not blank |
//! | `JsonContentValidator` | response text parses as JSON |
//! | `SchemaValidator` | response text is a JSON object with required keys |
//!
//! All validators read the *response text*: the `text` field of the last
//! `generate` trace entry in the delta.

use crate::domain::board::StateDelta;
use serde_json::Value;

/// Trace action recorded by model-backed agents for each generation.
pub const GENERATE_ACTION: &str = "generate";

pub trait OutputValidator: Send + Sync {
    fn validate(&self, delta: &StateDelta) -> Vec<String>;
}

/// Text of the last `generate` trace entry carrying a string `text`.
pub fn response_text(delta: &StateDelta) -> Option<&str> {
    delta
        .trace_entries
        .iter()
        .rev()
        .filter(|entry| entry.action == GENERATE_ACTION)
        .find_map(|entry| entry.data.get("text").and_then(Value::as_str))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyValidator;

impl OutputValidator for NonEmptyValidator {
    fn validate(&self, delta: &StateDelta) -> Vec<String> {
        match response_text(delta) {
            Some(text) if !text.trim().is_empty() => Vec::new(),
            _ => vec!["Agent produced an empty response.".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentValidator;

impl OutputValidator for JsonContentValidator {
    fn validate(&self, delta: &StateDelta) -> Vec<String> {
        let Some(text) = response_text(delta) else {
            return vec!["No response text found to validate as JSON.".to_string()];
        };
        match serde_json::from_str::<Value>(text) {
            Ok(_) => Vec::new(),
            Err(e) => vec![format!("Response is not valid JSON: {e}")],
        }
    }
}

/// Requires the response to be a JSON object containing `required_keys`.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    pub required_keys: Vec<String>,
}

impl SchemaValidator {
    pub fn new<I, S>(required_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_keys: required_keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl OutputValidator for SchemaValidator {
    fn validate(&self, delta: &StateDelta) -> Vec<String> {
        let Some(text) = response_text(delta) else {
            return vec!["No response text found to validate.".to_string()];
        };
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(e) => return vec![format!("Response is not valid JSON: {e}")],
        };
        let Some(object) = value.as_object() else {
            return vec!["Response JSON is not an object.".to_string()];
        };

        let missing: Vec<&str> = self
            .required_keys
            .iter()
            .filter(|key| !object.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Vec::new()
        } else {
            vec![format!("Missing required keys: {}", missing.join(", "))]
        }
    }
}
