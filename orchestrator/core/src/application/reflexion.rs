// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reflexion
//!
//! Self-correction wrapper: [`ReflexionAgent`] runs the inner agent, checks
//! the delta with its [`OutputValidator`]s and, on failure, retries with the
//! errors appended to the belief state and a `reflexion_error` trace entry.
//!
//! Feedback only ever lives in the retry's local context; the board sees
//! nothing but the delta that is finally returned. When retries run out the
//! last delta is returned as-is.

use crate::domain::agent::{Agent, AgentError};
use crate::domain::board::{ContextSlice, JsonMap, StateDelta, TraceEntry};
use crate::domain::validation::OutputValidator;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_RETRIES: usize = 3;

pub struct ReflexionAgent {
    inner: Arc<dyn Agent>,
    validators: Vec<Arc<dyn OutputValidator>>,
    max_retries: usize,
}

impl ReflexionAgent {
    pub fn new(inner: Arc<dyn Agent>, validators: Vec<Arc<dyn OutputValidator>>) -> Self {
        Self {
            inner,
            validators,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn validate(&self, delta: &StateDelta) -> Vec<String> {
        self.validators
            .iter()
            .flat_map(|validator| validator.validate(delta))
            .collect()
    }
}

#[async_trait]
impl Agent for ReflexionAgent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn step(&self, context: ContextSlice) -> Result<StateDelta, AgentError> {
        let mut current = context.clone();
        let mut attempt = 0;

        loop {
            let delta = self.inner.step(current).await?;
            let errors = self.validate(&delta);
            if errors.is_empty() {
                if attempt > 0 {
                    debug!(agent = %self.name(), attempt, "Reflexion succeeded after retry");
                }
                return Ok(delta);
            }

            if attempt == self.max_retries {
                warn!(
                    agent = %self.name(),
                    retries = self.max_retries,
                    errors = %errors.join("; "),
                    "Reflexion retries exhausted, returning last output"
                );
                return Ok(delta);
            }

            attempt += 1;
            metrics::counter!("conclave_reflexion_retries_total", "agent" => self.name().to_string())
                .increment(1);
            debug!(agent = %self.name(), attempt, "Output failed validation, retrying");

            let feedback = format!(
                "Your previous response (attempt {attempt}) had errors: {}. Please fix these issues.",
                errors.join("; ")
            );
            let mut data = JsonMap::new();
            data.insert("errors".to_string(), json!(errors));
            data.insert("attempt".to_string(), json!(attempt));

            current = context.clone();
            current.belief_state = format!("{}\n\n{}", context.belief_state, feedback);
            current
                .trace
                .push(TraceEntry::new(self.name(), "reflexion_error").with_data(data));
        }
    }
}
