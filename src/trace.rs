use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub action: String,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of the steps taken while building one recommendation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub steps: Vec<TraceStep>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: &str, result: Value) {
        self.steps.push(TraceStep {
            action: action.to_string(),
            result,
            timestamp: Utc::now(),
        });
    }

    pub fn record_error(&mut self, message: &str) {
        self.record("error", json!({ "error": message }));
    }

    pub fn actions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.action.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
