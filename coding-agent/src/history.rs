//! Append-only record of what was asked, answered and fed back.
//!
//! Only the state machine writes here. Nothing on the validation or
//! execution path reads it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::response_parser::ParsedResponse;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRecord {
    pub task: String,
    pub response: ParsedResponse,
    pub feedback: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InteractionHistory {
    records: Vec<InteractionRecord>,
}

impl InteractionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(
        &mut self,
        task: impl Into<String>,
        response: ParsedResponse,
        feedback: Option<String>,
    ) {
        self.records.push(InteractionRecord {
            task: task.into(),
            response,
            feedback,
            recorded_at: Utc::now(),
        });
    }

    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keep_chronological_order() {
        let mut history = InteractionHistory::new();
        let response = ParsedResponse::Clarification {
            question: "which?".to_string(),
        };
        history.append("first", response.clone(), None);
        history.append("second", response, Some("faster".to_string()));

        let records = history.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].task, "first");
        assert_eq!(records[1].feedback.as_deref(), Some("faster"));
        assert!(records[0].recorded_at <= records[1].recorded_at);
    }
}
