use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Lifecycle state of a render job as stored in Redis.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    NotStarted,
    InQueue,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether a job in this state may move to `next`.
    ///
    /// `FAILED` is reachable from every non-terminal state, and also as the
    /// very first record when validation rejects the input.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (JobState::NotStarted, JobState::InQueue) => true,
            (JobState::InQueue, JobState::Completed) => true,
            (from, JobState::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// A render job record, persisted as JSON under `job:<id>`.
///
/// Every write replaces the whole record. Build records through the
/// state constructors so `result` and `error` stay tied to their state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: String,
    pub state: JobState,
    #[serde(default = "empty_workflow")]
    pub workflow: serde_json::Value,
    pub result: Option<Vec<String>>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

fn empty_workflow() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl JobRecord {
    fn new(id: &str, state: JobState) -> Self {
        Self {
            id: id.to_string(),
            state,
            workflow: empty_workflow(),
            result: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn not_started(id: &str, workflow: serde_json::Value) -> Self {
        Self {
            workflow,
            ..Self::new(id, JobState::NotStarted)
        }
    }

    pub fn in_queue(id: &str) -> Self {
        Self::new(id, JobState::InQueue)
    }

    pub fn completed(id: &str, result: Vec<String>) -> Self {
        Self {
            result: Some(result),
            ..Self::new(id, JobState::Completed)
        }
    }

    pub fn failed(id: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(id, JobState::Failed)
        }
    }

    /// Storage key for a job id.
    pub fn key_for(id: &str) -> String {
        format!("job:{id}")
    }

    pub fn key(&self) -> String {
        Self::key_for(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_state_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&JobState::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
        assert_eq!(JobState::InQueue.to_string(), "IN_QUEUE");
        assert_eq!(JobState::from_str("COMPLETED").unwrap(), JobState::Completed);
    }

    #[test]
    fn test_transitions() {
        assert!(JobState::NotStarted.can_transition_to(JobState::InQueue));
        assert!(JobState::NotStarted.can_transition_to(JobState::Failed));
        assert!(JobState::InQueue.can_transition_to(JobState::Completed));
        assert!(JobState::InQueue.can_transition_to(JobState::Failed));
        assert!(!JobState::NotStarted.can_transition_to(JobState::Completed));
        assert!(!JobState::Failed.can_transition_to(JobState::Failed));
        assert!(!JobState::Completed.can_transition_to(JobState::InQueue));
    }

    #[test]
    fn test_completed_record_round_trip() {
        let result = vec!["aGVsbG8=".to_string(), "https://bucket/x.png".to_string()];
        let record = JobRecord::completed("abc", result.clone());
        let json = serde_json::to_string(&record).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.state, JobState::Completed);
        assert_eq!(back.error, None);
        assert_eq!(back.result, Some(result));
        assert_eq!(back, record);
    }

    #[test]
    fn test_absent_fields_serialize_as_null() {
        let record = JobRecord::failed("abc", "boom");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["result"], serde_json::Value::Null);
        assert_eq!(value["error"], "boom");
        assert_eq!(value["workflow"], serde_json::json!({}));
        assert_eq!(record.key(), "job:abc");
    }
}
