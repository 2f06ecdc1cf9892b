use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user's full document: name plus the two replaceable sub-collections.
///
/// Subjects and daily logs are opaque to the server. The client owns their
/// shape; the server round-trips whatever JSON it was given. Timestamps are
/// maintained by the store, not by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub name: String,
    pub subjects: Vec<Value>,
    pub dailylogs: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates a record with empty collections, timestamped now.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            subjects: Vec::new(),
            dailylogs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_subjects(mut self, subjects: Vec<Value>) -> Self {
        self.subjects = subjects;
        self
    }
}

/// A partial write against a user record. Only fields that are `Some` are
/// replaced; the rest of the record is left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub subjects: Option<Vec<Value>>,
    pub dailylogs: Option<Vec<Value>>,
}

impl UserPatch {
    pub fn subjects(subjects: Vec<Value>) -> Self {
        Self {
            subjects: Some(subjects),
            dailylogs: None,
        }
    }

    pub fn dailylogs(dailylogs: Vec<Value>) -> Self {
        Self {
            subjects: None,
            dailylogs: Some(dailylogs),
        }
    }
}
