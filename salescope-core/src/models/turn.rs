use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Which pipeline stage produced the failure recorded on a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Translation,
    Execution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnError {
    pub stage: FailureStage,
    pub message: String,
}

/// One entry in a conversation session. Created once, appended, never
/// mutated thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TurnError>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            generated_sql: None,
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant_success(
        content: impl Into<String>,
        generated_sql: String,
        result: QueryResult,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            generated_sql: Some(generated_sql),
            result: Some(result),
            error: None,
            created_at: Utc::now(),
        }
    }

    /// `generated_sql` is present for execution-stage failures (so the user
    /// can see what was attempted) and absent for translation-stage ones.
    pub fn assistant_failure(
        content: impl Into<String>,
        generated_sql: Option<String>,
        error: TurnError,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            generated_sql,
            result: None,
            error: Some(error),
            created_at: Utc::now(),
        }
    }
}
