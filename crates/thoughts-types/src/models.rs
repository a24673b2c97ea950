use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A short text post. Ids go out as `_id` so existing clients keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub message: String,
    pub hearts: u64,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

impl Thought {
    /// Authored thoughts are changed only by their author. Anonymous ones by anybody signed in.
    pub fn can_be_changed_by(&self, user_id: Uuid) -> bool {
        self.created_by.is_none_or(|owner| owner == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
