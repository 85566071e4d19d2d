use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserRef;

/// A comment exactly as the service returned it. Comments are never
/// created locally; the store only ever holds server-issued lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Preformatted display time, when the service supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Comment {
    pub fn author_email(&self) -> Option<&str> {
        self.user.as_ref().and_then(UserRef::email)
    }
}
