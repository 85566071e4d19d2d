use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A reference to a user as the service embeds it: either a bare id or a
/// populated profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(String),
    Profile(UserProfile),
}

impl UserRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            UserRef::Id(id) => Some(id),
            UserRef::Profile(profile) => profile.id.as_deref(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            UserRef::Id(_) => None,
            UserRef::Profile(profile) => profile.email.as_deref(),
        }
    }
}
