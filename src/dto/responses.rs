use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Comment, PhotoId, UserProfile, UserRef};

/// Response of `GET /photos`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PhotosPage {
    #[serde(default)]
    pub photos: Vec<PhotoRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// A photo as the service serializes it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    #[serde(rename = "_id")]
    pub id: PhotoId,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserRef>,
    #[serde(default)]
    pub likes: Vec<LikeRef>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PhotoRecord {
    pub fn liked_by(&self, viewer_id: &str) -> bool {
        self.likes.iter().any(|like| like.is_by(viewer_id))
    }
}

/// One entry of a photo's like list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LikeRef {
    Id(String),
    Entry {
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<serde_json::Value>,
    },
}

impl LikeRef {
    pub fn is_by(&self, viewer_id: &str) -> bool {
        match self {
            LikeRef::Id(id) => id == viewer_id,
            LikeRef::Entry { user_id, user } => {
                user_id.as_deref() == Some(viewer_id)
                    || user.as_ref().and_then(|u| u.as_str()) == Some(viewer_id)
            }
        }
    }
}

/// Response of `POST /photos/{id}/like`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<u64>,
}

/// Response of `POST /photos/{id}/comment`: the full comment list.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommentsResponse {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: UserProfile,
}

/// Metadata of a created photo. Only logged, never interpreted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UploadResponse(pub serde_json::Value);
