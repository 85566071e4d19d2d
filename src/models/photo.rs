use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dto::PhotoRecord;

/// Opaque photo identifier issued by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhotoId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PhotoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Display model of a loaded photo. Interaction state lives in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: PhotoId,
    pub image_url: String,
    pub caption: String,
    pub title: Option<String>,
    pub location: Option<String>,
    pub author: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Like count the service reported when the page was fetched.
    pub like_count: u64,
}

impl From<&PhotoRecord> for Photo {
    fn from(record: &PhotoRecord) -> Self {
        Self {
            id: record.id.clone(),
            image_url: record.image_url.clone(),
            caption: record.caption.clone(),
            title: record.title.clone(),
            location: record.location.clone(),
            author: record
                .creator
                .as_ref()
                .and_then(|creator| creator.email())
                .unwrap_or("unknown")
                .to_owned(),
            created_at: record.created_at,
            like_count: record.likes.len() as u64,
        }
    }
}
