use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    client::PhotoApi,
    dto::UploadResponse,
    errors::ClientError,
};

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// An image picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, inferring its type from the extension.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::Validation(format!("Could not read {}: {}", path.display(), e))
        })?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("photo")
            .to_owned();

        Ok(Self::new(file_name, content_type_for(path), bytes))
    }

    /// Rejects files the service does not accept.
    pub fn check(&self) -> Result<(), ClientError> {
        if !ALLOWED_TYPES.contains(&self.content_type.as_str()) {
            return Err(ClientError::Validation(
                "Only JPEG, PNG, and GIF files are allowed.".into(),
            ));
        }
        if self.bytes.len() > MAX_PHOTO_BYTES {
            return Err(ClientError::Validation(
                "File is too large. Maximum size is 5MB.".into(),
            ));
        }
        Ok(())
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Fields of the upload form. Optional text fields are sent as empty strings.
#[derive(Debug, Clone, Default, Validate, Serialize)]
pub struct UploadForm {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub caption: String,
    pub location: String,
    pub tags: String,
    #[serde(skip)]
    pub photo: Option<PhotoFile>,
}

impl UploadForm {
    pub fn new(title: impl Into<String>, photo: PhotoFile) -> Self {
        Self {
            title: title.into(),
            photo: Some(photo),
            ..Self::default()
        }
    }

    /// Picks a photo, refusing it (and keeping the previous one) when it is
    /// of the wrong type or too large.
    pub fn select_photo(&mut self, photo: PhotoFile) -> Result<(), ClientError> {
        photo.check()?;
        self.photo = Some(photo);
        Ok(())
    }

    pub fn clear_photo(&mut self) {
        self.photo = None;
    }

    pub fn check(&self) -> Result<(), ClientError> {
        self.validate()
            .map_err(crate::dto::validation_error)?;
        match &self.photo {
            Some(photo) => photo.check(),
            None => Err(ClientError::Validation("Photo is required".into())),
        }
    }
}

/// Validates and submits the form. The form is only borrowed so a failed
/// submission can be retried as-is.
pub async fn submit(api: &dyn PhotoApi, form: &UploadForm) -> Result<UploadResponse, ClientError> {
    if let Err(err) = form.check() {
        warn!("Upload rejected: {}", err);
        return Err(err);
    }

    match api.upload_photo(form).await {
        Ok(created) => {
            info!("Photo uploaded: {}", form.title);
            Ok(created)
        }
        Err(err) => {
            warn!("Upload failed: {}", err);
            Err(err)
        }
    }
}
