use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    Method, RequestBuilder, Url,
    header::AUTHORIZATION,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    auth::Session,
    config::ClientConfig,
    dto::{
        AuthResponse, CommentRequest, CommentsResponse, LikeResponse, LoginForm, PhotoQuery,
        PhotosPage, RegisterForm, UploadResponse,
    },
    errors::ClientError,
    models::PhotoId,
    upload::UploadForm,
};

/// Remote operations the feed depends on.
#[async_trait]
pub trait PhotoApi: Send + Sync {
    /// GET /photos?page=1&limit=20&search=&sortBy=createdAt
    async fn fetch_photos(&self, query: &PhotoQuery) -> Result<PhotosPage, ClientError>;

    /// POST /photos/{id}/like
    /// The service flips the viewer's like and may report the new count.
    async fn toggle_like(&self, photo_id: &PhotoId) -> Result<LikeResponse, ClientError>;

    /// POST /photos/{id}/comment
    /// Body: { "text": "..." }
    async fn add_comment(
        &self,
        photo_id: &PhotoId,
        comment: &CommentRequest,
    ) -> Result<CommentsResponse, ClientError>;

    /// POST /photos/upload (multipart)
    async fn upload_photo(&self, form: &UploadForm) -> Result<UploadResponse, ClientError>;

    /// Identity used to mark photos the viewer already liked.
    fn viewer_id(&self) -> Option<String>;
}

/// `PhotoApi` over HTTP. Attaches `Authorization: Bearer <token>` whenever a
/// session is present; without one every request is anonymous.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
    session: RwLock<Option<Session>>,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Validation(format!("Invalid API URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "Invalid API URL {base_url}"
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            session: RwLock::new(None),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api = Self::new(&config.api_url, config.request_timeout)?;
        if let Some(token) = &config.token {
            api.set_session(Session::from_token(token.clone()));
        }
        Ok(api)
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_session(&self, session: Session) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
    }

    pub fn logout(&self) {
        self.session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        info!("Session cleared");
    }

    /// POST /auth/login
    /// Body: { "email": "...", "password": "..." }
    pub async fn login(&self, form: &LoginForm) -> Result<Session, ClientError> {
        form.check()?;

        let response: AuthResponse = send(
            self.request(Method::POST, &["auth", "login"])?.json(form),
        )
        .await?;

        let token = response.token.ok_or_else(|| {
            ClientError::Unauthorized("Authentication failed. Please try again.".into())
        })?;
        let session = Session::new(token, response.user);
        self.set_session(session.clone());

        info!(
            "User logged in: {}",
            session.user.email.as_deref().unwrap_or(&form.email)
        );
        Ok(session)
    }

    /// POST /auth/register
    /// Body: { "name": "...", "email": "...", "password": "...", "role": "creator" }
    pub async fn register(&self, form: &RegisterForm) -> Result<AuthResponse, ClientError> {
        form.check()?;

        let response: AuthResponse = send(
            self.request(Method::POST, &["auth", "register"])?.json(form),
        )
        .await?;

        if let Some(token) = &response.token {
            self.set_session(Session::new(token.clone(), response.user.clone()));
        }

        info!("New user registered: {}", form.email);
        Ok(response)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::Validation(format!("Invalid API URL {}", self.base_url)))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let url = self.url(segments)?;
        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url);
        if let Some(session) = self.session() {
            if session.is_expired_at(Utc::now()) {
                warn!("Session token expired; sending request anonymously");
            } else {
                builder = builder.header(AUTHORIZATION, session.bearer());
            }
        }
        Ok(builder)
    }
}

async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::from_response(status, &body));
    }

    let body = if body.trim().is_empty() { "{}" } else { &body };
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl PhotoApi for HttpApi {
    async fn fetch_photos(&self, query: &PhotoQuery) -> Result<PhotosPage, ClientError> {
        send(self.request(Method::GET, &["photos"])?.query(query)).await
    }

    async fn toggle_like(&self, photo_id: &PhotoId) -> Result<LikeResponse, ClientError> {
        send(self.request(Method::POST, &["photos", photo_id.as_str(), "like"])?).await
    }

    async fn add_comment(
        &self,
        photo_id: &PhotoId,
        comment: &CommentRequest,
    ) -> Result<CommentsResponse, ClientError> {
        send(
            self.request(Method::POST, &["photos", photo_id.as_str(), "comment"])?
                .json(comment),
        )
        .await
    }

    async fn upload_photo(&self, form: &UploadForm) -> Result<UploadResponse, ClientError> {
        let photo = form
            .photo
            .as_ref()
            .ok_or_else(|| ClientError::Validation("Photo is required".into()))?;

        let part = Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str(&photo.content_type)?;

        let multipart = Form::new()
            .part("photo", part)
            .text("title", form.title.clone())
            .text("caption", form.caption.clone())
            .text("location", form.location.clone())
            .text("tags", form.tags.clone());

        send(
            self.request(Method::POST, &["photos", "upload"])?
                .multipart(multipart),
        )
        .await
    }

    fn viewer_id(&self) -> Option<String> {
        self.session()
            .and_then(|session| session.user.id.clone())
    }
}
