//! In-process mock of the photo service, used to drive the real HTTP client.
#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

// Tests do not need production-strength hashing.
const HASH_COST: u32 = 4;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub id: String,
    pub image_url: String,
    pub title: String,
    pub caption: String,
    pub creator_email: String,
    pub likes: Vec<String>,
    pub comments: Vec<Value>,
    pub created_at: DateTime<Utc>,
}

impl StoredPhoto {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "imageUrl": self.image_url,
            "title": self.title,
            "caption": self.caption,
            "creator": { "email": self.creator_email },
            "likes": self.likes.iter().map(|id| json!({ "userId": id })).collect::<Vec<_>>(),
            "comments": self.comments,
            "createdAt": self.created_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    exp: usize,
}

#[derive(Clone)]
pub struct MockState {
    pub users: Arc<DashMap<Uuid, User>>,
    pub email_index: Arc<DashMap<String, Uuid>>,
    pub photos: Arc<DashMap<String, StoredPhoto>>,
    pub jwt_secret: String,
    pub fail_likes: Arc<AtomicBool>,
    pub fail_comments: Arc<AtomicBool>,
    pub auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockState {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            email_index: Arc::new(DashMap::new()),
            photos: Arc::new(DashMap::new()),
            jwt_secret: "mock-secret".to_owned(),
            fail_likes: Arc::new(AtomicBool::new(false)),
            fail_comments: Arc::new(AtomicBool::new(false)),
            auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a photo liked by `likers`; `age_minutes` orders the feed.
    pub fn seed_photo(&self, id: &str, caption: &str, likers: &[&str], age_minutes: i64) {
        self.photos.insert(
            id.to_owned(),
            StoredPhoto {
                id: id.to_owned(),
                image_url: format!("https://cdn.test/{id}.jpg"),
                title: caption.to_owned(),
                caption: caption.to_owned(),
                creator_email: "ana@example.com".to_owned(),
                likes: likers.iter().map(|l| (*l).to_owned()).collect(),
                comments: Vec::new(),
                created_at: Utc::now() - Duration::minutes(age_minutes),
            },
        );
    }

    pub fn likes_of(&self, id: &str) -> Vec<String> {
        self.photos
            .get(id)
            .map(|photo| photo.likes.clone())
            .unwrap_or_default()
    }

    pub fn fail_likes(&self, fail: bool) {
        self.fail_likes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_comments(&self, fail: bool) {
        self.fail_comments.store(fail, Ordering::SeqCst);
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub enum MockError {
    InvalidCredentials,
    UserAlreadyExists,
    Unauthorized,
    NotFound,
    ValidationError(String),
    InternalError(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            MockError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned())
            }
            MockError::UserAlreadyExists => (StatusCode::CONFLICT, "User already exists".to_owned()),
            MockError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
            MockError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_owned()),
            MockError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            MockError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

fn create_token(user: &User, secret: &str) -> Result<String, MockError> {
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        exp: (Utc::now() + Duration::hours(24)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| MockError::InternalError(format!("Token Creation failed: {}", e)))
}

fn authenticate(state: &MockState, headers: &HeaderMap) -> Result<Claims, MockError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    state
        .auth_headers
        .lock()
        .unwrap()
        .push(auth_header.map(str::to_owned));

    let token = auth_header
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(MockError::Unauthorized)?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| MockError::Unauthorized)
}

fn user_json(user: &User) -> Value {
    json!({ "_id": user.id, "email": user.email, "name": user.name, "role": user.role })
}

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    role: String,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotosParams {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    search: String,
}

fn default_page() -> usize {
    1
}
fn default_limit() -> usize {
    20
}

#[derive(Deserialize)]
struct CommentBody {
    text: String,
}

/// POST /auth/register
async fn register(
    State(state): State<MockState>,
    Json(payload): Json<RegisterBody>,
) -> Result<(StatusCode, Json<Value>), MockError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(MockError::ValidationError("Email and password are required".into()));
    }
    if state.email_index.contains_key(&payload.email) {
        return Err(MockError::UserAlreadyExists);
    }

    let user = User {
        id: Uuid::new_v4(),
        email: payload.email,
        name: payload.name,
        role: payload.role,
        hashed_password: hash(&payload.password, HASH_COST)
            .map_err(|e| MockError::InternalError(format!("Password hashing failed: {}", e)))?,
    };
    let token = create_token(&user, &state.jwt_secret)?;

    state.email_index.insert(user.email.clone(), user.id);
    state.users.insert(user.id, user.clone());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user_json(&user) })),
    ))
}

/// POST /auth/login
async fn login(
    State(state): State<MockState>,
    Json(payload): Json<LoginBody>,
) -> Result<Json<Value>, MockError> {
    let user_id = state
        .email_index
        .get(&payload.email)
        .map(|id| *id)
        .ok_or(MockError::InvalidCredentials)?;
    let user = state
        .users
        .get(&user_id)
        .map(|u| u.clone())
        .ok_or(MockError::InvalidCredentials)?;

    let valid = verify(&payload.password, &user.hashed_password)
        .map_err(|e| MockError::InternalError(format!("Password verification failed: {}", e)))?;
    if !valid {
        return Err(MockError::InvalidCredentials);
    }

    let token = create_token(&user, &state.jwt_secret)?;
    Ok(Json(json!({ "token": token, "user": user_json(&user) })))
}

/// GET /photos?page=1&limit=20&search=&sortBy=createdAt
async fn get_photos(
    State(state): State<MockState>,
    Query(params): Query<PhotosParams>,
) -> Json<Value> {
    let search = params.search.to_lowercase();
    let mut photos: Vec<StoredPhoto> = state
        .photos
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|photo| search.is_empty() || photo.caption.to_lowercase().contains(&search))
        .collect();

    // Newest first
    photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = photos.len();
    let start = params.page.saturating_sub(1) * params.limit;
    let end = (start + params.limit).min(total);
    let page: Vec<Value> = if start < total {
        photos[start..end].iter().map(StoredPhoto::to_json).collect()
    } else {
        vec![]
    };

    Json(json!({ "photos": page, "total": total }))
}

/// POST /photos/{id}/like
async fn toggle_like(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, MockError> {
    let claims = authenticate(&state, &headers)?;
    if state.fail_likes.load(Ordering::SeqCst) {
        return Err(MockError::InternalError("Like service unavailable".into()));
    }

    let mut photo = state.photos.get_mut(&id).ok_or(MockError::NotFound)?;
    match photo.likes.iter().position(|liker| *liker == claims.sub) {
        Some(index) => {
            photo.likes.remove(index);
        }
        None => photo.likes.push(claims.sub),
    }

    Ok(Json(json!({ "likesCount": photo.likes.len() })))
}

/// POST /photos/{id}/comment
async fn add_comment(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<CommentBody>,
) -> Result<Json<Value>, MockError> {
    let claims = authenticate(&state, &headers)?;
    if state.fail_comments.load(Ordering::SeqCst) {
        return Err(MockError::InternalError("Comment service unavailable".into()));
    }
    if payload.text.trim().is_empty() {
        return Err(MockError::ValidationError("Comment text is required".into()));
    }

    let mut photo = state.photos.get_mut(&id).ok_or(MockError::NotFound)?;
    photo.comments.push(json!({
        "_id": Uuid::new_v4(),
        "text": payload.text,
        "user": { "_id": claims.sub, "email": claims.email },
        "createdAt": Utc::now(),
    }));

    Ok(Json(json!({ "comments": photo.comments })))
}

/// POST /photos/upload (multipart)
async fn upload_photo(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), MockError> {
    let claims = authenticate(&state, &headers)?;

    let mut title = String::new();
    let mut caption = String::new();
    let mut file_name = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MockError::ValidationError(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "photo" => {
                file_name = field.file_name().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| MockError::ValidationError(e.to_string()))?;
                if bytes.is_empty() {
                    return Err(MockError::ValidationError("Photo is empty".into()));
                }
            }
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| MockError::ValidationError(e.to_string()))?
            }
            "caption" => {
                caption = field
                    .text()
                    .await
                    .map_err(|e| MockError::ValidationError(e.to_string()))?
            }
            _ => {}
        }
    }

    let file_name = file_name.ok_or(MockError::ValidationError("Photo is required".into()))?;
    if title.is_empty() {
        return Err(MockError::ValidationError("Title is required".into()));
    }

    let id = Uuid::new_v4().to_string();
    let photo = StoredPhoto {
        id: id.clone(),
        image_url: format!("https://cdn.test/{id}/{file_name}"),
        title,
        caption,
        creator_email: claims.email,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: Utc::now(),
    };
    let body = json!({ "photo": photo.to_json() });
    state.photos.insert(id, photo);

    Ok((StatusCode::CREATED, Json(body)))
}

/// Serves the mock on an ephemeral port and returns its API base URL.
pub async fn spawn(state: MockState) -> String {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/photos", get(get_photos))
        .route("/photos/upload", post(upload_photo))
        .route("/photos/{id}/like", post(toggle_like))
        .route("/photos/{id}/comment", post(add_comment))
        .with_state(state);
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api", addr)
}
