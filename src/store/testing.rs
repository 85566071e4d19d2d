//! Scripted `PhotoApi` for store and view tests. Replies are released through
//! oneshot channels so the pending phase of a request can be observed.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::{
    client::PhotoApi,
    dto::{
        CommentRequest, CommentsResponse, LikeRef, LikeResponse, PhotoQuery, PhotoRecord,
        PhotosPage, UploadResponse,
    },
    errors::ClientError,
    models::{Comment, PhotoId, UserProfile, UserRef},
    upload::UploadForm,
};

type Reply<T> = oneshot::Receiver<Result<T, ClientError>>;

#[derive(Default)]
pub(crate) struct ScriptedApi {
    viewer: Option<String>,
    pages: Mutex<VecDeque<PhotosPage>>,
    queries: Mutex<Vec<PhotoQuery>>,
    likes: Mutex<VecDeque<Reply<LikeResponse>>>,
    comments: Mutex<VecDeque<Reply<CommentsResponse>>>,
    sent_comments: Mutex<Vec<String>>,
    like_calls: AtomicUsize,
    comment_calls: AtomicUsize,
    panic_next_like: AtomicBool,
}

impl ScriptedApi {
    pub(crate) fn with_viewer(mut self, viewer: &str) -> Self {
        self.viewer = Some(viewer.to_owned());
        self
    }

    pub(crate) fn server_error() -> ClientError {
        ClientError::Api {
            status: 500,
            message: "Internal server error".into(),
        }
    }

    pub(crate) fn push_page(&self, page: PhotosPage) {
        self.pages.lock().unwrap().push_back(page);
    }

    /// Queues the reply for the next like request.
    pub(crate) fn expect_like(&self) -> oneshot::Sender<Result<LikeResponse, ClientError>> {
        let (tx, rx) = oneshot::channel();
        self.likes.lock().unwrap().push_back(rx);
        tx
    }

    /// Queues the reply for the next comment request.
    pub(crate) fn expect_comment(
        &self,
    ) -> oneshot::Sender<Result<CommentsResponse, ClientError>> {
        let (tx, rx) = oneshot::channel();
        self.comments.lock().unwrap().push_back(rx);
        tx
    }

    /// Makes the next like request panic inside its task.
    pub(crate) fn panic_next_like(&self) {
        self.panic_next_like.store(true, Ordering::SeqCst);
    }

    pub(crate) fn like_calls(&self) -> usize {
        self.like_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_comment(&self) -> Option<String> {
        self.sent_comments.lock().unwrap().last().cloned()
    }

    pub(crate) fn queries(&self) -> Vec<PhotoQuery> {
        self.queries.lock().unwrap().clone()
    }
}

async fn await_reply<T>(reply: Option<Reply<T>>) -> Result<T, ClientError> {
    match reply {
        Some(rx) => rx.await.unwrap_or_else(|_| {
            Err(ClientError::Api {
                status: 503,
                message: "reply dropped".into(),
            })
        }),
        None => Err(ScriptedApi::server_error()),
    }
}

#[async_trait]
impl PhotoApi for ScriptedApi {
    async fn fetch_photos(&self, query: &PhotoQuery) -> Result<PhotosPage, ClientError> {
        self.queries.lock().unwrap().push(query.clone());
        let page = self.pages.lock().unwrap().pop_front();
        page.ok_or_else(ScriptedApi::server_error)
    }

    async fn toggle_like(&self, _photo_id: &PhotoId) -> Result<LikeResponse, ClientError> {
        self.like_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_next_like.swap(false, Ordering::SeqCst) {
            panic!("like handler crashed");
        }
        let reply = self.likes.lock().unwrap().pop_front();
        await_reply(reply).await
    }

    async fn add_comment(
        &self,
        _photo_id: &PhotoId,
        comment: &CommentRequest,
    ) -> Result<CommentsResponse, ClientError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        self.sent_comments.lock().unwrap().push(comment.text.clone());
        let reply = self.comments.lock().unwrap().pop_front();
        await_reply(reply).await
    }

    async fn upload_photo(&self, _form: &UploadForm) -> Result<UploadResponse, ClientError> {
        Err(ScriptedApi::server_error())
    }

    fn viewer_id(&self) -> Option<String> {
        self.viewer.clone()
    }
}

/// A photo with `anonymous` likes from other users plus one like per id in
/// `likers`.
pub(crate) fn record(id: &str, anonymous: usize, likers: &[&str]) -> PhotoRecord {
    let mut likes: Vec<LikeRef> = likers
        .iter()
        .map(|liker| LikeRef::Entry {
            user_id: Some((*liker).to_owned()),
            user: None,
        })
        .collect();
    likes.extend((0..anonymous).map(|n| LikeRef::Id(format!("someone-{n}"))));

    PhotoRecord {
        id: PhotoId::from(id),
        image_url: format!("https://cdn.example.com/{id}.jpg"),
        caption: format!("caption of {id}"),
        title: None,
        location: None,
        creator: Some(UserRef::Profile(UserProfile {
            email: Some("ana@example.com".into()),
            ..UserProfile::default()
        })),
        likes,
        comments: Vec::new(),
        created_at: None,
    }
}

pub(crate) fn comment(text: &str) -> Comment {
    Comment {
        id: None,
        text: text.to_owned(),
        user: Some(UserRef::Profile(UserProfile {
            email: Some("bo@example.com".into()),
            ..UserProfile::default()
        })),
        created_at: None,
        timestamp: None,
    }
}
