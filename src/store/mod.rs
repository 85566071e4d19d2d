//! Feed state store.
//!
//! Holds one [`InteractionState`] per loaded photo and owns the optimistic
//! like protocol: the flag and count flip synchronously inside
//! [`FeedStore::toggle_like`], the request runs on a spawned task, and the
//! task either confirms the optimistic values or restores the snapshot taken
//! before the flip. Comments are never inserted optimistically; the list the
//! service returns replaces the local one.
//!
//! Every spawned request belongs to a cancellation scope. The page scope is
//! cancelled when a new page is loaded or the store is discarded; views can
//! hand in narrower child scopes of their own. Completions that arrive after
//! the page they belong to was replaced are dropped.

mod interaction;
mod notice;

#[cfg(test)]
pub(crate) mod testing;

pub use interaction::{InteractionState, LikeSnapshot, LikeStatus};
pub use notice::{Notice, NoticeLevel};

use std::{
    collections::HashSet,
    future::Future,
    sync::{
        Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::{
    client::PhotoApi,
    dto::{CommentRequest, PhotoQuery, PhotoRecord, first_message},
    errors::{ClientError, FeedError},
    models::{Comment, Photo, PhotoId},
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const NOTICE_CAPACITY: usize = 32;

/// Shared feed state. Cloning is cheap and every clone sees the same state,
/// so the feed view and the detail overlay stay in step.
#[derive(Clone)]
pub struct FeedStore {
    api: Arc<dyn PhotoApi>,
    photos: Arc<RwLock<Vec<Photo>>>,
    interactions: Arc<DashMap<PhotoId, InteractionState>>,
    generation: Arc<AtomicU64>,
    page_scope: Arc<Mutex<CancellationToken>>,
    notices: broadcast::Sender<Notice>,
    request_timeout: Duration,
}

/// How a like request ended.
#[derive(Debug)]
pub enum LikeOutcome {
    Confirmed(LikeSnapshot),
    RolledBack {
        restored: LikeSnapshot,
        error: FeedError,
    },
    /// The page was replaced or discarded first; nothing was touched.
    Discarded,
}

/// Handle to an in-flight like request.
pub struct LikeTask {
    store: FeedStore,
    photo_id: PhotoId,
    generation: u64,
    handle: JoinHandle<LikeOutcome>,
}

impl LikeTask {
    pub fn photo_id(&self) -> &PhotoId {
        &self.photo_id
    }

    pub async fn outcome(self) -> LikeOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Like task for {} ended abnormally: {}", self.photo_id, err);
                self.store
                    .abandon_like(&self.photo_id, self.generation, err.to_string())
            }
        }
    }
}

/// Handle to an in-flight comment submission.
pub struct CommentTask {
    photo_id: PhotoId,
    handle: JoinHandle<Result<Vec<Comment>, FeedError>>,
}

impl CommentTask {
    pub fn photo_id(&self) -> &PhotoId {
        &self.photo_id
    }

    /// The comment list now shown for the photo, or why nothing changed.
    pub async fn outcome(self) -> Result<Vec<Comment>, FeedError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => {
                error!("Comment task for {} ended abnormally: {}", self.photo_id, err);
                Err(FeedError::Cancelled)
            }
        }
    }
}

impl FeedStore {
    pub fn new(api: Arc<dyn PhotoApi>, request_timeout: Duration) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            api,
            photos: Arc::new(RwLock::new(Vec::new())),
            interactions: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            page_scope: Arc::new(Mutex::new(CancellationToken::new())),
            notices,
            request_timeout,
        }
    }

    /// Fetches a page and replaces everything currently loaded.
    pub async fn load_page(&self, query: &PhotoQuery) -> Result<usize, FeedError> {
        let scope = self.scope();
        let page = run_scoped(&scope, self.request_timeout, self.api.fetch_photos(query)).await?;

        let loaded = self.replace_page(page.photos);
        info!(
            "Loaded page {} ({} photos, search {:?}, sort {})",
            query.page, loaded, query.search, query.sort_by
        );
        Ok(loaded)
    }

    /// Installs a page of photos: cancels requests tied to the previous page
    /// and creates exactly one interaction entry per photo.
    pub fn replace_page(&self, records: Vec<PhotoRecord>) -> usize {
        let viewer = self.api.viewer_id();
        let mut photos = self.page_mut();

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.renew_scope();
        self.interactions.clear();

        let mut seen = HashSet::new();
        let mut loaded = Vec::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id.clone()) {
                warn!("Duplicate photo {} in page; keeping the first", record.id);
                continue;
            }
            self.interactions.insert(
                record.id.clone(),
                InteractionState::from_record(record, viewer.as_deref()),
            );
            loaded.push(Photo::from(record));
        }

        *photos = loaded;
        photos.len()
    }

    /// Drops all state and cancels every in-flight request, as when the feed
    /// goes away.
    pub fn discard(&self) {
        let mut photos = self.page_mut();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.renew_scope();
        self.interactions.clear();
        photos.clear();
        debug!("Feed state discarded");
    }

    pub fn photos(&self) -> Vec<Photo> {
        self.page().clone()
    }

    pub fn photo(&self, id: &PhotoId) -> Option<Photo> {
        self.page().iter().find(|photo| &photo.id == id).cloned()
    }

    pub fn interaction(&self, id: &PhotoId) -> Option<InteractionState> {
        self.interactions.get(id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Scope of the current page. Views derive their own scopes from it.
    pub fn scope(&self) -> CancellationToken {
        self.page_scope
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn notify(&self, notice: Notice) {
        // No subscribers is fine; notices are transient.
        let _ = self.notices.send(notice);
    }

    /// Toggles the viewer's like under the page scope.
    pub fn toggle_like(&self, id: &PhotoId) -> Result<LikeTask, FeedError> {
        let scope = self.scope();
        self.toggle_like_in(id, &scope)
    }

    /// Toggles the viewer's like. The optimistic flip is visible as soon as
    /// this returns; the request is cancelled together with `scope`.
    ///
    /// A toggle while another one for the same photo is in flight is refused
    /// with [`FeedError::LikePending`] and changes nothing.
    pub fn toggle_like_in(
        &self,
        id: &PhotoId,
        scope: &CancellationToken,
    ) -> Result<LikeTask, FeedError> {
        let (generation, previous) = {
            let _page = self.page();
            let generation = self.generation.load(Ordering::SeqCst);
            let mut entry = self
                .interactions
                .get_mut(id)
                .ok_or_else(|| FeedError::UnknownPhoto(id.clone()))?;
            let previous = entry
                .begin_like()
                .ok_or_else(|| FeedError::LikePending(id.clone()))?;
            (generation, previous)
        };
        debug!(
            "Optimistic {} on {}",
            if previous.liked { "unlike" } else { "like" },
            id
        );

        let request = {
            let store = self.clone();
            let photo_id = id.clone();
            let scope = scope.child_token();
            tokio::spawn(async move {
                run_scoped(
                    &scope,
                    store.request_timeout,
                    store.api.toggle_like(&photo_id),
                )
                .await
            })
        };

        // The request runs in its own task so a panic in it still settles
        // the entry instead of leaving it pending.
        let store = self.clone();
        let photo_id = id.clone();
        let handle = tokio::spawn(async move {
            let result = request
                .await
                .unwrap_or_else(|err| Err(FeedError::TaskFailed(err.to_string())));
            store.settle_like(&photo_id, generation, result)
        });

        Ok(LikeTask {
            store: self.clone(),
            photo_id: id.clone(),
            generation,
            handle,
        })
    }

    /// Settles a like whose task died before it could settle itself.
    fn abandon_like(&self, id: &PhotoId, generation: u64, reason: String) -> LikeOutcome {
        let _page = self.page();
        if self.generation.load(Ordering::SeqCst) != generation {
            return LikeOutcome::Discarded;
        }
        let Some(mut entry) = self.interactions.get_mut(id) else {
            return LikeOutcome::Discarded;
        };
        if !entry.is_like_pending() {
            return LikeOutcome::Discarded;
        }

        entry.rollback_like();
        LikeOutcome::RolledBack {
            restored: entry.snapshot(),
            error: FeedError::TaskFailed(reason),
        }
    }

    fn settle_like(
        &self,
        id: &PhotoId,
        generation: u64,
        result: Result<crate::dto::LikeResponse, FeedError>,
    ) -> LikeOutcome {
        let _page = self.page();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping like completion for {} from a replaced page", id);
            return LikeOutcome::Discarded;
        }
        let Some(mut entry) = self.interactions.get_mut(id) else {
            return LikeOutcome::Discarded;
        };

        match result {
            Ok(response) => {
                entry.confirm_like(response.likes_count);
                info!("Like on {} confirmed ({} likes)", id, entry.like_count);
                LikeOutcome::Confirmed(entry.snapshot())
            }
            Err(error) => {
                entry.rollback_like();
                let restored = entry.snapshot();
                drop(entry);

                warn!("Like on {} failed, rolled back: {}", id, error);
                if !matches!(error, FeedError::Cancelled) {
                    self.notify(Notice::warning("Like failed", error.to_string()));
                }
                LikeOutcome::RolledBack { restored, error }
            }
        }
    }

    /// Submits a comment under the page scope.
    pub fn add_comment(&self, id: &PhotoId, text: &str) -> Result<CommentTask, FeedError> {
        let scope = self.scope();
        self.add_comment_in(id, text, &scope)
    }

    /// Submits a comment. Blank text is rejected here and no request is
    /// sent. On success the photo's comments become exactly the list the
    /// service returned; on failure nothing changes and an error notice is
    /// published.
    pub fn add_comment_in(
        &self,
        id: &PhotoId,
        text: &str,
        scope: &CancellationToken,
    ) -> Result<CommentTask, FeedError> {
        let request = CommentRequest::new(text);
        if request.text.is_empty() {
            return Err(FeedError::Validation("Comment cannot be empty".into()));
        }
        request
            .validate()
            .map_err(|errors| FeedError::Validation(first_message(&errors)))?;

        let generation = {
            let _page = self.page();
            if !self.interactions.contains_key(id) {
                return Err(FeedError::UnknownPhoto(id.clone()));
            }
            self.generation.load(Ordering::SeqCst)
        };

        let store = self.clone();
        let photo_id = id.clone();
        let scope = scope.child_token();
        let handle = tokio::spawn(async move {
            let result = run_scoped(
                &scope,
                store.request_timeout,
                store.api.add_comment(&photo_id, &request),
            )
            .await;
            store.settle_comment(&photo_id, generation, result)
        });

        Ok(CommentTask {
            photo_id: id.clone(),
            handle,
        })
    }

    fn settle_comment(
        &self,
        id: &PhotoId,
        generation: u64,
        result: Result<crate::dto::CommentsResponse, FeedError>,
    ) -> Result<Vec<Comment>, FeedError> {
        let _page = self.page();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping comment completion for {} from a replaced page", id);
            return Err(FeedError::Stale);
        }

        match result {
            Ok(response) => {
                let mut entry = self.interactions.get_mut(id).ok_or(FeedError::Stale)?;
                entry.replace_comments(response.comments);
                info!("Comment on {} applied ({} comments)", id, entry.comments.len());
                Ok(entry.comments.clone())
            }
            Err(error) => {
                warn!("Comment on {} failed: {}", id, error);
                if !matches!(error, FeedError::Cancelled) {
                    self.notify(Notice::error("Comment failed", error.to_string()));
                }
                Err(error)
            }
        }
    }

    /// Flips the local bookmark. No request is made.
    pub fn toggle_save(&self, id: &PhotoId) -> Result<bool, FeedError> {
        let mut entry = self
            .interactions
            .get_mut(id)
            .ok_or_else(|| FeedError::UnknownPhoto(id.clone()))?;
        Ok(entry.toggle_save())
    }

    pub fn set_comment_draft(&self, id: &PhotoId, text: &str) -> Result<(), FeedError> {
        let mut entry = self
            .interactions
            .get_mut(id)
            .ok_or_else(|| FeedError::UnknownPhoto(id.clone()))?;
        entry.comment_draft = text.to_owned();
        Ok(())
    }

    fn renew_scope(&self) {
        let mut scope = self
            .page_scope
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        scope.cancel();
        *scope = CancellationToken::new();
    }

    fn page(&self) -> RwLockReadGuard<'_, Vec<Photo>> {
        self.photos
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn page_mut(&self) -> RwLockWriteGuard<'_, Vec<Photo>> {
        self.photos
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs a request until it finishes, times out, or `scope` is cancelled.
async fn run_scoped<T>(
    scope: &CancellationToken,
    timeout: Duration,
    request: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, FeedError> {
    tokio::select! {
        _ = scope.cancelled() => Err(FeedError::Cancelled),
        result = tokio::time::timeout(timeout, request) => match result {
            Ok(response) => response.map_err(FeedError::from),
            Err(_) => Err(FeedError::Timeout),
        },
    }
}
