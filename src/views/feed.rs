use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    errors::FeedError,
    models::{Photo, PhotoId},
    store::{CommentTask, FeedStore, LikeTask, Notice, NoticeLevel},
    views::{
        format::{comments_link, initial, likes_label, relative_time},
        overlay::DetailOverlay,
    },
};

const BANNER_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// The photo feed. Reads everything from the store and turns gestures into
/// store operations.
pub struct FeedView {
    store: FeedStore,
    mode: ViewMode,
    search_active: bool,
    notices: broadcast::Receiver<Notice>,
    banner: Vec<Notice>,
}

impl FeedView {
    pub fn new(store: FeedStore) -> Self {
        Self {
            notices: store.subscribe(),
            store,
            mode: ViewMode::default(),
            search_active: false,
            banner: Vec::new(),
        }
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    pub fn toggle_view(&mut self) -> ViewMode {
        self.mode = match self.mode {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        };
        self.mode
    }

    pub fn search_active(&self) -> bool {
        self.search_active
    }

    pub fn toggle_search(&mut self) -> bool {
        self.search_active = !self.search_active;
        self.search_active
    }

    /// Heart tap. Taps while a like is in flight are dropped.
    pub fn tap_like(&self, id: &PhotoId) -> Option<LikeTask> {
        match self.store.toggle_like(id) {
            Ok(task) => Some(task),
            Err(FeedError::LikePending(_)) => {
                debug!("Ignoring like tap on {} while pending", id);
                None
            }
            Err(err) => {
                warn!("Like tap on {} failed: {}", id, err);
                None
            }
        }
    }

    /// Double tap on the image likes it; only the list layout has it.
    pub fn double_tap(&self, id: &PhotoId) -> Option<LikeTask> {
        match self.mode {
            ViewMode::List => self.tap_like(id),
            ViewMode::Grid => None,
        }
    }

    pub fn tap_save(&self, id: &PhotoId) -> Option<bool> {
        self.store.toggle_save(id).ok()
    }

    /// Inline comment box. Blank input does nothing.
    pub fn submit_comment(&self, id: &PhotoId, text: &str) -> Option<CommentTask> {
        match self.store.add_comment(id, text) {
            Ok(task) => Some(task),
            Err(FeedError::Validation(reason)) => {
                debug!("Comment on {} not sent: {}", id, reason);
                None
            }
            Err(err) => {
                warn!("Comment on {} not sent: {}", id, err);
                None
            }
        }
    }

    /// Link to share for a photo. Putting it on the clipboard is up to the
    /// caller; the banner confirms it.
    pub fn share(&mut self, id: &PhotoId) -> Option<String> {
        let photo = self.store.photo(id)?;
        self.push_banner(Notice::success("Link copied", "Link copied to clipboard!"));
        Some(photo.image_url)
    }

    pub fn open(&self, id: &PhotoId) -> Option<DetailOverlay> {
        DetailOverlay::open(&self.store, id).ok()
    }

    /// Moves published notices into the banner.
    pub fn poll_notices(&mut self) -> &[Notice] {
        loop {
            match self.notices.try_recv() {
                Ok(notice) => self.push_banner(notice),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("Skipped {} stale notices", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        &self.banner
    }

    pub fn banner(&self) -> &[Notice] {
        &self.banner
    }

    pub fn dismiss(&mut self, id: Uuid) {
        self.banner.retain(|notice| notice.id != id);
    }

    fn push_banner(&mut self, notice: Notice) {
        self.banner.push(notice);
        if self.banner.len() > BANNER_LIMIT {
            let excess = self.banner.len() - BANNER_LIMIT;
            self.banner.drain(..excess);
        }
    }

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();

        for notice in &self.banner {
            let tag = match notice.level {
                NoticeLevel::Success => "ok",
                NoticeLevel::Error => "error",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Info => "info",
            };
            out.push_str(&format!("[{tag}] {}: {}\n", notice.title, notice.message));
        }

        out.push_str(match self.mode {
            ViewMode::Grid => "Explore (grid)\n",
            ViewMode::List => "Explore (list)\n",
        });

        let photos = self.store.photos();
        if photos.is_empty() {
            out.push_str("No photos yet\n");
            return out;
        }

        for photo in &photos {
            match self.mode {
                ViewMode::Grid => self.render_tile(&mut out, photo),
                ViewMode::List => self.render_card(&mut out, photo, now),
            }
        }
        out
    }

    fn render_tile(&self, out: &mut String, photo: &Photo) {
        let state = self.store.interaction(&photo.id).unwrap_or_default();
        out.push_str(&format!(
            "[{}] {} {} {} @{}\n",
            photo.id,
            photo.caption,
            if state.liked { "♥" } else { "♡" },
            state.like_count,
            photo.author
        ));
    }

    fn render_card(&self, out: &mut String, photo: &Photo, now: DateTime<Utc>) {
        let state = self.store.interaction(&photo.id).unwrap_or_default();

        out.push('\n');
        out.push_str(&format!("{} {}", initial(&photo.author), photo.author));
        if let Some(created_at) = photo.created_at {
            out.push_str(&format!(" · {}", relative_time(created_at, now)));
        }
        out.push('\n');
        out.push_str(&format!("{}\n", photo.image_url));
        out.push_str(&format!(
            "{}{}\n",
            if state.liked { "♥" } else { "♡" },
            if state.saved { "  [saved]" } else { "" }
        ));
        out.push_str(&format!("{}\n", likes_label(state.like_count)));
        out.push_str(&format!("{} {}\n", photo.author, photo.caption));
        if let Some(link) = comments_link(state.comments.len()) {
            out.push_str(&format!("{link}\n"));
        }
    }
}
