use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::FeedError,
    models::{Photo, PhotoId},
    store::{CommentTask, FeedStore, InteractionState, LikeTask},
    views::format::{comment_time, initial, likes_label, relative_time},
};

/// Focused single-photo view bound to the shared store.
///
/// Requests started here run in a scope owned by the overlay; closing or
/// dropping the overlay cancels them, and a cancelled like rolls back.
pub struct DetailOverlay {
    store: FeedStore,
    photo: Photo,
    scope: CancellationToken,
}

impl DetailOverlay {
    pub fn open(store: &FeedStore, id: &PhotoId) -> Result<Self, FeedError> {
        let photo = store
            .photo(id)
            .ok_or_else(|| FeedError::UnknownPhoto(id.clone()))?;
        Ok(Self {
            scope: store.scope().child_token(),
            store: store.clone(),
            photo,
        })
    }

    pub fn photo(&self) -> &Photo {
        &self.photo
    }

    pub fn state(&self) -> Option<InteractionState> {
        self.store.interaction(&self.photo.id)
    }

    pub fn tap_like(&self) -> Result<LikeTask, FeedError> {
        self.store.toggle_like_in(&self.photo.id, &self.scope)
    }

    pub fn tap_save(&self) -> Result<bool, FeedError> {
        self.store.toggle_save(&self.photo.id)
    }

    /// Comment input. The draft lives in the store so the feed sees it too.
    pub fn set_draft(&self, text: &str) -> Result<(), FeedError> {
        self.store.set_comment_draft(&self.photo.id, text)
    }

    /// Posts the current draft.
    pub fn submit(&self) -> Result<CommentTask, FeedError> {
        let draft = self
            .state()
            .map(|state| state.comment_draft)
            .ok_or_else(|| FeedError::UnknownPhoto(self.photo.id.clone()))?;
        self.store
            .add_comment_in(&self.photo.id, &draft, &self.scope)
    }

    pub fn close(self) {}

    pub fn render(&self, now: DateTime<Utc>) -> String {
        let state = self.state().unwrap_or_default();
        let mut out = String::new();

        out.push_str(&format!("{} {}\n", initial(&self.photo.author), self.photo.author));
        if let Some(title) = &self.photo.title {
            out.push_str(&format!("{title}\n"));
        }
        out.push_str(&format!("{}\n", self.photo.image_url));
        if !self.photo.caption.is_empty() {
            out.push_str(&format!("{}\n", self.photo.caption));
        }
        out.push('\n');

        if state.comments.is_empty() {
            out.push_str("No comments yet\nBe the first to comment\n");
        } else {
            for comment in &state.comments {
                let author = comment.author_email().unwrap_or("");
                let avatar = if author.is_empty() { "?".to_owned() } else { initial(author) };
                let when = comment_time(comment, now);
                out.push_str(&format!("{avatar} {author}: {}", comment.text));
                if !when.is_empty() {
                    out.push_str(&format!(" · {when}"));
                }
                out.push('\n');
            }
        }

        out.push('\n');
        out.push_str(&format!(
            "{} {}{}\n",
            if state.liked { "♥" } else { "♡" },
            likes_label(state.like_count),
            if state.saved { "  [saved]" } else { "" }
        ));
        if let Some(created_at) = self.photo.created_at {
            out.push_str(&format!("{}\n", relative_time(created_at, now)));
        }
        out
    }
}

impl Drop for DetailOverlay {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
