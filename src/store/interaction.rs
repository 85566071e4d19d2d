use crate::{dto::PhotoRecord, models::Comment};

/// Like flag and count at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeSnapshot {
    pub liked: bool,
    pub like_count: u64,
}

/// Like affordance of a single photo.
///
/// `Pending` carries the state to restore if the request fails; while it
/// lasts the displayed flag and count already show the optimistic values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStatus {
    Unliked(u64),
    Liked(u64),
    Pending { previous: LikeSnapshot },
}

/// Per-photo interaction state tracked on the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InteractionState {
    pub liked: bool,
    pub like_count: u64,
    pub comments: Vec<Comment>,
    /// Local bookmark; never sent to the service.
    pub saved: bool,
    /// Unsent comment input.
    pub comment_draft: String,
    pending_like: Option<LikeSnapshot>,
}

impl InteractionState {
    pub fn new(liked: bool, like_count: u64, comments: Vec<Comment>) -> Self {
        Self {
            liked,
            like_count,
            comments,
            ..Self::default()
        }
    }

    pub(crate) fn from_record(record: &PhotoRecord, viewer_id: Option<&str>) -> Self {
        let liked = viewer_id.is_some_and(|viewer| record.liked_by(viewer));
        Self::new(liked, record.likes.len() as u64, record.comments.clone())
    }

    pub fn like_status(&self) -> LikeStatus {
        match self.pending_like {
            Some(previous) => LikeStatus::Pending { previous },
            None if self.liked => LikeStatus::Liked(self.like_count),
            None => LikeStatus::Unliked(self.like_count),
        }
    }

    pub fn is_like_pending(&self) -> bool {
        self.pending_like.is_some()
    }

    pub fn snapshot(&self) -> LikeSnapshot {
        LikeSnapshot {
            liked: self.liked,
            like_count: self.like_count,
        }
    }

    /// Optimistic phase of a like toggle. Returns the state to roll back to,
    /// or `None` when a toggle is already in flight.
    pub(crate) fn begin_like(&mut self) -> Option<LikeSnapshot> {
        if self.pending_like.is_some() {
            return None;
        }

        let previous = self.snapshot();
        self.liked = !previous.liked;
        self.like_count = if self.liked {
            previous.like_count.saturating_add(1)
        } else {
            previous.like_count.saturating_sub(1)
        };
        self.pending_like = Some(previous);
        Some(previous)
    }

    /// The service accepted the toggle. Its count wins when it sent one; the
    /// flag keeps the optimistic value.
    pub(crate) fn confirm_like(&mut self, server_count: Option<u64>) {
        if let Some(count) = server_count {
            self.like_count = count;
        }
        self.pending_like = None;
    }

    pub(crate) fn rollback_like(&mut self) {
        if let Some(previous) = self.pending_like.take() {
            self.liked = previous.liked;
            self.like_count = previous.like_count;
        }
    }

    pub(crate) fn toggle_save(&mut self) -> bool {
        self.saved = !self.saved;
        self.saved
    }

    /// Applies the service's comment list wholesale.
    pub(crate) fn replace_comments(&mut self, comments: Vec<Comment>) {
        self.comments = comments;
        self.comment_draft.clear();
    }
}
