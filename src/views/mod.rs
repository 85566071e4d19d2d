pub mod format;
mod feed;
mod overlay;

pub use feed::{FeedView, ViewMode};
pub use overlay::DetailOverlay;
