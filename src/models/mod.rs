mod comment;
mod photo;
mod user;

pub use comment::Comment;
pub use photo::{Photo, PhotoId};
pub use user::{UserProfile, UserRef};
