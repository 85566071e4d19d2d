mod requests;
mod responses;

pub(crate) use requests::{first_message, validation_error};
pub use requests::{CommentRequest, LoginForm, PhotoQuery, RegisterForm};
pub use responses::{
    AuthResponse, CommentsResponse, LikeRef, LikeResponse, PhotoRecord, PhotosPage,
    UploadResponse,
};
