//! Client for the photo-sharing service: account forms, an HTTP API client,
//! a feed state store with optimistic likes, and text views over it.

pub mod auth;
pub mod client;
pub mod config;
pub mod dto;
pub mod errors;
pub mod models;
pub mod store;
pub mod upload;
pub mod views;

pub use auth::Session;
pub use client::{HttpApi, PhotoApi};
pub use config::ClientConfig;
pub use errors::{ClientError, ConfigError, FeedError};
pub use store::{FeedStore, InteractionState, LikeOutcome, LikeStatus};
pub use views::{DetailOverlay, FeedView, ViewMode};
