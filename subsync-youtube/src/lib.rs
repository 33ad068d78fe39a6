//! Blocking YouTube Data API v3 client implementing
//! [`subsync_sync::CaptionService`].
//!
//! Authentication is external: the client is handed an OAuth access token
//! (usually from `SUBSYNC_ACCESS_TOKEN`) and sends it as a bearer header.

pub mod client;
pub mod types;

pub use client::{YouTubeClient, TOKEN_ENV};
