//! Client for the Photon photo-sharing HTTP API.
//!
//! The API is an external collaborator: four category feeds, a two-step
//! post submission (prepare here, broadcast on chain), and two audit/log
//! endpoints. Transport failures never propagate past this crate; feed
//! listings degrade to an empty result and the rest surface as
//! [`ApiError`].

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpPhotoApi, PhotoApi};
pub use error::ApiError;
pub use types::{FeedCategory, FeedPost, PreparedPost};
