//! Rating aggregation, single-use guest invites and the gated leaderboard
//! behind a private dining club.

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod import;
pub mod invites;
pub mod ratings;
pub mod router;
pub mod scoring;
pub mod service;
pub mod store;
pub mod telemetry;

pub use router::club_router;
pub use service::{ClubError, ClubService, ClubSettings};
