//! Record store collaborator.
//!
//! The engine never talks to a database directly; it reads snapshots and
//! performs the few writes it owns (guest ratings, invite flips, the
//! visibility flag) through [`RecordStore`].

mod memory;
mod snapshot;

pub use memory::InMemoryRecordStore;
pub use snapshot::{SnapshotFile, SnapshotFileError};

use crate::domain::{
    Criterion, InviteCode, RatingId, RatingRecord, Restaurant, RestaurantId, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored invite token bound to exactly one restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteToken {
    pub token: InviteCode,
    pub restaurant_id: RestaurantId,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction so the engine and invite lifecycle can be exercised
/// without a live backend.
pub trait RecordStore: Send + Sync {
    fn list_restaurants(&self) -> Result<Vec<Restaurant>, StoreError>;
    fn list_criteria(&self) -> Result<Vec<Criterion>, StoreError>;
    fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Member and guest ratings merged.
    fn list_ratings(&self) -> Result<Vec<RatingRecord>, StoreError>;

    /// Create a rating; `Conflict` when a rating with the same id exists or,
    /// for a member rating, when the author already rated that restaurant.
    fn insert_rating(&self, record: RatingRecord) -> Result<(), StoreError>;
    /// Overwrite an existing rating; `NotFound` when absent.
    fn replace_rating(&self, record: RatingRecord) -> Result<(), StoreError>;

    fn get_invite(&self, token: &InviteCode) -> Result<Option<InviteToken>, StoreError>;
    /// Create-if-absent; `Conflict` when the token is already taken.
    fn create_invite(&self, invite: InviteToken) -> Result<(), StoreError>;
    /// Compare-and-set `used: false -> true`. `Conflict` when the token was
    /// already used at write time, `NotFound` when it does not exist.
    fn mark_invite_used(&self, token: &InviteCode) -> Result<(), StoreError>;
    fn list_invites(&self) -> Result<Vec<InviteToken>, StoreError>;

    /// Leaderboard visibility; initialised to `false` on first read.
    fn visibility_flag(&self) -> Result<bool, StoreError>;
    fn set_visibility_flag(&self, visible: bool) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn rating_conflict(id: &RatingId) -> Self {
        Self::Conflict(format!("rating {id}"))
    }
}
