//! Aggregation engine: one fold over a store snapshot, many pure views.

mod engine;
mod fold;
pub mod format;
pub mod views;

pub use engine::{AnalyticsEngine, AnalyticsOptions};
pub use fold::{Mean, MonthKey};
pub use views::{
    ComparisonLine, ComparisonMatrix, CriterionMean, FeedEntry, LabelledScore, LeaderboardEntry,
    MemberActivity, MemberRef, MemberView, MonthlyPoint, RatedBy, RestaurantView,
};

use crate::catalog::CriterionCatalog;
use crate::domain::{CriterionId, RatingRecord, Restaurant, RestaurantId, User, UserId};
use crate::error::InputError;
use crate::store::{RecordStore, StoreError};

/// Everything the engine reads, captured at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub restaurants: Vec<Restaurant>,
    pub catalog: CriterionCatalog,
    pub users: Vec<User>,
    pub ratings: Vec<RatingRecord>,
}

impl Snapshot {
    pub fn load<S>(store: &S) -> Result<Self, StoreError>
    where
        S: RecordStore + ?Sized,
    {
        Ok(Self {
            restaurants: store.list_restaurants()?,
            catalog: CriterionCatalog::new(store.list_criteria()?),
            users: store.list_users()?,
            ratings: store.list_ratings()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyticsError {
    #[error("restaurant {0} not found")]
    RestaurantNotFound(RestaurantId),
    #[error("member {0} not found")]
    MemberNotFound(UserId),
    #[error("criterion {0} not found")]
    CriterionNotFound(CriterionId),
    #[error("leaderboard is not public")]
    GateClosed,
    #[error(transparent)]
    InvalidInput(#[from] InputError),
}
