//! Full-precision results of the aggregation engine. Nothing here is
//! rounded; see [`super::format`] for display shaping.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::fold::MonthKey;
use crate::domain::{Attribution, CriterionId, RatingId, Restaurant, RestaurantId, UserId};

/// One rating as it contributes to a restaurant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedBy {
    pub rating_id: RatingId,
    pub attribution: Attribution,
    /// `None` only for legacy records without any score.
    pub composite: Option<f64>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-restaurant view. `restaurant` is `None` for ratings whose restaurant
/// has since been deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantView {
    pub restaurant_id: RestaurantId,
    pub restaurant: Option<Restaurant>,
    pub ratings: Vec<RatedBy>,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionMean {
    pub criterion_id: CriterionId,
    pub label: String,
    pub in_catalog: bool,
    pub average: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    pub user_id: UserId,
    pub name: String,
    pub handle: Option<String>,
}

/// Per-criterion means of one member's own raw scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberView {
    pub member: MemberRef,
    pub criteria: Vec<CriterionMean>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonLine {
    pub criterion_id: CriterionId,
    pub label: String,
    /// One cell per compared member, in `ComparisonMatrix::members` order.
    pub cells: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMatrix {
    pub members: Vec<MemberRef>,
    pub rows: Vec<ComparisonLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: MonthKey,
    pub average: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub restaurant: Restaurant,
    pub average: f64,
    pub ratings: usize,
}

/// How often a member rated and their mean composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberActivity {
    pub member: MemberRef,
    pub ratings: usize,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelledScore {
    pub criterion_id: CriterionId,
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub rating_id: RatingId,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: Option<String>,
    pub attribution: Attribution,
    pub composite: Option<f64>,
    pub scores: Vec<LabelledScore>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
