//! Presentation shaping. Every formatter is total over engine output and
//! keeps "no data" explicit: empty collections become [`ViewData::Empty`]
//! and missing numbers serialize as `null`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::views::{
    ComparisonMatrix, CriterionMean, FeedEntry, LeaderboardEntry, MemberActivity, MemberView,
    MonthlyPoint, RatedBy, RestaurantView,
};
use crate::domain::{AuthorKind, CriterionId, RatingId, RestaurantId, UserId};
use crate::scoring::DisplayPrecision;

/// Rows of a view, or an explicit marker that the computed view is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "rows", rename_all = "snake_case")]
pub enum ViewData<T> {
    Empty,
    Ready(Vec<T>),
}

impl<T> ViewData<T> {
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Self::Empty
        } else {
            Self::Ready(rows)
        }
    }

    pub fn rows(&self) -> &[T] {
        match self {
            Self::Empty => &[],
            Self::Ready(rows) => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Which display precision each kind of number uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionPolicy {
    pub scores: DisplayPrecision,
    pub restaurant_average: DisplayPrecision,
}

impl Default for PrecisionPolicy {
    fn default() -> Self {
        Self {
            scores: DisplayPrecision::Tenths,
            restaurant_average: DisplayPrecision::Tenths,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub visited_on: NaiveDate,
    pub average: f64,
    pub ratings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingLine {
    pub rating_id: RatingId,
    pub name: String,
    pub handle: Option<String>,
    pub guest: bool,
    pub composite: Option<f64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantCard {
    pub restaurant_id: RestaurantId,
    pub name: Option<String>,
    pub visited_on: Option<NaiveDate>,
    pub average: Option<f64>,
    pub ratings: ViewData<RatingLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionBar {
    pub criterion_id: CriterionId,
    pub label: String,
    pub average: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberActivityBar {
    pub user_id: UserId,
    pub name: String,
    pub ratings: usize,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonCell {
    pub user_id: UserId,
    pub name: String,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub criterion_id: CriterionId,
    pub label: String,
    pub values: Vec<ComparisonCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub rating_id: RatingId,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub author: String,
    pub handle: Option<String>,
    pub guest: bool,
    pub composite: Option<f64>,
    pub scores: Vec<FeedScore>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

const UNKNOWN_RESTAURANT: &str = "Unknown restaurant";

/// Applies a [`PrecisionPolicy`] while reshaping engine results.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewFormatter {
    policy: PrecisionPolicy,
}

impl ViewFormatter {
    pub fn new(policy: PrecisionPolicy) -> Self {
        Self { policy }
    }

    fn score(&self, value: f64) -> f64 {
        self.policy.scores.apply(value)
    }

    pub fn leaderboard(&self, entries: &[LeaderboardEntry]) -> ViewData<LeaderboardRow> {
        ViewData::from_rows(
            entries
                .iter()
                .map(|entry| LeaderboardRow {
                    rank: entry.rank,
                    restaurant_id: entry.restaurant.id.clone(),
                    name: entry.restaurant.name.clone(),
                    visited_on: entry.restaurant.visited_on,
                    average: self.score(entry.average),
                    ratings: entry.ratings,
                })
                .collect(),
        )
    }

    fn rating_line(&self, rated: &RatedBy) -> RatingLine {
        RatingLine {
            rating_id: rated.rating_id.clone(),
            name: rated.attribution.name.clone(),
            handle: rated.attribution.handle.clone(),
            guest: rated.attribution.kind == AuthorKind::Guest,
            composite: rated.composite.map(|value| self.score(value)),
            comment: rated.comment.clone(),
        }
    }

    pub fn restaurant_card(&self, view: &RestaurantView) -> RestaurantCard {
        RestaurantCard {
            restaurant_id: view.restaurant_id.clone(),
            name: view.restaurant.as_ref().map(|r| r.name.clone()),
            visited_on: view.restaurant.as_ref().map(|r| r.visited_on),
            average: view
                .average
                .map(|value| self.policy.restaurant_average.apply(value)),
            ratings: ViewData::from_rows(
                view.ratings
                    .iter()
                    .map(|rated| self.rating_line(rated))
                    .collect(),
            ),
        }
    }

    pub fn restaurant_cards(&self, views: &[RestaurantView]) -> ViewData<RestaurantCard> {
        ViewData::from_rows(views.iter().map(|view| self.restaurant_card(view)).collect())
    }

    pub fn criterion_bars(&self, means: &[CriterionMean]) -> ViewData<CriterionBar> {
        ViewData::from_rows(
            means
                .iter()
                .map(|mean| CriterionBar {
                    criterion_id: mean.criterion_id.clone(),
                    label: mean.label.clone(),
                    average: self.score(mean.average),
                    samples: mean.samples,
                })
                .collect(),
        )
    }

    pub fn member_bars(&self, view: &MemberView) -> ViewData<CriterionBar> {
        self.criterion_bars(&view.criteria)
    }

    pub fn member_activity(&self, activity: &[MemberActivity]) -> ViewData<MemberActivityBar> {
        ViewData::from_rows(
            activity
                .iter()
                .map(|row| MemberActivityBar {
                    user_id: row.member.user_id.clone(),
                    name: row.member.name.clone(),
                    ratings: row.ratings,
                    average: row.average.map(|value| self.score(value)),
                })
                .collect(),
        )
    }

    pub fn trend(&self, points: &[MonthlyPoint]) -> ViewData<TrendPoint> {
        ViewData::from_rows(
            points
                .iter()
                .map(|point| TrendPoint {
                    month: point.month.as_str().to_string(),
                    average: self.score(point.average),
                })
                .collect(),
        )
    }

    pub fn comparison(&self, matrix: &ComparisonMatrix) -> ViewData<ComparisonRow> {
        ViewData::from_rows(
            matrix
                .rows
                .iter()
                .map(|line| ComparisonRow {
                    criterion_id: line.criterion_id.clone(),
                    label: line.label.clone(),
                    values: matrix
                        .members
                        .iter()
                        .zip(&line.cells)
                        .map(|(member, cell)| ComparisonCell {
                            user_id: member.user_id.clone(),
                            name: member.name.clone(),
                            average: cell.map(|value| self.score(value)),
                        })
                        .collect(),
                })
                .collect(),
        )
    }

    pub fn feed(&self, entries: &[FeedEntry]) -> ViewData<FeedItem> {
        ViewData::from_rows(
            entries
                .iter()
                .map(|entry| FeedItem {
                    rating_id: entry.rating_id.clone(),
                    restaurant_id: entry.restaurant_id.clone(),
                    restaurant_name: entry
                        .restaurant_name
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_RESTAURANT.to_string()),
                    author: entry.attribution.name.clone(),
                    handle: entry.attribution.handle.clone(),
                    guest: entry.attribution.kind == AuthorKind::Guest,
                    composite: entry.composite.map(|value| self.score(value)),
                    scores: entry
                        .scores
                        .iter()
                        .map(|score| FeedScore {
                            label: score.label.clone(),
                            score: score.score,
                        })
                        .collect(),
                    comment: entry.comment.clone(),
                    created_at: entry.created_at,
                })
                .collect(),
        )
    }
}
