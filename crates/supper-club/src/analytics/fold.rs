use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{CriterionId, RatingRecord, RestaurantId, UserId};
use crate::scoring::composite;

/// Running mean kept at full precision.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Mean {
    total: f64,
    count: usize,
}

impl Mean {
    pub fn push(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `None` when nothing was pushed; "no data" is never zero.
    pub fn value(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total / self.count as f64)
        }
    }
}

impl FromIterator<f64> for Mean {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut mean = Mean::default();
        for value in iter {
            mean.push(value);
        }
        mean
    }
}

/// Calendar month bucket, `YYYY-MM`. Zero padding makes string order
/// chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey(pub String);

impl MonthKey {
    pub fn of(timestamp: DateTime<Utc>, display_offset: FixedOffset) -> Self {
        Self(
            timestamp
                .with_timezone(&display_offset)
                .format("%Y-%m")
                .to_string(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-rating facts computed once and shared by every view.
#[derive(Debug, Clone)]
pub(crate) struct ScoredRating {
    pub(crate) composite: Option<f64>,
    pub(crate) month: MonthKey,
}

/// Single pass over the ratings producing every grouping the views read.
#[derive(Debug, Default)]
pub(crate) struct RatingFold {
    pub(crate) scored: Vec<ScoredRating>,
    pub(crate) by_restaurant: HashMap<RestaurantId, Vec<usize>>,
    pub(crate) restaurant_composites: HashMap<RestaurantId, Mean>,
    pub(crate) member_criteria: HashMap<UserId, BTreeMap<CriterionId, Mean>>,
    pub(crate) member_composites: HashMap<UserId, Mean>,
    pub(crate) member_counts: HashMap<UserId, usize>,
    pub(crate) criterion_scores: BTreeMap<CriterionId, Mean>,
    pub(crate) monthly_composites: BTreeMap<MonthKey, Mean>,
    pub(crate) monthly_criteria: HashMap<CriterionId, BTreeMap<MonthKey, Mean>>,
}

impl RatingFold {
    pub(crate) fn build(ratings: &[RatingRecord], display_offset: FixedOffset) -> Self {
        let mut fold = RatingFold::default();

        for (index, record) in ratings.iter().enumerate() {
            let month = MonthKey::of(record.created_at(), display_offset);
            let composite = match composite(record.scores()) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!(
                        rating = %record.id(),
                        error = %err,
                        "rating excluded from composite views"
                    );
                    None
                }
            };

            fold.by_restaurant
                .entry(record.restaurant_id().clone())
                .or_default()
                .push(index);

            if let Some(value) = composite {
                fold.restaurant_composites
                    .entry(record.restaurant_id().clone())
                    .or_default()
                    .push(value);
                fold.monthly_composites
                    .entry(month.clone())
                    .or_default()
                    .push(value);
            }

            if let Some(author) = record.member() {
                *fold.member_counts.entry(author.clone()).or_default() += 1;
                if let Some(value) = composite {
                    fold.member_composites
                        .entry(author.clone())
                        .or_default()
                        .push(value);
                }
                let per_criterion = fold.member_criteria.entry(author.clone()).or_default();
                for (criterion, score) in record.scores() {
                    per_criterion.entry(criterion.clone()).or_default().push(*score);
                }
            }

            for (criterion, score) in record.scores() {
                fold.criterion_scores
                    .entry(criterion.clone())
                    .or_default()
                    .push(*score);
                fold.monthly_criteria
                    .entry(criterion.clone())
                    .or_default()
                    .entry(month.clone())
                    .or_default()
                    .push(*score);
            }

            fold.scored.push(ScoredRating { composite, month });
        }

        fold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mean_distinguishes_no_data_from_zero() {
        assert_eq!(Mean::default().value(), None);
        let zero: Mean = [0.0, 0.0].into_iter().collect();
        assert_eq!(zero.value(), Some(0.0));
        assert_eq!(zero.count(), 2);
    }

    #[test]
    fn month_key_uses_display_offset() {
        let late_evening = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).expect("utc offset");
        let berlin = FixedOffset::east_opt(3600).expect("cet offset");

        assert_eq!(MonthKey::of(late_evening, utc).as_str(), "2024-01");
        assert_eq!(MonthKey::of(late_evening, berlin).as_str(), "2024-02");
    }

    #[test]
    fn month_keys_sort_chronologically() {
        let mut keys = vec![
            MonthKey("2024-10".to_string()),
            MonthKey("2023-12".to_string()),
            MonthKey("2024-02".to_string()),
        ];
        keys.sort();
        let ordered: Vec<&str> = keys.iter().map(MonthKey::as_str).collect();
        assert_eq!(ordered, vec!["2023-12", "2024-02", "2024-10"]);
    }
}
