use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{FixedOffset, Offset, Utc};

use super::fold::{Mean, RatingFold};
use super::views::{
    ComparisonLine, ComparisonMatrix, CriterionMean, FeedEntry, LabelledScore, LeaderboardEntry,
    MemberActivity, MemberRef, MemberView, MonthlyPoint, RatedBy, RestaurantView,
};
use super::{AnalyticsError, Snapshot};
use crate::catalog::CriterionCatalog;
use crate::domain::{CriterionId, RatingRecord, Restaurant, RestaurantId, User, UserId};
use crate::error::InputError;
use crate::gate::Visibility;
use crate::ratings::find_member_rating;

/// Knobs that change grouping, not business rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsOptions {
    /// Timezone whose calendar months bucket the trend views.
    pub display_offset: FixedOffset,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self {
            display_offset: Utc.fix(),
        }
    }
}

/// Read-only engine over one snapshot. Construction folds every rating once;
/// each view method is a pure read of that fold.
#[derive(Debug)]
pub struct AnalyticsEngine {
    snapshot: Snapshot,
    fold: RatingFold,
    users: HashMap<UserId, usize>,
}

impl AnalyticsEngine {
    pub fn new(snapshot: Snapshot, options: AnalyticsOptions) -> Self {
        let fold = RatingFold::build(&snapshot.ratings, options.display_offset);
        let users = snapshot
            .users
            .iter()
            .enumerate()
            .map(|(position, user)| (user.id.clone(), position))
            .collect();

        Self {
            snapshot,
            fold,
            users,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn catalog(&self) -> &CriterionCatalog {
        &self.snapshot.catalog
    }

    fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id).map(|&position| &self.snapshot.users[position])
    }

    fn restaurant(&self, id: &RestaurantId) -> Option<&Restaurant> {
        self.snapshot
            .restaurants
            .iter()
            .find(|restaurant| &restaurant.id == id)
    }

    fn member_ref(&self, id: &UserId) -> MemberRef {
        match self.user(id) {
            Some(user) => MemberRef {
                user_id: id.clone(),
                name: user.name.clone(),
                handle: user
                    .instagram_handle
                    .clone()
                    .filter(|handle| !handle.trim().is_empty()),
            },
            None => MemberRef {
                user_id: id.clone(),
                name: id.to_string(),
                handle: None,
            },
        }
    }

    fn build_restaurant_view(
        &self,
        restaurant_id: &RestaurantId,
        restaurant: Option<&Restaurant>,
    ) -> RestaurantView {
        let ratings = self
            .fold
            .by_restaurant
            .get(restaurant_id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| {
                        let record = &self.snapshot.ratings[index];
                        RatedBy {
                            rating_id: record.id().clone(),
                            attribution: record.attribution(|id| self.user(id)),
                            composite: self.fold.scored[index].composite,
                            comment: record.comment().map(str::to_string),
                            created_at: record.created_at(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let average = self
            .fold
            .restaurant_composites
            .get(restaurant_id)
            .and_then(Mean::value);

        RestaurantView {
            restaurant_id: restaurant_id.clone(),
            restaurant: restaurant.cloned(),
            ratings,
            average,
        }
    }

    /// Ratings and overall average of one restaurant. Deleted restaurants
    /// that still carry ratings resolve with `restaurant: None`.
    pub fn restaurant_view(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<RestaurantView, AnalyticsError> {
        let restaurant = self.restaurant(restaurant_id);
        if restaurant.is_none() && !self.fold.by_restaurant.contains_key(restaurant_id) {
            return Err(AnalyticsError::RestaurantNotFound(restaurant_id.clone()));
        }
        Ok(self.build_restaurant_view(restaurant_id, restaurant))
    }

    /// Every catalog restaurant in catalog order, rated or not.
    pub fn restaurant_views(&self) -> Vec<RestaurantView> {
        self.snapshot
            .restaurants
            .iter()
            .map(|restaurant| self.build_restaurant_view(&restaurant.id, Some(restaurant)))
            .collect()
    }

    fn criterion_means<'a, I>(&self, means: I) -> Vec<CriterionMean>
    where
        I: IntoIterator<Item = (&'a CriterionId, &'a Mean)>,
    {
        let catalog = self.catalog();
        let mut rows: Vec<CriterionMean> = means
            .into_iter()
            .filter_map(|(criterion_id, mean)| {
                mean.value().map(|average| CriterionMean {
                    criterion_id: criterion_id.clone(),
                    label: catalog.label(criterion_id).to_string(),
                    in_catalog: catalog.contains(criterion_id),
                    average,
                    samples: mean.count(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            catalog
                .display_rank(&a.criterion_id)
                .cmp(&catalog.display_rank(&b.criterion_id))
        });
        rows
    }

    /// Mean of the member's own raw scores per criterion they scored.
    pub fn member_view(&self, user_id: &UserId) -> Result<MemberView, AnalyticsError> {
        if self.user(user_id).is_none() && !self.fold.member_counts.contains_key(user_id) {
            return Err(AnalyticsError::MemberNotFound(user_id.clone()));
        }

        let criteria = self
            .fold
            .member_criteria
            .get(user_id)
            .map(|means| self.criterion_means(means.iter()))
            .unwrap_or_default();

        Ok(MemberView {
            member: self.member_ref(user_id),
            criteria,
        })
    }

    /// Criterion x member matrix over the catalog. Cells without data are
    /// `None`; unknown or inactive members simply get an empty column.
    pub fn comparison(&self, members: &[UserId]) -> Result<ComparisonMatrix, AnalyticsError> {
        let mut seen = HashSet::new();
        let selected: Vec<&UserId> = members.iter().filter(|id| seen.insert(*id)).collect();
        if selected.is_empty() {
            return Err(InputError::EmptySelection.into());
        }

        let rows = self
            .catalog()
            .iter()
            .map(|criterion| ComparisonLine {
                criterion_id: criterion.id.clone(),
                label: criterion.label.clone(),
                cells: selected
                    .iter()
                    .map(|user_id| {
                        self.fold
                            .member_criteria
                            .get(*user_id)
                            .and_then(|means| means.get(&criterion.id))
                            .and_then(Mean::value)
                    })
                    .collect(),
            })
            .collect();

        Ok(ComparisonMatrix {
            members: selected.into_iter().map(|id| self.member_ref(id)).collect(),
            rows,
        })
    }

    /// Mean composite per calendar month, ascending.
    pub fn monthly_trend(&self) -> Vec<MonthlyPoint> {
        monthly_points(self.fold.monthly_composites.iter())
    }

    /// Mean raw score of one criterion per calendar month, ascending.
    pub fn criterion_trend(
        &self,
        criterion_id: &CriterionId,
    ) -> Result<Vec<MonthlyPoint>, AnalyticsError> {
        match self.fold.monthly_criteria.get(criterion_id) {
            Some(months) => Ok(monthly_points(months.iter())),
            None if self.catalog().contains(criterion_id) => Ok(Vec::new()),
            None => Err(AnalyticsError::CriterionNotFound(criterion_id.clone())),
        }
    }

    /// Restaurants ranked by mean composite, descending. Restaurants without
    /// ratings are left out and equal averages keep catalog order. Refused
    /// outright while the leaderboard is private.
    pub fn leaderboard(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<LeaderboardEntry>, AnalyticsError> {
        if !visibility.is_public() {
            return Err(AnalyticsError::GateClosed);
        }

        let mut ranked: Vec<(&Restaurant, f64, usize)> = self
            .snapshot
            .restaurants
            .iter()
            .filter_map(|restaurant| {
                let mean = self.fold.restaurant_composites.get(&restaurant.id)?;
                mean.value()
                    .map(|average| (restaurant, average, mean.count()))
            })
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(position, (restaurant, average, ratings))| LeaderboardEntry {
                rank: position + 1,
                restaurant: restaurant.clone(),
                average,
                ratings,
            })
            .collect())
    }

    /// Global mean per criterion id across every rating, dangling ids
    /// included after the catalog.
    pub fn criterion_averages(&self) -> Vec<CriterionMean> {
        self.criterion_means(self.fold.criterion_scores.iter())
    }

    /// Rating count and mean composite per member who rated at least once,
    /// in directory order followed by ids missing from the directory.
    pub fn member_activity(&self) -> Vec<MemberActivity> {
        let mut ids: Vec<&UserId> = self.fold.member_counts.keys().collect();
        ids.sort_by(|a, b| {
            let rank = |id: &UserId| self.users.get(id).copied().unwrap_or(usize::MAX);
            rank(*a).cmp(&rank(*b)).then_with(|| a.cmp(b))
        });

        ids.into_iter()
            .map(|id| MemberActivity {
                member: self.member_ref(id),
                ratings: self.fold.member_counts.get(id).copied().unwrap_or_default(),
                average: self.fold.member_composites.get(id).and_then(Mean::value),
            })
            .collect()
    }

    /// Every rating with its context, newest first.
    pub fn feed(&self) -> Vec<FeedEntry> {
        let catalog = self.catalog();
        let mut entries: Vec<FeedEntry> = self
            .snapshot
            .ratings
            .iter()
            .zip(&self.fold.scored)
            .map(|(record, scored)| {
                let mut scores: Vec<LabelledScore> = record
                    .scores()
                    .iter()
                    .map(|(criterion_id, score)| LabelledScore {
                        criterion_id: criterion_id.clone(),
                        label: catalog.label(criterion_id).to_string(),
                        score: *score,
                    })
                    .collect();
                scores.sort_by(|a, b| {
                    catalog
                        .display_rank(&a.criterion_id)
                        .cmp(&catalog.display_rank(&b.criterion_id))
                });

                FeedEntry {
                    rating_id: record.id().clone(),
                    restaurant_id: record.restaurant_id().clone(),
                    restaurant_name: self
                        .restaurant(record.restaurant_id())
                        .map(|restaurant| restaurant.name.clone()),
                    attribution: record.attribution(|id| self.user(id)),
                    composite: scored.composite,
                    scores,
                    comment: record.comment().map(str::to_string),
                    created_at: record.created_at(),
                }
            })
            .collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    pub fn has_rated(&self, user_id: &UserId, restaurant_id: &RestaurantId) -> bool {
        find_member_rating(&self.snapshot.ratings, user_id, restaurant_id).is_some()
    }

    pub fn rated_restaurants(&self, user_id: &UserId) -> BTreeSet<RestaurantId> {
        self.snapshot
            .ratings
            .iter()
            .filter(|record| record.member() == Some(user_id))
            .map(|record: &RatingRecord| record.restaurant_id().clone())
            .collect()
    }
}

fn monthly_points<'a, I>(months: I) -> Vec<MonthlyPoint>
where
    I: IntoIterator<Item = (&'a super::fold::MonthKey, &'a Mean)>,
{
    months
        .into_iter()
        .filter_map(|(month, mean)| {
            mean.value().map(|average| MonthlyPoint {
                month: month.clone(),
                average,
                samples: mean.count(),
            })
        })
        .collect()
}
