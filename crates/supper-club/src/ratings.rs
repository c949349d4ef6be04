use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{MemberRating, RatingId, RatingRecord, RestaurantId, Scores, UserId};
use crate::error::InputError;
use crate::scoring::ensure_scored;
use crate::store::{RecordStore, StoreError};

/// Member rating as entered on the rating form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSubmission {
    pub author: UserId,
    pub scores: Scores,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "rating", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created(MemberRating),
    Updated(MemberRating),
}

impl SubmitOutcome {
    pub fn rating(&self) -> &MemberRating {
        match self {
            Self::Created(rating) | Self::Updated(rating) => rating,
        }
    }
}

/// The member's existing rating for `restaurant_id`, if any. Pure lookup
/// deciding create-vs-edit.
pub fn find_member_rating<'a>(
    ratings: &'a [RatingRecord],
    author: &UserId,
    restaurant_id: &RestaurantId,
) -> Option<&'a MemberRating> {
    ratings.iter().find_map(|record| match record {
        RatingRecord::Member(rating)
            if &rating.author == author && &rating.restaurant_id == restaurant_id =>
        {
            Some(rating)
        }
        _ => None,
    })
}

/// Write path for member ratings, keeping one rating per member and
/// restaurant.
pub struct RatingService<S> {
    store: Arc<S>,
}

impl<S> RatingService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn has_rated(
        &self,
        author: &UserId,
        restaurant_id: &RestaurantId,
    ) -> Result<bool, RatingError> {
        let ratings = self.store.list_ratings()?;
        Ok(find_member_rating(&ratings, author, restaurant_id).is_some())
    }

    /// Create the member's rating, or replace scores and comment of the one
    /// they already hold for this restaurant.
    pub fn submit_member(
        &self,
        restaurant_id: &RestaurantId,
        submission: MemberSubmission,
    ) -> Result<SubmitOutcome, RatingError> {
        ensure_scored(&submission.scores).map_err(InputError::from)?;

        let known = self
            .store
            .list_restaurants()?
            .iter()
            .any(|restaurant| &restaurant.id == restaurant_id);
        if !known {
            return Err(RatingError::UnknownRestaurant(restaurant_id.clone()));
        }

        let MemberSubmission {
            author,
            scores,
            comment,
        } = submission;
        let comment = comment.filter(|comment| !comment.trim().is_empty());

        let ratings = self.store.list_ratings()?;
        if let Some(existing) = find_member_rating(&ratings, &author, restaurant_id) {
            return self.update(existing.clone(), scores, comment);
        }

        let rating = MemberRating {
            id: next_rating_id(),
            restaurant_id: restaurant_id.clone(),
            author,
            scores,
            comment,
            created_at: Utc::now(),
        };
        match self.store.insert_rating(RatingRecord::Member(rating.clone())) {
            Ok(()) => {
                info!(rating = %rating.id, member = %rating.author, "member rating created");
                Ok(SubmitOutcome::Created(rating))
            }
            // A concurrent submission from the same member won the insert.
            Err(conflict @ StoreError::Conflict(_)) => {
                let ratings = self.store.list_ratings()?;
                match find_member_rating(&ratings, &rating.author, restaurant_id) {
                    Some(existing) => self.update(existing.clone(), rating.scores, rating.comment),
                    None => Err(conflict.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update(
        &self,
        existing: MemberRating,
        scores: Scores,
        comment: Option<String>,
    ) -> Result<SubmitOutcome, RatingError> {
        let updated = MemberRating {
            scores,
            comment,
            ..existing
        };
        self.store
            .replace_rating(RatingRecord::Member(updated.clone()))?;
        info!(rating = %updated.id, member = %updated.author, "member rating updated");
        Ok(SubmitOutcome::Updated(updated))
    }
}

fn next_rating_id() -> RatingId {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    RatingId(format!("rating-{}", hex::encode(bytes)))
}

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("invalid rating: {0}")]
    InvalidInput(#[from] InputError),
    #[error("restaurant {0} not found")]
    UnknownRestaurant(RestaurantId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionId, Restaurant};
    use crate::scoring::ScoreError;
    use crate::store::InMemoryRecordStore;
    use chrono::NaiveDate;

    fn store() -> Arc<InMemoryRecordStore> {
        Arc::new(InMemoryRecordStore::new().with_restaurants(vec![Restaurant {
            id: RestaurantId::new("r1"),
            name: "Bistro".to_string(),
            visited_on: NaiveDate::from_ymd_opt(2024, 2, 14).expect("valid date"),
        }]))
    }

    fn submission(food: f64) -> MemberSubmission {
        MemberSubmission {
            author: UserId::new("u1"),
            scores: Scores::from([(CriterionId::new("food"), food)]),
            comment: Some("great pasta".to_string()),
        }
    }

    #[test]
    fn second_submission_edits_instead_of_duplicating() {
        let store = store();
        let service = RatingService::new(store.clone());
        let restaurant = RestaurantId::new("r1");

        assert!(!service
            .has_rated(&UserId::new("u1"), &restaurant)
            .expect("lookup"));

        let created = service
            .submit_member(&restaurant, submission(6.0))
            .expect("created");
        assert!(matches!(created, SubmitOutcome::Created(_)));

        let updated = service
            .submit_member(&restaurant, submission(9.0))
            .expect("updated");
        let rating = match updated {
            SubmitOutcome::Updated(rating) => rating,
            other => panic!("expected update, got {other:?}"),
        };
        assert_eq!(rating.id, created.rating().id);
        assert_eq!(rating.created_at, created.rating().created_at);
        assert_eq!(rating.scores[&CriterionId::new("food")], 9.0);

        assert_eq!(store.list_ratings().expect("listed").len(), 1);
        assert!(service
            .has_rated(&UserId::new("u1"), &restaurant)
            .expect("lookup"));
    }

    #[test]
    fn concurrent_first_submissions_keep_a_single_rating() {
        for _ in 0..50 {
            let store = store();
            let service = RatingService::new(store.clone());
            let restaurant = RestaurantId::new("r1");
            let barrier = std::sync::Barrier::new(8);

            let outcomes: Vec<SubmitOutcome> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..8)
                    .map(|attempt| {
                        let (service, restaurant, barrier) = (&service, &restaurant, &barrier);
                        scope.spawn(move || {
                            barrier.wait();
                            service
                                .submit_member(restaurant, submission(f64::from(attempt)))
                                .expect("submission succeeds")
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().expect("submit thread"))
                    .collect()
            });

            let created = outcomes
                .iter()
                .filter(|outcome| matches!(outcome, SubmitOutcome::Created(_)))
                .count();
            assert_eq!(created, 1);
            assert_eq!(store.list_ratings().expect("listed").len(), 1);
        }
    }

    #[test]
    fn empty_scores_are_rejected_before_writing() {
        let store = store();
        let service = RatingService::new(store.clone());
        let mut empty = submission(5.0);
        empty.scores.clear();

        match service.submit_member(&RestaurantId::new("r1"), empty) {
            Err(RatingError::InvalidInput(InputError::Scores(ScoreError::EmptyScores))) => {}
            other => panic!("expected invalid input, got {other:?}"),
        }
        assert!(store.list_ratings().expect("listed").is_empty());
    }

    #[test]
    fn unknown_restaurant_is_reported() {
        let service = RatingService::new(store());
        assert!(matches!(
            service.submit_member(&RestaurantId::new("gone"), submission(5.0)),
            Err(RatingError::UnknownRestaurant(_))
        ));
    }
}
