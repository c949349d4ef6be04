use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{InviteToken, RecordStore, StoreError};
use crate::domain::{
    Criterion, InviteCode, RatingId, RatingRecord, Restaurant, RestaurantId, User,
};

#[derive(Debug, Default)]
struct StoreState {
    restaurants: Vec<Restaurant>,
    criteria: Vec<Criterion>,
    users: Vec<User>,
    ratings: Vec<RatingRecord>,
    rating_index: HashMap<RatingId, usize>,
    invites: HashMap<InviteCode, InviteToken>,
    invite_order: Vec<InviteCode>,
    show_leaderboard: Option<bool>,
}

/// Process-local store backing the service and the test suites. Every
/// operation runs under one lock, which gives `mark_invite_used` its
/// compare-and-set semantics.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_restaurants(self, restaurants: impl IntoIterator<Item = Restaurant>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.restaurants.extend(restaurants);
        }
        self
    }

    pub fn with_criteria(self, criteria: impl IntoIterator<Item = Criterion>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.criteria.extend(criteria);
        }
        self
    }

    pub fn with_users(self, users: impl IntoIterator<Item = User>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.users.extend(users);
        }
        self
    }

    /// Seed ratings, skipping any that `insert_rating` would reject.
    pub fn with_ratings(self, ratings: impl IntoIterator<Item = RatingRecord>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            for record in ratings {
                let _ = push_rating(&mut state, record);
            }
        }
        self
    }

    pub fn with_invites(self, invites: impl IntoIterator<Item = InviteToken>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            for invite in invites {
                upsert_invite(&mut state, invite);
            }
        }
        self
    }

    pub fn with_visibility(self, visible: bool) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.show_leaderboard = Some(visible);
        }
        self
    }

    /// Remove a restaurant without touching its ratings.
    pub fn remove_restaurant(&self, id: &RestaurantId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let before = state.restaurants.len();
        state.restaurants.retain(|restaurant| &restaurant.id != id);
        Ok(state.restaurants.len() != before)
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

/// Appends a rating unless its id is taken or, for member ratings, the
/// author already holds one for the same restaurant.
fn push_rating(state: &mut StoreState, record: RatingRecord) -> Result<(), StoreError> {
    if state.rating_index.contains_key(record.id()) {
        return Err(StoreError::rating_conflict(record.id()));
    }
    if let Some(author) = record.member() {
        let restaurant_id = record.restaurant_id();
        let taken = state.ratings.iter().any(|existing| {
            existing.member() == Some(author) && existing.restaurant_id() == restaurant_id
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "member {author} already rated {restaurant_id}"
            )));
        }
    }
    state
        .rating_index
        .insert(record.id().clone(), state.ratings.len());
    state.ratings.push(record);
    Ok(())
}

fn upsert_invite(state: &mut StoreState, invite: InviteToken) {
    if !state.invites.contains_key(&invite.token) {
        state.invite_order.push(invite.token.clone());
    }
    state.invites.insert(invite.token.clone(), invite);
}

impl RecordStore for InMemoryRecordStore {
    fn list_restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        Ok(self.lock()?.restaurants.clone())
    }

    fn list_criteria(&self) -> Result<Vec<Criterion>, StoreError> {
        Ok(self.lock()?.criteria.clone())
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.lock()?.users.clone())
    }

    fn list_ratings(&self) -> Result<Vec<RatingRecord>, StoreError> {
        Ok(self.lock()?.ratings.clone())
    }

    fn insert_rating(&self, record: RatingRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        push_rating(&mut state, record)
    }

    fn replace_rating(&self, record: RatingRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        match state.rating_index.get(record.id()).copied() {
            Some(position) => {
                state.ratings[position] = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("rating {}", record.id()))),
        }
    }

    fn get_invite(&self, token: &InviteCode) -> Result<Option<InviteToken>, StoreError> {
        Ok(self.lock()?.invites.get(token).cloned())
    }

    fn create_invite(&self, invite: InviteToken) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.invites.contains_key(&invite.token) {
            return Err(StoreError::Conflict(format!("invite {}", invite.token)));
        }
        upsert_invite(&mut state, invite);
        Ok(())
    }

    fn mark_invite_used(&self, token: &InviteCode) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        match state.invites.get_mut(token) {
            Some(invite) if invite.used => {
                Err(StoreError::Conflict(format!("invite {token} already used")))
            }
            Some(invite) => {
                invite.used = true;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("invite {token}"))),
        }
    }

    fn list_invites(&self) -> Result<Vec<InviteToken>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .invite_order
            .iter()
            .filter_map(|token| state.invites.get(token).cloned())
            .collect())
    }

    fn visibility_flag(&self) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        Ok(*state.show_leaderboard.get_or_insert(false))
    }

    fn set_visibility_flag(&self, visible: bool) -> Result<(), StoreError> {
        self.lock()?.show_leaderboard = Some(visible);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionId, GuestRating, MemberRating, Scores, UserId};
    use chrono::{TimeZone, Utc};

    fn invite(code: &str) -> InviteToken {
        InviteToken {
            token: InviteCode::new(code),
            restaurant_id: RestaurantId::new("r1"),
            used: false,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap(),
        }
    }

    fn guest_rating(code: &str) -> RatingRecord {
        let invite = InviteCode::new(code);
        RatingRecord::Guest(GuestRating {
            id: RatingId::for_invite(&invite),
            restaurant_id: RestaurantId::new("r1"),
            invite,
            author_name: "Mara".to_string(),
            author_handle: None,
            scores: Scores::from([(CriterionId::new("food"), 9.0)]),
            comment: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 20, 0, 0).unwrap(),
        })
    }

    #[test]
    fn create_invite_refuses_to_overwrite() {
        let store = InMemoryRecordStore::new();
        store.create_invite(invite("abc")).expect("first create");
        match store.create_invite(invite("abc")) {
            Err(StoreError::Conflict(_)) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn mark_invite_used_is_compare_and_set() {
        let store = InMemoryRecordStore::new().with_invites(vec![invite("abc")]);
        store
            .mark_invite_used(&InviteCode::new("abc"))
            .expect("first flip succeeds");
        assert!(matches!(
            store.mark_invite_used(&InviteCode::new("abc")),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.mark_invite_used(&InviteCode::new("missing")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn insert_rating_rejects_duplicate_ids() {
        let store = InMemoryRecordStore::new();
        store.insert_rating(guest_rating("abc")).expect("inserted");
        assert!(matches!(
            store.insert_rating(guest_rating("abc")),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.list_ratings().expect("listed").len(), 1);
    }

    fn member_rating(id: &str, author: &str) -> RatingRecord {
        RatingRecord::Member(MemberRating {
            id: RatingId::new(id),
            restaurant_id: RestaurantId::new("r1"),
            author: UserId::new(author),
            scores: Scores::from([(CriterionId::new("food"), 7.0)]),
            comment: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 20, 0, 0).unwrap(),
        })
    }

    #[test]
    fn insert_rating_keeps_one_member_rating_per_restaurant() {
        let store = InMemoryRecordStore::new();
        store.insert_rating(member_rating("m1", "u1")).expect("inserted");
        match store.insert_rating(member_rating("m2", "u1")) {
            Err(StoreError::Conflict(reason)) => assert!(reason.contains("u1")),
            other => panic!("expected conflict, got {other:?}"),
        }
        store
            .insert_rating(member_rating("m3", "u2"))
            .expect("other member inserted");
        assert_eq!(store.list_ratings().expect("listed").len(), 2);
    }

    #[test]
    fn removing_a_restaurant_keeps_its_ratings() {
        let store = InMemoryRecordStore::new()
            .with_restaurants(vec![Restaurant {
                id: RestaurantId::new("r1"),
                name: "Alba".to_string(),
                visited_on: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            }])
            .with_ratings(vec![member_rating("m1", "u1")]);

        assert!(store
            .remove_restaurant(&RestaurantId::new("r1"))
            .expect("removed"));
        assert!(!store
            .remove_restaurant(&RestaurantId::new("r1"))
            .expect("already gone"));
        assert!(store.list_restaurants().expect("listed").is_empty());
        assert_eq!(store.list_ratings().expect("listed").len(), 1);
    }

    #[test]
    fn visibility_defaults_to_hidden_on_first_read() {
        let store = InMemoryRecordStore::new();
        assert!(!store.visibility_flag().expect("reads"));
        store.set_visibility_flag(true).expect("writes");
        assert!(store.visibility_flag().expect("reads"));
    }
}
