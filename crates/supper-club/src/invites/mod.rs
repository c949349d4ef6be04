//! Invite-token lifecycle: issue, validate, single-use redemption.
//!
//! A token moves `issued(used=false) -> redeemed(used=true)` and never back.
//! Redemption writes the guest rating first and flips the token second; the
//! rating id is derived from the token so a replayed redemption collides on
//! the rating write instead of producing a second rating.

mod audit;
mod tokens;

pub use audit::{InconsistencyKind, InviteInconsistency};
pub use tokens::{RandomTokens, TokenGenerator};

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::{GuestRating, InviteCode, RatingId, RatingRecord, RestaurantId, Scores};
use crate::error::InputError;
use crate::scoring::ensure_scored;
use crate::store::{InviteToken, RecordStore, StoreError};

/// Three-way outcome of a read-only token check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "restaurant_id", rename_all = "snake_case")]
pub enum InviteValidation {
    Valid(RestaurantId),
    NotFound,
    AlreadyUsed,
}

/// What a guest fills in on the invite form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestSubmission {
    pub name: String,
    #[serde(default)]
    pub handle: Option<String>,
    pub scores: Scores,
    #[serde(default)]
    pub comment: Option<String>,
}

impl GuestSubmission {
    fn check(&self) -> Result<(), InputError> {
        if self.name.trim().is_empty() {
            return Err(InputError::MissingGuestName);
        }
        ensure_scored(&self.scores)?;
        Ok(())
    }
}

/// Freshly issued invite plus the link to hand to the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedInvite {
    pub invite: InviteToken,
    pub link: String,
}

/// Builds shareable invite links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLinks {
    base_url: String,
}

impl InviteLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn link(&self, token: &InviteCode, restaurant_id: &RestaurantId) -> String {
        format!(
            "{}/invite/{}?restaurant={}",
            self.base_url, token, restaurant_id
        )
    }
}

/// Service owning every invite state transition.
pub struct InviteService<S> {
    store: Arc<S>,
    links: InviteLinks,
    tokens: Box<dyn TokenGenerator>,
}

impl<S> InviteService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, links: InviteLinks) -> Self {
        Self::with_generator(store, links, Box::new(RandomTokens))
    }

    pub fn with_generator(
        store: Arc<S>,
        links: InviteLinks,
        tokens: Box<dyn TokenGenerator>,
    ) -> Self {
        Self {
            store,
            links,
            tokens,
        }
    }

    /// Issue a new token bound to `restaurant_id`. Creation is
    /// collision-checked; a clash is reported, never overwritten.
    pub fn issue(&self, restaurant_id: &RestaurantId) -> Result<IssuedInvite, InviteError> {
        let known = self
            .store
            .list_restaurants()?
            .iter()
            .any(|restaurant| &restaurant.id == restaurant_id);
        if !known {
            return Err(InviteError::UnknownRestaurant(restaurant_id.clone()));
        }

        let invite = InviteToken {
            token: self.tokens.generate(),
            restaurant_id: restaurant_id.clone(),
            used: false,
            created_at: Utc::now(),
        };

        match self.store.create_invite(invite.clone()) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                error!(token = %invite.token, "invite token collision");
                return Err(InviteError::TokenCollision(invite.token));
            }
            Err(other) => return Err(other.into()),
        }

        info!(token = %invite.token, restaurant = %restaurant_id, "invite issued");
        let link = self.links.link(&invite.token, restaurant_id);
        Ok(IssuedInvite { invite, link })
    }

    pub fn validate(&self, token: &InviteCode) -> Result<InviteValidation, InviteError> {
        let validation = match self.store.get_invite(token)? {
            None => InviteValidation::NotFound,
            Some(invite) if invite.used => InviteValidation::AlreadyUsed,
            Some(invite) => InviteValidation::Valid(invite.restaurant_id),
        };
        Ok(validation)
    }

    /// Redeem `token` with a guest's rating. Input is checked before any
    /// write; the rating is stored before the token is flipped.
    pub fn redeem(
        &self,
        token: &InviteCode,
        submission: GuestSubmission,
    ) -> Result<GuestRating, InviteError> {
        submission.check()?;

        let restaurant_id = match self.validate(token)? {
            InviteValidation::Valid(restaurant_id) => restaurant_id,
            InviteValidation::NotFound => return Err(InviteError::NotFound(token.clone())),
            InviteValidation::AlreadyUsed => {
                warn!(token = %token, "redemption rejected, invite already used");
                return Err(InviteError::AlreadyUsed(token.clone()));
            }
        };

        let GuestSubmission {
            name,
            handle,
            scores,
            comment,
        } = submission;

        let rating = GuestRating {
            id: RatingId::for_invite(token),
            restaurant_id,
            invite: token.clone(),
            author_name: name.trim().to_string(),
            author_handle: handle
                .map(|handle| handle.trim().to_string())
                .filter(|handle| !handle.is_empty()),
            scores,
            comment: comment.filter(|comment| !comment.trim().is_empty()),
            created_at: Utc::now(),
        };

        match self.store.insert_rating(RatingRecord::Guest(rating.clone())) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                warn!(token = %token, "guest rating already stored for invite");
                return Err(InviteError::AlreadyUsed(token.clone()));
            }
            Err(other) => return Err(other.into()),
        }

        if let Err(err) = self.store.mark_invite_used(token) {
            error!(
                token = %token,
                error = %err,
                "guest rating stored but invite could not be marked used"
            );
            return Err(InviteError::Inconsistent {
                token: token.clone(),
                detail: format!("guest rating stored, marking invite used failed: {err}"),
            });
        }

        info!(token = %token, restaurant = %rating.restaurant_id, "invite redeemed");
        Ok(rating)
    }

    /// Read-time scan for tokens and guest ratings that disagree. Findings
    /// are reported, never repaired.
    pub fn audit(&self) -> Result<Vec<InviteInconsistency>, InviteError> {
        let invites = self.store.list_invites()?;
        let ratings = self.store.list_ratings()?;
        Ok(audit::find_inconsistencies(&invites, &ratings))
    }
}

/// Error raised by the invite lifecycle. Each variant names the invariant
/// that rejected the operation.
#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    #[error("invite token {0} not found")]
    NotFound(InviteCode),
    #[error("invite token {0} already used")]
    AlreadyUsed(InviteCode),
    #[error("restaurant {0} not found")]
    UnknownRestaurant(RestaurantId),
    #[error("invalid guest rating: {0}")]
    InvalidInput(#[from] InputError),
    #[error("generated invite token {0} collides with an existing token")]
    TokenCollision(InviteCode),
    #[error("invite {token} is inconsistent: {detail}")]
    Inconsistent { token: InviteCode, detail: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionId, Restaurant};
    use crate::store::InMemoryRecordStore;
    use chrono::NaiveDate;

    struct FixedTokens(&'static str);

    impl TokenGenerator for FixedTokens {
        fn generate(&self) -> InviteCode {
            InviteCode::new(self.0)
        }
    }

    fn store() -> Arc<InMemoryRecordStore> {
        Arc::new(InMemoryRecordStore::new().with_restaurants(vec![Restaurant {
            id: RestaurantId::new("R1"),
            name: "Osteria".to_string(),
            visited_on: NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"),
        }]))
    }

    fn submission(name: &str) -> GuestSubmission {
        GuestSubmission {
            name: name.to_string(),
            handle: Some("  ".to_string()),
            scores: Scores::from([(CriterionId::new("food"), 9.0)]),
            comment: None,
        }
    }

    #[test]
    fn issue_builds_link_and_stores_unused_token() {
        let store = store();
        let service = InviteService::with_generator(
            store.clone(),
            InviteLinks::new("https://club.example/"),
            Box::new(FixedTokens("abc123")),
        );

        let issued = service.issue(&RestaurantId::new("R1")).expect("issued");
        assert_eq!(
            issued.link,
            "https://club.example/invite/abc123?restaurant=R1"
        );
        assert!(!issued.invite.used);
        assert_eq!(
            service.validate(&InviteCode::new("abc123")).expect("validates"),
            InviteValidation::Valid(RestaurantId::new("R1"))
        );
    }

    #[test]
    fn issue_reports_collisions_instead_of_overwriting() {
        let service = InviteService::with_generator(
            store(),
            InviteLinks::new("https://club.example"),
            Box::new(FixedTokens("same")),
        );

        service.issue(&RestaurantId::new("R1")).expect("first issue");
        match service.issue(&RestaurantId::new("R1")) {
            Err(InviteError::TokenCollision(code)) => assert_eq!(code.as_str(), "same"),
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn issue_rejects_unknown_restaurants() {
        let service = InviteService::new(store(), InviteLinks::new("https://club.example"));
        assert!(matches!(
            service.issue(&RestaurantId::new("nope")),
            Err(InviteError::UnknownRestaurant(_))
        ));
    }

    #[test]
    fn redeem_rejects_missing_name_before_writing() {
        let store = store();
        let service = InviteService::with_generator(
            store.clone(),
            InviteLinks::new("https://club.example"),
            Box::new(FixedTokens("abc123")),
        );
        service.issue(&RestaurantId::new("R1")).expect("issued");

        let err = service
            .redeem(&InviteCode::new("abc123"), submission("   "))
            .expect_err("blank name rejected");
        assert!(matches!(
            err,
            InviteError::InvalidInput(InputError::MissingGuestName)
        ));
        assert!(store.list_ratings().expect("listed").is_empty());
        assert_eq!(
            service.validate(&InviteCode::new("abc123")).expect("validates"),
            InviteValidation::Valid(RestaurantId::new("R1"))
        );
    }

    #[test]
    fn redeem_denormalizes_guest_and_drops_blank_handle() {
        let store = store();
        let service = InviteService::with_generator(
            store.clone(),
            InviteLinks::new("https://club.example"),
            Box::new(FixedTokens("abc123")),
        );
        service.issue(&RestaurantId::new("R1")).expect("issued");

        let rating = service
            .redeem(&InviteCode::new("abc123"), submission(" Mara "))
            .expect("redeemed");
        assert_eq!(rating.author_name, "Mara");
        assert!(rating.author_handle.is_none());
        assert_eq!(rating.restaurant_id, RestaurantId::new("R1"));
        assert_eq!(rating.id, RatingId::for_invite(&InviteCode::new("abc123")));
    }
}
