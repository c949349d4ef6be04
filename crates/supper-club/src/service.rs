use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::analytics::format::{
    ComparisonRow, CriterionBar, FeedItem, LeaderboardRow, MemberActivityBar, PrecisionPolicy,
    RestaurantCard, TrendPoint, ViewData, ViewFormatter,
};
use crate::analytics::{AnalyticsEngine, AnalyticsError, AnalyticsOptions, MemberRef, Snapshot};
use crate::config::ClubConfig;
use crate::domain::{CriterionId, GuestRating, InviteCode, RestaurantId, UserId};
use crate::gate::{Visibility, VisibilityGate};
use crate::invites::{
    GuestSubmission, InviteError, InviteInconsistency, InviteLinks, InviteService,
    InviteValidation, IssuedInvite, TokenGenerator,
};
use crate::ratings::{MemberSubmission, RatingError, RatingService, SubmitOutcome};
use crate::scoring::DisplayPrecision;
use crate::store::{RecordStore, StoreError};

/// Deployment-dependent knobs for [`ClubService`].
#[derive(Debug, Clone)]
pub struct ClubSettings {
    pub public_base_url: String,
    pub analytics: AnalyticsOptions,
    pub precision: PrecisionPolicy,
}

impl ClubSettings {
    pub fn from_config(config: &ClubConfig) -> Self {
        Self {
            public_base_url: config.public_base_url.clone(),
            analytics: AnalyticsOptions {
                display_offset: config.display_offset,
            },
            precision: PrecisionPolicy {
                scores: DisplayPrecision::Tenths,
                restaurant_average: config.restaurant_average_precision,
            },
        }
    }
}

impl Default for ClubSettings {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:5173".to_string(),
            analytics: AnalyticsOptions::default(),
            precision: PrecisionPolicy::default(),
        }
    }
}

/// A member's per-criterion profile, ready for the bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberProfile {
    pub member: MemberRef,
    pub criteria: ViewData<CriterionBar>,
}

/// Service composing the record store, invite lifecycle, visibility gate and
/// the read-side engine. Every view reads a fresh snapshot.
pub struct ClubService<S> {
    store: Arc<S>,
    invites: InviteService<S>,
    ratings: RatingService<S>,
    gate: VisibilityGate<S>,
    links: InviteLinks,
    formatter: ViewFormatter,
    options: AnalyticsOptions,
}

impl<S> ClubService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, settings: ClubSettings) -> Self {
        let links = InviteLinks::new(settings.public_base_url);
        Self {
            invites: InviteService::new(store.clone(), links.clone()),
            ratings: RatingService::new(store.clone()),
            gate: VisibilityGate::new(store.clone()),
            store,
            links,
            formatter: ViewFormatter::new(settings.precision),
            options: settings.analytics,
        }
    }

    /// Swap the invite token source, mainly for deterministic tests.
    pub fn with_token_generator(mut self, tokens: Box<dyn TokenGenerator>) -> Self {
        self.invites =
            InviteService::with_generator(self.store.clone(), self.links.clone(), tokens);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn engine(&self) -> Result<AnalyticsEngine, StoreError> {
        let snapshot = Snapshot::load(self.store.as_ref())?;
        Ok(AnalyticsEngine::new(snapshot, self.options))
    }

    pub fn leaderboard(&self) -> Result<ViewData<LeaderboardRow>, ClubError> {
        let visibility = self.gate.visibility()?;
        let entries = self.engine()?.leaderboard(visibility)?;
        Ok(self.formatter.leaderboard(&entries))
    }

    pub fn restaurant_cards(&self) -> Result<ViewData<RestaurantCard>, ClubError> {
        let views = self.engine()?.restaurant_views();
        Ok(self.formatter.restaurant_cards(&views))
    }

    pub fn restaurant_card(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<RestaurantCard, ClubError> {
        let view = self.engine()?.restaurant_view(restaurant_id)?;
        Ok(self.formatter.restaurant_card(&view))
    }

    pub fn member_profile(&self, user_id: &UserId) -> Result<MemberProfile, ClubError> {
        let view = self.engine()?.member_view(user_id)?;
        Ok(MemberProfile {
            criteria: self.formatter.member_bars(&view),
            member: view.member,
        })
    }

    pub fn rated_restaurants(
        &self,
        user_id: &UserId,
    ) -> Result<BTreeSet<RestaurantId>, ClubError> {
        Ok(self.engine()?.rated_restaurants(user_id))
    }

    pub fn comparison(&self, members: &[UserId]) -> Result<ViewData<ComparisonRow>, ClubError> {
        let matrix = self.engine()?.comparison(members)?;
        Ok(self.formatter.comparison(&matrix))
    }

    pub fn monthly_trend(&self) -> Result<ViewData<TrendPoint>, ClubError> {
        let points = self.engine()?.monthly_trend();
        Ok(self.formatter.trend(&points))
    }

    pub fn criterion_trend(
        &self,
        criterion_id: &CriterionId,
    ) -> Result<ViewData<TrendPoint>, ClubError> {
        let points = self.engine()?.criterion_trend(criterion_id)?;
        Ok(self.formatter.trend(&points))
    }

    pub fn criterion_averages(&self) -> Result<ViewData<CriterionBar>, ClubError> {
        let means = self.engine()?.criterion_averages();
        Ok(self.formatter.criterion_bars(&means))
    }

    pub fn member_activity(&self) -> Result<ViewData<MemberActivityBar>, ClubError> {
        let activity = self.engine()?.member_activity();
        Ok(self.formatter.member_activity(&activity))
    }

    pub fn feed(&self) -> Result<ViewData<FeedItem>, ClubError> {
        let entries = self.engine()?.feed();
        Ok(self.formatter.feed(&entries))
    }

    pub fn issue_invite(&self, restaurant_id: &RestaurantId) -> Result<IssuedInvite, ClubError> {
        Ok(self.invites.issue(restaurant_id)?)
    }

    pub fn validate_invite(&self, token: &InviteCode) -> Result<InviteValidation, ClubError> {
        Ok(self.invites.validate(token)?)
    }

    pub fn redeem_invite(
        &self,
        token: &InviteCode,
        submission: GuestSubmission,
    ) -> Result<GuestRating, ClubError> {
        Ok(self.invites.redeem(token, submission)?)
    }

    pub fn audit_invites(&self) -> Result<Vec<InviteInconsistency>, ClubError> {
        Ok(self.invites.audit()?)
    }

    pub fn submit_member_rating(
        &self,
        restaurant_id: &RestaurantId,
        submission: MemberSubmission,
    ) -> Result<SubmitOutcome, ClubError> {
        Ok(self.ratings.submit_member(restaurant_id, submission)?)
    }

    pub fn visibility(&self) -> Result<Visibility, ClubError> {
        Ok(self.gate.visibility()?)
    }

    pub fn set_visibility(&self, visible: bool) -> Result<Visibility, ClubError> {
        Ok(self.gate.set(visible)?)
    }

    pub fn toggle_visibility(&self) -> Result<Visibility, ClubError> {
        Ok(self.gate.toggle()?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClubError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error(transparent)]
    Rating(#[from] RatingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
