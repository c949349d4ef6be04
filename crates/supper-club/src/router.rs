use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::analytics::AnalyticsError;
use crate::domain::{CriterionId, InviteCode, RestaurantId, UserId};
use crate::invites::{GuestSubmission, InviteError, InviteValidation};
use crate::ratings::{MemberSubmission, RatingError, SubmitOutcome};
use crate::service::{ClubError, ClubService};
use crate::store::{RecordStore, StoreError};

/// Where a client should go when the leaderboard is private.
const GATE_REDIRECT: &str = "/";

/// Router builder exposing the club's read views, invite lifecycle and
/// admin settings.
pub fn club_router<S>(service: Arc<ClubService<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/leaderboard", get(leaderboard_handler::<S>))
        .route("/api/v1/restaurants", get(restaurants_handler::<S>))
        .route(
            "/api/v1/restaurants/:restaurant_id",
            get(restaurant_handler::<S>),
        )
        .route(
            "/api/v1/restaurants/:restaurant_id/invites",
            post(issue_invite_handler::<S>),
        )
        .route(
            "/api/v1/restaurants/:restaurant_id/ratings",
            post(submit_rating_handler::<S>),
        )
        .route("/api/v1/members/activity", get(member_activity_handler::<S>))
        .route(
            "/api/v1/members/:user_id/criteria",
            get(member_criteria_handler::<S>),
        )
        .route(
            "/api/v1/members/:user_id/rated",
            get(member_rated_handler::<S>),
        )
        .route("/api/v1/comparison", get(comparison_handler::<S>))
        .route("/api/v1/trends/monthly", get(monthly_trend_handler::<S>))
        .route(
            "/api/v1/trends/criteria/:criterion_id",
            get(criterion_trend_handler::<S>),
        )
        .route(
            "/api/v1/criteria/averages",
            get(criterion_averages_handler::<S>),
        )
        .route("/api/v1/feed", get(feed_handler::<S>))
        .route("/api/v1/invites/audit", get(invite_audit_handler::<S>))
        .route("/api/v1/invites/:token", get(validate_invite_handler::<S>))
        .route(
            "/api/v1/invites/:token/redeem",
            post(redeem_invite_handler::<S>),
        )
        .route(
            "/api/v1/settings/visibility",
            get(visibility_handler::<S>).put(set_visibility_handler::<S>),
        )
        .route(
            "/api/v1/settings/visibility/toggle",
            post(toggle_visibility_handler::<S>),
        )
        .with_state(service)
}

type ClubState<S> = State<Arc<ClubService<S>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct ComparisonQuery {
    #[serde(default)]
    users: String,
}

impl ComparisonQuery {
    fn members(&self) -> Vec<UserId> {
        self.users
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(UserId::new)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VisibilityUpdate {
    show_leaderboard: bool,
}

fn ok<T: serde::Serialize>(result: Result<T, ClubError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn error_response(err: ClubError) -> Response {
    let status = match &err {
        ClubError::Analytics(AnalyticsError::GateClosed) => {
            let payload = json!({
                "error": err.to_string(),
                "redirect": GATE_REDIRECT,
            });
            return (StatusCode::FORBIDDEN, Json(payload)).into_response();
        }
        ClubError::Analytics(
            AnalyticsError::RestaurantNotFound(_)
            | AnalyticsError::MemberNotFound(_)
            | AnalyticsError::CriterionNotFound(_),
        ) => StatusCode::NOT_FOUND,
        ClubError::Analytics(AnalyticsError::InvalidInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ClubError::Invite(InviteError::NotFound(_) | InviteError::UnknownRestaurant(_)) => {
            StatusCode::NOT_FOUND
        }
        ClubError::Invite(InviteError::AlreadyUsed(_)) => StatusCode::CONFLICT,
        ClubError::Invite(InviteError::InvalidInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ClubError::Invite(InviteError::TokenCollision(_) | InviteError::Inconsistent { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ClubError::Invite(InviteError::Store(store)) => store_status(store),
        ClubError::Rating(RatingError::InvalidInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ClubError::Rating(RatingError::UnknownRestaurant(_)) => StatusCode::NOT_FOUND,
        ClubError::Rating(RatingError::Store(store)) | ClubError::Store(store) => {
            store_status(store)
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn leaderboard_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.leaderboard())
}

pub(crate) async fn restaurants_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.restaurant_cards())
}

pub(crate) async fn restaurant_handler<S>(
    State(service): ClubState<S>,
    Path(restaurant_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.restaurant_card(&RestaurantId(restaurant_id)))
}

pub(crate) async fn issue_invite_handler<S>(
    State(service): ClubState<S>,
    Path(restaurant_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    match service.issue_invite(&RestaurantId(restaurant_id)) {
        Ok(issued) => (StatusCode::CREATED, Json(issued)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_rating_handler<S>(
    State(service): ClubState<S>,
    Path(restaurant_id): Path<String>,
    Json(submission): Json<MemberSubmission>,
) -> Response
where
    S: RecordStore + 'static,
{
    match service.submit_member_rating(&RestaurantId(restaurant_id), submission) {
        Ok(outcome @ SubmitOutcome::Created(_)) => {
            (StatusCode::CREATED, Json(outcome)).into_response()
        }
        Ok(outcome @ SubmitOutcome::Updated(_)) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn member_activity_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.member_activity())
}

pub(crate) async fn member_criteria_handler<S>(
    State(service): ClubState<S>,
    Path(user_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.member_profile(&UserId(user_id)))
}

pub(crate) async fn member_rated_handler<S>(
    State(service): ClubState<S>,
    Path(user_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    let user_id = UserId(user_id);
    match service.rated_restaurants(&user_id) {
        Ok(restaurants) => {
            let payload = json!({
                "user_id": user_id,
                "restaurants": restaurants,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn comparison_handler<S>(
    State(service): ClubState<S>,
    Query(query): Query<ComparisonQuery>,
) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.comparison(&query.members()))
}

pub(crate) async fn monthly_trend_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.monthly_trend())
}

pub(crate) async fn criterion_trend_handler<S>(
    State(service): ClubState<S>,
    Path(criterion_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.criterion_trend(&CriterionId(criterion_id)))
}

pub(crate) async fn criterion_averages_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.criterion_averages())
}

pub(crate) async fn feed_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.feed())
}

pub(crate) async fn validate_invite_handler<S>(
    State(service): ClubState<S>,
    Path(token): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    match service.validate_invite(&InviteCode(token)) {
        Ok(validation) => {
            let status = match validation {
                InviteValidation::Valid(_) => StatusCode::OK,
                InviteValidation::NotFound => StatusCode::NOT_FOUND,
                InviteValidation::AlreadyUsed => StatusCode::CONFLICT,
            };
            (status, Json(validation)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn redeem_invite_handler<S>(
    State(service): ClubState<S>,
    Path(token): Path<String>,
    Json(submission): Json<GuestSubmission>,
) -> Response
where
    S: RecordStore + 'static,
{
    match service.redeem_invite(&InviteCode(token), submission) {
        Ok(rating) => (StatusCode::CREATED, Json(rating)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn invite_audit_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    ok(service.audit_invites())
}

fn visibility_response(result: Result<crate::gate::Visibility, ClubError>) -> Response {
    match result {
        Ok(visibility) => {
            let payload = json!({
                "visibility": visibility,
                "show_leaderboard": visibility.is_public(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn visibility_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    visibility_response(service.visibility())
}

pub(crate) async fn set_visibility_handler<S>(
    State(service): ClubState<S>,
    Json(update): Json<VisibilityUpdate>,
) -> Response
where
    S: RecordStore + 'static,
{
    visibility_response(service.set_visibility(update.show_leaderboard))
}

pub(crate) async fn toggle_visibility_handler<S>(State(service): ClubState<S>) -> Response
where
    S: RecordStore + 'static,
{
    visibility_response(service.toggle_visibility())
}
