use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{InviteCode, RatingRecord, RestaurantId};
use crate::store::InviteToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// Token flipped to used but no guest rating references it.
    UsedWithoutRating,
    /// Guest rating stored but the token flip never landed.
    RatingWithoutRedemption,
    /// Guest rating references a token the store does not know.
    RatingWithoutInvite,
    /// Guest rating and its token disagree on the restaurant.
    RestaurantMismatch {
        invite_restaurant: RestaurantId,
        rating_restaurant: RestaurantId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteInconsistency {
    pub token: InviteCode,
    pub kind: InconsistencyKind,
}

pub(super) fn find_inconsistencies(
    invites: &[InviteToken],
    ratings: &[RatingRecord],
) -> Vec<InviteInconsistency> {
    let guest_ratings: HashMap<&InviteCode, &RatingRecord> = ratings
        .iter()
        .filter_map(|record| record.invite().map(|code| (code, record)))
        .collect();
    let known: HashMap<&InviteCode, &InviteToken> =
        invites.iter().map(|invite| (&invite.token, invite)).collect();

    let mut findings = Vec::new();

    for invite in invites {
        match (invite.used, guest_ratings.get(&invite.token)) {
            (true, None) => findings.push(InviteInconsistency {
                token: invite.token.clone(),
                kind: InconsistencyKind::UsedWithoutRating,
            }),
            (false, Some(_)) => findings.push(InviteInconsistency {
                token: invite.token.clone(),
                kind: InconsistencyKind::RatingWithoutRedemption,
            }),
            (true, Some(record)) if record.restaurant_id() != &invite.restaurant_id => {
                findings.push(InviteInconsistency {
                    token: invite.token.clone(),
                    kind: InconsistencyKind::RestaurantMismatch {
                        invite_restaurant: invite.restaurant_id.clone(),
                        rating_restaurant: record.restaurant_id().clone(),
                    },
                })
            }
            _ => {}
        }
    }

    for record in ratings {
        if let Some(code) = record.invite() {
            if !known.contains_key(code) {
                findings.push(InviteInconsistency {
                    token: code.clone(),
                    kind: InconsistencyKind::RatingWithoutInvite,
                });
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CriterionId, GuestRating, RatingId, Scores};
    use chrono::{TimeZone, Utc};

    fn invite(code: &str, restaurant: &str, used: bool) -> InviteToken {
        InviteToken {
            token: InviteCode::new(code),
            restaurant_id: RestaurantId::new(restaurant),
            used,
            created_at: Utc.with_ymd_and_hms(2024, 1, 5, 18, 0, 0).unwrap(),
        }
    }

    fn rating(code: &str, restaurant: &str) -> RatingRecord {
        let invite = InviteCode::new(code);
        RatingRecord::Guest(GuestRating {
            id: RatingId::for_invite(&invite),
            restaurant_id: RestaurantId::new(restaurant),
            invite,
            author_name: "Guest".to_string(),
            author_handle: None,
            scores: Scores::from([(CriterionId::new("food"), 5.0)]),
            comment: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 5, 21, 0, 0).unwrap(),
        })
    }

    #[test]
    fn consistent_pairs_produce_no_findings() {
        let invites = vec![invite("a", "r1", true), invite("b", "r1", false)];
        let ratings = vec![rating("a", "r1")];
        assert!(find_inconsistencies(&invites, &ratings).is_empty());
    }

    #[test]
    fn reports_each_kind_of_drift() {
        let invites = vec![
            invite("used-no-rating", "r1", true),
            invite("stuck", "r1", false),
            invite("moved", "r1", true),
        ];
        let ratings = vec![
            rating("stuck", "r1"),
            rating("moved", "r2"),
            rating("orphan", "r1"),
        ];

        let kinds: Vec<(String, InconsistencyKind)> = find_inconsistencies(&invites, &ratings)
            .into_iter()
            .map(|finding| (finding.token.0, finding.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (
                    "used-no-rating".to_string(),
                    InconsistencyKind::UsedWithoutRating
                ),
                (
                    "stuck".to_string(),
                    InconsistencyKind::RatingWithoutRedemption
                ),
                (
                    "moved".to_string(),
                    InconsistencyKind::RestaurantMismatch {
                        invite_restaurant: RestaurantId::new("r1"),
                        rating_restaurant: RestaurantId::new("r2"),
                    }
                ),
                ("orphan".to_string(), InconsistencyKind::RatingWithoutInvite),
            ]
        );
    }
}
