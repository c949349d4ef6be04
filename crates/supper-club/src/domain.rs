use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for restaurants in the club's catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RestaurantId(pub String);

/// Identifier wrapper for registered members.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Immutable criterion key; labels may change, this never does.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CriterionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RatingId(pub String);

/// Opaque invite token handed to a guest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InviteCode(pub String);

macro_rules! impl_id {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

impl_id!(RestaurantId, UserId, CriterionId, RatingId, InviteCode);

impl RatingId {
    /// Guest ratings are keyed by the invite that authorized them, so one
    /// token can never back two stored ratings.
    pub fn for_invite(code: &InviteCode) -> Self {
        Self(format!("guest-{}", code.0))
    }
}

/// Per-criterion raw scores of a single rating, nominally within `0..=10`.
pub type Scores = BTreeMap<CriterionId, f64>;

/// Named scoring dimension shared across all restaurants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub visited_on: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Pending,
    User,
    Admin,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::User => "Member",
            Self::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_handle: Option<String>,
    pub role: UserRole,
}

/// Rating written by a registered member. At most one per (member, restaurant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRating {
    pub id: RatingId,
    pub restaurant_id: RestaurantId,
    pub author: UserId,
    pub scores: Scores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Rating written through an invite; the author is denormalized at redemption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRating {
    pub id: RatingId,
    pub restaurant_id: RestaurantId,
    pub invite: InviteCode,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_handle: Option<String>,
    pub scores: Scores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingRecord {
    Member(MemberRating),
    Guest(GuestRating),
}

impl RatingRecord {
    pub fn id(&self) -> &RatingId {
        match self {
            Self::Member(rating) => &rating.id,
            Self::Guest(rating) => &rating.id,
        }
    }

    pub fn restaurant_id(&self) -> &RestaurantId {
        match self {
            Self::Member(rating) => &rating.restaurant_id,
            Self::Guest(rating) => &rating.restaurant_id,
        }
    }

    pub fn scores(&self) -> &Scores {
        match self {
            Self::Member(rating) => &rating.scores,
            Self::Guest(rating) => &rating.scores,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Self::Member(rating) => rating.comment.as_deref(),
            Self::Guest(rating) => rating.comment.as_deref(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Member(rating) => rating.created_at,
            Self::Guest(rating) => rating.created_at,
        }
    }

    /// Author of a member rating; guests have no persistent identity.
    pub fn member(&self) -> Option<&UserId> {
        match self {
            Self::Member(rating) => Some(&rating.author),
            Self::Guest(_) => None,
        }
    }

    pub fn invite(&self) -> Option<&InviteCode> {
        match self {
            Self::Member(_) => None,
            Self::Guest(rating) => Some(&rating.invite),
        }
    }

    /// Display attribution shared by both variants. Members are resolved
    /// through `lookup`; unknown members and blank guest names fall back to
    /// placeholders instead of failing.
    pub fn attribution<'a, F>(&self, lookup: F) -> Attribution
    where
        F: FnOnce(&UserId) -> Option<&'a User>,
    {
        match self {
            Self::Member(rating) => match lookup(&rating.author) {
                Some(user) => Attribution {
                    name: user.name.clone(),
                    handle: non_blank(user.instagram_handle.as_deref()),
                    kind: AuthorKind::Member,
                },
                None => Attribution {
                    name: UNKNOWN_MEMBER.to_string(),
                    handle: None,
                    kind: AuthorKind::Member,
                },
            },
            Self::Guest(rating) => Attribution {
                name: non_blank(Some(&rating.author_name))
                    .unwrap_or_else(|| GUEST_FALLBACK.to_string()),
                handle: non_blank(rating.author_handle.as_deref()),
                kind: AuthorKind::Guest,
            },
        }
    }
}

pub(crate) const UNKNOWN_MEMBER: &str = "Unknown";
pub(crate) const GUEST_FALLBACK: &str = "Guest";

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorKind {
    Member,
    Guest,
}

/// Who a rating is shown as belonging to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribution {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub kind: AuthorKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn guest(name: &str, handle: Option<&str>) -> RatingRecord {
        RatingRecord::Guest(GuestRating {
            id: RatingId::for_invite(&InviteCode::new("abc123")),
            restaurant_id: RestaurantId::new("r1"),
            invite: InviteCode::new("abc123"),
            author_name: name.to_string(),
            author_handle: handle.map(str::to_string),
            scores: Scores::from([(CriterionId::new("food"), 8.0)]),
            comment: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap(),
        })
    }

    #[test]
    fn guest_attribution_uses_denormalized_fields() {
        let record = guest("Mara", Some("@mara.eats"));
        let attribution = record.attribution(|_| None);
        assert_eq!(attribution.name, "Mara");
        assert_eq!(attribution.handle.as_deref(), Some("@mara.eats"));
        assert_eq!(attribution.kind, AuthorKind::Guest);
    }

    #[test]
    fn blank_guest_name_falls_back_to_placeholder() {
        let record = guest("   ", Some(""));
        let attribution = record.attribution(|_| None);
        assert_eq!(attribution.name, "Guest");
        assert!(attribution.handle.is_none());
    }

    #[test]
    fn member_attribution_falls_back_for_unknown_users() {
        let record = RatingRecord::Member(MemberRating {
            id: RatingId::new("m1"),
            restaurant_id: RestaurantId::new("r1"),
            author: UserId::new("ghost"),
            scores: Scores::from([(CriterionId::new("food"), 6.0)]),
            comment: Some("solid".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap(),
        });

        let attribution = record.attribution(|_| None);
        assert_eq!(attribution.name, "Unknown");
        assert_eq!(record.member(), Some(&UserId::new("ghost")));
        assert!(record.invite().is_none());
    }

    #[test]
    fn rating_records_round_trip_with_kind_tag() {
        let record = guest("Mara", None);
        let json = serde_json::to_value(&record).expect("serializes");
        assert_eq!(json["kind"], "guest");
        let parsed: RatingRecord = serde_json::from_value(json).expect("parses");
        assert_eq!(parsed, record);
    }
}
