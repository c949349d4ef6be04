use crate::infra::load_store;
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use supper_club::analytics::format::{
    CriterionBar, LeaderboardRow, MemberActivityBar, RestaurantCard, TrendPoint, ViewData,
};
use supper_club::analytics::AnalyticsError;
use supper_club::config::AppConfig;
use supper_club::error::AppError;
use supper_club::invites::InviteInconsistency;
use supper_club::scoring::DisplayPrecision;
use supper_club::store::InMemoryRecordStore;
use supper_club::{ClubError, ClubService, ClubSettings};

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Snapshot JSON with restaurants, criteria, users, ratings and invites
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Optional ratings CSV export appended to the snapshot's ratings
    #[arg(long)]
    pub(crate) ratings_csv: Option<PathBuf>,
    /// Include the leaderboard (only printed while it is public)
    #[arg(long)]
    pub(crate) leaderboard: bool,
    /// Show restaurant averages as whole numbers, overriding APP_RESTAURANT_AVERAGE_PRECISION
    #[arg(long)]
    pub(crate) whole_averages: bool,
    /// Emit the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClubReport {
    pub(crate) restaurants: ViewData<RestaurantCard>,
    pub(crate) member_activity: ViewData<MemberActivityBar>,
    pub(crate) criterion_averages: ViewData<CriterionBar>,
    pub(crate) monthly_trend: ViewData<TrendPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) leaderboard: Option<LeaderboardSection>,
    pub(crate) invite_findings: Vec<InviteInconsistency>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "visibility", content = "rows", rename_all = "snake_case")]
pub(crate) enum LeaderboardSection {
    Public(ViewData<LeaderboardRow>),
    Private,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        snapshot,
        ratings_csv,
        leaderboard,
        whole_averages,
        json,
    } = args;

    let config = AppConfig::load()?;
    let mut settings = ClubSettings::from_config(&config.club);
    if whole_averages {
        settings.precision.restaurant_average = DisplayPrecision::Whole;
    }

    let store = load_store(Some(&snapshot), ratings_csv.as_deref())?;
    let report = build_report(store, settings, leaderboard)?;

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Report unavailable as JSON: {err}"),
        }
    } else {
        render_report(&report);
    }
    Ok(())
}

pub(crate) fn build_report(
    store: InMemoryRecordStore,
    settings: ClubSettings,
    include_leaderboard: bool,
) -> Result<ClubReport, AppError> {
    let service = ClubService::new(Arc::new(store), settings);

    let leaderboard = if include_leaderboard {
        match service.leaderboard() {
            Ok(rows) => Some(LeaderboardSection::Public(rows)),
            Err(ClubError::Analytics(AnalyticsError::GateClosed)) => {
                Some(LeaderboardSection::Private)
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        None
    };

    Ok(ClubReport {
        restaurants: service.restaurant_cards()?,
        member_activity: service.member_activity()?,
        criterion_averages: service.criterion_averages()?,
        monthly_trend: service.monthly_trend()?,
        leaderboard,
        invite_findings: service.audit_invites()?,
    })
}

fn score(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.1}"),
        None => "no data".to_string(),
    }
}

fn render_report(report: &ClubReport) {
    println!("Supper club report ({})", Utc::now().format("%Y-%m-%d"));

    println!("\nRestaurants");
    if report.restaurants.is_empty() {
        println!("- no restaurants yet");
    }
    for card in report.restaurants.rows() {
        println!(
            "- {} ({}) | average {} | {} ratings",
            card.name.as_deref().unwrap_or("Unknown restaurant"),
            card.visited_on
                .map(|date| date.to_string())
                .unwrap_or_else(|| "date unknown".to_string()),
            score(card.average),
            card.ratings.rows().len()
        );
        for line in card.ratings.rows() {
            let guest = if line.guest { " (guest)" } else { "" };
            println!("    - {}{}: {}", line.name, guest, score(line.composite));
        }
    }

    println!("\nMember activity");
    if report.member_activity.is_empty() {
        println!("- no member ratings yet");
    }
    for bar in report.member_activity.rows() {
        println!(
            "- {}: {} ratings | average {}",
            bar.name,
            bar.ratings,
            score(bar.average)
        );
    }

    println!("\nCriterion averages");
    if report.criterion_averages.is_empty() {
        println!("- no scores yet");
    }
    for bar in report.criterion_averages.rows() {
        println!("- {}: {:.1} ({} scores)", bar.label, bar.average, bar.samples);
    }

    println!("\nMonthly trend");
    if report.monthly_trend.is_empty() {
        println!("- no data");
    }
    for point in report.monthly_trend.rows() {
        println!("- {}: {:.1}", point.month, point.average);
    }

    match &report.leaderboard {
        Some(LeaderboardSection::Public(rows)) => {
            println!("\nLeaderboard");
            if rows.is_empty() {
                println!("- no rated restaurants yet");
            }
            for row in rows.rows() {
                println!(
                    "{}. {} | {:.1} | {} ratings",
                    row.rank, row.name, row.average, row.ratings
                );
            }
        }
        Some(LeaderboardSection::Private) => {
            println!("\nLeaderboard is private; enable visibility to publish it");
        }
        None => {}
    }

    if !report.invite_findings.is_empty() {
        println!("\nInvite inconsistencies");
        for finding in &report.invite_findings {
            println!("- {}: {:?}", finding.token, finding.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use supper_club::analytics::AnalyticsOptions;
    use supper_club::invites::InviteError;
    use supper_club::store::{SnapshotFile, StoreError};

    fn snapshot(show_leaderboard: bool) -> InMemoryRecordStore {
        let json = format!(
            r#"{{
                "restaurants": [
                    {{"id": "A", "name": "Alba", "visited_on": "2024-01-12"}},
                    {{"id": "B", "name": "Brasserie", "visited_on": "2024-02-02"}}
                ],
                "criteria": [
                    {{"id": "food", "label": "Food"}},
                    {{"id": "service", "label": "Service"}}
                ],
                "users": [{{"id": "u1", "name": "Mara", "role": "user"}}],
                "ratings": [
                    {{"kind": "member", "id": "r1", "restaurant_id": "A", "author": "u1",
                      "scores": {{"food": 8, "service": 6}}, "created_at": "2024-01-12T21:00:00Z"}},
                    {{"kind": "member", "id": "r2", "restaurant_id": "B", "author": "u1",
                      "scores": {{"food": 10}}, "created_at": "2024-02-01T00:30:00Z"}}
                ],
                "show_leaderboard": {show_leaderboard}
            }}"#
        );
        SnapshotFile::from_reader(json.as_bytes())
            .expect("snapshot parses")
            .into_store()
            .expect("store seeds")
    }

    #[test]
    fn report_includes_open_leaderboard() {
        let report =
            build_report(snapshot(true), ClubSettings::default(), true).expect("report builds");
        let Some(LeaderboardSection::Public(rows)) = report.leaderboard else {
            panic!("expected a public leaderboard");
        };
        let names: Vec<&str> = rows.rows().iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["Brasserie", "Alba"]);
        assert_eq!(report.restaurants.rows().len(), 2);
        assert_eq!(report.monthly_trend.rows().len(), 2);
    }

    #[test]
    fn closed_leaderboard_is_marked_private() {
        let report =
            build_report(snapshot(false), ClubSettings::default(), true).expect("report builds");
        assert!(matches!(
            report.leaderboard,
            Some(LeaderboardSection::Private)
        ));
    }

    fn months(report: &ClubReport) -> Vec<&str> {
        report
            .monthly_trend
            .rows()
            .iter()
            .map(|point| point.month.as_str())
            .collect()
    }

    #[test]
    fn month_buckets_follow_the_configured_offset() {
        let utc =
            build_report(snapshot(true), ClubSettings::default(), false).expect("report builds");
        assert_eq!(months(&utc), ["2024-01", "2024-02"]);

        let western = ClubSettings {
            analytics: AnalyticsOptions {
                display_offset: FixedOffset::west_opt(3600).expect("valid offset"),
            },
            ..ClubSettings::default()
        };
        let shifted = build_report(snapshot(true), western, false).expect("report builds");
        assert_eq!(months(&shifted), ["2024-01"]);
    }

    #[test]
    fn club_errors_keep_their_kind() {
        let invite = ClubError::Invite(InviteError::NotFound(
            supper_club::domain::InviteCode::new("gone"),
        ));
        assert!(matches!(AppError::from(invite), AppError::Club(ClubError::Invite(_))));

        let store = ClubError::Store(StoreError::Unavailable("offline".to_string()));
        assert!(matches!(AppError::from(store), AppError::Store(StoreError::Unavailable(_))));
    }
}
