use std::time::Duration as StdDuration;

use gitboard_app_lib::db::repositories::settings_repository::SettingsRepository;
use gitboard_app_lib::db::DbPool;
use gitboard_app_lib::models::dashboard::{DashboardQuery, LeaderboardQuery};
use gitboard_app_lib::models::score::{RankMedal, ScoreBand, SortKey, TimeRange};
use gitboard_app_lib::services::dashboard_service::DashboardService;
use gitboard_app_lib::services::metrics_api::MetricsApiService;
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;
use tempfile::TempDir;

fn service_for(server: &MockServer) -> (DashboardService, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("gitboard.sqlite")).expect("db pool");
    pool.with_connection(|conn| {
        SettingsRepository::upsert(conn, "gitlab_api_url", &server.base_url())?;
        // Keep failures fast and deterministic in tests.
        SettingsRepository::upsert(conn, "max_retries", "0")
    })
    .expect("seed settings");

    let api = MetricsApiService::new(pool).expect("metrics api");
    (DashboardService::new(api), dir)
}

fn leaderboard_body() -> serde_json::Value {
    json!([
        {
            "userId": "u1",
            "username": "zhang.wei",
            "commits": 42,
            "linesAdded": 1800,
            "bugsResolved": 9,
            "codeQualityScore": 88.0,
            "bugEfficiencyScore": 81.0,
            "overallScore": 92.0,
            "activityScore": 76.0
        },
        {
            "userId": "u2",
            "username": "li.na",
            "commits": 31,
            "linesAdded": 1200,
            "bugsResolved": 6,
            "codeQualityScore": 72.0,
            "bugEfficiencyScore": 64.0,
            "overallScore": 81.0,
            "activityScore": 69.0
        }
    ])
}

fn overview_body() -> serde_json::Value {
    json!({
        "teamSize": 2,
        "totalCommits": 73,
        "totalLinesAdded": 3000,
        "totalBugsResolved": 15,
        "averageQualityScore": 80.0,
        "projectHealthScore": 84.5,
        "avgOverallScore": 86.5
    })
}

fn timeline_body() -> serde_json::Value {
    json!([
        { "date": "2026-07-01", "commits": 5, "activeUsers": 2 },
        { "date": "2026-07-02", "commits": 9, "activeUsers": 2 },
        { "date": "2026-07-03", "commits": 3, "activeUsers": 1 }
    ])
}

async fn mock_overview<'a>(server: &'a MockServer, days: &str) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/overview")
                .query_param("projectId", "1")
                .query_param("days", days.to_string());
            then.status(200)
                .header("content-type", "application/json")
                .json_body(overview_body());
        })
        .await
}

async fn mock_timeline<'a>(server: &'a MockServer, days: &str) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/timeline")
                .query_param("projectId", "1")
                .query_param("days", days.to_string());
            then.status(200)
                .header("content-type", "application/json")
                .json_body(timeline_body());
        })
        .await
}

async fn mock_leaderboard<'a>(server: &'a MockServer, days: &str, sort_by: &str) -> Mock<'a> {
    let sort = sort_by.to_string();
    server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/dashboard/leaderboard")
                .query_param("projectId", "1")
                .query_param("days", days.to_string())
                .query_param("sortBy", sort);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(leaderboard_body());
        })
        .await
}

#[tokio::test]
async fn dashboard_page_renders_ranks_medals_and_bands() {
    let server = MockServer::start_async().await;
    let overview = mock_overview(&server, "30").await;
    let timeline = mock_timeline(&server, "30").await;
    let leaderboard = mock_leaderboard(&server, "30", "overall").await;

    let (service, _guard) = service_for(&server);
    let page = service
        .fetch_dashboard(DashboardQuery {
            project_id: "1".to_string(),
            days: TimeRange::ThirtyDays,
        })
        .await
        .expect("dashboard page");

    overview.assert_async().await;
    timeline.assert_async().await;
    leaderboard.assert_async().await;

    assert_eq!(page.overview.team_size, 2);
    assert_eq!(page.timeline.dates.len(), 3);
    assert_eq!(page.timeline.commits, vec![5, 9, 3]);
    assert_eq!(page.timeline.active_users, vec![2, 2, 1]);

    assert_eq!(page.leaderboard.len(), 2);
    let first = &page.leaderboard[0];
    let second = &page.leaderboard[1];
    assert_eq!(first.rank, 1);
    assert_eq!(first.user_id, "u1");
    assert_eq!(first.medal, RankMedal::Gold);
    assert_eq!(first.overall_band.band, ScoreBand::Excellent);
    assert_eq!(second.rank, 2);
    assert_eq!(second.user_id, "u2");
    assert_eq!(second.medal, RankMedal::Silver);
    assert_eq!(second.overall_band.band, ScoreBand::Good);
}

#[tokio::test]
async fn ninety_day_window_clamps_the_timeline_to_thirty_days() {
    let server = MockServer::start_async().await;
    let overview = mock_overview(&server, "90").await;
    let timeline = mock_timeline(&server, "30").await;
    let leaderboard = mock_leaderboard(&server, "90", "overall").await;

    let (service, _guard) = service_for(&server);
    service
        .fetch_dashboard(DashboardQuery {
            project_id: "1".to_string(),
            days: TimeRange::NinetyDays,
        })
        .await
        .expect("dashboard page");

    overview.assert_async().await;
    timeline.assert_async().await;
    leaderboard.assert_async().await;
}

#[tokio::test]
async fn team_page_shapes_totals_and_quality_pie() {
    let server = MockServer::start_async().await;
    let leaderboard = mock_leaderboard(&server, "30", "overall").await;
    let distribution = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/quality-distribution")
                .query_param("projectId", "1")
                .query_param("days", "30");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "totalDevelopers": 2,
                    "distribution": { "excellent": 0, "good": 1, "average": 1, "poor": 0 }
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let page = service
        .fetch_team(LeaderboardQuery {
            project_id: "1".to_string(),
            days: TimeRange::ThirtyDays,
            sort_by: SortKey::Overall,
        })
        .await
        .expect("team page");

    leaderboard.assert_async().await;
    distribution.assert_async().await;

    assert_eq!(page.totals.members, 2);
    assert_eq!(page.totals.total_commits, 73);
    assert_eq!(page.totals.total_lines_added, 3000);
    assert_eq!(page.totals.total_bugs_resolved, 15);
    assert_eq!(page.total_developers, 2);

    assert_eq!(page.quality_pie.len(), 4);
    assert_eq!(page.quality_pie[0].name, "优秀 (90-100分)");
    assert_eq!(page.quality_pie[1].value, 1);
    assert_eq!(page.quality_pie[2].value, 1);

    let bucket_sum: i64 = page.quality_pie.iter().map(|slice| slice.value).sum();
    assert_eq!(bucket_sum, page.total_developers);
}

#[tokio::test]
async fn bug_page_computes_the_unresolved_slice() {
    let server = MockServer::start_async().await;
    let stats = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/bug-stats")
                .query_param("projectId", "1")
                .query_param("days", "30");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "totalCreated": 100,
                    "totalResolved": 80,
                    "totalReopened": 5,
                    "avgResolutionTime": 12.5,
                    "resolutionRate": 80.0,
                    "reopenRate": 6.25
                }));
        })
        .await;
    let leaderboard = mock_leaderboard(&server, "30", "bugresolution").await;

    let (service, _guard) = service_for(&server);
    let page = service
        .fetch_bugs(DashboardQuery {
            project_id: "1".to_string(),
            days: TimeRange::ThirtyDays,
        })
        .await
        .expect("bug page");

    stats.assert_async().await;
    leaderboard.assert_async().await;

    assert_eq!(page.stats.total_created, 100);
    assert_eq!(page.status_pie[0].name, "已解决");
    assert_eq!(page.status_pie[0].value, 80);
    assert_eq!(page.status_pie[1].name, "未解决");
    assert_eq!(page.status_pie[1].value, 20);
    assert_eq!(page.status_pie[2].name, "重新打开");
    assert_eq!(page.status_pie[2].value, 5);

    assert_eq!(page.efficiency_chart.usernames.len(), 2);
    assert_eq!(page.efficiency_chart.bugs_resolved, vec![9, 6]);
}

#[tokio::test]
async fn quality_page_averages_scores_and_colors_bars() {
    let server = MockServer::start_async().await;
    let leaderboard = mock_leaderboard(&server, "7", "codequality").await;
    let distribution = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/quality-distribution")
                .query_param("projectId", "1")
                .query_param("days", "7");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "totalDevelopers": 2,
                    "distribution": { "excellent": 1, "good": 0, "average": 1, "poor": 0 }
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let page = service
        .fetch_quality(DashboardQuery {
            project_id: "1".to_string(),
            days: TimeRange::SevenDays,
        })
        .await
        .expect("quality page");

    leaderboard.assert_async().await;
    distribution.assert_async().await;

    assert!((page.average_quality_score - 80.0).abs() < f64::EPSILON);
    assert_eq!(page.average_quality_band.band, ScoreBand::Good);
    assert_eq!(page.excellent_count, 1);
    assert_eq!(page.poor_count, 0);
    assert_eq!(page.ranking_bars.len(), 2);
    assert_eq!(page.ranking_bars[0].color, "#1890ff");
    assert_eq!(page.ranking_bars[1].color, "#1890ff");
}

#[tokio::test]
async fn window_change_issues_one_fresh_fetch_per_panel() {
    let server = MockServer::start_async().await;
    let overview_30 = mock_overview(&server, "30").await;
    let timeline_30 = mock_timeline(&server, "30").await;
    let leaderboard_30 = mock_leaderboard(&server, "30", "overall").await;
    let overview_7 = mock_overview(&server, "7").await;
    let timeline_7 = mock_timeline(&server, "7").await;
    let leaderboard_7 = mock_leaderboard(&server, "7", "overall").await;

    let (service, _guard) = service_for(&server);

    service
        .fetch_dashboard(DashboardQuery {
            project_id: "1".to_string(),
            days: TimeRange::ThirtyDays,
        })
        .await
        .expect("30 day window");

    service
        .fetch_dashboard(DashboardQuery {
            project_id: "1".to_string(),
            days: TimeRange::SevenDays,
        })
        .await
        .expect("7 day window");

    // Exactly one request per panel per window, nothing reused.
    assert_eq!(overview_30.hits_async().await, 1);
    assert_eq!(timeline_30.hits_async().await, 1);
    assert_eq!(leaderboard_30.hits_async().await, 1);
    assert_eq!(overview_7.hits_async().await, 1);
    assert_eq!(timeline_7.hits_async().await, 1);
    assert_eq!(leaderboard_7.hits_async().await, 1);
}

#[tokio::test]
async fn slow_stale_response_is_superseded_by_a_newer_request() {
    let server = MockServer::start_async().await;

    // The 30-day window answers slowly, the 7-day one immediately.
    let _slow_stats = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/bug-stats")
                .query_param("days", "30");
            then.status(200)
                .delay(StdDuration::from_millis(300))
                .header("content-type", "application/json")
                .json_body(json!({
                    "totalCreated": 1, "totalResolved": 1, "totalReopened": 0,
                    "avgResolutionTime": 0.0, "resolutionRate": 100.0, "reopenRate": 0.0
                }));
        })
        .await;
    let _slow_board = mock_leaderboard(&server, "30", "bugresolution").await;
    let _fast_stats = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/bug-stats")
                .query_param("days", "7");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "totalCreated": 10, "totalResolved": 4, "totalReopened": 1,
                    "avgResolutionTime": 3.0, "resolutionRate": 40.0, "reopenRate": 10.0
                }));
        })
        .await;
    let _fast_board = mock_leaderboard(&server, "7", "bugresolution").await;

    let (service, _guard) = service_for(&server);

    let stale = service.fetch_bugs(DashboardQuery {
        project_id: "1".to_string(),
        days: TimeRange::ThirtyDays,
    });
    let fresh = service.fetch_bugs(DashboardQuery {
        project_id: "1".to_string(),
        days: TimeRange::SevenDays,
    });

    // The stale future is polled first, so it holds the older ticket.
    let (stale_result, fresh_result) = futures::join!(stale, fresh);

    let error = stale_result.expect_err("stale window must be discarded");
    assert!(matches!(
        error,
        gitboard_app_lib::error::AppError::Superseded
    ));

    let page = fresh_result.expect("fresh window renders");
    assert_eq!(page.stats.total_created, 10);
    assert_eq!(page.status_pie[1].value, 6);
}
