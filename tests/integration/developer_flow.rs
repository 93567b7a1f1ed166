use gitboard_app_lib::db::repositories::settings_repository::SettingsRepository;
use gitboard_app_lib::db::DbPool;
use gitboard_app_lib::models::dashboard::DashboardQuery;
use gitboard_app_lib::models::score::{ScoreBand, TimeRange};
use gitboard_app_lib::services::developer_service::DeveloperService;
use gitboard_app_lib::services::metrics_api::MetricsApiService;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn service_for(server: &MockServer) -> (DeveloperService, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("gitboard.sqlite")).expect("db pool");
    pool.with_connection(|conn| {
        SettingsRepository::upsert(conn, "gitlab_api_url", &server.base_url())?;
        SettingsRepository::upsert(conn, "max_retries", "0")
    })
    .expect("seed settings");

    let api = MetricsApiService::new(pool).expect("metrics api");
    (DeveloperService::new(api), dir)
}

#[tokio::test]
async fn developer_page_shapes_trend_ranks_and_bands() {
    let server = MockServer::start_async().await;

    let detail = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/developer/u1")
                .query_param("projectId", "1")
                .query_param("days", "30");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "userId": "u1",
                    "username": "zhang.wei",
                    "email": "zhang.wei@example.com",
                    "reportTime": "2026-08-01T09:00:00Z",
                    "overallScore": 92.0,
                    "activityScore": 76.0,
                    "collaborationScore": 58.0,
                    "codeContributionRank": 1,
                    "codeQualityRank": 2,
                    "bugResolutionRank": 3,
                    "codeMetrics": {
                        "commitCount": 42,
                        "linesAdded": 1800,
                        "linesDeleted": 300,
                        "filesChanged": 57,
                        "qualityScore": 88.0,
                        "commitsByDate": {
                            "2026-07-02": 3,
                            "2026-07-01": 5
                        },
                        "linesByFileType": {
                            "java": 1500,
                            "sql": 300
                        }
                    },
                    "bugMetrics": {
                        "bugsCreated": 2,
                        "bugsResolved": 9,
                        "averageResolutionTime": 6.4,
                        "bugsReopened": 1,
                        "efficiencyScore": 81.0
                    }
                }));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let page = service
        .fetch_developer(
            "u1",
            DashboardQuery {
                project_id: "1".to_string(),
                days: TimeRange::ThirtyDays,
            },
        )
        .await
        .expect("developer page");

    detail.assert_async().await;

    assert_eq!(page.detail.username, "zhang.wei");
    assert_eq!(page.detail.code_contribution_rank, 1);
    assert_eq!(page.overall_band.band, ScoreBand::Excellent);
    assert_eq!(page.activity_band.band, ScoreBand::Good);
    assert_eq!(page.collaboration_band.band, ScoreBand::Average);
    assert_eq!(page.quality_band.band, ScoreBand::Good);
    assert_eq!(page.efficiency_band.band, ScoreBand::Good);

    // Trend is ascending by date regardless of backend key order.
    assert_eq!(page.commit_trend.dates, vec!["2026-07-01", "2026-07-02"]);
    assert_eq!(page.commit_trend.counts, vec![5, 3]);

    assert_eq!(page.file_type_pie.len(), 2);
    assert_eq!(page.file_type_pie[0].name, "java");
    assert_eq!(page.file_type_pie[0].value, 1500);
    assert!(page.file_type_pie[0].color.is_none());
}

#[tokio::test]
async fn developer_options_come_from_the_overall_leaderboard() {
    let server = MockServer::start_async().await;

    let leaderboard = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/dashboard/leaderboard")
                .query_param("projectId", "1")
                .query_param("days", "30")
                .query_param("sortBy", "overall");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
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
                ]));
        })
        .await;

    let (service, _guard) = service_for(&server);
    let options = service.developer_options("1").await.expect("options");

    leaderboard.assert_async().await;
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].user_id, "u1");
    assert_eq!(options[0].username, "zhang.wei");
    assert_eq!(options[1].user_id, "u2");
}
