use chrono::Utc;
use tracing::warn;

use crate::error::AppResult;
use crate::models::charts::{
    bug_status_pie, leaderboard_rows, quality_distribution_pie, BugEfficiencyChart,
    BugPageView, DashboardPageView, QualityBar, QualityPageView, TeamPageView, TeamTotals,
    TimelineChart,
};
use crate::models::dashboard::{
    DashboardQuery, DeveloperScoreRecord, LeaderboardQuery, QualityDistribution,
};
use crate::models::project::Project;
use crate::models::score::{ScoreBand, ScoreBandTag, SortKey};
use crate::services::metrics_api::{MetricsApiService, MetricsProvider};
use crate::services::sequencer::RequestSequencer;

const LEADERBOARD_PREVIEW_LIMIT: usize = 10;

/// Fetches and shapes the four analysis pages. Each page owns a request
/// sequencer so a stale response can never overwrite a newer window.
pub struct DashboardService {
    api: MetricsApiService,
    dashboard_requests: RequestSequencer,
    team_requests: RequestSequencer,
    quality_requests: RequestSequencer,
    bug_requests: RequestSequencer,
}

impl DashboardService {
    pub fn new(api: MetricsApiService) -> Self {
        Self {
            api,
            dashboard_requests: RequestSequencer::new(),
            team_requests: RequestSequencer::new(),
            quality_requests: RequestSequencer::new(),
            bug_requests: RequestSequencer::new(),
        }
    }

    pub async fn projects(&self) -> AppResult<Vec<Project>> {
        let provider = self.api.provider()?;
        provider.projects().await
    }

    pub async fn fetch_dashboard(&self, query: DashboardQuery) -> AppResult<DashboardPageView> {
        let ticket = self.dashboard_requests.begin();
        let provider = self.api.provider()?;

        let timeline_query = DashboardQuery {
            project_id: query.project_id.clone(),
            days: query.days.clamped_for_timeline(),
        };
        let leaderboard_query = LeaderboardQuery {
            project_id: query.project_id.clone(),
            days: query.days,
            sort_by: SortKey::Overall,
        };

        let (overview, timeline, leaderboard) = tokio::try_join!(
            provider.overview(&query),
            provider.timeline(&timeline_query),
            provider.leaderboard(&leaderboard_query),
        )?;

        if !ticket.is_current() {
            return Err(crate::error::AppError::superseded());
        }

        check_leaderboard_order(&leaderboard, SortKey::Overall);

        let top: Vec<DeveloperScoreRecord> = leaderboard
            .into_iter()
            .take(LEADERBOARD_PREVIEW_LIMIT)
            .collect();

        Ok(DashboardPageView {
            query,
            overview,
            timeline: TimelineChart::from_points(&timeline),
            leaderboard: leaderboard_rows(&top),
            generated_at: Utc::now().to_rfc3339(),
        })
    }

    pub async fn fetch_team(&self, query: LeaderboardQuery) -> AppResult<TeamPageView> {
        let ticket = self.team_requests.begin();
        let provider = self.api.provider()?;

        let distribution_query = DashboardQuery {
            project_id: query.project_id.clone(),
            days: query.days,
        };

        let (leaderboard, distribution) = tokio::try_join!(
            provider.leaderboard(&query),
            provider.quality_distribution(&distribution_query),
        )?;

        if !ticket.is_current() {
            return Err(crate::error::AppError::superseded());
        }

        check_leaderboard_order(&leaderboard, query.sort_by);
        check_distribution(&distribution);

        Ok(TeamPageView {
            totals: TeamTotals::from_records(&leaderboard),
            rows: leaderboard_rows(&leaderboard),
            quality_pie: quality_distribution_pie(&distribution),
            total_developers: distribution.total_developers,
            generated_at: Utc::now().to_rfc3339(),
            query,
        })
    }

    pub async fn fetch_quality(&self, query: DashboardQuery) -> AppResult<QualityPageView> {
        let ticket = self.quality_requests.begin();
        let provider = self.api.provider()?;

        let leaderboard_query = LeaderboardQuery {
            project_id: query.project_id.clone(),
            days: query.days,
            sort_by: SortKey::CodeQuality,
        };

        let (leaderboard, distribution) = tokio::try_join!(
            provider.leaderboard(&leaderboard_query),
            provider.quality_distribution(&query),
        )?;

        if !ticket.is_current() {
            return Err(crate::error::AppError::superseded());
        }

        check_leaderboard_order(&leaderboard, SortKey::CodeQuality);
        check_distribution(&distribution);

        let average_quality_score = if leaderboard.is_empty() {
            0.0
        } else {
            leaderboard
                .iter()
                .map(|record| record.code_quality_score)
                .sum::<f64>()
                / leaderboard.len() as f64
        };

        let ranking_bars = leaderboard
            .iter()
            .take(LEADERBOARD_PREVIEW_LIMIT)
            .map(|record| QualityBar {
                username: record.username.clone(),
                score: record.code_quality_score,
                color: ScoreBand::classify(record.code_quality_score)
                    .color()
                    .to_string(),
            })
            .collect();

        Ok(QualityPageView {
            average_quality_score,
            average_quality_band: ScoreBandTag::for_score(average_quality_score),
            excellent_count: distribution.distribution.excellent,
            poor_count: distribution.distribution.poor,
            total_developers: distribution.total_developers,
            ranking_bars,
            distribution_pie: quality_distribution_pie(&distribution),
            rows: leaderboard_rows(&leaderboard),
            generated_at: Utc::now().to_rfc3339(),
            query,
        })
    }

    pub async fn fetch_bugs(&self, query: DashboardQuery) -> AppResult<BugPageView> {
        let ticket = self.bug_requests.begin();
        let provider = self.api.provider()?;

        let leaderboard_query = LeaderboardQuery {
            project_id: query.project_id.clone(),
            days: query.days,
            sort_by: SortKey::BugResolution,
        };

        let (stats, leaderboard) = tokio::try_join!(
            provider.bug_stats(&query),
            provider.leaderboard(&leaderboard_query),
        )?;

        if !ticket.is_current() {
            return Err(crate::error::AppError::superseded());
        }

        check_leaderboard_order(&leaderboard, SortKey::BugResolution);

        let top: Vec<DeveloperScoreRecord> = leaderboard
            .iter()
            .take(LEADERBOARD_PREVIEW_LIMIT)
            .cloned()
            .collect();

        Ok(BugPageView {
            status_pie: bug_status_pie(&stats),
            efficiency_chart: BugEfficiencyChart::from_records(&top),
            rows: leaderboard_rows(&leaderboard),
            stats,
            generated_at: Utc::now().to_rfc3339(),
            query,
        })
    }
}

/// The backend owns the ordering contract; the composite sort key for
/// code contribution is not reproducible client-side, so it is skipped.
pub fn leaderboard_is_sorted(records: &[DeveloperScoreRecord], sort_by: SortKey) -> bool {
    match sort_by {
        SortKey::Overall => is_non_increasing(records, |r| r.overall_score),
        SortKey::CodeQuality => is_non_increasing(records, |r| r.code_quality_score),
        SortKey::BugResolution => is_non_increasing(records, |r| r.bugs_resolved as f64),
        SortKey::CodeContribution => true,
    }
}

fn is_non_increasing<F>(records: &[DeveloperScoreRecord], key: F) -> bool
where
    F: Fn(&DeveloperScoreRecord) -> f64,
{
    records.windows(2).all(|pair| key(&pair[0]) >= key(&pair[1]))
}

fn check_leaderboard_order(records: &[DeveloperScoreRecord], sort_by: SortKey) {
    if !leaderboard_is_sorted(records, sort_by) {
        warn!(
            target: "app::metrics",
            sort_by = sort_by.as_str(),
            entries = records.len(),
            "leaderboard response is not sorted by the requested key"
        );
    }
}

fn check_distribution(distribution: &QualityDistribution) {
    if !distribution.buckets_partition_total() {
        warn!(
            target: "app::metrics",
            total = distribution.total_developers,
            sum = distribution.distribution.sum(),
            "quality distribution buckets do not sum to the developer total"
        );
    }
}
