use chrono::Utc;

use crate::error::AppResult;
use crate::models::charts::{DeveloperPageView, PieSlice, TrendSeries};
use crate::models::dashboard::{DashboardQuery, LeaderboardQuery};
use crate::models::developer::{DeveloperDetail, DeveloperOption};
use crate::models::score::{ScoreBandTag, SortKey, TimeRange};
use crate::services::metrics_api::{MetricsApiService, MetricsProvider};
use crate::services::sequencer::RequestSequencer;

pub struct DeveloperService {
    api: MetricsApiService,
    detail_requests: RequestSequencer,
}

impl DeveloperService {
    pub fn new(api: MetricsApiService) -> Self {
        Self {
            api,
            detail_requests: RequestSequencer::new(),
        }
    }

    /// Picker entries come from the default overall leaderboard window,
    /// mirroring how the detail page bootstraps its developer list.
    pub async fn developer_options(&self, project_id: &str) -> AppResult<Vec<DeveloperOption>> {
        let provider = self.api.provider()?;
        let query = LeaderboardQuery {
            project_id: project_id.to_string(),
            days: TimeRange::ThirtyDays,
            sort_by: SortKey::Overall,
        };
        let leaderboard = provider.leaderboard(&query).await?;

        Ok(leaderboard
            .into_iter()
            .map(|record| DeveloperOption {
                user_id: record.user_id,
                username: record.username,
            })
            .collect())
    }

    pub async fn fetch_developer(
        &self,
        user_id: &str,
        query: DashboardQuery,
    ) -> AppResult<DeveloperPageView> {
        let ticket = self.detail_requests.begin();
        let provider = self.api.provider()?;

        let detail = provider.developer_detail(user_id, &query).await?;

        if !ticket.is_current() {
            return Err(crate::error::AppError::superseded());
        }

        Ok(shape_developer_page(query, detail))
    }
}

fn shape_developer_page(query: DashboardQuery, detail: DeveloperDetail) -> DeveloperPageView {
    let commit_trend = TrendSeries {
        dates: detail.code_metrics.commits_by_date.keys().cloned().collect(),
        counts: detail.code_metrics.commits_by_date.values().copied().collect(),
    };

    let file_type_pie = detail
        .code_metrics
        .lines_by_file_type
        .iter()
        .map(|(file_type, lines)| PieSlice::uncolored(file_type.clone(), *lines))
        .collect();

    DeveloperPageView {
        overall_band: ScoreBandTag::for_score(detail.overall_score),
        activity_band: ScoreBandTag::for_score(detail.activity_score),
        collaboration_band: ScoreBandTag::for_score(detail.collaboration_score),
        quality_band: ScoreBandTag::for_score(detail.code_metrics.quality_score),
        efficiency_band: ScoreBandTag::for_score(detail.bug_metrics.efficiency_score),
        commit_trend,
        file_type_pie,
        generated_at: Utc::now().to_rfc3339(),
        detail,
        query,
    }
}
