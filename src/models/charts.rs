//! Ready-to-render view models. Pages in the webview bind these directly
//! to chart and table components; all field projection and labeling
//! happens here so the frontend carries no shaping logic.

use serde::{Deserialize, Serialize};

use crate::models::dashboard::{
    BugStats, DashboardOverview, DashboardQuery, DeveloperScoreRecord, LeaderboardQuery,
    QualityDistribution, TimelinePoint,
};
use crate::models::developer::DeveloperDetail;
use crate::models::score::{RankMedal, ScoreBand, ScoreBandTag};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieSlice {
    pub name: String,
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl PieSlice {
    pub fn new(name: impl Into<String>, value: i64, color: &str) -> Self {
        Self {
            name: name.into(),
            value,
            color: Some(color.to_string()),
        }
    }

    pub fn uncolored(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            color: None,
        }
    }
}

/// Dual-axis activity trend: commits as a line, active users as bars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineChart {
    pub dates: Vec<String>,
    pub commits: Vec<i64>,
    pub active_users: Vec<i64>,
}

impl TimelineChart {
    pub fn from_points(points: &[TimelinePoint]) -> Self {
        Self {
            dates: points.iter().map(|point| point.date.clone()).collect(),
            commits: points.iter().map(|point| point.commits).collect(),
            active_users: points.iter().map(|point| point.active_users).collect(),
        }
    }
}

/// One leaderboard table row with every derived display attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: usize,
    pub medal: RankMedal,
    pub medal_color: String,
    pub user_id: String,
    pub username: String,
    pub commits: i64,
    pub lines_added: i64,
    pub bugs_resolved: i64,
    pub overall_score: f64,
    pub overall_band: ScoreBandTag,
    pub code_quality_score: f64,
    pub code_quality_band: ScoreBandTag,
    pub bug_efficiency_score: f64,
    pub activity_score: f64,
}

impl LeaderboardRow {
    /// `rank` is 1-based display position.
    pub fn from_record(rank: usize, record: &DeveloperScoreRecord) -> Self {
        let medal = RankMedal::for_rank(rank);
        Self {
            rank,
            medal,
            medal_color: medal.color().to_string(),
            user_id: record.user_id.clone(),
            username: record.username.clone(),
            commits: record.commits,
            lines_added: record.lines_added,
            bugs_resolved: record.bugs_resolved,
            overall_score: record.overall_score,
            overall_band: ScoreBandTag::for_score(record.overall_score),
            code_quality_score: record.code_quality_score,
            code_quality_band: ScoreBandTag::for_score(record.code_quality_score),
            bug_efficiency_score: record.bug_efficiency_score,
            activity_score: record.activity_score,
        }
    }
}

pub fn leaderboard_rows(records: &[DeveloperScoreRecord]) -> Vec<LeaderboardRow> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| LeaderboardRow::from_record(index + 1, record))
        .collect()
}

/// Four band slices for the quality-distribution pie.
pub fn quality_distribution_pie(distribution: &QualityDistribution) -> Vec<PieSlice> {
    let buckets = &distribution.distribution;
    vec![
        PieSlice::new(
            ScoreBand::Excellent.range_label(),
            buckets.excellent,
            ScoreBand::Excellent.color(),
        ),
        PieSlice::new(
            ScoreBand::Good.range_label(),
            buckets.good,
            ScoreBand::Good.color(),
        ),
        PieSlice::new(
            ScoreBand::Average.range_label(),
            buckets.average,
            ScoreBand::Average.color(),
        ),
        PieSlice::new(
            ScoreBand::Poor.range_label(),
            buckets.poor,
            ScoreBand::Poor.color(),
        ),
    ]
}

/// Bug status pie: resolved, unresolved (saturated), reopened.
pub fn bug_status_pie(stats: &BugStats) -> Vec<PieSlice> {
    vec![
        PieSlice::new("已解决", stats.total_resolved, "#52c41a"),
        PieSlice::new("未解决", stats.unresolved(), "#faad14"),
        PieSlice::new("重新打开", stats.total_reopened, "#ff4d4f"),
    ]
}

/// One bar of the code-quality ranking chart, colored per band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityBar {
    pub username: String,
    pub score: f64,
    pub color: String,
}

/// Bars + line for the bug-efficiency ranking chart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugEfficiencyChart {
    pub usernames: Vec<String>,
    pub bugs_resolved: Vec<i64>,
    pub efficiency_scores: Vec<f64>,
}

impl BugEfficiencyChart {
    pub fn from_records(records: &[DeveloperScoreRecord]) -> Self {
        Self {
            usernames: records.iter().map(|r| r.username.clone()).collect(),
            bugs_resolved: records.iter().map(|r| r.bugs_resolved).collect(),
            efficiency_scores: records.iter().map(|r| r.bug_efficiency_score).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPageView {
    pub query: DashboardQuery,
    pub overview: DashboardOverview,
    pub timeline: TimelineChart,
    pub leaderboard: Vec<LeaderboardRow>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTotals {
    pub members: usize,
    pub total_commits: i64,
    pub total_lines_added: i64,
    pub total_bugs_resolved: i64,
}

impl TeamTotals {
    pub fn from_records(records: &[DeveloperScoreRecord]) -> Self {
        Self {
            members: records.len(),
            total_commits: records.iter().map(|r| r.commits).sum(),
            total_lines_added: records.iter().map(|r| r.lines_added).sum(),
            total_bugs_resolved: records.iter().map(|r| r.bugs_resolved).sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPageView {
    pub query: LeaderboardQuery,
    pub totals: TeamTotals,
    pub rows: Vec<LeaderboardRow>,
    pub quality_pie: Vec<PieSlice>,
    pub total_developers: i64,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityPageView {
    pub query: DashboardQuery,
    pub average_quality_score: f64,
    pub average_quality_band: ScoreBandTag,
    pub excellent_count: i64,
    pub poor_count: i64,
    pub total_developers: i64,
    pub ranking_bars: Vec<QualityBar>,
    pub distribution_pie: Vec<PieSlice>,
    pub rows: Vec<LeaderboardRow>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugPageView {
    pub query: DashboardQuery,
    pub stats: BugStats,
    pub status_pie: Vec<PieSlice>,
    pub efficiency_chart: BugEfficiencyChart,
    pub rows: Vec<LeaderboardRow>,
    pub generated_at: String,
}

/// Ascending-date commit trend for the developer-detail page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub dates: Vec<String>,
    pub counts: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperPageView {
    pub query: DashboardQuery,
    pub detail: DeveloperDetail,
    pub overall_band: ScoreBandTag,
    pub activity_band: ScoreBandTag,
    pub collaboration_band: ScoreBandTag,
    pub quality_band: ScoreBandTag,
    pub efficiency_band: ScoreBandTag,
    pub commit_trend: TrendSeries,
    pub file_type_pie: Vec<PieSlice>,
    pub generated_at: String,
}
