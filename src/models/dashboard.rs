use serde::{Deserialize, Serialize};

use crate::models::score::{SortKey, TimeRange};

/// Parameters shared by every dashboard panel query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub project_id: String,
    #[serde(default)]
    pub days: TimeRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub project_id: String,
    #[serde(default)]
    pub days: TimeRange,
    #[serde(default)]
    pub sort_by: SortKey,
}

/// Aggregate snapshot for the dashboard header cards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub team_size: i64,
    pub total_commits: i64,
    pub total_lines_added: i64,
    pub total_bugs_resolved: i64,
    pub average_quality_score: f64,
    pub project_health_score: f64,
    pub avg_overall_score: f64,
}

/// One leaderboard entry per user per query window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperScoreRecord {
    pub user_id: String,
    pub username: String,
    pub commits: i64,
    pub lines_added: i64,
    pub bugs_resolved: i64,
    pub code_quality_score: f64,
    #[serde(default)]
    pub bug_efficiency_score: f64,
    pub overall_score: f64,
    pub activity_score: f64,
}

/// One point per day in the window, chronologically ordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub date: String,
    pub commits: i64,
    pub active_users: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugStats {
    pub total_created: i64,
    pub total_resolved: i64,
    pub total_reopened: i64,
    pub avg_resolution_time: f64,
    pub resolution_rate: f64,
    pub reopen_rate: f64,
}

impl BugStats {
    /// Count rendered as the 未解决 pie slice. Inconsistent backend data
    /// (resolved > created) saturates at zero instead of going negative.
    pub fn unresolved(&self) -> i64 {
        (self.total_created - self.total_resolved).max(0)
    }
}

/// Developer counts per score band; the buckets partition
/// `total_developers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityBuckets {
    pub excellent: i64,
    pub good: i64,
    pub average: i64,
    pub poor: i64,
}

impl QualityBuckets {
    pub fn sum(&self) -> i64 {
        self.excellent + self.good + self.average + self.poor
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityDistribution {
    pub total_developers: i64,
    pub distribution: QualityBuckets,
}

impl QualityDistribution {
    pub fn buckets_partition_total(&self) -> bool {
        self.distribution.sum() == self.total_developers
    }
}
