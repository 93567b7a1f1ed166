use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-user code production within the query window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMetrics {
    pub commit_count: i64,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub files_changed: i64,
    pub quality_score: f64,
    /// Commit counts keyed by ISO date; BTreeMap keeps the trend series
    /// in ascending date order without a separate sort.
    #[serde(default)]
    pub commits_by_date: BTreeMap<String, i64>,
    #[serde(default)]
    pub lines_by_file_type: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugMetrics {
    pub bugs_created: i64,
    pub bugs_resolved: i64,
    pub average_resolution_time: f64,
    pub bugs_reopened: i64,
    pub efficiency_score: f64,
}

/// Entry for the developer picker, sourced from the overall leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperOption {
    pub user_id: String,
    pub username: String,
}

/// Deep record for the developer-detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperDetail {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub report_time: Option<String>,
    pub overall_score: f64,
    pub activity_score: f64,
    #[serde(default)]
    pub collaboration_score: f64,
    pub code_contribution_rank: i64,
    pub code_quality_rank: i64,
    pub bug_resolution_rank: i64,
    #[serde(default)]
    pub code_metrics: CodeMetrics,
    #[serde(default)]
    pub bug_metrics: BugMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_trend_keys_are_ordered() {
        let detail: DeveloperDetail = serde_json::from_str(
            r#"{
                "userId": "u7",
                "username": "li.na",
                "overallScore": 90.0,
                "activityScore": 80.0,
                "codeContributionRank": 1,
                "codeQualityRank": 2,
                "bugResolutionRank": 3,
                "codeMetrics": {
                    "commitCount": 3,
                    "linesAdded": 10,
                    "linesDeleted": 2,
                    "filesChanged": 4,
                    "qualityScore": 88.0,
                    "commitsByDate": {
                        "2025-07-03": 1,
                        "2025-07-01": 2
                    },
                    "linesByFileType": {}
                }
            }"#,
        )
        .unwrap();

        let dates: Vec<&str> = detail
            .code_metrics
            .commits_by_date
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(dates, vec!["2025-07-01", "2025-07-03"]);
        assert_eq!(detail.bug_metrics.bugs_resolved, 0);
    }
}
