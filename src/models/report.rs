use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Report cadence supported by the monitoring backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportParams {
    pub project_id: String,
    pub period: ReportPeriod,
    pub start_date: String,
    pub end_date: String,
}

/// Report bodies are backend-defined documents; the client types only the
/// envelope and forwards the payload verbatim for generic display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub project_id: String,
    pub period: ReportPeriod,
    pub date: String,
    pub payload: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGenerationResult {
    pub project_id: String,
    pub period: ReportPeriod,
    pub start_date: String,
    pub end_date: String,
    pub accepted_at: String,
    #[serde(default)]
    pub response: JsonValue,
}

/// Log entry for a previously triggered generation, read back from
/// local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLogEntry {
    pub id: String,
    pub project_id: String,
    pub period: ReportPeriod,
    pub start_date: String,
    pub end_date: String,
    pub requested_at: String,
}
