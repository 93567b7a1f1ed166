use serde_json::Value as JsonValue;
use tauri::State;
use tracing::{debug, warn};

use crate::models::report::{
    GenerateReportParams, ReportDocument, ReportGenerationResult, ReportLogEntry, ReportPeriod,
};

use super::{AppState, CommandError, CommandResult};

const REPORT_HISTORY_LIMIT: usize = 50;

#[tauri::command]
pub async fn report_generate(
    state: State<'_, AppState>,
    params: GenerateReportParams,
) -> CommandResult<ReportGenerationResult> {
    let app_state = state.inner().clone();

    match app_state.reports().generate(params).await {
        Ok(result) => {
            debug!(
                target: "app::command",
                project_id = %result.project_id,
                period = result.period.as_str(),
                "report_generate accepted"
            );
            Ok(result)
        }
        Err(error) => {
            warn!(target: "app::command", error = %error, "report_generate failed");
            Err(CommandError::from(error))
        }
    }
}

#[tauri::command]
pub async fn report_fetch(
    state: State<'_, AppState>,
    project_id: String,
    period: ReportPeriod,
    date: String,
) -> CommandResult<ReportDocument> {
    let app_state = state.inner().clone();

    app_state
        .reports()
        .periodic_report(&project_id, period, &date)
        .await
        .map_err(CommandError::from)
}

#[tauri::command]
pub async fn report_dates_fetch(
    state: State<'_, AppState>,
    project_id: String,
    period: ReportPeriod,
) -> CommandResult<Vec<String>> {
    let app_state = state.inner().clone();

    app_state
        .reports()
        .report_dates(&project_id, period)
        .await
        .map_err(CommandError::from)
}

#[tauri::command]
pub async fn project_summary_fetch(
    state: State<'_, AppState>,
    project_id: String,
    period: ReportPeriod,
    date: String,
) -> CommandResult<JsonValue> {
    let app_state = state.inner().clone();

    app_state
        .reports()
        .project_summary(&project_id, period, &date)
        .await
        .map_err(CommandError::from)
}

#[tauri::command]
pub async fn report_history_fetch(
    state: State<'_, AppState>,
    project_id: String,
) -> CommandResult<Vec<ReportLogEntry>> {
    let app_state = state.inner().clone();

    app_state
        .reports()
        .recent_requests(&project_id, REPORT_HISTORY_LIMIT)
        .await
        .map_err(CommandError::from)
}
