use tauri::State;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::charts::{BugPageView, DashboardPageView, QualityPageView, TeamPageView};
use crate::models::dashboard::{DashboardQuery, LeaderboardQuery};

use super::{AppState, CommandError, CommandResult};

#[tauri::command]
pub async fn dashboard_page_fetch(
    state: State<'_, AppState>,
    params: DashboardQuery,
) -> CommandResult<DashboardPageView> {
    let app_state = state.inner().clone();
    log_outcome(
        "dashboard_page_fetch",
        app_state.dashboard().fetch_dashboard(params).await,
    )
}

#[tauri::command]
pub async fn team_page_fetch(
    state: State<'_, AppState>,
    params: LeaderboardQuery,
) -> CommandResult<TeamPageView> {
    let app_state = state.inner().clone();
    log_outcome(
        "team_page_fetch",
        app_state.dashboard().fetch_team(params).await,
    )
}

#[tauri::command]
pub async fn quality_page_fetch(
    state: State<'_, AppState>,
    params: DashboardQuery,
) -> CommandResult<QualityPageView> {
    let app_state = state.inner().clone();
    log_outcome(
        "quality_page_fetch",
        app_state.dashboard().fetch_quality(params).await,
    )
}

#[tauri::command]
pub async fn bug_page_fetch(
    state: State<'_, AppState>,
    params: DashboardQuery,
) -> CommandResult<BugPageView> {
    let app_state = state.inner().clone();
    log_outcome(
        "bug_page_fetch",
        app_state.dashboard().fetch_bugs(params).await,
    )
}

fn log_outcome<T>(command: &'static str, result: Result<T, AppError>) -> CommandResult<T> {
    match result {
        Ok(view) => {
            debug!(target: "app::command", %command, "page fetch completed");
            Ok(view)
        }
        Err(AppError::Superseded) => {
            debug!(target: "app::command", %command, "page fetch superseded");
            Err(CommandError::from(AppError::Superseded))
        }
        Err(error) => {
            let correlation_id = error.api_correlation_id().unwrap_or("-");
            warn!(
                target: "app::command",
                %command,
                error = %error,
                correlation_id = %correlation_id,
                "page fetch failed"
            );
            Err(CommandError::from(error))
        }
    }
}
