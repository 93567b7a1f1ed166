use tauri::State;
use tracing::{debug, warn};

use crate::models::charts::DeveloperPageView;
use crate::models::dashboard::DashboardQuery;
use crate::models::developer::DeveloperOption;

use super::{AppState, CommandError, CommandResult};

#[tauri::command]
pub async fn developer_page_fetch(
    state: State<'_, AppState>,
    user_id: String,
    params: DashboardQuery,
) -> CommandResult<DeveloperPageView> {
    let app_state = state.inner().clone();

    match app_state
        .developer()
        .fetch_developer(&user_id, params)
        .await
    {
        Ok(view) => {
            debug!(
                target: "app::command",
                %user_id,
                "developer_page_fetch completed"
            );
            Ok(view)
        }
        Err(error) => {
            warn!(
                target: "app::command",
                %user_id,
                error = %error,
                "developer_page_fetch failed"
            );
            Err(CommandError::from(error))
        }
    }
}

#[tauri::command]
pub async fn developer_options_fetch(
    state: State<'_, AppState>,
    project_id: String,
) -> CommandResult<Vec<DeveloperOption>> {
    let app_state = state.inner().clone();

    match app_state.developer().developer_options(&project_id).await {
        Ok(options) => {
            debug!(
                target: "app::command",
                %project_id,
                count = options.len(),
                "developer_options_fetch completed"
            );
            Ok(options)
        }
        Err(error) => {
            warn!(
                target: "app::command",
                %project_id,
                error = %error,
                "developer_options_fetch failed"
            );
            Err(CommandError::from(error))
        }
    }
}
