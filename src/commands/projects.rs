use tauri::State;
use tracing::{debug, warn};

use crate::models::project::Project;

use super::{AppState, CommandError, CommandResult};

#[tauri::command]
pub async fn projects_list(state: State<'_, AppState>) -> CommandResult<Vec<Project>> {
    let app_state = state.inner().clone();

    match app_state.dashboard().projects().await {
        Ok(projects) => {
            debug!(
                target: "app::command",
                count = projects.len(),
                "projects_list completed"
            );
            Ok(projects)
        }
        Err(error) => {
            warn!(target: "app::command", error = %error, "projects_list failed");
            Err(CommandError::from(error))
        }
    }
}
