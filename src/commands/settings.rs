use serde::Deserialize;
use tauri::{async_runtime, State};

use crate::error::AppError;
use crate::models::settings::AppSettings;
use crate::services::settings_service::SettingsUpdateInput;

use super::{AppState, CommandError, CommandResult};

#[tauri::command]
pub async fn settings_get(state: State<'_, AppState>) -> CommandResult<AppSettings> {
    let app_state = state.inner().clone();
    run_blocking(move || app_state.settings().get()).await
}

#[tauri::command]
pub async fn settings_update(
    state: State<'_, AppState>,
    payload: SettingsUpdatePayload,
) -> CommandResult<AppSettings> {
    let app_state = state.inner().clone();
    let input = payload.into_input();
    run_blocking(move || {
        let updated = app_state.settings().update(input)?;
        // Connection settings feed the HTTP client; rebuild it eagerly so
        // the next fetch already uses them.
        app_state.metrics().refresh_configuration()?;
        Ok(updated)
    })
    .await
}

#[tauri::command]
pub async fn settings_clear_token(state: State<'_, AppState>) -> CommandResult<AppSettings> {
    let app_state = state.inner().clone();
    run_blocking(move || {
        let service = app_state.settings();
        service.clear_sensitive()?;
        app_state.metrics().refresh_configuration()?;
        service.get()
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    remove_access_token: Option<bool>,
    #[serde(default)]
    gitlab_api_url: Option<String>,
    #[serde(default)]
    connect_timeout_ms: Option<u64>,
    #[serde(default)]
    read_timeout_ms: Option<u64>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    notifications_enabled: Option<bool>,
    #[serde(default)]
    email_enabled: Option<bool>,
    #[serde(default)]
    webhook_enabled: Option<bool>,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default)]
    quality_warning_threshold: Option<f64>,
    #[serde(default)]
    quality_critical_threshold: Option<f64>,
    #[serde(default)]
    bug_warning_hours: Option<f64>,
    #[serde(default)]
    bug_critical_hours: Option<f64>,
    #[serde(default)]
    reports_path: Option<String>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        let access_token = if self.remove_access_token == Some(true) {
            Some(None)
        } else {
            self.access_token.map(Some)
        };

        SettingsUpdateInput {
            access_token,
            gitlab_api_url: self.gitlab_api_url,
            connect_timeout_ms: self.connect_timeout_ms,
            read_timeout_ms: self.read_timeout_ms,
            max_retries: self.max_retries,
            notifications_enabled: self.notifications_enabled,
            email_enabled: self.email_enabled,
            webhook_enabled: self.webhook_enabled,
            webhook_url: self.webhook_url,
            quality_warning_threshold: self.quality_warning_threshold,
            quality_critical_threshold: self.quality_critical_threshold,
            bug_warning_hours: self.bug_warning_hours,
            bug_critical_hours: self.bug_critical_hours,
            reports_path: self.reports_path,
        }
    }
}

async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    async_runtime::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("设置操作执行失败: {err}"), None))?
        .map_err(CommandError::from)
}
