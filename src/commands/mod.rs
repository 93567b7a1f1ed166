pub mod dashboard;
pub mod developer;
pub mod projects;
pub mod reports;
pub mod settings;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::dashboard_service::DashboardService;
use crate::services::developer_service::DeveloperService;
use crate::services::metrics_api::MetricsApiService;
use crate::services::report_service::ReportService;
use crate::services::settings_service::SettingsService;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    metrics_api: MetricsApiService,
    dashboard_service: Arc<DashboardService>,
    developer_service: Arc<DeveloperService>,
    report_service: Arc<ReportService>,
    settings_service: Arc<SettingsService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        let metrics_api = MetricsApiService::new(db_pool.clone())?;
        let dashboard_service = Arc::new(DashboardService::new(metrics_api.clone()));
        let developer_service = Arc::new(DeveloperService::new(metrics_api.clone()));
        let report_service = Arc::new(ReportService::new(metrics_api.clone(), db_pool.clone()));
        let settings_service = Arc::new(SettingsService::new(db_pool.clone())?);

        Ok(Self {
            db_pool,
            metrics_api,
            dashboard_service,
            developer_service,
            report_service,
            settings_service,
        })
    }

    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard_service)
    }

    pub fn developer(&self) -> Arc<DeveloperService> {
        Arc::clone(&self.developer_service)
    }

    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.report_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn metrics(&self) -> MetricsApiService {
        self.metrics_api.clone()
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => CommandError::new("NOT_FOUND", "请求的资源不存在", None),
            AppError::Superseded => {
                // The webview silently drops this code instead of toasting.
                CommandError::new("SUPERSEDED", "请求已被更新的查询取代", None)
            }
            AppError::Api {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => {
                            for (key, value) in map {
                                merged.insert(key, value);
                            }
                        }
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                CommandError::new(code.as_str(), message, detail_value)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "序列化失败", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "文件系统读写失败", None)
            }
            AppError::Other(message) => {
                warn!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}
