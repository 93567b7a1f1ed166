use std::sync::{Arc, RwLock};
use std::time::{Duration as StdDuration, Instant};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::repositories::settings_repository::{CredentialRepository, SettingsRepository};
use crate::db::DbPool;
use crate::error::{ApiErrorCode, AppError, AppResult};
use crate::models::dashboard::{
    BugStats, DashboardOverview, DashboardQuery, DeveloperScoreRecord, LeaderboardQuery,
    QualityDistribution, TimelinePoint,
};
use crate::models::developer::DeveloperDetail;
use crate::models::project::Project;
use crate::models::report::ReportPeriod;
use crate::utils::crypto::CryptoVault;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

const KEY_GITLAB_API_URL: &str = "gitlab_api_url";
const KEY_CONNECT_TIMEOUT_MS: &str = "connect_timeout_ms";
const KEY_READ_TIMEOUT_MS: &str = "read_timeout_ms";
const KEY_MAX_RETRIES: &str = "max_retries";
const KEY_ACCESS_TOKEN: &str = "gitlab_access_token";

/// Typed surface of the metrics backend. Implemented by the HTTP client;
/// the service layer only talks through this seam.
#[async_trait::async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn projects(&self) -> AppResult<Vec<Project>>;
    async fn overview(&self, query: &DashboardQuery) -> AppResult<DashboardOverview>;
    async fn leaderboard(&self, query: &LeaderboardQuery) -> AppResult<Vec<DeveloperScoreRecord>>;
    async fn timeline(&self, query: &DashboardQuery) -> AppResult<Vec<TimelinePoint>>;
    async fn quality_distribution(&self, query: &DashboardQuery)
        -> AppResult<QualityDistribution>;
    async fn bug_stats(&self, query: &DashboardQuery) -> AppResult<BugStats>;
    async fn developer_detail(
        &self,
        user_id: &str,
        query: &DashboardQuery,
    ) -> AppResult<DeveloperDetail>;
    async fn generate_report(
        &self,
        project_id: &str,
        period: ReportPeriod,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<JsonValue>;
    async fn periodic_report(
        &self,
        project_id: &str,
        period: ReportPeriod,
        date: &str,
    ) -> AppResult<JsonValue>;
    async fn report_dates(&self, project_id: &str, period: ReportPeriod)
        -> AppResult<Vec<String>>;
    async fn project_summary(
        &self,
        project_id: &str,
        period: ReportPeriod,
        date: &str,
    ) -> AppResult<JsonValue>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsApiConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub connect_timeout: StdDuration,
    pub read_timeout: StdDuration,
    pub max_retries: u32,
}

impl Default for MetricsApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            connect_timeout: StdDuration::from_millis(5000),
            read_timeout: StdDuration::from_millis(10000),
            max_retries: 3,
        }
    }
}

impl MetricsApiConfig {
    fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("GITBOARD_API_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(token) = std::env::var("GITBOARD_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                config.access_token = Some(token);
            }
        }
        config
    }

    fn load(db_pool: &DbPool) -> AppResult<Self> {
        let env = Self::from_env();
        let env_base_url = std::env::var("GITBOARD_API_BASE_URL").is_ok();
        let mut config = env;

        let stored = db_pool.with_connection(|conn| {
            let base_url = SettingsRepository::get(conn, KEY_GITLAB_API_URL)?;
            let connect_timeout = SettingsRepository::get(conn, KEY_CONNECT_TIMEOUT_MS)?;
            let read_timeout = SettingsRepository::get(conn, KEY_READ_TIMEOUT_MS)?;
            let max_retries = SettingsRepository::get(conn, KEY_MAX_RETRIES)?;
            let token = CredentialRepository::get(conn, KEY_ACCESS_TOKEN)?;
            Ok((base_url, connect_timeout, read_timeout, max_retries, token))
        })?;
        let (base_url, connect_timeout, read_timeout, max_retries, token) = stored;

        if !env_base_url {
            if let Some(row) = base_url {
                if !row.value.trim().is_empty() {
                    config.base_url = row.value;
                }
            }
        }

        if let Some(row) = connect_timeout {
            if let Ok(ms) = row.value.parse::<u64>() {
                config.connect_timeout = StdDuration::from_millis(ms);
            }
        }

        if let Some(row) = read_timeout {
            if let Ok(ms) = row.value.parse::<u64>() {
                config.read_timeout = StdDuration::from_millis(ms);
            }
        }

        if let Some(row) = max_retries {
            if let Ok(value) = row.value.parse::<u32>() {
                config.max_retries = value;
            }
        }

        if config.access_token.is_none() {
            if let Some(row) = token {
                let vault = CryptoVault::from_database_path(db_pool.path())?;
                match vault.decrypt(&row.value) {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(value) => {
                            if !value.trim().is_empty() {
                                config.access_token = Some(value);
                            }
                        }
                        Err(err) => {
                            warn!(
                                target: "app::api",
                                error = %err,
                                "failed to decode stored access token"
                            );
                        }
                    },
                    Err(err) => {
                        warn!(
                            target: "app::api",
                            error = %err,
                            "failed to decrypt stored access token"
                        );
                    }
                }
            }
        }

        Ok(config)
    }

    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

/// Hot-reloadable handle over the HTTP client. Configuration is re-read
/// before every page fetch so settings changes apply without a restart.
#[derive(Clone)]
pub struct MetricsApiService {
    db_pool: DbPool,
    client: Arc<RwLock<Arc<MetricsClient>>>,
    config: Arc<RwLock<MetricsApiConfig>>,
}

impl MetricsApiService {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        let config = MetricsApiConfig::load(&db_pool)?;
        let client = Arc::new(MetricsClient::try_new(&config)?);

        Ok(Self {
            db_pool,
            client: Arc::new(RwLock::new(client)),
            config: Arc::new(RwLock::new(config)),
        })
    }

    pub fn refresh_configuration(&self) -> AppResult<()> {
        let config = MetricsApiConfig::load(&self.db_pool)?;

        let mut client_update: Option<Arc<MetricsClient>> = None;

        {
            let mut current = self.config.write().expect("config lock poisoned");
            if current.differs_from(&config) {
                client_update = Some(Arc::new(MetricsClient::try_new(&config)?));
                *current = config;
            }
        }

        if let Some(update) = client_update {
            let mut guard = self.client.write().expect("client lock poisoned");
            *guard = update;
        }

        Ok(())
    }

    pub fn provider(&self) -> AppResult<Arc<MetricsClient>> {
        self.refresh_configuration()?;
        let guard = self.client.read().expect("client lock poisoned");
        Ok(Arc::clone(&guard))
    }
}

/// Direct HTTP client for the metrics backend.
pub struct MetricsClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    max_retries: u32,
}

impl MetricsClient {
    pub fn try_new(config: &MetricsApiConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("初始化指标服务 HTTP 客户端失败: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.endpoint(path);
        let attempts = self.max_retries.saturating_add(1);

        let mut last_error: Option<AppError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // 1s, 2s, 4s, then capped at 8s between attempts
                let delay = StdDuration::from_secs(1u64 << (attempt - 1).min(3));
                sleep(delay).await;
            }

            debug!(
                target: "app::api",
                %path,
                attempt = attempt + 1,
                correlation_id = %correlation_id,
                "GET metrics backend"
            );

            let start = Instant::now();
            let mut request = self.client.get(&url).query(query);
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let latency_ms = start.elapsed().as_millis();
                        debug!(
                            target: "app::api",
                            %path,
                            correlation_id = %correlation_id,
                            latency_ms,
                            "metrics backend responded"
                        );

                        return resp.json::<T>().await.map_err(|err| {
                            AppError::api_with_details(
                                ApiErrorCode::InvalidResponse,
                                "解析指标服务响应失败",
                                Some(correlation_id.as_str()),
                                Some(json!({ "path": path, "reason": err.to_string() })),
                            )
                        });
                    }

                    let (error, retryable) = Self::map_http_error(status, correlation_id.as_str());
                    warn!(
                        target: "app::api",
                        %path,
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        retryable,
                        "指标服务返回非成功状态"
                    );

                    if !retryable || attempt == attempts - 1 {
                        return Err(error);
                    }

                    last_error = Some(error);
                    continue;
                }
                Err(err) => {
                    let (error, retryable) = Self::error_from_reqwest(err, correlation_id.as_str());
                    warn!(
                        target: "app::api",
                        %path,
                        correlation_id = %correlation_id,
                        retryable,
                        "指标服务请求错误"
                    );

                    if !retryable || attempt == attempts - 1 {
                        return Err(error);
                    }

                    last_error = Some(error);
                    continue;
                }
            }
        }

        if let Some(error) = last_error {
            Err(error)
        } else {
            Err(AppError::api_with_details(
                ApiErrorCode::BackendUnavailable,
                "指标服务请求失败",
                Some(correlation_id.as_str()),
                None,
            ))
        }
    }

    /// POST is only used for the non-idempotent report trigger, so there
    /// is no retry loop here.
    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let correlation_id = Uuid::new_v4().to_string();
        let url = self.endpoint(path);

        debug!(
            target: "app::api",
            %path,
            correlation_id = %correlation_id,
            "POST metrics backend"
        );

        let mut request = self.client.post(&url).query(query);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| Self::error_from_reqwest(err, correlation_id.as_str()).0)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_http_error(status, correlation_id.as_str()).0);
        }

        response.json::<T>().await.map_err(|err| {
            AppError::api_with_details(
                ApiErrorCode::InvalidResponse,
                "解析指标服务响应失败",
                Some(correlation_id.as_str()),
                Some(json!({ "path": path, "reason": err.to_string() })),
            )
        })
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> (AppError, bool) {
        let (code, message) = match status {
            StatusCode::UNAUTHORIZED => (
                ApiErrorCode::Unauthorized,
                "认证失败，请检查访问令牌".to_string(),
            ),
            StatusCode::FORBIDDEN => {
                (ApiErrorCode::Forbidden, "没有访问该资源的权限".to_string())
            }
            StatusCode::NOT_FOUND => (ApiErrorCode::NotFound, "请求的资源不存在".to_string()),
            StatusCode::TOO_MANY_REQUESTS => (
                ApiErrorCode::RateLimited,
                "请求过于频繁，请稍后重试".to_string(),
            ),
            status if status.is_server_error() => (
                ApiErrorCode::BackendUnavailable,
                format!("指标服务暂时不可用 (状态码 {})", status.as_u16()),
            ),
            StatusCode::BAD_REQUEST => (ApiErrorCode::InvalidRequest, "请求参数无效".to_string()),
            status => (
                ApiErrorCode::Unknown,
                format!("指标服务返回错误状态码 {}", status.as_u16()),
            ),
        };

        let retryable = code.is_retryable();
        (
            AppError::api_with_details(code, message, Some(correlation_id), None),
            retryable,
        )
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> (AppError, bool) {
        if let Some(status) = err.status() {
            return Self::map_http_error(status, correlation_id);
        }

        let (code, message) = if err.is_timeout() {
            (ApiErrorCode::HttpTimeout, "指标服务请求超时".to_string())
        } else if err.is_connect() {
            (ApiErrorCode::Network, "无法连接指标服务".to_string())
        } else {
            (ApiErrorCode::Unknown, format!("指标服务请求失败: {err}"))
        };

        let retryable = code.is_retryable();
        (
            AppError::api_with_details(code, message, Some(correlation_id), None),
            retryable,
        )
    }
}

fn dashboard_query(query: &DashboardQuery) -> Vec<(&'static str, String)> {
    vec![
        ("projectId", query.project_id.clone()),
        ("days", query.days.days().to_string()),
    ]
}

#[async_trait::async_trait]
impl MetricsProvider for MetricsClient {
    async fn projects(&self) -> AppResult<Vec<Project>> {
        self.get_json("/projects", &[]).await
    }

    async fn overview(&self, query: &DashboardQuery) -> AppResult<DashboardOverview> {
        self.get_json("/dashboard/overview", &dashboard_query(query))
            .await
    }

    async fn leaderboard(&self, query: &LeaderboardQuery) -> AppResult<Vec<DeveloperScoreRecord>> {
        let params = vec![
            ("projectId", query.project_id.clone()),
            ("days", query.days.days().to_string()),
            ("sortBy", query.sort_by.as_str().to_string()),
        ];
        self.get_json("/dashboard/leaderboard", &params).await
    }

    async fn timeline(&self, query: &DashboardQuery) -> AppResult<Vec<TimelinePoint>> {
        self.get_json("/dashboard/timeline", &dashboard_query(query))
            .await
    }

    async fn quality_distribution(
        &self,
        query: &DashboardQuery,
    ) -> AppResult<QualityDistribution> {
        self.get_json("/dashboard/quality-distribution", &dashboard_query(query))
            .await
    }

    async fn bug_stats(&self, query: &DashboardQuery) -> AppResult<BugStats> {
        self.get_json("/dashboard/bug-stats", &dashboard_query(query))
            .await
    }

    async fn developer_detail(
        &self,
        user_id: &str,
        query: &DashboardQuery,
    ) -> AppResult<DeveloperDetail> {
        let path = format!("/dashboard/developer/{user_id}");
        self.get_json(&path, &dashboard_query(query)).await
    }

    async fn generate_report(
        &self,
        project_id: &str,
        period: ReportPeriod,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<JsonValue> {
        let path = format!(
            "/gitlab/monitoring/projects/{project_id}/reports/{}/generate",
            period.as_str()
        );
        let params = vec![
            ("startDate", start_date.to_string()),
            ("endDate", end_date.to_string()),
        ];
        self.post_json(&path, &params).await
    }

    async fn periodic_report(
        &self,
        project_id: &str,
        period: ReportPeriod,
        date: &str,
    ) -> AppResult<JsonValue> {
        let path = format!(
            "/gitlab/monitoring/projects/{project_id}/reports/{}/{date}",
            period.as_str()
        );
        self.get_json(&path, &[]).await
    }

    async fn report_dates(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> AppResult<Vec<String>> {
        let path = format!(
            "/gitlab/monitoring/projects/{project_id}/reports/{}/dates",
            period.as_str()
        );
        self.get_json(&path, &[]).await
    }

    async fn project_summary(
        &self,
        project_id: &str,
        period: ReportPeriod,
        date: &str,
    ) -> AppResult<JsonValue> {
        let path = format!(
            "/gitlab/monitoring/projects/{project_id}/summary/{}/{date}",
            period.as_str()
        );
        self.get_json(&path, &[]).await
    }
}

pub mod testing {
    use super::*;

    /// Expose status mapping for integration tests without widening the
    /// public API surface.
    pub fn map_http_error(status: StatusCode) -> (AppError, bool) {
        MetricsClient::map_http_error(status, "test-correlation-id")
    }

    pub fn client_for(base_url: &str, read_timeout: StdDuration, max_retries: u32) -> MetricsClient {
        let config = MetricsApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
            connect_timeout: StdDuration::from_secs(2),
            read_timeout,
            max_retries,
        };
        MetricsClient::try_new(&config).expect("test client")
    }

    pub fn client_with_token(
        base_url: &str,
        read_timeout: StdDuration,
        token: &str,
    ) -> MetricsClient {
        let config = MetricsApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: Some(token.to_string()),
            connect_timeout: StdDuration::from_secs(2),
            read_timeout,
            max_retries: 0,
        };
        MetricsClient::try_new(&config).expect("test client")
    }
}
