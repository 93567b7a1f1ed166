use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value as JsonValue;
use tauri::async_runtime;
use tracing::debug;
use uuid::Uuid;

use crate::db::repositories::report_log_repository::{ReportLogRepository, ReportRequestRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::report::{
    GenerateReportParams, ReportDocument, ReportGenerationResult, ReportLogEntry, ReportPeriod,
};
use crate::services::metrics_api::{MetricsApiService, MetricsProvider};
use crate::utils::redact::redact_sensitive_data;

/// Report triggers and periodic report reads. Every accepted trigger is
/// journaled locally so the history survives backend restarts.
pub struct ReportService {
    api: MetricsApiService,
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(api: MetricsApiService, db: DbPool) -> Self {
        Self {
            api,
            db: Arc::new(db),
        }
    }

    pub async fn generate(&self, params: GenerateReportParams) -> AppResult<ReportGenerationResult> {
        validate_date_range(&params.start_date, &params.end_date)?;

        let provider = self.api.provider()?;
        let response = provider
            .generate_report(
                &params.project_id,
                params.period,
                &params.start_date,
                &params.end_date,
            )
            .await?;

        let accepted_at = Utc::now().to_rfc3339();
        let row = ReportRequestRow {
            id: Uuid::new_v4().to_string(),
            project_id: params.project_id.clone(),
            period: params.period.as_str().to_string(),
            start_date: params.start_date.clone(),
            end_date: params.end_date.clone(),
            requested_at: accepted_at.clone(),
            response_json: serde_json::to_string(&response).ok(),
        };
        self.journal_request(row).await?;

        let sanitized = redact_sensitive_data(&response)
            .unwrap_or_else(|_| JsonValue::String("<redacted>".to_string()));
        debug!(
            target: "app::metrics",
            project_id = %params.project_id,
            period = params.period.as_str(),
            response = %sanitized,
            "report generation accepted"
        );

        Ok(ReportGenerationResult {
            project_id: params.project_id,
            period: params.period,
            start_date: params.start_date,
            end_date: params.end_date,
            accepted_at,
            response,
        })
    }

    pub async fn periodic_report(
        &self,
        project_id: &str,
        period: ReportPeriod,
        date: &str,
    ) -> AppResult<ReportDocument> {
        let provider = self.api.provider()?;
        let payload = provider.periodic_report(project_id, period, date).await?;

        Ok(ReportDocument {
            project_id: project_id.to_string(),
            period,
            date: date.to_string(),
            payload,
        })
    }

    pub async fn report_dates(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> AppResult<Vec<String>> {
        let provider = self.api.provider()?;
        provider.report_dates(project_id, period).await
    }

    pub async fn project_summary(
        &self,
        project_id: &str,
        period: ReportPeriod,
        date: &str,
    ) -> AppResult<JsonValue> {
        let provider = self.api.provider()?;
        provider.project_summary(project_id, period, date).await
    }

    pub async fn recent_requests(
        &self,
        project_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ReportLogEntry>> {
        let db = Arc::clone(&self.db);
        let project = project_id.to_string();

        let rows = async_runtime::spawn_blocking(move || {
            db.with_connection(|conn| ReportLogRepository::list_for_project(conn, &project, limit))
        })
        .await
        .map_err(|err| AppError::other(format!("读取报表记录失败: {err}")))??;

        rows.into_iter().map(log_entry_from_row).collect()
    }

    async fn journal_request(&self, row: ReportRequestRow) -> AppResult<()> {
        let db = Arc::clone(&self.db);
        async_runtime::spawn_blocking(move || {
            db.with_connection(|conn| ReportLogRepository::insert(conn, &row))
        })
        .await
        .map_err(|err| AppError::other(format!("记录报表请求失败: {err}")))?
    }
}

fn log_entry_from_row(row: ReportRequestRow) -> AppResult<ReportLogEntry> {
    let period = match row.period.as_str() {
        "daily" => ReportPeriod::Daily,
        "weekly" => ReportPeriod::Weekly,
        "monthly" => ReportPeriod::Monthly,
        other => {
            return Err(AppError::database(format!("未知的报表周期: {other}")));
        }
    };

    Ok(ReportLogEntry {
        id: row.id,
        project_id: row.project_id,
        period,
        start_date: row.start_date,
        end_date: row.end_date,
        requested_at: row.requested_at,
    })
}

fn validate_date_range(start_date: &str, end_date: &str) -> AppResult<()> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;

    if start > end {
        return Err(AppError::validation("开始日期不能晚于结束日期"));
    }

    Ok(())
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("日期格式无效: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_must_be_ordered() {
        assert!(validate_date_range("2026-07-01", "2026-07-31").is_ok());
        assert!(validate_date_range("2026-07-01", "2026-07-01").is_ok());
        assert!(validate_date_range("2026-08-01", "2026-07-01").is_err());
    }

    #[test]
    fn dates_must_be_iso_formatted() {
        assert!(validate_date_range("07/01/2026", "2026-07-31").is_err());
        assert!(validate_date_range("2026-07-01", "not-a-date").is_err());
    }

    #[test]
    fn log_rows_map_back_to_typed_periods() {
        let row = ReportRequestRow {
            id: "r1".into(),
            project_id: "1".into(),
            period: "weekly".into(),
            start_date: "2026-07-01".into(),
            end_date: "2026-07-07".into(),
            requested_at: "2026-07-08T00:00:00Z".into(),
            response_json: None,
        };
        let entry = log_entry_from_row(row).unwrap();
        assert_eq!(entry.period, ReportPeriod::Weekly);

        let bad = ReportRequestRow {
            id: "r2".into(),
            project_id: "1".into(),
            period: "hourly".into(),
            start_date: "2026-07-01".into(),
            end_date: "2026-07-07".into(),
            requested_at: "2026-07-08T00:00:00Z".into(),
            response_json: None,
        };
        assert!(log_entry_from_row(bad).is_err());
    }
}
