use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use crate::error::AppResult;

/// One row per report-generation trigger sent to the backend.
#[derive(Debug, Clone)]
pub struct ReportRequestRow {
    pub id: String,
    pub project_id: String,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    pub requested_at: String,
    pub response_json: Option<String>,
}

impl TryFrom<&Row<'_>> for ReportRequestRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            period: row.get("period")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            requested_at: row.get("requested_at")?,
            response_json: row.get("response_json")?,
        })
    }
}

pub struct ReportLogRepository;

impl ReportLogRepository {
    pub fn insert(conn: &Connection, row: &ReportRequestRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO report_requests
                    (id, project_id, period, start_date, end_date, requested_at, response_json)
                VALUES
                    (:id, :project_id, :period, :start_date, :end_date, :requested_at, :response_json)
            "#,
            named_params! {
                ":id": row.id,
                ":project_id": row.project_id,
                ":period": row.period,
                ":start_date": row.start_date,
                ":end_date": row.end_date,
                ":requested_at": row.requested_at,
                ":response_json": row.response_json,
            },
        )?;

        Ok(())
    }

    pub fn list_for_project(
        conn: &Connection,
        project_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ReportRequestRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, project_id, period, start_date, end_date, requested_at, response_json
                FROM report_requests
                WHERE project_id = ?1
                ORDER BY requested_at DESC
                LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map((project_id, limit as i64), |row| {
                ReportRequestRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
