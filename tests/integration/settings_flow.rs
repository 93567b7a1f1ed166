use gitboard_app_lib::db::migrations;
use gitboard_app_lib::db::repositories::report_log_repository::{
    ReportLogRepository, ReportRequestRow,
};
use gitboard_app_lib::db::repositories::settings_repository::{
    CredentialRepository, SettingsRepository,
};
use gitboard_app_lib::db::DbPool;
use tempfile::tempdir;

#[test]
fn settings_rows_roundtrip_through_the_store() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("gitboard.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        SettingsRepository::upsert(conn, "gitlab_api_url", "https://gitlab.example.com/api")?;
        SettingsRepository::upsert(conn, "max_retries", "2")?;
        SettingsRepository::upsert(conn, "max_retries", "5")?;

        let row = SettingsRepository::get(conn, "gitlab_api_url")?.expect("url row");
        assert_eq!(row.value, "https://gitlab.example.com/api");

        let retries = SettingsRepository::get(conn, "max_retries")?.expect("retries row");
        assert_eq!(retries.value, "5");

        let all = SettingsRepository::list(conn)?;
        assert_eq!(all.len(), 2);

        SettingsRepository::delete(conn, "max_retries")?;
        assert!(SettingsRepository::get(conn, "max_retries")?.is_none());

        Ok(())
    })
    .expect("settings roundtrip");
}

#[test]
fn credentials_live_in_their_own_table() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("gitboard.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        CredentialRepository::upsert(conn, "gitlab_access_token", "v1:ciphertext")?;

        let row = CredentialRepository::get(conn, "gitlab_access_token")?.expect("token row");
        assert_eq!(row.value, "v1:ciphertext");

        // Not visible through the plain settings table.
        assert!(SettingsRepository::get(conn, "gitlab_access_token")?.is_none());

        CredentialRepository::delete(conn, "gitlab_access_token")?;
        assert!(CredentialRepository::get(conn, "gitlab_access_token")?.is_none());

        Ok(())
    })
    .expect("credential roundtrip");
}

#[test]
fn migrations_reach_the_current_version_and_record_history() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("gitboard.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(gitboard_app_lib::error::AppError::from)?;
        assert_eq!(version, 2);

        let history = migrations::get_migration_history(conn)?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 1);
        assert_eq!(history[1].version, 2);

        Ok(())
    })
    .expect("migration history");
}

#[test]
fn report_requests_are_journaled_newest_first() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("gitboard.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        ReportLogRepository::insert(
            conn,
            &ReportRequestRow {
                id: "r1".into(),
                project_id: "42".into(),
                period: "weekly".into(),
                start_date: "2026-06-01".into(),
                end_date: "2026-06-07".into(),
                requested_at: "2026-06-08T01:00:00Z".into(),
                response_json: None,
            },
        )?;
        ReportLogRepository::insert(
            conn,
            &ReportRequestRow {
                id: "r2".into(),
                project_id: "42".into(),
                period: "daily".into(),
                start_date: "2026-06-09".into(),
                end_date: "2026-06-09".into(),
                requested_at: "2026-06-10T01:00:00Z".into(),
                response_json: Some("{\"status\":\"accepted\"}".into()),
            },
        )?;
        ReportLogRepository::insert(
            conn,
            &ReportRequestRow {
                id: "other-project".into(),
                project_id: "7".into(),
                period: "monthly".into(),
                start_date: "2026-06-01".into(),
                end_date: "2026-06-30".into(),
                requested_at: "2026-07-01T01:00:00Z".into(),
                response_json: None,
            },
        )?;

        let rows = ReportLogRepository::list_for_project(conn, "42", 10)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "r2");
        assert_eq!(rows[1].id, "r1");

        let limited = ReportLogRepository::list_for_project(conn, "42", 1)?;
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "r2");

        Ok(())
    })
    .expect("report journal");
}
