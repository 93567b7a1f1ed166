pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if let Err(error) = try_run() {
        eprintln!("failed to launch application: {error}");
    }
}

fn try_run() -> Result<(), Box<dyn std::error::Error>> {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let handle = app.handle();

            crate::utils::logger::init_logging(&handle)
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;

            let mut data_dir = handle
                .path()
                .app_data_dir()
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;

            std::fs::create_dir_all(&data_dir)?;
            data_dir.push("gitboard.sqlite");

            let pool = crate::db::DbPool::new(&data_dir)
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;

            let state = crate::commands::AppState::new(pool)
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;
            app.manage(state);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            crate::commands::projects::projects_list,
            crate::commands::dashboard::dashboard_page_fetch,
            crate::commands::dashboard::team_page_fetch,
            crate::commands::dashboard::quality_page_fetch,
            crate::commands::dashboard::bug_page_fetch,
            crate::commands::developer::developer_page_fetch,
            crate::commands::developer::developer_options_fetch,
            crate::commands::reports::report_generate,
            crate::commands::reports::report_fetch,
            crate::commands::reports::report_dates_fetch,
            crate::commands::reports::project_summary_fetch,
            crate::commands::reports::report_history_fetch,
            crate::commands::settings::settings_get,
            crate::commands::settings::settings_update,
            crate::commands::settings::settings_clear_token,
        ])
        .run(tauri::generate_context!())?;

    Ok(())
}
