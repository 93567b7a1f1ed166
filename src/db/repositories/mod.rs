pub mod report_log_repository;
pub mod settings_repository;
