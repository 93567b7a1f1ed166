use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub gitlab_api_url: String,
    /// Masked on every read; the plaintext token never leaves the vault.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub max_retries: u32,
    pub notifications_enabled: bool,
    pub email_enabled: bool,
    pub webhook_enabled: bool,
    pub webhook_url: String,
    pub quality_warning_threshold: f64,
    pub quality_critical_threshold: f64,
    pub bug_warning_hours: f64,
    pub bug_critical_hours: f64,
    pub reports_path: String,
    pub updated_at: String,
}
