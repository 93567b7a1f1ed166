use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::warn;

use crate::db::repositories::settings_repository::{
    CredentialRepository, SettingRow, SettingsRepository,
};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::AppSettings;
use crate::utils::crypto::CryptoVault;

const KEY_GITLAB_API_URL: &str = "gitlab_api_url";
const KEY_CONNECT_TIMEOUT_MS: &str = "connect_timeout_ms";
const KEY_READ_TIMEOUT_MS: &str = "read_timeout_ms";
const KEY_MAX_RETRIES: &str = "max_retries";
const KEY_NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
const KEY_EMAIL_ENABLED: &str = "email_enabled";
const KEY_WEBHOOK_ENABLED: &str = "webhook_enabled";
const KEY_WEBHOOK_URL: &str = "webhook_url";
const KEY_QUALITY_WARNING: &str = "quality_warning_threshold";
const KEY_QUALITY_CRITICAL: &str = "quality_critical_threshold";
const KEY_BUG_WARNING_HOURS: &str = "bug_warning_hours";
const KEY_BUG_CRITICAL_HOURS: &str = "bug_critical_hours";
const KEY_REPORTS_PATH: &str = "reports_path";
const KEY_ACCESS_TOKEN: &str = "gitlab_access_token";

const DEFAULT_GITLAB_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_READ_TIMEOUT_MS: u64 = 10000;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_QUALITY_WARNING: f64 = 60.0;
const DEFAULT_QUALITY_CRITICAL: f64 = 40.0;
const DEFAULT_BUG_WARNING_HOURS: f64 = 72.0;
const DEFAULT_BUG_CRITICAL_HOURS: f64 = 168.0;
const DEFAULT_REPORTS_PATH: &str = "./reports";

const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 1000..=60000;
const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    /// `Some(None)` removes the stored token, `Some(Some(_))` replaces it.
    pub access_token: Option<Option<String>>,
    pub gitlab_api_url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub notifications_enabled: Option<bool>,
    pub email_enabled: Option<bool>,
    pub webhook_enabled: Option<bool>,
    pub webhook_url: Option<String>,
    pub quality_warning_threshold: Option<f64>,
    pub quality_critical_threshold: Option<f64>,
    pub bug_warning_hours: Option<f64>,
    pub bug_critical_hours: Option<f64>,
    pub reports_path: Option<String>,
}

pub struct SettingsService {
    db: DbPool,
    vault: CryptoVault,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> AppResult<Self> {
        let vault = CryptoVault::from_database_path(db.path())?;
        Ok(Self {
            db,
            vault,
            cache: RwLock::new(None),
        })
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let mut current = self.get()?;

        if let Some(url) = input.gitlab_api_url.as_ref() {
            let trimmed = url.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("GitLab API 地址不能为空"));
            }
            if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
                return Err(AppError::validation(
                    "GitLab API 地址必须以 http:// 或 https:// 开头",
                ));
            }
            current.gitlab_api_url = trimmed.trim_end_matches('/').to_string();
        }

        if let Some(value) = input.connect_timeout_ms {
            ensure_valid_timeout(value)?;
            current.connect_timeout_ms = value;
        }

        if let Some(value) = input.read_timeout_ms {
            ensure_valid_timeout(value)?;
            current.read_timeout_ms = value;
        }

        if let Some(value) = input.max_retries {
            if value > MAX_RETRIES_LIMIT {
                return Err(AppError::validation(format!(
                    "重试次数不能超过 {MAX_RETRIES_LIMIT}"
                )));
            }
            current.max_retries = value;
        }

        if let Some(value) = input.notifications_enabled {
            current.notifications_enabled = value;
        }
        if let Some(value) = input.email_enabled {
            current.email_enabled = value;
        }
        if let Some(value) = input.webhook_enabled {
            current.webhook_enabled = value;
        }
        if let Some(url) = input.webhook_url.as_ref() {
            current.webhook_url = url.trim().to_string();
        }
        if current.webhook_enabled && current.webhook_url.is_empty() {
            return Err(AppError::validation(
                "启用 Webhook 通知时必须填写 Webhook URL",
            ));
        }

        if let Some(value) = input.quality_warning_threshold {
            ensure_valid_score(value)?;
            current.quality_warning_threshold = value;
        }
        if let Some(value) = input.quality_critical_threshold {
            ensure_valid_score(value)?;
            current.quality_critical_threshold = value;
        }
        if current.quality_warning_threshold <= current.quality_critical_threshold {
            return Err(AppError::validation("质量警告阈值必须高于严重阈值"));
        }

        if let Some(value) = input.bug_warning_hours {
            ensure_valid_hours(value)?;
            current.bug_warning_hours = value;
        }
        if let Some(value) = input.bug_critical_hours {
            ensure_valid_hours(value)?;
            current.bug_critical_hours = value;
        }
        if current.bug_warning_hours >= current.bug_critical_hours {
            return Err(AppError::validation("Bug 处理警告阈值必须低于严重阈值"));
        }

        if let Some(path) = input.reports_path.as_ref() {
            let trimmed = path.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("报表输出目录不能为空"));
            }
            current.reports_path = trimmed.to_string();
        }

        let token_instruction = self.prepare_token_instruction(&input)?;
        if let Some(masked) = token_instruction.masked.clone() {
            current.access_token = Some(masked);
        } else if matches!(token_instruction.action, TokenAction::Clear) {
            current.access_token = None;
        }

        self.persist_changes(&current, &input, &token_instruction)?;
        current.updated_at = Utc::now().to_rfc3339();

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        Ok(current)
    }

    pub fn clear_sensitive(&self) -> AppResult<()> {
        self.db
            .with_connection(|conn| CredentialRepository::delete(conn, KEY_ACCESS_TOKEN))?;

        if let Err(err) = self.vault.clear_master_secret() {
            warn!(
                target: "app::settings",
                error = %err,
                "failed to clear master secret from system keyring"
            );
        }

        if let Ok(mut guard) = self.cache.write() {
            if let Some(settings) = guard.as_mut() {
                settings.access_token = None;
                settings.updated_at = Utc::now().to_rfc3339();
            }
        }

        Ok(())
    }

    fn persist_changes(
        &self,
        current: &AppSettings,
        input: &SettingsUpdateInput,
        token_instr: &TokenInstruction,
    ) -> AppResult<()> {
        // Cross-field checks may have passed because of another value in
        // the same call, so persist from the validated aggregate.
        self.db.with_connection(|conn| {
            match token_instr.action {
                TokenAction::Set => {
                    if let Some(cipher) = token_instr.ciphertext.as_ref() {
                        CredentialRepository::upsert(conn, KEY_ACCESS_TOKEN, cipher)?;
                    }
                }
                TokenAction::Clear => {
                    CredentialRepository::delete(conn, KEY_ACCESS_TOKEN)?;
                }
                TokenAction::NoChange => {}
            }

            if input.gitlab_api_url.is_some() {
                SettingsRepository::upsert(conn, KEY_GITLAB_API_URL, &current.gitlab_api_url)?;
            }
            if input.connect_timeout_ms.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_CONNECT_TIMEOUT_MS,
                    &current.connect_timeout_ms.to_string(),
                )?;
            }
            if input.read_timeout_ms.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_READ_TIMEOUT_MS,
                    &current.read_timeout_ms.to_string(),
                )?;
            }
            if input.max_retries.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_MAX_RETRIES,
                    &current.max_retries.to_string(),
                )?;
            }
            if input.notifications_enabled.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_NOTIFICATIONS_ENABLED,
                    &current.notifications_enabled.to_string(),
                )?;
            }
            if input.email_enabled.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_EMAIL_ENABLED,
                    &current.email_enabled.to_string(),
                )?;
            }
            if input.webhook_enabled.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_WEBHOOK_ENABLED,
                    &current.webhook_enabled.to_string(),
                )?;
            }
            if input.webhook_url.is_some() {
                SettingsRepository::upsert(conn, KEY_WEBHOOK_URL, &current.webhook_url)?;
            }
            if input.quality_warning_threshold.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_QUALITY_WARNING,
                    &current.quality_warning_threshold.to_string(),
                )?;
            }
            if input.quality_critical_threshold.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_QUALITY_CRITICAL,
                    &current.quality_critical_threshold.to_string(),
                )?;
            }
            if input.bug_warning_hours.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_BUG_WARNING_HOURS,
                    &current.bug_warning_hours.to_string(),
                )?;
            }
            if input.bug_critical_hours.is_some() {
                SettingsRepository::upsert(
                    conn,
                    KEY_BUG_CRITICAL_HOURS,
                    &current.bug_critical_hours.to_string(),
                )?;
            }
            if input.reports_path.is_some() {
                SettingsRepository::upsert(conn, KEY_REPORTS_PATH, &current.reports_path)?;
            }

            Ok(())
        })
    }

    fn prepare_token_instruction(
        &self,
        input: &SettingsUpdateInput,
    ) -> AppResult<TokenInstruction> {
        match &input.access_token {
            None => Ok(TokenInstruction::no_change()),
            Some(None) => Ok(TokenInstruction::clear()),
            Some(Some(value)) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AppError::validation("访问令牌不能为空"));
                }
                let cipher = self.vault.encrypt(trimmed.as_bytes())?;
                let masked = Some(mask_token(trimmed));
                Ok(TokenInstruction::set(cipher, masked))
            }
        }
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        self.db.with_connection(|conn| {
            let rows = SettingsRepository::list(conn)?;
            let mut map: HashMap<String, SettingRow> = HashMap::new();
            let mut latest_updated_at: Option<String> = None;

            for row in rows {
                latest_updated_at = match latest_updated_at {
                    Some(ref current) if current >= &row.updated_at => Some(current.clone()),
                    _ => Some(row.updated_at.clone()),
                };
                map.insert(row.key.clone(), row);
            }

            let token_row = CredentialRepository::get(conn, KEY_ACCESS_TOKEN)?;
            if let Some(row) = token_row.as_ref() {
                latest_updated_at = match latest_updated_at {
                    Some(ref current) if current >= &row.updated_at => Some(current.clone()),
                    _ => Some(row.updated_at.clone()),
                };
            }

            let access_token = if let Some(row) = token_row {
                match self.vault.decrypt(&row.value) {
                    Ok(plain) => match String::from_utf8(plain) {
                        Ok(value) => Some(mask_token(&value)),
                        Err(_) => {
                            warn!(
                                target: "app::settings",
                                "stored access token is not valid UTF-8"
                            );
                            None
                        }
                    },
                    Err(err) => {
                        warn!(
                            target: "app::settings",
                            error = %err,
                            "failed to decrypt stored access token"
                        );
                        None
                    }
                }
            } else {
                None
            };

            let gitlab_api_url = map
                .get(KEY_GITLAB_API_URL)
                .map(|row| row.value.clone())
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GITLAB_API_URL.to_string());

            let connect_timeout_ms =
                parse_or(&map, KEY_CONNECT_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS);
            let read_timeout_ms = parse_or(&map, KEY_READ_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS);
            let max_retries = parse_or(&map, KEY_MAX_RETRIES, DEFAULT_MAX_RETRIES);
            let notifications_enabled = parse_or(&map, KEY_NOTIFICATIONS_ENABLED, true);
            let email_enabled = parse_or(&map, KEY_EMAIL_ENABLED, false);
            let webhook_enabled = parse_or(&map, KEY_WEBHOOK_ENABLED, false);
            let webhook_url = map
                .get(KEY_WEBHOOK_URL)
                .map(|row| row.value.clone())
                .unwrap_or_default();
            let quality_warning_threshold =
                parse_or(&map, KEY_QUALITY_WARNING, DEFAULT_QUALITY_WARNING);
            let quality_critical_threshold =
                parse_or(&map, KEY_QUALITY_CRITICAL, DEFAULT_QUALITY_CRITICAL);
            let bug_warning_hours =
                parse_or(&map, KEY_BUG_WARNING_HOURS, DEFAULT_BUG_WARNING_HOURS);
            let bug_critical_hours =
                parse_or(&map, KEY_BUG_CRITICAL_HOURS, DEFAULT_BUG_CRITICAL_HOURS);
            let reports_path = map
                .get(KEY_REPORTS_PATH)
                .map(|row| row.value.clone())
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REPORTS_PATH.to_string());

            let updated_at = latest_updated_at.unwrap_or_else(|| Utc::now().to_rfc3339());

            Ok(AppSettings {
                gitlab_api_url,
                access_token,
                connect_timeout_ms,
                read_timeout_ms,
                max_retries,
                notifications_enabled,
                email_enabled,
                webhook_enabled,
                webhook_url,
                quality_warning_threshold,
                quality_critical_threshold,
                bug_warning_hours,
                bug_critical_hours,
                reports_path,
                updated_at,
            })
        })
    }
}

fn parse_or<T: std::str::FromStr>(map: &HashMap<String, SettingRow>, key: &str, default: T) -> T {
    map.get(key)
        .and_then(|row| row.value.parse::<T>().ok())
        .unwrap_or(default)
}

fn mask_token(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    let masked_prefix = "*".repeat(chars.len() - 4);
    format!("{}{}", masked_prefix, visible)
}

fn ensure_valid_timeout(value: u64) -> AppResult<()> {
    if !TIMEOUT_RANGE_MS.contains(&value) {
        return Err(AppError::validation("超时时间必须在 1000~60000 毫秒之间"));
    }
    Ok(())
}

fn ensure_valid_score(value: f64) -> AppResult<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(AppError::validation("阈值必须在 0~100 分之间"));
    }
    Ok(())
}

fn ensure_valid_hours(value: f64) -> AppResult<()> {
    if value <= 0.0 || value > 24.0 * 365.0 {
        return Err(AppError::validation("小时阈值必须为正数"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct TokenInstruction {
    action: TokenAction,
    ciphertext: Option<String>,
    masked: Option<String>,
}

impl TokenInstruction {
    fn no_change() -> Self {
        Self {
            action: TokenAction::NoChange,
            ciphertext: None,
            masked: None,
        }
    }

    fn clear() -> Self {
        Self {
            action: TokenAction::Clear,
            ciphertext: None,
            masked: None,
        }
    }

    fn set(ciphertext: String, masked: Option<String>) -> Self {
        Self {
            action: TokenAction::Set,
            ciphertext: Some(ciphertext),
            masked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenAction {
    Set,
    Clear,
    NoChange,
}
