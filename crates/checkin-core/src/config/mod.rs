use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::CheckinError;

/// Top-level checkin configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub checkin: CheckinConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub survey: SurveyConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Longest a question may wait for its answer.
pub const MAX_ANSWER_TIMEOUT_MINS: u64 = 24 * 60;

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Authentication configuration.
///
/// Only the configured owner chat may talk to the bot; everyone else gets
/// `deny_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_deny_message")]
    pub deny_message: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            deny_message: default_deny_message(),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    /// The owner chat. Questions go here; other chats are refused.
    #[serde(default)]
    pub chat_id: i64,
    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: String::new(),
            chat_id: 0,
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Answer store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Cap on points returned for a chart.
    #[serde(default = "default_max_graph_points")]
    pub max_graph_points: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            db_path: default_db_path(),
            max_graph_points: default_max_graph_points(),
        }
    }
}

/// Question catalog location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

/// Survey run behaviour and the fixed texts the bot sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Minutes to wait for a reply before abandoning the run.
    #[serde(default = "default_answer_timeout")]
    pub answer_timeout_mins: u64,
    #[serde(default = "default_timeout_message")]
    pub timeout_message: String,
    /// Sent after each stored reply.
    #[serde(default = "default_ack_message")]
    pub ack_message: String,
    #[serde(default = "default_no_question_message")]
    pub no_question_message: String,
    /// Sent when an ad-hoc run is refused because another run is active.
    #[serde(default = "default_busy_message")]
    pub busy_message: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            answer_timeout_mins: default_answer_timeout(),
            timeout_message: default_timeout_message(),
            ack_message: default_ack_message(),
            no_question_message: default_no_question_message(),
            busy_message: default_busy_message(),
        }
    }
}

/// Fire times for each schedule tag, in local `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_wake")]
    pub wake: String,
    #[serde(default = "default_sleep")]
    pub sleep: String,
    /// Day for weekly categories (e.g. "sun", "monday").
    #[serde(default = "default_weekly_day")]
    pub weekly_day: String,
    #[serde(default = "default_wake")]
    pub weekly_time: String,
    #[serde(default = "default_times_daily")]
    pub times_daily: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            wake: default_wake(),
            sleep: default_sleep(),
            weekly_day: default_weekly_day(),
            weekly_time: default_wake(),
            times_daily: default_times_daily(),
        }
    }
}

impl ScheduleConfig {
    pub fn wake_time(&self) -> Result<NaiveTime, CheckinError> {
        parse_clock(&self.wake)
    }

    pub fn sleep_time(&self) -> Result<NaiveTime, CheckinError> {
        parse_clock(&self.sleep)
    }

    pub fn weekly(&self) -> Result<(Weekday, NaiveTime), CheckinError> {
        let day = self.weekly_day.parse::<Weekday>().map_err(|_| {
            CheckinError::Config(format!("invalid weekly_day '{}'", self.weekly_day))
        })?;
        Ok((day, parse_clock(&self.weekly_time)?))
    }

    pub fn times_daily(&self) -> Result<Vec<NaiveTime>, CheckinError> {
        if self.times_daily.is_empty() {
            return Err(CheckinError::Config(
                "schedule.times_daily must list at least one time".into(),
            ));
        }
        self.times_daily.iter().map(|t| parse_clock(t)).collect()
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(s: &str) -> Result<NaiveTime, CheckinError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| CheckinError::Config(format!("invalid time of day '{s}'")))
}

impl Config {
    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Recognised: `TELEGRAM_TOKEN`, `TELEGRAM_CHAT_ID`, `LIFESHEET_FILE`,
    /// `CHECKIN_DB_PATH`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CheckinError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_TOKEN").filter(|v| !v.is_empty()) {
            self.channel
                .telegram
                .get_or_insert_with(TelegramConfig::default)
                .bot_token = token;
        }
        if let Some(raw) = lookup("TELEGRAM_CHAT_ID").filter(|v| !v.is_empty()) {
            let chat_id = raw.trim().parse::<i64>().map_err(|e| {
                CheckinError::Config(format!("invalid TELEGRAM_CHAT_ID '{raw}': {e}"))
            })?;
            self.channel
                .telegram
                .get_or_insert_with(TelegramConfig::default)
                .chat_id = chat_id;
        }
        if let Some(path) = lookup("LIFESHEET_FILE").filter(|v| !v.is_empty()) {
            self.catalog.path = path;
        }
        if let Some(path) = lookup("CHECKIN_DB_PATH").filter(|v| !v.is_empty()) {
            self.memory.db_path = path;
        }
        Ok(())
    }

    /// Check everything `start` needs. Fails fast on the first problem.
    pub fn validate(&self) -> Result<(), CheckinError> {
        let tg = self.channel.telegram.as_ref().ok_or_else(|| {
            CheckinError::Config(
                "Telegram is not configured. Set [channel.telegram] or TELEGRAM_TOKEN.".into(),
            )
        })?;
        if !tg.enabled {
            return Err(CheckinError::Config("Telegram channel is disabled".into()));
        }
        if tg.bot_token.is_empty() {
            return Err(CheckinError::Config(
                "Telegram bot_token is empty. Set it in config.toml or TELEGRAM_TOKEN env var."
                    .into(),
            ));
        }
        if tg.chat_id == 0 {
            return Err(CheckinError::Config(
                "Telegram chat_id is not set. Set it in config.toml or TELEGRAM_CHAT_ID env var."
                    .into(),
            ));
        }
        if self.memory.backend != "sqlite" {
            return Err(CheckinError::Config(format!(
                "unsupported memory backend '{}'",
                self.memory.backend
            )));
        }
        if self.memory.max_graph_points <= 0 {
            return Err(CheckinError::Config(
                "memory.max_graph_points must be greater than zero".into(),
            ));
        }
        if self.survey.answer_timeout_mins == 0 {
            return Err(CheckinError::Config(
                "survey.answer_timeout_mins must be greater than zero".into(),
            ));
        }
        if self.survey.answer_timeout_mins > MAX_ANSWER_TIMEOUT_MINS {
            return Err(CheckinError::Config(format!(
                "survey.answer_timeout_mins must be at most {MAX_ANSWER_TIMEOUT_MINS} (one day)"
            )));
        }
        self.schedule.wake_time()?;
        self.schedule.sleep_time()?;
        self.schedule.weekly()?;
        self.schedule.times_daily()?;
        Ok(())
    }
}

// --- Default value functions ---

fn default_data_dir() -> String {
    "~/.checkin".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_deny_message() -> String {
    "This is not the bot you're looking for".to_string()
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_memory_backend() -> String {
    "sqlite".to_string()
}
fn default_db_path() -> String {
    "~/.checkin/answers.db".to_string()
}
fn default_max_graph_points() -> i64 {
    300
}
fn default_catalog_path() -> String {
    "lifesheet.json".to_string()
}
fn default_answer_timeout() -> u64 {
    30
}
fn default_timeout_message() -> String {
    "Maybe you're busy, no worry. We'll skip the check-in for now".to_string()
}
fn default_ack_message() -> String {
    "\u{1f44d}".to_string()
}
fn default_no_question_message() -> String {
    "I didn't ask a question".to_string()
}
fn default_busy_message() -> String {
    "A check-in is already in progress. Finish it or send /skip_all first.".to_string()
}
fn default_wake() -> String {
    "08:00".to_string()
}
fn default_sleep() -> String {
    "22:00".to_string()
}
fn default_weekly_day() -> String {
    "sun".to_string()
}
fn default_times_daily() -> Vec<String> {
    ["09:00", "12:00", "15:00", "18:00", "21:00"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// A `.env` file in the working directory is loaded first. Falls back to
/// defaults if the config file does not exist.
pub fn load(path: &str) -> Result<Config, CheckinError> {
    match dotenvy::dotenv() {
        Ok(env_path) => info!("loaded environment from {}", env_path.display()),
        Err(e) => debug!("no .env loaded: {e}"),
    }

    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CheckinError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str::<Config>(&content)
            .map_err(|e| CheckinError::Config(format!("failed to parse config: {}", e)))?
    } else {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests;
