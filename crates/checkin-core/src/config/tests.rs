use super::*;
use std::collections::HashMap;

fn valid_config() -> Config {
    let mut cfg = Config::default();
    cfg.channel.telegram = Some(TelegramConfig {
        bot_token: "123:abc".into(),
        chat_id: 42,
        ..Default::default()
    });
    cfg
}

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.survey.answer_timeout_mins, 30);
    assert_eq!(cfg.memory.max_graph_points, 300);
    assert_eq!(cfg.memory.backend, "sqlite");
    assert_eq!(cfg.catalog.path, "lifesheet.json");
    assert_eq!(cfg.schedule.wake, "08:00");
    assert_eq!(cfg.schedule.sleep, "22:00");
    assert_eq!(cfg.schedule.times_daily.len(), 5);
    assert!(cfg.channel.telegram.is_none());
}

#[test]
fn test_parse_toml_with_partial_sections() {
    let toml_str = r#"
        [channel.telegram]
        bot_token = "123:abc"
        chat_id = 99

        [survey]
        answer_timeout_mins = 10

        [schedule]
        weekly_day = "monday"
        times_daily = ["10:00", "16:30"]
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    let tg = cfg.channel.telegram.as_ref().unwrap();
    assert!(tg.enabled);
    assert_eq!(tg.chat_id, 99);
    assert_eq!(tg.poll_timeout_secs, 30);
    assert_eq!(cfg.survey.answer_timeout_mins, 10);
    assert_eq!(cfg.survey.ack_message, "\u{1f44d}");
    assert_eq!(cfg.schedule.wake, "08:00");
    let (day, time) = cfg.schedule.weekly().unwrap();
    assert_eq!(day, Weekday::Mon);
    assert_eq!(time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    assert_eq!(cfg.schedule.times_daily().unwrap().len(), 2);
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("TELEGRAM_TOKEN", "999:xyz"),
        ("TELEGRAM_CHAT_ID", "-100123"),
        ("LIFESHEET_FILE", "/etc/checkin/sheet.json"),
        ("CHECKIN_DB_PATH", "/var/lib/checkin.db"),
    ]
    .into_iter()
    .collect();

    let mut cfg = Config::default();
    cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

    let tg = cfg.channel.telegram.as_ref().unwrap();
    assert_eq!(tg.bot_token, "999:xyz");
    assert_eq!(tg.chat_id, -100123);
    assert_eq!(cfg.catalog.path, "/etc/checkin/sheet.json");
    assert_eq!(cfg.memory.db_path, "/var/lib/checkin.db");
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_env_invalid_chat_id() {
    let mut cfg = Config::default();
    let err = cfg
        .apply_env(|k| (k == "TELEGRAM_CHAT_ID").then(|| "not-a-number".to_string()))
        .unwrap_err();
    assert!(matches!(err, CheckinError::Config(_)));
}

#[test]
fn test_empty_env_values_are_ignored() {
    let mut cfg = valid_config();
    cfg.apply_env(|_| Some(String::new())).unwrap();
    assert_eq!(cfg.channel.telegram.unwrap().bot_token, "123:abc");
}

#[test]
fn test_validate_requires_telegram() {
    let err = Config::default().validate().unwrap_err();
    assert!(err.to_string().contains("Telegram is not configured"));

    let mut cfg = valid_config();
    cfg.channel.telegram.as_mut().unwrap().bot_token.clear();
    assert!(cfg.validate().unwrap_err().to_string().contains("bot_token"));

    let mut cfg = valid_config();
    cfg.channel.telegram.as_mut().unwrap().chat_id = 0;
    assert!(cfg.validate().unwrap_err().to_string().contains("chat_id"));
}

#[test]
fn test_validate_rejects_bad_schedule_times() {
    let mut cfg = valid_config();
    cfg.schedule.wake = "25:00".into();
    assert!(cfg.validate().is_err());

    let mut cfg = valid_config();
    cfg.schedule.weekly_day = "someday".into();
    assert!(cfg.validate().is_err());

    let mut cfg = valid_config();
    cfg.schedule.times_daily.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let mut cfg = valid_config();
    cfg.survey.answer_timeout_mins = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_bounds_timeout() {
    let mut cfg = valid_config();
    cfg.survey.answer_timeout_mins = MAX_ANSWER_TIMEOUT_MINS;
    assert!(cfg.validate().is_ok());
    cfg.survey.answer_timeout_mins = u64::MAX;
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("answer_timeout_mins"));
}

#[test]
fn test_validate_rejects_non_positive_graph_cap() {
    let mut cfg = valid_config();
    cfg.memory.max_graph_points = 0;
    assert!(cfg.validate().is_err());
    cfg.memory.max_graph_points = -5;
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("max_graph_points"));
}

#[test]
fn test_parse_clock_formats() {
    assert_eq!(
        parse_clock("08:00").unwrap(),
        NaiveTime::from_hms_opt(8, 0, 0).unwrap()
    );
    assert_eq!(
        parse_clock("21:30:15").unwrap(),
        NaiveTime::from_hms_opt(21, 30, 15).unwrap()
    );
    assert!(parse_clock("8am").is_err());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__checkin__/config.toml").unwrap();
    assert_eq!(cfg.survey.answer_timeout_mins, 30);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[memory]\nmax_graph_points = 50\n").unwrap();
    let cfg = load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.memory.max_graph_points, 50);
}

#[test]
fn test_load_malformed_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[memory\nbroken").unwrap();
    assert!(matches!(
        load(path.to_str().unwrap()),
        Err(CheckinError::Config(_))
    ));
}
