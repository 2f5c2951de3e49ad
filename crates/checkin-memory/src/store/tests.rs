use super::Store;
use checkin_core::{
    answer::{CalendarFields, NewAnswer},
    error::CheckinError,
    traits::AnswerStore,
};
use chrono::{DateTime, Local, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Create an in-memory store for testing.
async fn test_store(max_graph_points: i64) -> Store {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .unwrap();
    Store::run_migrations(&pool).await.unwrap();
    Store {
        pool,
        max_graph_points,
    }
}

/// Local noon on the given day, as UTC.
fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, m, d, 12, 0, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

fn answer_at(key: &str, value: &str, at: DateTime<Utc>) -> NewAnswer {
    NewAnswer {
        key: key.into(),
        answer: value.into(),
        question_type: "number".into(),
        timestamp: Some(at),
    }
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let store = test_store(300).await;
    Store::run_migrations(store.pool()).await.unwrap();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_save_answer_derives_calendar_fields() {
    let store = test_store(300).await;
    let at = local_noon(2024, 1, 3);
    let saved = store.save_answer(answer_at("mood", "4", at)).await.unwrap();

    assert!(!saved.id.is_empty());
    assert_eq!(saved.timestamp, at.timestamp());
    assert_eq!(saved.calendar, CalendarFields::derive(&at.with_timezone(&Local)));
    assert_eq!(saved.calendar.year_week, 202401);
    assert_eq!(saved.calendar.quarter, 1);
    assert_eq!(saved.calendar.hour, 12);

    let stored = store.answers_for_key("mood").await.unwrap();
    assert_eq!(stored, vec![saved]);
}

#[tokio::test]
async fn test_save_answer_assigns_fresh_ids_and_default_timestamp() {
    let store = test_store(300).await;
    let before = Utc::now().timestamp();
    let a = store
        .save_answer(NewAnswer::new("notes", "fine", "free-text"))
        .await
        .unwrap();
    let b = store
        .save_answer(NewAnswer::new("notes", "fine", "free-text"))
        .await
        .unwrap();
    assert_ne!(a.id, b.id);
    assert!(a.timestamp >= before);
    assert_eq!(store.answer_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_get_values_mood_series() {
    let store = test_store(300).await;
    store
        .save_answer(answer_at("mood", "2", local_noon(2024, 1, 1)))
        .await
        .unwrap();
    store
        .save_answer(answer_at("mood", "5", local_noon(2024, 1, 2)))
        .await
        .unwrap();
    store
        .save_answer(answer_at("mood", "3", local_noon(2024, 1, 3)))
        .await
        .unwrap();
    store
        .save_answer(answer_at("energy", "9", local_noon(2024, 1, 3)))
        .await
        .unwrap();

    let series = store.get_values("mood").await.unwrap();
    assert_eq!(series.values, vec![2.0, 5.0, 3.0]);
    assert_eq!(series.times, vec!["01-01", "02-01", "03-01"]);
    assert_eq!(series.maximum, 5.0);
    // Bounds start at zero: an all-positive series reports minimum 0, not 2.
    assert_eq!(series.minimum, 0.0);
}

#[tokio::test]
async fn test_get_values_caps_to_most_recent() {
    let store = test_store(2).await;
    for (day, value) in [(1, "1"), (2, "2"), (3, "3")] {
        store
            .save_answer(answer_at("mood", value, local_noon(2024, 2, day)))
            .await
            .unwrap();
    }
    let series = store.get_values("mood").await.unwrap();
    assert_eq!(series.values, vec![2.0, 3.0]);
    assert_eq!(series.times, vec!["02-02", "03-02"]);
}

#[tokio::test]
async fn test_get_values_non_numeric_is_error() {
    let store = test_store(300).await;
    store
        .save_answer(answer_at("mood", "meh", local_noon(2024, 1, 1)))
        .await
        .unwrap();
    let err = store.get_values("mood").await.unwrap_err();
    assert!(matches!(err, CheckinError::Protocol(_)));
}

#[tokio::test]
async fn test_get_values_unknown_key_is_empty() {
    let store = test_store(300).await;
    let series = store.get_values("nothing").await.unwrap();
    assert!(series.values.is_empty());
    assert!(series.times.is_empty());
}

#[tokio::test]
async fn test_new_creates_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("answers.db");
    let config = checkin_core::config::MemoryConfig {
        db_path: db_path.to_string_lossy().to_string(),
        ..Default::default()
    };
    let store = Store::new(&config).await.unwrap();
    store
        .save_answer(NewAnswer::new("mood", "3", "number"))
        .await
        .unwrap();
    assert!(db_path.exists());
    assert_eq!(store.answer_count().await.unwrap(), 1);
}
