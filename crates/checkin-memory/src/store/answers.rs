//! Answer persistence with derived calendar fields, and chart series queries.

use super::Store;
use async_trait::async_trait;
use checkin_core::{
    answer::{Answer, CalendarFields, NewAnswer, ValueSeries},
    error::CheckinError,
    traits::AnswerStore,
};
use chrono::{DateTime, Local, Utc};
use uuid::Uuid;

/// Day-month label for a chart point, in local time.
fn day_month_label(timestamp: i64) -> Result<String, CheckinError> {
    let at = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| CheckinError::Memory(format!("invalid stored timestamp {timestamp}")))?;
    Ok(at.with_timezone(&Local).format("%d-%m").to_string())
}

#[async_trait]
impl AnswerStore for Store {
    async fn save_answer(&self, answer: NewAnswer) -> Result<Answer, CheckinError> {
        let id = Uuid::new_v4().to_string();
        let at = answer.timestamp.unwrap_or_else(Utc::now);
        let calendar = CalendarFields::derive(&at.with_timezone(&Local));
        let timestamp = at.timestamp();

        sqlx::query(
            "INSERT INTO answers \
             (id, key, answer, question_type, timestamp, day, hour, minute, year, month, \
              quarter, week, year_week, year_month) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&answer.key)
        .bind(&answer.answer)
        .bind(&answer.question_type)
        .bind(timestamp)
        .bind(calendar.day)
        .bind(calendar.hour)
        .bind(calendar.minute)
        .bind(calendar.year)
        .bind(calendar.month)
        .bind(calendar.quarter)
        .bind(calendar.week)
        .bind(calendar.year_week)
        .bind(calendar.year_month)
        .execute(&self.pool)
        .await
        .map_err(|e| CheckinError::Memory(format!("failed to save answer: {e}")))?;

        Ok(Answer {
            id,
            key: answer.key,
            answer: answer.answer,
            question_type: answer.question_type,
            timestamp,
            calendar,
        })
    }

    async fn get_values(&self, key: &str) -> Result<ValueSeries, CheckinError> {
        let mut rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT answer, timestamp FROM answers \
             WHERE key = ? \
             ORDER BY timestamp DESC, rowid DESC \
             LIMIT ?",
        )
        .bind(key)
        .bind(self.max_graph_points)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CheckinError::Memory(format!("failed to get values: {e}")))?;

        // Oldest first so the chart reads left to right.
        rows.reverse();

        let points = rows
            .into_iter()
            .map(|(answer, ts)| day_month_label(ts).map(|label| (answer, label)))
            .collect::<Result<Vec<_>, _>>()?;

        ValueSeries::from_points(key, points)
    }

    async fn answer_count(&self) -> Result<i64, CheckinError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM answers")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CheckinError::Memory(format!("failed to count answers: {e}")))?;
        Ok(count)
    }
}

impl Store {
    /// All stored answers for `key`, oldest first.
    pub async fn answers_for_key(&self, key: &str) -> Result<Vec<Answer>, CheckinError> {
        #[allow(clippy::type_complexity)]
        let rows: Vec<(
            String,
            String,
            String,
            String,
            i64,
            u32,
            u32,
            u32,
            i32,
            u32,
            u32,
            u32,
            i64,
            i64,
        )> = sqlx::query_as(
            "SELECT id, key, answer, question_type, timestamp, day, hour, minute, year, month, \
                    quarter, week, year_week, year_month \
             FROM answers WHERE key = ? ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CheckinError::Memory(format!("failed to load answers: {e}")))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, key, answer, question_type, timestamp, day, hour, minute, year, month, quarter, week, year_week, year_month)| Answer {
                    id,
                    key,
                    answer,
                    question_type,
                    timestamp,
                    calendar: CalendarFields {
                        day,
                        hour,
                        minute,
                        year,
                        month,
                        quarter,
                        week,
                        year_week,
                        year_month,
                    },
                },
            )
            .collect())
    }
}
