//! Question catalog: categories of questions loaded once from JSON.
//!
//! File shape: an object keyed by category name, each
//! `{description, schedule, questions: [{key, question, type, buttons?, replies?}]}`.

use crate::{
    answer::{LOCATION_LAT_KEY, LOCATION_LONG_KEY},
    config::shellexpand,
    error::CheckinError,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// When a category is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleTag {
    /// Once a day in the morning.
    DailyWake,
    /// Once a day in the evening.
    DailySleep,
    /// Once a week.
    Weekly,
    /// Several fixed times spread across the day.
    TimesDaily,
}

impl ScheduleTag {
    pub const ALL: [ScheduleTag; 4] = [
        Self::DailyWake,
        Self::DailySleep,
        Self::Weekly,
        Self::TimesDaily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyWake => "daily-wake",
            Self::DailySleep => "daily-sleep",
            Self::Weekly => "weekly",
            Self::TimesDaily => "n-times-daily",
        }
    }
}

impl FromStr for ScheduleTag {
    type Err = CheckinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == lower)
            .ok_or_else(|| CheckinError::Catalog(format!("invalid schedule '{s}'")))
    }
}

impl fmt::Display for ScheduleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a question is asked and answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionKind {
    #[default]
    Text,
    Number,
    Boolean,
    Location,
    /// Informational line; sent but never awaits a reply.
    Header,
}

impl QuestionKind {
    /// Parse a catalog `type` value. Unknown types are asked as free text.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "text" | "free-text" => Self::Text,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "location" => Self::Location,
            "header" => Self::Header,
            other => {
                warn!("catalog: unknown question type '{other}', asking as free text");
                Self::Text
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "free-text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Location => "location",
            Self::Header => "header",
        }
    }
}

/// A single catalog question. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// Persistence field name, unique within its category.
    pub key: String,
    pub text: String,
    pub kind: QuestionKind,
    /// Callback value → button label.
    pub buttons: BTreeMap<String, String>,
    /// Answer text → acknowledgement echoed back to the user.
    pub replies: HashMap<String, String>,
}

/// A named group of questions sharing a delivery schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub schedule: ScheduleTag,
    pub questions: Vec<Question>,
}

/// The full catalog, ordered by category name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: Vec<Category>,
}

#[derive(Deserialize)]
struct RawCategory {
    #[serde(default)]
    description: String,
    schedule: String,
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion {
    key: String,
    #[serde(rename = "question")]
    text: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    buttons: BTreeMap<String, String>,
    #[serde(default)]
    replies: HashMap<String, String>,
}

impl Catalog {
    /// Load and validate a catalog file.
    pub fn load(path: &str) -> Result<Self, CheckinError> {
        let expanded = shellexpand(path);
        let content = std::fs::read_to_string(Path::new(&expanded))
            .map_err(|e| CheckinError::Catalog(format!("failed to read {expanded}: {e}")))?;
        let catalog = Self::from_json(&content)?;
        info!(
            "catalog: loaded {} categories, {} questions from {expanded}",
            catalog.categories.len(),
            catalog.question_count()
        );
        Ok(catalog)
    }

    /// Parse and validate catalog JSON.
    pub fn from_json(json: &str) -> Result<Self, CheckinError> {
        let raw: BTreeMap<String, RawCategory> = serde_json::from_str(json)
            .map_err(|e| CheckinError::Catalog(format!("failed to parse catalog: {e}")))?;

        let mut categories = Vec::with_capacity(raw.len());
        for (name, cat) in raw {
            let schedule = cat.schedule.parse::<ScheduleTag>().map_err(|_| {
                CheckinError::Catalog(format!(
                    "category '{name}': invalid schedule '{}'",
                    cat.schedule
                ))
            })?;

            let mut seen = HashSet::new();
            let mut questions = Vec::with_capacity(cat.questions.len());
            for q in cat.questions {
                let key = q.key.trim().to_string();
                if key.is_empty() {
                    return Err(CheckinError::Catalog(format!(
                        "category '{name}': question with empty key"
                    )));
                }
                if key == LOCATION_LAT_KEY || key == LOCATION_LONG_KEY {
                    return Err(CheckinError::Catalog(format!(
                        "category '{name}': key '{key}' is reserved for location answers"
                    )));
                }
                if !seen.insert(key.clone()) {
                    return Err(CheckinError::Catalog(format!(
                        "category '{name}': duplicate question key '{key}'"
                    )));
                }
                questions.push(Question {
                    key,
                    text: q.text,
                    kind: QuestionKind::parse(&q.kind),
                    buttons: q.buttons,
                    replies: q.replies,
                });
            }

            if questions.is_empty() {
                warn!("catalog: category '{name}' has no questions");
            }

            categories.push(Category {
                name,
                description: cat.description,
                schedule,
                questions,
            });
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a category by name, ignoring case.
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    /// First question with `key` across all categories, ignoring case.
    pub fn find_question(&self, key: &str) -> Option<&Question> {
        self.categories
            .iter()
            .flat_map(|c| c.questions.iter())
            .find(|q| q.key.eq_ignore_ascii_case(key.trim()))
    }

    pub fn question_count(&self) -> usize {
        self.categories.iter().map(|c| c.questions.len()).sum()
    }
}
