//! Trigger scheduler: maps schedule tags to local fire times and runs categories.

use super::survey::SurveyRunner;
use checkin_core::{
    catalog::{Catalog, Question, ScheduleTag},
    config::ScheduleConfig,
    error::CheckinError,
};
use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A recurring local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRule {
    Daily(NaiveTime),
    Weekly(Weekday, NaiveTime),
}

impl FireRule {
    /// Fire rules for a schedule tag under the configured times.
    pub fn for_tag(tag: ScheduleTag, schedule: &ScheduleConfig) -> Result<Vec<Self>, CheckinError> {
        Ok(match tag {
            ScheduleTag::DailyWake => vec![Self::Daily(schedule.wake_time()?)],
            ScheduleTag::DailySleep => vec![Self::Daily(schedule.sleep_time()?)],
            ScheduleTag::Weekly => {
                let (day, time) = schedule.weekly()?;
                vec![Self::Weekly(day, time)]
            }
            ScheduleTag::TimesDaily => schedule
                .times_daily()?
                .into_iter()
                .map(Self::Daily)
                .collect(),
        })
    }

    /// The first fire time strictly after `after`.
    pub fn next_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Self::Daily(time) => {
                let today = after.date().and_time(time);
                if today > after {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Self::Weekly(day, time) => {
                let ahead = (7 + day.num_days_from_monday() as i64
                    - after.weekday().num_days_from_monday() as i64)
                    % 7;
                let candidate = (after.date() + Duration::days(ahead)).and_time(time);
                if candidate > after {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
        }
    }
}

/// Wall-clock source for the firing loop.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Time left until a local wall-clock instant, zero if it has passed.
    /// `None` when the instant does not exist locally.
    fn until(&self, at: NaiveDateTime) -> Option<std::time::Duration>;
}

/// The process's local time zone.
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn until(&self, at: NaiveDateTime) -> Option<std::time::Duration> {
        // A wall-clock time inside a DST gap does not exist.
        let target = Local.from_local_datetime(&at).earliest()?;
        Some((target - Local::now()).to_std().unwrap_or_default())
    }
}

/// One category bound to one fire rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub category: String,
    pub rule: FireRule,
}

/// What happened to an ad-hoc `/track` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdHoc {
    Started,
    /// Another run holds the lock.
    Busy,
    NotFound,
}

/// Owns the trigger plan and starts runs, scheduled or on demand.
pub struct TriggerScheduler {
    catalog: Arc<Catalog>,
    runner: SurveyRunner,
    triggers: Vec<Trigger>,
    clock: Arc<dyn Clock>,
}

impl TriggerScheduler {
    /// Build the trigger plan. Any bad schedule time fails here, before serving.
    pub fn new(
        catalog: Arc<Catalog>,
        runner: SurveyRunner,
        schedule: &ScheduleConfig,
    ) -> Result<Self, CheckinError> {
        let triggers = plan(&catalog, schedule)?;
        Ok(Self {
            catalog,
            runner,
            triggers,
            clock: Arc::new(LocalClock),
        })
    }

    /// Replace the wall clock the firing loops read.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn one task per trigger. Scheduled runs queue behind an active run.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.triggers.len());
        for trigger in &self.triggers {
            let Some(category) = self.catalog.category(&trigger.category) else {
                continue;
            };
            let name = category.name.clone();
            let questions = category.questions.clone();
            let rule = trigger.rule;
            let runner = self.runner.clone();
            let clock = self.clock.clone();
            handles.push(tokio::spawn(async move {
                trigger_loop(runner, clock, name, questions, rule).await;
            }));
        }
        info!("scheduler: {} triggers armed", handles.len());
        handles
    }

    /// `/track <arg>`: a category by name first, then a single question by key.
    pub fn trigger(&self, arg: &str) -> AdHoc {
        if let Some(category) = self.catalog.category(arg) {
            return self.start(category.name.clone(), category.questions.clone());
        }
        if let Some(question) = self.catalog.find_question(arg) {
            return self.start(question.key.clone(), vec![question.clone()]);
        }
        debug!("scheduler: nothing to track for '{arg}'");
        AdHoc::NotFound
    }

    /// Run a whole category by name, if it exists.
    pub fn trigger_category(&self, name: &str) -> AdHoc {
        match self.catalog.category(name) {
            Some(category) => self.start(category.name.clone(), category.questions.clone()),
            None => AdHoc::NotFound,
        }
    }

    fn start(&self, label: String, questions: Vec<Question>) -> AdHoc {
        match self.runner.try_start(label.clone(), questions) {
            Some(_) => {
                info!("scheduler: ad-hoc run '{label}' started");
                AdHoc::Started
            }
            None => AdHoc::Busy,
        }
    }

    /// The next `limit` firings after `now`, soonest first.
    pub fn upcoming(&self, now: NaiveDateTime, limit: usize) -> Vec<(NaiveDateTime, String)> {
        let mut next: Vec<(NaiveDateTime, String)> = self
            .triggers
            .iter()
            .map(|t| (t.rule.next_after(now), t.category.clone()))
            .collect();
        next.sort();
        next.truncate(limit);
        next
    }
}

/// Bind every category to its fire rules.
pub fn plan(catalog: &Catalog, schedule: &ScheduleConfig) -> Result<Vec<Trigger>, CheckinError> {
    let mut triggers = Vec::new();
    for category in catalog.categories() {
        for rule in FireRule::for_tag(category.schedule, schedule)? {
            triggers.push(Trigger {
                category: category.name.clone(),
                rule,
            });
        }
    }
    Ok(triggers)
}

async fn trigger_loop(
    runner: SurveyRunner,
    clock: Arc<dyn Clock>,
    category: String,
    questions: Vec<Question>,
    rule: FireRule,
) {
    let mut last = clock.now();
    loop {
        let next = rule.next_after(clock.now().max(last));
        last = next;

        let Some(wait) = clock.until(next) else {
            warn!("scheduler: '{category}' fire time {next} does not exist locally, skipping");
            continue;
        };
        debug!("scheduler: '{category}' next at {next}");
        tokio::time::sleep(wait).await;

        info!("scheduler: firing '{category}'");
        runner.run_queued(&category, &questions).await;
    }
}
