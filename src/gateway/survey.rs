//! Survey runner: asks an ordered list of questions one at a time.

use super::conversation::{ConversationState, Reply};
use checkin_core::{
    answer::{NewAnswer, LOCATION_LAT_KEY, LOCATION_LONG_KEY},
    catalog::{Question, QuestionKind},
    config::SurveyConfig,
    message::{GeoPoint, OutgoingMessage},
    traits::{AnswerStore, Channel},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every question was asked.
    Completed,
    /// The user sent `/skip_all`.
    SkippedAll,
    /// No reply to `key` within the answer timeout.
    TimedOut { key: String },
    /// The pending slot was dropped under the run.
    Interrupted { key: String },
}

/// Summary of one run, logged when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub label: String,
    pub outcome: RunOutcome,
    pub questions_sent: usize,
    pub answers_saved: usize,
}

/// Drives the conversation state through one run at a time.
#[derive(Clone)]
pub struct SurveyRunner {
    channel: Arc<dyn Channel>,
    store: Arc<dyn AnswerStore>,
    state: Arc<ConversationState>,
    run_lock: Arc<Mutex<()>>,
    target: String,
    config: SurveyConfig,
}

impl SurveyRunner {
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Arc<dyn AnswerStore>,
        state: Arc<ConversationState>,
        target: String,
        config: SurveyConfig,
    ) -> Self {
        Self {
            channel,
            store,
            state,
            run_lock: Arc::new(Mutex::new(())),
            target,
            config,
        }
    }

    pub fn state(&self) -> &Arc<ConversationState> {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Wait for any active run to finish, then run. Used by scheduled firings.
    pub async fn run_queued(&self, label: &str, questions: &[Question]) -> RunReport {
        let _guard = self.run_lock.lock().await;
        self.run_locked(label, questions).await
    }

    /// Start a run in the background unless one is already active.
    ///
    /// Returns `None` when the run lock is taken; ad-hoc runs never queue.
    pub fn try_start(&self, label: String, questions: Vec<Question>) -> Option<JoinHandle<RunReport>> {
        let guard = self.run_lock.clone().try_lock_owned().ok()?;
        let runner = self.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            runner.run_locked(&label, &questions).await
        }))
    }

    /// Ask each question in order. The caller holds the run lock.
    async fn run_locked(&self, label: &str, questions: &[Question]) -> RunReport {
        self.state.reset_run();
        info!("survey: starting '{label}' ({} questions)", questions.len());

        let mut report = RunReport {
            label: label.to_string(),
            outcome: RunOutcome::Completed,
            questions_sent: 0,
            answers_saved: 0,
        };
        let timeout = Duration::from_secs(self.config.answer_timeout_mins.saturating_mul(60));

        for question in questions {
            if self.state.skip_all_requested() {
                report.outcome = RunOutcome::SkippedAll;
                break;
            }

            if question.kind == QuestionKind::Header {
                self.state.begin_header(question);
                self.send_question(question).await;
                report.questions_sent += 1;
                self.state.clear();
                continue;
            }

            // Pending before the send, so a fast reply cannot miss the slot.
            let reply_rx = self.state.begin(question);
            self.send_question(question).await;
            report.questions_sent += 1;

            let reply = match tokio::time::timeout(timeout, reply_rx).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(_)) => {
                    warn!("survey: pending slot for '{}' dropped", question.key);
                    self.state.clear();
                    report.outcome = RunOutcome::Interrupted {
                        key: question.key.clone(),
                    };
                    break;
                }
                Err(_) => {
                    info!("survey: no reply to '{}', abandoning '{label}'", question.key);
                    self.state.clear();
                    self.notify(&self.config.timeout_message).await;
                    report.outcome = RunOutcome::TimedOut {
                        key: question.key.clone(),
                    };
                    break;
                }
            };

            match reply {
                Reply::Answer { text, message_id } => {
                    if let Some(canned) = question.replies.get(&text) {
                        let echo = OutgoingMessage::text(&self.target, canned.clone())
                            .replying_to(message_id);
                        if let Err(e) = self.channel.send(echo).await {
                            warn!("survey: canned reply for '{}' failed: {e}", question.key);
                        }
                    }
                    self.state.clear();
                    let answer = NewAnswer::new(&question.key, text, question.kind.as_str());
                    if self.save(answer).await {
                        report.answers_saved += 1;
                        self.notify(&self.config.ack_message).await;
                    }
                }
                Reply::Location(point) => {
                    let saved = self.save_location(point).await;
                    self.state.clear();
                    report.answers_saved += saved;
                    if saved > 0 {
                        self.notify(&self.config.ack_message).await;
                    }
                }
                Reply::Skip => {
                    self.state.clear();
                    info!("survey: skipped '{}'", question.key);
                }
                Reply::SkipAll => {
                    self.state.clear();
                    report.outcome = RunOutcome::SkippedAll;
                    break;
                }
            }
        }

        info!(
            "survey: '{label}' finished ({:?}, {} sent, {} saved)",
            report.outcome, report.questions_sent, report.answers_saved
        );
        report
    }

    /// Store both halves of a location reply. Returns how many were saved.
    async fn save_location(&self, point: GeoPoint) -> usize {
        let kind = QuestionKind::Location.as_str();
        let halves = [
            NewAnswer::new(LOCATION_LAT_KEY, format!("{:.6}", point.latitude), kind),
            NewAnswer::new(LOCATION_LONG_KEY, format!("{:.6}", point.longitude), kind),
        ];
        let mut saved = 0;
        for answer in halves {
            if self.save(answer).await {
                saved += 1;
            }
        }
        saved
    }

    /// Forward one answer to the store, reporting failure to the user.
    async fn save(&self, answer: NewAnswer) -> bool {
        let key = answer.key.clone();
        match self.store.save_answer(answer).await {
            Ok(saved) => {
                info!("survey: stored '{key}' ({})", saved.id);
                true
            }
            Err(e) => {
                error!("survey: failed to store '{key}': {e}");
                self.notify(&format!("Failed to save your answer for '{key}': {e}"))
                    .await;
                false
            }
        }
    }

    /// Send a question, echoing a failure back to the owner.
    async fn send_question(&self, question: &Question) {
        if let Err(e) = self
            .channel
            .send(OutgoingMessage::question(&self.target, question))
            .await
        {
            error!("survey: failed to send '{}': {e}", question.key);
            self.notify(&format!("Failed to send question '{}': {e}", question.key))
                .await;
        }
    }

    /// Best-effort plain message to the owner.
    async fn notify(&self, text: &str) {
        if let Err(e) = self
            .channel
            .send(OutgoingMessage::text(&self.target, text))
            .await
        {
            warn!("survey: failed to notify owner: {e}");
        }
    }
}
