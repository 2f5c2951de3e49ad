//! Gateway: the event loop connecting the channel, the survey runner, and the store.
//!
//! The router is the only consumer of inbound events. Commands are answered
//! inline; replies are handed to the pending question, if any.

pub mod chart;
pub mod conversation;
pub mod scheduler;
pub mod survey;


use crate::commands::{self, Command, StatusView};
use checkin_core::{
    catalog::Catalog,
    config::SurveyConfig,
    message::{InboundEvent, OutgoingMessage},
    traits::{AnswerStore, Channel},
};
use chrono::Local;
use conversation::Reply;
use scheduler::{AdHoc, TriggerScheduler};
use std::sync::Arc;
use survey::SurveyRunner;
use tracing::{error, info, warn};

/// The central gateway that routes owner messages to the survey engine.
pub struct Gateway {
    channel: Arc<dyn Channel>,
    store: Arc<dyn AnswerStore>,
    catalog: Arc<Catalog>,
    runner: SurveyRunner,
    scheduler: TriggerScheduler,
    survey_config: SurveyConfig,
    /// Owner chat; every outgoing message goes here.
    target: String,
}

impl Gateway {
    /// Wire the runner and scheduler. Fails on a bad schedule.
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Arc<dyn AnswerStore>,
        catalog: Arc<Catalog>,
        target: String,
        survey_config: SurveyConfig,
        schedule: &checkin_core::config::ScheduleConfig,
    ) -> anyhow::Result<Self> {
        let runner = SurveyRunner::new(
            channel.clone(),
            store.clone(),
            Arc::new(conversation::ConversationState::new()),
            target.clone(),
            survey_config.clone(),
        );
        let scheduler = TriggerScheduler::new(catalog.clone(), runner.clone(), schedule)?;
        Ok(Self {
            channel,
            store,
            catalog,
            runner,
            scheduler,
            survey_config,
            target,
        })
    }

    /// Run the main event loop until Ctrl-C.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;

        let handles = self.scheduler.spawn();
        info!(
            "checkin gateway running | channel: {} | categories: {} | triggers: {}",
            self.channel.name(),
            self.catalog.categories().len(),
            handles.len(),
        );

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        warn!("channel closed its event stream");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        for handle in &handles {
            handle.abort();
        }
        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel: {e}");
        }
        info!("Shutdown complete.");
        Ok(())
    }

    /// Route one inbound event from the owner.
    pub async fn handle_event(&self, event: InboundEvent) {
        if let Some(cmd) = Command::parse(&event.text) {
            info!("command from owner: {cmd:?}");
            self.handle_command(cmd).await;
            return;
        }

        let reply = match event.location {
            Some(point) => Reply::Location(point),
            None => Reply::Answer {
                text: event.text.trim().to_string(),
                message_id: event.message_id,
            },
        };
        if !self.runner.state().deliver(reply) {
            self.send_text(&self.survey_config.no_question_message).await;
        }
    }

    async fn handle_command(&self, cmd: Command) {
        let state = self.runner.state();
        match cmd {
            Command::Skip => {
                if !state.deliver(Reply::Skip) {
                    self.send_text(&self.survey_config.no_question_message).await;
                }
            }
            Command::SkipAll => {
                if !state.request_skip_all() && !self.runner.is_running() {
                    self.send_text(&self.survey_config.no_question_message).await;
                }
            }
            Command::Track(arg) => {
                if arg.is_empty() {
                    self.send_text("Usage: /track <category or key>").await;
                    return;
                }
                if self.scheduler.trigger(&arg) == AdHoc::Busy {
                    self.send_text(&self.survey_config.busy_message).await;
                }
            }
            Command::Graph(key) => self.handle_graph(&key).await,
            Command::Status => {
                let pending = state.pending();
                let upcoming = self.scheduler.upcoming(Local::now().naive_local(), 5);
                let text = commands::format_status(&StatusView {
                    running: self.runner.is_running(),
                    pending_key: pending.as_ref().map(|p| p.key.as_str()),
                    pending_since: pending.as_ref().map(|p| p.sent_at),
                    answer_count: self.store.answer_count().await.ok(),
                    upcoming: &upcoming,
                });
                self.send_text(&text).await;
            }
            Command::Help => self.send_text(&commands::format_help(&self.catalog)).await,
            Command::Other(name) => match self.scheduler.trigger_category(&name) {
                AdHoc::Started => {}
                AdHoc::Busy => self.send_text(&self.survey_config.busy_message).await,
                AdHoc::NotFound => {
                    self.send_text(&format!("Unknown command /{name}. Try /help."))
                        .await
                }
            },
        }
    }

    /// Chart recent values for `key`. Bypasses the survey runner.
    async fn handle_graph(&self, key: &str) {
        if key.is_empty() {
            self.send_text("Usage: /graph <key>").await;
            return;
        }
        let series = match self.store.get_values(key).await {
            Ok(series) => series,
            Err(e) => {
                error!("graph: failed to load '{key}': {e}");
                self.send_text(&format!("Could not chart '{key}': {e}")).await;
                return;
            }
        };
        if series.values.is_empty() {
            self.send_text(&format!("No answers recorded for '{key}' yet."))
                .await;
            return;
        }
        let url = chart::chart_url(key, &series);
        if let Err(e) = self.channel.send_image_url(&self.target, &url).await {
            error!("graph: failed to send chart for '{key}': {e}");
            self.send_text(&format!("Failed to send chart: {e}")).await;
        }
    }

    /// Best-effort text to the owner.
    async fn send_text(&self, text: &str) {
        if let Err(e) = self
            .channel
            .send(OutgoingMessage::text(&self.target, text))
            .await
        {
            warn!("failed to send message: {e}");
        }
    }
}
