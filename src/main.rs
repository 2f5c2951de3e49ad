mod commands;
mod gateway;

use checkin_channels::telegram::TelegramChannel;
use checkin_core::{
    catalog::Catalog,
    config::{self, Config},
    shellexpand,
    traits::{AnswerStore, Channel},
};
use checkin_memory::Store;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "checkin",
    version,
    about = "Scheduled self-tracking check-ins over Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Show configuration, catalog, and store summary.
    Status,
    /// Check config and catalog, and print the trigger plan.
    Validate,
    /// Print the chart URL for a key from the local store.
    Graph {
        /// Question key to chart.
        key: String,
    },
    /// Print every stored answer for a key.
    History {
        /// Question key.
        key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_logging(&cfg);

    match cli.command {
        Commands::Start => start(cfg).await?,
        Commands::Status => status(&cli.config, &cfg).await,
        Commands::Validate => validate(&cfg)?,
        Commands::Graph { key } => {
            let store = Store::new(&cfg.memory).await?;
            let series = store.get_values(&key).await?;
            if series.values.is_empty() {
                anyhow::bail!("no answers recorded for '{key}'");
            }
            println!("{}", gateway::chart::chart_url(&key, &series));
        }
        Commands::History { key } => {
            let store = Store::new(&cfg.memory).await?;
            let answers = store.answers_for_key(&key).await?;
            if answers.is_empty() {
                println!("No answers recorded for '{key}'.");
            }
            for answer in answers {
                let at = DateTime::<Utc>::from_timestamp(answer.timestamp, 0)
                    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| answer.timestamp.to_string());
                println!(
                    "{at}\tweek {}\t{}",
                    answer.calendar.year_week, answer.answer
                );
            }
        }
    }

    Ok(())
}

/// Stderr plus a daily-rolling file under `{data_dir}/logs`.
fn init_logging(cfg: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.checkin.log_level))
    };
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = PathBuf::from(shellexpand(&cfg.checkin.data_dir)).join("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        tracing_subscriber::registry()
            .with(filter())
            .with(stderr_layer)
            .init();
        tracing::warn!("file logging disabled, cannot create {}: {e}", log_dir.display());
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "checkin.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter())
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();
    Some(guard)
}

async fn start(cfg: Config) -> anyhow::Result<()> {
    cfg.validate()?;
    let catalog = Arc::new(Catalog::load(&cfg.catalog.path)?);

    let Some(tg) = cfg.channel.telegram.clone() else {
        anyhow::bail!("Telegram is not configured");
    };
    let target = tg.chat_id.to_string();
    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(tg, &cfg.auth));
    let store: Arc<dyn AnswerStore> = Arc::new(Store::new(&cfg.memory).await?);

    println!("checkin: starting bot...");
    let gw = gateway::Gateway::new(
        channel,
        store,
        catalog,
        target,
        cfg.survey.clone(),
        &cfg.schedule,
    )?;
    gw.run().await
}

async fn status(config_path: &str, cfg: &Config) {
    println!("checkin: status\n");
    println!("Config: {config_path}");

    match cfg.channel.telegram {
        Some(ref tg) => println!(
            "  telegram: {}",
            if !tg.enabled {
                "disabled"
            } else if tg.bot_token.is_empty() {
                "enabled but missing bot_token"
            } else if tg.chat_id == 0 {
                "enabled but missing chat_id"
            } else {
                "configured"
            }
        ),
        None => println!("  telegram: not configured"),
    }

    match Catalog::load(&cfg.catalog.path) {
        Ok(catalog) => println!(
            "  catalog: {} categories, {} questions ({})",
            catalog.categories().len(),
            catalog.question_count(),
            cfg.catalog.path
        ),
        Err(e) => println!("  catalog: {e}"),
    }

    match Store::new(&cfg.memory).await {
        Ok(store) => match store.answer_count().await {
            Ok(count) => println!("  answers: {count} stored in {}", cfg.memory.db_path),
            Err(e) => println!("  answers: {e}"),
        },
        Err(e) => println!("  answers: {e}"),
    }
}

fn validate(cfg: &Config) -> anyhow::Result<()> {
    cfg.validate()?;
    let catalog = Catalog::load(&cfg.catalog.path)?;
    let triggers = gateway::scheduler::plan(&catalog, &cfg.schedule)?;

    println!(
        "OK: {} categories, {} questions, {} triggers",
        catalog.categories().len(),
        catalog.question_count(),
        triggers.len()
    );
    let now = Local::now().naive_local();
    for trigger in &triggers {
        println!(
            "  {:<20} {:<28} next {}",
            trigger.category,
            format!("{:?}", trigger.rule),
            trigger.rule.next_after(now).format("%a %Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
