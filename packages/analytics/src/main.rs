//! CLI entry point for the `prep-analytics` command-line tool.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use prep_analytics::config::AnalyticsConfig;
use prep_analytics::insights::{profile_stats, strongest_topics, summarize_session, weakest_topics, SummaryParams};
use prep_analytics::logging::init_tracing;
use prep_analytics::model::{AnalyticsSnapshot, QuizAttempt, QuizSession, SessionKind};
use prep_analytics::pipeline::SessionPipeline;
use prep_analytics::store::{KnowledgeStore, SqliteStore};

#[derive(Parser)]
#[command(name = "prep-analytics", about = "Per-topic mastery tracking for quiz sessions")]
struct Cli {
    /// SQLite database path (overrides PREP_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold a finished session (JSON file) into the user's knowledge state
    Ingest {
        #[arg(long)]
        user: String,
        /// Path to the session JSON
        file: PathBuf,
    },
    /// List topics ordered by mastery
    Topics {
        #[arg(long)]
        user: String,
        /// Strongest first instead of weakest first
        #[arg(long)]
        strongest: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Profile totals and a summary of the latest session
    Summary {
        #[arg(long)]
        user: String,
    },
}

/// Session payload as produced by the quiz engine
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionInput {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default = "default_kind")]
    kind: SessionKind,
    #[serde(default)]
    subject: Option<String>,
    score: f64,
    total_marks: f64,
    attempts: Vec<QuizAttempt>,
}

fn default_kind() -> SessionKind {
    SessionKind::Practice
}

impl SessionInput {
    fn into_session(self, user_id: String) -> QuizSession {
        QuizSession {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            user_id,
            completed_at: self.completed_at.unwrap_or_else(Utc::now),
            kind: self.kind,
            subject: self.subject,
            score: self.score,
            total_marks: self.total_marks,
            attempts: self.attempts,
        }
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = AnalyticsConfig::from_env();
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }
    let _log_guard = init_tracing(&config.log_level);

    if let Err(e) = run(cli.command, &config) {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Commands, config: &AnalyticsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&config.db_path)?;

    match command {
        Commands::Ingest { user, file } => {
            let raw = std::fs::read_to_string(&file)?;
            let input: SessionInput = serde_json::from_str(&raw)?;
            let session = input.into_session(user);

            let pipeline = SessionPipeline::new(store, config)?;
            let outcome = pipeline.process_session(&session)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Topics {
            user,
            strongest,
            limit,
        } => {
            let analytics = store.load_analytics(&user)?;
            let limit = limit.unwrap_or(config.topic_limit);
            let topics = if strongest {
                strongest_topics(&analytics, limit)
            } else {
                weakest_topics(&analytics, limit)
            };
            println!("{}", serde_json::to_string_pretty(&topics)?);
        }
        Commands::Summary { user } => {
            let sessions = store.load_sessions(&user)?;
            let stats = profile_stats(&sessions);

            let latest = match sessions.first() {
                Some(latest) => {
                    let practiced: AnalyticsSnapshot = store
                        .load_analytics(&user)?
                        .into_iter()
                        .filter(|(topic, _)| latest.attempts.iter().any(|a| &a.topic == topic))
                        .collect();
                    let prior: Vec<f64> =
                        sessions[1..].iter().rev().map(|s| s.score_percent()).collect();
                    let params = SummaryParams {
                        correctness_threshold: config.aggregator.correctness_threshold,
                        population_mean: config.percentile_mean,
                        population_std_dev: config.percentile_std_dev,
                    };
                    Some(summarize_session(latest, &practiced, &prior, &params))
                }
                None => None,
            };

            let report = serde_json::json!({
                "profile": stats,
                "latestSession": latest,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
