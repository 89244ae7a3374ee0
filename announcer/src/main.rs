// Announcer CLI entry point
//
// Subcommands:
//   announce        announce talks over the webhook (or dry-run)
//   process-folder  scan the inbox and deliver due artifacts
//   copy-to-drafts  render talk files into draft artifacts

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use common::catalog::TalkCatalog;
use common::compose::NotificationComposer;
use common::config::Settings;
use common::dispatch::{DeliveryDispatcher, DispatcherConfig};
use common::drafts::DraftsGenerator;
use common::folder::FolderPipeline;
use common::models::TalkOutcome;
use common::queue::{RedisTaskQueue, TaskQueue};
use common::sender::WebhookSender;
use common::telemetry::init_logging;
use common::timing::TimeGate;

/// Conference talk announcements
#[derive(Debug, Parser)]
#[command(name = "announcer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Announce talks to the webhook at their trigger times
    Announce(AnnounceArgs),
    /// Scan the inbox folder and deliver due artifacts
    ProcessFolder(ProcessFolderArgs),
    /// Render talk files into draft artifacts
    CopyToDrafts(CopyToDraftsArgs),
}

#[derive(Debug, Args)]
struct AnnounceArgs {
    /// Directory (or single file) where talks are stored
    #[arg(long)]
    talks_path: Option<PathBuf>,

    /// URL for the webhook to the Q & A channel
    #[arg(long, env = "ANNOUNCER_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Pretend the talks are happening now instead of queueing them up
    /// later (for testing)
    #[arg(long)]
    post_now: bool,
}

#[derive(Debug, Args)]
struct ProcessFolderArgs {
    /// Deliver every inbox artifact regardless of its trigger time
    #[arg(long)]
    post_now: bool,
}

#[derive(Debug, Args)]
struct CopyToDraftsArgs {
    /// Directory where talks are stored
    #[arg(long)]
    talks_path: Option<PathBuf>,
}

fn red(message: &str) -> String {
    format!("\x1b[31m{message}\x1b[0m")
}

fn yellow(message: &str) -> String {
    format!("\x1b[33m{message}\x1b[0m")
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", red(&format!("Failed to load configuration: {e}")));
            return ExitCode::FAILURE;
        }
    };
    if let Err(reason) = settings.validate() {
        eprintln!("{}", red(&format!("Invalid configuration: {reason}")));
        return ExitCode::FAILURE;
    }

    if let Err(e) = init_logging(&settings.observability.log_level, false) {
        eprintln!("{}", red(&format!("Failed to initialize logging: {e}")));
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Announce(args) => announce(args, settings).await,
        Commands::ProcessFolder(args) => process_folder(args, settings).await,
        Commands::CopyToDrafts(args) => copy_to_drafts(args, settings),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", red(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

async fn announce(args: AnnounceArgs, settings: Settings) -> Result<ExitCode> {
    let talks_path = args
        .talks_path
        .unwrap_or_else(|| settings.announcer.talks_path.clone());
    if !talks_path.exists() {
        eprintln!(
            "{}",
            red(&format!("talks-path '{}' does not exist", talks_path.display()))
        );
        return Ok(ExitCode::FAILURE);
    }

    let webhook_url = args.webhook_url.or_else(|| settings.webhook.url.clone());

    let gate = TimeGate::new(settings.conference.timezone);
    let catalog = TalkCatalog::new(gate).load(&talks_path)?;

    // The broker's mere presence selects scheduled mode
    let queue: Option<Arc<dyn TaskQueue>> = match (&webhook_url, &settings.broker.url) {
        (Some(_), Some(broker_url)) => {
            let queue = RedisTaskQueue::connect(broker_url, &settings.broker.queue_key).await?;
            queue.health_check().await?;
            Some(Arc::new(queue))
        }
        (Some(_), None) => {
            eprintln!(
                "{}",
                yellow("Warning: no broker configured; posting messages synchronously")
            );
            None
        }
        _ => None,
    };

    let composer = NotificationComposer::new(
        settings.conference.site_base_url.clone(),
        settings.conference.discussion_channel_id.clone(),
    );
    let sender = Arc::new(WebhookSender::new(settings.webhook.timeout_seconds)?);
    let dispatcher = DeliveryDispatcher::new(
        DispatcherConfig {
            webhook_url,
            ignored_categories: settings.announcer.ignored_categories.clone(),
            pause: Duration::from_secs(settings.announcer.pause_seconds),
            post_now: args.post_now,
        },
        composer,
        gate,
        sender,
        queue,
    );

    let report = dispatcher.announce_all(&catalog).await;

    println!(
        "{} scheduled, {} delivered, {} dry-run, {} skipped, {} failed",
        report.scheduled(),
        report.delivered(),
        report.dry_run(),
        report.skipped(),
        report.failed()
    );
    for entry in &report.entries {
        if let TalkOutcome::Failed(reason) = &entry.outcome {
            eprintln!("{}", red(&format!("{}::{}", entry.path.display(), reason)));
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn process_folder(args: ProcessFolderArgs, settings: Settings) -> Result<ExitCode> {
    let gate = TimeGate::new(settings.conference.timezone);
    let now = chrono::Utc::now();
    println!("{}", yellow(&format!("now: {}", gate.to_conference_time(now))));

    let pipeline = FolderPipeline::new(&settings.folders, gate);
    if let Err(e) = pipeline.ensure_folders() {
        eprintln!("{}", red(&e.to_string()));
        return Ok(ExitCode::FAILURE);
    }

    let sender = WebhookSender::new(settings.webhook.timeout_seconds)?;
    let report = pipeline
        .scan_and_deliver(&sender, settings.webhook.url.as_deref(), now, args.post_now)
        .await?;

    for path in &report.delivered {
        println!("delivered {}", path.display());
    }
    for path in &report.would_deliver {
        println!("{}", yellow(&format!("would deliver {}", path.display())));
    }
    for path in &report.skipped_duplicate {
        println!(
            "{}",
            yellow(&format!("already in outbox, skipped {}", path.display()))
        );
    }
    for (path, reason) in &report.failed {
        eprintln!("{}", red(&format!("{}::{}", path.display(), reason)));
    }
    println!(
        "{} delivered, {} not yet due, {} failed",
        report.delivered.len(),
        report.not_due,
        report.failed.len()
    );

    Ok(ExitCode::SUCCESS)
}

fn copy_to_drafts(args: CopyToDraftsArgs, settings: Settings) -> Result<ExitCode> {
    let talks_path = args
        .talks_path
        .unwrap_or_else(|| settings.announcer.talks_path.clone());
    if !talks_path.exists() {
        eprintln!(
            "{}",
            red(&format!("talks-path '{}' does not exist", talks_path.display()))
        );
        return Ok(ExitCode::FAILURE);
    }
    if !settings.folders.drafts.is_dir() {
        eprintln!(
            "{}",
            red(&format!(
                "drafts folder '{}' does not exist",
                settings.folders.drafts.display()
            ))
        );
        return Ok(ExitCode::FAILURE);
    }

    let gate = TimeGate::new(settings.conference.timezone);
    let catalog = TalkCatalog::new(gate).load(&talks_path)?;
    let generator = DraftsGenerator::new(
        settings.folders.drafts.clone(),
        &settings.announcer.templates_glob,
    )?;

    let report = generator.generate(&catalog);
    for path in &report.written {
        println!("copying {}", path.display());
    }
    for (path, reason) in &report.failed {
        eprintln!("{}", red(&format!("{}::{}", path.display(), reason)));
    }

    Ok(ExitCode::SUCCESS)
}
