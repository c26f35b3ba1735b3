use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tf_cli::commands::timer::TimerAction;
use tf_cli::commands::{
    export, import, log, report, reset, settings, status, sync, task, timer, watch,
};
use tf_cli::{Cli, Commands, Config, Document};

/// Load config and open the local document.
fn open_document(config_path: Option<&Path>) -> Result<Document> {
    let config = load_config(config_path)?;
    Ok(Document::open(&config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config_path = cli.config.as_deref();
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Task(action)) => {
            let mut doc = open_document(config_path)?;
            task::run(&mut stdout, &mut doc, action)?;
        }
        Some(Commands::Start { task }) => {
            let mut doc = open_document(config_path)?;
            timer::run(&mut doc, TimerAction::Start, task)?;
        }
        Some(Commands::Pause { task }) => {
            let mut doc = open_document(config_path)?;
            timer::run(&mut doc, TimerAction::Pause, task)?;
        }
        Some(Commands::Toggle { task }) => {
            let mut doc = open_document(config_path)?;
            timer::run(&mut doc, TimerAction::Toggle, task)?;
        }
        Some(Commands::Stop { task }) => {
            let mut doc = open_document(config_path)?;
            timer::run(&mut doc, TimerAction::Stop, task)?;
        }
        Some(Commands::Cancel { task, yes }) => {
            if !yes {
                anyhow::bail!("Cancelling discards the tracked time. Re-run with --yes to confirm.");
            }
            let mut doc = open_document(config_path)?;
            timer::run(&mut doc, TimerAction::Cancel, task)?;
        }
        Some(Commands::Log(action)) => {
            let mut doc = open_document(config_path)?;
            log::run(&mut stdout, &mut doc, action)?;
        }
        Some(Commands::Report(args)) => {
            let doc = open_document(config_path)?;
            report::run(doc.tracker.store(), args)?;
        }
        Some(Commands::Status) => {
            let doc = open_document(config_path)?;
            status::run(&mut stdout, doc.tracker.store(), Utc::now(), &Local)?;
        }
        Some(Commands::Watch {
            interval_ms,
            max_ticks,
        }) => {
            let doc = open_document(config_path)?;
            watch::run(&mut stdout, doc.file(), *interval_ms, *max_ticks)?;
        }
        Some(Commands::Settings(args)) => {
            let mut doc = open_document(config_path)?;
            settings::run(&mut stdout, &mut doc, args)?;
        }
        Some(Commands::Export { output }) => {
            let doc = open_document(config_path)?;
            export::run(&mut stdout, doc.tracker.state(), output.as_deref())?;
        }
        Some(Commands::Import { file, yes }) => {
            let state = import::read_backup(file)?;
            if !yes {
                anyhow::bail!(
                    "Importing replaces all current data with {} tasks and {} logs. Re-run with --yes to confirm.",
                    state.items.len(),
                    state.sessions.len()
                );
            }
            let mut doc = open_document(config_path)?;
            let (tasks, logs) = (state.items.len(), state.sessions.len());
            doc.replace(state);
            doc.save();
            println!("Imported {tasks} tasks and {logs} logs");
        }
        Some(Commands::Sync { user }) => {
            let mut config = load_config(config_path)?;
            if let Some(user) = user {
                config.set_user(user).map_err(anyhow::Error::msg)?;
            }
            let mut doc = Document::open_local(&config);
            let report = sync::run(&mut doc)?;
            println!(
                "Synced with '{}': {} tasks, {} logs ({} tasks and {} logs from remote)",
                report.user, report.tasks, report.logs, report.tasks_pulled, report.logs_pulled
            );
        }
        Some(Commands::Reset { yes }) => {
            let mut doc = open_document(config_path)?;
            reset::run(&mut doc, *yes)?;
            println!("All data deleted.");
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
