pub mod output;
pub mod projects;
pub mod report;
pub mod settings;
pub mod timer;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use projects::{process_project_command, ProjectCommand};
use report::{
    process_delete_command, process_entries_command, process_summary_command, EntriesCommand,
    SummaryCommand,
};
use settings::{process_settings_command, SettingsCommand};
use timer::{
    process_start_command, process_status_command, process_stop_command, process_watch_command,
    StartCommand,
};
use tokio::sync::mpsc;

use crate::{
    config::AppConfig,
    notify::{Notification, Notifier},
    store::{entities::UserId, file_store::FileStore},
    tracker::TrackerContext,
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, resolve_level},
    },
};

const STORE_DIR: &str = "store";
const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "chronotrack", version, long_about = None)]
#[command(about = "Track the time you spend on your work", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Print debug logs to stderr")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "User the command acts as. Defaults to user_id from config.toml"
    )]
    user: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start tracking a new time entry")]
    Start {
        #[command(flatten)]
        command: StartCommand,
    },
    #[command(about = "Stop the running time entry")]
    Stop {},
    #[command(about = "Show the running time entry")]
    Status {},
    #[command(about = "Follow the running time entry until Ctrl-C")]
    Watch {},
    #[command(about = "List time entries of a day")]
    Entries {
        #[command(flatten)]
        command: EntriesCommand,
    },
    #[command(about = "Delete a time entry")]
    Delete { id: String },
    #[command(about = "Summarize tracked time")]
    Summary {
        #[command(flatten)]
        command: SummaryCommand,
    },
    #[command(about = "Manage projects")]
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    #[command(about = "Show or change user settings")]
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

/// Everything a command needs, resolved from flags and `config.toml`.
pub struct Environment {
    pub config: AppConfig,
    pub context: TrackerContext,
    pub clock: Arc<dyn Clock>,
    pub notifier: Notifier,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let env_level = std::env::var("RUST_LOG").ok();
    enable_logging(&app_dir, resolve_level(args.log, env_level.as_deref()), args.log)?;

    let config = AppConfig::load(&app_dir)?;
    let user = args
        .user
        .or_else(|| config.user_id.clone())
        .map(UserId::from);
    let store = FileStore::new(app_dir.join(STORE_DIR))
        .with_context(|| format!("Failed to open store in {}", app_dir.display()))?;

    let (notifier, notifications) = Notifier::channel(NOTIFICATION_CAPACITY);
    let printer = tokio::spawn(print_notifications(notifications));

    let environment = Environment {
        config,
        context: TrackerContext::new(user, Arc::new(store)),
        clock: Arc::new(DefaultClock),
        notifier,
    };

    let result = match args.commands {
        Commands::Start { command } => process_start_command(&environment, command).await,
        Commands::Stop {} => process_stop_command(&environment).await,
        Commands::Status {} => process_status_command(&environment).await,
        Commands::Watch {} => process_watch_command(&environment).await,
        Commands::Entries { command } => process_entries_command(&environment, command).await,
        Commands::Delete { id } => process_delete_command(&environment, id).await,
        Commands::Summary { command } => process_summary_command(&environment, command).await,
        Commands::Project { command } => process_project_command(&environment, command).await,
        Commands::Settings { command } => process_settings_command(&environment, command).await,
    };

    // Closes the channel so that the printer drains what is left and finishes.
    drop(environment);
    printer.await?;
    result
}

async fn print_notifications(mut notifications: mpsc::Receiver<Notification>) {
    while let Some(notification) = notifications.recv().await {
        eprintln!("{}", output::notification(&notification));
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Args, Commands};

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["chronotrack", "stop", "--user", "u1"]).unwrap();
        assert_eq!(args.user.as_deref(), Some("u1"));
        assert!(matches!(args.commands, Commands::Stop {}));
    }
}
