use std::io::Write;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    store::{
        entities::{ProjectId, TimeEntry},
        feed::{OpenEntryFeed, Refresher},
    },
    tracker::{
        session::TimerSession, shutdown::detect_shutdown, stopwatch::StopwatchState,
    },
    utils::clock::Clock,
};

use super::{output::timer_line, Environment};

#[derive(Debug, Parser)]
pub struct StartCommand {
    #[arg(help = "What you are working on")]
    description: String,
    #[arg(long, short, help = "Identifier of the project, see `project list`")]
    project: Option<String>,
    #[arg(long, short, help = "Mark the entry as billable")]
    billable: bool,
}

/// Session already reconciled with what is running in the store.
async fn restored_session(environment: &Environment) -> Result<TimerSession> {
    let mut session = TimerSession::new(
        environment.context.clone(),
        environment.clock.clone(),
        environment.notifier.clone(),
        environment.config.tick_interval(),
    );
    let user = environment.context.require_user()?;
    let open = environment.context.store.open_entry(user).await?;
    session.apply_open_entry(open.as_ref());
    Ok(session)
}

pub async fn process_start_command(
    environment: &Environment,
    StartCommand {
        description,
        project,
        billable,
    }: StartCommand,
) -> Result<()> {
    let mut session = restored_session(environment).await?;
    if project.is_some() {
        session.load_projects().await?;
    }
    let form = session.form_mut();
    form.description = description;
    form.project_id = project.map(ProjectId::from);
    form.is_billable = billable;

    let id = session.start_entry().await?;
    println!("Started {id}");
    Ok(())
}

pub async fn process_stop_command(environment: &Environment) -> Result<()> {
    let mut session = restored_session(environment).await?;
    let stopped = session.active_entry().cloned();
    match session.stop_entry() {
        Some(pending) => {
            pending.wait().await?;
            if let Some(id) = stopped {
                println!("Stopped {id}");
            }
        }
        None => environment.notifier.info("No timer running"),
    }
    Ok(())
}

pub async fn process_status_command(environment: &Environment) -> Result<()> {
    let user = environment.context.require_user()?;
    let open = environment.context.store.open_entry(user).await?;
    let elapsed = open
        .as_ref()
        .map(|entry| entry.duration_at(environment.clock.time()))
        .unwrap_or_else(chrono::Duration::zero);
    println!("{}", timer_line(elapsed, open.as_ref()));
    Ok(())
}

/// Redraws the timer line until `shutdown`.
async fn render(
    states: watch::Receiver<StopwatchState>,
    mut entries: watch::Receiver<Option<TimeEntry>>,
    shutdown: CancellationToken,
) {
    let mut states = WatchStream::new(states);
    let mut state = None;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = states.next() => match next {
                Some(next) => state = Some(next),
                None => break,
            },
            changed = entries.changed() => if changed.is_err() {
                break;
            }
        }
        let Some(current) = state else {
            continue;
        };
        let entry = entries.borrow().clone();
        let mut stdout = std::io::stdout();
        // Errors writing to the terminal aren't worth stopping the watch for.
        let _ = write!(stdout, "\r\x1b[2K{}", timer_line(current.elapsed, entry.as_ref()));
        let _ = stdout.flush();
    }
    println!();
}

/// Pressing Enter queries the store right away. Reads on a plain thread, a blocking read on
/// the runtime would keep it from shutting down.
fn refresh_on_enter(refresher: Refresher) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if let Err(e) = line {
                debug!("Stopped reading stdin {e:?}");
                break;
            }
            refresher.refresh();
        }
    });
}

pub async fn process_watch_command(environment: &Environment) -> Result<()> {
    let user = environment.context.require_user()?.clone();
    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    let feed = OpenEntryFeed::new(
        environment.context.store.clone(),
        user,
        environment.config.poll_interval(),
        environment.clock.clone(),
        environment.notifier.clone(),
    );
    let entries = feed.subscribe();
    let rendered_entries = feed.subscribe();
    refresh_on_enter(feed.refresher());
    let feed_task = tokio::spawn(feed.run(shutdown.clone()));

    let mut session = TimerSession::new(
        environment.context.clone(),
        environment.clock.clone(),
        environment.notifier.clone(),
        environment.config.tick_interval(),
    );
    let states = session.stopwatch().subscribe();

    tokio::join!(
        session.follow(entries, shutdown.clone()),
        render(states, rendered_entries, shutdown.clone())
    );
    feed_task.await?;
    info!("Watch finished");
    Ok(())
}
