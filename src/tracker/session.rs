use std::sync::Arc;

use chrono::Duration;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::{
    error::{StoreError, TrackerError, ValidationError},
    notify::Notifier,
    store::entities::{EntryId, NewTimeEntry, Project, ProjectSnapshot, TimeEntry, UserId},
    utils::clock::Clock,
};

use super::{
    reconcile::{reconcile, Reconciled, TimerForm},
    stopwatch::Stopwatch,
    TrackerContext,
};

/// Store write running in the background. Awaiting it is optional: failures are reported
/// through the [Notifier] either way.
pub struct PendingWrite {
    handle: JoinHandle<Result<(), StoreError>>,
}

impl PendingWrite {
    pub async fn wait(self) -> Result<(), TrackerError> {
        Ok(self.handle.await??)
    }
}

/// Timer of a single view: the form, the stopwatch and the entry it is tracking.
///
/// The running entry in the store is the source of truth. Local state is either re-derived from
/// it ([TimerSession::apply_open_entry]) or changed optimistically by
/// [TimerSession::start_entry] and [TimerSession::stop_entry].
pub struct TimerSession {
    context: TrackerContext,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    stopwatch: Stopwatch,
    form: TimerForm,
    active_entry: Option<EntryId>,
    projects: Vec<Project>,
}

impl TimerSession {
    pub fn new(
        context: TrackerContext,
        clock: Arc<dyn Clock>,
        notifier: Notifier,
        tick: std::time::Duration,
    ) -> Self {
        Self {
            stopwatch: Stopwatch::new(clock.clone(), tick),
            context,
            clock,
            notifier,
            form: TimerForm::default(),
            active_entry: None,
            projects: vec![],
        }
    }

    pub fn form(&self) -> &TimerForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut TimerForm {
        &mut self.form
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn active_entry(&self) -> Option<&EntryId> {
        self.active_entry.as_ref()
    }

    /// Projects used to snapshot name and color into new entries.
    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    pub async fn load_projects(&mut self) -> Result<(), TrackerError> {
        let user = self.context.require_user()?;
        self.projects = self.context.store.projects(user).await?;
        Ok(())
    }

    /// Re-derives local state from the latest open entry observed in the store.
    pub fn apply_open_entry(&mut self, open: Option<&TimeEntry>) {
        match reconcile(open, self.clock.time()) {
            Reconciled::Resume {
                entry_id,
                elapsed,
                form,
            } => {
                debug!("Resuming entry {entry_id} at {elapsed}");
                self.stopwatch.reset(elapsed);
                self.stopwatch.start();
                self.form = form;
                self.active_entry = Some(entry_id);
            }
            Reconciled::Idle => {
                self.stopwatch.stop();
                self.stopwatch.reset(Duration::zero());
                self.active_entry = None;
            }
        }
    }

    /// Applies every value published by an open entry subscription until `shutdown` is
    /// cancelled or the subscription ends.
    pub async fn follow(
        &mut self,
        mut feed: watch::Receiver<Option<TimeEntry>>,
        shutdown: CancellationToken,
    ) {
        let latest = feed.borrow_and_update().clone();
        self.apply_open_entry(latest.as_ref());
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = feed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = feed.borrow_and_update().clone();
                    self.apply_open_entry(latest.as_ref());
                }
            }
        }
    }

    fn validate_start(&self) -> Result<UserId, ValidationError> {
        let user = self.context.require_user()?.clone();
        if self.form.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.active_entry.is_some() {
            return Err(ValidationError::AlreadyRunning);
        }
        Ok(user)
    }

    fn snapshot(&self) -> Option<ProjectSnapshot> {
        let project_id = self.form.project_id.as_ref()?;
        self.projects
            .iter()
            .find(|project| &project.id == project_id)
            .map(ProjectSnapshot::from)
    }

    /// Writes a new open entry from the form and starts the stopwatch once the store has
    /// assigned an identifier.
    #[instrument(skip(self))]
    pub async fn start_entry(&mut self) -> Result<EntryId, TrackerError> {
        let user = match self.validate_start() {
            Ok(user) => user,
            Err(e) => {
                self.notifier.warn(&e);
                return Err(e.into());
            }
        };

        let entry = NewTimeEntry {
            description: self.form.description.clone(),
            start_time: self.clock.time(),
            project_id: self.form.project_id.clone(),
            project: self.snapshot(),
            is_billable: self.form.is_billable,
            user_id: user.clone(),
        };

        match self.context.store.create_entry(&user, entry).await {
            Ok(id) => {
                info!("Started entry {id}");
                self.active_entry = Some(id.clone());
                self.stopwatch.start();
                Ok(id)
            }
            Err(e) => {
                error!("Failed to create entry {e:?}");
                self.notifier.store_failure("start the timer", &e);
                Err(e.into())
            }
        }
    }

    /// Closes the active entry and clears the local state without waiting for the store.
    /// Returns `None` when there was nothing to stop.
    #[instrument(skip(self))]
    pub fn stop_entry(&mut self) -> Option<PendingWrite> {
        let (Some(user), Some(id)) = (self.context.user.clone(), self.active_entry.clone())
        else {
            return None;
        };

        let store = self.context.store.clone();
        let notifier = self.notifier.clone();
        let end_time = self.clock.time();
        let handle = tokio::spawn(async move {
            store
                .set_entry_end(&user, &id, end_time)
                .await
                .inspect(|_| info!("Stopped entry {id}"))
                .inspect_err(|e| {
                    error!("Failed to stop entry {id}: {e:?}");
                    notifier.store_failure("stop the timer", e);
                })
        });

        self.stopwatch.stop();
        self.stopwatch.reset(Duration::zero());
        self.form = TimerForm::default();
        self.active_entry = None;

        Some(PendingWrite { handle })
    }
}
