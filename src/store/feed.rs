use std::{sync::Arc, time::Duration};

use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{error::StoreError, notify::Notifier, utils::clock::Clock};

use super::{
    entities::{TimeEntry, UserId},
    DocumentStore,
};

/// Subscription to "the open entry of this user". Polls the store and publishes the latest
/// one-or-none result through a watch channel, only when it differs from the previous one.
pub struct OpenEntryFeed {
    store: Arc<dyn DocumentStore>,
    user: UserId,
    interval: Duration,
    clock: Arc<dyn Clock>,
    sender: watch::Sender<Option<TimeEntry>>,
    refresh: Arc<Notify>,
    notifier: Notifier,
}

/// Forces the feed to query the store right away instead of waiting for the next poll.
#[derive(Clone)]
pub struct Refresher(Arc<Notify>);

impl Refresher {
    pub fn refresh(&self) {
        self.0.notify_one();
    }
}

impl OpenEntryFeed {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        user: UserId,
        interval: Duration,
        clock: Arc<dyn Clock>,
        notifier: Notifier,
    ) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            store,
            user,
            interval,
            clock,
            sender,
            refresh: Arc::new(Notify::new()),
            notifier,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TimeEntry>> {
        self.sender.subscribe()
    }

    pub fn refresher(&self) -> Refresher {
        Refresher(self.refresh.clone())
    }

    /// Queries the store once. Returns whether subscribers were notified.
    pub async fn poll_once(&self) -> Result<bool, StoreError> {
        let latest = self.store.open_entry(&self.user).await?;
        Ok(self.sender.send_if_modified(|current| {
            if *current == latest {
                false
            } else {
                debug!("Open entry changed to {:?}", latest.as_ref().map(|e| &e.id));
                *current = latest;
                true
            }
        }))
    }

    /// Executes the polling loop until `shutdown` is cancelled. A failed query keeps the last
    /// published value.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut poll_point = self.clock.instant();
        loop {
            poll_point += self.interval;

            if let Err(e) = self.poll_once().await {
                error!("Failed to query open entry {e:?}");
                self.notifier.store_failure("load the running entry", &e);
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Open entry feed stopped");
                    return;
                }
                _ = self.refresh.notified() => {
                    poll_point = self.clock.instant();
                }
                _ = self.clock.sleep_until(poll_point) => ()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::Utc;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{
        error::StoreError,
        notify::{Notification, Notifier},
        store::{
            entities::{NewTimeEntry, UserId},
            memory::MemoryStore,
            DocumentStore, MockDocumentStore,
        },
        utils::{clock::test_clock::TestClock, logging::TEST_LOGGING},
    };

    use super::OpenEntryFeed;

    fn new_entry(user: &UserId) -> NewTimeEntry {
        NewTimeEntry {
            description: "focus".into(),
            start_time: Utc::now(),
            project_id: None,
            project: None,
            is_billable: false,
            user_id: user.clone(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_publishes_only_changes() -> Result<()> {
        *TEST_LOGGING;
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let (notifier, _notifications) = Notifier::channel(8);
        let feed = OpenEntryFeed::new(
            store.clone(),
            user.clone(),
            Duration::from_secs(1),
            Arc::new(TestClock::new()),
            notifier,
        );
        let mut receiver = feed.subscribe();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(feed.run(shutdown.clone()));

        let id = store.create_entry(&user, new_entry(&user)).await?;
        receiver.changed().await?;
        assert_eq!(
            receiver.borrow_and_update().as_ref().map(|e| e.id.clone()),
            Some(id.clone())
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!receiver.has_changed()?);

        store.set_entry_end(&user, &id, Utc::now()).await?;
        receiver.changed().await?;
        assert!(receiver.borrow_and_update().is_none());

        shutdown.cancel();
        task.await?;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_polls_immediately() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let (notifier, _notifications) = Notifier::channel(8);
        let feed = OpenEntryFeed::new(
            store.clone(),
            user.clone(),
            Duration::from_secs(3600),
            Arc::new(TestClock::new()),
            notifier,
        );
        let mut receiver = feed.subscribe();
        let refresher = feed.refresher();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(feed.run(shutdown.clone()));
        tokio::task::yield_now().await;

        let started = Instant::now();
        store.create_entry(&user, new_entry(&user)).await?;
        refresher.refresh();
        receiver.changed().await?;
        assert!(started.elapsed() < Duration::from_secs(3600));

        shutdown.cancel();
        task.await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_poll_is_reported() -> Result<()> {
        let mut store = MockDocumentStore::new();
        store
            .expect_open_entry()
            .returning(|_| Err(StoreError::Unavailable("offline".into())));
        let (notifier, mut notifications) = Notifier::channel(8);
        let feed = OpenEntryFeed::new(
            Arc::new(store),
            UserId::from("u1"),
            Duration::from_secs(60),
            Arc::new(TestClock::new()),
            notifier,
        );
        let receiver = feed.subscribe();
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        feed.run(shutdown).await;

        assert!(matches!(
            notifications.try_recv()?,
            Notification::StoreFailure { .. }
        ));
        assert!(receiver.borrow().is_none());
        Ok(())
    }
}
