use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. Stopwatch ticks and
/// entry timestamps both go through it, which allows them to be driven by a fake clock in tests.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}


#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::{TimeDelta, TimeZone, Utc};

    use super::{
        test_clock::{TestClock, TEST_START_DATE},
        Clock,
    };

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_paused_time_and_shift() {
        let clock = TestClock::new();
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        assert_eq!(shared.time(), start);

        shared.sleep_until(shared.instant() + Duration::from_secs(3)).await;
        assert_eq!(shared.time(), start + TimeDelta::seconds(3));

        clock.shift(TimeDelta::seconds(-5));
        assert_eq!(shared.time(), start - TimeDelta::seconds(2));
    }
}
