use chrono::{DateTime, Duration, Utc};

use crate::store::entities::{EntryId, ProjectId, TimeEntry};

/// Values of the "what are you working on" form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerForm {
    pub description: String,
    pub project_id: Option<ProjectId>,
    pub is_billable: bool,
}

impl From<&TimeEntry> for TimerForm {
    fn from(entry: &TimeEntry) -> Self {
        Self {
            description: entry.description.clone(),
            project_id: entry.project_id.clone(),
            is_billable: entry.is_billable,
        }
    }
}

/// Local state derived from the latest observed open entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// Something is running in the store: continue the stopwatch from its start time.
    Resume {
        entry_id: EntryId,
        elapsed: Duration,
        form: TimerForm,
    },
    /// Nothing is running: the stopwatch rests at zero.
    Idle,
}

/// The store is authoritative, so the next stopwatch state depends only on the open entry and
/// the current time, never on what the stopwatch showed before.
pub fn reconcile(open: Option<&TimeEntry>, now: DateTime<Utc>) -> Reconciled {
    match open {
        Some(entry) => Reconciled::Resume {
            entry_id: entry.id.clone(),
            elapsed: (now - entry.start_time).max(Duration::zero()),
            form: TimerForm::from(entry),
        },
        None => Reconciled::Idle,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::store::entities::{EntryId, ProjectId, TimeEntry, UserId};

    use super::{reconcile, Reconciled, TimerForm};

    fn open_entry(start_ms: i64) -> TimeEntry {
        TimeEntry {
            id: EntryId::from("E1"),
            description: "Review".into(),
            start_time: Utc.timestamp_millis_opt(start_ms).unwrap(),
            end_time: None,
            project_id: Some(ProjectId::from("p1")),
            project: None,
            tags: vec![],
            is_billable: true,
            user_id: UserId::from("u1"),
        }
    }

    #[test]
    fn test_open_entry_resumes() {
        let now = Utc.timestamp_millis_opt(1_000_000).unwrap();
        let entry = open_entry(1_000_000 - 65_000);

        assert_eq!(
            reconcile(Some(&entry), now),
            Reconciled::Resume {
                entry_id: EntryId::from("E1"),
                elapsed: Duration::milliseconds(65_000),
                form: TimerForm {
                    description: "Review".into(),
                    project_id: Some(ProjectId::from("p1")),
                    is_billable: true,
                },
            }
        );
    }

    #[test]
    fn test_no_entry_is_idle() {
        assert_eq!(reconcile(None, Utc::now()), Reconciled::Idle);
    }

    #[test]
    fn test_entry_from_the_future_starts_at_zero() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let Reconciled::Resume { elapsed, .. } = reconcile(Some(&open_entry(5_000)), now) else {
            panic!("expected resume");
        };
        assert_eq!(elapsed, Duration::zero());
    }
}
