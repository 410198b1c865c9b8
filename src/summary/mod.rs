//! Aggregations over time entries used by the `summary` command. All of them measure open
//! entries up to the `now` they are given.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::{
    store::entities::{Project, ProjectId, TimeEntry},
    utils::percentage::{duration_percentage, Percentage},
};

pub const DEFAULT_BILLABLE_RATE: f64 = 50.;

pub const UNKNOWN_PROJECT: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: Duration,
    pub billable: Duration,
    /// Billable hours multiplied by the hourly rate.
    pub billable_amount: f64,
    pub billable_share: Option<Percentage>,
    pub top_project: Option<ProjectUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectUsage {
    pub name: String,
    pub color: Option<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayUsage {
    pub date: NaiveDate,
    pub total: Duration,
    pub billable: Duration,
}

fn hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.
}

/// Totals of `entries`. The top project is decided by the name snapshotted into entries, so
/// entries of a since renamed project are counted under the old name.
pub fn summarize(entries: &[TimeEntry], now: DateTime<Utc>, rate: f64) -> Summary {
    let mut total = Duration::zero();
    let mut billable = Duration::zero();
    // Keeps the first seen order, ties go to the project seen first.
    let mut projects = Vec::<ProjectUsage>::new();

    for entry in entries {
        let duration = entry.duration_at(now);
        total += duration;
        if entry.is_billable {
            billable += duration;
        }
        let Some(snapshot) = &entry.project else {
            continue;
        };
        match projects.iter_mut().find(|p| p.name == snapshot.name) {
            Some(usage) => usage.duration += duration,
            None => projects.push(ProjectUsage {
                name: snapshot.name.clone(),
                color: Some(snapshot.color.clone()),
                duration,
            }),
        }
    }

    let top_project = projects.into_iter().fold(None, |top: Option<ProjectUsage>, current| {
        match top {
            Some(top) if top.duration >= current.duration => Some(top),
            _ => Some(current),
        }
    });

    Summary {
        total,
        billable,
        billable_amount: hours(billable) * rate,
        billable_share: duration_percentage(billable, total),
        top_project,
    }
}

/// Time per referenced project, longest first. Names and colors come from `projects`; entries
/// without a project are skipped.
pub fn time_by_project(
    entries: &[TimeEntry],
    projects: &[Project],
    now: DateTime<Utc>,
) -> Vec<ProjectUsage> {
    let mut map = HashMap::<&ProjectId, Duration>::new();
    for entry in entries {
        if let Some(project_id) = &entry.project_id {
            *map.entry(project_id).or_insert_with(Duration::zero) += entry.duration_at(now);
        }
    }

    let mut usages = map
        .into_iter()
        .map(|(id, duration)| {
            let project = projects.iter().find(|p| &p.id == id);
            ProjectUsage {
                name: project
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
                color: project.map(|p| p.color.clone()),
                duration,
            }
        })
        .collect::<Vec<_>>();
    usages.sort_by(|a, b| b.duration.cmp(&a.duration).then_with(|| a.name.cmp(&b.name)));
    usages
}

/// Seven consecutive days starting at `week_start`. Entries are attributed to the day their
/// start falls on in `tz`.
pub fn weekly_trend<Tz: TimeZone>(
    entries: &[TimeEntry],
    week_start: NaiveDate,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Vec<DayUsage> {
    let mut days = week_start
        .iter_days()
        .take(7)
        .map(|date| DayUsage {
            date,
            total: Duration::zero(),
            billable: Duration::zero(),
        })
        .collect::<Vec<_>>();

    for entry in entries {
        let date = entry.start_time.with_timezone(tz).date_naive();
        let Some(day) = days.iter_mut().find(|d| d.date == date) else {
            continue;
        };
        let duration = entry.duration_at(now);
        day.total += duration;
        if entry.is_billable {
            day.billable += duration;
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    use crate::store::entities::{
        EntryId, Project, ProjectId, ProjectSnapshot, TimeEntry, UserId,
    };

    use super::{summarize, time_by_project, weekly_trend, UNKNOWN_PROJECT};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 5, hour, minute, 0).unwrap()
    }

    fn entry(
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        project: Option<(&str, &str)>,
        billable: bool,
    ) -> TimeEntry {
        TimeEntry {
            id: EntryId::from(format!("e{}", start.timestamp())),
            description: "work".into(),
            start_time: start,
            end_time: end,
            project_id: project.map(|(id, _)| ProjectId::from(id)),
            project: project.map(|(_, name)| ProjectSnapshot {
                name: name.into(),
                color: "blue".into(),
            }),
            tags: vec![],
            is_billable: billable,
            user_id: UserId::from("u1"),
        }
    }

    #[test]
    fn test_summary_totals() {
        let now = at(12, 0);
        let entries = vec![
            entry(at(9, 0), Some(at(10, 0)), Some(("p1", "Docs")), true),
            entry(at(10, 0), Some(at(10, 30)), None, false),
            entry(at(11, 0), None, Some(("p2", "Ops")), true),
            entry(at(8, 0), Some(at(8, 30)), Some(("p2", "Ops")), false),
        ];

        let summary = summarize(&entries, now, 50.);

        assert_eq!(summary.total, Duration::minutes(180));
        assert_eq!(summary.billable, Duration::minutes(120));
        assert_eq!(summary.billable_amount, 100.);
        assert_eq!(summary.billable_share.map(|p| p.round()), Some(67.));
        let top = summary.top_project.unwrap();
        assert_eq!(top.name, "Ops");
        assert_eq!(top.duration, Duration::minutes(90));
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], at(12, 0), 50.);
        assert_eq!(summary.total, Duration::zero());
        assert_eq!(summary.billable_amount, 0.);
        assert!(summary.billable_share.is_none());
        assert!(summary.top_project.is_none());
    }

    #[test]
    fn test_top_project_tie_keeps_first() {
        let entries = vec![
            entry(at(9, 0), Some(at(10, 0)), Some(("p1", "Docs")), false),
            entry(at(10, 0), Some(at(11, 0)), Some(("p2", "Ops")), false),
        ];
        let summary = summarize(&entries, at(12, 0), 50.);
        assert_eq!(summary.top_project.unwrap().name, "Docs");
    }

    #[test]
    fn test_time_by_project_uses_current_names() {
        let projects = vec![Project {
            id: ProjectId::from("p1"),
            name: "Documentation".into(),
            description: None,
            color: "teal".into(),
            user_id: UserId::from("u1"),
        }];
        let entries = vec![
            entry(at(9, 0), Some(at(10, 0)), Some(("p1", "Docs")), false),
            entry(at(10, 0), Some(at(12, 0)), Some(("gone", "Old")), false),
            entry(at(8, 0), Some(at(9, 0)), None, false),
        ];

        let usages = time_by_project(&entries, &projects, at(12, 0));

        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].name, UNKNOWN_PROJECT);
        assert_eq!(usages[0].duration, Duration::hours(2));
        assert_eq!(usages[0].color, None);
        assert_eq!(usages[1].name, "Documentation");
        assert_eq!(usages[1].color.as_deref(), Some("teal"));
    }

    #[test]
    fn test_weekly_trend() {
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let start = |day: u32, hour: u32| Utc.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap();
        let entries = vec![
            entry(
                start(1, 9) - Duration::days(1),
                Some(start(1, 10) - Duration::days(1)),
                None,
                false,
            ),
            entry(start(1, 9), Some(start(1, 11)), None, true),
            entry(start(1, 13), Some(start(1, 14)), None, false),
            entry(start(3, 9), Some(start(3, 10)), None, false),
            // Saturday of the previous week, not counted.
            entry(start(1, 9) - Duration::days(2), Some(start(1, 9)), None, true),
            // Sunday of the next week, not counted.
            entry(start(7, 9), Some(start(7, 10)), None, true),
        ];

        let days = weekly_trend(&entries, sunday, &Utc, start(5, 12));

        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, sunday);
        assert_eq!(days[6].date, NaiveDate::from_ymd_opt(2024, 4, 6).unwrap());
        assert_eq!(days[0].total, Duration::hours(1));
        assert_eq!(days[1].total, Duration::hours(3));
        assert_eq!(days[1].billable, Duration::hours(2));
        assert_eq!(days[3].total, Duration::hours(1));
        assert!(days[5].total.is_zero());
        assert!(days[6].total.is_zero());
    }
}
