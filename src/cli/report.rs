use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    store::entities::EntryId,
    summary::{summarize, time_by_project, weekly_trend},
    tracker::{
        entries::{delete_entry, entries_between},
        projects::list_projects,
    },
    utils::{
        clock::Clock,
        time::{format_duration, week_start},
    },
};

use super::{
    output::{entry_line, project_style},
    Args, Environment,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct EntriesCommand {
    #[arg(
        long,
        help = "Day to list. Examples are \"yesterday\", \"friday\", \"15/03/2025\". Defaults to today"
    )]
    day: Option<String>,
    #[arg(
        long,
        default_value_t = DateStyle::Uk,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: DateStyle,
}

#[derive(Debug, Parser)]
pub struct SummaryCommand {
    #[arg(long, help = "Summarize the current week instead of today")]
    week: bool,
}

/// Bounds of the local day described by `day`.
fn parse_day(
    day: Option<String>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let date = match day.map(|s| parse_date_string(&s, now, date_style.into())) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate day {e}"),
                )
                .into());
        }
        None => now,
    };
    Ok((date.beginning_of_day(), date.end_of_day()))
}

pub async fn process_entries_command(
    environment: &Environment,
    EntriesCommand { day, date_style }: EntriesCommand,
) -> Result<()> {
    let now = environment.clock.time();
    let (start, end) = parse_day(day, date_style, now.with_timezone(&Local))?;
    let entries = entries_between(&environment.context, start.into(), end.into()).await?;

    println!("{}", start.format("%x"));
    if entries.is_empty() {
        println!("No entries");
    }
    for entry in &entries {
        println!("{}", entry_line(entry, now));
    }
    Ok(())
}

pub async fn process_delete_command(environment: &Environment, id: String) -> Result<()> {
    let id = EntryId::from(id);
    delete_entry(&environment.context, &id).await?;
    println!("Deleted {id}");
    Ok(())
}

/// Start of the summarized range: today, or the Sunday the current week started on.
fn summary_start(now: DateTime<Local>, week: bool) -> DateTime<Local> {
    let today = now.beginning_of_day();
    if week {
        today - Duration::days((now.date_naive() - week_start(now.date_naive())).num_days())
    } else {
        today
    }
}

pub async fn process_summary_command(
    environment: &Environment,
    SummaryCommand { week }: SummaryCommand,
) -> Result<()> {
    let now = environment.clock.time();
    let local = now.with_timezone(&Local);
    let from: DateTime<Utc> = summary_start(local, week).into();
    let entries = entries_between(&environment.context, from, now).await?;
    let projects = list_projects(&environment.context).await?;

    let summary = summarize(&entries, now, environment.config.billable_rate);
    println!("Total\t{}", format_duration(summary.total));
    println!(
        "Billable\t{}\t{}",
        format_duration(summary.billable),
        summary
            .billable_share
            .map(|share| share.to_string())
            .unwrap_or_else(|| "-".into())
    );
    println!("Amount\t{:.2}", summary.billable_amount);
    match summary.top_project {
        Some(top) => println!("Top project\t{}\t{}", top.name, format_duration(top.duration)),
        None => println!("Top project\tN/A"),
    }

    let by_project = time_by_project(&entries, &projects, now);
    if !by_project.is_empty() {
        println!();
        for usage in by_project {
            let style = usage
                .color
                .as_deref()
                .map(project_style)
                .unwrap_or_default();
            println!("{}\t{}", format_duration(usage.duration), style.paint(usage.name));
        }
    }

    if week {
        println!();
        for day in weekly_trend(&entries, week_start(local.date_naive()), &Local, now) {
            println!(
                "{}\t{}\t{}",
                day.date.format("%a %x"),
                format_duration(day.total),
                format_duration(day.billable)
            );
        }
    }
    Ok(())
}
