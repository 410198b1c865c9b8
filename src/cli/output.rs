use ansi_term::{Colour, Style};
use chrono::{DateTime, Local, Utc};

use crate::{
    notify::Notification,
    store::entities::TimeEntry,
    utils::time::{format_clock, format_duration},
};

/// Terminal color of a project color token. Unknown tokens are printed without color.
pub fn project_style(color: &str) -> Style {
    let colour = match color {
        "red" => Colour::Red,
        "orange" => Colour::Fixed(208),
        "yellow" => Colour::Yellow,
        "green" => Colour::Green,
        "teal" => Colour::Cyan,
        "blue" => Colour::Blue,
        "indigo" => Colour::Fixed(61),
        "purple" => Colour::Purple,
        "pink" => Colour::Fixed(205),
        _ => return Style::new(),
    };
    colour.normal()
}

pub fn notification(notification: &Notification) -> String {
    let style = match notification {
        Notification::Warning(_) => Colour::Yellow.normal(),
        Notification::Info(_) => Colour::Blue.normal(),
        Notification::StoreFailure { .. } => Colour::Red.bold(),
    };
    style.paint(notification.to_string()).to_string()
}

fn project_label(entry: &TimeEntry) -> String {
    match &entry.project {
        Some(project) => project_style(&project.color)
            .paint(project.name.as_str())
            .to_string(),
        None => "-".to_string(),
    }
}

/// One tab separated line of the `entries` listing.
pub fn entry_line(entry: &TimeEntry, now: DateTime<Utc>) -> String {
    let start = entry.start_time.with_timezone(&Local);
    let end = match entry.end_time {
        Some(end) => end.with_timezone(&Local).format("%H:%M").to_string(),
        None => Colour::Green.paint("running").to_string(),
    };
    format!(
        "{}\t{}-{}\t{}\t{}{}\t{}",
        entry.id,
        start.format("%H:%M"),
        end,
        format_duration(entry.duration_at(now)),
        if entry.is_billable { "$ " } else { "" },
        project_label(entry),
        entry.description
    )
}

/// Line shown by `status` and redrawn by `watch`.
pub fn timer_line(elapsed: chrono::Duration, running: Option<&TimeEntry>) -> String {
    match running {
        Some(entry) => format!(
            "{} {} {}",
            Colour::Green.bold().paint(format_clock(elapsed)),
            project_label(entry),
            entry.description
        ),
        None => format!(
            "{} {}",
            Style::new().dimmed().paint(format_clock(elapsed)),
            "No timer running"
        ),
    }
}
