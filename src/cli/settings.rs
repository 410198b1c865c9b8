use anyhow::Result;
use clap::Subcommand;

use crate::{
    store::entities::{SettingsPatch, Theme, UserSettings},
    tracker::settings::{load_settings, save_settings},
};

use super::Environment;

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    #[command(about = "Print current settings")]
    Show {},
    #[command(about = "Change settings. Only given values are written")]
    Set {
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long, help = "Length of a pomodoro in minutes, between 5 and 60")]
        pomodoro: Option<u32>,
        #[arg(long)]
        reminder: Option<bool>,
    },
}

fn print_settings(settings: &UserSettings) {
    println!("theme\t{}", settings.theme);
    println!("pomodoro\t{}m", settings.pomodoro_duration);
    println!("reminder\t{}", settings.reminder_enabled);
}

pub async fn process_settings_command(
    environment: &Environment,
    command: SettingsCommand,
) -> Result<()> {
    let settings = match command {
        SettingsCommand::Show {} => load_settings(&environment.context).await?,
        SettingsCommand::Set {
            theme,
            pomodoro,
            reminder,
        } => {
            let patch = SettingsPatch {
                theme,
                pomodoro_duration: pomodoro,
                reminder_enabled: reminder,
            };
            save_settings(&environment.context, patch).await?
        }
    };
    print_settings(&settings);
    Ok(())
}
