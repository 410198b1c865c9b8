use anyhow::Result;
use clap::Subcommand;

use crate::{
    store::entities::{ProjectId, ProjectPatch},
    tracker::projects::{
        create_project, delete_project, edit_project, list_projects, PROJECT_COLORS,
    },
};

use super::{output::project_style, Environment};

fn parse_color(value: &str) -> Result<String, String> {
    if PROJECT_COLORS.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(format!("expected one of {}", PROJECT_COLORS.join(", ")))
    }
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    #[command(about = "List projects")]
    List {},
    #[command(about = "Create a project")]
    Add {
        name: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(
            long,
            short,
            value_parser = parse_color,
            help = "Color of the project. Picked from the palette when omitted"
        )]
        color: Option<String>,
    },
    #[command(about = "Change fields of a project")]
    Edit {
        id: String,
        #[arg(long, short)]
        name: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, value_parser = parse_color)]
        color: Option<String>,
    },
    #[command(about = "Delete a project. Entries keep the project name they were created with")]
    Delete { id: String },
}

pub async fn process_project_command(
    environment: &Environment,
    command: ProjectCommand,
) -> Result<()> {
    let context = &environment.context;
    match command {
        ProjectCommand::List {} => {
            for project in list_projects(context).await? {
                println!(
                    "{}\t{}\t{}",
                    project.id,
                    project_style(&project.color).paint(project.name.as_str()),
                    project.description.unwrap_or_default()
                );
            }
        }
        ProjectCommand::Add {
            name,
            description,
            color,
        } => {
            let id = create_project(context, &name, description, color).await?;
            println!("Created {id}");
        }
        ProjectCommand::Edit {
            id,
            name,
            description,
            color,
        } => {
            let patch = ProjectPatch {
                name,
                description,
                color,
            };
            if patch == ProjectPatch::default() {
                environment.notifier.info("Nothing to change");
                return Ok(());
            }
            edit_project(context, &ProjectId::from(id), patch).await?;
        }
        ProjectCommand::Delete { id } => {
            delete_project(context, &ProjectId::from(id)).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_color;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("teal"), Ok("teal".to_string()));
        assert!(parse_color("chartreuse").is_err());
    }
}
