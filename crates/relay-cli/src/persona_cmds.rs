//! `relay persona` subcommands.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use relay_core::{AgentRunner, PersonaError, PersonaRunner};

use crate::PersonaCommands;
use crate::run_cmd::{StderrSink, print_result, succeeded};

/// Dispatch a persona subcommand. Returns `false` when a run failed.
pub async fn run_persona_command(command: PersonaCommands, runner: Arc<AgentRunner>) -> Result<bool> {
    let personas = PersonaRunner::new(runner);

    match command {
        PersonaCommands::List => {
            let names = personas.store().list()?;
            if names.is_empty() {
                println!("No personas in {}", personas.store().dir().display());
            }
            for name in names {
                println!("{name}");
            }
        }
        PersonaCommands::Show { name } => {
            let persona = personas.store().load(&name).map_err(|e| match e {
                PersonaError::NotFound(_) => anyhow::anyhow!(
                    "persona {name:?} not found in {}",
                    personas.store().dir().display()
                ),
                other => other.into(),
            })?;
            println!("# {}\n", persona.display_name);
            println!("{}", persona.body);
        }
        PersonaCommands::Run {
            name,
            message,
            session,
            json,
        } => {
            let result = personas
                .run(&name, &message.join(" "), session, Some(Arc::new(StderrSink)))
                .await?;
            print_result(&result, json)?;
            return Ok(succeeded(&result));
        }
        PersonaCommands::Create { name, description } => {
            info!(persona = %name, dir = %personas.store().dir().display(), "creating persona");
            let content = personas
                .create(&name, &description.join(" "))
                .await
                .with_context(|| format!("failed to create persona {name:?}"))?;
            print!("{content}");
        }
    }

    Ok(true)
}
