mod config;
mod persona_cmds;
mod run_cmd;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use relay_core::AgentRunner;

#[derive(Parser)]
#[command(name = "relay", about = "Run coding-agent CLIs behind one uniform contract")]
struct Cli {
    /// Directory backends run in (overrides RELAY_WORKING_DIR env var)
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a relay config file with every default spelled out
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// List registered backends and the executables they launch
    Backends,
    /// Run one message against a backend
    Run {
        /// Backend to use: claude, opencode, or gemini
        #[arg(long, short, default_value = "claude")]
        backend: String,
        /// Session id from a previous run on the same backend
        #[arg(long)]
        session: Option<String>,
        /// Deadline in seconds (overrides the configured default)
        #[arg(long)]
        timeout: Option<u64>,
        /// Allowed tool; repeat for several (Claude Code only)
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Do not print progress to stderr
        #[arg(long, short)]
        quiet: bool,
        /// Message text; multiple words are joined with spaces
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Persona management
    Persona {
        #[command(subcommand)]
        command: PersonaCommands,
    },
}

#[derive(Subcommand)]
pub enum PersonaCommands {
    /// List available personas
    List,
    /// Print a persona's instructions (frontmatter stripped)
    Show {
        /// Persona name
        name: String,
    },
    /// Run a message as a persona on Claude Code
    Run {
        /// Persona name
        name: String,
        /// Session id from a previous persona run
        #[arg(long)]
        session: Option<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Have Claude Code author a new persona and save it
    Create {
        /// Persona name (normalized to lowercase-hyphenated)
        name: String,
        /// What the persona should be good at
        #[arg(required = true, trailing_var_arg = true)]
        description: Vec<String>,
    },
}

/// Execute the `relay init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let written = config::save_config(&config::ConfigFile::with_defaults())?;
    println!("Config written to {}", written.display());
    Ok(())
}

/// Execute the `relay backends` command.
fn cmd_backends(runner: &AgentRunner) {
    for name in runner.registry().list() {
        let binary = runner
            .registry()
            .get(name)
            .map(|h| h.binary().to_owned())
            .unwrap_or_default();
        println!("{name}\t{binary}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        return cmd_init(force);
    }

    let resolved = config::resolve(cli.working_dir.as_deref())?;
    let runner = Arc::new(AgentRunner::new(resolved));

    let succeeded = match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Backends => {
            cmd_backends(&runner);
            true
        }
        Commands::Run {
            backend,
            session,
            timeout,
            tools,
            json,
            quiet,
            message,
        } => {
            let options = run_cmd::RunOptions {
                backend,
                message: message.join(" "),
                session,
                timeout_secs: timeout,
                tools,
                json,
                quiet,
            };
            run_cmd::run_agent(&runner, options).await?
        }
        Commands::Persona { command } => {
            persona_cmds::run_persona_command(command, Arc::clone(&runner)).await?
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that mutate process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
