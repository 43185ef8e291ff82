use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod prompter;
mod render;
mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(name = "pyide")]
#[command(about = "pyide - Python workspace with durable files and a sandboxed run loop", long_about = None)]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the project file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Interpreter executable
    #[arg(long, global = true)]
    interpreter: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive workspace (default)
    Repl,
    /// Run a file once and print its console output
    Run {
        /// File to run; defaults to main.py
        file: Option<String>,
    },
    /// List project files
    Ls,
    /// Write the active file to disk
    Export {
        /// Output file or directory
        out: PathBuf,
    },
    /// Write the whole project as a JSON backup
    Backup {
        /// Output file; defaults to python_project_backup.json
        out: Option<PathBuf>,
    },
    /// Add a text file to the project
    Import {
        path: PathBuf,
        /// Overwrite an existing file without asking
        #[arg(long)]
        yes: bool,
    },
    /// Manage config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config if none exists
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::resolve(cli.config, cli.store, cli.interpreter)?;
    let _log_guard = logging::init(&settings.config.logging.level, &settings.logs_dir)?;

    let succeeded = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => commands::repl::run(&settings).await.map(|_| true)?,
        Commands::Run { file } => commands::project::run(&settings, file.as_deref()).await?,
        Commands::Ls => commands::project::list(&settings).await.map(|_| true)?,
        Commands::Export { out } => commands::project::export(&settings, &out).await.map(|_| true)?,
        Commands::Backup { out } => commands::project::backup(&settings, out).await.map(|_| true)?,
        Commands::Import { path, yes } => commands::project::import(&settings, &path, yes).await?,
        Commands::Config { action } => match action {
            ConfigAction::Init => commands::config::init(&settings).map(|_| true)?,
            ConfigAction::Show => commands::config::show(&settings).map(|_| true)?,
        },
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
