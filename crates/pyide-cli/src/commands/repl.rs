//! Interactive workspace REPL.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use pyide_application::{AppContext, RunReport};
use tokio::task::JoinHandle;

use super::project::{import_into, write_document};
use crate::prompter::StdinPrompter;
use crate::render::{ConsolePrinter, print_entry};
use crate::settings::Settings;

/// Command names with their usage, in help order.
const COMMANDS: &[(&str, &str, &str)] = &[
    (":ls", ":ls", "list files"),
    (":show", ":show", "print the open file"),
    (":open", ":open <name>", "open a file"),
    (":new", ":new [name]", "create a file"),
    (":rm", ":rm <name>", "delete a file"),
    (":edit", ":edit", "replace the open file (end with a lone '.')"),
    (":run", ":run", "run the open file"),
    (":export", ":export [path]", "write the open file to disk"),
    (":backup", ":backup [path]", "write the project as JSON"),
    (":import", ":import <path>", "add a file from disk"),
    (":log", ":log", "print the whole console"),
    (":help", ":help", "show this help"),
    (":quit", ":quit", "save and exit"),
];

/// Line that ends `:edit` input.
const EDIT_TERMINATOR: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    List,
    Show,
    Open(String),
    New(Option<String>),
    Remove(String),
    Edit,
    Run,
    Export(Option<PathBuf>),
    Backup(Option<PathBuf>),
    Import(PathBuf),
    Log,
    Help,
    Quit,
}

impl ReplCommand {
    fn parse(line: &str) -> std::result::Result<Self, String> {
        let line = line.trim();
        let (head, arg) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim()).filter(|rest| !rest.is_empty())),
            None => (line, None),
        };

        let command = match (head, arg) {
            (":ls", None) => ReplCommand::List,
            (":show", None) => ReplCommand::Show,
            (":open", Some(name)) => ReplCommand::Open(name.to_string()),
            (":new", name) => ReplCommand::New(name.map(str::to_string)),
            (":rm", Some(name)) => ReplCommand::Remove(name.to_string()),
            (":edit", None) => ReplCommand::Edit,
            (":run", None) => ReplCommand::Run,
            (":export", path) => ReplCommand::Export(path.map(PathBuf::from)),
            (":backup", path) => ReplCommand::Backup(path.map(PathBuf::from)),
            (":import", Some(path)) => ReplCommand::Import(PathBuf::from(path)),
            (":log", None) => ReplCommand::Log,
            (":help", None) => ReplCommand::Help,
            (":quit" | ":q" | ":exit", None) => ReplCommand::Quit,
            _ => {
                return Err(match COMMANDS.iter().find(|(name, _, _)| *name == head) {
                    Some((_, usage, _)) => format!("Usage: {}", usage),
                    None => format!("Unknown command '{}'. Type :help.", head),
                });
            }
        };
        Ok(command)
    }
}

/// Completion for command names and, after `:open`/`:rm`, file names.
struct CliHelper {
    commands: Vec<String>,
    files: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|(name, _, _)| name.to_string()).collect(),
            files: Vec::new(),
        }
    }

    fn file_argument<'l>(line: &'l str) -> Option<(usize, &'l str)> {
        [":open ", ":rm "]
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix).map(|rest| (prefix.len(), rest)))
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if let Some((start, partial)) = Self::file_argument(line) {
            let candidates = self
                .files
                .iter()
                .filter(|file| file.starts_with(partial))
                .map(|file| Pair {
                    display: file.clone(),
                    replacement: file.clone(),
                })
                .collect();
            return Ok((start, candidates));
        }

        if line.starts_with(':') && !line.contains(' ') {
            let candidates = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with(':') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with(':') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

enum Flow {
    Continue,
    Quit,
}

/// Program runs started from the prompt.
///
/// Runs execute in the background so editing and switching files keep
/// working while a program is running.
#[derive(Default)]
struct RunTasks {
    tasks: Vec<JoinHandle<RunReport>>,
}

impl RunTasks {
    fn spawn(&mut self, context: &Arc<AppContext>) {
        self.tasks.retain(|task| !task.is_finished());
        let context = context.clone();
        self.tasks
            .push(tokio::spawn(async move { context.runner.run().await }));
    }

    fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Stops unfinished runs. Dropping a run kills its interpreter process.
    async fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
    }
}

pub async fn run(settings: &Settings) -> Result<()> {
    let context = Arc::new(settings.open_context().await);
    let printer = ConsolePrinter::new(context.console.clone(), 0);
    let prompter = StdinPrompter::new(false);
    let mut runs = RunTasks::default();

    // Runs are turned away until the banner shows up.
    settings.start_engine(&context)?;
    context.start_autosave(settings.config.autosave_interval()).await;

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));
    let follow = printer.follow();

    println!("{}", "=== pyide ===".bright_magenta().bold());
    println!("{}", format!("Project: {:?}", settings.store_path).bright_black());
    println!("{}", "Type :help for commands.".bright_black());
    println!();

    loop {
        printer.flush();
        let files = context.workspace.file_names().await;
        if let Some(helper) = rl.helper_mut() {
            helper.files = files;
        }

        let prompt = format!("{}> ", context.workspace.active_file().await);
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match ReplCommand::parse(trimmed) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message.bright_black());
                        continue;
                    }
                };

                match execute(&context, &mut runs, &prompter, &mut rl, command).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type :quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    if runs.is_running() {
        println!("{}", "Stopping the running program.".yellow());
    }
    runs.abort_all().await;
    context.shutdown().await?;
    printer.stop(follow).await;
    println!("{}", "Saved. Goodbye!".bright_green());
    Ok(())
}

async fn execute(
    context: &Arc<AppContext>,
    runs: &mut RunTasks,
    prompter: &StdinPrompter,
    rl: &mut Editor<CliHelper, DefaultHistory>,
    command: ReplCommand,
) -> Result<Flow> {
    match command {
        ReplCommand::List => {
            let active = context.workspace.active_file().await;
            for name in context.workspace.file_names().await {
                if name == active {
                    println!("{} {}", "*".green(), name.bold());
                } else {
                    println!("  {}", name);
                }
            }
        }
        ReplCommand::Show => {
            let content = context.workspace.editor_content().await;
            for (number, line) in content.lines().enumerate() {
                println!("{} {}", format!("{:>4}", number + 1).bright_black(), line);
            }
        }
        ReplCommand::Open(name) => context.open_file(&name).await?,
        ReplCommand::New(Some(name)) => context.workspace.create_file(&name).await?,
        ReplCommand::New(None) => {
            if context.workspace.create_file_interactive(prompter).await?.is_none() {
                println!("{}", "Cancelled.".bright_black());
            }
        }
        ReplCommand::Remove(name) => {
            if !context.workspace.delete_file_interactive(&name, prompter).await? {
                println!("{}", "Cancelled.".bright_black());
            }
        }
        ReplCommand::Edit => {
            println!(
                "{}",
                format!("Enter new content; finish with a line containing only '{}'.", EDIT_TERMINATOR)
                    .bright_black()
            );
            match read_block(rl)? {
                Some(text) => context.workspace.edit(text).await,
                None => println!("{}", "Edit discarded.".bright_black()),
            }
        }
        // Output arrives through the follow printer; a second run while one
        // is going is turned away by the orchestrator.
        ReplCommand::Run => runs.spawn(context),
        ReplCommand::Export(path) => {
            let document = context.transfer.export_active_file().await?;
            let target = path.unwrap_or_else(|| PathBuf::from(&document.file_name));
            write_document(&document, &target).await?;
        }
        ReplCommand::Backup(path) => {
            let document = context.transfer.export_project().await?;
            let target = path.unwrap_or_else(|| PathBuf::from(&document.file_name));
            write_document(&document, &target).await?;
        }
        ReplCommand::Import(path) => {
            import_into(context, &path, prompter).await?;
        }
        ReplCommand::Log => {
            for entry in context.console.entries() {
                print_entry(&entry);
            }
        }
        ReplCommand::Help => {
            for (_, usage, description) in COMMANDS {
                println!("  {:<16} {}", usage.bright_cyan(), description);
            }
        }
        ReplCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Reads lines until the terminator. `None` if interrupted.
fn read_block(rl: &mut Editor<CliHelper, DefaultHistory>) -> Result<Option<String>> {
    let mut lines = Vec::new();
    loop {
        match rl.readline("... ") {
            Ok(line) if line.trim_end() == EDIT_TERMINATOR => return Ok(Some(lines.join("\n"))),
            Ok(line) => lines.push(line),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
}
