//! One-shot project commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use pyide_application::{AppContext, ExportedDocument, ImportOutcome, PROJECT_BACKUP_FILE_NAME};
use pyide_core::prompt::Prompter;

use crate::prompter::StdinPrompter;
use crate::render::ConsolePrinter;
use crate::settings::Settings;

/// Runs `file` (or the default file) once. Returns whether the program succeeded.
pub async fn run(settings: &Settings, file: Option<&str>) -> Result<bool> {
    let context = settings.open_context().await;
    let printer = ConsolePrinter::new(context.console.clone(), 0);
    let follow = printer.follow();

    let booted = settings.start_engine(&context)?;
    // One-shot runs wait for the engine instead of being turned away.
    booted.await.context("Engine initialization task failed")?;

    let file = file.unwrap_or(pyide_core::project::DEFAULT_FILE_NAME);
    let report = match context.open_file(file).await {
        Ok(()) => Some(context.runner.run().await),
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            None
        }
    };

    printer.stop(follow).await;
    context.shutdown().await?;
    Ok(report.is_some_and(|report| report.is_success()))
}

pub async fn list(settings: &Settings) -> Result<()> {
    let context = settings.open_context().await;
    let active = context.workspace.active_file().await;
    for name in context.workspace.file_names().await {
        if name == active {
            println!("{} {}", "*".green(), name.bold());
        } else {
            println!("  {}", name);
        }
    }
    Ok(())
}

pub async fn export(settings: &Settings, out: &Path) -> Result<()> {
    let context = settings.open_context().await;
    let document = context.transfer.export_active_file().await?;
    let target = if out.is_dir() {
        out.join(&document.file_name)
    } else {
        out.to_path_buf()
    };
    write_document(&document, &target).await?;
    ConsolePrinter::new(context.console.clone(), 0).flush();
    Ok(())
}

pub async fn backup(settings: &Settings, out: Option<PathBuf>) -> Result<()> {
    let context = settings.open_context().await;
    let document = context.transfer.export_project().await?;
    let target = out.unwrap_or_else(|| PathBuf::from(PROJECT_BACKUP_FILE_NAME));
    write_document(&document, &target).await
}

/// Imports a file. Returns `false` if the user declined to overwrite.
pub async fn import(settings: &Settings, path: &Path, assume_yes: bool) -> Result<bool> {
    let context = settings.open_context().await;
    let imported = import_into(&context, path, &StdinPrompter::new(assume_yes)).await?;
    ConsolePrinter::new(context.console.clone(), 0).flush();
    context.shutdown().await?;
    Ok(imported)
}

/// Reads `path` and adds it to the project under its file name.
pub async fn import_into(context: &AppContext, path: &Path, prompter: &dyn Prompter) -> Result<bool> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .with_context(|| format!("{:?} has no file name", path))?;
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;

    match context.transfer.import_file(&name, content, prompter).await? {
        ImportOutcome::Imported { .. } => Ok(true),
        ImportOutcome::Cancelled => {
            println!("{}", "Import cancelled.".bright_black());
            Ok(false)
        }
    }
}

/// Writes an exported document to `target`.
pub async fn write_document(document: &ExportedDocument, target: &Path) -> Result<()> {
    tokio::fs::write(target, &document.content)
        .await
        .with_context(|| format!("Failed to write {:?}", target))?;
    println!(
        "{}",
        format!("Wrote {} ({}) to {:?}", document.file_name, document.mime_type, target).bright_black()
    );
    Ok(())
}
