use std::path::Path;

use anyhow::{bail, Context, Result};
use console::style;
use itinera_core::{Document, DocumentStatus, Storage};
use uuid::Uuid;

pub async fn run_add(storage: &Storage, trip_id: Uuid, path: &str) -> Result<()> {
    let source = Path::new(path);
    if !source.exists() {
        bail!("file not found: {}", source.display());
    }
    if !source.is_file() {
        bail!("not a regular file: {}", source.display());
    }

    let trip = storage.get_trip(trip_id).await?;
    let absolute = source
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", source.display()))?;
    let file_name = absolute
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .context("document path has no file name")?;

    let document = Document::new(trip.id, file_name, absolute.to_string_lossy().into_owned());
    storage.insert_document(&document).await?;

    eprintln!("Added: {} -> {}", source.display(), trip.name);
    println!("{}", document.id);
    Ok(())
}

pub async fn run_list(storage: &Storage, trip_id: Uuid) -> Result<()> {
    let trip = storage.get_trip(trip_id).await?;
    let documents = storage.list_documents(trip.id).await?;

    if documents.is_empty() {
        eprintln!("No documents in {}", trip.name);
        return Ok(());
    }

    for document in &documents {
        let status = match document.status {
            DocumentStatus::Processed => style(document.status.as_str()).green(),
            DocumentStatus::Failed => style(document.status.as_str()).red(),
            _ => style(document.status.as_str()).yellow(),
        };
        println!("  {} {} {}", style(&document.file_name).bold(), status, style(document.id).dim());
        if let Some(message) = &document.error_message {
            println!("    {message}");
        }
    }

    Ok(())
}
