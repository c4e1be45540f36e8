//! Operational CLI for the file organizer's analysis-and-embedding core:
//! queue flushing, dead-letter inspection/retry, relationship-index
//! rebuilds, circuit-breaker resets, and path-change/deletion notification.
//! Not part of the core itself — a thin wrapper a deployment's tooling (or
//! an operator, by hand) drives against a running process's `data_dir`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use organizer_domain::value_objects::{FileKind, Stage};
use organizer_providers::context::CoreContext;

#[derive(Parser)]
#[command(name = "organizer-core")]
#[command(about = "Operational CLI for the file organizer analysis core")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to an `organizer.toml` profile; falls back to built-in
    /// defaults and `ORGANIZER_`-prefixed environment variables.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Analysis,
    Organize,
}

impl From<StageArg> for Stage {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::Analysis => Stage::Analysis,
            StageArg::Organize => Stage::Organize,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FileKindArg {
    Doc,
    Image,
}

impl From<FileKindArg> for FileKind {
    fn from(value: FileKindArg) -> Self {
        match value {
            FileKindArg::Doc => FileKind::Doc,
            FileKindArg::Image => FileKind::Image,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Force-flush both embedding queue stages to the vector store.
    Flush,

    /// Inspect or act on dead-lettered queue items.
    DeadLetter {
        #[command(subcommand)]
        action: DeadLetterAction,
    },

    /// Rebuild the persisted relationship index from analysis history.
    RebuildRelationships,

    /// Force a model's circuit breaker closed.
    ResetCircuit {
        /// `text`, `vision`, `embedding`, or a literal model name.
        model_type: String,
    },

    /// Notify the core that a watched file was moved or renamed, so queued
    /// items and caches keyed under the old path are updated in place.
    PathChanged {
        old_path: String,
        new_path: String,
        new_name: String,
        #[arg(long, value_enum)]
        kind: FileKindArg,
    },

    /// Notify the core that a watched file was deleted, so queued items
    /// and cache entries keyed under it are dropped.
    Deleted { path: String },
}

#[derive(Subcommand)]
enum DeadLetterAction {
    /// List dead-lettered items, across both stages unless `--stage` is given.
    List {
        #[arg(long, value_enum)]
        stage: Option<StageArg>,
    },
    /// Re-queue dead-lettered items for redelivery.
    Retry {
        #[arg(long, value_enum)]
        stage: Option<StageArg>,
        /// Retry only the item with this wire id; otherwise retry all.
        #[arg(long)]
        id: Option<String>,
    },
    /// Drop all dead-lettered items outright.
    Clear {
        #[arg(long, value_enum)]
        stage: Option<StageArg>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = organizer_infrastructure::config::load(cli.config.as_deref())
        .context("failed to load organizer configuration")?;
    let _logging_guard = organizer_infrastructure::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    let context = CoreContext::init(config).await.context("failed to initialize core context")?;

    match cli.command {
        Command::Flush => flush(&context).await,
        Command::DeadLetter { action } => dead_letter(&context, action).await,
        Command::RebuildRelationships => rebuild_relationships(&context).await,
        Command::ResetCircuit { model_type } => reset_circuit(&context, &model_type).await,
        Command::PathChanged { old_path, new_path, new_name, kind } => {
            path_changed(&context, &old_path, &new_path, &new_name, kind.into()).await
        }
        Command::Deleted { path } => deleted(&context, &path).await,
    }
}

async fn flush(context: &CoreContext) -> Result<()> {
    context.shutdown().await.context("flush failed")?;
    println!("flushed both queue stages");
    Ok(())
}

fn stages(stage: Option<StageArg>) -> Vec<Stage> {
    match stage {
        Some(stage) => vec![stage.into()],
        None => Stage::all().to_vec(),
    }
}

async fn dead_letter(context: &CoreContext, action: DeadLetterAction) -> Result<()> {
    match action {
        DeadLetterAction::List { stage } => {
            for stage in stages(stage) {
                let entries = context.queue.stage(stage).dead_letter_entries().await;
                println!("{} ({} entries):", stage.as_str(), entries.len());
                for entry in entries {
                    println!(
                        "  {} retries={} failed_at={} error={}",
                        entry.item.id, entry.retry_count, entry.failed_at, entry.error
                    );
                }
            }
            Ok(())
        }
        DeadLetterAction::Retry { stage, id } => {
            for stage in stages(stage) {
                let queue = context.queue.stage(stage);
                match &id {
                    Some(id) => {
                        let found = queue.retry_dead_letter_item(id).await.context("retry failed")?;
                        if found {
                            println!("{}: requeued {id}", stage.as_str());
                        }
                    }
                    None => {
                        let count = queue.retry_all_dead_letter_items().await.context("retry-all failed")?;
                        println!("{}: requeued {count} item(s)", stage.as_str());
                    }
                }
            }
            Ok(())
        }
        DeadLetterAction::Clear { stage } => {
            for stage in stages(stage) {
                context.queue.stage(stage).clear_dead_letter().await.context("clear failed")?;
                println!("{}: dead-letter store cleared", stage.as_str());
            }
            Ok(())
        }
    }
}

async fn rebuild_relationships(context: &CoreContext) -> Result<()> {
    let rebuilt = context.relationships.rebuild().await.context("relationship rebuild failed")?;
    println!("{} edge(s), updated_at={}", rebuilt.edges.len(), rebuilt.updated_at);
    Ok(())
}

async fn reset_circuit(context: &CoreContext, model_type: &str) -> Result<()> {
    let model = context.model_runtime.resolve_model_type(model_type);
    let found = context.model_runtime.reset_circuit(&model).await;
    if found {
        println!("circuit for '{model}' forced closed");
    } else {
        println!("no circuit breaker exists yet for '{model}'");
    }
    Ok(())
}

async fn path_changed(context: &CoreContext, old_path: &str, new_path: &str, new_name: &str, kind: FileKind) -> Result<()> {
    let updated = context.handle_path_change(old_path, new_path, new_name, kind).await.context("path-change update failed")?;
    println!("{updated} queued item(s) rekeyed from {old_path} to {new_path}");
    Ok(())
}

async fn deleted(context: &CoreContext, path: &str) -> Result<()> {
    let removed = context.handle_deletion(path).await.context("deletion update failed")?;
    println!("{removed} queued item(s) removed for {path}");
    Ok(())
}
