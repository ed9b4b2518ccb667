//! Pathway CLI - learning pathways and step progress.

mod config;

use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use pathway_core::{Pathway, PathwayId, UserId};
use pathway_progress::{
    CompletionEstimator, PathwayProgressTracker, ProgressTracker, StepStatus,
};
use pathway_storage::{JsonStorage, PathwayStore};

use config::{Backend, StoreConfig};

#[derive(Parser)]
#[command(name = "pathway")]
#[command(about = "Learning pathways with sequential step progress", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a pathway document (JSON)
    Import {
        /// Path to the document
        file: std::path::PathBuf,
    },
    /// List pathways
    List,
    /// Show a pathway, with a learner's progress if --user is given
    Show {
        /// Pathway ID or slug
        pathway: String,
        /// Learner
        #[arg(long)]
        user: Option<String>,
    },
    /// Print how many steps a learner has completed
    Progress {
        /// Pathway ID or slug
        pathway: String,
        /// Learner
        #[arg(long)]
        user: String,
    },
    /// Mark a step complete
    Complete {
        /// Pathway ID or slug
        pathway: String,
        /// 1-based step number
        step: u32,
        /// Learner
        #[arg(long)]
        user: String,
    },
    /// Mark a step incomplete
    Uncomplete {
        /// Pathway ID or slug
        pathway: String,
        /// 1-based step number
        step: u32,
        /// Learner
        #[arg(long)]
        user: String,
    },
    /// Pathways a learner has started but not finished
    Dashboard {
        /// Learner
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    config::init_tracing();

    let cli = Cli::parse();

    match cli.store.backend {
        Backend::Json => {
            let storage = JsonStorage::new(&cli.store.data_dir)
                .await
                .with_context(|| format!("opening {}", cli.store.data_dir.display()))?;
            run(storage, cli.command).await
        }
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let storage = pathway_storage::SqliteStorage::new(&cli.store.database_url).await?;
            run(storage, cli.command).await
        }
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => anyhow::bail!("this build has no SQLite support; rebuild with --features sqlite"),
    }
}

async fn run<S: PathwayStore + 'static>(storage: S, command: Commands) -> Result<()> {
    let storage = Arc::new(storage);
    let tracker = PathwayProgressTracker::from_arc(storage.clone());

    match command {
        Commands::Import { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let pathway: Pathway = serde_json::from_str(&json).context("parsing pathway document")?;
            let pathway = pathway.reissue();
            storage.save_pathway(&pathway).await?;
            info!("Imported pathway {} with {} steps", pathway.id, pathway.total_steps());
            println!("Imported pathway: {} ({}) - {}", pathway.id, pathway.slug, pathway.title);
        }
        Commands::List => {
            let pathways = storage.list_pathways().await?;
            println!("Pathways ({})", pathways.len());
            for pathway in pathways {
                println!("  {} | {} | {} steps - {}",
                    pathway.id,
                    pathway.slug,
                    pathway.total_steps(),
                    pathway.title,
                );
            }
        }
        Commands::Show { pathway, user } => {
            let pathway = resolve_pathway(storage.as_ref(), &pathway).await?;
            println!("Pathway: {}", pathway.id);
            println!("  Title: {}", pathway.title);
            println!("  Slug: {}", pathway.slug);
            if !pathway.difficulty.is_empty() {
                println!("  Difficulty: {}", pathway.difficulty);
            }
            if !pathway.estimated_time.is_empty() {
                println!("  Estimated time: {}", pathway.estimated_time);
            }
            if !pathway.prerequisites.is_empty() {
                println!("  Prerequisites: {}", pathway.prerequisites.join(", "));
            }

            let Some(user) = user else {
                for (step, number) in pathway.steps.iter().zip(1u32..) {
                    println!("  {}. {} ({})", number, step.title, step.estimated_time);
                }
                return Ok(());
            };

            let view = tracker.overview(&UserId::new(user)?, pathway.id).await?;
            println!("  Progress: {} of {} steps ({}%)", view.completed_steps, view.total_steps, view.percent);
            for step in &view.steps {
                println!("  [{}] {}. {} ({})",
                    format_status(step.status),
                    step.number,
                    step.title,
                    step.estimated_time,
                );
            }
            if view.timeline.hidden_steps > 0 {
                println!("  +{} more steps", view.timeline.hidden_steps);
            }
            let estimator = CompletionEstimator::new();
            if let Some(eta) = estimator.estimate_completion(&pathway, view.completed_steps, chrono::Utc::now()) {
                println!("  Estimated completion: {}", eta.format("%Y-%m-%d"));
            }
        }
        Commands::Progress { pathway, user } => {
            let pathway = resolve_pathway(storage.as_ref(), &pathway).await?;
            let completed = tracker.get_progress(&UserId::new(user)?, pathway.id).await?;
            println!("{}/{}", completed, pathway.total_steps());
        }
        Commands::Complete { pathway, step, user } => {
            let pathway = resolve_pathway(storage.as_ref(), &pathway).await?;
            let completed = tracker.toggle_step(&UserId::new(user)?, pathway.id, step, true).await?;
            println!("Step {} marked as complete ({}/{})", step, completed, pathway.total_steps());
        }
        Commands::Uncomplete { pathway, step, user } => {
            let pathway = resolve_pathway(storage.as_ref(), &pathway).await?;
            let completed = tracker.toggle_step(&UserId::new(user)?, pathway.id, step, false).await?;
            println!("Step {} unmarked ({}/{})", step, completed, pathway.total_steps());
        }
        Commands::Dashboard { user } => {
            let summaries = tracker.in_progress(&UserId::new(user)?).await?;
            println!("In progress ({})", summaries.len());
            for summary in summaries {
                println!("  {}% | step {}/{} | {}{}",
                    summary.percent,
                    summary.completed_steps,
                    summary.total_steps,
                    summary.title,
                    summary.next_step_title.map(|t| format!(" - next: {}", t)).unwrap_or_default(),
                );
            }
        }
    }

    Ok(())
}

/// Find a pathway by ID, falling back to slug.
async fn resolve_pathway<S: PathwayStore>(storage: &S, key: &str) -> Result<Pathway> {
    if let Ok(id) = key.parse::<PathwayId>() {
        if let Some(pathway) = storage.load_pathway(id).await? {
            return Ok(pathway);
        }
    }
    storage
        .load_pathway_by_slug(key)
        .await?
        .with_context(|| format!("pathway not found: {}", key))
}

fn format_status(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "DONE",
        StepStatus::Current => "NEXT",
        StepStatus::Locked => "    ",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_core::PathwayStep;
    use pathway_storage::MemoryStorage;

    #[test]
    fn test_cli_parses_global_store_flags() {
        let cli = Cli::parse_from([
            "pathway", "complete", "rust-basics", "2", "--user", "u1", "--data-dir", "/tmp/p",
        ]);
        assert_eq!(cli.store.data_dir, std::path::PathBuf::from("/tmp/p"));
        assert_eq!(cli.store.backend, Backend::Json);
        assert!(matches!(cli.command, Commands::Complete { step: 2, .. }));
    }

    #[tokio::test]
    async fn test_resolve_pathway_by_id_or_slug() {
        let storage = MemoryStorage::new();
        let pathway = Pathway::new("Go", "").with_step(PathwayStep::new("Syntax", "1 day"));
        storage.save_pathway(&pathway).await.unwrap();

        let by_id = resolve_pathway(&storage, &pathway.id.to_string()).await.unwrap();
        let by_slug = resolve_pathway(&storage, &pathway.slug).await.unwrap();
        assert_eq!(by_id.id, pathway.id);
        assert_eq!(by_slug.id, pathway.id);
        assert!(resolve_pathway(&storage, "missing").await.is_err());
    }
}
