// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Sequential rename run over one directory

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::extract::{ContentCategory, ContentExcerpt, ContentExtractor, FileTask};
use crate::gemini::GenerativeModel;
use crate::inference::{PromptBuilder, RetryPolicy, Sleeper, TitleInferenceClient};
use crate::rename::{apply_title, RenameOutcome};
use crate::Result;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files with a supported extension that were attempted
    pub analyzed: usize,
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Everything a run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: AppConfig,
    pub target_dir: PathBuf,
    pub dry_run: bool,
    pub stats: RunStats,
}

impl RunContext {
    pub fn new(config: AppConfig, target_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            config,
            target_dir,
            dry_run,
            stats: RunStats::default(),
        }
    }
}

/// Snapshot the regular files of `dir`, in enumeration order
pub fn list_tasks(dir: &Path) -> Result<Vec<FileTask>> {
    let mut tasks = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(e) => e.path(),
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        if let Some(task) = FileTask::from_path(&path) {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

/// Drives extraction, inference and renaming for every file
pub struct RenameOrchestrator<M, S> {
    extractor: ContentExtractor,
    client: TitleInferenceClient<M, S>,
    sleeper: S,
}

impl<M: GenerativeModel, S: Sleeper + Clone> RenameOrchestrator<M, S> {
    pub fn new(config: &AppConfig, model: M, sleeper: S) -> Self {
        let client = TitleInferenceClient::new(
            model,
            sleeper.clone(),
            RetryPolicy::from(&config.retry),
            PromptBuilder::from(&config.prompts),
        );

        Self {
            extractor: ContentExtractor::new(&config.extraction),
            client,
            sleeper,
        }
    }

    /// Process every file of the target directory once. Only a directory
    /// that cannot be listed is an error; per-file problems are logged.
    pub async fn run(&self, ctx: &mut RunContext) -> Result<RunStats> {
        ctx.stats = RunStats::default();

        // Collected up front so renamed files are not enumerated again
        let tasks = list_tasks(&ctx.target_dir)?;
        debug!("Found {} files in {:?}", tasks.len(), ctx.target_dir);

        for task in &tasks {
            self.process(ctx, task).await;
        }

        Ok(ctx.stats)
    }

    /// Handle one file. Returns `None` for unsupported files and for files
    /// that produced no title; otherwise the outcome of the rename step.
    pub async fn process(&self, ctx: &mut RunContext, task: &FileTask) -> Option<RenameOutcome> {
        if task.kind.category() == ContentCategory::Unsupported {
            debug!("Ignoring unsupported file '{}'", task.file_name());
            return None;
        }

        ctx.stats.analyzed += 1;

        let title = match self.infer(ctx, task).await {
            Some(title) => title,
            None => {
                ctx.stats.skipped += 1;
                return None;
            }
        };

        let outcome = apply_title(task, &title, &ctx.config.rename, ctx.dry_run);
        match &outcome {
            RenameOutcome::Renamed { .. } => ctx.stats.renamed += 1,
            RenameOutcome::WouldRename { .. } | RenameOutcome::Unchanged { .. } => ctx.stats.skipped += 1,
            RenameOutcome::Failed { .. } => ctx.stats.failed += 1,
        }
        Some(outcome)
    }

    async fn infer(&self, ctx: &RunContext, task: &FileTask) -> Option<String> {
        let name = task.file_name();

        let excerpt = match self.extractor.extract(task) {
            Some(excerpt) => excerpt,
            None => {
                warn!("[SKIP] Cannot read any content from '{}'", name);
                return None;
            }
        };

        match &excerpt {
            ContentExcerpt::Text(text) => {
                info!("[Text analysis] '{}'", name);
                info!("  > Excerpt: '{}...'", preview(text, 80));
            }
            ContentExcerpt::Image(_) => info!("[Image analysis] '{}'", name),
        }

        let title = self.client.infer_title(&excerpt).await;
        self.sleeper.sleep(ctx.config.rename.pause()).await;

        if title.is_none() {
            warn!("[SKIP] No usable title for '{}', leaving it as is", name);
        }
        title
    }
}

/// First `chars` characters on a single line
fn preview(text: &str, chars: usize) -> String {
    text.chars()
        .take(chars)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
