// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Turning an inferred title into a safe, unique file name

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::RenameConfig;
use crate::extract::FileTask;
use crate::{Result, RetitleError};

/// Characters that are not allowed in file names on common platforms
pub const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// What happened to a file after its title was known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    WouldRename { from: PathBuf, to: PathBuf },
    /// The title matches the current name
    Unchanged { title: String },
    Failed { reason: String },
}

/// Replace forbidden characters with `_` and cap the length
pub fn sanitize_title(raw: &str, max_chars: usize) -> String {
    let clean: String = raw
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if clean.chars().count() > max_chars {
        clean.chars().take(max_chars).collect::<String>().trim().to_string()
    } else {
        clean
    }
}

pub fn is_same_name(title: &str, base_name: &str) -> bool {
    title.to_lowercase() == base_name.to_lowercase()
}

/// Existence check that does not follow symlinks, so a dangling link still
/// counts as taken
fn is_taken(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// First free `stem.ext`, `stem_1.ext`, `stem_2.ext`, ... in `dir`
pub fn unique_target(dir: &Path, stem: &str, extension: &str, max_suffix: u32) -> Result<PathBuf> {
    let candidate = dir.join(format!("{}{}", stem, extension));
    if !is_taken(&candidate) {
        return Ok(candidate);
    }

    (1..=max_suffix)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, extension)))
        .find(|p| !is_taken(p))
        .ok_or_else(|| RetitleError::NameExhausted(format!("{}{}", stem, extension), max_suffix))
}

/// Sanitize `title`, pick a free name next to the file and rename it
pub fn apply_title(task: &FileTask, title: &str, rules: &RenameConfig, dry_run: bool) -> RenameOutcome {
    let clean = sanitize_title(title, rules.max_title_chars);
    if clean.is_empty() {
        return RenameOutcome::Failed {
            reason: "title is empty after sanitizing".to_string(),
        };
    }

    if is_same_name(&clean, &task.base_name) {
        info!("  > Title '{}' matches the current name, nothing to do", clean);
        return RenameOutcome::Unchanged { title: clean };
    }

    let target = match unique_target(task.dir(), &clean, &task.extension, rules.max_collision_suffix) {
        Ok(path) => path,
        Err(e) => {
            warn!("[RENAME ERROR] '{}': {}", task.file_name(), e);
            return RenameOutcome::Failed { reason: e.to_string() };
        }
    };

    let target_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if dry_run {
        info!("DRY RUN: would rename '{}' -> '{}'", task.file_name(), target_name);
        return RenameOutcome::WouldRename {
            from: task.path.clone(),
            to: target,
        };
    }

    match std::fs::rename(&task.path, &target) {
        Ok(()) => {
            info!("[RENAMED] '{}' -> '{}'", task.file_name(), target_name);
            RenameOutcome::Renamed {
                from: task.path.clone(),
                to: target,
            }
        }
        Err(e) => {
            warn!("[RENAME ERROR] Cannot rename '{}': {}", task.file_name(), e);
            RenameOutcome::Failed { reason: e.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    fn rules() -> RenameConfig {
        RenameConfig::default()
    }

    #[test]
    fn forbidden_characters_become_underscores() {
        assert_eq!(sanitize_title("Report: Q1/Q2", 150), "Report_ Q1_Q2");
        assert_eq!(sanitize_title(r#"a\b*c?d"e<f>g|h"#, 150), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_title("Fattura n. 12 - Rossi & Co.", 150), "Fattura n. 12 - Rossi & Co.");
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "a".repeat(200);
        assert_eq!(sanitize_title(&title, 150).chars().count(), 150);
    }

    #[test]
    fn truncation_counts_characters() {
        let title = "é".repeat(200);
        let clean = sanitize_title(&title, 150);
        assert_eq!(clean.chars().count(), 150);
    }

    #[test]
    fn case_insensitive_match() {
        assert!(is_same_name("Annual Report", "annual report"));
        assert!(!is_same_name("Annual Report", "annual-report"));
    }

    #[test]
    fn collisions_probe_upwards() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_target(dir.path(), "Title", ".pdf", 10).unwrap(), dir.path().join("Title.pdf"));

        touch(dir.path(), "Title.pdf");
        assert_eq!(unique_target(dir.path(), "Title", ".pdf", 10).unwrap(), dir.path().join("Title_1.pdf"));

        touch(dir.path(), "Title_1.pdf");
        assert_eq!(unique_target(dir.path(), "Title", ".pdf", 10).unwrap(), dir.path().join("Title_2.pdf"));
    }

    #[test]
    fn probing_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Title.txt");
        touch(dir.path(), "Title_1.txt");
        touch(dir.path(), "Title_2.txt");
        assert!(matches!(
            unique_target(dir.path(), "Title", ".txt", 2),
            Err(RetitleError::NameExhausted(_, 2))
        ));
    }

    #[test]
    fn renames_next_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(dir.path(), "Scan_0001.PDF");
        let task = FileTask::from_path(&source).unwrap();

        let outcome = apply_title(&task, "Contratto: Affitto", &rules(), false);
        let expected = dir.path().join("Contratto_ Affitto.pdf");
        assert_eq!(outcome, RenameOutcome::Renamed { from: source.clone(), to: expected.clone() });
        assert!(expected.exists());
        assert!(!source.exists());
    }

    #[test]
    fn same_name_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(dir.path(), "budget 2024.xlsx");
        let task = FileTask::from_path(&source).unwrap();

        let outcome = apply_title(&task, "Budget 2024", &rules(), false);
        assert_eq!(outcome, RenameOutcome::Unchanged { title: "Budget 2024".to_string() });
        assert!(source.exists());
    }

    #[test]
    fn dry_run_does_not_touch_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(dir.path(), "IMG_2211.jpg");
        let task = FileTask::from_path(&source).unwrap();

        let outcome = apply_title(&task, "Sunset", &rules(), true);
        assert_eq!(
            outcome,
            RenameOutcome::WouldRename { from: source.clone(), to: dir.path().join("Sunset.jpg") }
        );
        assert!(source.exists());
    }

    #[test]
    fn vanished_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let task = FileTask::from_path(&dir.path().join("gone.txt")).unwrap();

        assert!(matches!(apply_title(&task, "Notes", &rules(), false), RenameOutcome::Failed { .. }));
    }
}
