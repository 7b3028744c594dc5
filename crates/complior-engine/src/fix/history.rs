//! Undo Manager (spec §4.I). Reads and writes `.complior/history.json`, an
//! append-only ordered list of HistoryEntry. No hash-chaining: unlike the
//! teacher's removed `witness.rs`, this is a plain ordered list with no
//! tamper-evidence requirement in this spec.
//!
//! Grounded on `witness.rs`'s load-tolerant-of-missing-file and
//! atomic-write-on-save idiom.

use crate::api::{
    AppliedFile, FileAction, FixType, FixValidation, HistoryEntry, HistoryFile, HistoryStatus,
    ScanResult,
};
use crate::catalogue::Catalogue;
use crate::collector;
use crate::events::{Event, EventBus, FixUndone};
use crate::orchestrator;
use std::path::{Path, PathBuf};

fn history_path(project_path: &Path) -> PathBuf {
    project_path.join(".complior").join("history.json")
}

pub fn load(project_path: &Path) -> Result<HistoryFile, String> {
    let path = history_path(project_path);
    if !path.is_file() {
        return Ok(HistoryFile::default());
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
    serde_json::from_str(&raw).map_err(|e| format!("failed to parse {path:?}: {e}"))
}

pub fn save(project_path: &Path, history: &HistoryFile) -> Result<(), String> {
    let path = history_path(project_path);
    let json = serde_json::to_string_pretty(history).map_err(|e| e.to_string())?;
    super::atomic_write(&path, &json)
}

/// Appends a new `applied` entry with a monotonic id (spec §4.I).
pub fn append_applied(
    project_path: &Path,
    check_id: &str,
    obligation_id: Option<String>,
    fix_type: FixType,
    files: Vec<AppliedFile>,
    score_before: f64,
    score_after: f64,
) -> Result<HistoryEntry, String> {
    let mut history = load(project_path)?;
    let id = history.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
    let entry = HistoryEntry {
        id,
        check_id: check_id.to_string(),
        obligation_id,
        fix_type,
        status: HistoryStatus::Applied,
        timestamp: chrono::Utc::now().to_rfc3339(),
        files,
        score_before,
        score_after,
    };
    history.entries.push(entry.clone());
    save(project_path, &history)?;
    Ok(entry)
}

/// Skips undone entries when looking for "the last applied fix" (spec §4.I).
fn last_applied_index(history: &HistoryFile) -> Option<usize> {
    history.entries.iter().rposition(|e| e.status == HistoryStatus::Applied)
}

fn reverse_entry_actions(project_path: &Path, entry: &HistoryEntry) -> Result<(), String> {
    for applied in entry.files.iter().rev() {
        super::check_action_path(project_path, &applied.path)?;
        let target = project_path.join(&applied.path);
        match applied.action {
            FileAction::Edit => {
                if applied.backup_path.is_empty() {
                    return Err(format!("missing backup path for edit undo of {:?}", applied.path));
                }
                let backup = PathBuf::from(&applied.backup_path);
                if !backup.is_file() {
                    return Err(format!(
                        "backup file missing for {:?}: {backup:?}",
                        applied.path
                    ));
                }
                let content = std::fs::read_to_string(&backup)
                    .map_err(|e| format!("failed reading backup {backup:?}: {e}"))?;
                super::atomic_write(&target, &content)?;
            }
            FileAction::Create => {
                // Absence is already-undone (spec §4: "Failure semantics").
                if target.exists() {
                    std::fs::remove_file(&target)
                        .map_err(|e| format!("failed to remove {target:?}: {e}"))?;
                }
            }
        }
    }
    Ok(())
}

fn build_validation(entry: &HistoryEntry, before: &ScanResult, after: &ScanResult) -> FixValidation {
    let before_type = before
        .find_finding(&entry.check_id, entry.obligation_id.as_deref())
        .map(|f| f.result.type_str())
        .unwrap_or("skip");
    let after_type = after
        .find_finding(&entry.check_id, entry.obligation_id.as_deref())
        .map(|f| f.result.type_str())
        .unwrap_or("skip");
    FixValidation {
        check_id: entry.check_id.clone(),
        obligation_id: entry.obligation_id.clone(),
        article: None,
        before: before_type.to_string(),
        after: after_type.to_string(),
        score_delta: after.score.total_score - before.score.total_score,
        total_score: after.score.total_score,
    }
}

fn undo_at(
    project_path: &Path,
    catalogue: &Catalogue,
    bus: &EventBus,
    mut history: HistoryFile,
    index: usize,
) -> Result<FixValidation, String> {
    let before_ctx = collector::collect(project_path);
    let before_scan = orchestrator::scan(&before_ctx, catalogue, chrono::Utc::now().to_rfc3339());

    let entry = history.entries[index].clone();
    reverse_entry_actions(project_path, &entry)?;

    let after_ctx = collector::collect(project_path);
    let after_scan = orchestrator::scan(&after_ctx, catalogue, chrono::Utc::now().to_rfc3339());

    let validation = build_validation(&entry, &before_scan, &after_scan);

    history.entries[index].status = HistoryStatus::Undone;
    save(project_path, &history)?;

    bus.emit(Event::FixUndone(FixUndone {
        history_id: entry.id,
        validation: validation.clone(),
    }));

    Ok(validation)
}

pub fn undo_last(project_path: &Path, catalogue: &Catalogue, bus: &EventBus) -> Result<FixValidation, String> {
    let history = load(project_path)?;
    let index = last_applied_index(&history).ok_or_else(|| "no applied fix to undo".to_string())?;
    undo_at(project_path, catalogue, bus, history, index)
}

pub fn undo_by_id(
    project_path: &Path,
    id: u64,
    catalogue: &Catalogue,
    bus: &EventBus,
) -> Result<FixValidation, String> {
    let history = load(project_path)?;
    let index = history
        .entries
        .iter()
        .position(|e| e.id == id && e.status == HistoryStatus::Applied)
        .ok_or_else(|| format!("no applied history entry with id {id}"))?;
    undo_at(project_path, catalogue, bus, history, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_tolerates_a_missing_history_file() {
        let dir = tempdir().unwrap();
        let history = load(dir.path()).unwrap();
        assert!(history.entries.is_empty());
    }

    #[test]
    fn append_applied_assigns_monotonic_ids() {
        let dir = tempdir().unwrap();
        let e1 = append_applied(dir.path(), "ai-disclosure", None, FixType::CodeInjection, vec![], 70.0, 85.0)
            .unwrap();
        let e2 = append_applied(dir.path(), "content-marking", None, FixType::ConfigFix, vec![], 85.0, 90.0)
            .unwrap();
        assert_eq!(e1.id, 1);
        assert_eq!(e2.id, 2);
        assert_eq!(load(dir.path()).unwrap().entries.len(), 2);
    }

    #[test]
    fn undo_last_errors_when_history_is_empty() {
        let dir = tempdir().unwrap();
        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        assert!(undo_last(dir.path(), &catalogue, &bus).is_err());
    }

    #[test]
    fn undo_last_deletes_a_created_file_and_marks_the_entry_undone() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("src/components/AIDisclosure.tsx");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, "export function AIDisclosure() {}").unwrap();

        append_applied(
            dir.path(),
            "ai-disclosure",
            None,
            FixType::CodeInjection,
            vec![AppliedFile {
                path: "src/components/AIDisclosure.tsx".to_string(),
                action: FileAction::Create,
                backup_path: String::new(),
            }],
            70.0,
            85.0,
        )
        .unwrap();

        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        undo_last(dir.path(), &catalogue, &bus).unwrap();

        assert!(!target.exists());
        let history = load(dir.path()).unwrap();
        assert_eq!(history.entries[0].status, HistoryStatus::Undone);
    }

    #[test]
    fn undo_skips_already_undone_entries_when_finding_the_last_applied_fix() {
        let dir = tempdir().unwrap();
        append_applied(dir.path(), "ai-disclosure", None, FixType::CodeInjection, vec![], 70.0, 85.0).unwrap();

        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        undo_last(dir.path(), &catalogue, &bus).unwrap();

        // The one entry is now undone; a second undo finds nothing to do.
        assert!(undo_last(dir.path(), &catalogue, &bus).is_err());
    }

    #[test]
    fn edit_undo_with_a_missing_backup_is_a_hard_error() {
        let dir = tempdir().unwrap();
        append_applied(
            dir.path(),
            "ai-disclosure",
            None,
            FixType::CodeInjection,
            vec![AppliedFile {
                path: "src/components/AIDisclosure.tsx".to_string(),
                action: FileAction::Edit,
                backup_path: dir.path().join(".complior/backups/missing").display().to_string(),
            }],
            70.0,
            85.0,
        )
        .unwrap();

        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        assert!(undo_last(dir.path(), &catalogue, &bus).is_err());
    }
}
