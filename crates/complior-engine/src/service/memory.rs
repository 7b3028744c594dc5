//! Project memory: `.complior/memory.json`'s `scanHistory[]`/`fixHistory[]`
//! (spec §6 persisted-state layout). Grounded on `fix/history.rs`'s
//! load-tolerant-of-missing-file and atomic-write-on-save idiom.

use crate::api::{MemoryFile, MemoryFixEntry, MemoryScanEntry, ScanResult};
use std::path::{Path, PathBuf};

fn memory_path(project_path: &Path) -> PathBuf {
    project_path.join(".complior").join("memory.json")
}

pub fn load(project_path: &Path) -> Result<MemoryFile, String> {
    let path = memory_path(project_path);
    if !path.is_file() {
        return Ok(MemoryFile::default());
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
    serde_json::from_str(&raw).map_err(|e| format!("failed to parse {path:?}: {e}"))
}

pub fn save(project_path: &Path, memory: &MemoryFile) -> Result<(), String> {
    let path = memory_path(project_path);
    let json = serde_json::to_string_pretty(memory).map_err(|e| e.to_string())?;
    crate::fix::atomic_write(&path, &json)
}

pub fn append_scan(project_path: &Path, scan: &ScanResult) -> Result<(), String> {
    let mut memory = load(project_path)?;
    memory.scan_history.push(MemoryScanEntry {
        scanned_at: scan.scanned_at.clone(),
        total_score: scan.score.total_score,
        zone: scan.score.zone,
    });
    save(project_path, &memory)
}

pub fn append_fix(project_path: &Path, check_id: &str, applied: bool) -> Result<(), String> {
    let mut memory = load(project_path)?;
    memory.fix_history.push(MemoryFixEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        check_id: check_id.to_string(),
        applied,
    });
    save(project_path, &memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ScoreBreakdown, Zone};
    use tempfile::tempdir;

    fn sample_scan() -> ScanResult {
        ScanResult {
            score: ScoreBreakdown {
                total_score: 88.0,
                zone: Zone::Green,
                category_scores: vec![],
                critical_cap_applied: false,
                total_checks: 0,
                passed_checks: 0,
                failed_checks: 0,
                skipped_checks: 0,
                confidence_summary: Default::default(),
            },
            findings: vec![],
            project_path: "/proj".to_string(),
            scanned_at: "2026-01-01T00:00:00Z".to_string(),
            duration_ms: 0,
            files_scanned: 0,
        }
    }

    #[test]
    fn load_tolerates_a_missing_memory_file() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path()).unwrap().scan_history.is_empty());
    }

    #[test]
    fn append_scan_and_fix_persist_across_loads() {
        let dir = tempdir().unwrap();
        append_scan(dir.path(), &sample_scan()).unwrap();
        append_fix(dir.path(), "ai-disclosure", true).unwrap();

        let memory = load(dir.path()).unwrap();
        assert_eq!(memory.scan_history.len(), 1);
        assert_eq!(memory.scan_history[0].total_score, 88.0);
        assert_eq!(memory.fix_history.len(), 1);
        assert!(memory.fix_history[0].applied);
    }
}
