//! Fix subsystem (spec §4.G-I): strategy dispatch, applier/validator, undo.

pub mod applier;
pub mod history;
pub mod registry;

use std::path::{Component, Path, PathBuf};

/// Rejects absolute paths, `..`/root components, and backslashes in a
/// project-relative fix-action path. Grounded on `init/apply.rs`'s
/// `normalize_rel_path`, minus its allowlist-prefix step: fix-action paths
/// come from the hand-written strategy registry, not externally supplied
/// plans, so there is no untrusted-prefix surface to restrict.
fn safe_rel_path(rel: &str) -> Result<(), String> {
    if rel.trim().is_empty() {
        return Err("fix action path must be non-empty".to_string());
    }
    if rel.contains('\\') {
        return Err(format!("backslashes are not allowed in fix action paths: {rel:?}"));
    }
    let as_path = PathBuf::from(rel);
    if as_path.is_absolute() {
        return Err(format!("absolute paths are forbidden in fix actions: {rel:?}"));
    }
    for c in as_path.components() {
        match c {
            Component::CurDir | Component::Normal(_) => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!("unsafe path in fix action (.. or root): {rel:?}"));
            }
        }
    }
    Ok(())
}

fn ensure_no_symlink_components(project_path: &Path, rel: &str) -> Result<(), String> {
    let mut cur = project_path.to_path_buf();
    for c in Path::new(rel).components() {
        cur.push(c.as_os_str());
        match std::fs::symlink_metadata(&cur) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(format!("unsafe symlink path component in fix action: {cur:?}"));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(format!("failed to stat path component {cur:?}: {e}")),
        }
    }
    Ok(())
}

/// Validates a fix-action path is safe to resolve under `project_path`.
pub(crate) fn check_action_path(project_path: &Path, rel: &str) -> Result<(), String> {
    safe_rel_path(rel)?;
    ensure_no_symlink_components(project_path, rel)
}

/// Write-to-temp-then-rename for per-file atomicity (spec §9 "Backups and
/// atomicity"). Grounded on `init/apply.rs`'s `atomic_write`, including its
/// Windows rename-can't-overwrite fallback.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("failed to create dir {parent:?}: {e}"))?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    if tmp.exists() {
        let _ = std::fs::remove_file(&tmp);
    }
    std::fs::write(&tmp, content.as_bytes()).map_err(|e| format!("failed to write tmp file {tmp:?}: {e}"))?;
    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            if path.exists() {
                std::fs::remove_file(path).map_err(|e2| format!("failed to remove existing file {path:?}: {e2}"))?;
                std::fs::rename(&tmp, path).map_err(|e3| format!("failed to rename tmp file into place: {e3}"))
            } else {
                Err(format!("failed to rename tmp file into place: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(safe_rel_path("../outside.txt").is_err());
    }

    #[test]
    fn rejects_absolute_paths() {
        assert!(safe_rel_path("/etc/passwd").is_err());
    }

    #[test]
    fn accepts_an_ordinary_relative_path() {
        assert!(safe_rel_path("src/components/AIDisclosure.tsx").is_ok());
    }
}
