//! File Collector (spec §4.B). Grounded on `checks/common.rs`'s
//! walk+normalize-rel-path helpers and `checks/loc.rs`'s WalkDir usage.

use crate::api::{FileSnapshot, ScanContext};
use std::path::Path;
use walkdir::WalkDir;

const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    "coverage",
    "__pycache__",
    "vendor",
    ".cache",
    ".output",
];

const INCLUDED_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "json", "md", "yaml", "yml", "py", "html", "css", "toml", "go",
];

const MAX_FILES: usize = 500;
const MAX_FILE_BYTES: u64 = 1024 * 1024;

fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

fn normalize_rel_path(project_root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(project_root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Walks `project_path` depth-first, applying the exclusion/inclusion/cap
/// policies verbatim from spec §4.B. Read errors are skipped silently; the
/// walk never aborts because one file failed.
pub fn collect(project_path: &Path) -> ScanContext {
    let mut files = Vec::new();

    let walker = WalkDir::new(project_path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                return !is_excluded_dir(&name);
            }
            true
        });

    for entry in walker.filter_map(Result::ok) {
        if files.len() >= MAX_FILES {
            break;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let extension = extension_of(path);
        if !INCLUDED_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.len() > MAX_FILE_BYTES {
            continue;
        }

        let Some(rel_path) = normalize_rel_path(project_path, path) else {
            continue;
        };
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };

        files.push(FileSnapshot {
            absolute_path: path.to_path_buf(),
            rel_path,
            extension,
            content,
        });
    }

    ScanContext {
        project_root: project_path.to_path_buf(),
        files,
    }
}

/// Project-relative paths of every file a fresh collect would return.
/// Shared by the fix registry's `existingFiles` and by service-layer façades
/// that need an up-to-date file list without a full scan.
pub fn rel_paths(project_path: &Path) -> Vec<String> {
    collect(project_path).files.into_iter().map(|f| f.rel_path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn excludes_noise_directories_and_keeps_real_sources() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "noise").unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/app.ts"), "export const x = 1;").unwrap();

        let ctx = collect(root);
        assert_eq!(ctx.files.len(), 1);
        assert_eq!(ctx.files[0].rel_path, "src/app.ts");
    }

    #[test]
    fn skips_files_with_unlisted_extensions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("README.md"), "# hi").unwrap();

        let ctx = collect(root);
        assert_eq!(ctx.files.len(), 1);
        assert_eq!(ctx.files[0].extension, "md");
    }

    #[test]
    fn skips_files_larger_than_one_mebibyte() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let big = "a".repeat((MAX_FILE_BYTES as usize) + 1);
        fs::write(root.join("big.js"), big).unwrap();
        fs::write(root.join("small.js"), "ok").unwrap();

        let ctx = collect(root);
        assert_eq!(ctx.files.len(), 1);
        assert_eq!(ctx.files[0].rel_path, "small.js");
    }

    #[test]
    fn caps_at_500_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for i in 0..520 {
            fs::write(root.join(format!("f{i}.js")), "x").unwrap();
        }

        let ctx = collect(root);
        assert_eq!(ctx.files.len(), MAX_FILES);
    }
}
