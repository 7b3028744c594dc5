//! Rule Layers L1-L4 (spec §4.C). Four independent layers over one
//! ScanContext, executed in strict numeric order because L4 consumes L3's
//! output (spec §5).

pub mod l1_presence;
pub mod l2_document;
pub mod l3_config;
pub mod l4_patterns;

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Case-insensitive globset builder shared by L1 (file-path patterns) and L2
/// (basename patterns). Grounded on `checks/common.rs`'s `build_globset`.
pub fn build_globset_ci(patterns: &[String]) -> Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        let glob = globset::GlobBuilder::new(p)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| format!("bad glob {p:?}: {e}"))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| format!("failed to build globset: {e}"))
}

pub fn single_glob_ci(pattern: &str) -> Result<Glob, String> {
    globset::GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| format!("bad glob {pattern:?}: {e}"))
}

/// 1-indexed line number for a byte offset, via a single newline count
/// (spec §9: "line-number attribution is derived from the match offset via
/// a one-pass newline count").
pub fn line_for_offset(content: &str, offset: usize) -> usize {
    content.as_bytes()[..offset.min(content.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}
