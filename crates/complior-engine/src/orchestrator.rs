//! Scanner Orchestrator (spec §4.F). Runs L1->L2->L3->L4 in strict order
//! (L4 consumes L3's typed output), then scores. Pure modulo timing: the
//! same ScanContext yields the same ScanResult apart from `duration_ms`.

use crate::api::{Finding, ScanContext, ScanResult};
use crate::catalogue::Catalogue;
use crate::layers::{l1_presence, l2_document, l3_config, l4_patterns};
use crate::scoring;
use std::time::Instant;

/// Runs a full scan over an already-collected ScanContext.
pub fn scan(ctx: &ScanContext, catalogue: &Catalogue, scanned_at: String) -> ScanResult {
    let start = Instant::now();

    let mut findings: Vec<Finding> = Vec::new();

    let l1 = l1_presence::run(ctx, catalogue);
    findings.extend(l1.findings);

    findings.extend(l2_document::run(ctx, catalogue));

    let l3 = l3_config::run(ctx, catalogue);
    let ai_sdk_detected = l3.ai_sdk_detected;
    findings.extend(l3.findings);

    findings.extend(l4_patterns::run(ctx, catalogue, ai_sdk_detected));

    let score = scoring::score(catalogue, &findings);

    ScanResult {
        score,
        findings,
        project_path: ctx.project_root.display().to_string(),
        scanned_at,
        duration_ms: start.elapsed().as_millis() as u64,
        files_scanned: ctx.files.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FileSnapshot;
    use crate::catalogue::schema::L1CheckEntry;
    use std::path::PathBuf;

    fn empty_ctx() -> ScanContext {
        ScanContext {
            project_root: PathBuf::from("/proj"),
            files: vec![],
        }
    }

    #[test]
    fn empty_project_scores_100_green_with_no_checks_defined() {
        let catalogue = Catalogue::test_empty();
        let result = scan(&empty_ctx(), &catalogue, "2026-01-01T00:00:00Z".to_string());
        assert_eq!(result.score.total_score, 100.0);
        assert_eq!(result.files_scanned, 0);
    }

    #[test]
    fn l1_check_absence_is_reflected_in_findings() {
        let mut catalogue = Catalogue::test_empty();
        catalogue.l1_checks = vec![L1CheckEntry {
            check_id: "ai-disclosure".to_string(),
            obligation_id: None,
            article: None,
            label: "AI disclosure UI".to_string(),
            file_path_patterns: vec!["**/AIDisclosure.*".to_string()],
            requires_ai_evidence: false,
            severity: crate::api::Severity::High,
            fix_hint: None,
        }];
        let ctx = ScanContext {
            project_root: PathBuf::from("/proj"),
            files: vec![FileSnapshot {
                absolute_path: PathBuf::from("/proj/src/a.ts"),
                rel_path: "src/a.ts".to_string(),
                extension: "ts".to_string(),
                content: "export default 1;".to_string(),
            }],
        };
        let result = scan(&ctx, &catalogue, "now".to_string());
        assert_eq!(result.findings.len(), 1);
        assert!(result.findings[0].result.is_fail());
    }
}
