//! Fix Applier / Validator (spec §4.H). Grounded on `init/apply.rs`'s
//! atomic-write + backup-before-overwrite pattern, generalized from compas's
//! allowlist-scoped init plan to arbitrary in-project fix-action paths.

use crate::api::{
    AppliedFile, FileAction, FixAction, FixAllSummary, FixPlan, FixResult, FixValidation,
    ScanResult,
};
use crate::catalogue::Catalogue;
use crate::collector;
use crate::events::{Event, EventBus, FileChanged, FixValidated, ScoreUpdated};
use crate::fix::history;
use crate::fix::registry::{self, FixContext};
use crate::orchestrator;
use std::path::{Path, PathBuf};

fn backup_path(project_path: &Path, rel: &str) -> PathBuf {
    let flattened = rel.replace(['/', '\\'], "_");
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6f");
    project_path.join(".complior").join("backups").join(format!("{timestamp}-{flattened}"))
}

/// Substitutes a `[TEMPLATE:X]` placeholder (spec §4.H step 3) with the
/// contents of template X from the catalogue's template directory.
fn resolve_content(catalogue: &Catalogue, content: &str) -> Result<String, String> {
    match content.strip_prefix("[TEMPLATE:").and_then(|s| s.strip_suffix(']')) {
        Some(template_file) => {
            let path = catalogue.template_path(template_file);
            std::fs::read_to_string(&path).map_err(|e| format!("failed to load template {path:?}: {e}"))
        }
        None => Ok(content.to_string()),
    }
}

struct ApplyOutcome {
    files: Vec<AppliedFile>,
    error: Option<String>,
}

fn back_up_before_write(project_path: &Path, rel: &str, target: &Path, is_edit: bool) -> Result<(FileAction, String), String> {
    let needs_backup = is_edit || target.exists();
    if !needs_backup {
        return Ok((FileAction::Create, String::new()));
    }
    let bpath = backup_path(project_path, rel);
    if let Some(parent) = bpath.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("failed to create backup dir {parent:?}: {e}"))?;
    }
    let current = std::fs::read_to_string(target).unwrap_or_default();
    std::fs::write(&bpath, &current).map_err(|e| format!("failed to back up {target:?}: {e}"))?;
    let action = if is_edit { FileAction::Edit } else { FileAction::Create };
    Ok((action, bpath.display().to_string()))
}

fn apply_actions(
    project_path: &Path,
    catalogue: &Catalogue,
    actions: &[FixAction],
    bus: &EventBus,
) -> ApplyOutcome {
    let mut files = Vec::new();
    for action in actions {
        let rel = action.path();
        if let Err(e) = crate::fix::check_action_path(project_path, rel) {
            return ApplyOutcome { files, error: Some(e) };
        }
        let target = project_path.join(rel);
        let is_edit = matches!(action, FixAction::Edit { .. });

        let (file_action, backup) = match back_up_before_write(project_path, rel, &target, is_edit) {
            Ok(v) => v,
            Err(e) => return ApplyOutcome { files, error: Some(e) },
        };

        let new_content = match action {
            FixAction::Create { content, .. } => content.as_str(),
            FixAction::Edit { new_content, .. } => new_content.as_str(),
        };
        let resolved = match resolve_content(catalogue, new_content) {
            Ok(c) => c,
            Err(e) => return ApplyOutcome { files, error: Some(e) },
        };

        if let Err(e) = super::atomic_write(&target, &resolved) {
            return ApplyOutcome { files, error: Some(e) };
        }

        let applied = AppliedFile {
            path: rel.to_string(),
            action: file_action,
            backup_path: backup,
        };
        bus.emit(Event::FileChanged(FileChanged { file: applied.clone() }));
        files.push(applied);
    }
    ApplyOutcome { files, error: None }
}

fn collected_backups(files: &[AppliedFile]) -> Vec<String> {
    files.iter().filter(|f| !f.backup_path.is_empty()).map(|f| f.backup_path.clone()).collect()
}

/// `applyFix(plan)` (spec §4.H). On success, returns the post-apply
/// ScanResult alongside the FixResult so callers building a FixValidation
/// (or chaining applyAll) don't have to re-scan a second time.
pub fn apply_fix(
    plan: &FixPlan,
    project_path: &Path,
    catalogue: &Catalogue,
    score_before: f64,
    bus: &EventBus,
) -> (FixResult, Option<ScanResult>) {
    let outcome = apply_actions(project_path, catalogue, &plan.actions, bus);

    if let Some(error) = outcome.error {
        return (
            FixResult {
                plan: plan.clone(),
                applied: false,
                score_before,
                score_after: score_before,
                backups: collected_backups(&outcome.files),
                error: Some(error),
                validation: None,
            },
            None,
        );
    }

    let ctx = collector::collect(project_path);
    let scan = orchestrator::scan(&ctx, catalogue, chrono::Utc::now().to_rfc3339());
    let score_after = scan.score.total_score;

    bus.emit(Event::ScoreUpdated(ScoreUpdated {
        before: score_before,
        after: scan.score.clone(),
    }));

    if let Err(e) = history::append_applied(
        project_path,
        &plan.check_id,
        plan.obligation_id.clone(),
        plan.fix_type,
        outcome.files.clone(),
        score_before,
        score_after,
    ) {
        return (
            FixResult {
                plan: plan.clone(),
                applied: false,
                score_before,
                score_after,
                backups: collected_backups(&outcome.files),
                error: Some(e),
                validation: None,
            },
            Some(scan),
        );
    }

    (
        FixResult {
            plan: plan.clone(),
            applied: true,
            score_before,
            score_after,
            backups: collected_backups(&outcome.files),
            error: None,
            validation: None,
        },
        Some(scan),
    )
}

/// `applyAndValidate(plan)` (spec §4.H): wraps `apply_fix`, locates the
/// finding for `(checkId, obligationId)` in the before/after scans, and
/// emits `fix.validated`.
pub fn apply_and_validate(
    plan: &FixPlan,
    project_path: &Path,
    catalogue: &Catalogue,
    last_scan: &ScanResult,
    bus: &EventBus,
) -> FixResult {
    let score_before = last_scan.score.total_score;
    let (mut result, new_scan) = apply_fix(plan, project_path, catalogue, score_before, bus);

    if let Some(new_scan) = new_scan {
        let before_type = last_scan
            .find_finding(&plan.check_id, plan.obligation_id.as_deref())
            .map(|f| f.result.type_str())
            .unwrap_or("skip");
        let after_type = new_scan
            .find_finding(&plan.check_id, plan.obligation_id.as_deref())
            .map(|f| f.result.type_str())
            .unwrap_or("skip");
        let validation = FixValidation {
            check_id: plan.check_id.clone(),
            obligation_id: plan.obligation_id.clone(),
            article: plan.article.clone(),
            before: before_type.to_string(),
            after: after_type.to_string(),
            score_delta: new_scan.score.total_score - score_before,
            total_score: new_scan.score.total_score,
        };
        bus.emit(Event::FixValidated(FixValidated { validation: validation.clone() }));
        result.validation = Some(validation);
    }

    result
}

fn summarize(last_scan: &ScanResult, results: &[FixResult]) -> FixAllSummary {
    let score_before = last_scan.score.total_score;
    let score_after = results.last().map(|r| r.score_after).unwrap_or(score_before);
    let applied_count = results.iter().filter(|r| r.applied).count();
    let failed_count = results.len() - applied_count;
    FixAllSummary { score_before, score_after, applied_count, failed_count }
}

/// `applyAll()` (spec §4.H): plans are generated once from `last_scan`, then
/// applied in order without per-plan validation; each apply re-scans, so a
/// later plan's documentation catch-all sees files the earlier plan wrote.
pub fn apply_all(
    project_path: &Path,
    catalogue: &Catalogue,
    last_scan: &ScanResult,
    framework: Option<String>,
    bus: &EventBus,
) -> (Vec<FixResult>, FixAllSummary) {
    let reg_ctx = FixContext {
        project_path,
        framework,
        existing_files: collector::rel_paths(project_path),
    };
    let plans = registry::preview_all(&last_scan.findings, &reg_ctx, catalogue);

    let mut results = Vec::with_capacity(plans.len());
    let mut score_before = last_scan.score.total_score;
    for plan in &plans {
        let (result, new_scan) = apply_fix(plan, project_path, catalogue, score_before, bus);
        let applied = result.applied;
        if let Some(new_scan) = &new_scan {
            score_before = new_scan.score.total_score;
        }
        results.push(result);
        if !applied {
            break;
        }
    }

    let summary = summarize(last_scan, &results);
    (results, summary)
}

/// `applyAllAndValidate` (spec §4.H): same ordering as `apply_all`, but each
/// plan is applied through `apply_and_validate` so every result carries a
/// FixValidation.
pub fn apply_all_and_validate(
    project_path: &Path,
    catalogue: &Catalogue,
    last_scan: &ScanResult,
    framework: Option<String>,
    bus: &EventBus,
) -> (Vec<FixResult>, FixAllSummary) {
    let reg_ctx = FixContext {
        project_path,
        framework,
        existing_files: collector::rel_paths(project_path),
    };
    let plans = registry::preview_all(&last_scan.findings, &reg_ctx, catalogue);

    let mut results = Vec::with_capacity(plans.len());
    let mut current_scan = last_scan.clone();
    for plan in &plans {
        let result = apply_and_validate(plan, project_path, catalogue, &current_scan, bus);
        let applied = result.applied;
        results.push(result);
        if !applied {
            break;
        }
        let ctx = collector::collect(project_path);
        current_scan = orchestrator::scan(&ctx, catalogue, chrono::Utc::now().to_rfc3339());
    }

    let summary = summarize(last_scan, &results);
    (results, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FixType;
    use tempfile::tempdir;

    fn empty_scan(total_score: f64) -> ScanResult {
        ScanResult {
            score: crate::api::ScoreBreakdown {
                total_score,
                zone: crate::api::Zone::Green,
                category_scores: vec![],
                critical_cap_applied: false,
                total_checks: 0,
                passed_checks: 0,
                failed_checks: 0,
                skipped_checks: 0,
                confidence_summary: crate::api::ConfidenceSummary::default(),
            },
            findings: vec![],
            project_path: "/proj".to_string(),
            scanned_at: "now".to_string(),
            duration_ms: 0,
            files_scanned: 0,
        }
    }

    fn disclosure_plan() -> FixPlan {
        FixPlan {
            obligation_id: Some("obl-disclosure".to_string()),
            check_id: "ai-disclosure".to_string(),
            article: Some("Art. 13".to_string()),
            fix_type: FixType::CodeInjection,
            framework: None,
            actions: vec![FixAction::Create {
                path: "src/components/AIDisclosure.tsx".to_string(),
                content: "export function AIDisclosure() {}".to_string(),
            }],
            diff: String::new(),
            score_impact: 15,
            commit_message: "complior: add disclosure".to_string(),
            description: "add disclosure".to_string(),
        }
    }

    #[test]
    fn apply_fix_creates_the_file_and_records_history() {
        let dir = tempdir().unwrap();
        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        let (result, scan) = apply_fix(&disclosure_plan(), dir.path(), &catalogue, 70.0, &bus);
        assert!(result.applied);
        assert!(scan.is_some());
        assert!(dir.path().join("src/components/AIDisclosure.tsx").is_file());
        assert!(result.backups.is_empty());
        assert_eq!(history::load(dir.path()).unwrap().entries.len(), 1);
    }

    #[test]
    fn apply_fix_rejects_a_path_escaping_the_project() {
        let dir = tempdir().unwrap();
        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        let mut plan = disclosure_plan();
        plan.actions = vec![FixAction::Create {
            path: "../outside.tsx".to_string(),
            content: "x".to_string(),
        }];
        let (result, scan) = apply_fix(&plan, dir.path(), &catalogue, 70.0, &bus);
        assert!(!result.applied);
        assert!(result.error.is_some());
        assert!(scan.is_none());
    }

    #[test]
    fn apply_and_validate_reports_before_and_after_types() {
        let dir = tempdir().unwrap();
        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        let last_scan = empty_scan(70.0);
        let result = apply_and_validate(&disclosure_plan(), dir.path(), &catalogue, &last_scan, &bus);
        assert!(result.applied);
        let validation = result.validation.expect("validation");
        assert_eq!(validation.before, "skip");
    }

    #[test]
    fn apply_all_applies_every_plan_generated_from_the_last_scan() {
        let dir = tempdir().unwrap();
        let catalogue = Catalogue::test_empty();
        let bus = EventBus::new();
        let mut scan = empty_scan(70.0);
        scan.findings.push(crate::api::Finding {
            result: crate::api::CheckResult::Fail(crate::api::CheckFail {
                check_id: "ai-disclosure".to_string(),
                message: "missing".to_string(),
                severity: crate::api::Severity::High,
                obligation_id: Some("obl-disclosure".to_string()),
                article: Some("Art. 13".to_string()),
                fix: None,
                file: None,
                line: None,
            }),
            confidence: None,
        });

        let (results, summary) = apply_all(dir.path(), &catalogue, &scan, None, &bus);
        assert_eq!(results.len(), 1);
        assert!(results[0].applied);
        assert_eq!(summary.applied_count, 1);
        assert_eq!(summary.failed_count, 0);
    }
}
