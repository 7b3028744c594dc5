//! Service Layer (spec §4.K). Thin façades over the components above,
//! sharing one mutable `ApplicationState`. No compliance logic lives here --
//! every function below is a straight call into `collector`/`orchestrator`/
//! `fix::*`/`catalogue`, with `ApiError` mapping at the boundary (per
//! `errors.rs`: "the service layer is the only place external callers see
//! errors").
//!
//! Grounded on `app.rs`'s free-function-per-operation style (config load,
//! then dispatch, then output) and `response.rs`'s finalize-into-a-DTO idiom,
//! collapsed here into the plain `api.rs` DTOs rather than a bespoke
//! finalizer per endpoint.

pub mod memory;

use crate::api::{
    ClassifyOutput, FixAllSummary, FixPlan, FixResult, FixValidation, HistoryFile, Obligation,
    ReportFormat, ReportOutput, ScanResult, StatusInfo,
};
use crate::catalogue::Catalogue;
use crate::collector;
use crate::errors::ApiError;
use crate::events::{Event, EventBus, ScanCompleted, ScanStarted};
use crate::fix::applier;
use crate::fix::history;
use crate::fix::registry::{self, FixContext};
use crate::orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Single mutable state shared by every façade (spec §4.K/§5: "single
/// writer... no locking required" because requests are handled one at a
/// time). The LLM conversation buffer and onboarding profile named in spec
/// §4.K/§6 back the `chat`/`onboarding` collaborators; those transports are
/// out of scope here (see DESIGN.md), so this struct carries only the state
/// the core's own operations need.
pub struct ApplicationState {
    pub catalogue: Arc<Catalogue>,
    pub project_path: PathBuf,
    pub framework: Option<String>,
    pub last_scan: Option<ScanResult>,
    pub bus: EventBus,
    started_at: Instant,
}

impl ApplicationState {
    pub fn new(catalogue: Arc<Catalogue>, project_path: PathBuf) -> Self {
        Self {
            catalogue,
            project_path,
            framework: None,
            last_scan: None,
            bus: EventBus::new(),
            started_at: Instant::now(),
        }
    }

    pub fn set_framework(&mut self, framework: Option<String>) {
        self.framework = framework;
    }

    fn fix_context(&self) -> FixContext<'_> {
        FixContext {
            project_path: &self.project_path,
            framework: self.framework.clone(),
            existing_files: collector::rel_paths(&self.project_path),
        }
    }
}

/// `scan` (spec §6): collects the project tree and runs the full layer
/// pipeline, caching the result on `state` and appending to project memory.
pub fn scan(state: &mut ApplicationState) -> Result<ScanResult, ApiError> {
    state.bus.emit(Event::ScanStarted(ScanStarted {
        project_path: state.project_path.clone(),
    }));
    let start = Instant::now();

    let ctx = collector::collect(&state.project_path);
    let result = orchestrator::scan(&ctx, &state.catalogue, now_rfc3339());

    state.bus.emit(Event::ScanCompleted(ScanCompleted {
        project_path: state.project_path.clone(),
        total_score: result.score.total_score,
        duration_ms: start.elapsed().as_millis() as u64,
    }));

    memory::append_scan(&state.project_path, &result).map_err(ApiError::scan)?;
    state.last_scan = Some(result.clone());
    Ok(result)
}

fn require_last_scan(state: &ApplicationState) -> Result<&ScanResult, ApiError> {
    state
        .last_scan
        .as_ref()
        .ok_or_else(|| ApiError::validation("no scan has been run yet"))
}

/// `fix/preview` (spec §6): 404 when the finding or a matching strategy
/// doesn't exist.
pub fn fix_preview(
    state: &ApplicationState,
    check_id: &str,
    obligation_id: Option<&str>,
) -> Result<FixPlan, ApiError> {
    let last_scan = require_last_scan(state)?;
    let finding = last_scan
        .find_finding(check_id, obligation_id)
        .ok_or_else(|| ApiError::not_found(format!("no finding for check {check_id:?}")))?;
    registry::plan_for(finding, &state.fix_context(), &state.catalogue)
        .ok_or_else(|| ApiError::not_found(format!("no fix strategy for check {check_id:?}")))
}

/// `fix/apply` (spec §6). A 404 is only raised by `fix_preview`; once a plan
/// exists, per-action failures surface as `FixResult{applied: false, error}`,
/// not as an `ApiError` (spec §4 "Failure semantics": "abort the plan, return
/// applied=false with an error message").
pub fn fix_apply(
    state: &mut ApplicationState,
    check_id: &str,
    obligation_id: Option<&str>,
) -> Result<FixResult, ApiError> {
    let plan = fix_preview(state, check_id, obligation_id)?;
    let score_before = require_last_scan(state)?.score.total_score;
    let (result, new_scan) = applier::apply_fix(
        &plan,
        &state.project_path,
        &state.catalogue,
        score_before,
        &state.bus,
    );
    if let Some(new_scan) = new_scan {
        state.last_scan = Some(new_scan);
    }
    memory::append_fix(&state.project_path, check_id, result.applied).map_err(ApiError::scan)?;
    Ok(result)
}

/// `fix/apply-and-validate` (spec §6).
pub fn fix_apply_and_validate(
    state: &mut ApplicationState,
    check_id: &str,
    obligation_id: Option<&str>,
) -> Result<FixResult, ApiError> {
    let plan = fix_preview(state, check_id, obligation_id)?;
    let last_scan = require_last_scan(state)?.clone();
    let result = applier::apply_and_validate(
        &plan,
        &state.project_path,
        &state.catalogue,
        &last_scan,
        &state.bus,
    );
    memory::append_fix(&state.project_path, check_id, result.applied).map_err(ApiError::scan)?;
    if result.applied {
        state.last_scan = Some(scan(state)?);
    }
    Ok(result)
}

/// `fix/apply-all` (spec §6): plans are generated once from the cached scan
/// and applied in order; `state.last_scan` is refreshed with one final
/// re-scan so later façade calls see every written file.
pub fn fix_apply_all(state: &mut ApplicationState) -> Result<(Vec<FixResult>, FixAllSummary), ApiError> {
    let last_scan = require_last_scan(state)?.clone();
    let framework = state.framework.clone();
    let (results, summary) =
        applier::apply_all(&state.project_path, &state.catalogue, &last_scan, framework, &state.bus);
    for result in &results {
        memory::append_fix(&state.project_path, &result.plan.check_id, result.applied)
            .map_err(ApiError::scan)?;
    }
    state.last_scan = Some(scan(state)?);
    Ok((results, summary))
}

/// `fix/apply-all` with per-plan validation (spec §4.H `applyAllAndValidate`).
pub fn fix_apply_all_and_validate(
    state: &mut ApplicationState,
) -> Result<(Vec<FixResult>, FixAllSummary), ApiError> {
    let last_scan = require_last_scan(state)?.clone();
    let framework = state.framework.clone();
    let (results, summary) = applier::apply_all_and_validate(
        &state.project_path,
        &state.catalogue,
        &last_scan,
        framework,
        &state.bus,
    );
    for result in &results {
        memory::append_fix(&state.project_path, &result.plan.check_id, result.applied)
            .map_err(ApiError::scan)?;
    }
    state.last_scan = Some(scan(state)?);
    Ok((results, summary))
}

/// `fix/undo` (spec §6). Every undo failure (empty history, unknown id,
/// missing edit backup) is reported as `not_found`: the spec's endpoint
/// table names only a 404 for this operation, and distinguishing "no such
/// fix" from "corrupt backup" would need a typed error the Undo Manager
/// doesn't produce (see DESIGN.md).
pub fn fix_undo(state: &mut ApplicationState, id: Option<u64>) -> Result<FixValidation, ApiError> {
    let validation = match id {
        Some(id) => history::undo_by_id(&state.project_path, id, &state.catalogue, &state.bus),
        None => history::undo_last(&state.project_path, &state.catalogue, &state.bus),
    }
    .map_err(ApiError::not_found)?;
    state.last_scan = Some(scan(state)?);
    Ok(validation)
}

/// `fix/history` (spec §6).
pub fn fix_history(state: &ApplicationState) -> Result<HistoryFile, ApiError> {
    history::load(&state.project_path).map_err(ApiError::scan)
}

/// `status` (spec §6).
pub fn status(state: &ApplicationState) -> StatusInfo {
    StatusInfo {
        ready: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_ms: state.started_at.elapsed().as_millis() as u64,
        last_scan: state.last_scan.clone(),
    }
}

/// `complior_explain` tool (spec §6.2).
pub fn explain(state: &ApplicationState, obligation_id: &str) -> Result<Obligation, ApiError> {
    state
        .catalogue
        .obligation(obligation_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("no obligation {obligation_id:?}")))
}

/// `complior_search_tool` tool (spec §6.2): case-insensitive substring match
/// over title/description/article.
pub fn search_obligations(state: &ApplicationState, query: &str) -> Vec<Obligation> {
    let q = query.to_lowercase();
    state
        .catalogue
        .obligations
        .iter()
        .filter(|o| {
            o.title.to_lowercase().contains(&q)
                || o.description.to_lowercase().contains(&q)
                || o.article.to_lowercase().contains(&q)
        })
        .cloned()
        .collect()
}

/// `complior_classify` tool (spec §6.2): the scoring engine's own output,
/// projected without the full finding list.
pub fn classify(state: &ApplicationState) -> Result<ClassifyOutput, ApiError> {
    let scan = require_last_scan(state)?;
    Ok(ClassifyOutput {
        zone: scan.score.zone,
        total_score: scan.score.total_score,
        critical_cap_applied: scan.score.critical_cap_applied,
        category_scores: scan.score.category_scores.clone(),
    })
}

fn render_markdown_report(scan: &ScanResult) -> String {
    use crate::api::CheckResult;
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "# Compliance report\n");
    let _ = writeln!(
        out,
        "Zone: **{:?}**, score: **{:.2}**\n",
        scan.score.zone, scan.score.total_score
    );
    let _ = writeln!(out, "## Category scores\n");
    for c in &scan.score.category_scores {
        let _ = writeln!(out, "- {} (weight {:.0}): {:.2}", c.category, c.weight, c.score);
    }
    let _ = writeln!(out, "\n## Findings\n");
    for f in &scan.findings {
        match &f.result {
            CheckResult::Fail(fail) => {
                let _ = writeln!(out, "- FAIL `{}`: {}", fail.check_id, fail.message);
            }
            CheckResult::Pass(p) => {
                let _ = writeln!(out, "- pass `{}`: {}", p.check_id, p.message);
            }
            CheckResult::Skip(s) => {
                let _ = writeln!(out, "- skip `{}`: {}", s.check_id, s.reason);
            }
        }
    }
    out
}

/// `report` (spec §6): `markdown`/`json` render the cached scan; `pdf` is
/// named by the spec's format enum but has no backing crate in this stack
/// (see DESIGN.md), so it is a validation error rather than silently
/// downgraded.
pub fn report(state: &ApplicationState, format: ReportFormat) -> Result<ReportOutput, ApiError> {
    let scan = require_last_scan(state)?;
    let content = match format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(scan).map_err(|e| ApiError::scan(e.to_string()))?
        }
        ReportFormat::Markdown => render_markdown_report(scan),
        ReportFormat::Pdf => {
            return Err(ApiError::validation("pdf reports are not supported"));
        }
    };
    Ok(ReportOutput { format, content })
}
