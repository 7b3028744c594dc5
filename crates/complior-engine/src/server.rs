//! External Interface: the tool-call protocol half of spec §6 ("Seven tools
//! with JSON-schema-typed arguments... Each returns a text content block
//! (JSON-stringified for structured payloads) and an `isError` flag"). Every
//! tool method below is a thin wrapper over `service.rs`; none contains
//! compliance logic of its own.
//!
//! Grounded on the teacher's `server.rs`: the `#[tool_router]`/`#[tool]`/
//! `#[tool_handler]` macro wiring, `Parameters<T>`/`Json<T>` request/response
//! wrappers, and the `ok`/`error`-carrying output-struct convention (as in
//! its `GateOutput`/`ValidateOutput`).

use crate::api::{
    ClassifyOutput, FixAllSummary, FixPlan, FixResult, FixValidation, Obligation, ReportFormat,
    ScanResult, StatusInfo,
};
use crate::service::{self, ApplicationState};
use rmcp::{
    Json, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScanToolRequest {
    /// Overrides the server's project path for this call (and every call
    /// after it) when present.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct ScanToolOutput {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<ScanResult>,
}

/// The `fix/*` endpoint table (spec §6) collapsed into one tool with an `op`
/// discriminator, since the tool-call protocol has no notion of sub-paths.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FixOp {
    Preview,
    Apply,
    ApplyAndValidate,
    ApplyAll,
    ApplyAllAndValidate,
    Undo,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FixToolRequest {
    pub op: FixOp,
    #[serde(default)]
    pub check_id: Option<String>,
    #[serde(default)]
    pub obligation_id: Option<String>,
    #[serde(default)]
    pub history_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct FixToolOutput {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub plan: Option<FixPlan>,
    #[serde(default)]
    pub result: Option<FixResult>,
    #[serde(default)]
    pub results: Option<Vec<FixResult>>,
    #[serde(default)]
    pub summary: Option<FixAllSummary>,
    #[serde(default)]
    pub validation: Option<FixValidation>,
}

fn fix_error(message: String) -> FixToolOutput {
    FixToolOutput { ok: false, error: Some(message), ..Default::default() }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StatusToolRequest {}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExplainToolRequest {
    pub obligation_id: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExplainToolOutput {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub obligation: Option<Obligation>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchToolRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchToolOutput {
    pub matches: Vec<Obligation>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyToolRequest {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ClassifyToolOutput {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub classification: Option<ClassifyOutput>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReportToolRequest {
    #[serde(default)]
    pub format: Option<ReportFormat>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReportToolOutput {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub format: Option<ReportFormat>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone)]
pub struct ComplierServer {
    state: Arc<Mutex<ApplicationState>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ComplierServer {
    pub fn new(state: ApplicationState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            tool_router: Self::tool_router(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ApplicationState> {
        self.state.lock().expect("application state mutex poisoned")
    }

    #[tool(
        name = "complior_scan",
        description = "Scan the project against the regulation catalogue and return a ScanResult."
    )]
    async fn complior_scan(&self, params: Parameters<ScanToolRequest>) -> Json<ScanToolOutput> {
        let mut state = self.lock();
        if let Some(path) = params.0.path {
            state.project_path = path.into();
        }
        Json(match service::scan(&mut state) {
            Ok(result) => ScanToolOutput { ok: true, error: None, result: Some(result) },
            Err(e) => ScanToolOutput { ok: false, error: Some(e.message()), result: None },
        })
    }

    #[tool(
        name = "complior_fix",
        description = "Preview, apply, validate, or undo a compliance fix. op: preview|apply|apply_and_validate|apply_all|apply_all_and_validate|undo."
    )]
    async fn complior_fix(&self, params: Parameters<FixToolRequest>) -> Json<FixToolOutput> {
        let req = params.0;
        let mut state = self.lock();
        let obligation_id = req.obligation_id.as_deref();

        let out = match req.op {
            FixOp::Preview => match req.check_id.as_deref() {
                None => fix_error("check_id is required for op=preview".to_string()),
                Some(check_id) => match service::fix_preview(&state, check_id, obligation_id) {
                    Ok(plan) => FixToolOutput { ok: true, plan: Some(plan), ..Default::default() },
                    Err(e) => fix_error(e.message()),
                },
            },
            FixOp::Apply => match req.check_id.as_deref() {
                None => fix_error("check_id is required for op=apply".to_string()),
                Some(check_id) => match service::fix_apply(&mut state, check_id, obligation_id) {
                    Ok(result) => FixToolOutput { ok: result.applied, result: Some(result), ..Default::default() },
                    Err(e) => fix_error(e.message()),
                },
            },
            FixOp::ApplyAndValidate => match req.check_id.as_deref() {
                None => fix_error("check_id is required for op=apply_and_validate".to_string()),
                Some(check_id) => {
                    match service::fix_apply_and_validate(&mut state, check_id, obligation_id) {
                        Ok(result) => FixToolOutput {
                            ok: result.applied,
                            validation: result.validation.clone(),
                            result: Some(result),
                            ..Default::default()
                        },
                        Err(e) => fix_error(e.message()),
                    }
                }
            },
            FixOp::ApplyAll => match service::fix_apply_all(&mut state) {
                Ok((results, summary)) => FixToolOutput {
                    ok: true,
                    results: Some(results),
                    summary: Some(summary),
                    ..Default::default()
                },
                Err(e) => fix_error(e.message()),
            },
            FixOp::ApplyAllAndValidate => match service::fix_apply_all_and_validate(&mut state) {
                Ok((results, summary)) => FixToolOutput {
                    ok: true,
                    results: Some(results),
                    summary: Some(summary),
                    ..Default::default()
                },
                Err(e) => fix_error(e.message()),
            },
            FixOp::Undo => match service::fix_undo(&mut state, req.history_id) {
                Ok(validation) => {
                    FixToolOutput { ok: true, validation: Some(validation), ..Default::default() }
                }
                Err(e) => fix_error(e.message()),
            },
        };
        Json(out)
    }

    #[tool(
        name = "complior_status",
        description = "Report engine readiness, version, uptime, and the last ScanResult."
    )]
    async fn complior_status(&self, _params: Parameters<StatusToolRequest>) -> Json<StatusInfo> {
        Json(service::status(&self.lock()))
    }

    #[tool(
        name = "complior_explain",
        description = "Look up a single regulatory obligation by id."
    )]
    async fn complior_explain(&self, params: Parameters<ExplainToolRequest>) -> Json<ExplainToolOutput> {
        let state = self.lock();
        Json(match service::explain(&state, &params.0.obligation_id) {
            Ok(obligation) => ExplainToolOutput { ok: true, error: None, obligation: Some(obligation) },
            Err(e) => ExplainToolOutput { ok: false, error: Some(e.message()), obligation: None },
        })
    }

    #[tool(
        name = "complior_search_tool",
        description = "Search the regulation catalogue's obligations by title/description/article substring."
    )]
    async fn complior_search_tool(&self, params: Parameters<SearchToolRequest>) -> Json<SearchToolOutput> {
        let state = self.lock();
        Json(SearchToolOutput { matches: service::search_obligations(&state, &params.0.query) })
    }

    #[tool(
        name = "complior_classify",
        description = "Return the last scan's zone, total score, and category breakdown."
    )]
    async fn complior_classify(&self, _params: Parameters<ClassifyToolRequest>) -> Json<ClassifyToolOutput> {
        let state = self.lock();
        Json(match service::classify(&state) {
            Ok(classification) => {
                ClassifyToolOutput { ok: true, error: None, classification: Some(classification) }
            }
            Err(e) => ClassifyToolOutput { ok: false, error: Some(e.message()), classification: None },
        })
    }

    #[tool(
        name = "complior_report",
        description = "Render a compliance report from the last scan (markdown or json; pdf is unsupported)."
    )]
    async fn complior_report(&self, params: Parameters<ReportToolRequest>) -> Json<ReportToolOutput> {
        let state = self.lock();
        let format = params.0.format.unwrap_or(ReportFormat::Markdown);
        Json(match service::report(&state, format) {
            Ok(out) => ReportToolOutput { ok: true, error: None, format: Some(out.format), content: Some(out.content) },
            Err(e) => ReportToolOutput { ok: false, error: Some(e.message()), format: Some(format), content: None },
        })
    }
}

#[tool_handler]
impl ServerHandler for ComplierServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "complior: EU-AI-Act-shaped compliance scanner and fixer.\n\nQuickstart:\n  1) complior_scan {} to evaluate the project.\n  2) complior_fix {\"op\": \"apply_all\"} to apply every available fix.\n  3) complior_report {\"format\": \"markdown\"} for a human-readable summary.\n\nEnv defaults:\n  - COMPLIOR_PROJECT_PATH=<path>\n"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
