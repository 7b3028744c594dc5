//! Shared data model (spec §3). DTOs here are the vocabulary every other
//! module speaks; nothing below contains compliance logic of its own.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ordered: info < low < medium < high < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Obligation {
    pub id: String,
    pub article: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub applicable_roles: Vec<String>,
    #[serde(default)]
    pub applicable_risk_levels: Vec<String>,
    pub severity: Severity,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub penalty: Option<String>,
    #[serde(default)]
    pub automatable: bool,
    #[serde(default)]
    pub template_backed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WeightedCategory {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub obligations_in_category: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RequiredSection {
    pub title: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DocumentValidator {
    pub id: String,
    /// Case-insensitive basename globs.
    pub filename_patterns: Vec<String>,
    pub sections: Vec<RequiredSection>,
    #[serde(default)]
    pub obligation_id: Option<String>,
    #[serde(default)]
    pub article: Option<String>,
}

/// Layer tag, also used as the aggregation-weight key (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Layer {
    L1,
    L2,
    L3,
    L4,
}

impl Layer {
    pub const fn weight(self) -> f64 {
        match self {
            Layer::L1 => 1.0,
            Layer::L2 => 0.95,
            Layer::L3 => 0.85,
            Layer::L4 => 0.70,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Pass,
    LikelyPass,
    Uncertain,
    LikelyFail,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfidenceRecord {
    pub layer: Layer,
    pub confidence: f64,
    pub level: ConfidenceLevel,
    #[serde(default)]
    pub obligation_id: Option<String>,
}

/// Immutable record of one collected source file (§3 FileSnapshot).
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub absolute_path: PathBuf,
    pub rel_path: String,
    pub extension: String,
    pub content: String,
}

/// Aggregate of the project root and the ordered snapshots (§3 ScanContext).
/// Single-use: built once by the File Collector, consumed once by the layers.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub project_root: PathBuf,
    pub files: Vec<FileSnapshot>,
}

impl ScanContext {
    pub fn file_by_rel(&self, rel: &str) -> Option<&FileSnapshot> {
        self.files.iter().find(|f| f.rel_path == rel)
    }

    pub fn files_with_ext<'a>(&'a self, exts: &'a [&str]) -> impl Iterator<Item = &'a FileSnapshot> {
        self.files
            .iter()
            .filter(move |f| exts.iter().any(|e| *e == f.extension))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckPass {
    pub check_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckFail {
    pub check_id: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub obligation_id: Option<String>,
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub fix: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckSkip {
    pub check_id: String,
    pub reason: String,
}

/// Tagged sum over a check's three possible outcomes (§3 CheckResult).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckResult {
    Pass(CheckPass),
    Fail(CheckFail),
    Skip(CheckSkip),
}

impl CheckResult {
    pub fn check_id(&self) -> &str {
        match self {
            CheckResult::Pass(p) => &p.check_id,
            CheckResult::Fail(f) => &f.check_id,
            CheckResult::Skip(s) => &s.check_id,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, CheckResult::Skip(_))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckResult::Fail(_))
    }

    pub fn obligation_id(&self) -> Option<&str> {
        match self {
            CheckResult::Fail(f) => f.obligation_id.as_deref(),
            _ => None,
        }
    }

    pub fn as_fail(&self) -> Option<&CheckFail> {
        match self {
            CheckResult::Fail(f) => Some(f),
            _ => None,
        }
    }

    /// The `type` tag used by FixValidation's before/after comparison.
    pub fn type_str(&self) -> &'static str {
        match self {
            CheckResult::Pass(_) => "pass",
            CheckResult::Fail(_) => "fail",
            CheckResult::Skip(_) => "skip",
        }
    }
}

/// User-visible projection of a CheckResult plus confidence (§3 Finding).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Finding {
    pub result: CheckResult,
    #[serde(default)]
    pub confidence: Option<ConfidenceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Red,
    Yellow,
    Green,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryScore {
    pub category: String,
    pub weight: f64,
    pub score: f64,
    pub obligation_count: usize,
    pub passed_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConfidenceSummary {
    pub pass: usize,
    pub likely_pass: usize,
    pub uncertain: usize,
    pub likely_fail: usize,
    pub fail: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoreBreakdown {
    pub total_score: f64,
    pub zone: Zone,
    pub category_scores: Vec<CategoryScore>,
    pub critical_cap_applied: bool,
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub skipped_checks: usize,
    pub confidence_summary: ConfidenceSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScanResult {
    pub score: ScoreBreakdown,
    pub findings: Vec<Finding>,
    pub project_path: String,
    pub scanned_at: String,
    pub duration_ms: u64,
    pub files_scanned: usize,
}

impl ScanResult {
    pub fn find_finding(&self, check_id: &str, obligation_id: Option<&str>) -> Option<&Finding> {
        self.findings.iter().find(|f| {
            f.result.check_id() == check_id
                && obligation_id
                    .map(|o| f.result.obligation_id() == Some(o))
                    .unwrap_or(true)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FixAction {
    Create { path: String, content: String },
    Edit {
        path: String,
        old_content: String,
        new_content: String,
    },
}

impl FixAction {
    pub fn path(&self) -> &str {
        match self {
            FixAction::Create { path, .. } => path,
            FixAction::Edit { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    CodeInjection,
    TemplateGeneration,
    ConfigFix,
    MetadataGeneration,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FixPlan {
    pub obligation_id: Option<String>,
    pub check_id: String,
    pub article: Option<String>,
    pub fix_type: FixType,
    pub framework: Option<String>,
    pub actions: Vec<FixAction>,
    pub diff: String,
    pub score_impact: i32,
    pub commit_message: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Create,
    Edit,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppliedFile {
    pub path: String,
    pub action: FileAction,
    /// Empty string when no backup was needed (create of a non-existent file).
    pub backup_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FixValidation {
    pub check_id: String,
    pub obligation_id: Option<String>,
    pub article: Option<String>,
    pub before: String,
    pub after: String,
    pub score_delta: f64,
    pub total_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FixResult {
    pub plan: FixPlan,
    pub applied: bool,
    pub score_before: f64,
    pub score_after: f64,
    pub backups: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub validation: Option<FixValidation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Applied,
    Undone,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryEntry {
    pub id: u64,
    pub check_id: String,
    pub obligation_id: Option<String>,
    pub fix_type: FixType,
    pub status: HistoryStatus,
    pub timestamp: String,
    pub files: Vec<AppliedFile>,
    pub score_before: f64,
    pub score_after: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HistoryFile {
    pub entries: Vec<HistoryEntry>,
}

/// One entry of project memory's `scanHistory[]` (spec §6 persisted state).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MemoryScanEntry {
    pub scanned_at: String,
    pub total_score: f64,
    pub zone: Zone,
}

/// One entry of project memory's `fixHistory[]` (spec §6 persisted state).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MemoryFixEntry {
    pub timestamp: String,
    pub check_id: String,
    pub applied: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MemoryFile {
    pub scan_history: Vec<MemoryScanEntry>,
    pub fix_history: Vec<MemoryFixEntry>,
}

/// `{results, summary}` shape of the `fix/apply-all` contract (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FixAllSummary {
    pub score_before: f64,
    pub score_after: f64,
    pub applied_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusInfo {
    pub ready: bool,
    pub version: String,
    pub uptime_ms: u64,
    #[serde(default)]
    pub last_scan: Option<ScanResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Markdown,
    Json,
    Pdf,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportOutput {
    pub format: ReportFormat,
    pub content: String,
}

/// The `complior_classify` tool's narrower projection of a ScanResult's score.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifyOutput {
    pub zone: Zone,
    pub total_score: f64,
    pub critical_cap_applied: bool,
    pub category_scores: Vec<CategoryScore>,
}
