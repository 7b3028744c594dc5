//! On-disk shapes of the data tree described in spec §4.A / §9
//! ("catalogue as data, not code"). Every struct here is
//! `deny_unknown_fields` so a typo in the data tree is a load-time schema
//! error, not a silently-ignored field — same discipline as the teacher's
//! `config.rs`.

use crate::api::{DocumentValidator, Obligation, WeightedCategory};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObligationsFile {
    pub obligation: Vec<Obligation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringFile {
    pub category: Vec<WeightedCategory>,
    #[serde(default)]
    pub critical_obligation_ids: Vec<String>,
    #[serde(default)]
    pub critical_check_ids: Vec<String>,
    /// checkId -> category name, for L1 presence checks with no obligationId.
    #[serde(default)]
    pub fallback_category_by_check: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BannedPackageEntry {
    pub name: String,
    /// "any" or a specific ecosystem name (npm/pip/cargo/go).
    pub ecosystem: String,
    pub reason: String,
    pub obligation_id: String,
    pub article: String,
    #[serde(default)]
    pub penalty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupplyChainFile {
    pub banned_package: Vec<BannedPackageEntry>,
    /// Package name (case-sensitive) -> canonical SDK label.
    pub sdk_registry: BTreeMap<String, String>,
    #[serde(default)]
    pub bias_testing_packages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePolarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRuleEntry {
    pub category: String,
    pub polarity: RulePolarity,
    pub pattern: String,
    pub obligation_id: String,
    pub article: String,
    pub recommendation: String,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternsFile {
    pub rule: Vec<PatternRuleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixTemplateEntry {
    pub obligation_id: String,
    pub template_file: String,
    pub output_file: String,
    pub description: String,
    pub article: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixTemplatesFile {
    pub template: Vec<FixTemplateEntry>,
}

/// One of L1's fixed presence checks (spec §4.C L1): matched by file-path
/// glob, optionally gated on AI-usage evidence (e.g. `interaction-logging`
/// only asserts when AI API calls were detected elsewhere in the project).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct L1CheckEntry {
    pub check_id: String,
    #[serde(default)]
    pub obligation_id: Option<String>,
    #[serde(default)]
    pub article: Option<String>,
    pub label: String,
    pub file_path_patterns: Vec<String>,
    #[serde(default)]
    pub requires_ai_evidence: bool,
    #[serde(default = "default_presence_severity")]
    pub severity: crate::api::Severity,
    #[serde(default)]
    pub fix_hint: Option<String>,
}

fn default_presence_severity() -> crate::api::Severity {
    crate::api::Severity::Medium
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct L1ChecksFile {
    pub check: Vec<L1CheckEntry>,
}

/// The four ancillary sections (§4.A: technical requirements, regulation
/// metadata, applicability tree, cross-mapping) plus localization/timeline
/// are schema-validated but not consulted by the deterministic scan path;
/// they exist so `report`/`explain` collaborators (§6, out of core scope)
/// have something authoritative to render. Their only load-time contract is
/// "parses as a TOML table with a schema_version string".
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AncillarySectionFile {
    pub schema_version: String,
    #[serde(default)]
    pub data: toml::Value,
}
