//! Regulation Catalogue Loader (spec §4.A).
//!
//! Loads the eight logical sections plus the document-validator directory
//! from a versioned data tree, validates each against its declared schema,
//! and caches the result for the process lifetime. Grounded on
//! `repo.rs`/`config.rs`'s walk-parse-validate-merge loader and
//! `repo/errors.rs`'s error shape.

pub mod errors;
pub mod schema;

use crate::api::{DocumentValidator, Obligation, WeightedCategory};
use errors::CatalogueError;
use regex::Regex;
use schema::{
    AncillarySectionFile, BannedPackageEntry, FixTemplateEntry, FixTemplatesFile, L1CheckEntry,
    L1ChecksFile, ObligationsFile, PatternsFile, RulePolarity, ScoringFile, SupplyChainFile,
};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct CompiledPatternRule {
    pub category: String,
    pub polarity: RulePolarity,
    pub regex: Arc<Regex>,
    pub obligation_id: String,
    pub article: String,
    pub recommendation: String,
    pub label: String,
}

/// The fully loaded, immutable catalogue. Read-only after construction; no
/// component other than the loader writes to it (spec §4.A).
#[derive(Debug, Clone)]
pub struct Catalogue {
    pub obligations: Vec<Obligation>,
    pub categories: Vec<WeightedCategory>,
    pub critical_obligation_ids: HashSet<String>,
    pub critical_check_ids: HashSet<String>,
    pub fallback_category_by_check: BTreeMap<String, String>,
    pub document_validators: Vec<DocumentValidator>,
    pub banned_packages: Vec<BannedPackageEntry>,
    pub sdk_registry: BTreeMap<String, String>,
    pub bias_testing_packages: Vec<String>,
    pub pattern_rules: Vec<CompiledPatternRule>,
    pub fix_templates: BTreeMap<String, FixTemplateEntry>,
    pub l1_checks: Vec<L1CheckEntry>,
    templates_dir: PathBuf,
}

impl Catalogue {
    pub fn obligation(&self, id: &str) -> Option<&Obligation> {
        self.obligations.iter().find(|o| o.id == id)
    }

    pub fn category_for_obligation(&self, obligation_id: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.obligations_in_category.iter().any(|o| o == obligation_id))
            .map(|c| c.name.as_str())
    }

    pub fn category_for_check(&self, check_id: &str) -> Option<&str> {
        self.fallback_category_by_check
            .get(check_id)
            .map(|s| s.as_str())
    }

    pub fn template_for_obligation(&self, obligation_id: &str) -> Option<&FixTemplateEntry> {
        self.fix_templates.get(obligation_id)
    }

    pub fn template_path(&self, template_file: &str) -> PathBuf {
        self.templates_dir.join(template_file)
    }

    pub fn is_critical_obligation(&self, obligation_id: &str) -> bool {
        self.critical_obligation_ids.contains(obligation_id)
    }

    pub fn is_critical_check(&self, check_id: &str) -> bool {
        self.critical_check_ids.contains(check_id)
    }

    /// Empty catalogue for unit tests in other modules that only need the
    /// loader's types, not a full data tree.
    #[cfg(test)]
    pub fn test_empty() -> Catalogue {
        Catalogue {
            obligations: Vec::new(),
            categories: Vec::new(),
            critical_obligation_ids: HashSet::new(),
            critical_check_ids: HashSet::new(),
            fallback_category_by_check: BTreeMap::new(),
            document_validators: Vec::new(),
            banned_packages: Vec::new(),
            sdk_registry: BTreeMap::new(),
            bias_testing_packages: Vec::new(),
            pattern_rules: Vec::new(),
            fix_templates: BTreeMap::new(),
            l1_checks: Vec::new(),
            templates_dir: PathBuf::new(),
        }
    }
}

fn read_to_string(path: &Path) -> Result<String, CatalogueError> {
    if !path.is_file() {
        return Err(CatalogueError::MissingFile {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| CatalogueError::ReadFailed {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

fn parse_toml<T: serde::de::DeserializeOwned>(path: &Path, raw: &str) -> Result<T, CatalogueError> {
    toml::from_str(raw).map_err(|e| CatalogueError::ParseFailed {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

fn load_section<T: serde::de::DeserializeOwned>(
    data_dir: &Path,
    file_name: &str,
) -> Result<T, CatalogueError> {
    let path = data_dir.join(file_name);
    let raw = read_to_string(&path)?;
    parse_toml(&path, &raw)
}

fn load_ancillary(data_dir: &Path, file_name: &str) -> Result<AncillarySectionFile, CatalogueError> {
    load_section(data_dir, file_name)
}

fn load_validators(data_dir: &Path) -> Result<Vec<DocumentValidator>, CatalogueError> {
    let dir = data_dir.join("validators");
    if !dir.is_dir() {
        return Err(CatalogueError::MissingFile {
            path: dir.display().to_string(),
        });
    }
    let mut validators = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)
        .map_err(|e| CatalogueError::ReadFailed {
            path: dir.display().to_string(),
            detail: e.to_string(),
        })?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("toml"))
        .collect();
    entries.sort();

    for path in entries {
        let raw = read_to_string(&path)?;
        let parsed: DocumentValidator = parse_toml(&path, &raw)?;
        if !seen_ids.insert(parsed.id.clone()) {
            return Err(CatalogueError::DuplicateId {
                section: "validators".to_string(),
                id: parsed.id,
            });
        }
        validators.push(parsed);
    }
    Ok(validators)
}

fn compile_patterns(file: PatternsFile, path: &Path) -> Result<Vec<CompiledPatternRule>, CatalogueError> {
    file.rule
        .into_iter()
        .map(|r| {
            let regex = Regex::new(&r.pattern).map_err(|e| CatalogueError::SchemaInvalid {
                path: path.display().to_string(),
                detail: format!("invalid regex {:?}: {e}", r.pattern),
            })?;
            Ok(CompiledPatternRule {
                category: r.category,
                polarity: r.polarity,
                regex: Arc::new(regex),
                obligation_id: r.obligation_id,
                article: r.article,
                recommendation: r.recommendation,
                label: r.label,
            })
        })
        .collect()
}

fn load_catalogue_from_dir(data_dir: &Path) -> Result<Catalogue, CatalogueError> {
    let obligations: ObligationsFile = load_section(data_dir, "obligations.toml")?;
    let mut seen_obligation_ids = HashSet::new();
    for o in &obligations.obligation {
        if !seen_obligation_ids.insert(o.id.clone()) {
            return Err(CatalogueError::DuplicateId {
                section: "obligations".to_string(),
                id: o.id.clone(),
            });
        }
    }

    let scoring: ScoringFile = load_section(data_dir, "scoring.toml")?;
    let supply_chain: SupplyChainFile = load_section(data_dir, "supply_chain.toml")?;
    let patterns_path = data_dir.join("patterns.toml");
    let patterns: PatternsFile = load_section(data_dir, "patterns.toml")?;
    let pattern_rules = compile_patterns(patterns, &patterns_path)?;

    let l1_checks_file: L1ChecksFile = load_section(data_dir, "l1_checks.toml")?;

    let fix_templates_file: FixTemplatesFile = load_section(data_dir, "fix_templates.toml")?;
    let mut fix_templates = BTreeMap::new();
    for entry in fix_templates_file.template {
        fix_templates.insert(entry.obligation_id.clone(), entry);
    }

    // Ancillary sections: loaded and schema-validated, not otherwise consumed
    // by the deterministic scan path (see catalogue/schema.rs doc comment).
    for file_name in [
        "technical_requirements.toml",
        "regulation_metadata.toml",
        "applicability_tree.toml",
        "cross_mapping.toml",
        "localization.toml",
        "timeline.toml",
    ] {
        load_ancillary(data_dir, file_name)?;
    }

    let document_validators = load_validators(data_dir)?;

    Ok(Catalogue {
        obligations: obligations.obligation,
        categories: scoring.category,
        critical_obligation_ids: scoring.critical_obligation_ids.into_iter().collect(),
        critical_check_ids: scoring.critical_check_ids.into_iter().collect(),
        fallback_category_by_check: scoring.fallback_category_by_check,
        document_validators,
        banned_packages: supply_chain.banned_package,
        sdk_registry: supply_chain.sdk_registry,
        bias_testing_packages: supply_chain.bias_testing_packages,
        pattern_rules,
        fix_templates,
        l1_checks: l1_checks_file.check,
        templates_dir: data_dir.join("templates"),
    })
}

static CACHE: Mutex<Option<Arc<Catalogue>>> = Mutex::new(None);

/// Loads the catalogue from `data_dir`, caching the result for the process
/// lifetime. Subsequent calls (even with a different `data_dir`) return the
/// cached catalogue until `reset()` is called -- matching spec §4.A's
/// "cached for the process lifetime; reset operation provided for test
/// isolation".
pub fn load(data_dir: &Path) -> Result<Arc<Catalogue>, CatalogueError> {
    let mut guard = CACHE.lock().expect("catalogue cache mutex poisoned");
    if let Some(existing) = guard.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let catalogue = Arc::new(load_catalogue_from_dir(data_dir)?);
    *guard = Some(Arc::clone(&catalogue));
    Ok(catalogue)
}

/// Clears the process-lifetime cache. Intended for test isolation only.
pub fn reset() {
    let mut guard = CACHE.lock().expect("catalogue cache mutex poisoned");
    *guard = None;
}
