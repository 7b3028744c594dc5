//! L3 -- Config & Dependencies (spec §4.C L3).

use crate::api::{CheckFail, CheckPass, CheckResult, Finding, ScanContext, Severity};
use crate::catalogue::Catalogue;
use crate::confidence::{confidence_l3, L3Outcome};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

#[derive(Debug, Clone)]
struct Dependency {
    name: String,
    version: String,
    ecosystem: &'static str,
}

fn extract_first_quoted_value(s: &str) -> Option<String> {
    let start = s.find('"')?;
    let rest = &s[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Walks a Cargo.toml's `[dependencies]`-family tables, grounded on the
/// teacher's line-oriented scanner (`checks/supply_chain.rs`) but collecting
/// every dependency rather than only prerelease ones.
fn parse_cargo_toml_deps(raw: &str) -> Vec<Dependency> {
    let mut out = Vec::new();
    let mut in_dependencies = false;
    for line in raw.lines() {
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if t.starts_with('[') && t.ends_with(']') {
            let section = t[1..t.len() - 1].to_ascii_lowercase();
            in_dependencies = section == "dependencies"
                || section == "dev-dependencies"
                || section == "build-dependencies"
                || section.ends_with(".dependencies")
                || section.ends_with(".dev-dependencies")
                || section.ends_with(".build-dependencies");
            continue;
        }
        if !in_dependencies {
            continue;
        }
        let Some((name, rhs)) = t.split_once('=') else {
            continue;
        };
        let dep_name = name.trim().trim_matches('"').to_string();
        if dep_name.is_empty() {
            continue;
        }
        let rhs = rhs.trim();
        let version = if rhs.starts_with('"') {
            extract_first_quoted_value(rhs)
        } else if rhs.starts_with('{') {
            rhs.find("version")
                .and_then(|idx| extract_first_quoted_value(&rhs[idx..]))
        } else {
            None
        };
        out.push(Dependency {
            name: dep_name,
            version: version.unwrap_or_else(|| "*".to_string()),
            ecosystem: "cargo",
        });
    }
    out
}

fn parse_package_json_deps(raw: &str) -> Vec<Dependency> {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for section in ["dependencies", "devDependencies", "peerDependencies"] {
        let Some(map) = parsed.get(section).and_then(|v| v.as_object()) else {
            continue;
        };
        for (name, version_val) in map {
            let version = version_val.as_str().unwrap_or("*").to_string();
            out.push(Dependency {
                name: name.clone(),
                version,
                ecosystem: "npm",
            });
        }
    }
    out
}

fn parse_requirements_txt(raw: &str) -> Vec<Dependency> {
    const OPERATORS: &[&str] = &["===", "==", ">=", "<=", "~=", "!=", ">", "<"];
    let mut out = Vec::new();
    for line in raw.lines() {
        let t = line.split('#').next().unwrap_or("").trim();
        if t.is_empty() || t.starts_with('-') {
            continue;
        }
        let mut name = t;
        let mut version = "*".to_string();
        for op in OPERATORS {
            if let Some(idx) = t.find(op) {
                name = t[..idx].trim();
                version = t[idx + op.len()..].trim().to_string();
                break;
            }
        }
        if name.is_empty() {
            continue;
        }
        out.push(Dependency {
            name: name.to_string(),
            version,
            ecosystem: "pip",
        });
    }
    out
}

fn parse_go_mod_requires(raw: &str) -> Vec<Dependency> {
    let mut out = Vec::new();
    let mut in_block = false;
    for line in raw.lines() {
        let t = line.trim();
        if t.starts_with("require (") {
            in_block = true;
            continue;
        }
        if in_block && t == ")" {
            in_block = false;
            continue;
        }
        let body = if in_block {
            Some(t)
        } else {
            t.strip_prefix("require ")
        };
        let Some(body) = body else { continue };
        let body = body.trim().trim_end_matches("// indirect").trim();
        let mut parts = body.split_whitespace();
        let (Some(name), Some(version)) = (parts.next(), parts.next()) else {
            continue;
        };
        out.push(Dependency {
            name: name.to_string(),
            version: version.to_string(),
            ecosystem: "go",
        });
    }
    out
}

fn collect_dependencies(ctx: &ScanContext) -> Vec<Dependency> {
    let mut deps = Vec::new();
    for file in &ctx.files {
        let basename = file.rel_path.rsplit('/').next().unwrap_or(&file.rel_path);
        match basename {
            "Cargo.toml" => deps.extend(parse_cargo_toml_deps(&file.content)),
            "package.json" => deps.extend(parse_package_json_deps(&file.content)),
            "requirements.txt" => deps.extend(parse_requirements_txt(&file.content)),
            "go.mod" => deps.extend(parse_go_mod_requires(&file.content)),
            _ => {}
        }
    }
    deps
}

static AI_KEY_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^(OPENAI_API_KEY|ANTHROPIC_API_KEY|AZURE_OPENAI_KEY|COHERE_API_KEY|HUGGINGFACE_API_KEY|GOOGLE_API_KEY|GEMINI_API_KEY)\s*=")
        .expect("static AI key var regex is valid")
});
static LOG_LEVEL_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^LOG_LEVEL\s*=").expect("static LOG_LEVEL regex is valid"));
static OBSERVABILITY_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(SENTRY_DSN|DATADOG|NEW_RELIC|MONITORING|OBSERVABILITY)")
        .expect("static observability regex is valid")
});
static LOGGING_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*logging:\s*$").expect("static logging section regex is valid")
});
static RETENTION_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(max-size|max-file|retention|rotate)").expect("static retention regex is valid")
});
static CI_COMPLIANCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(complior|compliance|audit|security[-_]scan|ai[-_]act)")
        .expect("static CI compliance marker regex is valid")
});

fn pass(check_id: &str, message: impl Into<String>, outcome: L3Outcome) -> Finding {
    Finding {
        result: CheckResult::Pass(CheckPass {
            check_id: check_id.to_string(),
            message: message.into(),
        }),
        confidence: Some(confidence_l3(outcome, None)),
    }
}

fn fail(
    check_id: &str,
    message: impl Into<String>,
    severity: Severity,
    obligation_id: Option<String>,
    article: Option<String>,
    file: Option<String>,
    outcome: L3Outcome,
) -> Finding {
    Finding {
        result: CheckResult::Fail(CheckFail {
            check_id: check_id.to_string(),
            message: message.into(),
            severity,
            obligation_id: obligation_id.clone(),
            article,
            fix: None,
            file,
            line: None,
        }),
        confidence: Some(confidence_l3(outcome, obligation_id)),
    }
}

pub struct L3Output {
    pub findings: Vec<Finding>,
    /// Consumed by L4's post-pass gate (spec §4.C L4).
    pub ai_sdk_detected: bool,
}

pub fn run(ctx: &ScanContext, catalogue: &Catalogue) -> L3Output {
    let mut findings = Vec::new();
    let deps = collect_dependencies(ctx);

    // Banned packages.
    for dep in &deps {
        for banned in &catalogue.banned_packages {
            let ecosystem_matches =
                banned.ecosystem == "any" || banned.ecosystem.eq_ignore_ascii_case(dep.ecosystem);
            if ecosystem_matches && banned.name.eq_ignore_ascii_case(&dep.name) {
                findings.push(fail(
                    "supply-chain-banned-package",
                    format!("{} ({}): {}", dep.name, dep.ecosystem, banned.reason),
                    Severity::Critical,
                    Some(banned.obligation_id.clone()),
                    Some(banned.article.clone()),
                    None,
                    L3Outcome::Prohibited,
                ));
            }
        }
    }

    // AI SDK detection (case-sensitive registry match).
    let mut detected_sdks: BTreeSet<&str> = BTreeSet::new();
    for dep in &deps {
        if let Some(label) = catalogue.sdk_registry.get(&dep.name) {
            detected_sdks.insert(label.as_str());
        }
    }
    let ai_sdk_detected = !detected_sdks.is_empty();
    for label in &detected_sdks {
        findings.push(pass(
            "ai-sdk-detected",
            format!("detected AI SDK: {label}"),
            L3Outcome::Ok,
        ));
    }

    // Bias testing.
    if ai_sdk_detected {
        let has_bias_testing = deps
            .iter()
            .any(|d| catalogue.bias_testing_packages.iter().any(|b| b.eq_ignore_ascii_case(&d.name)));
        if !has_bias_testing {
            findings.push(fail(
                "bias-testing-coverage",
                "AI SDK detected but no bias-testing dependency found",
                Severity::Medium,
                None,
                None,
                None,
                L3Outcome::Warning,
            ));
        }
    }

    // docker-compose.
    for file in ctx
        .files
        .iter()
        .filter(|f| {
            let base = f.rel_path.rsplit('/').next().unwrap_or(&f.rel_path);
            base == "docker-compose.yml" || base == "docker-compose.yaml"
        })
    {
        let has_logging = LOGGING_SECTION.is_match(&file.content);
        let has_retention = RETENTION_HINT.is_match(&file.content);
        match (has_logging, has_retention) {
            (true, true) => findings.push(pass(
                "docker-compose-logging",
                format!("{} configures logging with retention", file.rel_path),
                L3Outcome::Ok,
            )),
            (true, false) => findings.push(fail(
                "docker-compose-logging",
                format!("{} configures logging but no retention hint found", file.rel_path),
                Severity::Low,
                None,
                None,
                Some(file.rel_path.clone()),
                L3Outcome::Warning,
            )),
            (false, _) => findings.push(fail(
                "docker-compose-logging",
                format!("{} has no logging section", file.rel_path),
                Severity::Low,
                None,
                None,
                Some(file.rel_path.clone()),
                L3Outcome::Warning,
            )),
        }
    }

    // .env files.
    for file in ctx.files.iter().filter(|f| {
        let base = f.rel_path.rsplit('/').next().unwrap_or(&f.rel_path);
        base == ".env" || base == ".env.example" || base == ".env.local"
    }) {
        if !AI_KEY_VAR.is_match(&file.content) {
            findings.push(fail(
                "env-ai-provider-key",
                format!("{} has no AI provider key variable", file.rel_path),
                Severity::Low,
                None,
                None,
                Some(file.rel_path.clone()),
                L3Outcome::Warning,
            ));
        }
        if !LOG_LEVEL_VAR.is_match(&file.content) {
            findings.push(fail(
                "env-log-level",
                format!("{} has no LOG_LEVEL variable", file.rel_path),
                Severity::Low,
                None,
                None,
                Some(file.rel_path.clone()),
                L3Outcome::Warning,
            ));
        }
        if !OBSERVABILITY_VAR.is_match(&file.content) {
            findings.push(fail(
                "env-observability",
                format!("{} has no observability variable", file.rel_path),
                Severity::Low,
                None,
                None,
                Some(file.rel_path.clone()),
                L3Outcome::Warning,
            ));
        }
    }

    // CI configs.
    let workflow_files: Vec<_> = ctx
        .files
        .iter()
        .filter(|f| {
            f.rel_path.contains(".github/workflows/")
                && (f.extension == "yml" || f.extension == "yaml")
        })
        .collect();
    if !workflow_files.is_empty() {
        let has_marker = workflow_files.iter().any(|f| CI_COMPLIANCE_MARKER.is_match(&f.content));
        if has_marker {
            findings.push(pass(
                "ci-compliance-config",
                "CI workflow references compliance/audit scanning",
                L3Outcome::Ok,
            ));
        } else {
            findings.push(fail(
                "ci-compliance-config",
                "no CI workflow references compliance/audit scanning",
                Severity::Low,
                None,
                None,
                None,
                L3Outcome::Warning,
            ));
        }
    }

    L3Output {
        findings,
        ai_sdk_detected,
    }
}
