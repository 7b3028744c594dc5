//! L4 -- Source-Pattern Matching (spec §4.C L4). Grounded on
//! `checks/boundary.rs`'s per-file first-match-per-rule scan with
//! newline-counted line attribution.

use super::line_for_offset;
use crate::api::{CheckFail, CheckPass, CheckResult, Finding, ScanContext, Severity};
use crate::catalogue::{Catalogue, CompiledPatternRule};
use crate::confidence::{confidence_l4, L4Outcome};
use crate::catalogue::schema::RulePolarity;
use std::collections::BTreeSet;

const SCAN_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "py", "go", "vue", "html"];
const IGNORE_SEGMENTS: &[&str] = &[
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

const BARE_LLM_CALL_CATEGORY: &str = "bare-llm-call";

fn is_ignored(rel_path: &str) -> bool {
    rel_path.split('/').any(|seg| IGNORE_SEGMENTS.contains(&seg))
}

struct Match<'a> {
    rule: &'a CompiledPatternRule,
    file: String,
    line: usize,
}

fn scan_file<'a>(rules: &'a [CompiledPatternRule], rel_path: &str, content: &str) -> Vec<Match<'a>> {
    let mut out = Vec::new();
    for rule in rules {
        if let Some(m) = rule.regex.find(content) {
            out.push(Match {
                rule,
                file: rel_path.to_string(),
                line: line_for_offset(content, m.start()),
            });
        }
    }
    out
}

fn negative_found_finding(m: &Match) -> Finding {
    Finding {
        result: CheckResult::Fail(CheckFail {
            check_id: m.rule.category.clone(),
            message: format!("{} ({})", m.rule.label, m.rule.recommendation),
            severity: Severity::Medium,
            obligation_id: Some(m.rule.obligation_id.clone()),
            article: Some(m.rule.article.clone()),
            fix: Some(m.rule.recommendation.clone()),
            file: Some(m.file.clone()),
            line: Some(m.line),
        }),
        confidence: Some(confidence_l4(L4Outcome::NegativeFound, Some(m.rule.obligation_id.clone()))),
    }
}

fn positive_found_finding(m: &Match) -> Finding {
    Finding {
        result: CheckResult::Pass(CheckPass {
            check_id: m.rule.category.clone(),
            message: format!("{} ({}:{})", m.rule.label, m.file, m.line),
        }),
        confidence: Some(confidence_l4(L4Outcome::PositiveFound, Some(m.rule.obligation_id.clone()))),
    }
}

fn positive_not_found_finding(rule: &CompiledPatternRule) -> Finding {
    Finding {
        result: CheckResult::Fail(CheckFail {
            check_id: rule.category.clone(),
            message: format!("{} not found anywhere in scanned source", rule.label),
            severity: Severity::Medium,
            obligation_id: Some(rule.obligation_id.clone()),
            article: Some(rule.article.clone()),
            fix: Some(rule.recommendation.clone()),
            file: None,
            line: None,
        }),
        confidence: Some(confidence_l4(L4Outcome::PositiveNotFound, Some(rule.obligation_id.clone()))),
    }
}

/// `ai_sdk_detected` is L3's signal (spec §4.C L4: "if either an AI SDK was
/// detected by L3 or any negative bare-LLM-call was found in L4").
pub fn run(ctx: &ScanContext, catalogue: &Catalogue, ai_sdk_detected: bool) -> Vec<Finding> {
    let mut findings = Vec::new();

    let mut negative_bare_llm_call_found = false;
    let mut positive_first_match: Vec<(String, Match)> = Vec::new();
    let mut positive_categories_order: Vec<String> = Vec::new();
    let mut seen_categories: BTreeSet<String> = BTreeSet::new();

    for rule in &catalogue.pattern_rules {
        if rule.polarity == RulePolarity::Positive && seen_categories.insert(rule.category.clone()) {
            positive_categories_order.push(rule.category.clone());
        }
    }

    for file in ctx
        .files
        .iter()
        .filter(|f| SCAN_EXTENSIONS.contains(&f.extension.as_str()) && !is_ignored(&f.rel_path))
    {
        for m in scan_file(&catalogue.pattern_rules, &file.rel_path, &file.content) {
            match m.rule.polarity {
                RulePolarity::Negative => {
                    if m.rule.category == BARE_LLM_CALL_CATEGORY {
                        negative_bare_llm_call_found = true;
                    }
                    findings.push(negative_found_finding(&m));
                }
                RulePolarity::Positive => {
                    if !positive_first_match.iter().any(|(cat, _)| *cat == m.rule.category) {
                        positive_first_match.push((m.rule.category.clone(), m));
                    }
                }
            }
        }
    }

    for (_, m) in &positive_first_match {
        findings.push(positive_found_finding(m));
    }

    let gate = ai_sdk_detected || negative_bare_llm_call_found;
    if gate {
        let found_categories: BTreeSet<&str> =
            positive_first_match.iter().map(|(cat, _)| cat.as_str()).collect();
        for category in &positive_categories_order {
            if found_categories.contains(category.as_str()) {
                continue;
            }
            if let Some(rule) = catalogue
                .pattern_rules
                .iter()
                .find(|r| r.polarity == RulePolarity::Positive && &r.category == category)
            {
                findings.push(positive_not_found_finding(rule));
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FileSnapshot;
    use crate::catalogue::CompiledPatternRule;
    use regex::Regex;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn ctx_with(files: Vec<(&str, &str)>) -> ScanContext {
        ScanContext {
            project_root: PathBuf::from("/proj"),
            files: files
                .into_iter()
                .map(|(rel, content)| FileSnapshot {
                    absolute_path: PathBuf::from("/proj").join(rel),
                    rel_path: rel.to_string(),
                    extension: rel.rsplit('.').next().unwrap_or_default().to_string(),
                    content: content.to_string(),
                })
                .collect(),
        }
    }

    fn rule(category: &str, polarity: RulePolarity, pattern: &str) -> CompiledPatternRule {
        CompiledPatternRule {
            category: category.to_string(),
            polarity,
            regex: Arc::new(Regex::new(pattern).unwrap()),
            obligation_id: format!("obl-{category}"),
            article: "Art. 1".to_string(),
            recommendation: "fix it".to_string(),
            label: category.to_string(),
        }
    }

    fn catalogue_with(rules: Vec<CompiledPatternRule>) -> Catalogue {
        let mut c = Catalogue::test_empty();
        c.pattern_rules = rules;
        c
    }

    #[test]
    fn negative_matches_are_all_kept_individually() {
        let ctx = ctx_with(vec![
            ("a.ts", "openai.chat.completions.create({})"),
            ("b.ts", "openai.chat.completions.create({})"),
        ]);
        let catalogue = catalogue_with(vec![rule(
            BARE_LLM_CALL_CATEGORY,
            RulePolarity::Negative,
            "openai\\.chat\\.completions\\.create",
        )]);
        let findings = run(&ctx, &catalogue, false);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.result.is_fail()));
    }

    #[test]
    fn positive_category_keeps_only_first_match() {
        let ctx = ctx_with(vec![
            ("a.ts", "AIDisclosure banner"),
            ("b.ts", "AIDisclosure banner"),
        ]);
        let catalogue = catalogue_with(vec![rule("disclosure", RulePolarity::Positive, "AIDisclosure")]);
        let findings = run(&ctx, &catalogue, false);
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].result.is_fail());
    }

    #[test]
    fn missing_positive_category_emits_not_found_when_ai_sdk_detected() {
        let ctx = ctx_with(vec![("a.ts", "nothing relevant here")]);
        let catalogue = catalogue_with(vec![rule("disclosure", RulePolarity::Positive, "AIDisclosure")]);
        let findings = run(&ctx, &catalogue, true);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].result.is_fail());
    }

    #[test]
    fn missing_positive_category_is_silent_without_a_gate() {
        let ctx = ctx_with(vec![("a.ts", "nothing relevant here")]);
        let catalogue = catalogue_with(vec![rule("disclosure", RulePolarity::Positive, "AIDisclosure")]);
        let findings = run(&ctx, &catalogue, false);
        assert!(findings.is_empty());
    }

    #[test]
    fn ignored_directory_segments_are_skipped() {
        let ctx = ctx_with(vec![("vendor/lib/a.ts", "AIDisclosure banner")]);
        let catalogue = catalogue_with(vec![rule("disclosure", RulePolarity::Positive, "AIDisclosure")]);
        let findings = run(&ctx, &catalogue, false);
        assert!(findings.is_empty());
    }
}
