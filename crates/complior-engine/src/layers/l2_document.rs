//! L2 -- Document Structure (spec §4.C L2).

use crate::api::{CheckFail, CheckPass, CheckResult, Finding, ScanContext, Severity};
use crate::catalogue::Catalogue;
use crate::confidence::{confidence_l2, L2Outcome};
use regex::Regex;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#{1,4}[ \t]+(.+)$").expect("static heading regex is valid")
});

fn normalize_heading(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = false;
    for ch in raw.trim().to_lowercase().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn basename(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocStatus {
    Valid,
    Partial,
    Empty,
}

struct DocCheckOutcome {
    status: DocStatus,
    missing_sections: Vec<String>,
}

fn evaluate_document(content: &str, required_titles: &[&str]) -> DocCheckOutcome {
    if content.trim().is_empty() {
        return DocCheckOutcome {
            status: DocStatus::Empty,
            missing_sections: required_titles.iter().map(|s| s.to_string()).collect(),
        };
    }

    let headings: Vec<String> = HEADING
        .captures_iter(content)
        .map(|c| normalize_heading(&c[1]))
        .collect();

    if headings.is_empty() {
        return DocCheckOutcome {
            status: DocStatus::Empty,
            missing_sections: required_titles.iter().map(|s| s.to_string()).collect(),
        };
    }

    let mut missing = Vec::new();
    for title in required_titles {
        let normalized_title = normalize_heading(title);
        let found = headings.iter().any(|h| h.contains(&normalized_title));
        if !found {
            missing.push((*title).to_string());
        }
    }

    // EMPTY is only reached via the content/heading checks above; with at
    // least one heading present, any missing required section is PARTIAL.
    let status = if missing.is_empty() {
        DocStatus::Valid
    } else {
        DocStatus::Partial
    };

    DocCheckOutcome {
        status,
        missing_sections: missing,
    }
}

pub fn run(ctx: &ScanContext, catalogue: &Catalogue) -> Vec<Finding> {
    let mut findings = Vec::new();

    for validator in &catalogue.document_validators {
        let globset = match super::build_globset_ci(&validator.filename_patterns) {
            Ok(g) => g,
            Err(_) => continue,
        };
        let Some(file) = ctx
            .files
            .iter()
            .find(|f| globset.is_match(basename(&f.rel_path)))
        else {
            continue; // L1 is the presence authority; silently skip.
        };

        let required_titles: Vec<&str> = validator
            .sections
            .iter()
            .filter(|s| s.required)
            .map(|s| s.title.as_str())
            .collect();

        let outcome = evaluate_document(&file.content, &required_titles);

        match outcome.status {
            DocStatus::Valid => {
                findings.push(Finding {
                    result: CheckResult::Pass(CheckPass {
                        check_id: validator.id.clone(),
                        message: format!("{} contains all required sections", file.rel_path),
                    }),
                    confidence: Some(confidence_l2(L2Outcome::Valid, validator.obligation_id.clone())),
                });
            }
            DocStatus::Partial => {
                findings.push(Finding {
                    result: CheckResult::Fail(CheckFail {
                        check_id: validator.id.clone(),
                        message: format!(
                            "{} is missing required sections: {}",
                            file.rel_path,
                            outcome.missing_sections.join(", ")
                        ),
                        severity: Severity::Medium,
                        obligation_id: validator.obligation_id.clone(),
                        article: validator.article.clone(),
                        fix: None,
                        file: Some(file.rel_path.clone()),
                        line: None,
                    }),
                    confidence: Some(confidence_l2(L2Outcome::Partial, validator.obligation_id.clone())),
                });
            }
            DocStatus::Empty => {
                findings.push(Finding {
                    result: CheckResult::Fail(CheckFail {
                        check_id: validator.id.clone(),
                        message: format!("{} has no usable content", file.rel_path),
                        severity: Severity::Medium,
                        obligation_id: validator.obligation_id.clone(),
                        article: validator.article.clone(),
                        fix: None,
                        file: Some(file.rel_path.clone()),
                        line: None,
                    }),
                    confidence: Some(confidence_l2(L2Outcome::Empty, validator.obligation_id.clone())),
                });
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_required_sections_present_is_valid() {
        let content = "# AI Literacy\n\n## Training Program\n\n## Training Levels\n\n## Assessment Methods\n";
        let outcome = evaluate_document(
            content,
            &["Training Program", "Training Levels", "Assessment Methods"],
        );
        assert_eq!(outcome.status, DocStatus::Valid);
        assert!(outcome.missing_sections.is_empty());
    }

    #[test]
    fn missing_one_section_is_partial() {
        let content = "# AI Literacy\n\n## Training Program\n\n## Assessment Methods\n";
        let outcome = evaluate_document(
            content,
            &["Training Program", "Training Levels", "Assessment Methods"],
        );
        assert_eq!(outcome.status, DocStatus::Partial);
        assert_eq!(outcome.missing_sections, vec!["Training Levels".to_string()]);
    }

    #[test]
    fn empty_content_is_empty() {
        let outcome = evaluate_document("   \n  \n", &["Training Program"]);
        assert_eq!(outcome.status, DocStatus::Empty);
    }

    #[test]
    fn heading_normalization_collapses_separators_and_case() {
        assert_eq!(normalize_heading("Training_Levels"), "training levels");
        assert_eq!(normalize_heading("  Training-Levels  "), "training levels");
        assert_eq!(normalize_heading("Training   Levels"), "training levels");
    }

    #[test]
    fn section_match_is_containment_not_equality() {
        let content = "# Doc\n\n## Our Training Levels Explained\n";
        let outcome = evaluate_document(content, &["Training Levels"]);
        assert_eq!(outcome.status, DocStatus::Valid);
    }
}
