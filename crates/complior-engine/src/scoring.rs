//! Scoring Engine (spec §4.E). Pure: never touches the filesystem, never
//! mutates its inputs. Grounded on `judge/mod.rs`'s weighted-category
//! dispatch-then-aggregate structure, generalized from compas's fixed
//! judge categories to the catalogue-driven category list.

use crate::api::{CategoryScore, CheckResult, ConfidenceSummary, Finding, ScoreBreakdown, Zone};
use crate::catalogue::Catalogue;

struct CategoryTally {
    name: String,
    weight: f64,
    passed: usize,
    failed: usize,
}

fn category_for(catalogue: &Catalogue, result: &CheckResult) -> Option<String> {
    if let Some(obligation_id) = result.obligation_id() {
        if let Some(cat) = catalogue.category_for_obligation(obligation_id) {
            return Some(cat.to_string());
        }
    }
    catalogue.category_for_check(result.check_id()).map(str::to_string)
}

fn confidence_summary(findings: &[Finding]) -> ConfidenceSummary {
    let mut summary = ConfidenceSummary::default();
    for f in findings {
        let Some(c) = &f.confidence else { continue };
        match c.level {
            crate::api::ConfidenceLevel::Pass => summary.pass += 1,
            crate::api::ConfidenceLevel::LikelyPass => summary.likely_pass += 1,
            crate::api::ConfidenceLevel::Uncertain => summary.uncertain += 1,
            crate::api::ConfidenceLevel::LikelyFail => summary.likely_fail += 1,
            crate::api::ConfidenceLevel::Fail => summary.fail += 1,
        }
    }
    summary
}

/// Computes the score breakdown for a completed set of findings (spec §4.E).
pub fn score(catalogue: &Catalogue, findings: &[Finding]) -> ScoreBreakdown {
    let total_checks = findings.len();
    let skipped_checks = findings.iter().filter(|f| f.result.is_skip()).count();
    let failed_checks = findings.iter().filter(|f| f.result.is_fail()).count();
    let passed_checks = total_checks - skipped_checks - failed_checks;

    if total_checks == 0 || skipped_checks == total_checks {
        return ScoreBreakdown {
            total_score: 100.0,
            zone: Zone::Green,
            category_scores: vec![],
            critical_cap_applied: false,
            total_checks,
            passed_checks,
            failed_checks,
            skipped_checks,
            confidence_summary: confidence_summary(findings),
        };
    }

    let mut tallies: Vec<CategoryTally> = catalogue
        .categories
        .iter()
        .map(|c| CategoryTally {
            name: c.name.clone(),
            weight: c.weight,
            passed: 0,
            failed: 0,
        })
        .collect();

    for f in findings {
        if f.result.is_skip() {
            continue;
        }
        let Some(category_name) = category_for(catalogue, &f.result) else {
            continue;
        };
        let Some(tally) = tallies.iter_mut().find(|t| t.name == category_name) else {
            continue;
        };
        if f.result.is_fail() {
            tally.failed += 1;
        } else {
            tally.passed += 1;
        }
    }

    let active: Vec<&CategoryTally> = tallies.iter().filter(|t| t.passed + t.failed > 0).collect();

    let mut category_scores = Vec::with_capacity(active.len());
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for t in &active {
        let matched = t.passed + t.failed;
        let category_score = (t.passed as f64 / matched as f64) * 100.0;
        weighted_sum += category_score * t.weight;
        weight_sum += t.weight;
        category_scores.push(CategoryScore {
            category: t.name.clone(),
            weight: t.weight,
            score: category_score,
            obligation_count: matched,
            passed_count: t.passed,
        });
    }

    let raw_score = if weight_sum == 0.0 { 100.0 } else { weighted_sum / weight_sum };

    let critical_cap_applied = findings.iter().any(|f| {
        f.result.is_fail()
            && (f
                .result
                .obligation_id()
                .is_some_and(|o| catalogue.is_critical_obligation(o))
                || catalogue.is_critical_check(f.result.check_id()))
    });

    let capped_score = if critical_cap_applied { raw_score.min(40.0) } else { raw_score };
    let total_score = (capped_score * 100.0).round() / 100.0;

    let zone = if total_score < 50.0 {
        Zone::Red
    } else if total_score < 80.0 {
        Zone::Yellow
    } else {
        Zone::Green
    };

    ScoreBreakdown {
        total_score,
        zone,
        category_scores,
        critical_cap_applied,
        total_checks,
        passed_checks,
        failed_checks,
        skipped_checks,
        confidence_summary: confidence_summary(findings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CheckFail, CheckPass, CheckSkip, Severity, WeightedCategory};

    fn catalogue_with_categories() -> Catalogue {
        let mut c = Catalogue::test_empty();
        c.categories = vec![
            WeightedCategory {
                name: "transparency".to_string(),
                weight: 50.0,
                obligations_in_category: vec!["obl-disclosure".to_string()],
            },
            WeightedCategory {
                name: "supply-chain".to_string(),
                weight: 50.0,
                obligations_in_category: vec![],
            },
        ];
        c.fallback_category_by_check
            .insert("ai-disclosure".to_string(), "transparency".to_string());
        c
    }

    fn pass(check_id: &str) -> Finding {
        Finding {
            result: CheckResult::Pass(CheckPass {
                check_id: check_id.to_string(),
                message: "ok".to_string(),
            }),
            confidence: None,
        }
    }

    fn fail(check_id: &str, obligation_id: Option<&str>) -> Finding {
        Finding {
            result: CheckResult::Fail(CheckFail {
                check_id: check_id.to_string(),
                message: "bad".to_string(),
                severity: Severity::High,
                obligation_id: obligation_id.map(str::to_string),
                article: None,
                fix: None,
                file: None,
                line: None,
            }),
            confidence: None,
        }
    }

    #[test]
    fn no_checks_or_all_skip_yields_100_green() {
        let catalogue = catalogue_with_categories();
        let breakdown = score(&catalogue, &[]);
        assert_eq!(breakdown.total_score, 100.0);
        assert_eq!(breakdown.zone, Zone::Green);
        assert!(breakdown.category_scores.is_empty());

        let skip_only = vec![Finding {
            result: CheckResult::Skip(CheckSkip {
                check_id: "x".to_string(),
                reason: "n/a".to_string(),
            }),
            confidence: None,
        }];
        let breakdown = score(&catalogue, &skip_only);
        assert_eq!(breakdown.total_score, 100.0);
    }

    #[test]
    fn category_dispatch_prefers_obligation_id_over_check_fallback() {
        let catalogue = catalogue_with_categories();
        let findings = vec![fail("ai-disclosure", Some("obl-disclosure"))];
        let breakdown = score(&catalogue, &findings);
        assert_eq!(breakdown.category_scores.len(), 1);
        assert_eq!(breakdown.category_scores[0].category, "transparency");
    }

    #[test]
    fn only_active_categories_count_toward_the_weighted_mean() {
        let catalogue = catalogue_with_categories();
        let findings = vec![pass("ai-disclosure"), fail("ai-disclosure", None)];
        let breakdown = score(&catalogue, &findings);
        assert_eq!(breakdown.category_scores.len(), 1);
        assert_eq!(breakdown.total_score, 50.0);
    }

    #[test]
    fn critical_obligation_failure_caps_score_at_40() {
        let mut catalogue = catalogue_with_categories();
        catalogue.critical_obligation_ids.insert("obl-disclosure".to_string());
        let findings = vec![fail("ai-disclosure", Some("obl-disclosure"))];
        let breakdown = score(&catalogue, &findings);
        assert!(breakdown.critical_cap_applied);
        assert!(breakdown.total_score <= 40.0);
        assert_eq!(breakdown.zone, Zone::Red);
    }

    #[test]
    fn zone_thresholds_match_spec() {
        let catalogue = catalogue_with_categories();
        let all_pass = vec![pass("ai-disclosure"), pass("ai-disclosure")];
        let breakdown = score(&catalogue, &all_pass);
        assert_eq!(breakdown.zone, Zone::Green);
    }
}
