//! Confidence Model (spec §4.D). Fixed per-layer/outcome tables, plus the
//! weighted-mean aggregation used by the Scanner Orchestrator's confidence
//! summary. New module: the table is dictated verbatim by spec.md; the
//! ordered-dispatch style of building records mirrors `judge/registry.rs`'s
//! classification-by-code approach in the teacher.

use crate::api::{ConfidenceLevel, ConfidenceRecord, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L1Outcome {
    FileFound,
    FileAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2Outcome {
    Valid,
    Partial,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L3Outcome {
    Ok,
    Warning,
    Fail,
    Prohibited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L4Outcome {
    NegativeFound,
    PositiveFound,
    PositiveNotFound,
    NegativeNotFound,
}

fn record(layer: Layer, confidence: f64, level: ConfidenceLevel, obligation_id: Option<String>) -> ConfidenceRecord {
    ConfidenceRecord {
        layer,
        confidence,
        level,
        obligation_id,
    }
}

pub fn confidence_l1(outcome: L1Outcome, obligation_id: Option<String>) -> ConfidenceRecord {
    match outcome {
        L1Outcome::FileFound => record(Layer::L1, 95.0, ConfidenceLevel::Pass, obligation_id),
        L1Outcome::FileAbsent => record(Layer::L1, 98.0, ConfidenceLevel::Fail, obligation_id),
    }
}

pub fn confidence_l2(outcome: L2Outcome, obligation_id: Option<String>) -> ConfidenceRecord {
    match outcome {
        L2Outcome::Valid => record(Layer::L2, 95.0, ConfidenceLevel::Pass, obligation_id),
        L2Outcome::Partial => record(Layer::L2, 75.0, ConfidenceLevel::LikelyPass, obligation_id),
        L2Outcome::Empty => record(Layer::L2, 95.0, ConfidenceLevel::Fail, obligation_id),
    }
}

pub fn confidence_l3(outcome: L3Outcome, obligation_id: Option<String>) -> ConfidenceRecord {
    match outcome {
        L3Outcome::Ok => record(Layer::L3, 80.0, ConfidenceLevel::LikelyPass, obligation_id),
        L3Outcome::Warning | L3Outcome::Fail => {
            record(Layer::L3, 80.0, ConfidenceLevel::LikelyFail, obligation_id)
        }
        L3Outcome::Prohibited => record(Layer::L3, 99.0, ConfidenceLevel::Fail, obligation_id),
    }
}

pub fn confidence_l4(outcome: L4Outcome, obligation_id: Option<String>) -> ConfidenceRecord {
    match outcome {
        L4Outcome::NegativeFound => record(Layer::L4, 80.0, ConfidenceLevel::LikelyFail, obligation_id),
        L4Outcome::PositiveFound => record(Layer::L4, 75.0, ConfidenceLevel::LikelyPass, obligation_id),
        L4Outcome::PositiveNotFound => record(Layer::L4, 80.0, ConfidenceLevel::LikelyFail, obligation_id),
        L4Outcome::NegativeNotFound => record(Layer::L4, 70.0, ConfidenceLevel::LikelyPass, obligation_id),
    }
}

/// Weighted mean of confidences by layer weight (spec §4.D).
pub fn aggregate_confidence(records: &[ConfidenceRecord]) -> f64 {
    let (sum, weight_sum) = records.iter().fold((0.0, 0.0), |(sum, weight_sum), r| {
        let w = r.layer.weight();
        (sum + r.confidence * w, weight_sum + w)
    });
    if weight_sum == 0.0 {
        0.0
    } else {
        sum / weight_sum
    }
}

fn level_from_threshold(confidence: f64, pass_direction: bool) -> ConfidenceLevel {
    if pass_direction {
        if confidence >= 95.0 {
            ConfidenceLevel::Pass
        } else if confidence >= 70.0 {
            ConfidenceLevel::LikelyPass
        } else {
            ConfidenceLevel::Uncertain
        }
    } else if confidence >= 95.0 {
        ConfidenceLevel::Fail
    } else if confidence >= 70.0 {
        ConfidenceLevel::LikelyFail
    } else {
        ConfidenceLevel::Uncertain
    }
}

fn is_pass_side(level: ConfidenceLevel) -> bool {
    matches!(level, ConfidenceLevel::Pass | ConfidenceLevel::LikelyPass)
}

fn is_fail_side(level: ConfidenceLevel) -> bool {
    matches!(level, ConfidenceLevel::Fail | ConfidenceLevel::LikelyFail)
}

/// Aggregate level across a set of checks (spec §4.D): counts pass-side vs
/// fail-side checks; if both sides are present and neither exceeds 70% of
/// the total, the result is UNCERTAIN; otherwise the majority direction's
/// aggregate confidence is mapped through the pass/fail threshold table.
pub fn aggregate_level(records: &[ConfidenceRecord]) -> ConfidenceLevel {
    if records.is_empty() {
        return ConfidenceLevel::Uncertain;
    }
    let total = records.len() as f64;
    let pass_side = records.iter().filter(|r| is_pass_side(r.level)).count() as f64;
    let fail_side = records.iter().filter(|r| is_fail_side(r.level)).count() as f64;

    if pass_side > 0.0 && fail_side > 0.0 && pass_side / total <= 0.70 && fail_side / total <= 0.70 {
        return ConfidenceLevel::Uncertain;
    }

    let pass_direction = pass_side >= fail_side;
    level_from_threshold(aggregate_confidence(records), pass_direction)
}
