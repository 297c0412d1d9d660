//! Evaluation scoring
//!
//! The overall score of an evaluation is the plain mean of its criterion
//! scores. Reports may weight criteria instead; a criterion without a
//! weight, or one missing from the catalog, weighs 1.

use crate::error::{EvalSyncError, Result};
use crate::types::{Criterion, NewEvaluation, ScoreEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arithmetic mean of the scores, `None` when there are none
pub fn overall_score(scores: &[ScoreEntry]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64)
}

/// Weighted mean using catalog criterion weights
pub fn weighted_score(scores: &[ScoreEntry], criteria: &[Criterion]) -> Option<f64> {
    let weights: HashMap<i64, f64> = criteria
        .iter()
        .map(|c| (c.id, c.weight.unwrap_or(1.0)))
        .collect();

    let (sum, total_weight) = scores.iter().fold((0.0, 0.0), |(sum, total), s| {
        let weight = weights.get(&s.criterion_id).copied().unwrap_or(1.0);
        (sum + s.score * weight, total + weight)
    });

    if total_weight > 0.0 {
        Some(sum / total_weight)
    } else {
        None
    }
}

/// Quality band used by the evaluation list filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl ScoreBand {
    pub fn classify(score: f64) -> Self {
        if score >= 4.5 {
            ScoreBand::Excellent
        } else if score >= 3.5 {
            ScoreBand::Good
        } else if score >= 2.5 {
            ScoreBand::Average
        } else {
            ScoreBand::Poor
        }
    }
}

impl std::fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreBand::Excellent => write!(f, "excellent"),
            ScoreBand::Good => write!(f, "good"),
            ScoreBand::Average => write!(f, "average"),
            ScoreBand::Poor => write!(f, "poor"),
        }
    }
}

/// Reject evaluations the server could never accept
///
/// At least one score is required and every score must be a finite,
/// non-negative number.
pub fn validate(evaluation: &NewEvaluation) -> Result<()> {
    if evaluation.scores.is_empty() {
        return Err(EvalSyncError::InvalidEvaluation(
            "at least one criterion must be scored".to_string(),
        ));
    }

    if let Some(bad) = evaluation
        .scores
        .iter()
        .find(|s| !s.score.is_finite() || s.score < 0.0)
    {
        return Err(EvalSyncError::InvalidEvaluation(format!(
            "criterion {} has invalid score {}",
            bad.criterion_id, bad.score
        )));
    }

    Ok(())
}

/// Check scores against each criterion's `max_score`
pub fn validate_against(evaluation: &NewEvaluation, criteria: &[Criterion]) -> Result<()> {
    validate(evaluation)?;

    for entry in &evaluation.scores {
        if let Some(criterion) = criteria.iter().find(|c| c.id == entry.criterion_id) {
            if entry.score > criterion.max_score {
                return Err(EvalSyncError::InvalidEvaluation(format!(
                    "score {} for '{}' exceeds max {}",
                    entry.score, criterion.name, criterion.max_score
                )));
            }
        }
    }
    Ok(())
}
