//! Aggregate evaluation reports for managers
//!
//! Pure functions over evaluations read back from the server together with
//! the catalog. Averages are over each evaluation's `overall_score`;
//! per-product and per-category averages are rounded to 2 decimals.

use crate::types::{Category, EvaluationRecord, Product};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How many products the top list keeps by default
pub const DEFAULT_TOP_PRODUCTS: usize = 10;

/// Histogram bucket labels, lowest first
pub const SCORE_BUCKETS: [&str; 5] = ["0-1", "1-2", "2-3", "3-4", "4-5"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductScore {
    pub product_id: i64,
    pub name: String,
    pub score: f64,
    pub evaluations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category_id: i64,
    pub name: String,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub range: String,
    pub count: usize,
}

/// Everything the reports view shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total_evaluations: usize,
    pub average_score: f64,
    pub unique_evaluators: usize,
    pub top_products: Vec<ProductScore>,
    pub categories: Vec<CategoryScore>,
    pub distribution: Vec<ScoreBucket>,
}

impl EvaluationReport {
    pub fn build(
        products: &[Product],
        categories: &[Category],
        evaluations: &[EvaluationRecord],
        top: usize,
    ) -> Self {
        Self {
            total_evaluations: evaluations.len(),
            average_score: average_score(evaluations),
            unique_evaluators: unique_evaluators(evaluations),
            top_products: top_products(products, evaluations, top),
            categories: category_scores(categories, products, evaluations),
            distribution: score_distribution(evaluations),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean<'a>(evaluations: impl Iterator<Item = &'a EvaluationRecord>) -> Option<f64> {
    let (sum, count) = evaluations.fold((0.0, 0usize), |(sum, count), e| {
        (sum + e.overall_score, count + 1)
    });
    (count > 0).then(|| sum / count as f64)
}

/// Mean overall score across all evaluations; 0 when there are none
pub fn average_score(evaluations: &[EvaluationRecord]) -> f64 {
    mean(evaluations.iter()).unwrap_or(0.0)
}

/// Distinct evaluator emails; evaluations without one are not counted
pub fn unique_evaluators(evaluations: &[EvaluationRecord]) -> usize {
    evaluations
        .iter()
        .filter_map(|e| e.employee_email.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

/// Products with at least one evaluation, best average first
///
/// Ties keep catalog order.
pub fn top_products(
    products: &[Product],
    evaluations: &[EvaluationRecord],
    limit: usize,
) -> Vec<ProductScore> {
    let mut scores: Vec<ProductScore> = products
        .iter()
        .filter_map(|product| {
            let evals: Vec<_> = evaluations
                .iter()
                .filter(|e| e.product_id == product.id)
                .collect();
            let avg = mean(evals.iter().copied())?;
            Some(ProductScore {
                product_id: product.id,
                name: product.name.clone(),
                score: round2(avg),
                evaluations: evals.len(),
            })
        })
        .collect();

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores.truncate(limit);
    scores
}

/// Evaluation count and average per category, skipping empty categories
pub fn category_scores(
    categories: &[Category],
    products: &[Product],
    evaluations: &[EvaluationRecord],
) -> Vec<CategoryScore> {
    categories
        .iter()
        .filter_map(|category| {
            let members: HashSet<i64> = products
                .iter()
                .filter(|p| p.category_id == Some(category.id))
                .map(|p| p.id)
                .collect();
            let evals: Vec<_> = evaluations
                .iter()
                .filter(|e| members.contains(&e.product_id))
                .collect();
            let avg = mean(evals.iter().copied())?;
            Some(CategoryScore {
                category_id: category.id,
                name: category.name.clone(),
                count: evals.len(),
                avg_score: round2(avg),
            })
        })
        .collect()
}

/// Bucket index for a score: `[n, n+1)` for the first four, `>= 4` last
pub fn bucket_index(score: f64) -> usize {
    if score >= 4.0 {
        4
    } else if score >= 3.0 {
        3
    } else if score >= 2.0 {
        2
    } else if score >= 1.0 {
        1
    } else {
        0
    }
}

/// Histogram of overall scores over the five fixed buckets
pub fn score_distribution(evaluations: &[EvaluationRecord]) -> Vec<ScoreBucket> {
    let mut counts = [0usize; 5];
    for evaluation in evaluations {
        counts[bucket_index(evaluation.overall_score)] += 1;
    }

    SCORE_BUCKETS
        .iter()
        .zip(counts)
        .map(|(range, count)| ScoreBucket {
            range: range.to_string(),
            count,
        })
        .collect()
}
