//! Core data types for the evalsync offline subsystem
//!
//! This module defines the records held in the local durable store (pending
//! evaluations and cache entries), the wire payload sent to the remote API,
//! and the catalog types read back from it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a pending evaluation
///
/// Monotonically increasing and never reused within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(pub i64);

impl std::fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Score given to one criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Remote criterion identifier
    #[serde(rename = "criteria_id")]
    pub criterion_id: i64,

    /// Numeric score
    pub score: f64,

    /// Optional free-text comment for this criterion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ScoreEntry {
    pub fn new(criterion_id: i64, score: f64) -> Self {
        Self {
            criterion_id,
            score,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A completed evaluation as handed over by the interactive flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvaluation {
    /// Remote product identifier
    pub product_id: i64,

    /// Per-criterion scores, in entry order
    pub scores: Vec<ScoreEntry>,

    /// Overall free-text comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,

    /// Physical site tag (e.g. "Store A")
    pub location: String,
}

impl NewEvaluation {
    pub fn new(product_id: i64, location: impl Into<String>) -> Self {
        Self {
            product_id,
            scores: Vec::new(),
            comments: None,
            location: location.into(),
        }
    }

    pub fn score(mut self, criterion_id: i64, score: f64) -> Self {
        self.scores.push(ScoreEntry::new(criterion_id, score));
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Build the wire payload for a given submission date
    pub fn to_remote(&self, evaluation_date: NaiveDate) -> RemoteEvaluation {
        RemoteEvaluation {
            product_id: self.product_id,
            evaluation_date,
            scores: self.scores.clone(),
            notes: self.comments.clone(),
            store_location: self.location.clone(),
        }
    }
}

/// An evaluation captured while offline, awaiting transmission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvaluation {
    pub id: EvaluationId,
    pub product_id: i64,
    pub scores: Vec<ScoreEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub synced: bool,
}

impl PendingEvaluation {
    /// Assemble a freshly enqueued record
    pub fn from_new(
        id: EvaluationId,
        evaluation: NewEvaluation,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            product_id: evaluation.product_id,
            scores: evaluation.scores,
            comments: evaluation.comments,
            location: evaluation.location,
            created_at,
            synced: false,
        }
    }

    /// Wire payload for this record
    ///
    /// The submission date is the date of the sync pass, not `created_at`.
    pub fn to_remote(&self, evaluation_date: NaiveDate) -> RemoteEvaluation {
        RemoteEvaluation {
            product_id: self.product_id,
            evaluation_date,
            scores: self.scores.clone(),
            notes: self.comments.clone(),
            store_location: self.location.clone(),
        }
    }
}

/// Body of `POST /api/evaluations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvaluation {
    pub product_id: i64,
    /// Serialized as `YYYY-MM-DD`
    pub evaluation_date: NaiveDate,
    pub scores: Vec<ScoreEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub store_location: String,
}

/// A memoized remote-API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh iff `now < expiry`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }
}

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Weighted dimension of quality scored within a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
}

fn default_max_score() -> f64 {
    5.0
}

/// Evaluation as stored by the server, as read back for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: i64,
    pub product_id: i64,
    pub overall_score: f64,
    #[serde(default)]
    pub employee_email: Option<String>,
    #[serde(default)]
    pub evaluation_date: Option<NaiveDate>,
    #[serde(default)]
    pub store_location: Option<String>,
}
