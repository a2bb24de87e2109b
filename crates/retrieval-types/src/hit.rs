use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Which internal source produced an `InternalHit`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InternalSource {
    Vector,
    Lexical,
}

/// A hit from one of the two internal sources, already ranked by that
/// source. `rank_in_source` is 1-indexed, as returned by the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InternalHit {
    pub doc_id: String,
    pub score: f32,
    pub source: InternalSource,
    pub rank_in_source: u32,
    #[serde(default)]
    pub payload: HashMap<String, JsonValue>,
}

/// A hit produced by scoring a caller-supplied ephemeral document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalHit {
    pub src_id: String,
    pub score: f32,
    pub rank_in_source: u32,
    pub text_overlap: f32,
    pub priority: f32,
    #[serde(default)]
    pub meta: HashMap<String, JsonValue>,
}

/// Discriminated origin of a fused hit. Replaces the dynamic string-keyed
/// dict of the source with a tagged variant per hit kind, as required by the
/// fuser's cross-origin tie-break rule (external > vector > lexical).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Vector,
    Lexical,
    External,
}

impl Origin {
    /// Tie-break priority used by the fuser when `eff` scores are equal:
    /// external outranks vector, which outranks lexical-only.
    pub fn tie_break_rank(self) -> u8 {
        match self {
            Origin::External => 0,
            Origin::Vector => 1,
            Origin::Lexical => 2,
        }
    }
}

/// One contribution toward a fused hit's score, used for explainability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    pub source: InternalSource,
    pub rank: u32,
    pub rrf_term: f32,
}

/// A single fused, ranked result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredHit {
    pub id: String,
    pub origin: Origin,
    pub fused_score: f32,
    pub final_rank: u32,
    pub contributions: Vec<Contribution>,
}

/// Per-request diagnostics. The sole channel for reporting non-fatal
/// degradations: a failed source never raises an error by itself, it shows
/// up here instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchTrace {
    pub total: usize,
    pub internal_count: usize,
    pub external_count: usize,
    pub personalization_applied: bool,
    pub alpha_used: Option<f32>,
    pub similarity_query_to_centroid: Option<f32>,
    pub duration_ms: u64,
    pub degraded_sources: Vec<String>,
    pub k_total_clamped: bool,
}

/// Return value of `Engine::stats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatsReport {
    pub tenant: String,
    pub cached_tags: Vec<String>,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Outcome of one `(tenant, tag)` pair processed by the centroid builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BuildOutcome {
    Updated { source_count: u64 },
    Degenerate { reason: String },
    Failed { reason: String },
}

/// Return value of `Builder::run`, aggregating per-key outcomes so that one
/// failing pair never aborts its siblings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BuildReport {
    pub outcomes: HashMap<String, BuildOutcome>,
}

impl BuildReport {
    pub fn record(&mut self, tenant: &str, tag: &str, outcome: BuildOutcome) {
        self.outcomes.insert(format!("{tenant}:{tag}"), outcome);
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, BuildOutcome::Updated { .. }))
            .count()
    }
}
