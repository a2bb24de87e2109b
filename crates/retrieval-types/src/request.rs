use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{RetrievalError, Result};

pub const MAX_EXTERNAL_DOCS: usize = 50;
pub const MAX_EXTERNAL_DOC_CHARS: usize = 50_000;
pub const MAX_EXTERNAL_AGGREGATE_CHARS: usize = 500_000;

/// A caller-supplied document scored for one request only; never persisted,
/// never shared across tenants or requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalDoc {
    pub src_id: String,
    pub text: String,
    #[serde(default)]
    pub meta: HashMap<String, JsonValue>,
    pub priority: f32,
}

impl ExternalDoc {
    pub fn new(src_id: impl Into<String>, text: impl Into<String>, priority: f32) -> Self {
        Self {
            src_id: src_id.into(),
            text: text.into(),
            meta: HashMap::new(),
            priority,
        }
    }
}

/// One incoming search request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    pub query_text: String,
    pub tenant: String,
    pub k_total: usize,
    #[serde(default)]
    pub alpha: Option<f32>,
    #[serde(default)]
    pub personalize: bool,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub external: Vec<ExternalDoc>,
    #[serde(default = "default_use_internal")]
    pub use_internal: bool,
}

fn default_use_internal() -> bool {
    true
}

impl QueryRequest {
    pub fn new(query_text: impl Into<String>, tenant: impl Into<String>, k_total: usize) -> Self {
        Self {
            query_text: query_text.into(),
            tenant: tenant.into(),
            k_total,
            alpha: None,
            personalize: false,
            tag: None,
            external: Vec::new(),
            use_internal: true,
        }
    }

    /// Validate request-shape invariants from spec §3/§7. This never mutates
    /// `k_total`; clamping to `MAX_K` is the orchestrator's job (it needs to
    /// note the clamp in the trace), but an explicit `k_total = 0` is an
    /// outright rejection rather than a clamp.
    pub fn validate(&self) -> Result<()> {
        if self.k_total == 0 {
            return Err(RetrievalError::invalid_argument("k_total must be > 0"));
        }
        if !self.use_internal && self.external.is_empty() {
            return Err(RetrievalError::invalid_argument(
                "request must use internal sources or supply at least one external document",
            ));
        }
        if let Some(alpha) = self.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(RetrievalError::invalid_argument(
                    "alpha must be within [0, 1]",
                ));
            }
        }
        if self.external.len() > MAX_EXTERNAL_DOCS {
            return Err(RetrievalError::invalid_argument(format!(
                "external document count {} exceeds maximum {}",
                self.external.len(),
                MAX_EXTERNAL_DOCS
            )));
        }

        let mut seen_ids = HashSet::with_capacity(self.external.len());
        let mut aggregate_chars = 0usize;
        for doc in &self.external {
            if !seen_ids.insert(doc.src_id.as_str()) {
                return Err(RetrievalError::invalid_argument(format!(
                    "duplicate external src_id: {}",
                    doc.src_id
                )));
            }
            let len = doc.text.chars().count();
            if len == 0 || len > MAX_EXTERNAL_DOC_CHARS {
                return Err(RetrievalError::invalid_argument(format!(
                    "external doc {} text length {} out of bounds (1..={})",
                    doc.src_id, len, MAX_EXTERNAL_DOC_CHARS
                )));
            }
            if !(0.0..=1.0).contains(&doc.priority) {
                return Err(RetrievalError::invalid_argument(format!(
                    "external doc {} priority must be within [0, 1]",
                    doc.src_id
                )));
            }
            aggregate_chars += len;
        }
        if aggregate_chars > MAX_EXTERNAL_AGGREGATE_CHARS {
            return Err(RetrievalError::invalid_argument(format!(
                "aggregate external text length {} exceeds maximum {}",
                aggregate_chars, MAX_EXTERNAL_AGGREGATE_CHARS
            )));
        }

        Ok(())
    }
}
