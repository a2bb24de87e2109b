//! Scores caller-supplied ephemeral documents against a query (component E).

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use retrieval_types::{Embedder, Embedding, ExternalDoc, ExternalHit, Result};
use tracing::warn;

const DOC_EMBEDDING_TRUNCATE_CHARS: usize = 1_000;

/// Upper bound on in-flight embedding calls while scoring one batch of
/// ephemeral documents.
const MAX_CONCURRENT_DOC_EMBEDDINGS: usize = 8;

/// Scores a batch of ephemeral documents. A document's own embedding
/// failure degrades only that document to text-only scoring; it never
/// aborts the batch.
pub struct EphemeralScorer;

impl EphemeralScorer {
    pub fn new() -> Self {
        Self
    }

    pub async fn score(
        &self,
        query_text: &str,
        q_vec: Option<&Embedding>,
        docs: &[ExternalDoc],
        embedder: &dyn Embedder,
    ) -> Result<Vec<ExternalHit>> {
        let query_tokens: HashSet<String> = tokenize(query_text).into_iter().collect();

        // Embedding is the only I/O per document; run it with bounded
        // concurrency and keep `buffered` (not `buffer_unordered`) so the
        // result at index i still lines up with docs[i].
        let similarities: Vec<Option<f32>> = match q_vec {
            Some(qv) => {
                stream::iter(docs.iter().map(|doc| self.embed_doc(doc, qv, embedder)))
                    .buffered(MAX_CONCURRENT_DOC_EMBEDDINGS)
                    .collect()
                    .await
            }
            None => vec![None; docs.len()],
        };

        let mut hits = Vec::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            let base = doc.priority - 0.01 * i as f32;

            let s1 = match similarities[i] {
                Some(sim) => 0.7 * base.max(0.1) + 0.3 * sim,
                None => base.max(0.1),
            };

            let overlap = lexical_overlap(&query_tokens, &doc.text);
            let score = (0.8 * s1 + 0.2 * overlap).clamp(0.0, 1.0);

            hits.push(ExternalHit {
                src_id: doc.src_id.clone(),
                score,
                rank_in_source: 0,
                text_overlap: overlap,
                priority: doc.priority,
                meta: doc.meta.clone(),
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).expect("scores are finite"));
        for (rank, hit) in hits.iter_mut().enumerate() {
            hit.rank_in_source = (rank + 1) as u32;
        }
        Ok(hits)
    }

    /// Embeds the document's first 1 000 characters and returns its cosine
    /// similarity to the query vector, or `None` if embedding this one
    /// document failed.
    async fn embed_doc(
        &self,
        doc: &ExternalDoc,
        q_vec: &Embedding,
        embedder: &dyn Embedder,
    ) -> Option<f32> {
        let truncated: String = doc.text.chars().take(DOC_EMBEDDING_TRUNCATE_CHARS).collect();
        match embedder.embed(&truncated).await {
            Ok(d_vec) => Some(q_vec.cosine(&d_vec)),
            Err(err) => {
                warn!(src_id = %doc.src_id, error = %err, "ephemeral doc embedding failed, scoring by priority only");
                None
            }
        }
    }
}

impl Default for EphemeralScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn lexical_overlap(query_tokens: &HashSet<String>, doc_text: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let doc_tokens: HashSet<String> = tokenize(doc_text).into_iter().collect();
    let intersection = query_tokens.intersection(&doc_tokens).count();
    intersection as f32 / query_tokens.len() as f32
}
