//! Reciprocal Rank Fusion over internal sources, combined with external
//! hits via a priority blend (component F).

use std::collections::HashMap;

use retrieval_types::{Contribution, ExternalHit, InternalHit, InternalSource, Origin, ScoredHit};

/// Default `k` in the RRF formula `1 / (k + rank)`.
pub const DEFAULT_K_RRF: u32 = 60;

/// Default multiplier applied to external scores when combining with
/// internal RRF scores, per the configuration knob resolving the source's
/// fixed `1.2x` boost into an explicit, tenant-overridable parameter.
pub const DEFAULT_EXTERNAL_BOOST: f32 = 1.2;

#[derive(Debug, Clone)]
struct InternalAccumulator {
    doc_id: String,
    rrf: f32,
    present_in_vector: bool,
    contributions: Vec<Contribution>,
}

/// Merges ranked lists from up to three sources into one total order
/// (component F). A source returning zero results is simply omitted; a
/// document appearing in multiple internal sources contributes once
/// (summed RRF); cross-origin duplicate IDs (external vs internal) are
/// kept as separate candidates.
pub struct Fuser {
    k_rrf: u32,
    external_boost: f32,
}

impl Fuser {
    pub fn new(k_rrf: u32, external_boost: f32) -> Self {
        Self {
            k_rrf,
            external_boost,
        }
    }

    pub fn fuse(
        &self,
        vector: &[InternalHit],
        lexical: &[InternalHit],
        external: &[ExternalHit],
        k_total: usize,
    ) -> Vec<ScoredHit> {
        let internal = self.fuse_internal(vector, lexical);

        #[derive(Debug)]
        struct Candidate {
            id: String,
            origin: Origin,
            eff: f32,
            contributions: Vec<Contribution>,
        }

        let mut candidates: Vec<Candidate> = internal
            .into_iter()
            .map(|acc| Candidate {
                id: acc.doc_id,
                origin: if acc.present_in_vector {
                    Origin::Vector
                } else {
                    Origin::Lexical
                },
                eff: acc.rrf,
                contributions: acc.contributions,
            })
            .collect();

        for hit in external {
            candidates.push(Candidate {
                id: hit.src_id.clone(),
                origin: Origin::External,
                eff: hit.score * self.external_boost,
                contributions: Vec::new(),
            });
        }

        candidates.sort_by(|a, b| {
            b.eff
                .partial_cmp(&a.eff)
                .expect("scores are finite")
                .then_with(|| a.origin.tie_break_rank().cmp(&b.origin.tie_break_rank()))
                .then_with(|| a.id.cmp(&b.id))
        });

        candidates
            .into_iter()
            .take(k_total)
            .enumerate()
            .map(|(i, c)| ScoredHit {
                id: c.id,
                origin: c.origin,
                fused_score: c.eff,
                final_rank: (i + 1) as u32,
                contributions: c.contributions,
            })
            .collect()
    }

    /// RRF over the two internal ranked lists, with per-document
    /// contributions recorded for explainability. Tie-break (used when
    /// callers inspect `internal_fused` directly, and inherited into the
    /// final fuse via `Origin`): presence in `vector` precedes
    /// lexical-only, then ascending `doc_id`.
    fn fuse_internal(
        &self,
        vector: &[InternalHit],
        lexical: &[InternalHit],
    ) -> Vec<InternalAccumulator> {
        let mut acc: HashMap<String, InternalAccumulator> = HashMap::new();

        for hit in vector {
            let entry = acc
                .entry(hit.doc_id.clone())
                .or_insert_with(|| InternalAccumulator {
                    doc_id: hit.doc_id.clone(),
                    rrf: 0.0,
                    present_in_vector: false,
                    contributions: Vec::new(),
                });
            entry.present_in_vector = true;
            let term = 1.0 / (self.k_rrf as f32 + hit.rank_in_source as f32);
            entry.rrf += term;
            entry.contributions.push(Contribution {
                source: InternalSource::Vector,
                rank: hit.rank_in_source,
                rrf_term: term,
            });
        }

        for hit in lexical {
            let entry = acc
                .entry(hit.doc_id.clone())
                .or_insert_with(|| InternalAccumulator {
                    doc_id: hit.doc_id.clone(),
                    rrf: 0.0,
                    present_in_vector: false,
                    contributions: Vec::new(),
                });
            let term = 1.0 / (self.k_rrf as f32 + hit.rank_in_source as f32);
            entry.rrf += term;
            entry.contributions.push(Contribution {
                source: InternalSource::Lexical,
                rank: hit.rank_in_source,
                rrf_term: term,
            });
        }

        let mut fused: Vec<InternalAccumulator> = acc.into_values().collect();
        fused.sort_by(|a, b| {
            b.rrf
                .partial_cmp(&a.rrf)
                .expect("scores are finite")
                .then_with(|| b.present_in_vector.cmp(&a.present_in_vector))
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        fused
    }
}

impl Default for Fuser {
    fn default() -> Self {
        Self::new(DEFAULT_K_RRF, DEFAULT_EXTERNAL_BOOST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(doc_id: &str, source: InternalSource, rank: u32) -> InternalHit {
        InternalHit {
            doc_id: doc_id.to_string(),
            score: 1.0 / rank as f32,
            source,
            rank_in_source: rank,
            payload: Default::default(),
        }
    }

    fn ext(src_id: &str, score: f32) -> ExternalHit {
        ExternalHit {
            src_id: src_id.to_string(),
            score,
            rank_in_source: 1,
            text_overlap: 0.0,
            priority: score,
            meta: Default::default(),
        }
    }

    #[test]
    fn rrf_tie_break_prefers_vector_presence() {
        let vector = vec![hit("A", InternalSource::Vector, 1), hit("B", InternalSource::Vector, 2)];
        let lexical = vec![hit("B", InternalSource::Lexical, 1), hit("A", InternalSource::Lexical, 2)];
        let fuser = Fuser::default();
        let fused = fuser.fuse(&vector, &lexical, &[], 10);
        assert_eq!(fused[0].id, "A");
        assert_eq!(fused[1].id, "B");
    }

    #[test]
    fn fusion_is_commutative_up_to_tie_break() {
        let vector = vec![hit("A", InternalSource::Vector, 1), hit("B", InternalSource::Vector, 2)];
        let lexical = vec![hit("B", InternalSource::Lexical, 1), hit("A", InternalSource::Lexical, 2)];
        let fuser = Fuser::default();
        let forward = fuser.fuse(&vector, &lexical, &[], 10);
        let backward = fuser.fuse(&lexical, &vector, &[], 10);
        // Swapping which list is "vector" changes presence-in-vector, so we
        // only assert the score set matches, not a byte-identical order.
        let mut forward_ids: Vec<_> = forward.iter().map(|h| h.id.clone()).collect();
        let mut backward_ids: Vec<_> = backward.iter().map(|h| h.id.clone()).collect();
        forward_ids.sort();
        backward_ids.sort();
        assert_eq!(forward_ids, backward_ids);
    }

    #[test]
    fn document_in_both_sources_contributes_once_summed() {
        let vector = vec![hit("A", InternalSource::Vector, 1)];
        let lexical = vec![hit("A", InternalSource::Lexical, 1)];
        let fuser = Fuser::default();
        let fused = fuser.fuse(&vector, &lexical, &[], 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].contributions.len(), 2);
        let expected = 1.0 / 61.0 + 1.0 / 61.0;
        assert!((fused[0].fused_score - expected).abs() < 1e-6);
    }

    #[test]
    fn external_candidates_stay_distinct_from_internal_duplicate_ids() {
        let vector = vec![hit("A", InternalSource::Vector, 1)];
        let external = vec![ext("A", 0.9)];
        let fuser = Fuser::default();
        let fused = fuser.fuse(&vector, &[], &external, 10);
        assert_eq!(fused.len(), 2);
        assert!(fused.iter().any(|h| h.origin == Origin::Vector));
        assert!(fused.iter().any(|h| h.origin == Origin::External));
    }

    #[test]
    fn external_only_order_follows_priority() {
        let external = vec![ext("d1", 0.9), ext("d2", 0.8), ext("d3", 0.7)];
        let fuser = Fuser::default();
        let fused = fuser.fuse(&[], &[], &external, 10);
        let ids: Vec<_> = fused.iter().map(|h| h.id.clone()).collect();
        assert_eq!(ids, vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn final_rank_is_a_permutation_of_one_to_n() {
        let vector = vec![hit("A", InternalSource::Vector, 1), hit("B", InternalSource::Vector, 2)];
        let external = vec![ext("C", 0.5)];
        let fuser = Fuser::default();
        let fused = fuser.fuse(&vector, &[], &external, 10);
        let mut ranks: Vec<_> = fused.iter().map(|h| h.final_rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn truncates_to_k_total() {
        let vector = vec![
            hit("A", InternalSource::Vector, 1),
            hit("B", InternalSource::Vector, 2),
            hit("C", InternalSource::Vector, 3),
        ];
        let fuser = Fuser::default();
        let fused = fuser.fuse(&vector, &[], &[], 2);
        assert_eq!(fused.len(), 2);
    }
}
