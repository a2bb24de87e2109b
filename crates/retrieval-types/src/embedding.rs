use crate::error::{RetrievalError, Result};

/// A fixed-dimension embedding. The system operates on unit-norm embeddings
/// throughout; construction normalizes, and a zero vector is rejected rather
/// than silently producing NaNs.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

/// Minimum L2 norm below which a vector is treated as degenerate rather than
/// renormalized. Chosen to be comfortably above float rounding noise for
/// typical embedding dimensions.
pub const NORM_EPSILON: f32 = 1e-6;

impl Embedding {
    /// Wrap raw components, normalizing to unit L2 norm.
    ///
    /// Returns `InvalidArgument` for a zero (or sub-epsilon) vector, per the
    /// ingress invariant: violating inputs are normalized, zero vectors are
    /// rejected.
    pub fn new(values: Vec<f32>) -> Result<Self> {
        let norm = l2_norm(&values);
        if norm < NORM_EPSILON {
            return Err(RetrievalError::invalid_argument(
                "embedding has zero or sub-epsilon norm",
            ));
        }
        if (norm - 1.0).abs() < 1e-5 {
            return Ok(Self(values));
        }
        let scaled = values.into_iter().map(|v| v / norm).collect();
        Ok(Self(scaled))
    }

    /// Wrap an already-normalized vector without re-checking the norm.
    /// Used on hot paths where the caller has just computed and verified it.
    pub fn from_unit_norm_unchecked(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity between two unit-norm embeddings is their dot
    /// product. Dimension mismatch is a caller bug, not a recoverable
    /// condition, so this panics rather than returning a `Result`; callers
    /// are expected to validate dimension at ingress (`embedding_dimension`
    /// config).
    pub fn cosine(&self, other: &Embedding) -> f32 {
        assert_eq!(
            self.0.len(),
            other.0.len(),
            "cosine similarity requires matching dimensions"
        );
        dot(&self.0, &other.0)
    }

    /// `q + alpha * other`, returning the raw (not renormalized) sum plus
    /// its norm, so callers (the personalizer) can apply the epsilon
    /// fallback themselves.
    pub fn blend_raw(&self, alpha: f32, other: &Embedding) -> (Vec<f32>, f32) {
        assert_eq!(self.0.len(), other.0.len());
        let blended: Vec<f32> = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(q, c)| q + alpha * c)
            .collect();
        let norm = l2_norm(&blended);
        (blended, norm)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
