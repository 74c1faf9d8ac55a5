//! Text embeddings for the relevance store
//!
//! The embedding backend is pluggable; the built-in one hashes words into a
//! fixed number of signed buckets, which is enough for "shares vocabulary"
//! relevance and keeps runs deterministic.

use std::hash::BuildHasher;

const DEFAULT_DIMENSIONS: usize = 128;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    hasher: ahash::RandomState,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            hasher: ahash::RandomState::with_seeds(11, 23, 37, 53),
        }
    }

    /// L2-normalized bag-of-words vector; empty text maps to the zero vector
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in tokens(text) {
            let h = self.hasher.hash_one(word.as_str());
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
}

/// Cosine similarity; 0 for empty or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
