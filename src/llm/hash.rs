// Offline embedding by feature hashing
// Used when no embedding server is available. Texts sharing words end up
// close together; nothing semantic beyond that.

use anyhow::Result;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::vector_store::normalize;

pub const DEFAULT_HASH_DIMENSION: usize = 256;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut index = [0u8; 8];
        index.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(index) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty());
        for token in tokens {
            let (bucket, sign) = self.bucket(token);
            vector[bucket] += sign;
        }

        Ok(normalize(&vector))
    }
}
