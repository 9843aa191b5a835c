use crate::{Error, Result};

/// Cosine similarity of two unit-normalized vectors, computed as their dot product.
pub fn dot_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
	if a.len() != b.len() {
		return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
	}

	Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

pub fn ensure_dimension(vector: &[f32], expected: usize) -> Result<()> {
	if vector.len() != expected {
		return Err(Error::DimensionMismatch { expected, actual: vector.len() });
	}

	Ok(())
}
