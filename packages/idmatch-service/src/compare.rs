use serde::{Deserialize, Serialize};

use idmatch_domain::{
	confidence::{self, ConfidenceTier},
	similarity,
};

use crate::{MatchService, ServiceError, ServiceResult};

/// Two face embeddings to compare directly, without touching any index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
	pub face_a: Vec<f32>,
	pub face_b: Vec<f32>,
	/// Falls back to `compare.match_threshold`.
	pub match_threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
	pub similarity: f32,
	pub confidence: ConfidenceTier,
	pub confidence_percentage: f64,
	pub match_threshold: f32,
	pub is_match: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifyRequest {
	pub score: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassifyResponse {
	pub score: f32,
	pub confidence: ConfidenceTier,
	pub confidence_percentage: f64,
}

impl MatchService {
	pub fn compare(&self, req: CompareRequest) -> ServiceResult<CompareResponse> {
		let dim = self.cfg.storage.qdrant.face.vector_dim as usize;

		similarity::ensure_dimension(&req.face_a, dim)?;
		similarity::ensure_dimension(&req.face_b, dim)?;

		let match_threshold = req.match_threshold.unwrap_or(self.cfg.compare.match_threshold);

		if !(0.0..=1.0).contains(&match_threshold) {
			return Err(ServiceError::InvalidRequest {
				message: "match_threshold must be between 0 and 1.".to_string(),
			});
		}

		let similarity = similarity::dot_similarity(&req.face_a, &req.face_b)?;

		Ok(CompareResponse {
			similarity,
			confidence: self.thresholds.classify(similarity),
			confidence_percentage: confidence::confidence_percentage(similarity),
			match_threshold,
			is_match: similarity > match_threshold,
		})
	}

	/// Tier for a combined score under the configured thresholds.
	pub fn classify(&self, score: f32) -> ConfidenceTier {
		self.thresholds.classify(score)
	}

	pub fn classify_score(&self, req: ClassifyRequest) -> ClassifyResponse {
		ClassifyResponse {
			score: req.score,
			confidence: self.classify(req.score),
			confidence_percentage: confidence::confidence_percentage(req.score),
		}
	}
}
