use std::time::Duration;

use serde::{Deserialize, Serialize};

use idmatch_domain::{
	filter::{self, AttributeFilter, Predicate},
	fusion::{self, FusedResult, ModalityWeights},
	similarity,
};

use crate::{
	MatchService, ServiceError, ServiceResult,
	executor::{self, ModalityQuery},
};

/// Ranking over caller-supplied embeddings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankRequest {
	pub face_embedding: Option<Vec<f32>>,
	pub text_embedding: Option<Vec<f32>>,
	#[serde(default)]
	pub filter: AttributeFilter,
	/// Falls back to `search.face_weight`.
	pub face_weight: Option<f32>,
	/// Falls back to `search.text_weight`.
	pub text_weight: Option<f32>,
	pub top_n: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankResponse {
	pub items: Vec<FusedResult>,
}

#[derive(Debug)]
pub(crate) struct RankPlan {
	pub(crate) top_n: u32,
	pub(crate) predicate: Predicate,
	pub(crate) weights: ModalityWeights,
	pub(crate) face_weight: f32,
	pub(crate) text_weight: f32,
}

/// Fused results along with the normalized weights that produced them.
#[derive(Debug)]
pub(crate) struct Ranked {
	pub(crate) face_weight: f32,
	pub(crate) text_weight: f32,
	pub(crate) items: Vec<FusedResult>,
}

impl MatchService {
	/// Validates the request, queries both indexes concurrently, and fuses the candidates.
	///
	/// Validation happens before any index is contacted: a request with no embedding fails with
	/// [`ServiceError::NoEmbeddingProvided`] whatever its filter says.
	pub async fn rank(&self, req: RankRequest) -> ServiceResult<Vec<FusedResult>> {
		Ok(self.rank_weighted(req).await?.items)
	}

	pub(crate) async fn rank_weighted(&self, req: RankRequest) -> ServiceResult<Ranked> {
		if req.face_embedding.is_none() && req.text_embedding.is_none() {
			return Err(ServiceError::NoEmbeddingProvided);
		}

		let plan = self.plan(&req.filter, req.face_weight, req.text_weight, req.top_n)?;

		self.check_dimensions(req.face_embedding.as_deref(), req.text_embedding.as_deref())?;

		let candidates = executor::execute(
			&self.indexes,
			ModalityQuery {
				face: req.face_embedding.as_deref(),
				text: req.text_embedding.as_deref(),
				predicate: &plan.predicate,
				candidate_k: self.cfg.search.candidate_k,
			},
			Duration::from_millis(self.cfg.search.query_timeout_ms),
		)
		.await?;
		let items =
			fusion::fuse(&candidates.face, &candidates.text, plan.weights, plan.top_n as usize)?;

		for item in items.iter().filter(|item| item.payload_conflict) {
			tracing::warn!(
				pid = %item.pid,
				"Face and text payloads disagree. Keeping the face payload."
			);
		}

		Ok(Ranked { face_weight: plan.face_weight, text_weight: plan.text_weight, items })
	}

	/// Resolves every request parameter that does not depend on the query vectors.
	pub(crate) fn plan(
		&self,
		filter: &AttributeFilter,
		face_weight: Option<f32>,
		text_weight: Option<f32>,
		top_n: Option<u32>,
	) -> ServiceResult<RankPlan> {
		let top_n = self.resolve_top_n(top_n)?;
		let predicate = filter::translate(filter)?;
		let weights = ModalityWeights::new(
			face_weight.unwrap_or(self.cfg.search.face_weight),
			text_weight.unwrap_or(self.cfg.search.text_weight),
		);
		let (face_weight, text_weight) = weights.normalize()?;

		Ok(RankPlan { top_n, predicate, weights, face_weight, text_weight })
	}

	pub(crate) fn check_dimensions(
		&self,
		face: Option<&[f32]>,
		text: Option<&[f32]>,
	) -> ServiceResult<()> {
		if let Some(vector) = face {
			similarity::ensure_dimension(vector, self.cfg.storage.qdrant.face.vector_dim as usize)?;
		}
		if let Some(vector) = text {
			similarity::ensure_dimension(vector, self.cfg.storage.qdrant.text.vector_dim as usize)?;
		}

		Ok(())
	}

	fn resolve_top_n(&self, requested: Option<u32>) -> ServiceResult<u32> {
		let max_top_n = self.cfg.search.max_top_n;
		let top_n = requested.unwrap_or(self.cfg.search.default_top_n);

		if top_n == 0 || top_n > max_top_n {
			return Err(ServiceError::InvalidRequest {
				message: format!("top_n must be between 1 and {max_top_n}."),
			});
		}

		Ok(top_n)
	}
}
