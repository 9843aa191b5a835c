//! Concurrent face and text lookups under one shared deadline.

use std::time::Duration;

use tokio::time::{self, Instant};

use idmatch_domain::{
	filter::Predicate,
	fusion::{self, Candidate, Modality},
};

use crate::{Indexes, ServiceError, ServiceResult, VectorIndex};

/// One request's worth of index lookups. A modality without a vector is not queried.
#[derive(Debug, Clone, Copy)]
pub struct ModalityQuery<'a> {
	pub face: Option<&'a [f32]>,
	pub text: Option<&'a [f32]>,
	pub predicate: &'a Predicate,
	pub candidate_k: u32,
}

#[derive(Debug, Default)]
pub struct ModalityCandidates {
	pub face: Vec<Candidate>,
	pub text: Vec<Candidate>,
}

/// Runs both lookups concurrently and waits for both.
///
/// Fails with [`ServiceError::NoEmbeddingProvided`] before touching any index when neither vector
/// is present. The first lookup to fail or to miss the deadline fails the whole call, and the
/// other lookup is dropped with it. No partial result is ever returned.
pub async fn execute(
	indexes: &Indexes,
	query: ModalityQuery<'_>,
	timeout: Duration,
) -> ServiceResult<ModalityCandidates> {
	if query.face.is_none() && query.text.is_none() {
		return Err(ServiceError::NoEmbeddingProvided);
	}

	let deadline = Instant::now() + timeout;
	let (face, text) = tokio::try_join!(
		lookup(indexes.face.as_ref(), Modality::Face, query.face, &query, deadline),
		lookup(indexes.text.as_ref(), Modality::Text, query.text, &query, deadline),
	)?;

	tracing::debug!(
		face_candidates = face.len(),
		text_candidates = text.len(),
		"Modality lookups finished."
	);

	Ok(ModalityCandidates { face, text })
}

async fn lookup(
	index: &dyn VectorIndex,
	modality: Modality,
	vector: Option<&[f32]>,
	query: &ModalityQuery<'_>,
	deadline: Instant,
) -> ServiceResult<Vec<Candidate>> {
	let Some(vector) = vector else {
		return Ok(Vec::new());
	};
	let started = Instant::now();
	let result =
		time::timeout_at(deadline, index.search(vector, query.predicate, query.candidate_k)).await;
	let mut candidates = match result {
		Ok(Ok(candidates)) => candidates,
		Ok(Err(err)) => {
			tracing::warn!(%modality, error = %err, "Index lookup failed.");

			return Err(ServiceError::IndexUnavailable { modality, message: err.to_string() });
		},
		Err(_) => {
			tracing::warn!(%modality, "Index lookup timed out.");

			return Err(ServiceError::IndexUnavailable {
				modality,
				message: "Lookup did not finish before the query deadline.".to_string(),
			});
		},
	};

	candidates.sort_by(|a, b| fusion::cmp_f32_desc(a.score, b.score));
	candidates.truncate(query.candidate_k as usize);

	tracing::trace!(%modality, elapsed_ms = started.elapsed().as_millis() as u64, "Index lookup.");

	Ok(candidates)
}
