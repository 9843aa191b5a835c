//! The full search pipeline: embedding production, ranking, and result enrichment.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use idmatch_domain::{
	confidence::{self, ConfidenceTier},
	description::{self, PersonDescription},
	filter::{AttributeFilter, Attributes},
	fusion::FusedResult,
};
use idmatch_storage::cases::CaseRecord;

use crate::{MatchService, RankRequest, ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	pub face_embedding: Option<Vec<f32>>,
	pub text_embedding: Option<Vec<f32>>,
	/// Encoded by the face encoder when no face embedding is supplied.
	pub photo_base64: Option<String>,
	/// Embedded as-is when no text embedding is supplied. Takes precedence over `person`.
	pub search_text: Option<String>,
	#[serde(default)]
	pub person: PersonDescription,
	#[serde(default)]
	pub filter: AttributeFilter,
	pub face_weight: Option<f32>,
	pub text_weight: Option<f32>,
	pub top_n: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchItem {
	pub pid: String,
	pub combined_score: f32,
	pub face_score: f32,
	pub text_score: f32,
	pub confidence: ConfidenceTier,
	pub confidence_percentage: f64,
	pub attributes: Attributes,
	pub payload_conflict: bool,
	/// `None` when no case store is configured or the PID has no case record.
	pub details: Option<CaseRecord>,
}

/// Result counts per confidence tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
	pub very_high: u32,
	pub high: u32,
	pub medium: u32,
	pub low: u32,
	pub none: u32,
}
impl TierSummary {
	pub fn from_tiers(tiers: impl IntoIterator<Item = ConfidenceTier>) -> Self {
		let mut summary = Self::default();

		for tier in tiers {
			let slot = match tier {
				ConfidenceTier::VeryHigh => &mut summary.very_high,
				ConfidenceTier::High => &mut summary.high,
				ConfidenceTier::Medium => &mut summary.medium,
				ConfidenceTier::Low => &mut summary.low,
				ConfidenceTier::None => &mut summary.none,
			};

			*slot += 1;
		}

		summary
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
	pub trace_id: Uuid,
	/// The text that was embedded, if any.
	pub description: Option<String>,
	pub has_photo: bool,
	pub face_weight: f32,
	pub text_weight: f32,
	pub tiers: TierSummary,
	pub items: Vec<SearchItem>,
}

/// Outcome of producing one modality's query vector.
#[derive(Debug)]
enum Produced {
	Ready(Vec<f32>),
	Absent,
	Failed(String),
}
impl Produced {
	fn into_vector(self) -> Option<Vec<f32>> {
		match self {
			Self::Ready(vector) => Some(vector),
			Self::Absent | Self::Failed(_) => None,
		}
	}
}

impl MatchService {
	/// Produces whichever embeddings the request allows, ranks, and enriches the results.
	///
	/// A failure to produce one embedding is logged and that modality is skipped. When nothing
	/// could be embedded because every producer failed, the search fails with
	/// [`ServiceError::Provider`] rather than [`ServiceError::NoEmbeddingProvided`].
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		// Everything the request can get wrong is checked before any provider is called.
		self.plan(&req.filter, req.face_weight, req.text_weight, req.top_n)?;
		self.check_dimensions(req.face_embedding.as_deref(), req.text_embedding.as_deref())?;

		let trace_id = Uuid::new_v4();
		let description = match req.search_text.as_deref().map(str::trim) {
			Some(text) if !text.is_empty() => Some(text.to_string()),
			_ => description::describe(&req.person),
		};
		let photo = req.photo_base64.as_deref().map(str::trim).filter(|photo| !photo.is_empty());
		let has_photo = photo.is_some();
		let image = match (&req.face_embedding, photo) {
			(None, Some(photo)) => Some(decode_photo(photo)?),
			_ => None,
		};
		let (face, text) = tokio::join!(
			self.produce_face_embedding(trace_id, req.face_embedding, image),
			self.produce_text_embedding(trace_id, req.text_embedding, description.as_deref()),
		);

		if !matches!(face, Produced::Ready(_)) && !matches!(text, Produced::Ready(_)) {
			let failures = [&face, &text]
				.into_iter()
				.filter_map(|produced| match produced {
					Produced::Failed(message) => Some(message.as_str()),
					_ => None,
				})
				.collect::<Vec<_>>();

			if !failures.is_empty() {
				return Err(ServiceError::Provider { message: failures.join("; ") });
			}
		}

		let ranked = self
			.rank_weighted(RankRequest {
				face_embedding: face.into_vector(),
				text_embedding: text.into_vector(),
				filter: req.filter,
				face_weight: req.face_weight,
				text_weight: req.text_weight,
				top_n: req.top_n,
			})
			.await?;
		let mut details = self.fetch_details(&ranked.items).await?;
		let items = ranked
			.items
			.into_iter()
			.map(|item| {
				let details = details.remove(&item.pid);

				self.enrich(item, details)
			})
			.collect::<Vec<_>>();
		let tiers = TierSummary::from_tiers(items.iter().map(|item| item.confidence));

		tracing::info!(
			%trace_id,
			results = items.len(),
			very_high = tiers.very_high,
			high = tiers.high,
			has_photo,
			has_description = description.is_some(),
			"Search finished."
		);

		Ok(SearchResponse {
			trace_id,
			description,
			has_photo,
			face_weight: ranked.face_weight,
			text_weight: ranked.text_weight,
			tiers,
			items,
		})
	}

	async fn produce_face_embedding(
		&self,
		trace_id: Uuid,
		supplied: Option<Vec<f32>>,
		image: Option<Vec<u8>>,
	) -> Produced {
		if let Some(vector) = supplied {
			return Produced::Ready(vector);
		}

		let Some(image) = image else {
			return Produced::Absent;
		};
		let Some(cfg) = self.cfg.providers.face_encoder.as_ref() else {
			tracing::warn!(%trace_id, "Photo supplied but no face encoder is configured.");

			return Produced::Absent;
		};
		let expected = self.cfg.storage.qdrant.face.vector_dim as usize;

		match self.providers.face_encoder.encode(cfg, &image).await {
			Ok(vector) if vector.len() == expected => Produced::Ready(vector),
			Ok(vector) => {
				tracing::warn!(
					%trace_id,
					provider = %cfg.provider_id,
					dimensions = vector.len(),
					"Face encoder returned the wrong dimensions. Skipping face."
				);

				Produced::Failed(format!(
					"Face encoder {} returned {} dimensions, expected {expected}.",
					cfg.provider_id,
					vector.len()
				))
			},
			Err(err) => {
				tracing::warn!(
					%trace_id,
					provider = %cfg.provider_id,
					error = %err,
					"Face encoding failed. Skipping face."
				);

				Produced::Failed(format!("Face encoder {} failed: {err}", cfg.provider_id))
			},
		}
	}

	async fn produce_text_embedding(
		&self,
		trace_id: Uuid,
		supplied: Option<Vec<f32>>,
		description: Option<&str>,
	) -> Produced {
		if let Some(vector) = supplied {
			return Produced::Ready(vector);
		}

		let Some(description) = description else {
			return Produced::Absent;
		};
		let texts = vec![description.to_string()];
		let cfg = &self.cfg.providers.text_embedding;
		let expected = self.cfg.storage.qdrant.text.vector_dim as usize;

		match self.providers.text_embedding.embed(cfg, &texts).await {
			Ok(mut vectors) if vectors.len() == 1 && vectors[0].len() == expected =>
				vectors.pop().map_or(Produced::Absent, Produced::Ready),
			Ok(vectors) => {
				tracing::warn!(
					%trace_id,
					provider = %cfg.provider_id,
					count = vectors.len(),
					"Text embedder returned an unexpected shape. Skipping text."
				);

				Produced::Failed(format!(
					"Text embedder {} returned {} vectors, expected one of {expected} dimensions.",
					cfg.provider_id,
					vectors.len()
				))
			},
			Err(err) => {
				tracing::warn!(
					%trace_id,
					provider = %cfg.provider_id,
					error = %err,
					"Text embedding failed. Skipping text."
				);

				Produced::Failed(format!("Text embedder {} failed: {err}", cfg.provider_id))
			},
		}
	}

	/// Fetches one case record by PID.
	///
	/// Fails with [`ServiceError::NotFound`] when the PID has no record in either case table or
	/// when case lookup is not configured.
	pub async fn record(&self, pid: &str) -> ServiceResult<CaseRecord> {
		let pid = pid.trim();

		if pid.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "pid must not be empty.".to_string(),
			});
		}

		let Some(cases) = self.cases.as_ref() else {
			return Err(ServiceError::NotFound {
				message: format!("No case record for {pid}; case lookup is not configured."),
			});
		};
		let pids = [pid.to_string()];
		let mut records = cases
			.fetch_many(&pids)
			.await
			.map_err(|err| ServiceError::Storage { message: err.to_string() })?;

		records
			.remove(pid)
			.ok_or_else(|| ServiceError::NotFound { message: format!("No case record for {pid}.") })
	}

	async fn fetch_details(
		&self,
		items: &[FusedResult],
	) -> ServiceResult<HashMap<String, CaseRecord>> {
		let Some(cases) = self.cases.as_ref() else {
			return Ok(HashMap::new());
		};

		if items.is_empty() {
			return Ok(HashMap::new());
		}

		let pids = items.iter().map(|item| item.pid.clone()).collect::<Vec<_>>();
		let records = cases
			.fetch_many(&pids)
			.await
			.map_err(|err| ServiceError::Storage { message: err.to_string() })?;

		if records.len() < pids.len() {
			tracing::debug!(
				missing = pids.len() - records.len(),
				"Some results have no case record."
			);
		}

		Ok(records)
	}

	fn enrich(&self, item: FusedResult, details: Option<CaseRecord>) -> SearchItem {
		SearchItem {
			confidence: self.thresholds.classify(item.combined_score),
			confidence_percentage: confidence::confidence_percentage(item.combined_score),
			pid: item.pid,
			combined_score: item.combined_score,
			face_score: item.face_score,
			text_score: item.text_score,
			attributes: item.attributes,
			payload_conflict: item.payload_conflict,
			details,
		}
	}
}

/// Accepts plain base64 or a `data:` URL.
fn decode_photo(photo: &str) -> ServiceResult<Vec<u8>> {
	let encoded = match photo.split_once(";base64,") {
		Some((prefix, data)) if prefix.starts_with("data:") => data,
		_ => photo,
	};

	STANDARD.decode(encoded.trim()).map_err(|err| ServiceError::InvalidRequest {
		message: format!("photo_base64 is not valid base64: {err}."),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_plain_and_data_url_photos() {
		assert_eq!(decode_photo("aGVsbG8=").expect("plain decode failed"), b"hello");
		assert_eq!(
			decode_photo("data:image/jpeg;base64,aGVsbG8=").expect("data url decode failed"),
			b"hello"
		);
	}

	#[test]
	fn rejects_invalid_photo() {
		assert!(matches!(decode_photo("not base64!"), Err(ServiceError::InvalidRequest { .. })));
	}

	#[test]
	fn summarizes_tiers() {
		let summary = TierSummary::from_tiers([
			ConfidenceTier::VeryHigh,
			ConfidenceTier::Medium,
			ConfidenceTier::Medium,
			ConfidenceTier::None,
		]);

		assert_eq!(summary, TierSummary { very_high: 1, high: 0, medium: 2, low: 0, none: 1 });
	}
}
