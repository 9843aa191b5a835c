use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Qdrant,
	qdrant::{
		Condition, Filter, Query, QueryPointsBuilder, Range, ScoredPoint, Value, value::Kind,
	},
};

use idmatch_domain::{
	filter::{Attributes, Predicate, RangeBound},
	fusion::Candidate,
};

use crate::Result;

pub const PID_KEY: &str = "pid";
pub const GENDER_KEY: &str = "gender";
pub const AGE_KEY: &str = "age";
pub const HEIGHT_KEY: &str = "height_cm";

/// One Qdrant collection holding a single embedding kind.
pub struct QdrantIndex {
	pub client: Arc<Qdrant>,
	pub collection: String,
}
impl QdrantIndex {
	pub async fn search(
		&self,
		vector: &[f32],
		predicate: &Predicate,
		limit: u32,
	) -> Result<Vec<Candidate>> {
		let mut query = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.limit(u64::from(limit))
			.with_payload(true);

		if let Some(filter) = predicate_filter(predicate) {
			query = query.filter(filter);
		}

		let response = self.client.query(query).await?;

		Ok(collect_candidates(&self.collection, &response.result))
	}

	/// Round-trips to Qdrant and reports whether the collection is present.
	pub async fn collection_exists(&self) -> Result<bool> {
		Ok(self.client.collection_exists(self.collection.clone()).await?)
	}
}

/// The face and text collections, sharing one client connection.
pub struct QdrantStore {
	pub face: QdrantIndex,
	pub text: QdrantIndex,
}
impl QdrantStore {
	pub fn new(cfg: &idmatch_config::Qdrant) -> Result<Self> {
		let client = Arc::new(Qdrant::from_url(&cfg.url).build()?);

		Ok(Self {
			face: QdrantIndex { client: client.clone(), collection: cfg.face.name.clone() },
			text: QdrantIndex { client, collection: cfg.text.name.clone() },
		})
	}
}

/// Renders a predicate as a Qdrant filter. An accept-all predicate needs no filter at all.
pub fn predicate_filter(predicate: &Predicate) -> Option<Filter> {
	let mut must = Vec::new();

	if let Some(gender) = predicate.gender.as_ref() {
		must.push(Condition::matches(GENDER_KEY, gender.clone()));
	}
	if let Some(age) = predicate.age.as_ref() {
		must.push(Condition::range(AGE_KEY, range(age)));
	}
	if let Some(height) = predicate.height_cm.as_ref() {
		must.push(Condition::range(HEIGHT_KEY, range(height)));
	}

	if must.is_empty() { None } else { Some(Filter::must(must)) }
}

pub fn collect_candidates(collection: &str, points: &[ScoredPoint]) -> Vec<Candidate> {
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let Some(pid) = payload_string(&point.payload, PID_KEY) else {
			tracing::warn!(collection, "Candidate missing pid payload.");

			continue;
		};

		out.push(Candidate {
			pid,
			score: point.score,
			attributes: Attributes {
				gender: payload_string(&point.payload, GENDER_KEY),
				age: payload_u32(&point.payload, AGE_KEY),
				height_cm: payload_u32(&point.payload, HEIGHT_KEY),
			},
		});
	}

	out
}

fn range(bound: &RangeBound) -> Range {
	Range {
		gte: bound.min.map(f64::from),
		lte: bound.max.map(f64::from),
		..Default::default()
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) if !text.is_empty() => Some(text.to_string()),
		_ => None,
	}
}

fn payload_u32(payload: &HashMap<String, Value>, key: &str) -> Option<u32> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => u32::try_from(*value).ok(),
		Some(Kind::DoubleValue(value)) =>
			if value.fract() == 0.0 && *value >= 0.0 {
				u32::try_from(*value as i64).ok()
			} else {
				None
			},
		_ => None,
	}
}
