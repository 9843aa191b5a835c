mod error;

pub use error::{Error, Result};

use std::{collections::HashSet, env, thread, time::Duration};

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder, VectorParamsBuilder,
	},
};
use serde_json::Value;
use tokio::{runtime::Builder, time};
use uuid::Uuid;

/// A point to seed into a test collection.
pub struct SeedPoint {
	pub vector: Vec<f32>,
	pub payload: Value,
}

/// Throwaway face and text collections on a live Qdrant, deleted on cleanup or drop.
pub struct TestCollections {
	client: Qdrant,
	url: String,
	pub face: String,
	pub text: String,
	pub face_dim: u32,
	pub text_dim: u32,
	cleaned: bool,
}
impl TestCollections {
	pub async fn new(url: &str, face_dim: u32, text_dim: u32) -> Result<Self> {
		let client = Qdrant::from_url(url).build()?;
		let suffix = Uuid::new_v4().simple();
		let face = format!("idmatch_test_face_{suffix}");
		let text = format!("idmatch_test_text_{suffix}");

		for (name, dim) in [(&face, face_dim), (&text, text_dim)] {
			client
				.create_collection(
					CreateCollectionBuilder::new(name.clone())
						.vectors_config(VectorParamsBuilder::new(u64::from(dim), Distance::Cosine)),
				)
				.await?;
		}

		Ok(Self {
			client,
			url: url.to_string(),
			face,
			text,
			face_dim,
			text_dim,
			cleaned: false,
		})
	}

	pub async fn seed(&self, collection: &str, points: Vec<SeedPoint>) -> Result<()> {
		let mut structs = Vec::with_capacity(points.len());

		for (id, point) in points.into_iter().enumerate() {
			let payload = Payload::try_from(point.payload)
				.map_err(|err| Error::Message(format!("Invalid seed payload: {err}.")))?;

			structs.push(PointStruct::new(id as u64, point.vector, payload));
		}

		self.client.upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true)).await?;

		Ok(())
	}

	pub async fn cleanup(mut self) -> Result<()> {
		let names = [self.face.clone(), self.text.clone()];

		self.cleaned = true;

		delete_collections(&self.client, &names).await
	}
}
impl Drop for TestCollections {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let url = self.url.clone();
		let names = [self.face.clone(), self.text.clone()];
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test collection cleanup failed: {err}.");

					return;
				},
			};
			let result = runtime.block_on(async {
				let client = Qdrant::from_url(&url).build()?;

				delete_collections(&client, &names).await
			});

			if let Err(err) = result {
				eprintln!("Test collection cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("IDMATCH_QDRANT_URL").ok()
}

pub fn env_pg_dsn() -> Option<String> {
	env::var("IDMATCH_PG_DSN").ok()
}

/// A unit vector along `axis`, optionally tilted toward `axis + 1` by `tilt`.
pub fn unit_vector(dim: u32, axis: usize, tilt: f32) -> Vec<f32> {
	let mut vector = vec![0.0; dim as usize];
	let next = (axis + 1) % vector.len();

	vector[axis] = 1.0;
	vector[next] += tilt;

	let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

	vector.iter().map(|v| v / norm).collect()
}

async fn delete_collections(client: &Qdrant, collections: &[String]) -> Result<()> {
	let max_attempts = 6;
	let mut remaining = collections.iter().cloned().collect::<HashSet<_>>();
	let mut backoff = Duration::from_millis(100);

	for attempt in 1..=max_attempts {
		let existing = time::timeout(Duration::from_secs(10), client.list_collections())
			.await
			.map_err(|_| Error::Message("Qdrant list_collections timed out.".to_string()))??;
		let existing = existing.collections.into_iter().map(|c| c.name).collect::<HashSet<_>>();

		remaining.retain(|collection| existing.contains(collection));

		if remaining.is_empty() {
			return Ok(());
		}

		for collection in remaining.iter() {
			let deleted = matches!(
				time::timeout(Duration::from_secs(10), client.delete_collection(collection.clone()))
					.await,
				Ok(Ok(_))
			);

			if !deleted && attempt == max_attempts {
				return Err(Error::Message(format!(
					"Failed to delete Qdrant collection {collection:?} after {attempt} attempts."
				)));
			}
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
	}

	Ok(())
}
