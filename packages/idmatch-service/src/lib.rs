pub mod compare;
pub mod executor;
pub mod health;
pub mod rank;
pub mod search;

mod error;

pub use compare::{ClassifyRequest, ClassifyResponse, CompareRequest, CompareResponse};
pub use error::{ServiceError, ServiceResult};
pub use health::{ComponentStatus, HealthReport, HealthStatus};
pub use rank::{RankRequest, RankResponse};
pub use search::{SearchItem, SearchRequest, SearchResponse, TierSummary};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use color_eyre::eyre;

use idmatch_config::{Config, EmbeddingProviderConfig, FaceEncoderConfig};
use idmatch_domain::{confidence::ConfidenceThresholds, filter::Predicate, fusion::Candidate};
use idmatch_providers::{embedding, face};
use idmatch_storage::{
	cases::{CaseRecord, CaseStore},
	qdrant::{QdrantIndex, QdrantStore},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Nearest-neighbor lookup over one embedding collection.
///
/// Implementations return at most `limit` candidates satisfying `predicate`, best first.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		predicate: &'a Predicate,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>>;

	/// Checks that the index can serve lookups.
	fn ping(&self) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async { Ok(()) })
	}
}

pub trait TextEmbedder
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait FaceEncoder
where
	Self: Send + Sync,
{
	fn encode<'a>(
		&'a self,
		cfg: &'a FaceEncoderConfig,
		image: &'a [u8],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

/// Case-record lookup used to enrich ranked results.
pub trait CaseDirectory
where
	Self: Send + Sync,
{
	fn fetch_many<'a>(
		&'a self,
		pids: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<HashMap<String, CaseRecord>>>;

	fn ping(&self) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async { Ok(()) })
	}
}

#[derive(Clone)]
pub struct Indexes {
	pub face: Arc<dyn VectorIndex>,
	pub text: Arc<dyn VectorIndex>,
}
impl From<QdrantStore> for Indexes {
	fn from(store: QdrantStore) -> Self {
		Self { face: Arc::new(store.face), text: Arc::new(store.text) }
	}
}

#[derive(Clone)]
pub struct Providers {
	pub text_embedding: Arc<dyn TextEmbedder>,
	pub face_encoder: Arc<dyn FaceEncoder>,
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { text_embedding: provider.clone(), face_encoder: provider }
	}
}

pub struct MatchService {
	pub cfg: Config,
	pub indexes: Indexes,
	pub providers: Providers,
	pub cases: Option<Arc<dyn CaseDirectory>>,
	pub thresholds: ConfidenceThresholds,
}
impl MatchService {
	pub fn new(cfg: Config, qdrant: QdrantStore, cases: Option<CaseStore>) -> Self {
		Self::with_components(
			cfg,
			Indexes::from(qdrant),
			Providers::default(),
			cases.map(|store| Arc::new(store) as Arc<dyn CaseDirectory>),
		)
	}

	pub fn with_components(
		cfg: Config,
		indexes: Indexes,
		providers: Providers,
		cases: Option<Arc<dyn CaseDirectory>>,
	) -> Self {
		let thresholds = ConfidenceThresholds::from(&cfg.confidence);

		Self { cfg, indexes, providers, cases, thresholds }
	}
}

struct DefaultProviders;

impl TextEmbedder for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl FaceEncoder for DefaultProviders {
	fn encode<'a>(
		&'a self,
		cfg: &'a FaceEncoderConfig,
		image: &'a [u8],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(face::encode(cfg, image))
	}
}

impl VectorIndex for QdrantIndex {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		predicate: &'a Predicate,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Candidate>>> {
		Box::pin(async move { Ok(QdrantIndex::search(self, vector, predicate, limit).await?) })
	}

	fn ping(&self) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async move {
			if !self.collection_exists().await? {
				return Err(eyre::eyre!("Collection {} does not exist.", self.collection));
			}

			Ok(())
		})
	}
}

impl CaseDirectory for CaseStore {
	fn fetch_many<'a>(
		&'a self,
		pids: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<HashMap<String, CaseRecord>>> {
		Box::pin(async move { Ok(CaseStore::fetch_many(self, pids).await?) })
	}

	fn ping(&self) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async move { Ok(CaseStore::ping(self).await?) })
	}
}
