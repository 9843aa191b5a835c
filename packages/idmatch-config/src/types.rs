use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub confidence: Confidence,
	#[serde(default)]
	pub compare: Compare,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
	/// Optional. Case records are attached to search results only when configured.
	pub postgres: Option<Postgres>,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub face: Collection,
	pub text: Collection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
	pub name: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub text_embedding: EmbeddingProviderConfig,
	/// Optional. Without it, face search requires a precomputed embedding.
	pub face_encoder: Option<FaceEncoderConfig>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct FaceEncoderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: Option<String>,
	pub path: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_top_n: u32,
	pub max_top_n: u32,
	/// Per-modality nearest-neighbor limit.
	pub candidate_k: u32,
	pub face_weight: f32,
	pub text_weight: f32,
	pub query_timeout_ms: u64,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_top_n: 10,
			max_top_n: 50,
			candidate_k: 50,
			face_weight: 0.6,
			text_weight: 0.4,
			query_timeout_ms: 10_000,
		}
	}
}

/// Exclusive lower bounds of each tier. A score must be strictly greater than a bound to reach
/// its tier.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Confidence {
	pub very_high: f32,
	pub high: f32,
	pub medium: f32,
	pub low: f32,
}
impl Confidence {
	pub const DEFAULT: Self = Self { very_high: 0.70, high: 0.60, medium: 0.50, low: 0.40 };
}
impl Default for Confidence {
	fn default() -> Self {
		Self::DEFAULT
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Compare {
	pub match_threshold: f32,
}
impl Default for Compare {
	fn default() -> Self {
		Self { match_threshold: 0.5 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
