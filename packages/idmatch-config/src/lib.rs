mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Collection, Compare, Confidence, Config, EmbeddingProviderConfig, FaceEncoderConfig, Postgres,
	Providers, Qdrant, Search, Service, Storage,
};

use std::{fs, path::Path};

/// Upper bound on `search.max_top_n`; requests can never return more fused results than this.
pub const HARD_MAX_TOP_N: u32 = 50;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::invalid("service.http_bind", "must be non-empty."));
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::invalid("storage.qdrant.url", "must be non-empty."));
	}

	for (field, collection) in [
		("storage.qdrant.face", &cfg.storage.qdrant.face),
		("storage.qdrant.text", &cfg.storage.qdrant.text),
	] {
		if collection.name.trim().is_empty() {
			return Err(Error::invalid(field, "name must be non-empty."));
		}
		if collection.vector_dim == 0 {
			return Err(Error::invalid(field, "vector_dim must be greater than zero."));
		}
	}

	if cfg.storage.qdrant.face.name == cfg.storage.qdrant.text.name {
		return Err(Error::invalid(
			"storage.qdrant",
			"face and text collections must be distinct.",
		));
	}
	if let Some(postgres) = cfg.storage.postgres.as_ref()
		&& postgres.pool_max_conns == 0
	{
		return Err(Error::invalid("storage.postgres.pool_max_conns", "must be greater than zero."));
	}

	let text_embedding = &cfg.providers.text_embedding;

	if text_embedding.api_key.trim().is_empty() {
		return Err(Error::invalid("providers.text_embedding.api_key", "must be non-empty."));
	}
	if text_embedding.dimensions != cfg.storage.qdrant.text.vector_dim {
		return Err(Error::invalid(
			"providers.text_embedding.dimensions",
			"must match storage.qdrant.text.vector_dim.",
		));
	}
	if let Some(face_encoder) = cfg.providers.face_encoder.as_ref()
		&& face_encoder.dimensions != cfg.storage.qdrant.face.vector_dim
	{
		return Err(Error::invalid(
			"providers.face_encoder.dimensions",
			"must match storage.qdrant.face.vector_dim.",
		));
	}

	validate_search(&cfg.search)?;
	validate_confidence(&cfg.confidence)?;

	if !cfg.compare.match_threshold.is_finite()
		|| !(0.0..=1.0).contains(&cfg.compare.match_threshold)
	{
		return Err(Error::invalid("compare.match_threshold", "must be in the range 0.0-1.0."));
	}

	Ok(())
}

fn validate_search(search: &Search) -> Result<()> {
	if search.max_top_n == 0 || search.max_top_n > HARD_MAX_TOP_N {
		return Err(Error::invalid(
			"search.max_top_n",
			format!("must be in the range 1-{HARD_MAX_TOP_N}."),
		));
	}
	if search.default_top_n == 0 || search.default_top_n > search.max_top_n {
		return Err(Error::invalid(
			"search.default_top_n",
			"must be greater than zero and at most search.max_top_n.",
		));
	}
	if search.candidate_k == 0 {
		return Err(Error::invalid("search.candidate_k", "must be greater than zero."));
	}

	for (field, weight) in
		[("search.face_weight", search.face_weight), ("search.text_weight", search.text_weight)]
	{
		if !weight.is_finite() {
			return Err(Error::invalid(field, "must be a finite number."));
		}
		if weight < 0.0 {
			return Err(Error::invalid(field, "must be zero or greater."));
		}
	}

	if search.face_weight + search.text_weight <= 0.0 {
		return Err(Error::invalid(
			"search",
			"face_weight and text_weight must not both be zero.",
		));
	}
	if !(search.face_weight + search.text_weight).is_finite() {
		return Err(Error::invalid(
			"search",
			"face_weight and text_weight must sum to a finite number.",
		));
	}
	if search.query_timeout_ms == 0 {
		return Err(Error::invalid("search.query_timeout_ms", "must be greater than zero."));
	}

	Ok(())
}

fn validate_confidence(confidence: &Confidence) -> Result<()> {
	let bounds = [
		("confidence.very_high", confidence.very_high),
		("confidence.high", confidence.high),
		("confidence.medium", confidence.medium),
		("confidence.low", confidence.low),
	];

	for (field, bound) in bounds {
		if !bound.is_finite() || !(0.0..=1.0).contains(&bound) {
			return Err(Error::invalid(field, "must be in the range 0.0-1.0."));
		}
	}
	for pair in bounds.windows(2) {
		let (upper_field, upper) = pair[0];
		let (_, lower) = pair[1];

		if upper <= lower {
			return Err(Error::invalid(
				upper_field,
				"must be greater than the next lower tier bound.",
			));
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if let Some(face_encoder) = cfg.providers.face_encoder.as_mut()
		&& face_encoder.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		face_encoder.api_key = None;
	}
	if cfg.storage.postgres.as_ref().map(|pg| pg.dsn.trim().is_empty()).unwrap_or(false) {
		cfg.storage.postgres = None;
	}
}
