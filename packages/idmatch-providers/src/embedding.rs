use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// Calls an OpenAI-compatible embeddings endpoint and returns one vector per input text, in
/// input order.
pub async fn embed(
	cfg: &idmatch_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.iter().any(|text| text.trim().is_empty()) {
		return Err(eyre::eyre!("Cannot embed empty text."));
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(Some(&cfg.api_key), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json, cfg.dimensions as usize)?;

	if vectors.len() != texts.len() {
		return Err(eyre::eyre!(
			"Embedding provider returned {} vectors for {} inputs.",
			vectors.len(),
			texts.len()
		));
	}

	Ok(vectors)
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	index: Option<usize>,
	embedding: Vec<f32>,
}

/// Orders vectors by their reported `index`, falling back to response order.
fn parse_embedding_response(json: Value, dimensions: usize) -> Result<Vec<Vec<f32>>> {
	let response: EmbeddingResponse = serde_json::from_value(json)
		.map_err(|err| eyre::eyre!("Malformed embedding response: {err}."))?;
	let mut indexed = response
		.data
		.into_iter()
		.enumerate()
		.map(|(position, item)| (item.index.unwrap_or(position), item.embedding))
		.collect::<Vec<_>>();

	if let Some((_, vector)) = indexed.iter().find(|(_, vector)| vector.len() != dimensions) {
		return Err(eyre::eyre!(
			"Embedding has {} dimensions; expected {dimensions}.",
			vector.len()
		));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
