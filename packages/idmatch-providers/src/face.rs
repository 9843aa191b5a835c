//! Client for an external face-encoder service.
//!
//! The service receives a base64-encoded image and answers with the unit-normalized embedding of
//! the most prominent detected face: `{ "embedding": [f32; N] }`. When no face is detected it
//! answers with an error status or an empty embedding, both of which surface as errors here.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

pub async fn encode(cfg: &idmatch_config::FaceEncoderConfig, image: &[u8]) -> Result<Vec<f32>> {
	if image.is_empty() {
		return Err(eyre::eyre!("Cannot encode an empty image."));
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"image": STANDARD.encode(image),
		"normalize": true,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_face_response(json, cfg.dimensions as usize)
}

fn parse_face_response(json: Value, dimensions: usize) -> Result<Vec<f32>> {
	let embedding = json
		.get("embedding")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Face encoder response is missing embedding array."))?;

	if embedding.is_empty() {
		return Err(eyre::eyre!("No face detected in image."));
	}

	let vector = embedding
		.iter()
		.map(|value| {
			value
				.as_f64()
				.map(|number| number as f32)
				.ok_or_else(|| eyre::eyre!("Face embedding values must be numeric."))
		})
		.collect::<Result<Vec<_>>>()?;

	if vector.len() != dimensions {
		return Err(eyre::eyre!(
			"Face encoder returned {} dimensions, expected {dimensions}.",
			vector.len()
		));
	}

	Ok(vector)
}
