use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use idmatch_config::{Config, Error, HARD_MAX_TOP_N};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(0);

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn set(value: &mut Value, path: &[&str], new_value: Value) {
	let (last, parents) = path.split_last().expect("Path must be non-empty.");
	let mut table = value.as_table_mut().expect("Template config must be a table.");

	for key in parents {
		table = table
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{key}]."));
	}

	table.insert((*last).to_string(), new_value);
}

fn remove(value: &mut Value, key: &str) {
	value.as_table_mut().expect("Template config must be a table.").remove(key);
}

fn parse(value: &Value) -> idmatch_config::Result<Config> {
	let raw = toml::to_string(value).expect("Failed to render template config.");

	idmatch_config::parse(&raw)
}

fn expect_field(result: idmatch_config::Result<Config>, expected: &str) {
	match result {
		Err(Error::Validation { field, .. }) => assert_eq!(field, expected),
		Err(other) => panic!("Expected validation error for {expected}, got {other}."),
		Ok(_) => panic!("Expected validation error for {expected}."),
	}
}

fn write_temp_config(contents: &str) -> PathBuf {
	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
	let id = NEXT_FILE_ID.fetch_add(1, Ordering::SeqCst);
	let path = env::temp_dir().join(format!("idmatch_config_{nanos}_{id}.toml"));

	fs::write(&path, contents).expect("Failed to write temp config.");

	path
}

#[test]
fn sample_config_loads() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML);
	let cfg = idmatch_config::load(&path).expect("Sample config must load.");

	fs::remove_file(&path).ok();

	assert_eq!(cfg.storage.qdrant.face.vector_dim, 512);
	assert_eq!(cfg.storage.qdrant.text.vector_dim, 1_536);
	assert_eq!(cfg.search.default_top_n, 10);
	assert_eq!(cfg.confidence.very_high, 0.70);
	assert!(cfg.storage.postgres.is_some());
}

#[test]
fn blank_face_encoder_key_is_normalized_to_none() {
	let cfg = parse(&sample_value()).expect("Sample config must parse.");
	let face_encoder = cfg.providers.face_encoder.expect("Face encoder must be configured.");

	assert!(face_encoder.api_key.is_none());
}

#[test]
fn blank_postgres_dsn_disables_case_lookup() {
	let mut value = sample_value();

	set(&mut value, &["storage", "postgres", "dsn"], Value::String("  ".to_string()));

	let cfg = parse(&value).expect("Config must parse.");

	assert!(cfg.storage.postgres.is_none());
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let mut value = sample_value();

	remove(&mut value, "search");
	remove(&mut value, "confidence");
	remove(&mut value, "compare");

	let cfg = parse(&value).expect("Config must parse.");

	assert_eq!(cfg.search.max_top_n, HARD_MAX_TOP_N);
	assert_eq!(cfg.search.candidate_k, 50);
	assert_eq!(cfg.search.face_weight, 0.6);
	assert_eq!(cfg.search.text_weight, 0.4);
	assert_eq!(cfg.confidence.low, 0.40);
	assert_eq!(cfg.compare.match_threshold, 0.5);
}

#[test]
fn missing_config_file_reports_path() {
	let path = env::temp_dir().join("idmatch_config_does_not_exist.toml");
	let err = idmatch_config::load(&path).expect_err("Missing file must fail.");

	assert!(matches!(err, Error::ReadConfig { path: ref p, .. } if *p == path));
}

#[test]
fn max_top_n_is_capped() {
	let mut value = sample_value();

	set(&mut value, &["search", "max_top_n"], Value::Integer(i64::from(HARD_MAX_TOP_N) + 1));

	expect_field(parse(&value), "search.max_top_n");
}

#[test]
fn default_top_n_must_fit_under_max() {
	let mut value = sample_value();

	set(&mut value, &["search", "max_top_n"], Value::Integer(5));
	set(&mut value, &["search", "default_top_n"], Value::Integer(10));

	expect_field(parse(&value), "search.default_top_n");
}

#[test]
fn zero_weight_sum_is_rejected() {
	let mut value = sample_value();

	set(&mut value, &["search", "face_weight"], Value::Float(0.0));
	set(&mut value, &["search", "text_weight"], Value::Float(0.0));

	expect_field(parse(&value), "search");
}

#[test]
fn overflowing_weight_sum_is_rejected() {
	let mut value = sample_value();

	set(&mut value, &["search", "face_weight"], Value::Float(3.0e38));
	set(&mut value, &["search", "text_weight"], Value::Float(3.0e38));

	expect_field(parse(&value), "search");
}

#[test]
fn negative_weight_is_rejected() {
	let mut value = sample_value();

	set(&mut value, &["search", "text_weight"], Value::Float(-0.1));

	expect_field(parse(&value), "search.text_weight");
}

#[test]
fn confidence_bounds_must_descend() {
	let mut value = sample_value();

	set(&mut value, &["confidence", "high"], Value::Float(0.75));

	expect_field(parse(&value), "confidence.very_high");
}

#[test]
fn confidence_bounds_must_be_scores() {
	let mut value = sample_value();

	set(&mut value, &["confidence", "very_high"], Value::Float(1.5));

	expect_field(parse(&value), "confidence.very_high");
}

#[test]
fn text_dimensions_must_match_collection() {
	let mut value = sample_value();

	set(&mut value, &["providers", "text_embedding", "dimensions"], Value::Integer(768));

	expect_field(parse(&value), "providers.text_embedding.dimensions");
}

#[test]
fn face_dimensions_must_match_collection() {
	let mut value = sample_value();

	set(&mut value, &["providers", "face_encoder", "dimensions"], Value::Integer(128));

	expect_field(parse(&value), "providers.face_encoder.dimensions");
}

#[test]
fn collections_must_be_distinct() {
	let mut value = sample_value();

	set(
		&mut value,
		&["storage", "qdrant", "text", "name"],
		Value::String("face_embeddings".to_string()),
	);

	expect_field(parse(&value), "storage.qdrant");
}

#[test]
fn compare_threshold_must_be_a_score() {
	let mut value = sample_value();

	set(&mut value, &["compare", "match_threshold"], Value::Float(-0.2));

	expect_field(parse(&value), "compare.match_threshold");
}

#[test]
fn validation_error_names_the_field() {
	let mut value = sample_value();

	set(&mut value, &["search", "candidate_k"], Value::Integer(0));

	let err = parse(&value).expect_err("Zero candidate_k must fail.");

	assert_eq!(err.to_string(), "search.candidate_k must be greater than zero.");
}
