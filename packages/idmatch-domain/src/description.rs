//! Free-text rendering of structured person attributes, fed to the text embedder.

use serde::{Deserialize, Serialize};

const MAX_PARTS: usize = 15;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonDescription {
	pub gender: Option<String>,
	pub age: Option<u32>,
	pub height_cm: Option<u32>,
	pub build: Option<String>,
	pub complexion: Option<String>,
	pub face_shape: Option<String>,
	pub hair_color: Option<String>,
	pub eye_color: Option<String>,
	pub distinguishing_marks: Option<String>,
	pub distinctive_features: Option<String>,
	pub clothing: Option<String>,
	pub location: Option<String>,
	pub person_description: Option<String>,
}
/// Returns `None` when no attribute carries any text.
pub fn describe(person: &PersonDescription) -> Option<String> {
	let mut parts = Vec::new();

	if let Some(gender) = non_blank(&person.gender) {
		parts.push(gender.to_string());
	}
	if let Some(age) = person.age.filter(|age| *age > 0) {
		parts.push(format!("{age} years old"));
	}
	if let Some(height_cm) = person.height_cm.filter(|height| *height > 0) {
		parts.push(format!("{height_cm}cm tall"));
	}

	push_with(&mut parts, &person.build, |v| format!("{v} build"));
	push_with(&mut parts, &person.complexion, |v| format!("{v} complexion"));
	push_with(&mut parts, &person.face_shape, |v| format!("{v} face"));
	push_with(&mut parts, &person.hair_color, |v| format!("{v} hair"));
	push_with(&mut parts, &person.eye_color, |v| format!("{v} eyes"));
	push_with(&mut parts, &person.distinguishing_marks, |v| format!("Marks: {v}"));
	push_with(&mut parts, &person.distinctive_features, str::to_string);
	push_with(&mut parts, &person.clothing, |v| format!("Clothing: {v}"));
	push_with(&mut parts, &person.location, |v| format!("Location: {v}"));
	push_with(&mut parts, &person.person_description, str::to_string);

	if parts.is_empty() {
		return None;
	}

	parts.truncate(MAX_PARTS);

	Some(format!("{}.", parts.join(". ")))
}

fn push_with(parts: &mut Vec<String>, value: &Option<String>, render: impl Fn(&str) -> String) {
	if let Some(value) = non_blank(value) {
		parts.push(render(value));
	}
}

fn non_blank(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
