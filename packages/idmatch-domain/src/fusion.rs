//! Weighted late fusion of the face and text candidate lists.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, filter::Attributes};

/// One of the two embedding spaces. Vectors of different modalities are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
	Face,
	Text,
}
impl Modality {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Face => "face",
			Self::Text => "text",
		}
	}
}
impl std::fmt::Display for Modality {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One hit returned by a single modality's nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub pid: String,
	pub score: f32,
	pub attributes: Attributes,
}

/// Raw, caller-supplied modality weights. Only their ratio matters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityWeights {
	pub face: f32,
	pub text: f32,
}
impl ModalityWeights {
	pub fn new(face: f32, text: f32) -> Self {
		Self { face, text }
	}

	/// Returns `(face, text)` scaled to sum to one.
	pub fn normalize(self) -> Result<(f32, f32)> {
		for (label, weight) in [("face", self.face), ("text", self.text)] {
			if !weight.is_finite() {
				return Err(Error::InvalidWeight {
					message: format!("{label} weight must be a finite number."),
				});
			}
			if weight < 0.0 {
				return Err(Error::InvalidWeight {
					message: format!("{label} weight must be zero or greater."),
				});
			}
		}

		let total = self.face + self.text;

		if total <= 0.0 {
			return Err(Error::InvalidWeight {
				message: "face and text weights must not sum to zero.".to_string(),
			});
		}
		if !total.is_finite() {
			return Err(Error::InvalidWeight {
				message: "face and text weights must sum to a finite number.".to_string(),
			});
		}

		Ok((self.face / total, self.text / total))
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
	pub pid: String,
	pub combined_score: f32,
	/// Zero when the face lookup was skipped or did not return this record.
	pub face_score: f32,
	/// Zero when the text lookup was skipped or did not return this record.
	pub text_score: f32,
	pub attributes: Attributes,
	/// Set when the two indexes disagree on the record's payload. The face payload is kept.
	pub payload_conflict: bool,
}

#[derive(Debug)]
struct Merged {
	face_score: f32,
	text_score: f32,
	attributes: Attributes,
	seen_face: bool,
	payload_conflict: bool,
}

/// Merges both candidate lists on record identity and ranks them by the weighted sum of their
/// per-modality scores.
///
/// A record seen by only one modality scores zero for the other. Weights are not renormalized
/// when one list is empty. Ties on the combined score are ordered by ascending identifier, so the
/// output depends on nothing but the inputs.
pub fn fuse(
	face: &[Candidate],
	text: &[Candidate],
	weights: ModalityWeights,
	top_n: usize,
) -> Result<Vec<FusedResult>> {
	let (face_weight, text_weight) = weights.normalize()?;
	let mut merged: BTreeMap<&str, Merged> = BTreeMap::new();

	for candidate in face {
		let entry = merged.entry(candidate.pid.as_str()).or_insert_with(|| Merged {
			face_score: candidate.score,
			text_score: 0.0,
			attributes: candidate.attributes.clone(),
			seen_face: true,
			payload_conflict: false,
		});

		entry.face_score = entry.face_score.max(candidate.score);
	}
	for candidate in text {
		match merged.get_mut(candidate.pid.as_str()) {
			Some(entry) => {
				entry.text_score = entry.text_score.max(candidate.score);

				if entry.seen_face && entry.attributes != candidate.attributes {
					entry.payload_conflict = true;
				}
			},
			None => {
				merged.insert(candidate.pid.as_str(), Merged {
					face_score: 0.0,
					text_score: candidate.score,
					attributes: candidate.attributes.clone(),
					seen_face: false,
					payload_conflict: false,
				});
			},
		}
	}

	let mut results = merged
		.into_iter()
		.map(|(pid, entry)| FusedResult {
			pid: pid.to_string(),
			combined_score: face_weight * entry.face_score + text_weight * entry.text_score,
			face_score: entry.face_score,
			text_score: entry.text_score,
			attributes: entry.attributes,
			payload_conflict: entry.payload_conflict,
		})
		.collect::<Vec<_>>();

	results.sort_by(|a, b| {
		cmp_f32_desc(a.combined_score, b.combined_score).then_with(|| a.pid.cmp(&b.pid))
	});
	results.truncate(top_n);

	Ok(results)
}

/// Descending order with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
