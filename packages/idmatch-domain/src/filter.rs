//! Attribute filters shared by both nearest-neighbor lookups.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Loosely specified attributes of the person being searched for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeFilter {
	pub gender: Option<String>,
	pub age_min: Option<u32>,
	pub age_max: Option<u32>,
	pub height_min: Option<u32>,
	pub height_max: Option<u32>,
}

/// Display payload stored next to each indexed vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
	pub gender: Option<String>,
	pub age: Option<u32>,
	pub height_cm: Option<u32>,
}

/// Inclusive bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeBound {
	pub min: Option<u32>,
	pub max: Option<u32>,
}
impl RangeBound {
	fn new(field: &str, min: Option<u32>, max: Option<u32>) -> Result<Option<Self>> {
		match (min, max) {
			(None, None) => Ok(None),
			(Some(min), Some(max)) if min > max => Err(Error::InvalidFilter {
				message: format!("{field}_min ({min}) is greater than {field}_max ({max})."),
			}),
			_ => Ok(Some(Self { min, max })),
		}
	}

	pub fn contains(&self, value: u32) -> bool {
		self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
	}
}

/// The translated filter handed to each index. Clauses are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
	pub gender: Option<String>,
	pub age: Option<RangeBound>,
	pub height_cm: Option<RangeBound>,
}
impl Predicate {
	pub fn accepts_all(&self) -> bool {
		self.gender.is_none() && self.age.is_none() && self.height_cm.is_none()
	}

	/// Evaluates the predicate against a payload. A record missing a constrained attribute does
	/// not match, mirroring how the index treats absent payload keys.
	pub fn matches(&self, attributes: &Attributes) -> bool {
		if let Some(gender) = self.gender.as_deref()
			&& attributes.gender.as_deref() != Some(gender)
		{
			return false;
		}

		range_matches(self.age.as_ref(), attributes.age)
			&& range_matches(self.height_cm.as_ref(), attributes.height_cm)
	}
}

/// Builds the index predicate for an attribute filter.
///
/// Gender is compared exactly, with no case folding. A blank gender counts as not supplied.
/// Contradictory ranges are rejected instead of silently producing an empty result.
pub fn translate(filter: &AttributeFilter) -> Result<Predicate> {
	let gender =
		filter.gender.as_deref().filter(|value| !value.trim().is_empty()).map(str::to_string);
	let age = RangeBound::new("age", filter.age_min, filter.age_max)?;
	let height_cm = RangeBound::new("height", filter.height_min, filter.height_max)?;

	Ok(Predicate { gender, age, height_cm })
}

fn range_matches(bound: Option<&RangeBound>, value: Option<u32>) -> bool {
	match (bound, value) {
		(None, _) => true,
		(Some(bound), Some(value)) => bound.contains(value),
		(Some(_), None) => false,
	}
}
