use serde::{Deserialize, Serialize};

/// Review tiers, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
	VeryHigh,
	High,
	Medium,
	Low,
	None,
}
impl ConfidenceTier {
	pub const ALL: [Self; 5] = [Self::VeryHigh, Self::High, Self::Medium, Self::Low, Self::None];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::VeryHigh => "very_high",
			Self::High => "high",
			Self::Medium => "medium",
			Self::Low => "low",
			Self::None => "none",
		}
	}
}

/// Exclusive lower bound of each tier; anything at or below `low` is [`ConfidenceTier::None`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
	pub very_high: f32,
	pub high: f32,
	pub medium: f32,
	pub low: f32,
}
impl ConfidenceThresholds {
	pub const DEFAULT: Self = Self::from_config(&idmatch_config::Confidence::DEFAULT);

	pub const fn from_config(cfg: &idmatch_config::Confidence) -> Self {
		Self { very_high: cfg.very_high, high: cfg.high, medium: cfg.medium, low: cfg.low }
	}

	/// Total over all inputs: scores are clamped into `[0, 1]` first and NaN counts as zero.
	pub fn classify(&self, score: f32) -> ConfidenceTier {
		let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };

		if score > self.very_high {
			ConfidenceTier::VeryHigh
		} else if score > self.high {
			ConfidenceTier::High
		} else if score > self.medium {
			ConfidenceTier::Medium
		} else if score > self.low {
			ConfidenceTier::Low
		} else {
			ConfidenceTier::None
		}
	}
}
impl Default for ConfidenceThresholds {
	fn default() -> Self {
		Self::DEFAULT
	}
}
impl From<&idmatch_config::Confidence> for ConfidenceThresholds {
	fn from(cfg: &idmatch_config::Confidence) -> Self {
		Self::from_config(cfg)
	}
}

/// Classifies with the default thresholds.
pub fn classify(score: f32) -> ConfidenceTier {
	ConfidenceThresholds::DEFAULT.classify(score)
}

/// Percentage rounded to two decimals, as shown to reviewers.
pub fn confidence_percentage(score: f32) -> f64 {
	(f64::from(score) * 100.0 * 100.0).round() / 100.0
}
