//! Dependency health for the `/health` endpoint.

use std::time::Duration;

use serde::Serialize;
use tokio::time;

use crate::{BoxFuture, MatchService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
	Healthy,
	Unhealthy,
	NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	/// At least one configured dependency failed its check.
	Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
	pub status: HealthStatus,
	pub face_index: ComponentStatus,
	pub text_index: ComponentStatus,
	pub case_store: ComponentStatus,
	/// Configuration only. The encoder is not called.
	pub face_encoder_configured: bool,
}

impl MatchService {
	/// Pings every configured dependency concurrently, each bounded by `search.query_timeout_ms`.
	///
	/// Never fails: an unreachable dependency shows up as [`ComponentStatus::Unhealthy`] and turns
	/// the overall status into [`HealthStatus::Degraded`].
	pub async fn health(&self) -> HealthReport {
		let timeout = Duration::from_millis(self.cfg.search.query_timeout_ms);
		let case_store = async {
			match self.cases.as_ref() {
				Some(cases) => check("case_store", timeout, cases.ping()).await,
				None => ComponentStatus::NotConfigured,
			}
		};
		let (face_index, text_index, case_store) = tokio::join!(
			check("face_index", timeout, self.indexes.face.ping()),
			check("text_index", timeout, self.indexes.text.ping()),
			case_store,
		);
		let status = if [face_index, text_index, case_store].contains(&ComponentStatus::Unhealthy) {
			HealthStatus::Degraded
		} else {
			HealthStatus::Healthy
		};

		HealthReport {
			status,
			face_index,
			text_index,
			case_store,
			face_encoder_configured: self.cfg.providers.face_encoder.is_some(),
		}
	}
}

async fn check(
	component: &'static str,
	timeout: Duration,
	ping: BoxFuture<'_, color_eyre::Result<()>>,
) -> ComponentStatus {
	match time::timeout(timeout, ping).await {
		Ok(Ok(())) => ComponentStatus::Healthy,
		Ok(Err(err)) => {
			tracing::warn!(component, error = %err, "Health check failed.");

			ComponentStatus::Unhealthy
		},
		Err(_) => {
			tracing::warn!(
				component,
				timeout_ms = timeout.as_millis() as u64,
				"Health check timed out."
			);

			ComponentStatus::Unhealthy
		},
	}
}
