//! Read-only lookups against the case tables kept by the record-keeping application.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CaseRecord {
	pub pid: String,
	/// `unidentified_body` or `missing_person`.
	pub record_type: String,
	pub status: Option<String>,
	pub name: Option<String>,
	pub police_station: Option<String>,
	pub reported_date: Option<String>,
	pub location: Option<String>,
	pub profile_photo: Option<String>,
}

#[derive(Clone)]
pub struct CaseStore {
	pool: PgPool,
}
impl CaseStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	pub async fn ping(&self) -> Result<()> {
		sqlx::query("SELECT 1").execute(&self.pool).await?;

		Ok(())
	}

	/// Looks up every PID in both case tables. Unidentified-body records take precedence when a
	/// PID exists in both. PIDs with no record are absent from the map.
	pub async fn fetch_many(&self, pids: &[String]) -> Result<HashMap<String, CaseRecord>> {
		if pids.is_empty() {
			return Ok(HashMap::new());
		}

		let rows: Vec<CaseRecord> = sqlx::query_as(
			"\
SELECT pid, record_type, status, name, police_station, reported_date, location, profile_photo
FROM (
	SELECT
		pid,
		'unidentified_body' AS record_type,
		status,
		NULL::text AS name,
		police_station,
		reported_date::text AS reported_date,
		found_address AS location,
		profile_photo,
		0 AS precedence
	FROM unidentified_bodies
	WHERE pid = ANY($1)
	UNION ALL
	SELECT
		pid,
		'missing_person' AS record_type,
		status,
		name,
		police_station,
		reported_date::text AS reported_date,
		last_seen_address AS location,
		profile_photo,
		1 AS precedence
	FROM missing_persons
	WHERE pid = ANY($1)
) AS cases
ORDER BY precedence",
		)
		.bind(pids)
		.fetch_all(&self.pool)
		.await?;

		Ok(first_per_pid(rows))
	}
}

fn first_per_pid(rows: Vec<CaseRecord>) -> HashMap<String, CaseRecord> {
	let mut out = HashMap::with_capacity(rows.len());

	for row in rows {
		out.entry(row.pid.clone()).or_insert(row);
	}

	out
}
