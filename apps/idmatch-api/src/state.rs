use std::sync::Arc;

use idmatch_service::MatchService;
use idmatch_storage::{cases::CaseStore, db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MatchService>,
}
impl AppState {
	pub async fn new(config: idmatch_config::Config) -> color_eyre::Result<Self> {
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let cases = match config.storage.postgres.as_ref() {
			Some(postgres) => Some(CaseStore::new(Db::connect(postgres).await?.pool)),
			None => {
				tracing::info!("No case store configured. Results will carry no case details.");

				None
			},
		};

		Ok(Self::from_service(MatchService::new(config, qdrant, cases)))
	}

	pub fn from_service(service: MatchService) -> Self {
		Self { service: Arc::new(service) }
	}
}
