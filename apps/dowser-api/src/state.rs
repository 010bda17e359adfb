use std::sync::Arc;

use dowser_service::DowserService;
use dowser_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<DowserService>,
}
impl AppState {
	pub async fn new(config: dowser_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.sqlite).await?;

		db.ensure_schema().await?;

		let service = DowserService::new(config, db);

		Ok(Self { service: Arc::new(service) })
	}
}
