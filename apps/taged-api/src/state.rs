use std::sync::Arc;

use taged_service::TagedService;
use taged_storage::{cache::MemoryCache, db::Db, elasticsearch::ElasticsearchClient};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TagedService>,
}
impl AppState {
	pub async fn new(config: taged_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let search = ElasticsearchClient::new(&config.search)?;
		let cache = MemoryCache::with_capacity(config.cache.max_entries);
		let service = TagedService::new(config, Arc::new(search), Arc::new(cache), Arc::new(db));

		// The engine may come up after us; listings report it as unavailable until then.
		if let Err(err) = service.register_indexes().await {
			tracing::warn!(error = %err, "Failed to register search indexes.");
		}

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: TagedService) -> Self {
		Self { service: Arc::new(service) }
	}
}
