use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::platform::{BlobStore, FsBlobStore, SqliteAccountService, SqliteDocumentStore};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: Config,
}

impl AppState {
    /// Wire the SQLite/filesystem platform services and the orchestrator from config.
    pub fn build(config: Config, pool: DbPool) -> anyhow::Result<Self> {
        let public_url = url::Url::parse(&config.platform.public_url)?;

        let accounts = Arc::new(SqliteAccountService::new(
            pool.clone(),
            config.auth.session_hours,
            config.auth.bcrypt_cost,
        ));
        let documents = Arc::new(SqliteDocumentStore::new(pool.clone()));
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
            pool,
            config.uploads_path(),
            public_url.clone(),
            config.storage.max_file_bytes,
        ));

        let orchestrator = Orchestrator::new(
            accounts,
            documents,
            blobs.clone(),
            config.platform.ids(),
            public_url,
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            blobs,
            config,
        })
    }
}
