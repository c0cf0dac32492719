use crate::config::Config;
use crate::db::DbPool;
use crate::pdf::forms::Renderers;
use crate::storage::FsBlobStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub blobs: Arc<FsBlobStore>,
    pub renderers: Arc<Renderers>,
}
