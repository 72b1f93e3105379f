use std::sync::Arc;

use crate::auth::token::TokenMaker;
use crate::config::Config;
use crate::db::Store;
use crate::search::JobIndex;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    /// Elasticsearch when configured, otherwise the in-process index.
    pub index: Arc<dyn JobIndex>,
    pub tokens: Arc<dyn TokenMaker>,
    pub config: Config,
}

#[cfg(test)]
impl AppState {
    pub fn for_tests() -> Self {
        use crate::auth::token::JwtMaker;
        use crate::db::memory::MemoryQueries;
        use crate::search::MemoryJobIndex;

        let config = Config::for_tests();
        AppState {
            store: Store::new(Arc::new(MemoryQueries::new())),
            index: Arc::new(MemoryJobIndex::new()),
            tokens: Arc::new(
                JwtMaker::new(&config.token_symmetric_key).expect("test key is long enough"),
            ),
            config,
        }
    }
}
