use crate::config::Config;
use chainshare_access::{
    AccessContext, InMemoryMirror, MirrorStore, ResolutionCache, SimulatedContract, SqliteMirror,
};
use std::sync::Arc;

const DEFAULT_SQLITE_PATH: &str = "chainshare.db";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub access: Arc<AccessContext>,
    /// Handle on the in-process registry; reports the latest block and takes fault injection in tests
    pub contract: Arc<SimulatedContract>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let contract = match config.registry.backend.as_str() {
            "simulated" => Arc::new(SimulatedContract::new()),
            other => anyhow::bail!("Unknown registry backend: {other}"),
        };
        contract.set_read_lag(config.registry.read_lag);

        let mirror: Arc<dyn MirrorStore> = match config.mirror.backend.as_str() {
            "memory" => Arc::new(InMemoryMirror::new()),
            "sqlite" => {
                let path = config
                    .mirror
                    .sqlite_path
                    .as_deref()
                    .unwrap_or(DEFAULT_SQLITE_PATH);
                tracing::info!("Opening SQLite mirror at {}", path);
                Arc::new(SqliteMirror::open(path)?)
            }
            other => anyhow::bail!("Unknown mirror backend: {other}"),
        };

        let access = AccessContext::new(
            contract.clone(),
            mirror,
            Arc::new(ResolutionCache::new()),
        );

        Ok(Self {
            access: Arc::new(access),
            contract,
            config: Arc::new(config.clone()),
        })
    }
}
