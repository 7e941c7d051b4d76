use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub mirror: MirrorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_backend")]
    pub backend: String, // "simulated"
    /// Transactions hidden from reads after they are mined
    #[serde(default)]
    pub read_lag: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MirrorConfig {
    #[serde(default = "default_mirror_backend")]
    pub backend: String, // "memory", "sqlite"
    pub sqlite_path: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_registry_backend(),
            read_lag: 0,
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            backend: default_mirror_backend(),
            sqlite_path: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    7230
}
fn default_registry_backend() -> String {
    "simulated".into()
}
fn default_mirror_backend() -> String {
    "memory".into()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Toml::file("chainshare-server.toml"))
            .merge(Env::prefixed("CHAINSHARE_").split("__"))
            .extract()?;
        Ok(config)
    }
}
