use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Redis connection URL. Ignored by the memory backend.
    pub url: String,
    /// Number of multiplexed redis connections.
    pub pool_size: usize,
    /// Lifetime of an upload-size entry. `0` disables expiry.
    pub ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the distribution registry that stores the bytes.
    pub url: String,
    /// Largest request or response body buffered by the forwarder.
    pub max_body_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectsConfig {
    /// Project names inserted on start-up if missing.
    pub seed: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub projects: ProjectsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("database.max_connections", 20)?
            .set_default("cache.backend", "redis")?
            .set_default("cache.url", "redis://localhost:6379")?
            .set_default("cache.pool_size", 4)?
            .set_default("cache.ttl_secs", 86_400)?
            .set_default("upstream.url", "http://127.0.0.1:5001")?
            .set_default("upstream.max_body_size", 512 * 1024 * 1024)?
            .set_default("projects.seed", vec!["library"])?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., REGISTRY__DATABASE__URL)
            .add_source(
                Environment::with_prefix("REGISTRY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("projects.seed")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
