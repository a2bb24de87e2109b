use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading `EngineConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Every knob named in the configuration table, with the documented
/// defaults. Loaded from an optional TOML file layered with environment
/// variable overrides under the `FEDRETRIEVE_` prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_embedding_dimension")]
    pub embedding_dimension: usize,

    #[serde(default = "EngineConfig::default_alpha")]
    pub default_alpha: f32,
    #[serde(default = "EngineConfig::default_min_alpha")]
    pub min_alpha: f32,
    #[serde(default = "EngineConfig::default_max_alpha")]
    pub max_alpha: f32,

    #[serde(default = "EngineConfig::default_max_k_total")]
    pub max_k_total: usize,

    #[serde(default = "EngineConfig::default_rrf_k_parameter")]
    pub rrf_k_parameter: u32,
    #[serde(default = "EngineConfig::default_external_boost")]
    pub external_boost: f32,

    #[serde(default = "EngineConfig::default_centroid_ttl_secs")]
    pub centroid_ttl_secs: u64,
    #[serde(default = "EngineConfig::default_centroid_cache_ttl_secs")]
    pub centroid_cache_ttl_secs: u64,
    #[serde(default = "EngineConfig::default_centroid_cache_max_entries")]
    pub centroid_cache_max_entries: usize,

    #[serde(default = "EngineConfig::default_min_vectors_for_centroid")]
    pub min_vectors_for_centroid: u64,
    #[serde(default = "EngineConfig::default_max_vectors_for_centroid")]
    pub max_vectors_for_centroid: u64,
    #[serde(default = "EngineConfig::default_centroid_build_batch_size")]
    pub centroid_build_batch_size: usize,

    #[serde(default = "EngineConfig::default_request_deadline_ms")]
    pub request_deadline_ms: u64,

    #[serde(default = "EngineConfig::default_max_concurrent_source_calls")]
    pub max_concurrent_source_calls: usize,
}

impl EngineConfig {
    fn default_embedding_dimension() -> usize {
        384
    }
    fn default_alpha() -> f32 {
        0.25
    }
    fn default_min_alpha() -> f32 {
        0.0
    }
    fn default_max_alpha() -> f32 {
        1.0
    }
    fn default_max_k_total() -> usize {
        100
    }
    fn default_rrf_k_parameter() -> u32 {
        60
    }
    fn default_external_boost() -> f32 {
        1.2
    }
    fn default_centroid_ttl_secs() -> u64 {
        60 * 60 * 24 * 7
    }
    fn default_centroid_cache_ttl_secs() -> u64 {
        300
    }
    fn default_centroid_cache_max_entries() -> usize {
        10_000
    }
    fn default_min_vectors_for_centroid() -> u64 {
        10
    }
    fn default_max_vectors_for_centroid() -> u64 {
        10_000
    }
    fn default_centroid_build_batch_size() -> usize {
        1_000
    }
    fn default_request_deadline_ms() -> u64 {
        2_000
    }
    fn default_max_concurrent_source_calls() -> usize {
        2 * num_cpus::get()
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }

    pub fn centroid_ttl(&self) -> Duration {
        Duration::from_secs(self.centroid_ttl_secs)
    }

    pub fn centroid_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.centroid_cache_ttl_secs)
    }

    /// Loads configuration from an optional TOML file plus environment
    /// variable overrides (`FEDRETRIEVE_EMBEDDING_DIMENSION`, etc.), falling
    /// back entirely to documented defaults when neither is present.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("FEDRETRIEVE")
                .separator("_")
                .try_parsing(true),
        );
        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: Self::default_embedding_dimension(),
            default_alpha: Self::default_alpha(),
            min_alpha: Self::default_min_alpha(),
            max_alpha: Self::default_max_alpha(),
            max_k_total: Self::default_max_k_total(),
            rrf_k_parameter: Self::default_rrf_k_parameter(),
            external_boost: Self::default_external_boost(),
            centroid_ttl_secs: Self::default_centroid_ttl_secs(),
            centroid_cache_ttl_secs: Self::default_centroid_cache_ttl_secs(),
            centroid_cache_max_entries: Self::default_centroid_cache_max_entries(),
            min_vectors_for_centroid: Self::default_min_vectors_for_centroid(),
            max_vectors_for_centroid: Self::default_max_vectors_for_centroid(),
            centroid_build_batch_size: Self::default_centroid_build_batch_size(),
            request_deadline_ms: Self::default_request_deadline_ms(),
            max_concurrent_source_calls: Self::default_max_concurrent_source_calls(),
        }
    }
}
