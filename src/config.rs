//! Engine configuration with validation, presets and environment overrides

use crate::errors::{BookResult, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub report: ReportConfig,
    pub aggregation: AggregationConfig,
    pub logging: LoggingConfig,
}

/// Outcome book memoization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Books kept before least recently used ones are evicted
    pub capacity: usize,
    /// Entry lifetime; 0 keeps books until evicted or invalidated
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            ttl_seconds: 0,
        }
    }
}

/// Default page sizes of the report views
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Profit/loss view
    pub outcome_page_size: usize,
    /// Comprehensive stake book
    pub book_page_size: usize,
    pub client_page_size: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            outcome_page_size: 100,
            book_page_size: 50,
            client_page_size: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Bet count above which the fold is split across threads
    pub parallel_threshold: usize,
    pub partitions: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 5_000,
            partitions: 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Large draws: wide cache, aggressive partitioning
    pub fn high_volume() -> Self {
        Self {
            cache: CacheConfig {
                capacity: 512,
                ttl_seconds: 300,
            },
            aggregation: AggregationConfig {
                parallel_threshold: 1_000,
                partitions: 32,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                json: true,
            },
            ..Self::default()
        }
    }

    /// Small pages and a tiny cache so paging and eviction paths get hit
    pub fn testing() -> Self {
        Self {
            cache: CacheConfig {
                capacity: 4,
                ttl_seconds: 0,
            },
            report: ReportConfig {
                outcome_page_size: 10,
                book_page_size: 10,
                client_page_size: 5,
            },
            aggregation: AggregationConfig {
                parallel_threshold: 16,
                partitions: 4,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let non_zero = [
            ("cache.capacity", self.cache.capacity),
            ("report.outcome_page_size", self.report.outcome_page_size),
            ("report.book_page_size", self.report.book_page_size),
            ("report.client_page_size", self.report.client_page_size),
            ("aggregation.partitions", self.aggregation.partitions),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigurationError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("logging.level".to_string()));
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache.ttl_seconds > 0).then(|| Duration::from_secs(self.cache.ttl_seconds))
    }
}

/// Loads `EngineConfig` from TOML and `DRAWBOOK_*` environment variables
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// File (or defaults), then environment, then validation
    pub fn load(&self) -> BookResult<EngineConfig> {
        let mut config = match &self.config_path {
            Some(path) => self.load_from_file(path)?,
            None => EngineConfig::default(),
        };
        apply_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(&self, path: &Path) -> BookResult<EngineConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, config: &EngineConfig, path: P) -> BookResult<()> {
        let path = path.as_ref();
        let body = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, body).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path.display(), e))
                .into()
        })
    }
}

fn parse_var<T: FromStr>(key: &str, value: String, reason: &str) -> Result<T, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        field: key.to_string(),
        value,
        reason: reason.to_string(),
    })
}

/// Apply `DRAWBOOK_*` overrides read through `lookup`
pub fn apply_overrides<F>(config: &mut EngineConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DRAWBOOK_CACHE_CAPACITY") {
        config.cache.capacity = parse_var("DRAWBOOK_CACHE_CAPACITY", v, "Invalid capacity")?;
    }
    if let Some(v) = lookup("DRAWBOOK_CACHE_TTL_SECONDS") {
        config.cache.ttl_seconds = parse_var("DRAWBOOK_CACHE_TTL_SECONDS", v, "Invalid number of seconds")?;
    }
    if let Some(v) = lookup("DRAWBOOK_OUTCOME_PAGE_SIZE") {
        config.report.outcome_page_size = parse_var("DRAWBOOK_OUTCOME_PAGE_SIZE", v, "Invalid page size")?;
    }
    if let Some(v) = lookup("DRAWBOOK_BOOK_PAGE_SIZE") {
        config.report.book_page_size = parse_var("DRAWBOOK_BOOK_PAGE_SIZE", v, "Invalid page size")?;
    }
    if let Some(v) = lookup("DRAWBOOK_CLIENT_PAGE_SIZE") {
        config.report.client_page_size = parse_var("DRAWBOOK_CLIENT_PAGE_SIZE", v, "Invalid page size")?;
    }
    if let Some(v) = lookup("DRAWBOOK_PARALLEL_THRESHOLD") {
        config.aggregation.parallel_threshold = parse_var("DRAWBOOK_PARALLEL_THRESHOLD", v, "Invalid bet count")?;
    }
    if let Some(v) = lookup("DRAWBOOK_PARTITIONS") {
        config.aggregation.partitions = parse_var("DRAWBOOK_PARTITIONS", v, "Invalid partition count")?;
    }
    if let Some(v) = lookup("DRAWBOOK_LOG_LEVEL") {
        config.logging.level = v;
    }
    if let Some(v) = lookup("DRAWBOOK_LOG_JSON") {
        config.logging.json = parse_var("DRAWBOOK_LOG_JSON", v, "Invalid boolean value")?;
    }
    Ok(())
}
