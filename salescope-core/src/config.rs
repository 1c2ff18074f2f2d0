use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct SalescopeConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: usize,
}

fn default_connect_attempts() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Model identifier for the text-generation API.
    pub model: String,
    /// API key; falls back to the GOOGLE_API_KEY env var when absent.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Default freshness window for canned report results, in seconds.
    pub report_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            report_ttl_seconds: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8770,
        }
    }
}

impl SalescopeConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_sections_default() {
        let cache = CacheConfig::default();
        assert_eq!(cache.report_ttl_seconds, 300);

        let http = HttpConfig::default();
        assert_eq!(http.host, "127.0.0.1");
        assert_eq!(http.port, 8770);
    }
}
