//! # Skimmer Config
//!
//! Environment-variable configuration with type conversion, defaults
//! and validation. All recognized keys are read once at startup into an
//! [`AppConfig`]; nothing else reads the process environment.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    #[error("{var} must be at least {min}")]
    BelowMinimum { var: String, min: u64 },
}

/// Which search backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEngine {
    Searxng,
    Serper,
}

impl SearchEngine {
    fn parse(var: &str, value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "searxng" => Ok(SearchEngine::Searxng),
            "serper" => Ok(SearchEngine::Serper),
            other => Err(ConfigError::InvalidValue {
                var: var.to_string(),
                reason: format!("unknown search engine '{}'", other),
            }),
        }
    }
}

/// Which cache backend to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheType {
    Memory,
    Redis,
}

/// Service configuration, loaded once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,

    pub main_search_engine: SearchEngine,
    pub fallback_search_engine: Option<SearchEngine>,
    pub searxng_url: Option<String>,
    pub serper_api_key: Option<String>,
    pub serper_api_url: String,

    pub youtube_api_key: Option<String>,
    /// Ordered transcript method tokens, e.g. `["ytapi", "tactiq"]`.
    pub youtube_transcript_order: Vec<String>,
    pub transcript_service_url: Option<String>,

    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,

    pub twitter_username: Option<String>,
    pub twitter_password: Option<String>,
    pub twitter_cookie_file: String,

    pub cache_type: CacheType,
    pub redis_url: String,
    pub redis_password: Option<String>,
    pub redis_db: i64,
    pub search_cache_ttl: Duration,
    pub content_cache_ttl: Duration,

    pub http_worker_pool_size: usize,
    pub browser_pool_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            main_search_engine: SearchEngine::Searxng,
            fallback_search_engine: None,
            searxng_url: None,
            serper_api_key: None,
            serper_api_url: "https://google.serper.dev/search".to_string(),
            youtube_api_key: None,
            youtube_transcript_order: vec!["ytapi".to_string(), "tactiq".to_string()],
            transcript_service_url: None,
            reddit_client_id: None,
            reddit_client_secret: None,
            reddit_user_agent: "skimmer/0.3 (content extraction)".to_string(),
            twitter_username: None,
            twitter_password: None,
            twitter_cookie_file: "twitter_cookies.json".to_string(),
            cache_type: CacheType::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_password: None,
            redis_db: 0,
            search_cache_ttl: Duration::from_secs(600),
            content_cache_ttl: Duration::from_secs(3600),
            http_worker_pool_size: 200,
            browser_pool_size: 4,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment, falling back to
    /// defaults for unset keys and rejecting malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let port = get_parsed("PORT", defaults.port)?;

        let main_search_engine = match get_optional("MAIN_SEARCH_ENGINE") {
            Some(value) => SearchEngine::parse("MAIN_SEARCH_ENGINE", &value)?,
            None => defaults.main_search_engine,
        };
        let fallback_search_engine = get_optional("FALLBACK_SEARCH_ENGINE")
            .map(|value| SearchEngine::parse("FALLBACK_SEARCH_ENGINE", &value))
            .transpose()?;

        let cache_type = match get_optional("CACHE_TYPE") {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "memory" | "in-memory" => CacheType::Memory,
                "redis" => CacheType::Redis,
                other => {
                    return Err(ConfigError::InvalidValue {
                        var: "CACHE_TYPE".to_string(),
                        reason: format!("unknown cache type '{}'", other),
                    })
                }
            },
            None => defaults.cache_type,
        };

        let youtube_transcript_order = get_optional("YOUTUBE_TRANSCRIPT_ORDER")
            .map(|raw| {
                raw.split(',')
                    .map(|token| token.trim().to_ascii_lowercase())
                    .filter(|token| !token.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|tokens| !tokens.is_empty())
            .unwrap_or(defaults.youtube_transcript_order);

        let config = Self {
            port,
            main_search_engine,
            fallback_search_engine,
            searxng_url: get_optional("SEARXNG_URL"),
            serper_api_key: get_optional("SERPER_API_KEY"),
            serper_api_url: get_optional("SERPER_API_URL").unwrap_or(defaults.serper_api_url),
            youtube_api_key: get_optional("YOUTUBE_API_KEY"),
            youtube_transcript_order,
            transcript_service_url: get_optional("TRANSCRIPT_SERVICE_URL"),
            reddit_client_id: get_optional("REDDIT_CLIENT_ID"),
            reddit_client_secret: get_optional("REDDIT_CLIENT_SECRET"),
            reddit_user_agent: get_optional("REDDIT_USER_AGENT").unwrap_or(defaults.reddit_user_agent),
            twitter_username: get_optional("TWITTER_USERNAME"),
            twitter_password: get_optional("TWITTER_PASSWORD"),
            twitter_cookie_file: get_optional("TWITTER_COOKIE_FILE")
                .unwrap_or(defaults.twitter_cookie_file),
            cache_type,
            redis_url: get_optional("REDIS_URL").unwrap_or(defaults.redis_url),
            redis_password: get_optional("REDIS_PASSWORD"),
            redis_db: get_parsed("REDIS_DB", defaults.redis_db)?,
            search_cache_ttl: Duration::from_secs(get_parsed(
                "SEARCH_CACHE_TTL",
                defaults.search_cache_ttl.as_secs(),
            )?),
            content_cache_ttl: Duration::from_secs(get_parsed(
                "CONTENT_CACHE_TTL",
                defaults.content_cache_ttl.as_secs(),
            )?),
            http_worker_pool_size: get_parsed(
                "HTTP_WORKER_POOL_SIZE",
                defaults.http_worker_pool_size,
            )?,
            browser_pool_size: get_parsed("BROWSER_POOL_SIZE", defaults.browser_pool_size)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http_worker_pool_size == 0 {
            return Err(ConfigError::BelowMinimum {
                var: "HTTP_WORKER_POOL_SIZE".to_string(),
                min: 1,
            });
        }
        if self.browser_pool_size == 0 {
            return Err(ConfigError::BelowMinimum {
                var: "BROWSER_POOL_SIZE".to_string(),
                min: 1,
            });
        }
        if self.search_cache_ttl < Duration::from_secs(1) {
            return Err(ConfigError::BelowMinimum {
                var: "SEARCH_CACHE_TTL".to_string(),
                min: 1,
            });
        }
        if self.content_cache_ttl < Duration::from_secs(1) {
            return Err(ConfigError::BelowMinimum {
                var: "CONTENT_CACHE_TTL".to_string(),
                min: 1,
            });
        }
        if self.main_search_engine == SearchEngine::Searxng && self.searxng_url.is_none() {
            tracing::warn!("MAIN_SEARCH_ENGINE is searxng but SEARXNG_URL is unset");
        }
        Ok(())
    }

    /// Redis connection URL with password and database index applied.
    pub fn redis_connection_url(&self) -> String {
        let mut url = self.redis_url.trim_end_matches('/').to_string();
        if let Some(password) = &self.redis_password {
            if !url.contains('@') {
                if let Some(rest) = url.strip_prefix("redis://") {
                    url = format!("redis://:{}@{}", password, rest);
                }
            }
        }
        if self.redis_db != 0 {
            url = format!("{}/{}", url, self.redis_db);
        }
        url
    }
}

fn get_optional(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn get_parsed<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional(var) {
        Some(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: format!("{}", e),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_expectations() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.http_worker_pool_size, 200);
        assert_eq!(config.browser_pool_size, 4);
        assert_eq!(config.search_cache_ttl, Duration::from_secs(600));
        assert_eq!(config.content_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.youtube_transcript_order, vec!["ytapi", "tactiq"]);
        assert_eq!(config.twitter_cookie_file, "twitter_cookies.json");
    }

    #[test]
    fn zero_pool_size_rejected() {
        let config = AppConfig {
            browser_pool_size: 0,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn redis_url_gains_password_and_db() {
        let config = AppConfig {
            redis_url: "redis://cache.internal:6379".to_string(),
            redis_password: Some("hunter2".to_string()),
            redis_db: 3,
            ..AppConfig::default()
        };
        assert_eq!(
            config.redis_connection_url(),
            "redis://:hunter2@cache.internal:6379/3"
        );
    }

    #[test]
    fn redis_url_with_embedded_auth_left_alone() {
        let config = AppConfig {
            redis_url: "redis://:secret@cache.internal:6379".to_string(),
            redis_password: Some("ignored".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(
            config.redis_connection_url(),
            "redis://:secret@cache.internal:6379"
        );
    }

    #[test]
    fn search_engine_parsing_is_case_insensitive() {
        assert_eq!(
            SearchEngine::parse("MAIN_SEARCH_ENGINE", "Serper").unwrap(),
            SearchEngine::Serper
        );
        assert!(SearchEngine::parse("MAIN_SEARCH_ENGINE", "bing").is_err());
    }
}
