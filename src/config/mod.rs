use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub optimus: OptimusConfig,
    pub cache: CacheConfig,
    pub queue: QueueConfig,
    pub events: EventConfig,
    pub sso: SsoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Upper bound applied to `filter:limit`
    pub max_limit: Option<i64>,
    pub default_per_page: i64,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub handshake_timeout_secs: u64,
    pub provider_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Adds error traces to failure envelopes and keeps internal messages visible
    pub debug: bool,
    /// Hex encoded 32 byte key for secure fields; passthrough when absent
    pub field_key: Option<String>,
    pub token_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimusConfig {
    pub prime: u64,
    pub inverse: u64,
    pub random: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub prefix: String,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub redis_url: Option<String>,
    pub function: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub listener_timeout_ms: u64,
    pub max_dispatch_depth: usize,
}

/// OAuth1 consumer for providers that sign requests with a token secret
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SsoConfig {
    pub twitter_consumer_key: Option<String>,
    pub twitter_consumer_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_DEFAULT_PER_PAGE") {
            self.filter.default_per_page = v.parse().unwrap_or(self.filter.default_per_page);
        }
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        if let Some(port) = env::var("IDOS_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_HANDSHAKE_TIMEOUT_SECS") {
            self.api.handshake_timeout_secs = v.parse().unwrap_or(self.api.handshake_timeout_secs);
        }
        if let Ok(v) = env::var("API_PROVIDER_TIMEOUT_SECS") {
            self.api.provider_timeout_secs = v.parse().unwrap_or(self.api.provider_timeout_secs);
        }

        if let Ok(v) = env::var("SECURITY_DEBUG") {
            self.security.debug = v.parse().unwrap_or(self.security.debug);
        }
        if let Ok(v) = env::var("SECURITY_FIELD_KEY") {
            self.security.field_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_EXPIRY_HOURS") {
            self.security.token_expiry_hours = v.parse().unwrap_or(self.security.token_expiry_hours);
        }

        if let Ok(v) = env::var("OPTIMUS_PRIME") {
            self.optimus.prime = v.parse().unwrap_or(self.optimus.prime);
        }
        if let Ok(v) = env::var("OPTIMUS_INVERSE") {
            self.optimus.inverse = v.parse().unwrap_or(self.optimus.inverse);
        }
        if let Ok(v) = env::var("OPTIMUS_RANDOM") {
            self.optimus.random = v.parse().unwrap_or(self.optimus.random);
        }

        if let Ok(v) = env::var("CACHE_REDIS_URL") {
            self.cache.redis_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("CACHE_PREFIX") {
            self.cache.prefix = v;
        }
        if let Ok(v) = env::var("CACHE_TTL_SECS") {
            self.cache.ttl_secs = v.parse().unwrap_or(self.cache.ttl_secs);
        }

        if let Ok(v) = env::var("QUEUE_REDIS_URL") {
            self.queue.redis_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("QUEUE_FUNCTION") {
            self.queue.function = v;
        }

        if let Ok(v) = env::var("EVENTS_LISTENER_TIMEOUT_MS") {
            self.events.listener_timeout_ms = v.parse().unwrap_or(self.events.listener_timeout_ms);
        }
        if let Ok(v) = env::var("EVENTS_MAX_DISPATCH_DEPTH") {
            self.events.max_dispatch_depth = v.parse().unwrap_or(self.events.max_dispatch_depth);
        }

        if let Ok(v) = env::var("SSO_TWITTER_CONSUMER_KEY") {
            self.sso.twitter_consumer_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SSO_TWITTER_CONSUMER_SECRET") {
            self.sso.twitter_consumer_secret = Some(v).filter(|s| !s.is_empty());
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            filter: FilterConfig {
                max_limit: Some(1000),
                default_per_page: 15,
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                handshake_timeout_secs: 10,
                provider_timeout_secs: 10,
            },
            security: SecurityConfig {
                debug: true,
                field_key: None,
                token_expiry_hours: 24 * 7,
            },
            optimus: OptimusConfig::default(),
            cache: CacheConfig {
                redis_url: None,
                prefix: "idos".to_string(),
                ttl_secs: 300,
            },
            queue: QueueConfig {
                redis_url: None,
                function: "manager".to_string(),
            },
            events: EventConfig {
                listener_timeout_ms: 5_000,
                max_dispatch_depth: 3,
            },
            sso: SsoConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            filter: FilterConfig {
                max_limit: Some(500),
                default_per_page: 15,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                handshake_timeout_secs: 5,
                provider_timeout_secs: 5,
            },
            security: SecurityConfig {
                debug: false,
                field_key: None,
                token_expiry_hours: 24,
            },
            optimus: OptimusConfig::default(),
            cache: CacheConfig {
                redis_url: None,
                prefix: "idos".to_string(),
                ttl_secs: 600,
            },
            queue: QueueConfig {
                redis_url: None,
                function: "manager".to_string(),
            },
            events: EventConfig {
                listener_timeout_ms: 2_000,
                max_dispatch_depth: 3,
            },
            sso: SsoConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            filter: FilterConfig {
                max_limit: Some(100),
                default_per_page: 15,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                handshake_timeout_secs: 5,
                provider_timeout_secs: 5,
            },
            security: SecurityConfig {
                debug: false,
                field_key: None,
                token_expiry_hours: 4,
            },
            optimus: OptimusConfig::default(),
            cache: CacheConfig {
                redis_url: None,
                prefix: "idos".to_string(),
                ttl_secs: 3600,
            },
            queue: QueueConfig {
                redis_url: None,
                function: "manager".to_string(),
            },
            events: EventConfig {
                listener_timeout_ms: 1_000,
                max_dispatch_depth: 3,
            },
            sso: SsoConfig::default(),
        }
    }
}

impl Default for OptimusConfig {
    fn default() -> Self {
        Self {
            prime: 1_580_030_173,
            inverse: 59_260_789,
            random: 1_163_945_558,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_debug {
    () => {
        $crate::config::CONFIG.security.debug
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.security.debug);
        assert_eq!(config.filter.max_limit, Some(1000));
        assert_eq!(config.queue.function, "manager");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.security.debug);
        assert_eq!(config.filter.max_limit, Some(100));
        assert!(config.security.field_key.is_none());
    }

    #[test]
    fn test_optimus_defaults_are_inverse_pair() {
        let optimus = OptimusConfig::default();
        assert_eq!((optimus.prime * optimus.inverse) & 0x7FFF_FFFF, 1);
    }
}
