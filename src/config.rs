use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub worker: WorkerConfig,
    pub push: PushConfig,
    pub mail: MailConfig,
    pub password_reset: PasswordResetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. A single `*` entry allows any origin.
    /// Read from env var `CORS_ORIGINS` (comma separated).
    pub cors_origins: Vec<String>,
    /// Directory where uploaded photo memories are written and served from `/media`.
    pub media_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Run the embedded migrations during startup.
    pub init_on_startup: bool,
    /// Timeout for the startup connectivity probe. `<= 0` skips the probe.
    pub ping_timeout_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for auth endpoints (e.g. /auth/login)
    pub auth_per_second: u32,
    /// Burst size for auth endpoints
    pub auth_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Whether the notification worker is started.
    pub enabled: bool,
    /// Seconds between worker cycles.
    pub interval_seconds: u64,
    /// Maximum due jobs handled per cycle.
    pub batch_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Path to the Firebase service-account JSON file.
    pub fcm_credentials: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetConfig {
    pub ttl_minutes: i64,
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173,http://127.0.0.1:5173";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                cors_origins: parse_origins(
                    &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
                ),
                media_dir: env::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/mendly.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                init_on_startup: env_flag("INIT_DB_ON_STARTUP", true),
                ping_timeout_seconds: env::var("DB_PING_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "1.5".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("DB_PING_TIMEOUT_SECONDS".to_string()))?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "168".to_string())
                    .parse()
                    .unwrap_or(168),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: env::var("RATE_LIMIT_AUTH_PER_SECOND")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                auth_burst: env::var("RATE_LIMIT_AUTH_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            worker: WorkerConfig {
                enabled: env_flag("NOTIF_WORKER_ENABLED", true),
                interval_seconds: env::var("NOTIF_WORKER_INTERVAL_SEC")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60u64)
                    .max(1),
                batch_size: env::var("NOTIF_WORKER_BATCH_SIZE")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .unwrap_or(50i64)
                    .max(1),
            },
            push: PushConfig {
                fcm_credentials: env_optional("FCM_CREDENTIALS"),
            },
            mail: MailConfig {
                api_url: env_optional("MAIL_API_URL"),
                api_key: env_optional("MAIL_API_KEY"),
                from: env_optional("MAIL_FROM"),
            },
            password_reset: PasswordResetConfig {
                ttl_minutes: env::var("PASSWORD_RESET_TTL_MINUTES")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
                media_dir: "media".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/mendly.db".to_string(),
                max_connections: 5,
                init_on_startup: true,
                ping_timeout_seconds: 1.5,
            },
            jwt: JwtConfig {
                secret: String::new(),
                expiration_hours: 168,
            },
            rate_limit: RateLimitConfig {
                auth_per_second: 3,
                auth_burst: 10,
            },
            worker: WorkerConfig {
                enabled: true,
                interval_seconds: 60,
                batch_size: 50,
            },
            push: PushConfig {
                fcm_credentials: None,
            },
            mail: MailConfig {
                api_url: None,
                api_key: None,
                from: None,
            },
            password_reset: PasswordResetConfig { ttl_minutes: 10 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_split() {
        assert_eq!(
            parse_origins(" http://a.test/ , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.worker.batch_size, 50);
        assert_eq!(config.jwt.expiration_hours, 168);
        assert_eq!(config.password_reset.ttl_minutes, 10);
    }
}
