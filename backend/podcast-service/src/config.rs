/// Configuration management for the podcast service.
///
/// All settings come from environment variables with development defaults;
/// production-critical values are rejected when missing or unsafe.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub smtp: SmtpConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Pi Network payment gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server API key; payment calls fail without it
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub timeout_secs: u64,
}

/// SMTP settings for operator notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Operations mailbox receiving payout-request notifications
    pub notify_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Hex-encoded SPKI Ed25519 public key used to verify login payloads
    pub login_public_key_hex: String,
}

/// The platform login key; overridable via LOGIN_PUBLIC_KEY_HEX.
const DEFAULT_LOGIN_PUBLIC_KEY: &str =
    "302a300506032b6570032100c7c716f5e3bbf579cc0fa7ff61d1b4f60e3546cfab580093df1fa3dc7f9ef6d6";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5000),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if app_env.eq_ignore_ascii_case("production") => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if app_env.eq_ignore_ascii_case("production") && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .map_err(|_| "DATABASE_URL must be set".to_string())?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
                acquire_timeout_secs: std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            gateway: GatewayConfig {
                api_key: std::env::var("PI_API_KEY").ok().filter(|k| !k.is_empty()),
                base_url: std::env::var("PI_API_BASE_URL")
                    .unwrap_or_else(|_| "https://api.minepi.com/v2".to_string()),
                timeout_secs: std::env::var("PI_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(15),
            },
            storage: StorageConfig {
                bucket: std::env::var("S3_BUCKET_NAME").unwrap_or_default(),
                region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-2".to_string()),
                timeout_secs: std::env::var("S3_TIMEOUT_SECS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            smtp: SmtpConfig {
                host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(587),
                username: std::env::var("NOTIFY_EMAIL").unwrap_or_default(),
                password: std::env::var("NOTIFY_PASS").unwrap_or_default(),
                notify_to: std::env::var("NOTIFY_TO").unwrap_or_default(),
            },
            auth: AuthConfig {
                login_public_key_hex: std::env::var("LOGIN_PUBLIC_KEY_HEX")
                    .unwrap_or_else(|_| DEFAULT_LOGIN_PUBLIC_KEY.to_string()),
            },
        })
    }
}
