/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file loaded
/// first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `PRODUCTION`: Enables HSTS and strict CORS (default: false)
/// - `STORAGE_ROOT`: Directory holding invoice attachments (default: ./storage)
/// - `DEFAULT_TAX_RATE`: Tax rate in percent for invoices created without one (default: 20)
/// - `LOG_FORMAT`: `json` for JSON log lines, anything else for text
/// - `RUST_LOG`: Log filter (default: freecrm_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use freecrm_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

use freecrm_shared::billing::lifecycle::DEFAULT_TAX_RATE;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub billing: BillingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Attachment storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: PathBuf,
}

/// Invoice defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Tax rate in percent applied when an invoice is created without one
    pub default_tax_rate: f64,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Splits `CORS_ORIGINS` on commas, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or `JWT_SECRET` is shorter than 32 characters.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_port = var_or("API_PORT", "8080").parse::<u16>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let default_tax_rate = var_or("DEFAULT_TAX_RATE", &DEFAULT_TAX_RATE.to_string()).parse::<f64>()?;
        if !(0.0..=100.0).contains(&default_tax_rate) {
            anyhow::bail!("DEFAULT_TAX_RATE must be between 0 and 100");
        }

        let production = matches!(
            var_or("PRODUCTION", "false").to_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port: api_port,
                cors_origins: parse_origins(&var_or("CORS_ORIGINS", "*")),
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            storage: StorageConfig {
                root: PathBuf::from(var_or("STORAGE_ROOT", "./storage")),
            },
            billing: BillingConfig { default_tax_rate },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            storage: StorageConfig {
                root: PathBuf::from("./storage"),
            },
            billing: BillingConfig {
                default_tax_rate: 20.0,
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(test_config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://crm.example.com, https://admin.example.com ,"),
            vec!["https://crm.example.com", "https://admin.example.com"]
        );
        assert!(parse_origins(" ").is_empty());
    }

    #[test]
    fn test_allows_any_origin() {
        let mut config = test_config();
        assert!(config.allows_any_origin());

        config.api.cors_origins = vec!["https://crm.example.com".to_string()];
        assert!(!config.allows_any_origin());
    }
}
