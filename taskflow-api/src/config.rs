/// Configuration management for the API server
///
/// Loads `.env` (if present) and then reads environment variables through the
/// `config` crate, layered over built-in defaults.
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins, `*` for any (default: *)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `DATABASE_MIN_CONNECTIONS`: warm connections (default: 1)
/// - `JWT_SECRET`: HS256 secret, at least 32 characters (required)
/// - `JWT_ACCESS_TTL_HOURS`: access token lifetime (default: 168)
/// - `JWT_REFRESH_TTL_DAYS`: refresh token lifetime (default: 30)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
///
/// # Example
///
/// ```no_run
/// use taskflow_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::Deserialize;
use taskflow_shared::db::pool;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Log output format
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `["*"]` means any
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Minimum number of idle connections
    pub min_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Access token lifetime in hours
    pub access_ttl_hours: i64,

    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,
}

impl DatabaseConfig {
    /// Pool settings for [`taskflow_shared::db::pool::create_pool`]
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            ..Default::default()
        }
    }
}

impl JwtConfig {
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.access_ttl_hours)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_ttl_days)
    }
}

/// Tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Flat view of the environment, one field per variable
#[derive(Debug, Deserialize)]
struct RawConfig {
    api_host: String,
    api_port: u16,
    cors_origins: String,
    production: bool,
    database_url: Option<String>,
    database_max_connections: u32,
    database_min_connections: u32,
    jwt_secret: Option<String>,
    jwt_access_ttl_hours: i64,
    jwt_refresh_ttl_days: i64,
    log_format: LogFormat,
}

impl Config {
    /// Loads configuration from `.env` and the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - a variable has an unparseable value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::load(config::Environment::default().try_parsing(true))
    }

    /// Builds configuration from defaults plus one source
    pub fn load<S>(source: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let raw: RawConfig = config::Config::builder()
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 8080)?
            .set_default("cors_origins", "*")?
            .set_default("production", false)?
            .set_default("database_max_connections", 10)?
            .set_default("database_min_connections", 1)?
            .set_default("jwt_access_ttl_hours", 168)?
            .set_default("jwt_refresh_ttl_days", 30)?
            .set_default("log_format", "pretty")?
            .add_source(source)
            .build()?
            .try_deserialize()
            .context("invalid configuration")?;

        let database_url = raw
            .database_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = raw
            .jwt_secret
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        if raw.jwt_access_ttl_hours <= 0 || raw.jwt_refresh_ttl_days <= 0 {
            anyhow::bail!("token lifetimes must be positive");
        }

        let cors_origins = raw
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: raw.api_host,
                port: raw.api_port,
                cors_origins,
                production: raw.production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: raw.database_max_connections,
                min_connections: raw.database_min_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_hours: raw.jwt_access_ttl_hours,
                refresh_ttl_days: raw.jwt_refresh_ttl_days,
            },
            log_format: raw.log_format,
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
