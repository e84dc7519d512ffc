//! Application configuration loaded from environment variables.
//!
//! Configuration is read once at startup into an immutable [`Config`] that is
//! shared with every component that needs it.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// HTTP header name for API key authentication.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_DATABASE_URL: &str = "sqlite://snapvalue.db?mode=rwc";
    pub const DEV_HOST: &str = "0.0.0.0";
    pub const DEV_PORT: u16 = 8000;
    pub const DEV_DB_MAX_CONNECTIONS: u32 = 10;
    pub const DEV_DB_MIN_CONNECTIONS: u32 = 1;
    pub const DEV_DB_CONNECT_TIMEOUT_SECS: u64 = 30;
    pub const DEV_ALLOWED_ORIGINS: &str =
        "http://localhost:3000,http://127.0.0.1:3000,http://localhost:8080,http://127.0.0.1:8080";
    pub const DEV_MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB per image
    pub const DEV_ALLOWED_FILE_TYPES: &str = "image/jpeg,image/png,image/webp";
    pub const DEV_LOCAL_STORAGE_PATH: &str = "./uploads";
    pub const DEV_ANALYSIS_TIMEOUT_SECS: u64 = 30;
    pub const DEV_MOCK_SEED: u64 = 42;
    pub const DEV_MAX_CONCURRENT_APPRAISALS: usize = 5;

    // S3/MinIO defaults for development
    pub const DEV_S3_ENDPOINT: &str = "http://localhost:9100";
    pub const DEV_S3_BUCKET: &str = "snapvalue-images";
    pub const DEV_S3_REGION: &str = "us-east-1";
    pub const DEV_S3_ACCESS_KEY: &str = "minioadmin";
    pub const DEV_S3_SECRET_KEY: &str = "minioadmin";
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Connection URL (`postgres://...` or `sqlite://...`)
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Image upload limits.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Maximum image size in bytes
    pub max_file_size: usize,
    /// Comma-separated MIME allow-list, as configured
    pub allowed_file_types: String,
}

impl UploadSettings {
    /// Allowed MIME types, normalized to lower case.
    pub fn allowed_file_types(&self) -> Vec<String> {
        split_list(&self.allowed_file_types)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect()
    }
}

/// Which storage backend holds uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Cloud,
}

impl StorageKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "cloud" | "s3" | "gcs" => Some(Self::Cloud),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

/// S3 storage configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 endpoint URL (for MinIO or custom S3-compatible services)
    pub endpoint: Option<String>,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: SecretString,
    /// Base URL used to build public image URLs (defaults to endpoint/bucket)
    pub public_base_url: Option<String>,
}

/// Storage backend selection and parameters.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub kind: StorageKind,
    /// Root directory for the local backend
    pub local_path: PathBuf,
    /// Base URL under which locally stored files are served, if any
    pub public_base_url: Option<String>,
    pub s3: S3Config,
}

/// Analysis backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Mock,
    Remote,
}

impl AnalysisKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Some(Self::Mock),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Market analysis implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketKind {
    Mock,
    /// Comparable lookup over the `market_data` table
    Catalog,
    Remote,
}

impl MarketKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Some(Self::Mock),
            "catalog" => Some(Self::Catalog),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Analysis backend settings.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub kind: AnalysisKind,
    pub market: MarketKind,
    /// Base URL of the remote analysis service
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    /// Seed for the deterministic mock backends
    pub mock_seed: u64,
}

impl AnalysisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    /// Comma-separated CORS origins, as configured
    pub allowed_origins: String,
    pub upload: UploadSettings,
    pub storage: StorageSettings,
    pub analysis: AnalysisSettings,
    /// Maximum appraisal pipelines in flight at once
    pub max_concurrent_appraisals: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development) all variables have defaults.
    /// In production mode the server will NOT start if development defaults
    /// are in use for the database or S3 credentials.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `SNAPVALUE_HOST`, `SNAPVALUE_PORT`: Bind address (default: 0.0.0.0:8000)
    /// - `DATABASE_URL`: PostgreSQL or SQLite connection string
    /// - `DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`, `DB_CONNECT_TIMEOUT_SECS`
    /// - `ALLOWED_ORIGINS`: Comma-separated CORS origins
    /// - `MAX_FILE_SIZE`: Max image size in bytes (default: 10MB)
    /// - `ALLOWED_FILE_TYPES`: Comma-separated MIME types
    /// - `STORAGE_TYPE`: `local` or `cloud` (default: local)
    /// - `LOCAL_STORAGE_PATH`, `PUBLIC_BASE_URL`: Local backend settings
    /// - `S3_ENDPOINT`, `S3_BUCKET`, `S3_REGION`, `S3_ACCESS_KEY`,
    ///   `S3_SECRET_KEY`, `S3_PUBLIC_BASE_URL`: Cloud backend settings
    /// - `ANALYSIS_BACKEND`: `mock` or `remote` (default: mock)
    /// - `MARKET_BACKEND`: `mock`, `catalog` or `remote` (default: follows ANALYSIS_BACKEND)
    /// - `ANALYSIS_ENDPOINT`: Remote analysis service base URL
    /// - `ANALYSIS_TIMEOUT_SECS`: Per-stage timeout (default: 30)
    /// - `MOCK_SEED`: Seed for deterministic mock backends (default: 42)
    /// - `MAX_CONCURRENT_APPRAISALS`: Concurrent pipelines (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("SNAPVALUE_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = parse_var(
            "SNAPVALUE_PORT",
            defaults::DEV_PORT,
            "SNAPVALUE_PORT must be a valid port number",
        )?;

        let database = DatabaseSettings {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| defaults::DEV_DATABASE_URL.to_string()),
            max_connections: parse_var(
                "DB_MAX_CONNECTIONS",
                defaults::DEV_DB_MAX_CONNECTIONS,
                "DB_MAX_CONNECTIONS must be a valid number",
            )?,
            min_connections: parse_var(
                "DB_MIN_CONNECTIONS",
                defaults::DEV_DB_MIN_CONNECTIONS,
                "DB_MIN_CONNECTIONS must be a valid number",
            )?,
            connect_timeout_secs: parse_var(
                "DB_CONNECT_TIMEOUT_SECS",
                defaults::DEV_DB_CONNECT_TIMEOUT_SECS,
                "DB_CONNECT_TIMEOUT_SECS must be a valid number",
            )?,
        };

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| defaults::DEV_ALLOWED_ORIGINS.to_string());

        let upload = UploadSettings {
            max_file_size: parse_var(
                "MAX_FILE_SIZE",
                defaults::DEV_MAX_FILE_SIZE,
                "MAX_FILE_SIZE must be a valid number",
            )?,
            allowed_file_types: env::var("ALLOWED_FILE_TYPES")
                .unwrap_or_else(|_| defaults::DEV_ALLOWED_FILE_TYPES.to_string()),
        };

        let storage_kind = match env::var("STORAGE_TYPE") {
            Ok(value) => StorageKind::parse(&value).ok_or(ConfigError::InvalidValue(
                "STORAGE_TYPE must be 'local' or 'cloud'",
            ))?,
            Err(_) => StorageKind::Local,
        };

        let storage = StorageSettings {
            kind: storage_kind,
            local_path: PathBuf::from(
                env::var("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|_| defaults::DEV_LOCAL_STORAGE_PATH.to_string()),
            ),
            public_base_url: env::var("PUBLIC_BASE_URL").ok(),
            s3: S3Config {
                endpoint: env::var("S3_ENDPOINT").ok().or_else(|| {
                    if environment.is_development() {
                        Some(defaults::DEV_S3_ENDPOINT.to_string())
                    } else {
                        None
                    }
                }),
                bucket: env::var("S3_BUCKET")
                    .unwrap_or_else(|_| defaults::DEV_S3_BUCKET.to_string()),
                region: env::var("S3_REGION")
                    .unwrap_or_else(|_| defaults::DEV_S3_REGION.to_string()),
                access_key: env::var("S3_ACCESS_KEY")
                    .unwrap_or_else(|_| defaults::DEV_S3_ACCESS_KEY.to_string()),
                secret_key: SecretString::from(
                    env::var("S3_SECRET_KEY")
                        .unwrap_or_else(|_| defaults::DEV_S3_SECRET_KEY.to_string()),
                ),
                public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
            },
        };

        let analysis_kind = match env::var("ANALYSIS_BACKEND") {
            Ok(value) => AnalysisKind::parse(&value).ok_or(ConfigError::InvalidValue(
                "ANALYSIS_BACKEND must be 'mock' or 'remote'",
            ))?,
            Err(_) => AnalysisKind::Mock,
        };

        let market_kind = match env::var("MARKET_BACKEND") {
            Ok(value) => MarketKind::parse(&value).ok_or(ConfigError::InvalidValue(
                "MARKET_BACKEND must be 'mock', 'catalog' or 'remote'",
            ))?,
            Err(_) => match analysis_kind {
                AnalysisKind::Mock => MarketKind::Mock,
                AnalysisKind::Remote => MarketKind::Remote,
            },
        };

        let analysis = AnalysisSettings {
            kind: analysis_kind,
            market: market_kind,
            endpoint: env::var("ANALYSIS_ENDPOINT").ok(),
            timeout_secs: parse_var(
                "ANALYSIS_TIMEOUT_SECS",
                defaults::DEV_ANALYSIS_TIMEOUT_SECS,
                "ANALYSIS_TIMEOUT_SECS must be a valid number",
            )?,
            mock_seed: parse_var(
                "MOCK_SEED",
                defaults::DEV_MOCK_SEED,
                "MOCK_SEED must be a valid number",
            )?,
        };

        let max_concurrent_appraisals = parse_var(
            "MAX_CONCURRENT_APPRAISALS",
            defaults::DEV_MAX_CONCURRENT_APPRAISALS,
            "MAX_CONCURRENT_APPRAISALS must be a valid number",
        )?;

        let config = Config {
            environment,
            host,
            port,
            database,
            allowed_origins,
            upload,
            storage,
            analysis,
            max_concurrent_appraisals,
        };

        config.validate()?;

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Checks that hold in every environment.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_appraisals == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_CONCURRENT_APPRAISALS must be at least 1",
            ));
        }

        if self.upload.allowed_file_types().is_empty() {
            return Err(ConfigError::InvalidValue(
                "ALLOWED_FILE_TYPES must list at least one MIME type",
            ));
        }

        let needs_endpoint = self.analysis.kind == AnalysisKind::Remote
            || self.analysis.market == MarketKind::Remote;
        if needs_endpoint && self.analysis.endpoint.is_none() {
            return Err(ConfigError::MissingEnvVar("ANALYSIS_ENDPOINT"));
        }

        Ok(())
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database.url == defaults::DEV_DATABASE_URL {
            errors.push(format!(
                "DATABASE_URL is using development default '{}'. Set a production PostgreSQL URL.",
                defaults::DEV_DATABASE_URL
            ));
        }

        if self.storage.kind == StorageKind::Cloud
            && (self.storage.s3.access_key == defaults::DEV_S3_ACCESS_KEY
                || self.storage.s3.secret_key.expose_secret() == defaults::DEV_S3_SECRET_KEY)
        {
            errors.push(
                "S3_ACCESS_KEY/S3_SECRET_KEY are using development defaults. Set production S3 credentials."
                    .to_string(),
            );
        }

        if self.analysis.kind == AnalysisKind::Mock {
            errors.push(
                "ANALYSIS_BACKEND is 'mock'. Configure a remote analysis service for production."
                    .to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    /// CORS origins as a list.
    pub fn allowed_origins(&self) -> Vec<String> {
        split_list(&self.allowed_origins)
    }
}

/// Split a comma-separated setting, dropping empty entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_var<T: std::str::FromStr>(
    name: &str,
    default: T,
    message: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(message)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
