use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "FAENA_DATABASE_URL")]
    pub database_url: String,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub cache: CacheConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub websocket: WsConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "FAENA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "FAENA_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Seconds to wait for in-flight work during shutdown
    #[arg(long, env = "FAENA_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key for JWT signing
    #[arg(long, env = "FAENA_JWT_SECRET")]
    pub jwt_secret: String,

    /// Access token time-to-live in seconds
    #[arg(long, env = "FAENA_TOKEN_TTL_SECS", default_value_t = 43_200)]
    pub token_ttl_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct CacheConfig {
    /// Time-to-live for cached CRUD responses in seconds
    #[arg(long, env = "FAENA_CACHE_TTL_SECS", default_value_t = 60)]
    pub ttl_secs: u64,

    /// Maximum number of cached responses
    #[arg(long, env = "FAENA_CACHE_CAPACITY", default_value_t = 500)]
    pub capacity: u64,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed for standard endpoints
    #[arg(long, env = "FAENA_RATE_LIMIT_PER_SECOND", default_value_t = 20)]
    pub per_second: u64,

    /// Burst allowance for standard endpoints
    #[arg(long, env = "FAENA_RATE_LIMIT_BURST", default_value_t = 40)]
    pub burst: u32,

    /// Stricter rate limit for the login endpoint
    #[arg(long, env = "FAENA_AUTH_RATE_LIMIT_PER_SECOND", default_value_t = 2)]
    pub auth_per_second: u64,

    /// Burst allowance for the login endpoint
    #[arg(long, env = "FAENA_AUTH_RATE_LIMIT_BURST", default_value_t = 5)]
    pub auth_burst: u32,
}

#[derive(Clone, Debug, Args)]
pub struct WsConfig {
    /// Size of the per-connection outbound event buffer
    #[arg(long, env = "FAENA_WS_OUTBOUND_BUFFER_SIZE", default_value_t = 64)]
    pub outbound_buffer_size: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces and metrics; telemetry export is disabled when unset
    #[arg(long, env = "FAENA_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "FAENA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
