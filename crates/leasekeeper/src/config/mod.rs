use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mail: MailConfig,
    pub links: LinkConfig,
    pub tokens: TokenConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            mail: MailConfig::from_env()?,
            links: LinkConfig {
                base_url: env::var("APP_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            tokens: TokenConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Where outbound mail goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
    },
    File {
        dir: PathBuf,
    },
    /// Messages are written to the trace log only.
    Log,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransportConfig,
    pub from: String,
    pub max_attempts: u32,
    pub flush_interval_secs: u64,
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let transport = match env::var("MAIL_TRANSPORT")
            .unwrap_or_else(|_| "log".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "smtp" => MailTransportConfig::Smtp {
                host: env::var("MAIL_HOST").map_err(|_| ConfigError::Missing("MAIL_HOST"))?,
                port: parse_var("MAIL_PORT", 587)?,
                username: env::var("MAIL_USERNAME").unwrap_or_default(),
                password: env::var("MAIL_PASSWORD").unwrap_or_default(),
            },
            "file" => MailTransportConfig::File {
                dir: env::var("MAIL_FILE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./outbox")),
            },
            "log" => MailTransportConfig::Log,
            _ => return Err(ConfigError::InvalidValue("MAIL_TRANSPORT")),
        };

        Ok(Self {
            transport,
            from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Leasekeeper <no-reply@leasekeeper.local>".to_string()),
            max_attempts: parse_var("MAIL_MAX_ATTEMPTS", 5)?,
            flush_interval_secs: parse_var("MAIL_FLUSH_INTERVAL_SECS", 15)?,
        })
    }
}

/// Base URL used to build confirmation and signup links.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub base_url: String,
}

/// Token lifetimes and the claims-token signing secret.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub signing_secret: Option<String>,
    pub invitation_ttl: Duration,
    pub signup_token_ttl: Duration,
    pub session_ttl: Duration,
    pub maintenance_token_ttl: Duration,
}

impl TokenConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let signing_secret = env::var("APP_SIGNING_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty());

        Ok(Self {
            signing_secret,
            invitation_ttl: ttl_var("INVITATION_TTL_DAYS", 7, Duration::try_days)?,
            signup_token_ttl: ttl_var("SIGNUP_TOKEN_TTL_HOURS", 72, Duration::try_hours)?,
            session_ttl: ttl_var("SESSION_TTL_HOURS", 12, Duration::try_hours)?,
            maintenance_token_ttl: ttl_var("MAINTENANCE_TOKEN_TTL_DAYS", 14, Duration::try_days)?,
        })
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            invitation_ttl: Duration::days(7),
            signup_token_ttl: Duration::hours(72),
            session_ttl: Duration::hours(12),
            maintenance_token_ttl: Duration::days(14),
        }
    }
}

/// Positive lifetime in whole `unit`s; zero, negative, and out-of-range values are rejected.
fn ttl_var(
    name: &'static str,
    default: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let amount: i64 = parse_var(name, default)?;
    if amount <= 0 {
        return Err(ConfigError::InvalidValue(name));
    }
    unit(amount).ok_or(ConfigError::InvalidValue(name))
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue(&'static str),
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue(name) => write!(f, "{name} has an invalid value"),
            ConfigError::Missing(name) => write!(f, "{name} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidValue(_) | ConfigError::Missing(_) => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APP_BASE_URL",
            "APP_SIGNING_SECRET",
            "MAIL_TRANSPORT",
            "MAIL_HOST",
            "MAIL_PORT",
            "MAIL_MAX_ATTEMPTS",
            "INVITATION_TTL_DAYS",
            "SIGNUP_TOKEN_TTL_HOURS",
            "SESSION_TTL_HOURS",
            "MAINTENANCE_TOKEN_TTL_DAYS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.mail.transport, MailTransportConfig::Log);
        assert_eq!(config.links.base_url, "http://localhost:3000");
        assert_eq!(config.tokens.invitation_ttl, Duration::days(7));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn blank_signing_secret_counts_as_absent() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SIGNING_SECRET", "   ");
        let config = AppConfig::load().expect("config loads");
        assert!(config.tokens.signing_secret.is_none());
    }

    #[test]
    fn smtp_transport_requires_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MAIL_TRANSPORT", "smtp");
        match AppConfig::load() {
            Err(ConfigError::Missing("MAIL_HOST")) => {}
            other => panic!("expected missing MAIL_HOST, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_ttl() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INVITATION_TTL_DAYS", "a week");
        match AppConfig::load() {
            Err(ConfigError::InvalidValue("INVITATION_TTL_DAYS")) => {}
            other => panic!("expected invalid ttl, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_ttls_that_are_not_positive_or_too_large() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        for (name, raw) in [
            ("INVITATION_TTL_DAYS", "-3"),
            ("INVITATION_TTL_DAYS", "0"),
            ("INVITATION_TTL_DAYS", "1000000000000000"),
            ("SESSION_TTL_HOURS", "-1"),
            ("MAINTENANCE_TOKEN_TTL_DAYS", "9223372036854775807"),
        ] {
            reset_env();
            env::set_var(name, raw);
            match AppConfig::load() {
                Err(ConfigError::InvalidValue(rejected)) => assert_eq!(rejected, name),
                other => panic!("expected {name}={raw} to be rejected, got {other:?}"),
            }
        }
        reset_env();
    }
}
