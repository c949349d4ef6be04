use crate::scoring::DisplayPrecision;
use chrono::FixedOffset;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub club: ClubConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            club: ClubConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Club settings read from the `APP_*` environment.
#[derive(Debug, Clone)]
pub struct ClubConfig {
    pub public_base_url: String,
    pub display_offset: FixedOffset,
    pub snapshot_path: Option<PathBuf>,
    pub restaurant_average_precision: DisplayPrecision,
}

const MAX_OFFSET_MINUTES: i32 = 24 * 60;

impl ClubConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let public_base_url = env::var("APP_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let offset_minutes = match env::var("APP_DISPLAY_UTC_OFFSET_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse::<i32>()
                .map_err(|_| ConfigError::InvalidDisplayOffset(raw.clone()))?,
            Err(_) => 0,
        };
        let display_offset = FixedOffset::east_opt(offset_minutes * 60)
            .filter(|_| offset_minutes.abs() < MAX_OFFSET_MINUTES)
            .ok_or_else(|| ConfigError::InvalidDisplayOffset(offset_minutes.to_string()))?;

        let snapshot_path = env::var("APP_SNAPSHOT_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let restaurant_average_precision = match env::var("APP_RESTAURANT_AVERAGE_PRECISION") {
            Ok(raw) => DisplayPrecision::parse(&raw)
                .ok_or(ConfigError::InvalidPrecision(raw))?,
            Err(_) => DisplayPrecision::Tenths,
        };

        Ok(Self {
            public_base_url,
            display_offset,
            snapshot_path,
            restaurant_average_precision,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDisplayOffset(String),
    InvalidPrecision(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDisplayOffset(value) => write!(
                f,
                "APP_DISPLAY_UTC_OFFSET_MINUTES must be whole minutes within a day, got '{}'",
                value
            ),
            ConfigError::InvalidPrecision(value) => write!(
                f,
                "APP_RESTAURANT_AVERAGE_PRECISION must be 'tenths' or 'whole', got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDisplayOffset(_)
            | ConfigError::InvalidPrecision(_) => None,
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_PUBLIC_BASE_URL");
        env::remove_var("APP_DISPLAY_UTC_OFFSET_MINUTES");
        env::remove_var("APP_SNAPSHOT_PATH");
        env::remove_var("APP_RESTAURANT_AVERAGE_PRECISION");
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
        assert_eq!(config.club.public_base_url, "http://localhost:5173");
        assert_eq!(config.club.display_offset.local_minus_utc(), 0);
        assert!(config.club.snapshot_path.is_none());
        assert_eq!(
            config.club.restaurant_average_precision,
            DisplayPrecision::Tenths
        );
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
    fn reads_club_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DISPLAY_UTC_OFFSET_MINUTES", "120");
        env::set_var("APP_RESTAURANT_AVERAGE_PRECISION", "whole");
        env::set_var("APP_SNAPSHOT_PATH", "/var/lib/club/snapshot.json");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.club.display_offset.local_minus_utc(), 7200);
        assert_eq!(
            config.club.restaurant_average_precision,
            DisplayPrecision::Whole
        );
        assert_eq!(
            config.club.snapshot_path,
            Some(PathBuf::from("/var/lib/club/snapshot.json"))
        );
    }

    #[test]
    fn rejects_offsets_beyond_a_day() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DISPLAY_UTC_OFFSET_MINUTES", "1440");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InvalidDisplayOffset(_))));
    }
}
