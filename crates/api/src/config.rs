//! Application configuration loaded from environment variables.

use chrono::Duration;
use pipeline::PaymentConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `FRONTEND_HOST` — base URL for payment redirect links
/// - `PAYMENT_NOTIFICATION_URL` — provider callback URL
/// - `PAYMENT_SESSION_LIFETIME_SECS` — how long a session stays payable (default: 7200)
/// - `SWEEP_INTERVAL_SECS` — period of the background sweeps (default: 60)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub frontend_host: String,
    pub notification_url: String,
    pub session_lifetime_secs: i64,
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            frontend_host: std::env::var("FRONTEND_HOST").unwrap_or(defaults.frontend_host),
            notification_url: std::env::var("PAYMENT_NOTIFICATION_URL")
                .unwrap_or(defaults.notification_url),
            session_lifetime_secs: std::env::var("PAYMENT_SESSION_LIFETIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_lifetime_secs),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval_secs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the payment settings slice of the configuration.
    pub fn payment(&self) -> PaymentConfig {
        PaymentConfig {
            frontend_host: self.frontend_host.clone(),
            notification_url: self.notification_url.clone(),
            session_lifetime: Duration::seconds(self.session_lifetime_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            frontend_host: "http://localhost:8080".to_string(),
            notification_url: "http://localhost:3000/hooks/payment".to_string(),
            session_lifetime_secs: 7200,
            sweep_interval_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.session_lifetime_secs, 7200);
        assert_eq!(config.sweep_interval_secs, 60);
    }

    #[test]
    fn payment_config_carries_lifetime() {
        let config = Config::default();
        assert_eq!(config.payment().session_lifetime, Duration::seconds(7200));
    }
}
