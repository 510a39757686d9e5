use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry duration).
    pub jwt: JwtConfig,
    /// Dispatch-core tuning knobs.
    pub dispatch: DispatchConfig,
}

/// Tuning knobs for the offer dispatch core.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How long a technician has to answer an offer (default: `30`).
    pub offer_timeout_secs: i64,
    /// How many technicians receive an offer in the first round
    /// (default: `1`). Each re-dispatch round widens this by one.
    pub fan_out: usize,
    /// Platform commission percent snapshotted at claim time (default: `30`).
    pub commission_percent: u8,
    /// Reconciliation sweep interval in seconds (default: `5`).
    pub reconcile_interval_secs: u64,
    /// Heartbeat silence after which a push session counts as dead
    /// (default: `90`).
    pub heartbeat_grace_secs: i64,
}

impl DispatchConfig {
    pub fn offer_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.offer_timeout_secs)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `OFFER_TIMEOUT_SECS`      | `30`                    |
    /// | `OFFER_FAN_OUT`           | `1`                     |
    /// | `COMMISSION_PERCENT`      | `30`                    |
    /// | `RECONCILE_INTERVAL_SECS` | `5`                     |
    /// | `HEARTBEAT_GRACE_SECS`    | `90`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_parsed("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parsed("REQUEST_TIMEOUT_SECS", 30);

        let dispatch = DispatchConfig {
            offer_timeout_secs: env_parsed("OFFER_TIMEOUT_SECS", 30),
            fan_out: env_parsed("OFFER_FAN_OUT", 1),
            commission_percent: env_parsed("COMMISSION_PERCENT", 30),
            reconcile_interval_secs: env_parsed("RECONCILE_INTERVAL_SECS", 5),
            heartbeat_grace_secs: env_parsed("HEARTBEAT_GRACE_SECS", 90),
        };
        assert!(
            dispatch.commission_percent <= 100,
            "COMMISSION_PERCENT must be within 0..=100"
        );
        assert!(dispatch.fan_out >= 1, "OFFER_FAN_OUT must be at least 1");
        assert!(
            dispatch.offer_timeout_secs >= 1,
            "OFFER_TIMEOUT_SECS must be at least 1"
        );

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            dispatch,
        }
    }
}

/// Parse an env var, falling back to `default` when unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse; misconfiguration
/// should fail fast at startup.
fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T
where
    T: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid value (got '{raw}')")),
        Err(_) => default,
    }
}
