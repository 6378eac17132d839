use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Runtime settings, read from the environment (and `.env` via `dotenvy`).
#[derive(Debug, Clone)]
pub struct Config {
    /// `DATABASE_URL`, e.g. `sqlite://blog.db`
    pub database_url: String,
    /// `JWT_SECRET`, the HMAC key for identity tokens
    pub jwt_secret: String,
    /// `BIND_ADDRESS`
    pub bind_address: SocketAddr,
    /// `CLEANUP_INTERVAL_SECS`, period of the expired-post sweep
    pub cleanup_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let bind_address = std::env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_owned())
            .parse()
            .context("BIND_ADDRESS must be a socket address")?;

        let cleanup_interval = match std::env::var("CLEANUP_INTERVAL_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .context("CLEANUP_INTERVAL_SECS must be a number of seconds")?,
            Err(_) => DEFAULT_CLEANUP_INTERVAL_SECS,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_address,
            cleanup_interval: Duration::from_secs(cleanup_interval.max(1)),
        })
    }
}
