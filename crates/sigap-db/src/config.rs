//! Store connection parameters resolved from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PGHOST` | `localhost` |
//! | `PGPORT` | `5432` |
//! | `PGUSER` | `postgres` |
//! | `PGPASSWORD` | `postgres` |
//! | `PGDATABASE` | `sigap2025` |
//! | `PG_MAX_CONNECTIONS` | `10` |
//! | `PG_CONNECT_TIMEOUT_SECS` | `30` |

use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use tracing::warn;

use sigap_core::defaults::{PG_DATABASE, PG_HOST, PG_PASSWORD, PG_PORT, PG_USER};

use crate::pool::{PoolConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS};

/// Connection parameters shared by the pool and the external importer.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    /// How long to wait for a pooled connection.
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: PG_HOST.to_string(),
            port: PG_PORT,
            user: PG_USER.to_string(),
            password: PG_PASSWORD.to_string(),
            database: PG_DATABASE.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

// Password stays out of Debug output (and therefore out of logs).
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ConnectionConfig {
    /// Read `PG*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let port = match lookup("PGPORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(
                    subsystem = "database",
                    component = "config",
                    value = %raw,
                    "Invalid PGPORT, using default"
                );
                defaults.port
            }),
            None => defaults.port,
        };
        let max_connections = lookup("PG_MAX_CONNECTIONS")
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|n: &u32| *n > 0)
            .unwrap_or(defaults.max_connections);
        let connect_timeout = lookup("PG_CONNECT_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout);

        Self {
            host: lookup("PGHOST").unwrap_or(defaults.host),
            port,
            user: lookup("PGUSER").unwrap_or(defaults.user),
            password: lookup("PGPASSWORD").unwrap_or(defaults.password),
            database: lookup("PGDATABASE").unwrap_or(defaults.database),
            max_connections,
            connect_timeout,
        }
    }

    /// Pool sizing and timeouts derived from these settings.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::default()
            .max_connections(self.max_connections)
            .connect_timeout(self.connect_timeout)
    }

    /// sqlx connect options for the pool.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// GDAL `PG:` datasource string, without the password.
    ///
    /// The password is handed to the converter through `PGPASSWORD` so it
    /// never shows up in the process table.
    pub fn ogr_datasource(&self) -> String {
        format!(
            "PG:host={} port={} user={} dbname={}",
            conninfo_value(&self.host),
            self.port,
            conninfo_value(&self.user),
            conninfo_value(&self.database),
        )
    }
}

/// Quote a libpq conninfo value: single quotes, with `\` and `'` escaped.
fn conninfo_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
