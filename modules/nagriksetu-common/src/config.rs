use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

/// Where tickets are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store. Tickets are lost on restart.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Postgres connection settings, either a full URL or the discrete
/// `DB_*` variables the deployment scripts set.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseConfig::Url(_) => f.write_str("DatabaseConfig::Url(<redacted>)"),
            DatabaseConfig::Parts {
                host, port, user, name, ..
            } => f
                .debug_struct("DatabaseConfig::Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub database: Option<DatabaseConfig>,
    pub db_max_connections: u32,
    pub store_timeout: Duration,

    // Web server
    pub host: String,
    pub port: u16,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig::Url(url)),
            None => match (get("DB_HOST"), get("DB_USER"), get("DB_NAME")) {
                (Some(host), Some(user), Some(name)) => Some(DatabaseConfig::Parts {
                    host,
                    port: parse_or(get("DB_PORT"), "DB_PORT", 5432)?,
                    user,
                    password: get("DB_PASSWORD").unwrap_or_default(),
                    name,
                }),
                _ => None,
            },
        };

        let store = match get("NAGRIKSETU_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("NAGRIKSETU_STORE must be 'postgres' or 'memory', got '{other}'"),
        };

        if store == StoreBackend::Postgres && database.is_none() {
            return Err(anyhow!(
                "DATABASE_URL (or DB_HOST, DB_USER and DB_NAME) is required \
                 unless NAGRIKSETU_STORE=memory"
            ));
        }

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("LOG_FORMAT must be 'text' or 'json', got '{other}'"),
        };

        let timeout_ms: u64 = parse_or(get("STORE_TIMEOUT_MS"), "STORE_TIMEOUT_MS", 5_000)?;
        if timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be greater than zero");
        }

        Ok(Self {
            store,
            database,
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            store_timeout: Duration::from_millis(timeout_ms),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 5000)?,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log the loaded settings. Secrets appear only as short previews.
    pub fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  NAGRIKSETU_STORE: {:?}", self.store);
        match &self.database {
            Some(DatabaseConfig::Url(url)) => tracing::info!("  DATABASE_URL: {}", preview(url)),
            Some(DatabaseConfig::Parts {
                host, port, user, name, ..
            }) => tracing::info!("  DB: {user}@{host}:{port}/{name}"),
            None => tracing::info!("  DATABASE_URL: <not set>"),
        }
        tracing::info!("  STORE_TIMEOUT_MS: {}", self.store_timeout.as_millis());
        tracing::info!("  DB_MAX_CONNECTIONS: {}", self.db_max_connections);
        tracing::info!("  HOST/PORT: {}", self.bind_addr());
    }
}

/// First five characters and the total character count.
fn preview(val: &str) -> String {
    let n = val.chars().take(5).map(char::len_utf8).sum::<usize>();
    format!("{}...({} chars)", &val[..n], val.chars().count())
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v.parse().with_context(|| format!("{key} must be a number, got '{v}'")),
        None => Ok(default),
    }
}
