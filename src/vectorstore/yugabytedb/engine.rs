use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};

use super::YugabyteDBError;

/// Connection pool to a YugabyteDB YSQL endpoint.
#[derive(Clone, Debug)]
pub struct YugabyteDBEngine {
    pool: PgPool,
}

impl YugabyteDBEngine {
    pub fn builder() -> YugabyteDBEngineBuilder {
        YugabyteDBEngineBuilder::default()
    }

    /// Wraps a pool created elsewhere.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await
    }
}

pub struct YugabyteDBEngineBuilder {
    host: String,
    port: u16,
    database: String,
    user: String,
    password: SecretString,
    ssl: bool,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl Default for YugabyteDBEngineBuilder {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5433,
            database: "yugabyte".to_string(),
            user: "yugabyte".to_string(),
            password: SecretString::from(String::new()),
            ssl: false,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl YugabyteDBEngineBuilder {
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// YSQL listens on 5433 by default.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = SecretString::from(password.to_string());
        self
    }

    /// Requires TLS when set.
    pub fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    fn options(&self) -> Result<(PgPoolOptions, PgConnectOptions), YugabyteDBError> {
        if self.max_connections == 0 {
            return Err(YugabyteDBError::InvalidConfiguration(
                "max_connections must be positive".to_string(),
            ));
        }
        let connect = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(self.password.expose_secret())
            .ssl_mode(if self.ssl {
                PgSslMode::Require
            } else {
                PgSslMode::Prefer
            });
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);
        Ok((pool, connect))
    }

    /// Opens the pool and checks that the database is reachable.
    pub async fn connect(self) -> Result<YugabyteDBEngine, YugabyteDBError> {
        let (pool, connect) = self.options()?;
        log::debug!(
            "Connecting to YugabyteDB at {}:{}/{}",
            self.host,
            self.port,
            self.database
        );
        let pool = pool.connect_with(connect).await?;
        Ok(YugabyteDBEngine { pool })
    }

    /// Creates the pool without connecting; connections open on first use.
    pub fn connect_lazy(self) -> Result<YugabyteDBEngine, YugabyteDBError> {
        let (pool, connect) = self.options()?;
        Ok(YugabyteDBEngine {
            pool: pool.connect_lazy_with(connect),
        })
    }
}
