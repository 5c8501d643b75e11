//! Database connection and the bounded query gateway.

use std::sync::Arc;

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use switchy_database::{Database, Row};
use switchy_database_connection::Credentials;
use tokio::sync::{OnceCell, Semaphore, SemaphorePermit};

use crate::DbError;
use crate::statement::Statement;

/// Default number of queries allowed to run at once.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Connection settings for the backing `MySQL` database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Host name.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// User name.
    pub user: String,
    /// Password, if any.
    pub password: Option<String>,
    /// Database (schema) name.
    pub name: String,
    /// Maximum number of simultaneous queries.
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            name: "parking".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl DatabaseConfig {
    /// `host:port` address of the server.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Driver credentials. The fields are handed over as-is, so user names
    /// and passwords may contain URL delimiters such as `@`, `/` or `:`.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.host.clone(),
            Some(self.port),
            self.name.clone(),
            self.user.clone(),
            self.password.clone(),
        )
    }
}

/// Errors raised while opening the database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The driver failed to connect.
    #[error("Failed to connect to database: {0}")]
    Connect(String),
}

/// Opens a `MySQL` connection pool.
///
/// TLS is negotiated in the driver's preferred mode, which encrypts the
/// connection without verifying the server certificate.
///
/// # Errors
///
/// Returns [`ConnectError`] if the connection fails.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn Database>, ConnectError> {
    let db = switchy_database_connection::init_mysql_sqlx(config.credentials())
        .await
        .map_err(|e| ConnectError::Connect(e.to_string()))?;

    log::info!(
        "Connected to database {} at {}",
        config.name,
        config.address()
    );

    Ok(db)
}

type Connector =
    Box<dyn Fn() -> LocalBoxFuture<'static, Result<Box<dyn Database>, ConnectError>> + Send + Sync>;

enum Connection {
    Ready(Arc<dyn Database>),
    Lazy {
        connector: Connector,
        db: OnceCell<Arc<dyn Database>>,
    },
}

/// Shared database handle that bounds the number of in-flight queries.
///
/// When all permits are taken, further queries wait for one to free up
/// instead of failing. After [`Self::close`], waiting and new queries fail
/// with [`DbError::PoolClosed`].
///
/// A gateway built with [`Self::lazy`] or [`Self::connecting_to`] opens its
/// connection on the first query. A failed attempt is reported to that
/// query as [`DbError::Connect`] and retried by the next one.
pub struct DatabaseGateway {
    connection: Connection,
    permits: Arc<Semaphore>,
    pool_size: usize,
}

impl DatabaseGateway {
    /// Wraps an open connection, allowing at most `pool_size` concurrent
    /// queries. A size of 0 is treated as 1.
    #[must_use]
    pub fn new(db: Box<dyn Database>, pool_size: usize) -> Self {
        Self::with_connection(Connection::Ready(Arc::from(db)), pool_size)
    }

    /// Gateway that connects through `connector` when first used.
    #[must_use]
    pub fn lazy<F, Fut>(connector: F, pool_size: usize) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Box<dyn Database>, ConnectError>> + 'static,
    {
        let connector: Connector = Box::new(move || connector().boxed_local());
        Self::with_connection(
            Connection::Lazy {
                connector,
                db: OnceCell::new(),
            },
            pool_size,
        )
    }

    /// Gateway that connects to the `MySQL` database in `config` when first
    /// used.
    #[must_use]
    pub fn connecting_to(config: DatabaseConfig) -> Self {
        let pool_size = config.pool_size;
        Self::lazy(
            move || {
                let config = config.clone();
                async move { connect(&config).await }
            },
            pool_size,
        )
    }

    fn with_connection(connection: Connection, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            connection,
            permits: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    /// Configured concurrency bound.
    #[must_use]
    pub const fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, DbError> {
        self.permits.acquire().await.map_err(|_| DbError::PoolClosed)
    }

    async fn database(&self) -> Result<&Arc<dyn Database>, DbError> {
        match &self.connection {
            Connection::Ready(db) => Ok(db),
            Connection::Lazy { connector, db } => Ok(db
                .get_or_try_init(|| async {
                    connector().await.map(Arc::<dyn Database>::from)
                })
                .await?),
        }
    }

    /// Runs a statement and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the gateway is closed, the connection cannot
    /// be opened, or the query fails.
    pub async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DbError> {
        let _permit = self.acquire().await?;
        let db = self.database().await?;
        let params = statement.database_values();
        Ok(db.query_raw_params(&statement.sql, &params).await?)
    }

    /// Runs `setup` statements and then `statement` on one pinned
    /// connection, so session variables set by `setup` apply to the query.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the gateway is closed, the connection cannot
    /// be opened, or any statement fails.
    pub async fn query_in_session(
        &self,
        setup: &[String],
        statement: &Statement,
    ) -> Result<Vec<Row>, DbError> {
        let _permit = self.acquire().await?;
        let db = self.database().await?;
        let params = statement.database_values();

        let tx = db.begin_transaction().await?;

        let outcome = async {
            for sql in setup {
                tx.exec_raw(sql).await?;
            }
            Ok::<_, DbError>(tx.query_raw_params(&statement.sql, &params).await?)
        }
        .await;

        match outcome {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    log::warn!("Failed to roll back read-only session: {rollback}");
                }
                Err(e)
            }
        }
    }

    /// Stops accepting queries. Queries already running finish normally;
    /// the connection pool itself is released when the last handle drops.
    pub fn close(&self) {
        if self.is_closed() {
            return;
        }
        self.permits.close();
        log::info!("Database gateway closed");
    }
}
