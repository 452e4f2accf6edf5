//! PostgreSQL connection plumbing.
//!
//! Two ways in: a `deadpool-postgres` pool built from the structured
//! connection parameters (used by the query service and the loader), and a
//! one-off client opened from the connection URL (used by the connection
//! check, so both configuration paths get exercised).

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use serde::Serialize;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::{
    config::DatabaseConfig,
    error::{QueryError, connection_error, database_error},
    sql
};

/// Server facts reported by the connection check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub version:  String,
    pub database: String,
    pub user:     String
}

/// Build a pool; no connection is opened until the first checkout
pub fn build_pool(db: &DatabaseConfig) -> Result<Pool, QueryError> {
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast
    };
    let mgr = Manager::from_config(db.pg_config(), NoTls, mgr_config);
    Pool::builder(mgr)
        .max_size(db.pool_size.max(1))
        .build()
        .map_err(|e| connection_error(format!("pool creation failed: {}", e)))
}

/// Open a standalone client from the connection URL
pub async fn connect_url(db: &DatabaseConfig) -> Result<Client, QueryError> {
    debug!(url = %db.redacted_url(), "opening direct connection");
    let (client, connection) = tokio_postgres::connect(&db.database_url(), NoTls)
        .await
        .map_err(connection_error)?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!(error = %e, "postgres connection closed with error");
        }
    });
    Ok(client)
}

/// `SELECT version()`
pub async fn server_version(client: &Client) -> Result<String, QueryError> {
    let row = client
        .query_one(sql::SERVER_VERSION, &[])
        .await
        .map_err(database_error)?;
    row.try_get(0).map_err(database_error)
}

/// `(current_database(), current_user)`
pub async fn session_identity(client: &Client) -> Result<(String, String), QueryError> {
    let row = client
        .query_one(sql::SESSION_IDENTITY, &[])
        .await
        .map_err(database_error)?;
    let database = row.try_get(0).map_err(database_error)?;
    let user = row.try_get(1).map_err(database_error)?;
    Ok((database, user))
}

/// Full connection check: version over the URL, identity over the pool
pub async fn check_connection(db: &DatabaseConfig) -> Result<ServerInfo, QueryError> {
    let direct = connect_url(db).await?;
    let version = server_version(&direct).await?;
    let pool = build_pool(db)?;
    let pooled = pool.get().await.map_err(connection_error)?;
    let (database, user) = session_identity(&pooled).await?;
    Ok(ServerInfo {
        version,
        database,
        user
    })
}
