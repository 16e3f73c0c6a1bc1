// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Common utilities to interact with an SQLite database.

use crate::db::{Db, DbError, DbResult, Executor};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use log::warn;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Name of the database that SQLite keeps in memory.
pub const IN_MEMORY: &str = ":memory:";

/// Default number of connections to keep in the pool for on-disk databases.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub(crate) fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Options to establish a connection to an SQLite database.
#[derive(Clone, Debug, PartialEq)]
pub struct SqliteOptions {
    /// Path to the database file, or `:memory:` for a transient database.
    pub name: String,

    /// Maximum number of connections to keep in the pool.  Ignored for in-memory databases, which
    /// must always use a single connection.
    pub max_connections: u32,
}

impl SqliteOptions {
    /// Creates a set of options for an in-memory database.
    pub fn in_memory() -> Self {
        Self { name: IN_MEMORY.to_owned(), max_connections: 1 }
    }

    /// Creates a set of options from environment variables whose name is prefixed with the given
    /// `prefix`.
    ///
    /// This will use variables such as `<prefix>_NAME` and `<prefix>_MAX_CONNECTIONS`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            name: get_required_var::<String>(prefix, "NAME")?,
            max_connections: get_optional_var::<u32>(prefix, "MAX_CONNECTIONS")?
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
        })
    }

    /// Returns true if these options point to a database that only lives in memory.
    fn is_in_memory(&self) -> bool {
        self.name == IN_MEMORY || self.name == "sqlite::memory:"
    }
}

/// Opens a connection pool to the database described by `opts`.
pub async fn connect(opts: SqliteOptions) -> DbResult<SqliteDb> {
    let conn_opts =
        SqliteConnectOptions::from_str(&opts.name).map_err(map_sqlx_error)?.create_if_missing(true);

    // Every connection to an in-memory database sees a different database, so all callers must
    // share the same connection, and that connection must never be recycled.
    let max_connections = if opts.is_in_memory() { 1 } else { opts.max_connections.max(1) };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(conn_opts)
        .await
        .map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// A database instance backed by an SQLite database.
pub struct SqliteDb {
    /// Shared SQLite connection pool.  This is a cloneable type that all concurrent requests can
    /// use concurrently.
    pool: SqlitePool,
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("Dropping connection without having called close() first");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Executor(conn))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Helper function to initialize the database with a schema.
pub(crate) async fn run_schema(ex: &mut Executor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    Ok(())
}
