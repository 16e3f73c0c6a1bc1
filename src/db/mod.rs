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

//! Database abstraction in terms of the operations needed by the server.
//!
//! The database handle is an explicit object: callers open it with `sqlite::connect`, hand it to
//! the `Driver` and close it once the server stops.  Operations in this module take an `Executor`
//! obtained from that handle and never keep any state of their own.

use crate::model::*;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection};

pub mod sqlite;
use sqlite::map_sqlx_error;

/// Database errors.  Any unexpected errors that come from the database are classified as
/// `BackendError`, but errors we know about have more specific types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// Indicates that a request to create an entry failed because it already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Indicates that the database is not available (maybe because it has been closed or because
    /// all connections are busy).
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// A database executor backed by a connection taken from the pool.  The connection goes back to
/// the pool when the executor is dropped.
pub struct Executor(PoolConnection<Sqlite>);

impl Executor {
    /// Returns the raw connection to issue `sqlx` queries against.
    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.0
    }
}

/// Abstraction over the database connection.
#[async_trait]
pub trait Db {
    /// Obtains an executor for direct access to the pool.
    ///
    /// This would be better called `executor` but this method is used so frequently that it makes
    /// call sites too verbose.
    async fn ex(&self) -> DbResult<Executor>;

    /// Closes the database, waiting for all outstanding connections to be returned.
    async fn close(&self);
}

/// Initializes the database schema.  Safe to call on an already-initialized database.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    sqlite::run_schema(ex, include_str!("sqlite.sql")).await
}

impl TryFrom<SqliteRow> for Ride {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("rideID").map_err(map_sqlx_error)?;
        let start_lat: f64 = row.try_get("startLat").map_err(map_sqlx_error)?;
        let start_long: f64 = row.try_get("startLong").map_err(map_sqlx_error)?;
        let end_lat: f64 = row.try_get("endLat").map_err(map_sqlx_error)?;
        let end_long: f64 = row.try_get("endLong").map_err(map_sqlx_error)?;
        let rider_name: String = row.try_get("riderName").map_err(map_sqlx_error)?;
        let driver_name: String = row.try_get("driverName").map_err(map_sqlx_error)?;
        let driver_vehicle: String = row.try_get("driverVehicle").map_err(map_sqlx_error)?;

        let ride = NewRide::new(
            Latitude::new(start_lat)?,
            Longitude::new(start_long)?,
            Latitude::new(end_lat)?,
            Longitude::new(end_long)?,
            NonEmptyText::new(rider_name)?,
            NonEmptyText::new(driver_name)?,
            NonEmptyText::new(driver_vehicle)?,
        );
        Ok(Ride::new(RideId::new(id)?, ride))
    }
}

/// Checks that an insertion touched exactly one row given the `affected` count.
fn expect_one_row(affected: u64) -> DbResult<()> {
    if affected != 1 {
        return Err(DbError::BackendError(format!("Insertion affected {} rows", affected)));
    }
    Ok(())
}

/// Stores a new `ride` and returns the identifier that the database assigned to it.
pub(crate) async fn create_ride(ex: &mut Executor, ride: &NewRide) -> DbResult<RideId> {
    let query_str = "
        INSERT INTO Rides
            (startLat, startLong, endLat, endLong, riderName, driverName, driverVehicle)
        VALUES (?, ?, ?, ?, ?, ?, ?)";
    let done = sqlx::query(query_str)
        .bind(ride.start_lat().as_f64())
        .bind(ride.start_long().as_f64())
        .bind(ride.end_lat().as_f64())
        .bind(ride.end_long().as_f64())
        .bind(ride.rider_name().as_str())
        .bind(ride.driver_name().as_str())
        .bind(ride.driver_vehicle().as_str())
        .execute(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    expect_one_row(done.rows_affected())?;
    Ok(RideId::new(done.last_insert_rowid())?)
}

/// Gets the ride identified by `id`.
pub(crate) async fn get_ride(ex: &mut Executor, id: RideId) -> DbResult<Ride> {
    let query_str = "SELECT * FROM Rides WHERE rideID = ?";
    let row = sqlx::query(query_str)
        .bind(id.as_i64())
        .fetch_one(ex.conn())
        .await
        .map_err(map_sqlx_error)?;
    Ride::try_from(row)
}

/// Gets the rides selected by `page`, sorted by their identifiers.
pub(crate) async fn get_rides(ex: &mut Executor, page: &Pagination) -> DbResult<Vec<Ride>> {
    let query = match page.limit() {
        Some(limit) => sqlx::query("SELECT * FROM Rides ORDER BY rideID LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(page.offset()),
        None => sqlx::query("SELECT * FROM Rides ORDER BY rideID"),
    };
    let rows = query.fetch_all(ex.conn()).await.map_err(map_sqlx_error)?;

    let mut rides = Vec::with_capacity(rows.len());
    for row in rows {
        rides.push(Ride::try_from(row)?);
    }
    Ok(rides)
}

/// Deletes all rides and returns how many there were.  Only meant for administrative purposes.
pub async fn delete_rides(ex: &mut Executor) -> DbResult<u64> {
    let done = sqlx::query("DELETE FROM Rides").execute(ex.conn()).await.map_err(map_sqlx_error)?;
    Ok(done.rows_affected())
}
