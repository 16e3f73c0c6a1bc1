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

//! Operations on one ride.

use crate::db::{self, DbError};
use crate::driver::{Driver, DriverError, DriverResult, RIDES_NOT_FOUND};
use crate::model::*;

impl Driver {
    /// Stores a validated `ride` and returns it as persisted, including its new identifier.
    pub(crate) async fn create_ride(self, ride: NewRide) -> DriverResult<Ride> {
        let mut ex = self.db.ex().await?;
        let id = db::create_ride(&mut ex, &ride).await?;
        match db::get_ride(&mut ex, id).await {
            Ok(ride) => Ok(ride),
            Err(DbError::NotFound) => {
                Err(DriverError::BackendError(format!("Ride {} vanished after its creation", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Gets the ride identified by `id`.
    pub(crate) async fn get_ride(self, id: RideId) -> DriverResult<Ride> {
        match db::get_ride(&mut self.db.ex().await?, id).await {
            Ok(ride) => Ok(ride),
            Err(DbError::NotFound) => Err(DriverError::NotFound(RIDES_NOT_FOUND.to_owned())),
            Err(e) => Err(e.into()),
        }
    }
}
