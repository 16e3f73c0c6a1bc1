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

//! Operations on the collection of rides.

use crate::db;
use crate::driver::{Driver, DriverError, DriverResult, RIDES_NOT_FOUND};
use crate::model::*;

impl Driver {
    /// Gets the rides selected by `page` in ascending identifier order.
    ///
    /// An empty selection is reported as `NotFound`, whether the store is empty or the page falls
    /// past its end.
    pub(crate) async fn get_rides(self, page: Pagination) -> DriverResult<Vec<Ride>> {
        let rides = db::get_rides(&mut self.db.ex().await?, &page).await?;
        if rides.is_empty() {
            return Err(DriverError::NotFound(RIDES_NOT_FOUND.to_owned()));
        }
        Ok(rides)
    }
}
