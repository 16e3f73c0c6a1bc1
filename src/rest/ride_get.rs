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

//! API to get one ride.

use crate::driver::{Driver, RIDES_NOT_FOUND};
use crate::model::{Ride, RideId};
use crate::rest::{EmptyBody, RestError, RestResult};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use log::debug;

/// Gets the ride identified by the path, wrapped in a one-element array.
#[utoipa::path(
    get,
    path = "/rides/{id}",
    operation_id = "getRide",
    tag = "rides",
    params(("id" = i64, Path, description = "Identifier of the ride")),
    responses(
        (status = 200, description = "The matching ride or an error with code SERVER_ERROR or RIDES_NOT_FOUND_ERROR", body = [Ride]),
    ),
)]
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path(id): Path<String>,
    _: EmptyBody,
) -> RestResult<impl IntoResponse> {
    // Identifiers that do not parse cannot exist in the database.
    let id = match RideId::parse(&id) {
        Ok(id) => id,
        Err(e) => {
            debug!("Rejecting lookup by invalid id: {}", e);
            return Err(RestError::NotFound(RIDES_NOT_FOUND.to_owned()));
        }
    };

    let ride = driver.get_ride(id).await?;
    Ok(Json(vec![ride]))
}
