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

//! API to create a ride.

use crate::driver::Driver;
use crate::model::*;
use crate::rest::{JsonObject, RestError, RestResult};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::value::RawValue;
use utoipa::ToSchema;

/// Untyped value of a field in the request, as clients may send numbers as strings and vice versa.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawField {
    /// A JSON number.
    Number(f64),

    /// A JSON string.
    Text(String),

    /// Any other JSON value, which is never valid.
    Other(serde_json::Value),
}

impl RawField {
    /// Interprets a field as received in the request.  Values that cannot be represented, such as
    /// numbers beyond the range of an `f64`, yield `None` and are thus invalid.
    fn parse(raw: Option<Box<RawValue>>) -> Option<RawField> {
        raw.and_then(|raw| serde_json::from_str(raw.get()).ok())
    }

    /// Coerces the field to a coordinate.  Strings must hold a finite decimal number after
    /// trimming surrounding whitespace.
    fn as_coordinate(&self) -> Option<f64> {
        match self {
            RawField::Number(v) => Some(*v),
            RawField::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            RawField::Other(_) => None,
        }
    }

    /// Coerces the field to a piece of text.  Only strings qualify.
    fn into_text(self) -> Option<String> {
        match self {
            RawField::Text(s) => Some(s),
            RawField::Number(_) | RawField::Other(_) => None,
        }
    }
}

/// Message returned when the start coordinates are invalid.
const INVALID_START: &str =
    "Start latitude and longitude must be between -90 - 90 and -180 to 180 degrees respectively";

/// Message returned when the end coordinates are invalid.
const INVALID_END: &str =
    "End latitude and longitude must be between -90 - 90 and -180 to 180 degrees respectively";

/// Message returned when the rider name is invalid.
const INVALID_RIDER_NAME: &str = "Rider name must be a non empty string";

/// Message returned when the driver name is invalid.
const INVALID_DRIVER_NAME: &str = "Driver name must be a non empty string";

/// Message returned when the driver vehicle is invalid.
const INVALID_DRIVER_VEHICLE: &str = "Driver vehicle must be a non empty string";

/// Message sent by the client to create a ride.
///
/// Fields are kept raw until validation so that any value the client sends, even one that does not
/// fit the expected type, reaches the validation rules.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct RidesPostRequest {
    /// Latitude where the ride started, between -90 and 90.
    #[schema(value_type = f64, example = 13.7565)]
    start_lat: Option<Box<RawValue>>,

    /// Longitude where the ride started, between -180 and 180.
    #[schema(value_type = f64, example = 121.0583)]
    start_long: Option<Box<RawValue>>,

    /// Latitude where the ride ended, between -90 and 90.
    #[schema(value_type = f64, example = 14.6760)]
    end_lat: Option<Box<RawValue>>,

    /// Longitude where the ride ended, between -180 and 180.
    #[schema(value_type = f64, example = 121.0437)]
    end_long: Option<Box<RawValue>>,

    /// Name of the person that took the ride.
    #[schema(value_type = String, example = "Jane Doe")]
    rider_name: Option<Box<RawValue>>,

    /// Name of the person that drove the vehicle.
    #[schema(value_type = String, example = "John Doe")]
    driver_name: Option<Box<RawValue>>,

    /// Description of the vehicle used for the ride.
    #[schema(value_type = String, example = "Car")]
    driver_vehicle: Option<Box<RawValue>>,
}

/// Validates a pair of raw coordinates, returning `None` if either is unacceptable.
fn coordinates(
    lat: Option<Box<RawValue>>,
    long: Option<Box<RawValue>>,
) -> Option<(Latitude, Longitude)> {
    let lat = RawField::parse(lat)?.as_coordinate().and_then(|v| Latitude::new(v).ok())?;
    let long = RawField::parse(long)?.as_coordinate().and_then(|v| Longitude::new(v).ok())?;
    Some((lat, long))
}

/// Validates a raw text field, returning `message` as the error if it is unacceptable.
fn text(field: Option<Box<RawValue>>, message: &str) -> RestResult<NonEmptyText> {
    RawField::parse(field)
        .and_then(RawField::into_text)
        .and_then(|s| NonEmptyText::new(s).ok())
        .ok_or_else(|| RestError::InvalidRequest(message.to_owned()))
}

impl TryFrom<RidesPostRequest> for NewRide {
    type Error = RestError;

    /// Applies the validation rules in order and reports the first violation only.
    fn try_from(request: RidesPostRequest) -> RestResult<Self> {
        let (start_lat, start_long) = coordinates(request.start_lat, request.start_long)
            .ok_or_else(|| RestError::InvalidRequest(INVALID_START.to_owned()))?;
        let (end_lat, end_long) = coordinates(request.end_lat, request.end_long)
            .ok_or_else(|| RestError::InvalidRequest(INVALID_END.to_owned()))?;
        let rider_name = text(request.rider_name, INVALID_RIDER_NAME)?;
        let driver_name = text(request.driver_name, INVALID_DRIVER_NAME)?;
        let driver_vehicle = text(request.driver_vehicle, INVALID_DRIVER_VEHICLE)?;
        Ok(NewRide::new(
            start_lat,
            start_long,
            end_lat,
            end_long,
            rider_name,
            driver_name,
            driver_vehicle,
        ))
    }
}

/// Creates a ride and returns it, with its new identifier, wrapped in a one-element array.
#[utoipa::path(
    post,
    path = "/rides",
    operation_id = "createRide",
    tag = "rides",
    request_body = RidesPostRequest,
    responses(
        (status = 200, description = "The created ride or an error with code VALIDATION_ERROR or SERVER_ERROR", body = [Ride]),
    ),
)]
pub(crate) async fn handler(
    State(driver): State<Driver>,
    JsonObject(request): JsonObject<RidesPostRequest>,
) -> RestResult<impl IntoResponse> {
    let ride = NewRide::try_from(request)?;
    let ride = driver.create_ride(ride).await?;
    Ok(Json(vec![ride]))
}
