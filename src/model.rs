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

//! High-level data types.
//!
//! Every type in here can only be constructed with values that satisfy its domain constraints, so
//! holding an instance is proof that the validation rules have been applied.

use derive_getters::Getters;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Error raised when a value does not satisfy the constraints of a model type.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub(crate) struct ModelError(pub(crate) String);

/// Result type for this module.
pub(crate) type ModelResult<T> = Result<T, ModelError>;

/// Returns true if `v` is a latitude within `[-90, 90]`.
pub(crate) fn is_valid_latitude(v: f64) -> bool {
    (-90.0..=90.0).contains(&v)
}

/// Returns true if `v` is a longitude within `[-180, 180]`.
pub(crate) fn is_valid_longitude(v: f64) -> bool {
    (-180.0..=180.0).contains(&v)
}

/// Returns true if `v` has at least one character.  Whitespace counts.
pub(crate) fn is_non_empty_text(v: &str) -> bool {
    !v.is_empty()
}

/// A latitude in degrees, known to be within range.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "f64", into = "f64")]
pub(crate) struct Latitude(f64);

impl Latitude {
    /// Creates a latitude from an untrusted value `v`.
    pub(crate) fn new(v: f64) -> ModelResult<Self> {
        if !is_valid_latitude(v) {
            return Err(ModelError(format!("Latitude must be between -90 and 90 but got {}", v)));
        }
        Ok(Self(v))
    }

    /// Returns the latitude as a raw number.
    pub(crate) fn as_f64(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Latitude {
    type Error = ModelError;

    fn try_from(v: f64) -> ModelResult<Self> {
        Latitude::new(v)
    }
}

impl From<Latitude> for f64 {
    fn from(v: Latitude) -> Self {
        v.0
    }
}

/// A longitude in degrees, known to be within range.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "f64", into = "f64")]
pub(crate) struct Longitude(f64);

impl Longitude {
    /// Creates a longitude from an untrusted value `v`.
    pub(crate) fn new(v: f64) -> ModelResult<Self> {
        if !is_valid_longitude(v) {
            return Err(ModelError(format!("Longitude must be between -180 and 180 but got {}", v)));
        }
        Ok(Self(v))
    }

    /// Returns the longitude as a raw number.
    pub(crate) fn as_f64(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Longitude {
    type Error = ModelError;

    fn try_from(v: f64) -> ModelResult<Self> {
        Longitude::new(v)
    }
}

impl From<Longitude> for f64 {
    fn from(v: Longitude) -> Self {
        v.0
    }
}

/// A piece of text that is known to not be empty.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub(crate) struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new text value from an untrusted string `s`.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if !is_non_empty_text(&s) {
            return Err(ModelError("Text cannot be empty".to_owned()));
        }
        Ok(Self(s))
    }

    /// Returns a string view of the text.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NonEmptyText {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        NonEmptyText::new(s)
    }
}

impl From<NonEmptyText> for String {
    fn from(s: NonEmptyText) -> Self {
        s.0
    }
}

#[cfg(test)]
impl From<&'static str> for NonEmptyText {
    /// Creates a new text value from a hardcoded string, which must be valid.
    fn from(s: &'static str) -> Self {
        NonEmptyText::new(s).expect("Hardcoded text must be valid")
    }
}

/// Identifier of a ride as assigned by the database.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "i64", into = "i64")]
pub(crate) struct RideId(i64);

impl RideId {
    /// Creates a ride identifier from an untrusted value `id`.
    pub(crate) fn new(id: i64) -> ModelResult<Self> {
        if id <= 0 {
            return Err(ModelError(format!("Ride identifiers must be positive but got {}", id)));
        }
        Ok(Self(id))
    }

    /// Parses a ride identifier from an untrusted textual `token`, like one coming from a path.
    pub(crate) fn parse(token: &str) -> ModelResult<Self> {
        match token.parse::<i64>() {
            Ok(id) => RideId::new(id),
            Err(e) => Err(ModelError(format!("Invalid ride identifier '{}': {}", token, e))),
        }
    }

    /// Returns the identifier as the integer used by the database.
    pub(crate) fn as_i64(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for RideId {
    type Error = ModelError;

    fn try_from(id: i64) -> ModelResult<Self> {
        RideId::new(id)
    }
}

impl From<RideId> for i64 {
    fn from(id: RideId) -> Self {
        id.0
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contents of a ride that has passed validation but has not been stored yet.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub(crate) struct NewRide {
    /// Latitude where the ride started.
    start_lat: Latitude,

    /// Longitude where the ride started.
    start_long: Longitude,

    /// Latitude where the ride ended.
    end_lat: Latitude,

    /// Longitude where the ride ended.
    end_long: Longitude,

    /// Name of the person that took the ride.
    rider_name: NonEmptyText,

    /// Name of the person that drove the vehicle.
    driver_name: NonEmptyText,

    /// Description of the vehicle used for the ride.
    driver_vehicle: NonEmptyText,
}

/// A ride as stored in the database.
#[derive(Clone, Debug, Deserialize, Getters, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Ride {
    /// Identifier assigned to the ride when it was created.
    #[serde(rename = "rideID")]
    #[schema(value_type = i64, example = 1)]
    id: RideId,

    /// Latitude where the ride started.
    #[schema(value_type = f64, example = 13.7565)]
    start_lat: Latitude,

    /// Longitude where the ride started.
    #[schema(value_type = f64, example = 121.0583)]
    start_long: Longitude,

    /// Latitude where the ride ended.
    #[schema(value_type = f64, example = 14.6760)]
    end_lat: Latitude,

    /// Longitude where the ride ended.
    #[schema(value_type = f64, example = 121.0437)]
    end_long: Longitude,

    /// Name of the person that took the ride.
    #[schema(value_type = String, example = "Jane Doe")]
    rider_name: NonEmptyText,

    /// Name of the person that drove the vehicle.
    #[schema(value_type = String, example = "John Doe")]
    driver_name: NonEmptyText,

    /// Description of the vehicle used for the ride.
    #[schema(value_type = String, example = "Car")]
    driver_vehicle: NonEmptyText,
}

impl Ride {
    /// Attaches the database-assigned `id` to the contents of a `ride`.
    pub(crate) fn new(id: RideId, ride: NewRide) -> Self {
        Self {
            id,
            start_lat: ride.start_lat,
            start_long: ride.start_long,
            end_lat: ride.end_lat,
            end_long: ride.end_long,
            rider_name: ride.rider_name,
            driver_name: ride.driver_name,
            driver_vehicle: ride.driver_vehicle,
        }
    }
}

/// Window of rows to return when listing rides.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Pagination {
    /// Number of rows to skip.  Only meaningful when `limit` is set.
    offset: i64,

    /// Maximum number of rows to return, or `None` to return them all.
    limit: Option<i64>,
}

impl Pagination {
    /// Creates a pagination request from optional, untrusted `offset` and `limit` values.
    ///
    /// A missing or non-positive `limit` disables pagination altogether, in which case `offset` is
    /// ignored.
    pub(crate) fn new(offset: Option<i64>, limit: Option<i64>) -> ModelResult<Self> {
        match limit {
            Some(limit) if limit > 0 => {
                let offset = offset.unwrap_or(0);
                if offset < 0 {
                    return Err(ModelError(format!("Offset cannot be negative but got {}", offset)));
                }
                Ok(Self { offset, limit: Some(limit) })
            }
            _ => Ok(Self::all()),
        }
    }

    /// Returns a pagination request that covers all rows.
    pub(crate) fn all() -> Self {
        Self { offset: 0, limit: None }
    }

    /// Returns the number of rows to skip.
    pub(crate) fn offset(&self) -> i64 {
        self.offset
    }

    /// Returns the maximum number of rows to return, if any.
    pub(crate) fn limit(&self) -> Option<i64> {
        self.limit
    }
}
