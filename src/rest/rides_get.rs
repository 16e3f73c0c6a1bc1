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

//! API to list rides.

use crate::driver::Driver;
use crate::model::{Pagination, Ride};
use crate::rest::{EmptyBody, RestError, RestResult};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Query parameters accepted by this API.
#[derive(Deserialize, IntoParams, Serialize)]
pub(crate) struct RidesQuery {
    /// Number of rides to skip.  Only honored together with a positive `limit`.
    offset: Option<i64>,

    /// Maximum number of rides to return.  Zero or negative values return all rides.
    limit: Option<i64>,
}

/// Lists rides in ascending identifier order.
#[utoipa::path(
    get,
    path = "/rides",
    operation_id = "getRides",
    tag = "rides",
    params(RidesQuery),
    responses(
        (status = 200, description = "The selected rides or an error with code VALIDATION_ERROR, SERVER_ERROR or RIDES_NOT_FOUND_ERROR", body = [Ride]),
    ),
)]
pub(crate) async fn handler(
    State(driver): State<Driver>,
    query: Result<Query<RidesQuery>, QueryRejection>,
    _: EmptyBody,
) -> RestResult<impl IntoResponse> {
    let Query(query) = query.map_err(|e| RestError::InvalidRequest(e.body_text()))?;
    let page = Pagination::new(query.offset, query.limit)?;
    let rides = driver.get_rides(page).await?;
    Ok(Json(rides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use crate::rest::ErrorCode;
    use axum::http;

    fn route() -> (http::Method, String) {
        (http::Method::GET, "/rides".to_owned())
    }

    /// Extracts the rider names of `rides` for easy comparisons.
    fn rider_names(rides: &[Ride]) -> Vec<&str> {
        rides.iter().map(|r| r.rider_name().as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_error(ErrorCode::RidesNotFoundError, "^Could not find any rides$")
            .await;
    }

    #[tokio::test]
    async fn test_all_sorted() {
        let context = TestContext::setup().await;

        let mut exp_rides = vec![];
        for i in 1..=5 {
            exp_rides.push(context.put_ride(new_ride(i)).await);
        }

        let response = OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_json::<Vec<Ride>>()
            .await;
        assert_eq!(exp_rides, response);
    }

    #[tokio::test]
    async fn test_paginated() {
        let context = TestContext::setup().await;

        for i in 1..=5 {
            context.put_ride(new_ride(i)).await;
        }

        let response = OneShotBuilder::new(context.app(), route())
            .with_query(RidesQuery { offset: Some(1), limit: Some(2) })
            .send_empty()
            .await
            .expect_json::<Vec<Ride>>()
            .await;
        assert_eq!(vec!["Rider #2", "Rider #3"], rider_names(&response));

        let response = OneShotBuilder::new(context.app(), route())
            .with_query(RidesQuery { offset: None, limit: Some(3) })
            .send_empty()
            .await
            .expect_json::<Vec<Ride>>()
            .await;
        assert_eq!(vec!["Rider #1", "Rider #2", "Rider #3"], rider_names(&response));
    }

    #[tokio::test]
    async fn test_non_positive_limit_returns_all() {
        let context = TestContext::setup().await;

        for i in 1..=3 {
            context.put_ride(new_ride(i)).await;
        }

        for limit in [0, -1] {
            let response = OneShotBuilder::new(context.app(), route())
                .with_query(RidesQuery { offset: Some(2), limit: Some(limit) })
                .send_empty()
                .await
                .expect_json::<Vec<Ride>>()
                .await;
            assert_eq!(vec!["Rider #1", "Rider #2", "Rider #3"], rider_names(&response));
        }
    }

    #[tokio::test]
    async fn test_offset_past_the_end() {
        let context = TestContext::setup().await;

        context.put_ride(new_ride(1)).await;

        OneShotBuilder::new(context.app(), route())
            .with_query(RidesQuery { offset: Some(1), limit: Some(5) })
            .send_empty()
            .await
            .expect_error(ErrorCode::RidesNotFoundError, "^Could not find any rides$")
            .await;
    }

    #[tokio::test]
    async fn test_negative_offset() {
        let context = TestContext::setup().await;

        context.put_ride(new_ride(1)).await;

        OneShotBuilder::new(context.app(), route())
            .with_query(RidesQuery { offset: Some(-1), limit: Some(5) })
            .send_empty()
            .await
            .expect_error(ErrorCode::ValidationError, "Offset cannot be negative")
            .await;
    }

    #[tokio::test]
    async fn test_non_numeric_query() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route())
            .with_query([("limit", "ten")])
            .send_empty()
            .await
            .expect_error(ErrorCode::ValidationError, "^Failed to deserialize query string")
            .await;

        OneShotBuilder::new(context.app(), route())
            .with_query([("offset", "1.5"), ("limit", "2")])
            .send_empty()
            .await
            .expect_error(ErrorCode::ValidationError, "^Failed to deserialize query string")
            .await;
    }

    #[tokio::test]
    async fn test_server_error() {
        let context = TestContext::setup().await;
        context.break_storage().await;

        OneShotBuilder::new(context.app(), route())
            .send_empty()
            .await
            .expect_error(ErrorCode::ServerError, "^Unknown error$")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
