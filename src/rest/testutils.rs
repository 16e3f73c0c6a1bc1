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

//! Test utilities for the REST layer.

use crate::clocks::{Clock, SystemClock};
use crate::db::{self, Db, Executor};
use crate::driver::Driver;
use crate::model::*;
use crate::rest::{app, ErrorCode, ErrorResponse, RateLimiter, RateLimiterOptions};
use axum::extract::{ConnectInfo, Request};
use axum::http::{self, HeaderName, HeaderValue};
use axum::response::Response;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Maximum body size for testing purposes.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Builder for a single request to the API server.
#[must_use]
pub(crate) struct OneShotBuilder {
    /// The router for the app being tested.
    app: Router,

    /// Builder for the request that will be sent to the app.
    builder: http::request::Builder,
}

impl OneShotBuilder {
    /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
    pub(crate) fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
        let builder = Request::builder().method(method).uri(uri.as_ref());
        Self { app, builder }
    }

    /// Extends the URI in the request with a `query`.
    pub(crate) fn with_query<Q: Serialize>(mut self, query: Q) -> Self {
        let uri = self.builder.uri_ref().unwrap().to_string();
        assert!(!uri.contains('?'), "URI already contains a query: {}", uri);
        self.builder =
            self.builder.uri(format!("{}?{}", uri, serde_urlencoded::to_string(query).unwrap()));
        self
    }

    /// Sets the header `name` to `value` in the outgoing request.
    pub(crate) fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Makes the request look as if it came from a connection with the `peer` address.
    pub(crate) fn with_connect_info(mut self, peer: SocketAddr) -> Self {
        self.builder = self.builder.extension(ConnectInfo(peer));
        self
    }

    /// Finishes building the request and sends it with an empty payload.
    pub(crate) async fn send_empty(self) -> ResponseChecker {
        let request = self.builder.body(axum::body::Body::empty()).unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a text payload.
    pub(crate) async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
            .body(axum::body::Body::from(text.into()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a `body` payload without setting any
    /// content type on its own.
    pub(crate) async fn send_untyped<T: Into<String>>(self, body: T) -> ResponseChecker {
        let request = self.builder.body(axum::body::Body::from(body.into())).unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a JSON payload.
    pub(crate) async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }
}

/// Validator for the outcome of a request sent by a `OneShotBuilder`.
#[must_use]
pub(crate) struct ResponseChecker {
    /// Actual response that we received from the app.
    response: Response,

    /// Expected HTTP status code in the response above.
    exp_status: http::StatusCode,
}

impl From<Response> for ResponseChecker {
    fn from(response: Response) -> Self {
        Self { response, exp_status: http::StatusCode::OK }
    }
}

impl ResponseChecker {
    /// Sets the expected exit HTTP status to `status`.
    pub(crate) fn expect_status(mut self, status: http::StatusCode) -> Self {
        self.exp_status = status;
        self
    }

    /// Performs common validation operations on the response.
    fn verify(&self) {
        assert_eq!(self.exp_status, self.response.status());
    }

    /// Consumes the response and returns its body as raw bytes.
    async fn take_body(self) -> Vec<u8> {
        self.verify();
        axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap().to_vec()
    }

    /// Finishes checking the response and expects its body to be an `ErrorResponse` with the
    /// `exp_code` classification and a message that matches `exp_re`.
    pub(crate) async fn expect_error(self, exp_code: ErrorCode, exp_re: &str) {
        let body = self.take_body().await;
        let response: ErrorResponse = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(e) => {
                let body = String::from_utf8(body).unwrap();
                panic!("Invalid error response due to {}; content was {}", e, body);
            }
        };
        assert_eq!(exp_code, response.error_code, "Unexpected error in {:?}", response);
        let re = regex::Regex::new(exp_re).unwrap();
        assert!(
            re.is_match(&response.message),
            "Response content '{:?}' does not match re '{}'",
            response,
            exp_re
        );
    }

    /// Finishes checking the response and expects it to contain a valid JSON object of
    /// type `T`.
    pub(crate) async fn expect_json<T: DeserializeOwned>(self) -> T {
        let body = self.take_body().await;
        match serde_json::from_slice::<T>(&body) {
            Ok(value) => value,
            Err(e) => {
                let body = String::from_utf8(body).unwrap();
                panic!("Invalid JSON response due to {}; content was {}", e, body);
            }
        }
    }

    /// Finishes checking the response and expects its body to be valid UTF-8 and to match
    /// `exp_re`.
    pub(crate) async fn expect_text(self, exp_re: &str) {
        assert!(!exp_re.is_empty(), "Use expect_json to validate structured responses");

        let body = String::from_utf8(self.take_body().await).unwrap();
        assert!(
            !body.contains("\"error_code\":"),
            "Use expect_error to validate errors wrapped in an ErrorResponse"
        );
        let re = regex::Regex::new(exp_re).unwrap();
        assert!(re.is_match(&body), "Body content '{}' does not match re '{}'", body, exp_re);
    }
}

/// Generates a test to verify that an API that expects a JSON object ignores payloads of other
/// types and rejects broken JSON.
macro_rules! test_payload_must_be_json {
    ( $app:expr, $route:expr ) => {
        #[tokio::test]
        async fn test_payload_must_be_json() {
            $crate::rest::testutils::OneShotBuilder::new($app, $route)
                .send_text("this is not json")
                .await
                .expect_error($crate::rest::ErrorCode::ValidationError, ".+")
                .await;

            $crate::rest::testutils::OneShotBuilder::new($app, $route)
                .with_header(axum::http::header::CONTENT_TYPE, "application/json")
                .send_untyped("this is not json")
                .await
                .expect_status(axum::http::StatusCode::BAD_REQUEST)
                .expect_text("expected ident")
                .await;
        }
    };
}

pub(crate) use test_payload_must_be_json;

/// Generates a test to verify that an API that does not expect a payload fails as necessary.
macro_rules! test_payload_must_be_empty {
    ( $app:expr, $route:expr ) => {
        #[tokio::test]
        async fn test_payload_must_be_empty() {
            $crate::rest::testutils::OneShotBuilder::new($app, $route)
                .send_text("should not be here")
                .await
                .expect_error($crate::rest::ErrorCode::ValidationError, "should be empty")
                .await;
        }
    };
}

pub(crate) use test_payload_must_be_empty;

/// State of a running test for the REST layer.
pub(crate) struct TestContext {
    /// Database backing the app, for direct access from the tests.
    db: Arc<dyn Db + Send + Sync>,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Sets up an app backed by a clean in-memory database and a rate limiter that tests cannot
    /// exhaust.
    pub(crate) async fn setup() -> Self {
        let opts = RateLimiterOptions { max_requests: u32::MAX, ..Default::default() };
        Self::setup_with_rate_limit(opts, Arc::new(SystemClock::default())).await
    }

    /// Sets up an app backed by a clean in-memory database and a rate limiter configured with
    /// `opts` and driven by `clock`.
    pub(crate) async fn setup_with_rate_limit(
        opts: RateLimiterOptions,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let db: Arc<dyn Db + Send + Sync> = Arc::new(db::testutils::setup().await);
        let app = app(Driver::new(db.clone()), RateLimiter::new(opts, clock));
        Self { db, app }
    }

    /// Returns a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Obtains an executor against the test database.
    ///
    /// The in-memory database only has one connection, so the returned executor must be dropped
    /// before sending any request to the app.
    async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Stores a ride directly in the database and returns it.
    pub(crate) async fn put_ride(&self, ride: NewRide) -> Ride {
        let id = db::create_ride(&mut self.ex().await, &ride).await.unwrap();
        Ride::new(id, ride)
    }

    /// Returns all rides in the database, bypassing the app.
    pub(crate) async fn get_rides(&self) -> Vec<Ride> {
        db::get_rides(&mut self.ex().await, &Pagination::all()).await.unwrap()
    }

    /// Makes the ride storage unusable so that any request touching it fails.
    pub(crate) async fn break_storage(&self) {
        db::testutils::break_schema(&mut self.ex().await).await;
    }
}

/// Builds a valid ride whose text fields are all derived from `n`.
pub(crate) fn new_ride(n: u32) -> NewRide {
    NewRide::new(
        Latitude::new(13.7565).unwrap(),
        Longitude::new(121.0583).unwrap(),
        Latitude::new(14.676).unwrap(),
        Longitude::new(121.0437).unwrap(),
        NonEmptyText::new(format!("Rider #{}", n)).unwrap(),
        NonEmptyText::new(format!("Driver #{}", n)).unwrap(),
        NonEmptyText::new(format!("Vehicle #{}", n)).unwrap(),
    )
}
