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

//! REST service to record and look up rides.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use crate::clocks::SystemClock;
use crate::db::Db;
use crate::driver::Driver;
use crate::rest::{app, RateLimiter};
use log::info;
use std::error::Error;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod clocks;
pub mod db;
mod driver;
pub mod env;
pub mod logging;
mod model;
mod rest;
pub use rest::RateLimiterOptions;

/// Serves the application on `bind_addr` using `db` for persistence until `shutdown` completes.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve<F>(
    bind_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
    rate_limit_opts: RateLimiterOptions,
    shutdown: F,
) -> Result<(), Box<dyn Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let driver = Driver::new(db);
    let limiter = RateLimiter::new(rate_limit_opts, Arc::new(SystemClock::default()));
    let app = app(driver, limiter);

    let listener = tokio::net::TcpListener::bind(bind_addr.into()).await?;
    info!("App started and listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("App stopped");
    Ok(())
}
