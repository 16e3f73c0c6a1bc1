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

//! Entry point to the rides service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::{error, info};
use rides::db::sqlite::{connect, SqliteOptions};
use rides::db::{init_schema, Db};
use rides::env::get_optional_var;
use rides::logging::{self, LogOptions};
use rides::{serve, RateLimiterOptions};
use std::error::Error;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Port to listen on when `RIDES_PORT` is not set.
const DEFAULT_PORT: u16 = 8010;

/// Completes when the process is asked to terminate.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot wait for the termination signal: {}", e);
    }
    info!("Shutting down");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init(LogOptions::from_env("RIDES")?)?;

    let port = get_optional_var::<u16>("RIDES", "PORT")?.unwrap_or(DEFAULT_PORT);
    let db_opts = SqliteOptions::from_env("RIDES_DB")?;
    let rate_limit_opts = RateLimiterOptions::from_env("RIDES_RATE_LIMIT")?;

    let db = Arc::new(connect(db_opts).await?);
    init_schema(&mut db.ex().await?).await?;

    let result =
        serve((Ipv4Addr::UNSPECIFIED, port), db.clone(), rate_limit_opts, shutdown_signal()).await;
    db.close().await;
    result
}
