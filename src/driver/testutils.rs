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

//! Test utilities for the business layer.

use crate::db::{self, Db, Executor};
use crate::driver::Driver;
use crate::model::*;
use std::sync::Arc;

/// Builds a valid ride whose text fields are all derived from `n`.
pub(crate) fn new_ride(n: u32) -> NewRide {
    NewRide::new(
        Latitude::new(90.0).unwrap(),
        Longitude::new(180.0).unwrap(),
        Latitude::new(-90.0).unwrap(),
        Longitude::new(-180.0).unwrap(),
        NonEmptyText::new(format!("Rider #{}", n)).unwrap(),
        NonEmptyText::new(format!("Driver #{}", n)).unwrap(),
        NonEmptyText::new(format!("Vehicle #{}", n)).unwrap(),
    )
}

pub(crate) struct TestContext {
    db: Arc<dyn Db + Send + Sync>,
    driver: Driver,
}

impl TestContext {
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> = Arc::new(db::testutils::setup().await);
        let driver = Driver::new(db.clone());
        Self { db, driver }
    }

    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Stores `ride` bypassing the driver and returns its assigned identifier.
    pub(crate) async fn put_ride(&self, ride: &NewRide) -> RideId {
        db::create_ride(&mut self.ex().await, ride).await.unwrap()
    }

    /// Makes the ride storage unusable so that any operation against it fails.
    pub(crate) async fn break_storage(&self) {
        db::testutils::break_schema(&mut self.ex().await).await;
    }
}
