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

//! OpenAPI description of the service and the interactive UI to browse it.

use crate::model::Ride;
use crate::rest::{health_get, ride_get, rides_get, rides_post, ErrorCode, ErrorResponse};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Path under which the Swagger UI is served.
const UI_PATH: &str = "/api-docs";

/// Path of the OpenAPI document, as JSON.
const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI description of the service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rides Management API",
        version = "1.0.0",
        description = "A REST API service that allows user to manage rides",
        license(name = "MIT", url = "https://spdx.org/licenses/MIT.html"),
        contact(name = "Jerick Gonito", email = "jerickgonito@gmail.com"),
    ),
    paths(health_get::handler, rides_post::handler, rides_get::handler, ride_get::handler),
    components(schemas(ErrorCode, ErrorResponse, Ride, rides_post::RidesPostRequest)),
    tags((name = "rides", description = "Management of ride records")),
)]
pub(crate) struct ApiDoc;

/// Creates the routes that serve the Swagger UI and the OpenAPI document it renders.
pub(crate) fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new(UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi())
}
