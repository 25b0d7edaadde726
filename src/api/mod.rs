// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod health;
pub mod postbacks;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/postbacks/cpx", get(postbacks::cpx_postback))
        .route("/postbacks/bitlabs", get(postbacks::bitlabs_postback))
        .route("/postbacks/timewall", get(postbacks::timewall_postback))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        postbacks::cpx_postback,
        postbacks::bitlabs_postback,
        postbacks::timewall_postback,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Postbacks", description = "Offer network postback endpoints"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostbackConfig;
    use crate::storage::LedgerDb;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = LedgerDb::open(&dir.path().join("test.redb")).unwrap();
        let app = router(AppState::new(ledger, PostbackConfig::default()));
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
