//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod allocations;
#[allow(clippy::missing_errors_doc)]
pub mod parts;
#[allow(clippy::missing_errors_doc)]
pub mod services;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post};

use repairdesk_domain::error::{RepairDeskError, ValidationError};

use crate::error::ApiError;
use crate::state::{AppState, Ports};

/// Build the `/api` sub-router.
pub fn routes<P: Ports>() -> Router<AppState<P>> {
    Router::new()
        // Services
        .route(
            "/services",
            get(services::list::<P>).post(services::create::<P>),
        )
        .route("/services/{id}", get(services::get::<P>))
        .route("/services/{id}/history", get(services::history::<P>))
        .route("/services/{id}/transitions", post(services::transition::<P>))
        .route(
            "/services/{id}/removed-parts",
            post(services::record_removed_part::<P>),
        )
        .route(
            "/services/{id}/client-not-available",
            post(services::client_not_available::<P>),
        )
        .route(
            "/removed-parts/{id}/return",
            post(services::return_removed_part::<P>),
        )
        // Parts
        .route("/parts", get(parts::list::<P>).post(parts::receive::<P>))
        .route("/parts/{id}", get(parts::get::<P>).delete(parts::delete::<P>))
        .route("/parts/{id}/adjust", post(parts::adjust::<P>))
        .route("/parts/{id}/balance", get(parts::balance::<P>))
        .route("/parts/{id}/activity", get(parts::activity::<P>))
        // Allocations
        .route(
            "/allocations",
            get(allocations::list::<P>).post(allocations::allocate::<P>),
        )
        .route(
            "/allocations/{id}/return",
            post(allocations::mark_returned::<P>),
        )
}

/// Parse an identifier taken from the URL path.
fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    T::from_str(raw).map_err(|_| {
        ApiError::from(RepairDeskError::Validation(ValidationError::InvalidId(
            raw.to_string(),
        )))
    })
}
