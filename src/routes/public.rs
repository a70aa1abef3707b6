use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that need no credentials. Nested under `/api/v1` by `create_router`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /bootcamps?select=..&sort=..&page=..&limit=..&<field>[op]=..
        // Filtered, sorted and paginated listing.
        .route("/bootcamps", get(handlers::get_bootcamps))
        // GET /bootcamps/{id}
        .route("/bootcamps/{id}", get(handlers::get_bootcamp))
        // GET /bootcamps/radius/{zipcode}/{distance}
        // Geocodes the postal code and returns bootcamps within `distance` miles.
        .route(
            "/bootcamps/radius/{zipcode}/{distance}",
            get(handlers::get_bootcamps_in_radius),
        )
}
