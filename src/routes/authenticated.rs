use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Mutating bootcamp routes. The router is wrapped in the `auth_middleware`
/// layer, and each handler additionally takes `AuthUser` for the publisher/admin
/// role gate and the owner-or-admin rule.
///
/// `upload_limit` is the body limit for the photo route, derived from the
/// configured maximum upload size.
pub fn authenticated_routes(upload_limit: usize) -> Router<AppState> {
    Router::<AppState>::new()
        // POST /bootcamps
        // Creates a bootcamp owned by the caller (one per publisher).
        .route("/bootcamps", post(handlers::create_bootcamp))
        // PUT/DELETE /bootcamps/{id}
        // Owner or admin only.
        .route(
            "/bootcamps/{id}",
            put(handlers::update_bootcamp).delete(handlers::delete_bootcamp),
        )
        // PUT /bootcamps/{id}/photo
        // Multipart upload of the `file` field; owner or admin only.
        .route(
            "/bootcamps/{id}/photo",
            put(handlers::bootcamp_photo_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
}
