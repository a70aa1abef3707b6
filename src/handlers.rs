use crate::{
    AppState,
    auth::{AuthUser, PUBLISHER_ROLES},
    error::{AppError, AppResult},
    geocoder::angular_radius,
    models::{
        ApiResponse, Bootcamp, CollectionResponse, CreateBootcampRequest, Location,
        UpdateBootcampRequest, photo_file_name, slugify,
    },
    query::{ListOptions, paginate, project},
};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use uuid::Uuid;

/// Ids that do not parse can never match a record, so they are reported as
/// missing rather than malformed.
fn parse_bootcamp_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| bootcamp_not_found(raw))
}

fn bootcamp_not_found(id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("Bootcamp not found with id of {}", id))
}

/// Loads a bootcamp and applies the role gate and ownership rule shared by
/// every mutating route.
async fn find_modifiable_bootcamp(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
    action: &str,
) -> AppResult<Bootcamp> {
    user.authorize(&PUBLISHER_ROLES)?;
    let id = parse_bootcamp_id(raw_id)?;

    let bootcamp = state
        .repo
        .get_bootcamp(id)
        .await?
        .ok_or_else(|| bootcamp_not_found(id))?;

    user.ensure_can_modify(&bootcamp, action)?;
    Ok(bootcamp)
}

/// Geocodes an address and keeps the best match.
async fn locate(state: &AppState, address: &str) -> AppResult<Location> {
    let matches = state.geocoder.geocode(address).await.map_err(|e| {
        tracing::error!("geocoder error for '{}': {}", address, e);
        AppError::Internal("Geocoding service unavailable".to_string())
    })?;

    matches
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest(format!("Could not find a location for '{}'", address)))
}

// --- Handlers ---

/// get_bootcamps
///
/// [Public Route] Lists bootcamps with filtering, sorting, field selection and
/// pagination taken from the query string.
#[utoipa::path(
    get,
    path = "/api/v1/bootcamps",
    params(
        ("select" = Option<String>, Query, description = "Comma separated fields to return"),
        ("sort" = Option<String>, Query, description = "Comma separated fields, '-' prefix for descending"),
        ("page" = Option<i64>, Query, description = "Page number, from 1"),
        ("limit" = Option<i64>, Query, description = "Page size, at most 100"),
    ),
    responses(
        (status = 200, description = "Bootcamps", body = [Bootcamp]),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn get_bootcamps(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<CollectionResponse<Value>>> {
    let options = ListOptions::from_params(&params)?;
    let (bootcamps, total) = state.repo.get_bootcamps(&options).await?;

    let data = bootcamps
        .into_iter()
        .map(|b| serde_json::to_value(b).map(|v| project(v, options.select.as_deref())))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let pagination = paginate(options.page, options.limit, total);
    Ok(Json(CollectionResponse::new(data).with_pagination(pagination)))
}

/// get_bootcamp
///
/// [Public Route] Retrieves a single bootcamp by id.
#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/{id}",
    params(("id" = String, Path, description = "Bootcamp ID")),
    responses(
        (status = 200, description = "Found", body = Bootcamp),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Bootcamp>>> {
    let bootcamp_id = parse_bootcamp_id(&id)?;

    let bootcamp = state
        .repo
        .get_bootcamp(bootcamp_id)
        .await?
        .ok_or_else(|| bootcamp_not_found(&id))?;

    Ok(Json(ApiResponse::ok(bootcamp)))
}

/// create_bootcamp
///
/// [Publisher/Admin] Creates a bootcamp owned by the caller. A publisher may own
/// only one bootcamp; admins are exempt. The address is geocoded into `location`.
#[utoipa::path(
    post,
    path = "/api/v1/bootcamps",
    request_body = CreateBootcampRequest,
    responses(
        (status = 201, description = "Created", body = Bootcamp),
        (status = 400, description = "Invalid body"),
        (status = 403, description = "Role not allowed"),
        (status = 409, description = "Caller already published a bootcamp")
    )
)]
pub async fn create_bootcamp(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBootcampRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Bootcamp>>)> {
    user.authorize(&PUBLISHER_ROLES)?;

    if !user.is_admin() && state.repo.get_bootcamp_by_owner(user.id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "The user with id of {} has already published a bootcamp",
            user.id
        )));
    }

    payload.validate()?;

    let location = locate(&state, &payload.address).await?;
    let slug = slugify(&payload.name);

    let bootcamp = state
        .repo
        .create_bootcamp(payload, user.id, slug, location)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(bootcamp))))
}

/// update_bootcamp
///
/// [Owner/Admin] Applies the supplied fields to a bootcamp. A new address is
/// geocoded again and a new name re-derives the slug.
#[utoipa::path(
    put,
    path = "/api/v1/bootcamps/{id}",
    params(("id" = String, Path, description = "Bootcamp ID")),
    request_body = UpdateBootcampRequest,
    responses(
        (status = 200, description = "Updated", body = Bootcamp),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_bootcamp(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBootcampRequest>,
) -> AppResult<Json<ApiResponse<Bootcamp>>> {
    let bootcamp = find_modifiable_bootcamp(&state, &user, &id, "update").await?;

    payload.validate()?;

    let location = match payload.address.as_deref() {
        Some(address) if address != bootcamp.address => Some(locate(&state, address).await?),
        _ => None,
    };
    let slug = payload.name.as_deref().map(slugify);

    let updated = state
        .repo
        .update_bootcamp(bootcamp.id, payload, slug, location)
        .await?
        .ok_or_else(|| bootcamp_not_found(bootcamp.id))?;

    Ok(Json(ApiResponse::ok(updated)))
}

/// delete_bootcamp
///
/// [Owner/Admin] Removes a bootcamp.
#[utoipa::path(
    delete,
    path = "/api/v1/bootcamps/{id}",
    params(("id" = String, Path, description = "Bootcamp ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_bootcamp(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let bootcamp = find_modifiable_bootcamp(&state, &user, &id, "delete").await?;

    if !state.repo.delete_bootcamp(bootcamp.id).await? {
        return Err(bootcamp_not_found(bootcamp.id));
    }

    tracing::info!(bootcamp_id = %bootcamp.id, user_id = %user.id, "bootcamp deleted");
    Ok(Json(ApiResponse::ok(json!({}))))
}

/// get_bootcamps_in_radius
///
/// [Public Route] Bootcamps within `distance` miles of a postal code.
#[utoipa::path(
    get,
    path = "/api/v1/bootcamps/radius/{zipcode}/{distance}",
    params(
        ("zipcode" = String, Path, description = "Postal code at the centre"),
        ("distance" = f64, Path, description = "Radius in miles")
    ),
    responses(
        (status = 200, description = "Bootcamps in range", body = [Bootcamp]),
        (status = 400, description = "Invalid distance or unknown postal code")
    )
)]
pub async fn get_bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> AppResult<Json<CollectionResponse<Bootcamp>>> {
    let distance = distance
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            AppError::BadRequest(format!("Distance '{}' is not a valid number of miles", distance))
        })?;

    let center = locate(&state, &zipcode).await?;
    let radius = angular_radius(distance);

    let bootcamps = state
        .repo
        .get_bootcamps_in_radius(center.latitude, center.longitude, radius)
        .await?;

    Ok(Json(CollectionResponse::new(bootcamps)))
}

// --- Photo Upload ---

/// PhotoUpload
///
/// The `file` part of a photo upload, read fully into memory.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// store_photo
///
/// Validates an upload for an already authorized bootcamp (file present, image
/// mime type, within the size limit), writes it under `photo_<id><ext>` and
/// records the name on the bootcamp. Returns the stored file name.
pub async fn store_photo(
    state: &AppState,
    bootcamp: &Bootcamp,
    upload: Option<PhotoUpload>,
) -> AppResult<String> {
    let file = upload.ok_or_else(|| AppError::BadRequest("Please upload a file".to_string()))?;

    if !file.content_type.starts_with("image") {
        return Err(AppError::BadRequest("Please upload an image file".to_string()));
    }

    let max = state.config.max_file_upload;
    if file.bytes.len() as u64 > max {
        return Err(too_large(max));
    }

    let file_name = photo_file_name(bootcamp.id, &file.file_name);

    state
        .storage
        .save_file(&file_name, file.bytes)
        .await
        .map_err(|e| {
            tracing::error!("storage error for {}: {}", file_name, e);
            AppError::Internal("Problem with file upload".to_string())
        })?;

    if state
        .repo
        .set_bootcamp_photo(bootcamp.id, &file_name)
        .await?
        .is_none()
    {
        tracing::warn!(bootcamp_id = %bootcamp.id, file = %file_name, "bootcamp removed during upload, stored photo is orphaned");
        return Err(bootcamp_not_found(bootcamp.id));
    }

    tracing::info!(bootcamp_id = %bootcamp.id, file = %file_name, "bootcamp photo uploaded");
    Ok(file_name)
}

fn too_large(max: u64) -> AppError {
    AppError::BadRequest(format!("Please upload an image less than {}", max))
}

/// Pulls the `file` field out of a multipart body. Other fields are skipped.
async fn read_photo_field(multipart: &mut Multipart, max: u64) -> AppResult<Option<PhotoUpload>> {
    let to_app_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large(max)
        } else {
            AppError::BadRequest(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(to_app_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(to_app_error)?;

        if bytes.is_empty() && file_name.is_empty() {
            return Ok(None);
        }
        return Ok(Some(PhotoUpload {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

/// bootcamp_photo_upload
///
/// [Owner/Admin] Uploads a bootcamp photo from the multipart field `file`.
#[utoipa::path(
    put,
    path = "/api/v1/bootcamps/{id}/photo",
    params(("id" = String, Path, description = "Bootcamp ID")),
    request_body(content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses(
        (status = 200, description = "Stored file name", body = String),
        (status = 400, description = "Missing, non-image or oversized file"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn bootcamp_photo_upload(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ApiResponse<String>>> {
    let bootcamp = find_modifiable_bootcamp(&state, &user, &id, "update").await?;

    // A request without a multipart body simply carries no file.
    let upload = match multipart {
        Ok(mut multipart) => read_photo_field(&mut multipart, state.config.max_file_upload).await?,
        Err(rejection) => {
            tracing::debug!("photo upload without multipart body: {}", rejection);
            None
        }
    };
    let file_name = store_photo(&state, &bootcamp, upload).await?;
    Ok(Json(ApiResponse::ok(file_name)))
}
