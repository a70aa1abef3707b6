use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{Bootcamp, Role},
    repository::RepositoryState,
};

/// Roles allowed to create and manage bootcamps.
pub const PUBLISHER_ROLES: [Role; 2] = [Role::Publisher, Role::Admin];

/// Claims
///
/// Payload expected inside the bearer JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID, used to load the user and its role.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

fn not_authorized() -> AppError {
    AppError::Unauthorized("Not authorized to access this route".to_string())
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// authorize
    ///
    /// Role gate for a route: the caller's role must be one of `roles`.
    pub fn authorize(&self, roles: &[Role]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                self.role
            )))
        }
    }

    /// ensure_can_modify
    ///
    /// Ownership rule for mutating a bootcamp: the caller must own it or be an admin.
    /// `action` names the operation in the error message ("update", "delete").
    pub fn ensure_can_modify(&self, bootcamp: &Bootcamp, action: &str) -> AppResult<()> {
        if bootcamp.user_id == self.id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User {} is not authorized to {} this bootcamp",
                self.id, action
            )))
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. Resolution order:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 2. Bearer token: `Authorization: Bearer <jwt>`, decoded with the configured secret.
/// 3. DB lookup: the user must still exist; its stored role is authoritative.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id_str| Uuid::parse_str(id_str).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    let role = user.role.parse::<Role>().map_err(|_| not_authorized())?;
                    return Ok(AuthUser { id: user.id, role });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(not_authorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            not_authorized()
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or_else(not_authorized)?;

        let role = user.role.parse::<Role>().map_err(|e| {
            tracing::warn!(user_id = %user.id, "user has invalid role: {}", e);
            not_authorized()
        })?;

        Ok(AuthUser { id: user.id, role })
    }
}
