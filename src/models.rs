use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Career tracks a bootcamp may advertise.
pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

/// Photo assigned to a bootcamp before the owner uploads one.
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

// --- Identity ---

/// Role
///
/// The RBAC roles known to the API. Publishers may own a single bootcamp;
/// admins bypass the ownership and one-bootcamp rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// User
///
/// The account record resolved during authentication, stored in the `users` table.
/// The role is kept as text in the database and parsed by the auth extractor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

// --- Bootcamp ---

/// Location
///
/// Geocoded position of a bootcamp's address. Stored as flat columns on the
/// `bootcamps` table and nested under `location` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

/// Bootcamp
///
/// The managed resource. `user` is the owner's id, set from the authenticated
/// caller at creation time and never from the request body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Bootcamp {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    #[sqlx(flatten)]
    pub location: Location,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads ---

/// CreateBootcampRequest
///
/// Body of `POST /bootcamps`. Any `user` field a client sends is ignored by serde.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateBootcampRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    pub careers: Vec<String>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

impl CreateBootcampRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)?;
        validate_description(&self.description)?;
        if self.address.trim().is_empty() {
            return Err(AppError::BadRequest("Please add an address".to_string()));
        }
        validate_careers(&self.careers)?;
        validate_contact(
            self.website.as_deref(),
            self.phone.as_deref(),
            self.email.as_deref(),
        )
    }
}

/// UpdateBootcampRequest
///
/// Body of `PUT /bootcamps/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateBootcampRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub careers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_assistance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_guarantee: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_gi: Option<bool>,
}

impl UpdateBootcampRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(address) = &self.address {
            if address.trim().is_empty() {
                return Err(AppError::BadRequest("Please add an address".to_string()));
            }
        }
        if let Some(careers) = &self.careers {
            validate_careers(careers)?;
        }
        validate_contact(
            self.website.as_deref(),
            self.phone.as_deref(),
            self.email.as_deref(),
        )
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Please add a name".to_string()));
    }
    if name.chars().count() > 50 {
        return Err(AppError::BadRequest(
            "Name can not be more than 50 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> AppResult<()> {
    if description.trim().is_empty() {
        return Err(AppError::BadRequest("Please add a description".to_string()));
    }
    if description.chars().count() > 500 {
        return Err(AppError::BadRequest(
            "Description can not be more than 500 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_careers(careers: &[String]) -> AppResult<()> {
    if careers.is_empty() {
        return Err(AppError::BadRequest("Please add at least one career".to_string()));
    }
    match careers.iter().find(|c| !CAREERS.contains(&c.as_str())) {
        Some(unknown) => Err(AppError::BadRequest(format!(
            "'{}' is not a supported career",
            unknown
        ))),
        None => Ok(()),
    }
}

fn validate_contact(website: Option<&str>, phone: Option<&str>, email: Option<&str>) -> AppResult<()> {
    if let Some(website) = website {
        if !(website.starts_with("http://") || website.starts_with("https://")) {
            return Err(AppError::BadRequest(
                "Please use a valid URL with HTTP or HTTPS".to_string(),
            ));
        }
    }
    if let Some(phone) = phone {
        if phone.chars().count() > 20 {
            return Err(AppError::BadRequest(
                "Phone number can not be longer than 20 characters".to_string(),
            ));
        }
    }
    if let Some(email) = email {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(AppError::BadRequest("Please add a valid email".to_string()));
        }
    }
    Ok(())
}

/// slugify
///
/// Lowercases the name and joins its alphanumeric runs with `-`,
/// e.g. "Devworks Bootcamp!" becomes "devworks-bootcamp".
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// photo_file_name
///
/// Builds the stored name of an uploaded photo from the bootcamp id and the
/// extension of the client's file name (dot included, empty when absent).
pub fn photo_file_name(bootcamp_id: Uuid, original_name: &str) -> String {
    let extension = std::path::Path::new(original_name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    format!("photo_{}{}", bootcamp_id, extension)
}

// --- Response Envelopes ---

/// ApiResponse
///
/// Success envelope shared by the single-record routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// PageLink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageLink {
    pub page: i64,
    pub limit: i64,
}

/// Pagination
///
/// Links to the neighbouring pages of a list result; each side is omitted at the ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

/// CollectionResponse
///
/// Envelope for list and radius results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse<T> {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub data: Vec<T>,
}

impl<T> CollectionResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination: None,
            data,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}
