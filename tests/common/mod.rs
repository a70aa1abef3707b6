#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use devcamper_api::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    error::{AppError, AppResult},
    geocoder::MockGeocoder,
    models::{Bootcamp, CreateBootcampRequest, DEFAULT_PHOTO, Location, Role, UpdateBootcampRequest, User},
    query::ListOptions,
    repository::Repository,
    storage::MockStorageService,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

// --- IN-MEMORY REPOSITORY ---

/// Behaves like the Postgres repository for the operations handlers rely on,
/// and records the radius query it receives.
#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
    pub bootcamps: Mutex<HashMap<Uuid, Bootcamp>>,
    pub last_radius_query: Mutex<Option<(f64, f64, f64)>>,
    /// When true, user lookups fail as if the database were down.
    pub fail_user_lookup: bool,
}

impl MockRepo {
    pub fn with_user(self, id: Uuid, role: Role) -> Self {
        self.users.lock().unwrap().insert(
            id,
            User {
                id,
                email: format!("{}@devcamper.io", role),
                role: role.to_string(),
            },
        );
        self
    }

    pub fn with_bootcamp(self, bootcamp: Bootcamp) -> Self {
        self.bootcamps.lock().unwrap().insert(bootcamp.id, bootcamp);
        self
    }

    pub fn failing_user_lookup(mut self) -> Self {
        self.fail_user_lookup = true;
        self
    }

    pub fn bootcamp(&self, id: Uuid) -> Option<Bootcamp> {
        self.bootcamps.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        if self.fail_user_lookup {
            return Err(AppError::Internal("user lookup failed".to_string()));
        }
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_bootcamps(&self, options: &ListOptions) -> AppResult<(Vec<Bootcamp>, i64)> {
        let mut all: Vec<Bootcamp> = self.bootcamps.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as i64;
        let page = all
            .into_iter()
            .skip(options.offset() as usize)
            .take(options.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn get_bootcamp(&self, id: Uuid) -> AppResult<Option<Bootcamp>> {
        Ok(self.bootcamp(id))
    }

    async fn get_bootcamp_by_owner(&self, user_id: Uuid) -> AppResult<Option<Bootcamp>> {
        Ok(self
            .bootcamps
            .lock()
            .unwrap()
            .values()
            .find(|b| b.user_id == user_id)
            .cloned())
    }

    async fn get_bootcamps_in_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius: f64,
    ) -> AppResult<Vec<Bootcamp>> {
        *self.last_radius_query.lock().unwrap() = Some((latitude, longitude, radius));
        Ok(self.bootcamps.lock().unwrap().values().cloned().collect())
    }

    async fn create_bootcamp(
        &self,
        req: CreateBootcampRequest,
        user_id: Uuid,
        slug: String,
        location: Location,
    ) -> AppResult<Bootcamp> {
        let bootcamp = Bootcamp {
            id: Uuid::new_v4(),
            user_id,
            name: req.name,
            slug,
            description: req.description,
            website: req.website,
            phone: req.phone,
            email: req.email,
            address: req.address,
            location,
            careers: req.careers,
            photo: DEFAULT_PHOTO.to_string(),
            housing: req.housing,
            job_assistance: req.job_assistance,
            job_guarantee: req.job_guarantee,
            accept_gi: req.accept_gi,
            created_at: Utc::now(),
            ..Bootcamp::default()
        };
        self.bootcamps
            .lock()
            .unwrap()
            .insert(bootcamp.id, bootcamp.clone());
        Ok(bootcamp)
    }

    async fn update_bootcamp(
        &self,
        id: Uuid,
        req: UpdateBootcampRequest,
        slug: Option<String>,
        location: Option<Location>,
    ) -> AppResult<Option<Bootcamp>> {
        let mut bootcamps = self.bootcamps.lock().unwrap();
        let Some(b) = bootcamps.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = req.name {
            b.name = v;
        }
        if let Some(v) = slug {
            b.slug = v;
        }
        if let Some(v) = req.description {
            b.description = v;
        }
        if let Some(v) = req.address {
            b.address = v;
        }
        if let Some(v) = location {
            b.location = v;
        }
        if let Some(v) = req.careers {
            b.careers = v;
        }
        if let Some(v) = req.housing {
            b.housing = v;
        }
        if req.website.is_some() {
            b.website = req.website;
        }
        Ok(Some(b.clone()))
    }

    async fn delete_bootcamp(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.bootcamps.lock().unwrap().remove(&id).is_some())
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> AppResult<Option<Bootcamp>> {
        let mut bootcamps = self.bootcamps.lock().unwrap();
        Ok(bootcamps.get_mut(&id).map(|b| {
            b.photo = photo.to_string();
            b.clone()
        }))
    }
}

// --- TEST UTILITIES ---

pub const PUBLISHER_ID: Uuid = Uuid::from_u128(123);
pub const OTHER_PUBLISHER_ID: Uuid = Uuid::from_u128(789);
pub const ADMIN_ID: Uuid = Uuid::from_u128(456);
pub const PLAIN_USER_ID: Uuid = Uuid::from_u128(999);

pub fn publisher() -> AuthUser {
    AuthUser {
        id: PUBLISHER_ID,
        role: Role::Publisher,
    }
}

pub fn other_publisher() -> AuthUser {
    AuthUser {
        id: OTHER_PUBLISHER_ID,
        role: Role::Publisher,
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        id: ADMIN_ID,
        role: Role::Admin,
    }
}

pub fn plain_user() -> AuthUser {
    AuthUser {
        id: PLAIN_USER_ID,
        role: Role::User,
    }
}

/// A repository pre-populated with one user per role.
pub fn seeded_repo() -> MockRepo {
    MockRepo::default()
        .with_user(PUBLISHER_ID, Role::Publisher)
        .with_user(OTHER_PUBLISHER_ID, Role::Publisher)
        .with_user(ADMIN_ID, Role::Admin)
        .with_user(PLAIN_USER_ID, Role::User)
}

pub fn sample_bootcamp(owner: Uuid) -> Bootcamp {
    Bootcamp {
        id: Uuid::new_v4(),
        user_id: owner,
        name: "Devworks Bootcamp".to_string(),
        slug: "devworks-bootcamp".to_string(),
        description: "Full stack web development".to_string(),
        address: "233 Bay State Rd Boston MA 02215".to_string(),
        location: Location {
            latitude: 42.350846,
            longitude: -71.103744,
            ..Location::default()
        },
        careers: vec!["Web Development".to_string()],
        photo: DEFAULT_PHOTO.to_string(),
        created_at: Utc::now(),
        ..Bootcamp::default()
    }
}

pub fn create_request() -> CreateBootcampRequest {
    CreateBootcampRequest {
        name: "ModernTech Bootcamp".to_string(),
        description: "Mobile and web development".to_string(),
        website: Some("https://moderntech.com".to_string()),
        phone: Some("(222) 222-2222".to_string()),
        email: Some("enroll@moderntech.com".to_string()),
        address: "220 Pawtucket St, Lowell, MA 01854".to_string(),
        careers: vec!["Web Development".to_string(), "UI/UX".to_string()],
        housing: false,
        job_assistance: true,
        job_guarantee: false,
        accept_gi: true,
    }
}

pub struct TestContext {
    pub repo: Arc<MockRepo>,
    pub storage: MockStorageService,
    pub state: AppState,
}

pub fn test_context(repo: MockRepo, storage: MockStorageService, geocoder: MockGeocoder) -> TestContext {
    test_context_with_config(repo, storage, geocoder, AppConfig::default())
}

pub fn test_context_with_config(
    repo: MockRepo,
    storage: MockStorageService,
    geocoder: MockGeocoder,
    config: AppConfig,
) -> TestContext {
    let repo = Arc::new(repo);
    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(storage.clone()),
        geocoder: Arc::new(geocoder),
        config,
    };
    TestContext {
        repo,
        storage,
        state,
    }
}

pub fn boston() -> MockGeocoder {
    MockGeocoder::new(42.350846, -71.103744)
}
