use chrono::Utc;
use devcamper_api::{
    error::AppError,
    models::{
        Bootcamp, CollectionResponse, CreateBootcampRequest, Location, Role,
        UpdateBootcampRequest, photo_file_name, slugify,
    },
    query::paginate,
};
use serde_json::json;
use uuid::Uuid;

fn valid_request() -> CreateBootcampRequest {
    CreateBootcampRequest {
        name: "Devworks Bootcamp".to_string(),
        description: "Full stack web development".to_string(),
        website: Some("https://devworks.com".to_string()),
        phone: Some("(111) 111-1111".to_string()),
        email: Some("enroll@devworks.com".to_string()),
        address: "233 Bay State Rd Boston MA 02215".to_string(),
        careers: vec!["Web Development".to_string(), "Business".to_string()],
        ..CreateBootcampRequest::default()
    }
}

fn bad_request_message(result: Result<(), AppError>) -> String {
    match result {
        Err(AppError::BadRequest(msg)) => msg,
        other => panic!("expected BadRequest, got {:?}", other),
    }
}

// --- Validation ---

#[test]
fn test_valid_create_request() {
    assert!(valid_request().validate().is_ok());
}

#[test]
fn test_create_request_field_rules() {
    let mut req = valid_request();
    req.name = "   ".to_string();
    assert_eq!(bad_request_message(req.validate()), "Please add a name");

    let mut req = valid_request();
    req.name = "x".repeat(51);
    assert_eq!(
        bad_request_message(req.validate()),
        "Name can not be more than 50 characters"
    );

    let mut req = valid_request();
    req.description = "x".repeat(501);
    assert_eq!(
        bad_request_message(req.validate()),
        "Description can not be more than 500 characters"
    );

    let mut req = valid_request();
    req.careers.clear();
    assert_eq!(
        bad_request_message(req.validate()),
        "Please add at least one career"
    );

    let mut req = valid_request();
    req.website = Some("devworks.com".to_string());
    assert_eq!(
        bad_request_message(req.validate()),
        "Please use a valid URL with HTTP or HTTPS"
    );

    let mut req = valid_request();
    req.phone = Some("1".repeat(21));
    assert!(req.validate().is_err());

    let mut req = valid_request();
    req.email = Some("not-an-email".to_string());
    assert_eq!(bad_request_message(req.validate()), "Please add a valid email");
}

#[test]
fn test_update_request_only_checks_present_fields() {
    assert!(UpdateBootcampRequest::default().validate().is_ok());

    let req = UpdateBootcampRequest {
        careers: Some(vec!["Underwater Basket Weaving".to_string()]),
        ..UpdateBootcampRequest::default()
    };
    assert_eq!(
        bad_request_message(req.validate()),
        "'Underwater Basket Weaving' is not a supported career"
    );

    let req = UpdateBootcampRequest {
        address: Some(" ".to_string()),
        ..UpdateBootcampRequest::default()
    };
    assert_eq!(bad_request_message(req.validate()), "Please add an address");
}

#[test]
fn test_create_request_ignores_client_owner() {
    let req: CreateBootcampRequest = serde_json::from_value(json!({
        "name": "Devworks Bootcamp",
        "description": "Full stack web development",
        "address": "233 Bay State Rd Boston MA 02215",
        "careers": ["Web Development"],
        "user": Uuid::new_v4(),
        "jobAssistance": true
    }))
    .unwrap();

    assert!(req.job_assistance);
    assert!(!req.housing);
    assert_eq!(req.website, None);
}

// --- Derived Values ---

#[test]
fn test_slugify() {
    assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
    assert_eq!(slugify("  ModernTech -- Bootcamp! "), "moderntech-bootcamp");
    assert_eq!(slugify("Codemasters 2.0"), "codemasters-2-0");
}

#[test]
fn test_photo_file_name() {
    let id = Uuid::from_u128(7);
    assert_eq!(photo_file_name(id, "campus.jpg"), format!("photo_{}.jpg", id));
    assert_eq!(photo_file_name(id, "archive.tar.gz"), format!("photo_{}.gz", id));
    assert_eq!(photo_file_name(id, "noextension"), format!("photo_{}", id));
}

#[test]
fn test_role_round_trip() {
    for role in [Role::User, Role::Publisher, Role::Admin] {
        assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
    }
    assert!("superuser".parse::<Role>().is_err());
}

// --- Serialization ---

#[test]
fn test_bootcamp_json_serialization() {
    let owner = Uuid::new_v4();
    let bootcamp = Bootcamp {
        id: Uuid::new_v4(),
        user_id: owner,
        name: "Devworks Bootcamp".to_string(),
        location: Location {
            latitude: 42.35,
            longitude: -71.1,
            formatted_address: Some("233 Bay State Rd, Boston, MA 02215, US".to_string()),
            ..Location::default()
        },
        accept_gi: true,
        created_at: Utc::now(),
        ..Bootcamp::default()
    };

    let value = serde_json::to_value(&bootcamp).unwrap();

    assert_eq!(value["user"], json!(owner));
    assert_eq!(value["acceptGi"], true);
    assert_eq!(value["averageCost"], serde_json::Value::Null);
    assert_eq!(
        value["location"]["formattedAddress"],
        "233 Bay State Rd, Boston, MA 02215, US"
    );
    assert!(value.get("userId").is_none());
    assert!(value.get("createdAt").is_some());
}

#[test]
fn test_collection_response_serialization() {
    let plain = serde_json::to_value(CollectionResponse::new(vec![1, 2])).unwrap();
    assert_eq!(plain, json!({ "success": true, "count": 2, "data": [1, 2] }));

    let paged = CollectionResponse::new(vec![1]).with_pagination(paginate(1, 1, 3));
    assert_eq!(
        serde_json::to_value(paged).unwrap()["pagination"],
        json!({ "next": { "page": 2, "limit": 1 } })
    );
}
