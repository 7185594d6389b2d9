//! Tests de la API HTTP contra el router completo con almacén en memoria

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use boat_marketplace::config::environment::EnvironmentConfig;
use boat_marketplace::dto::payment_dto::WEBHOOK_SECRET_HEADER;
use boat_marketplace::{create_router, AppState};

fn create_test_app() -> Router {
    create_router(AppState::in_memory(EnvironmentConfig::default()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, email: &str, role: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "motdepasse123",
            "firstName": "Jeanne",
            "lastName": "Martin",
            "role": role
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["token"]
        .as_str()
        .expect("token")
        .to_string()
}

async fn create_boat(app: &Router, token: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/boats",
        Some(token),
        Some(json!({
            "name": "Belle Île",
            "boatType": "Voilier",
            "location": { "city": "La Rochelle", "port": "Les Minimes" },
            "capacity": { "maxPeople": 6 },
            "pricing": {
                "dailyRate": 100,
                "weeklyRate": 600,
                "monthlyRate": 2000,
                "securityDeposit": 500,
                "cleaningFee": 50
            },
            "additionalServices": [{ "name": "Paddle", "price": 20 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_str().expect("boat id").to_string()
}

fn date_in(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = create_test_app();
    let token = register(&app, "Owner@Example.com", "propriétaire").await;

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "owner@example.com");
    assert_eq!(me["role"], "owner");
    assert!(me.get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "owner@example.com", "password": "motdepasse123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "owner@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_admin_and_duplicates() {
    let app = create_test_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "boss@example.com",
            "password": "motdepasse123",
            "firstName": "Big",
            "lastName": "Boss",
            "role": "admin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    register(&app, "dup@example.com", "renter").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "dup@example.com",
            "password": "motdepasse123",
            "firstName": "Dup",
            "lastName": "Licate"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = create_test_app();
    let (status, _) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/bookings", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_boat_listing_and_search() {
    let app = create_test_app();
    let owner = register(&app, "owner@example.com", "owner").await;
    let renter = register(&app, "renter@example.com", "renter").await;
    let boat_id = create_boat(&app, &owner).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/boats",
        Some(&renter),
        Some(json!({
            "name": "Pirate",
            "boatType": "rib",
            "location": { "city": "Brest" },
            "capacity": { "maxPeople": 4 },
            "pricing": { "dailyRate": 80 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, boats) = send(
        &app,
        Method::GET,
        "/api/boats?city=la%20rochelle&minCapacity=4",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(boats.as_array().map(Vec::len), Some(1));
    assert_eq!(boats[0]["id"], boat_id.as_str());
    assert_eq!(boats[0]["boatType"], "sailboat");

    let (status, boats) = send(&app, Method::GET, "/api/boats?minCapacity=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(boats.as_array().map(Vec::len), Some(0));

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/boats?availableFrom={}", date_in(3)),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_modes() {
    let app = create_test_app();
    let owner = register(&app, "owner@example.com", "owner").await;
    let boat_id = create_boat(&app, &owner).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!(
            "/api/boats/{}/availability?startDate={}&endDate={}",
            boat_id,
            date_in(10),
            date_in(20)
        ),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["pricing"]["numberOfDays"], 10);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/boats/{}/availability/month?month=2030-07", boat_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/boats/{}/availability/month?month=2030-13", boat_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_flow_over_http() {
    let app = create_test_app();
    let owner = register(&app, "owner@example.com", "owner").await;
    let renter = register(&app, "renter@example.com", "renter").await;
    let boat_id = create_boat(&app, &owner).await;

    let booking_body = json!({
        "boatId": boat_id,
        "startDate": date_in(40),
        "endDate": date_in(50),
        "participants": { "adults": 2, "children": 1 },
        "renterExperience": "Débutant"
    });

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&renter),
        Some(booking_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["status"], "pending");
    // Decimal se serializa como cadena
    assert_eq!(body["data"]["pricing"]["totalAmount"], "950");
    let booking_id = body["data"]["id"].as_str().expect("booking id").to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&renter),
        Some(booking_body),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, owned) = send(&app, Method::GET, "/api/bookings?as=owner", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owned.as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{}/confirm", booking_id),
        Some(&renter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{}/confirm", booking_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/bookings/{}/cancellation-quote", booking_id),
        Some(&renter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feePercentage"], 0);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{}/cancel", booking_id),
        Some(&renter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["booking"]["status"], "cancelled");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{}/confirm", booking_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_capacity_is_validated_over_http() {
    let app = create_test_app();
    let owner = register(&app, "owner@example.com", "owner").await;
    let renter = register(&app, "renter@example.com", "renter").await;
    let boat_id = create_boat(&app, &owner).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&renter),
        Some(json!({
            "boatId": boat_id,
            "startDate": date_in(5),
            "endDate": date_in(7),
            "participants": { "adults": 6, "children": 2 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_payment_webhook_requires_secret() {
    let app = create_test_app();
    let owner = register(&app, "owner@example.com", "owner").await;
    let renter = register(&app, "renter@example.com", "renter").await;
    let boat_id = create_boat(&app, &owner).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(&renter),
        Some(json!({
            "boatId": boat_id,
            "startDate": date_in(5),
            "endDate": date_in(7),
            "participants": { "adults": 2 }
        })),
    )
    .await;
    let booking_id = body["data"]["id"].as_str().expect("booking id").to_string();
    let event = json!({
        "type": "payment_succeeded",
        "bookingId": booking_id,
        "providerReference": "pi_42"
    });

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/payments/webhook",
        None,
        Some(event.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/payments/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            WEBHOOK_SECRET_HEADER,
            EnvironmentConfig::default().payment_webhook_secret,
        )
        .body(Body::from(event.to_string()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(body["data"]["payment"]["providerReference"], "pi_42");
}
