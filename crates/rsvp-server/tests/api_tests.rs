//! Integration tests for the RSVP API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use rsvp_server::{
    api::{create_router, AppState, RateLimitState},
    attendee::MySqlStore,
    config::{
        DatabaseConfig, EmailConfig, Environment, NotificationConfig, RateLimitConfig,
        WhatsAppConfig,
    },
    AttendeeStore, ContactMethod, Notifier,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_json as json_body_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMAIL_PATH: &str = "/v3/smtp/email";
const WHATSAPP_PATH: &str = "/v21.0/555000111/messages";

/// Notifier whose providers both live on `mock_server`.
fn test_notifier(mock_server: &MockServer) -> Notifier {
    let email = EmailConfig {
        api_key: SecretString::new("test-key".into()),
        base_url: mock_server.uri(),
        ..EmailConfig::default()
    };
    let whatsapp = WhatsAppConfig {
        access_token: SecretString::new("test-token".into()),
        phone_number_id: "555000111".into(),
        template_name: "rsvp_confirmation".into(),
        base_url: mock_server.uri(),
        ..WhatsAppConfig::default()
    };
    let notification = NotificationConfig {
        timeout: Duration::from_secs(5),
    };
    Notifier::new(&email, &whatsapp, &notification).unwrap()
}

/// Create a test app state with memory-only storage.
fn create_test_state(mock_server: &MockServer) -> AppState {
    AppState::new(AttendeeStore::memory(), test_notifier(mock_server))
}

fn test_app(state: AppState) -> Router {
    create_router(state, RateLimitState::permissive(), Environment::Development)
}

async fn mount_providers_ok(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(EMAIL_PATH))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "messageId": "<m1@smtp>" })),
        )
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(WHATSAPP_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "messages": [{ "id": "wamid.1" }] })),
        )
        .mount(mock_server)
        .await;
}

fn registration_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/registration")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn verification_request(contact_info: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/verification?contactInfo={}", contact_info))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn ana() -> Value {
    json!({
        "fullName": "Ana Lopez",
        "contactMethod": "email",
        "contactInfo": "ana@example.com",
        "guests": 2
    })
}

fn error_fields(json: &Value) -> Vec<String> {
    json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_state(&mock_server));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    assert!(response
        .headers()
        .get(header::STRICT_TRANSPORT_SECURITY)
        .is_none());

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], true);
}

#[tokio::test]
async fn test_register_then_duplicate() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMAIL_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "messageId": "m" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = create_test_state(&mock_server);
    let app = test_app(state.clone());

    let response = app.clone().oneshot(registration_request(&ana())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["message"], "registration successful");

    let stored = state
        .store
        .find_by_contact("ana@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.full_name, "Ana Lopez");
    assert_eq!(stored.contact_method, ContactMethod::Email);
    assert_eq!(stored.guests, 2);

    let response = app.oneshot(registration_request(&ana())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["message"], "already registered");
}

#[tokio::test]
async fn test_whatsapp_registration_uses_template_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(WHATSAPP_PATH))
        .and(json_body_matcher(json!({
            "messaging_product": "whatsapp",
            "to": "5215512345678",
            "type": "template",
            "template": { "name": "rsvp_confirmation", "language": { "code": "es" } }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "messages": [{ "id": "wamid.1" }] })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(EMAIL_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = test_app(create_test_state(&mock_server));

    let response = app
        .oneshot(registration_request(&json!({
            "fullName": "Luis Perez",
            "contactMethod": "whatsapp",
            "contactInfo": "5215512345678",
            "guests": 0
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let mock_server = MockServer::start().await;
    let state = create_test_state(&mock_server);
    let app = test_app(state.clone());

    let response = app
        .oneshot(registration_request(&json!({
            "fullName": "Ana Lopez",
            "contactMethod": "email",
            "contactInfo": "not-an-email",
            "guests": 2
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&body_json(response).await), vec!["contactInfo"]);
    assert!(state.store.find_by_contact("not-an-email").await.unwrap().is_none());
}

#[tokio::test]
async fn test_whatsapp_rejects_non_phone() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_state(&mock_server));

    let response = app
        .oneshot(registration_request(&json!({
            "fullName": "Ana Lopez",
            "contactMethod": "whatsapp",
            "contactInfo": "notaphone",
            "guests": 2
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_fields(&body_json(response).await).contains(&"contactInfo".to_string()));
}

#[tokio::test]
async fn test_guest_boundaries() {
    let mock_server = MockServer::start().await;
    mount_providers_ok(&mock_server).await;
    let app = test_app(create_test_state(&mock_server));

    for (i, (guests, expected)) in [
        (-1, StatusCode::BAD_REQUEST),
        (11, StatusCode::BAD_REQUEST),
        (0, StatusCode::CREATED),
        (10, StatusCode::CREATED),
    ]
    .into_iter()
    .enumerate()
    {
        let body = json!({
            "fullName": "Guest Tester",
            "contactMethod": "email",
            "contactInfo": format!("guest{}@example.com", i),
            "guests": guests
        });
        let response = app.clone().oneshot(registration_request(&body)).await.unwrap();
        assert_eq!(response.status(), expected, "guests = {}", guests);
    }
}

#[tokio::test]
async fn test_all_field_errors_reported_together() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_state(&mock_server));

    let response = app
        .oneshot(registration_request(&json!({
            "contactMethod": "carrier-pigeon",
            "guests": "many"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_fields(&body_json(response).await),
        vec!["fullName", "contactMethod", "contactInfo", "guests"]
    );
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_state(&mock_server));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/registration")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"fullName\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&body_json(response).await), vec!["body"]);
}

#[tokio::test]
async fn test_verification_before_and_after_registration() {
    let mock_server = MockServer::start().await;
    mount_providers_ok(&mock_server).await;
    let app = test_app(create_test_state(&mock_server));

    let response = app
        .clone()
        .oneshot(verification_request("ana@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["registered"], false);

    let response = app.clone().oneshot(registration_request(&ana())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(verification_request("ana@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["registered"], true);
}

#[tokio::test]
async fn test_contact_match_ignores_case() {
    let mock_server = MockServer::start().await;
    mount_providers_ok(&mock_server).await;
    let app = test_app(create_test_state(&mock_server));

    let response = app.clone().oneshot(registration_request(&ana())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut shouting = ana();
    shouting["contactInfo"] = json!("Ana@Example.com");
    let response = app.clone().oneshot(registration_request(&shouting)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(verification_request("ANA@EXAMPLE.COM"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["registered"], true);

    // Padding is trimmed on lookup too.
    let response = app
        .oneshot(verification_request("%20ana@example.com%20"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["registered"], true);
}

#[tokio::test]
async fn test_verification_requires_contact_info() {
    let mock_server = MockServer::start().await;
    let app = test_app(create_test_state(&mock_server));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/verification")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notification_failure_keeps_registration() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EMAIL_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Key not found"))
        .mount(&mock_server)
        .await;

    let state = create_test_state(&mock_server);
    let app = test_app(state.clone());

    let response = app.clone().oneshot(registration_request(&ana())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["message"], "internal server error");
    assert!(!json.to_string().contains("Key not found"));

    // Persisted even though the confirmation failed
    assert!(state
        .store
        .find_by_contact("ana@example.com")
        .await
        .unwrap()
        .is_some());

    let response = app.oneshot(registration_request(&ana())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_store_failure_is_opaque() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let database = DatabaseConfig {
        host: "127.0.0.1".into(),
        port: 1,
        acquire_timeout: Duration::from_millis(500),
        ..DatabaseConfig::default()
    };
    let store = AttendeeStore::MySql(MySqlStore::connect_lazy(&database));
    let app = test_app(AppState::new(store, test_notifier(&mock_server)));

    let response = app.clone().oneshot(registration_request(&ana())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(body_json(response).await["message"], "internal server error");

    let response = app
        .oneshot(verification_request("ana@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], "internal server error");
}

#[tokio::test]
async fn test_registration_rate_limit_per_caller() {
    let mock_server = MockServer::start().await;
    mount_providers_ok(&mock_server).await;

    let rate_limit = RateLimitState::new(
        &RateLimitConfig {
            registration_max: 1,
            ..RateLimitConfig::default()
        },
        true,
    );
    let app = create_router(
        create_test_state(&mock_server),
        rate_limit,
        Environment::Development,
    );

    let from = |caller: &str, contact: &str| {
        let mut request = registration_request(&json!({
            "fullName": "Ana Lopez",
            "contactMethod": "email",
            "contactInfo": contact,
            "guests": 1
        }));
        request
            .headers_mut()
            .insert("x-forwarded-for", caller.parse().unwrap());
        request
    };

    let response = app
        .clone()
        .oneshot(from("198.51.100.1", "one@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(from("198.51.100.1", "two@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Verification is not subject to the registration limit
    let mut request = verification_request("one@example.com");
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.1".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(from("198.51.100.2", "two@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_cors_preflight_and_production_headers() {
    let mock_server = MockServer::start().await;
    let app = create_router(
        create_test_state(&mock_server),
        RateLimitState::permissive(),
        Environment::Production,
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/registration")
                .header(header::ORIGIN, "https://rsvp.vercel.app")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://rsvp.vercel.app"
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
    assert!(response
        .headers()
        .contains_key(header::STRICT_TRANSPORT_SECURITY));
}
