use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;

use prism_data::models::Role;
use prism_data::repository::InMemoryStorage;
use prism_domain::entities::NewAccountInput;
use prism_domain::health::StorageMode;

use crate::api::{build_state, create_app};
use crate::config::AppConfig;

const API_KEY: &str = "test-client-key";
const ADMIN_PASSWORD: &str = "admin-pass-1";
const STAFF_PASSWORD: &str = "staff-pass-1";

async fn test_app() -> Router {
    let config = AppConfig {
        client_api_key: Some(API_KEY.to_string()),
        ..AppConfig::default()
    };
    let state = build_state(&config, InMemoryStorage::new(), StorageMode::InMemory).unwrap();

    for (username, password, role) in [("admin", ADMIN_PASSWORD, Role::Admin), ("maria", STAFF_PASSWORD, Role::Staff)] {
        state
            .services
            .accounts
            .create_account(NewAccountInput {
                username: username.to_string(),
                password: password.to_string(),
                full_name: format!("Test {}", username),
                email: None,
                role,
            })
            .await
            .unwrap();
    }

    create_app(state, &config)
}

/// Next day the clinic is open (Sundays are closed by default)
fn next_open_day() -> NaiveDate {
    let mut date = Local::now().date_naive() + Duration::days(1);
    while date.weekday() == Weekday::Sun {
        date += Duration::days(1);
    }
    date
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
    request
}

fn with_api_key(mut request: Request<Body>) -> Request<Body> {
    request.headers_mut().insert("x-api-key", API_KEY.parse().unwrap());
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Log in and return the `name=value` part of the session cookie
async fn login(app: &Router, username: &str, password: &str) -> String {
    let request = json_request(
        Method::POST,
        "/login",
        json!({ "username": username, "password": password }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

fn staged_body(date: NaiveDate) -> Value {
    json!({
        "full_name": "Ana Reyes",
        "contact_number": "09171234567",
        "preferred_date": date,
        "preferred_time": "10:00:00",
        "notes": "First visit"
    })
}

#[tokio::test]
async fn test_health_reports_in_memory_fallback_as_degraded() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"]["database"]["status"], "degraded");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn test_protected_routes_require_credentials() {
    let app = test_app().await;

    let (status, body) = send(&app, get("/api/patients")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");

    let mut wrong_key = get("/api/patients");
    wrong_key.headers_mut().insert("x-api-key", "guess".parse().unwrap());
    let (status, _) = send(&app, wrong_key).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, with_api_key(get("/api/patients"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_preflight_passes_without_credentials() {
    let app = test_app().await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/patients")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_login_session_and_logout() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/login", json!({ "username": "admin", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let cookie = login(&app, "admin", ADMIN_PASSWORD).await;
    assert!(cookie.starts_with("prism.sid="));

    let (status, body) = send(&app, with_cookie(get("/api/session"), &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["roles"][0], "admin");

    let logout = with_cookie(json_request(Method::POST, "/logout", json!({})), &cookie);
    let (status, _) = send(&app, logout).await;
    assert_eq!(status, StatusCode::OK);

    // The signed cookie outlives its session but is no longer accepted
    let (status, _) = send(&app, with_cookie(get("/api/session"), &cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_account_administration_is_admin_only() {
    let app = test_app().await;
    let staff = login(&app, "maria", STAFF_PASSWORD).await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;

    let new_user = json!({
        "username": "joy",
        "password": "joy-pass-123",
        "full_name": "Joy Cruz"
    });

    let (status, body) = send(&app, with_cookie(json_request(Method::POST, "/adduser", new_user.clone()), &staff)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = send(&app, with_cookie(json_request(Method::POST, "/adduser", new_user.clone()), &admin)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "staff");
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = send(&app, with_cookie(json_request(Method::POST, "/adduser", new_user), &admin)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, with_cookie(get("/getusers"), &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_archived_account_loses_its_session() {
    let app = test_app().await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;
    let staff = login(&app, "maria", STAFF_PASSWORD).await;

    let (_, body) = send(&app, with_cookie(get("/getusers"), &admin)).await;
    let maria_id = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|user| user["username"] == "maria")
        .map(|user| user["id"].clone())
        .unwrap();

    let update = json_request(Method::PUT, "/updateuser", json!({ "id": maria_id, "archived": true }));
    let (status, body) = send(&app, with_cookie(update, &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["archived"], true);

    let (status, _) = send(&app, with_cookie(get("/api/session"), &staff)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/login", json!({ "username": "maria", "password": STAFF_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staged_submission_fills_slot() {
    let app = test_app().await;
    let date = next_open_day();

    let submit = with_api_key(json_request(Method::POST, "/api/appointments/staged", staged_body(date)));
    let (status, body) = send(&app, submit).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "pending");

    let (status, body) = send(&app, with_api_key(get(&format!("/api/booking/slots?date={}", date)))).await;
    assert_eq!(status, StatusCode::OK);
    let ten = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|slot| slot["time"] == "10:00:00")
        .unwrap();
    assert_eq!(ten["remaining"], 0);
    assert_eq!(ten["available"], false);

    let again = with_api_key(json_request(Method::POST, "/api/appointments/staged", staged_body(date)));
    let (status, body) = send(&app, again).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_confirm_flow_writes_patient_appointment_and_sale() {
    let app = test_app().await;
    let staff = login(&app, "maria", STAFF_PASSWORD).await;
    let date = next_open_day();

    let submit = with_api_key(json_request(Method::POST, "/api/appointments/staged", staged_body(date)));
    let (_, body) = send(&app, submit).await;
    let staged_id = body["appointment"]["id"].as_str().unwrap().to_string();

    let confirm_body = json!({
        "person_in_charge": "maria",
        "total_amount": 250000,
        "amount_paid": 100000,
        "payment_method": "cash"
    });
    let uri = format!("/api/appointments/staged/{}/confirm", staged_id);

    let (status, body) = send(&app, with_cookie(json_request(Method::POST, &uri, confirm_body.clone()), &staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["staged"]["status"], "confirmed");
    assert_eq!(body["patient"]["patient_name"], "Ana Reyes");
    assert_eq!(body["patient"]["remaining_balance"], 150000);
    assert_eq!(body["appointment"]["appointment_time"], "10:00:00");
    assert_eq!(body["sale"]["amount"], 100000);

    let (status, _) = send(&app, with_cookie(json_request(Method::POST, &uri, confirm_body), &staff)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, with_cookie(get("/api/sales"), &staff)).await;
    assert_eq!(body["sales"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, with_cookie(get("/api/appointments/staged?status=pending"), &staff)).await;
    assert!(body["appointments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_patient_list_pagination_links() {
    let app = test_app().await;
    let staff = login(&app, "maria", STAFF_PASSWORD).await;

    for name in ["Ana Reyes", "Ben Santos", "Carla Lim"] {
        let record = json!({
            "patient_name": name,
            "contact_number": "09170000000",
            "person_in_charge": "maria",
            "session_date": "2024-03-02",
            "total_amount": 50000,
            "amount_paid": 50000,
            "payment_method": "card"
        });
        let (status, _) = send(&app, with_cookie(json_request(Method::POST, "/api/patients", record), &staff)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, with_cookie(get("/api/patients?limit=2"), &staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["count"], 2);
    assert_eq!(body["next"], "/api/patients?limit=2&offset=2");
    assert!(body.get("previous").is_none());

    let (_, body) = send(&app, with_cookie(get("/api/patients?limit=2&offset=2"), &staff)).await;
    assert_eq!(body["count"], 1);
    assert!(body.get("next").is_none());
    assert_eq!(body["previous"], "/api/patients?limit=2&offset=0");
}

#[tokio::test]
async fn test_invalid_input_is_rejected_with_json_body() {
    let app = test_app().await;
    let staff = login(&app, "maria", STAFF_PASSWORD).await;

    let overpaid = json!({
        "patient_name": "Ana Reyes",
        "contact_number": "09170000000",
        "person_in_charge": "maria",
        "session_date": "2024-03-02",
        "total_amount": 1000,
        "amount_paid": 5000,
        "payment_method": "cash"
    });
    let (status, body) = send(&app, with_cookie(json_request(Method::POST, "/api/patients", overpaid), &staff)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = send(&app, with_cookie(get("/api/patients/not-a-uuid"), &staff)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, with_cookie(get("/api/financial-overview?year=2024&month=13"), &staff)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_mutations_need_admin_but_listing_does_not() {
    let app = test_app().await;
    let staff = login(&app, "maria", STAFF_PASSWORD).await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;

    let treatment = json!({ "name": "Hydrafacial", "price": 350000, "duration_minutes": 60 });

    let (status, _) = send(&app, with_cookie(json_request(Method::POST, "/api/treatments", treatment.clone()), &staff)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, with_cookie(json_request(Method::POST, "/api/treatments", treatment), &admin)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["treatment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, with_cookie(get("/api/treatments"), &staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["treatments"].as_array().unwrap().len(), 1);

    let archive = json_request(Method::PUT, &format!("/api/treatments/{}/archive", id), json!({ "archived": true }));
    let (status, _) = send(&app, with_cookie(archive, &admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, with_cookie(get("/api/treatments"), &staff)).await;
    assert!(body["treatments"].as_array().unwrap().is_empty());
    let (_, body) = send(&app, with_cookie(get("/api/treatments?include_archived=true"), &staff)).await;
    assert_eq!(body["treatments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_financial_overview_totals() {
    let app = test_app().await;
    let admin = login(&app, "admin", ADMIN_PASSWORD).await;

    let (_, body) = send(&app, with_cookie(json_request(Method::POST, "/api/categories", json!({ "name": "Supplies" })), &admin)).await;
    let category_id = body["category"]["id"].clone();

    let expense = json!({
        "category_id": category_id,
        "description": "Gloves",
        "amount": 40000,
        "expense_date": "2024-03-05"
    });
    let (status, _) = send(&app, with_cookie(json_request(Method::POST, "/api/expenses", expense), &admin)).await;
    assert_eq!(status, StatusCode::CREATED);

    let sale = json!({
        "description": "Walk-in facial",
        "amount": 150000,
        "payment_method": "cash",
        "sale_date": "2024-03-02"
    });
    let (status, _) = send(&app, with_cookie(json_request(Method::POST, "/api/sales", sale), &admin)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, with_cookie(get("/api/financial-overview?year=2024&month=3"), &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sales"], 150000);
    assert_eq!(body["total_expenses"], 40000);
    assert_eq!(body["net_income"], 110000);
    assert_eq!(body["monthly"].as_array().unwrap().len(), 12);
    assert_eq!(body["expenses_by_category"][0]["category_name"], "Supplies");
}

#[tokio::test]
async fn test_oversized_sale_amounts_are_rejected() {
    let app = test_app().await;

    for _ in 0..2 {
        let sale = json!({
            "description": "Bulk package",
            "amount": i64::MAX,
            "payment_method": "cash",
            "sale_date": "2024-03-02"
        });
        let (status, body) = send(&app, with_api_key(json_request(Method::POST, "/api/sales", sale))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    let (status, body) = send(&app, with_api_key(get("/api/financial-overview?year=2024&month=3"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sales"], 0);
}

#[tokio::test]
async fn test_patient_offset_past_the_end_is_an_empty_page() {
    let app = test_app().await;
    let staff = login(&app, "maria", STAFF_PASSWORD).await;

    let uri = format!("/api/patients?offset={}", usize::MAX);
    let (status, body) = send(&app, with_cookie(get(&uri), &staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert!(body["next"].is_null());
}
