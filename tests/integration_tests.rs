//! Integration tests for the Tier Rewards Server API
//!
//! These tests drive the full router with `oneshot` requests against a
//! throwaway database and media directory, with the clock pinned to known
//! local times.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{FixedOffset, TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use tier_rewards_server::{
    AppState, Clock, Config, build_router,
    db::{self, queries::require_user, tables},
    models::LevelRecord,
    open_database,
    routes::ensure_staff_user,
    storage::LocalFileStorage,
};

const STAFF_PHONE: &str = "900000001";
const STAFF_PASSWORD: &str = "staff-pass-1";
const PASSWORD: &str = "s3cret-pass";
const BOUNDARY: &str = "X-TEST-BOUNDARY";

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a test configuration rooted in a temporary directory
fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
        media_root: temp_dir.path().join("media").to_string_lossy().to_string(),
        public_base_url: "http://localhost:8080".to_string(),
        allowed_origins: vec!["http://localhost:5173".to_string()],
        environment: "test".to_string(),
        session_secret: "test-session-secret".to_string(),
        session_ttl_secs: 86400,
        utc_offset_minutes: 60,
        welcome_bonus: Decimal::from(750),
        min_withdrawal: Decimal::from(3000),
        withdrawal_open_hour: 9,
        withdrawal_close_hour: 17,
        invite_subsidy_percent: Decimal::from(15),
        tasks_per_day: 1,
        max_upload_bytes: 1024 * 1024,
        admin_phone: None,
        admin_password: None,
    }
}

/// A moment in Luanda time (UTC+1) in March 2025
fn local(day: u32, hour: u32, minute: u32) -> Clock {
    let instant = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2025, 3, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc);
    Clock::Fixed(instant)
}

struct TestApp {
    state: AppState,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Fresh app at 10:00 local on 10 March 2025
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let db = open_database(&config.database_path).expect("Failed to create test database");
        let state = AppState::new(db, config).with_clock(local(10, 10, 0));
        Self {
            state,
            _temp_dir: temp_dir,
        }
    }

    fn set_time(&mut self, clock: Clock) {
        self.state.clock = clock;
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_to_json(response.into_body()).await)
    }

    /// Register a user and return (token, user id, invite code)
    async fn register(&self, phone: &str, invite_code: Option<&str>) -> (String, u64, String) {
        let mut body = json!({ "phone_number": phone, "password": PASSWORD });
        if let Some(code) = invite_code {
            body["invite_code"] = json!(code);
        }
        let (status, body) = self.send(json_request("POST", "/api/register", None, body)).await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);

        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_u64().unwrap(),
            body["user"]["invite_code"].as_str().unwrap().to_string(),
        )
    }

    /// Create the staff account and sign it in
    async fn staff_token(&self) -> String {
        ensure_staff_user(
            &self.state.db,
            STAFF_PHONE,
            STAFF_PASSWORD,
            self.state.clock.timestamp(),
        )
        .await
        .unwrap();

        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/login",
                None,
                json!({ "phone_number": STAFF_PHONE, "password": STAFF_PASSWORD }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    /// Insert a level directly
    async fn seed_level(&self, name: &str, price: i64, daily_gain: i64) -> u64 {
        let record = LevelRecord {
            name: name.to_string(),
            deposit_value: Decimal::from(price),
            daily_gain: Decimal::from(daily_gain),
            monthly_gain: Decimal::from(daily_gain * 30),
            cycle_days: 30,
            image: "level_images/seed.png".to_string(),
        };
        db::write(&self.state.db, move |write_txn| {
            let id = db::next_id(write_txn, tables::SEQ_LEVELS)?;
            let mut levels = write_txn.open_table(tables::LEVELS)?;
            db::put_record(&mut levels, id, &record)?;
            let mut names = write_txn.open_table(tables::LEVEL_NAMES)?;
            names.insert(record.name.as_str(), id)?;
            Ok(id)
        })
        .await
        .unwrap()
    }

    /// Set a user's available balance directly
    async fn set_balance(&self, user_id: u64, amount: i64) {
        db::write(&self.state.db, move |write_txn| {
            let mut users = write_txn.open_table(tables::USERS)?;
            let mut user = require_user(&users, user_id)?;
            user.available_balance = Decimal::from(amount);
            db::put_record(&mut users, user_id, &user)
        })
        .await
        .unwrap();
    }

    async fn profile(&self, token: &str) -> Value {
        let (status, body) = self.send(get_request("/api/profile", Some(token))).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn balance(&self, token: &str) -> Decimal {
        dec(&self.profile(token).await["user"]["available_balance"])
    }

    async fn add_bank_details(&self, token: &str) {
        let (status, _) = self
            .send(json_request(
                "PUT",
                "/api/profile/bank-details",
                Some(token),
                json!({
                    "bank_name": "BAI",
                    "iban": "ao06 0040 0000 1234 5678 1011 2",
                    "account_holder_name": "Ana Test"
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

/// Parse response body as JSON (Null for empty or non-JSON bodies)
async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Decimal fields are serialized as strings
fn dec(value: &Value) -> Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected decimal string, got {}", value))
        .parse()
        .unwrap()
}

/// Create a request with a JSON body
fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Create a GET request
fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Create a POST request without a body
fn post_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Create a multipart POST request with text fields and an optional file
fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let app = TestApp::new();

    let (status, body) = app.send(get_request("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert!(body["version"].as_str().is_some());
}

// =============================================================================
// Account Tests
// =============================================================================

#[tokio::test]
async fn test_register_grants_welcome_bonus_and_session() {
    let app = TestApp::new();

    let (token, _, invite_code) = app.register("923000001", None).await;
    assert_eq!(invite_code.len(), 8);

    let profile = app.profile(&token).await;
    assert_eq!(dec(&profile["user"]["available_balance"]), Decimal::from(750));
    assert_eq!(dec(&profile["user"]["subsidy_balance"]), Decimal::ZERO);
    assert_eq!(profile["user"]["level_active"], false);
    assert_eq!(profile["bank_details"]["iban"], "");
}

#[tokio::test]
async fn test_register_duplicate_phone_returns_conflict() {
    let app = TestApp::new();
    app.register("923000001", None).await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/register",
            None,
            json!({ "phone_number": "923000001", "password": PASSWORD }),
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_register_rejects_invalid_phone_and_weak_password() {
    let app = TestApp::new();

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/register",
            None,
            json!({ "phone_number": "92-300", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/register",
            None,
            json!({ "phone_number": "923000001", "password": "12345678" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_with_unknown_invite_code_creates_no_user() {
    let app = TestApp::new();

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/register",
            None,
            json!({
                "phone_number": "923000001",
                "password": PASSWORD,
                "invite_code": "deadbeef"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid invite code.");

    // The phone number is still free
    let (token, _, _) = app.register("923000001", None).await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_register_info_prefills_invite_code() {
    let app = TestApp::new();

    let (status, body) = app
        .send(get_request("/api/register?invite=abcd1234", None))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invite_code"], "abcd1234");
    assert_eq!(body["whatsapp_link"], "#");
    assert_eq!(body["telegram_link"], "#");
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = TestApp::new();
    app.register("923000001", None).await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            json!({ "phone_number": "923000001", "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            json!({ "phone_number": "923000001", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.send(post_request("/api/logout", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(get_request("/api/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.send(get_request("/api/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let forged = "ab".repeat(32);
    let (status, _) = app.send(get_request("/api/profile", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_expires() {
    let mut app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;

    // Sessions last one day in the test config
    app.set_time(local(11, 9, 59));
    let (status, _) = app.send(get_request("/api/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    app.set_time(local(11, 10, 0));
    let (status, _) = app.send(get_request("/api/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_revokes_other_sessions() {
    let app = TestApp::new();
    let (first, _, _) = app.register("923000001", None).await;

    let (_, body) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            json!({ "phone_number": "923000001", "password": PASSWORD }),
        ))
        .await;
    let second = body["token"].as_str().unwrap().to_string();

    // Wrong current password
    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/profile/password",
            Some(&first),
            json!({ "old_password": "not-it-123", "new_password": "n3w-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/profile/password",
            Some(&first),
            json!({ "old_password": PASSWORD, "new_password": "n3w-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(get_request("/api/profile", Some(&first))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(get_request("/api/profile", Some(&second))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            json!({ "phone_number": "923000001", "password": "n3w-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Menu & Team Tests
// =============================================================================

#[tokio::test]
async fn test_menu_lists_levels_by_price() {
    let app = TestApp::new();
    app.seed_level("Gold", 20000, 800).await;
    app.seed_level("Bronze", 5000, 150).await;

    let (status, body) = app.send(get_request("/api/menu", None)).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["levels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bronze", "Gold"]);
    assert!(body["user_level"].is_null());
    assert_eq!(
        body["levels"][0]["image_url"],
        "http://localhost:8080/media/level_images/seed.png"
    );
}

#[tokio::test]
async fn test_about_falls_back_until_settings_saved() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;

    let (_, body) = app.send(get_request("/api/about", Some(&token))).await;
    assert_eq!(body["history_text"], "Platform history is not available.");

    let staff = app.staff_token().await;
    let (status, _) = app
        .send(json_request(
            "PUT",
            "/api/admin/settings",
            Some(&staff),
            json!({ "history_text": "Founded in Luanda.", "whatsapp_link": "https://wa.me/1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(get_request("/api/about", Some(&token))).await;
    assert_eq!(body["history_text"], "Founded in Luanda.");
    let (_, body) = app.send(get_request("/api/menu", None)).await;
    assert_eq!(body["whatsapp_link"], "https://wa.me/1");
    assert_eq!(body["telegram_link"], "#");
}

#[tokio::test]
async fn test_team_lists_invitees() {
    let app = TestApp::new();
    let (inviter, _, code) = app.register("923000001", None).await;
    let (_, invitee_id, _) = app.register("923000002", Some(&code)).await;
    app.register("923000003", None).await;
    // Joins in the same second as 923000002 under the pinned clock
    app.register("923000004", Some(&code)).await;

    let level_id = app.seed_level("Bronze", 5000, 150).await;
    app.set_balance(invitee_id, 5000).await;

    let (status, body) = app.send(get_request("/api/team", Some(&inviter))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team_count"], 2);
    let phones: Vec<&str> = body["team_members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["phone_number"].as_str().unwrap())
        .collect();
    assert_eq!(phones, vec!["923000004", "923000002"]);
    assert_eq!(body["team_members"][1]["investment_level"], "Not invested");
    assert_eq!(
        body["invite_link"],
        format!("http://localhost:8080/register?invite={}", code)
    );

    // Once the invitee buys a level, the team view shows it
    let (_, login) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            json!({ "phone_number": "923000002", "password": PASSWORD }),
        ))
        .await;
    let invitee = login["token"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(post_request(
            &format!("/api/levels/{}/purchase", level_id),
            Some(&invitee),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(get_request("/api/team", Some(&inviter))).await;
    assert_eq!(body["team_members"][0]["investment_level"], "Not invested");
    assert_eq!(body["team_members"][1]["investment_level"], "Bronze");
}

// =============================================================================
// Deposit Tests
// =============================================================================

#[tokio::test]
async fn test_deposit_is_credited_exactly_once() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;

    let (status, body) = app
        .send(multipart_request(
            "/api/deposit",
            &token,
            &[("amount", "5000")],
            Some(("proof", "image/png", &b"fake-png"[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["deposit"]["is_approved"], false);
    let deposit_id = body["deposit"]["id"].as_u64().unwrap();

    // Pending deposits leave the balance alone
    assert_eq!(app.balance(&token).await, Decimal::from(750));

    let (_, pending) = app
        .send(get_request("/api/admin/deposits?pending=true", Some(&staff)))
        .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let uri = format!("/api/admin/deposits/{}/approve", deposit_id);
    let (status, body) = app.send(post_request(&uri, Some(&staff))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["credited"], true);

    let (status, body) = app.send(post_request(&uri, Some(&staff))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["credited"], false);

    assert_eq!(app.balance(&token).await, Decimal::from(5750));

    let (_, pending) = app
        .send(get_request("/api/admin/deposits?pending=true", Some(&staff)))
        .await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_deposit_proof_is_served_from_media() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;

    let (_, body) = app
        .send(multipart_request(
            "/api/deposit",
            &token,
            &[("amount", "1000")],
            Some(("proof", "image/jpeg", &b"jpeg-bytes"[..])),
        ))
        .await;
    let url = body["deposit"]["proof_url"].as_str().unwrap();
    let path = url.strip_prefix("http://localhost:8080").unwrap();
    assert!(path.starts_with("/media/deposit_proofs/"));

    let response = app
        .router()
        .oneshot(get_request(path, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"jpeg-bytes");
}

#[tokio::test]
async fn test_deposit_proof_goes_to_injected_storage() {
    let mut app = TestApp::new();
    let uploads = TempDir::new().unwrap();
    let storage = LocalFileStorage::new(uploads.path(), "https://cdn.example.com/files/");
    let root = storage.root().to_path_buf();
    app.state = app.state.clone().with_storage(Arc::new(storage));
    let (token, _, _) = app.register("923000001", None).await;

    let (status, body) = app
        .send(multipart_request(
            "/api/deposit",
            &token,
            &[("amount", "1000")],
            Some(("proof", "image/png", &b"cdn-png"[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let url = body["deposit"]["proof_url"].as_str().unwrap();
    let name = url.strip_prefix("https://cdn.example.com/files/").unwrap();
    assert!(name.starts_with("deposit_proofs/") && name.ends_with(".png"));
    assert_eq!(std::fs::read(root.join(name)).unwrap(), b"cdn-png");
}

#[tokio::test]
async fn test_deposit_requires_image_and_valid_amount() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;

    // No proof
    let (status, _) = app
        .send(multipart_request("/api/deposit", &token, &[("amount", "5000")], None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Not an image
    let (status, _) = app
        .send(multipart_request(
            "/api/deposit",
            &token,
            &[("amount", "5000")],
            Some(("proof", "application/pdf", &b"%PDF"[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Zero amount
    let (status, _) = app
        .send(multipart_request(
            "/api/deposit",
            &token,
            &[("amount", "0")],
            Some(("proof", "image/png", &b"png"[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Too large
    let big = vec![0u8; 1024 * 1024 + 1];
    let (status, _) = app
        .send(multipart_request(
            "/api/deposit",
            &token,
            &[("amount", "5000")],
            Some(("proof", "image/png", &big[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_deposit_page_shows_accounts_and_level_values() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;
    app.seed_level("Silver", 10000, 300).await;
    app.seed_level("Bronze", 5000, 150).await;
    app.seed_level("Bronze Plus", 5000, 160).await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/admin/bank-accounts",
            Some(&staff),
            json!({
                "bank_name": "BFA",
                "iban": "AO06000600001111222233334",
                "account_holder_name": "Platform Lda"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(get_request("/api/deposit", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bank_accounts"][0]["bank_name"], "BFA");
    assert_eq!(
        body["deposit_instruction"],
        "Deposit instructions are not available."
    );
    let values: Vec<Decimal> = body["level_values"]
        .as_array()
        .unwrap()
        .iter()
        .map(dec)
        .collect();
    assert_eq!(values, vec![Decimal::from(5000), Decimal::from(10000)]);
}

// =============================================================================
// Level Tests
// =============================================================================

#[tokio::test]
async fn test_level_purchase_pays_inviter_subsidy_once() {
    let app = TestApp::new();
    let (inviter, _, code) = app.register("923000001", None).await;
    let (invitee, invitee_id, _) = app.register("923000002", Some(&code)).await;
    let bronze = app.seed_level("Bronze", 5000, 150).await;
    let silver = app.seed_level("Silver", 2000, 60).await;
    app.set_balance(invitee_id, 10000).await;

    let (status, body) = app
        .send(post_request(
            &format!("/api/levels/{}/purchase", bronze),
            Some(&invitee),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(dec(&body["available_balance"]), Decimal::from(5000));

    // 15% of 5000
    let profile = app.profile(&inviter).await;
    assert_eq!(dec(&profile["user"]["subsidy_balance"]), Decimal::from(750));
    assert_eq!(dec(&profile["user"]["available_balance"]), Decimal::from(1500));

    // Buying the same level again is refused
    let (status, _) = app
        .send(post_request(
            &format!("/api/levels/{}/purchase", bronze),
            Some(&invitee),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A second, different level pays nothing more
    let (status, _) = app
        .send(post_request(
            &format!("/api/levels/{}/purchase", silver),
            Some(&invitee),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let profile = app.profile(&inviter).await;
    assert_eq!(dec(&profile["user"]["subsidy_balance"]), Decimal::from(750));

    let (_, levels) = app.send(get_request("/api/levels", Some(&invitee))).await;
    let mut active: Vec<u64> = levels["active_level_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    active.sort();
    assert_eq!(active, vec![bronze, silver]);
}

#[tokio::test]
async fn test_level_purchase_requires_balance() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;
    let level = app.seed_level("Bronze", 5000, 150).await;

    let (status, body) = app
        .send(post_request(
            &format!("/api/levels/{}/purchase", level),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Insufficient balance"));
    assert_eq!(app.balance(&token).await, Decimal::from(750));

    let (status, _) = app
        .send(post_request("/api/levels/999/purchase", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_creates_level_with_image() {
    let app = TestApp::new();
    let staff = app.staff_token().await;
    let fields = [
        ("name", "Diamond"),
        ("deposit_value", "50000"),
        ("daily_gain", "2000"),
        ("monthly_gain", "60000"),
        ("cycle_days", "30"),
    ];

    let (status, body) = app
        .send(multipart_request(
            "/api/admin/levels",
            &staff,
            &fields,
            Some(("image", "image/webp", &b"webp"[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["level"]["name"], "Diamond");
    assert_eq!(dec(&body["level"]["daily_gain"]), Decimal::from(2000));

    // Names are unique
    let (status, _) = app
        .send(multipart_request(
            "/api/admin/levels",
            &staff,
            &fields,
            Some(("image", "image/webp", &b"webp"[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, menu) = app.send(get_request("/api/menu", None)).await;
    assert_eq!(menu["levels"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Task Tests
// =============================================================================

#[tokio::test]
async fn test_one_task_per_day_with_active_level() {
    let mut app = TestApp::new();
    let (token, user_id, _) = app.register("923000001", None).await;

    let (status, body) = app.send(post_request("/api/tasks/complete", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let level = app.seed_level("Bronze", 5000, 150).await;
    app.set_balance(user_id, 5000).await;
    app.send(post_request(
        &format!("/api/levels/{}/purchase", level),
        Some(&token),
    ))
    .await;

    let (status, body) = app.send(post_request("/api/tasks/complete", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(dec(&body["daily_gain"]), Decimal::from(150));

    let (status, _) = app.send(post_request("/api/tasks/complete", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = app.send(get_request("/api/tasks", Some(&token))).await;
    assert_eq!(page["has_active_level"], true);
    assert_eq!(page["tasks_completed_today"], 1);
    assert_eq!(page["max_tasks"], 1);

    // A new local day allows another task; the session is refreshed first
    app.set_time(local(11, 0, 30));
    let (_, login) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            json!({ "phone_number": "923000001", "password": PASSWORD }),
        ))
        .await;
    let token = login["token"].as_str().unwrap().to_string();
    let (status, _) = app.send(post_request("/api/tasks/complete", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.balance(&token).await, Decimal::from(300));
}

// =============================================================================
// Withdrawal Tests
// =============================================================================

async fn withdraw(app: &TestApp, token: &str, amount: i64) -> (StatusCode, Value) {
    app.send(json_request(
        "POST",
        "/api/withdrawal",
        Some(token),
        json!({ "amount": amount }),
    ))
    .await
}

/// Sign in again at the current test time
async fn relogin(app: &TestApp, phone: &str) -> String {
    let (_, body) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            json!({ "phone_number": phone, "password": PASSWORD }),
        ))
        .await;
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_withdrawal_rules() {
    let mut app = TestApp::new();
    let (token, user_id, _) = app.register("923000001", None).await;
    app.set_balance(user_id, 10000).await;

    // Bank details come first
    let (status, body) = withdraw(&app, &token, 3000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("bank details"));
    app.add_bank_details(&token).await;

    // Before the window opens
    app.set_time(local(10, 8, 59));
    let token = relogin(&app, "923000001").await;
    let (status, body) = withdraw(&app, &token, 3000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("09:00 and 17:00"));

    app.set_time(local(10, 10, 0));
    let (status, body) = withdraw(&app, &token, 2999).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("minimum"));

    let (status, body) = withdraw(&app, &token, 20000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient balance.");

    // Sub-cent and oversized amounts never reach the balance
    for amount in [json!("3000.005"), json!(100_000_000)] {
        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/withdrawal",
                Some(&token),
                json!({ "amount": amount }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.balance(&token).await, Decimal::from(10000));

    // Closing time itself is still inside the window
    app.set_time(local(10, 17, 0));
    let (status, body) = withdraw(&app, &token, 3000).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["withdrawal"]["status"], "Pending");
    assert_eq!(dec(&body["available_balance"]), Decimal::from(7000));

    let (status, body) = withdraw(&app, &token, 3000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You can only make 1 withdrawal per day.");

    // Next day, opening time on the dot
    app.set_time(local(11, 9, 0));
    let token = relogin(&app, "923000001").await;
    let (status, _) = withdraw(&app, &token, 3000).await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = app.send(get_request("/api/withdrawal", Some(&token))).await;
    assert_eq!(page["has_bank_details"], true);
    assert_eq!(page["has_withdrawn_today"], true);
    assert_eq!(page["withdrawals"].as_array().unwrap().len(), 2);
    assert_eq!(app.balance(&token).await, Decimal::from(4000));
}

#[tokio::test]
async fn test_rejected_withdrawal_is_refunded_once() {
    let app = TestApp::new();
    let (token, user_id, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;
    app.set_balance(user_id, 5000).await;
    app.add_bank_details(&token).await;

    let (_, body) = withdraw(&app, &token, 3000).await;
    let withdrawal_id = body["withdrawal"]["id"].as_u64().unwrap();
    assert_eq!(app.balance(&token).await, Decimal::from(2000));

    let reject = format!("/api/admin/withdrawals/{}/reject", withdrawal_id);
    let (status, body) = app.send(post_request(&reject, Some(&staff))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Rejected");
    assert_eq!(app.balance(&token).await, Decimal::from(5000));

    let (status, _) = app.send(post_request(&reject, Some(&staff))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let approve = format!("/api/admin/withdrawals/{}/approve", withdrawal_id);
    let (status, _) = app.send(post_request(&approve, Some(&staff))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(app.balance(&token).await, Decimal::from(5000));
}

// =============================================================================
// Roulette Tests
// =============================================================================

#[tokio::test]
async fn test_roulette_spin_consumes_spin_and_credits_prize() {
    let app = TestApp::new();
    let (token, user_id, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;

    let (status, body) = app.send(post_request("/api/roulette/spin", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You have no roulette spins available.");

    let (status, body) = app
        .send(json_request(
            "POST",
            &format!("/api/admin/users/{}/spins", user_id),
            Some(&staff),
            json!({ "spins": 2 }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roulette_spins"], 2);

    let (status, body) = app.send(post_request("/api/roulette/spin", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roulette_spins"], 1);
    let prize = dec(&body["prize"]);
    assert!(
        [100, 200, 300, 500, 1000, 2000]
            .iter()
            .any(|p| Decimal::from(*p) == prize)
    );

    let profile = app.profile(&token).await;
    assert_eq!(dec(&profile["user"]["subsidy_balance"]), prize);
    assert_eq!(
        dec(&profile["user"]["available_balance"]),
        Decimal::from(750) + prize
    );

    let (_, page) = app.send(get_request("/api/roulette", Some(&token))).await;
    assert_eq!(page["roulette_spins"], 1);
}

#[tokio::test]
async fn test_roulette_uses_configured_prizes() {
    let app = TestApp::new();
    let (token, user_id, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;

    let (status, body) = app
        .send(json_request(
            "PUT",
            "/api/admin/roulette-settings",
            Some(&staff),
            json!({ "prizes": "700, bogus" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weights"], json!([[700, 3]]));

    app.send(json_request(
        "POST",
        &format!("/api/admin/users/{}/spins", user_id),
        Some(&staff),
        json!({ "spins": 1 }),
    ))
    .await;

    let (_, body) = app.send(post_request("/api/roulette/spin", Some(&token))).await;
    assert_eq!(dec(&body["prize"]), Decimal::from(700));
}

// =============================================================================
// Daily Reward Tests
// =============================================================================

#[tokio::test]
async fn test_daily_reward_claimed_once_per_day() {
    let mut app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/admin/reward-codes",
            Some(&staff),
            json!({ "code": "MARCH10", "reward_amount": 200 }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Only one active code per date
    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/admin/reward-codes",
            Some(&staff),
            json!({ "code": "OTHER10", "reward_amount": 300 }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, page) = app.send(get_request("/api/rewards", Some(&token))).await;
    assert_eq!(page["has_code_today"], true);
    assert_eq!(dec(&page["today_reward_amount"]), Decimal::from(200));
    assert!(!page.to_string().contains("MARCH10"));

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/rewards/claim",
            Some(&token),
            json!({ "reward_code": "WRONG" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid"));

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/rewards/claim",
            Some(&token),
            json!({ "reward_code": "  MARCH10 " }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&body["subsidy_balance"]), Decimal::from(200));
    assert_eq!(dec(&body["available_balance"]), Decimal::from(950));

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/rewards/claim",
            Some(&token),
            json!({ "reward_code": "MARCH10" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, page) = app.send(get_request("/api/rewards", Some(&token))).await;
    assert_eq!(page["has_claimed_today"], true);
    assert_eq!(page["claims"].as_array().unwrap().len(), 1);

    // Yesterday's code is no good tomorrow
    app.set_time(local(11, 10, 0));
    let token = relogin(&app, "923000001").await;
    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/rewards/claim",
            Some(&token),
            json!({ "reward_code": "MARCH10" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deactivated_reward_code_cannot_be_claimed() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;

    let (_, code) = app
        .send(json_request(
            "POST",
            "/api/admin/reward-codes",
            Some(&staff),
            json!({ "code": "PAUSED", "reward_amount": "150.50", "valid_on": "2025-03-10" }),
        ))
        .await;
    let code_id = code["id"].as_u64().unwrap();

    let (status, body) = app
        .send(post_request(
            &format!("/api/admin/reward-codes/{}/deactivate", code_id),
            Some(&staff),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/rewards/claim",
            Some(&token),
            json!({ "reward_code": "PAUSED" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Income Tests
// =============================================================================

#[tokio::test]
async fn test_income_summary() {
    let app = TestApp::new();
    let (token, _, _) = app.register("923000001", None).await;
    let staff = app.staff_token().await;
    let level = app.seed_level("Bronze", 5000, 150).await;

    let (_, body) = app
        .send(multipart_request(
            "/api/deposit",
            &token,
            &[("amount", "5000")],
            Some(("proof", "image/png", &b"png"[..])),
        ))
        .await;
    let deposit_id = body["deposit"]["id"].as_u64().unwrap();
    app.send(post_request(
        &format!("/api/admin/deposits/{}/approve", deposit_id),
        Some(&staff),
    ))
    .await;
    app.send(post_request(
        &format!("/api/levels/{}/purchase", level),
        Some(&token),
    ))
    .await;
    app.send(post_request("/api/tasks/complete", Some(&token))).await;

    let (status, body) = app.send(get_request("/api/income", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&body["total_deposits"]), Decimal::from(5000));
    assert_eq!(dec(&body["today_income"]), Decimal::from(150));
    assert_eq!(dec(&body["total_withdrawals"]), Decimal::ZERO);
    assert_eq!(dec(&body["total_income"]), Decimal::from(150));
    assert_eq!(dec(&body["available_balance"]), Decimal::from(900));
    assert_eq!(body["active_level"]["level"]["name"], "Bronze");
}

// =============================================================================
// Staff Permission Tests
// =============================================================================

#[tokio::test]
async fn test_staff_endpoints_forbidden_for_users() {
    let app = TestApp::new();
    let (token, user_id, _) = app.register("923000001", None).await;

    let (status, body) = app
        .send(post_request("/api/admin/deposits/1/approve", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(json_request(
            "POST",
            &format!("/api/admin/users/{}/spins", user_id),
            Some(&token),
            json!({ "spins": 5 }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(get_request("/api/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(get_request("/api/admin/deposits", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_stats_and_unknown_records() {
    let app = TestApp::new();
    app.register("923000001", None).await;
    let staff = app.staff_token().await;

    let (status, body) = app.send(get_request("/api/admin/stats", Some(&staff))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_count"], 2);
    assert_eq!(body["pending_deposits"], 0);

    let (status, body) = app
        .send(post_request("/api/admin/deposits/42/approve", Some(&staff)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Deposit not found");

    let (status, _) = app
        .send(post_request("/api/admin/withdrawals/42/reject", Some(&staff)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
