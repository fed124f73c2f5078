//! End-to-end tests against an in-process server.
//!
//! Tests cover:
//! - Pairing code generation and replacement
//! - Code verification and caregiver/recipient linking
//! - Role and code failures
//! - Hourly word counts and the progress summary
//! - Session enforcement

use std::sync::Arc;

use reqwest::StatusCode;
use rusqlite::params;
use serde_json::{json, Value};
use tempfile::TempDir;

use carelink::auth::accounts::{self, NewAccount};
use carelink::auth::{session, Role};
use carelink::config::Config;
use carelink::db;
use carelink::routes;
use carelink::speech::SilentSynthesizer;
use carelink::state::{AppState, DbPool};

struct TestServer {
    base: String,
    pool: DbPool,
    client: reqwest::Client,
    _temp: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(routes::api()).await
    }

    /// Start with the test seed endpoint mounted, as the binary does under CARELINK_TEST_SEED.
    async fn start_seeded() -> Self {
        Self::start_with(routes::api().merge(routes::seed::router())).await
    }

    async fn start_with(router: axum::Router<AppState>) -> Self {
        let temp = TempDir::new().unwrap();
        let pool = db::create_pool(&temp.path().join("test.db")).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let state = AppState {
            db: pool.clone(),
            config: Config::default(),
            speech: Arc::new(SilentSynthesizer),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router.with_state(state)).await.unwrap();
        });

        TestServer {
            base: format!("http://{}", addr),
            pool,
            client: reqwest::Client::new(),
            _temp: temp,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Register a user with the given role and return (user_id, session token).
    fn user(&self, username: &str, role: Role) -> (i64, String) {
        let user_id = if role == Role::Unknown {
            let conn = self.pool.get().unwrap();
            conn.execute("INSERT INTO users (username) VALUES (?1)", params![username])
                .unwrap();
            conn.last_insert_rowid()
        } else {
            accounts::register(
                &self.pool,
                &NewAccount {
                    username: username.to_string(),
                    email: String::new(),
                    first_name: String::new(),
                    last_name: String::new(),
                    role,
                    is_staff: false,
                },
            )
            .unwrap()
            .id
        };
        let token = session::create_session(&self.pool, user_id, 1).unwrap();
        (user_id, token)
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    fn code_count(&self, user_id: i64) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM pairing_codes WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    fn link_count(&self) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM caregiver_recipient_links",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }
}

// ============================================================================
// PAIRING
// ============================================================================

#[tokio::test]
async fn test_recipient_code_links_caregiver() {
    let server = TestServer::start().await;
    let (cg_id, cg_token) = server.user("cg1", Role::Caregiver);
    let (_, cr_token) = server.user("cr1", Role::Recipient);

    let (status, body) = server.post(&cr_token, "/codes", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let code = body["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 7);
    assert_eq!(code.as_bytes()[3], b' ');
    assert_eq!(body["time"].as_str().unwrap().len(), 8);

    let (status, body) = server
        .post(&cg_token, "/codes/verify", json!({ "code_check": code }))
        .await;
    assert_eq!(status, StatusCode::OK, "verify failed: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Code verified successfully.");
    assert_eq!(server.link_count(), 1);

    // Both sides see the link
    let (status, body) = server.get(&cg_token, "/caregiver/recipients").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipients"][0]["username"], "cr1");

    let (_, body) = server.get(&cr_token, "/recipient/caregivers").await;
    assert_eq!(body["caregivers"][0]["username"], "cg1");
    assert_eq!(
        body["caregivers"][0]["number_id"],
        format!("{:06}", cg_id).as_str()
    );

    // Verifying again is accepted and does not duplicate the link
    let (status, _) = server
        .post(&cg_token, "/codes/verify", json!({ "code_check": code }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.link_count(), 1);
}

#[tokio::test]
async fn test_digit_boxes_verify_like_full_code() {
    let server = TestServer::start().await;
    let (_, cg_token) = server.user("cg1", Role::Caregiver);
    let (_, cr_token) = server.user("cr1", Role::Recipient);

    let (_, body) = server.post(&cg_token, "/codes", json!({})).await;
    let digits: Vec<String> = body["code"]
        .as_str()
        .unwrap()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .map(|c| c.to_string())
        .collect();

    let (status, body) = server
        .post(
            &cr_token,
            "/codes/verify/digits",
            json!({
                "d1": digits[0], "d2": digits[1], "d3": digits[2],
                "d4": digits[3], "d5": digits[4], "d6": digits[5],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "verify failed: {}", body);
    assert_eq!(server.link_count(), 1);
}

#[tokio::test]
async fn test_generating_twice_keeps_one_code() {
    let server = TestServer::start().await;
    let (cg_id, cg_token) = server.user("cg1", Role::Caregiver);

    server.post(&cg_token, "/codes", json!({})).await;
    let (_, second) = server.post(&cg_token, "/codes", json!({})).await;
    assert_eq!(server.code_count(cg_id), 1);

    let stored: String = server
        .pool
        .get()
        .unwrap()
        .query_row(
            "SELECT code FROM pairing_codes WHERE user_id = ?1",
            params![cg_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, second["code"].as_str().unwrap());
}

#[tokio::test]
async fn test_unknown_code_is_not_found() {
    let server = TestServer::start().await;
    let (_, cg_token) = server.user("cg1", Role::Caregiver);

    let (status, body) = server
        .post(&cg_token, "/codes/verify", json!({ "code_check": "000 000" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Code not found. Please try again.");
    assert_eq!(server.link_count(), 0);
}

#[tokio::test]
async fn test_user_without_role_is_rejected() {
    let server = TestServer::start().await;
    let (_, cr_token) = server.user("cr1", Role::Recipient);
    let (_, nobody_token) = server.user("nobody", Role::Unknown);

    let (_, body) = server.post(&cr_token, "/codes", json!({})).await;
    let code = body["code"].as_str().unwrap().to_string();

    let (status, body) = server
        .post(&nobody_token, "/codes/verify", json!({ "code_check": code }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User role not recognized.");
    assert_eq!(server.link_count(), 0);
}

#[tokio::test]
async fn test_overlong_code_check_is_bad_request() {
    let server = TestServer::start().await;
    let (_, cg_token) = server.user("cg1", Role::Caregiver);

    let (status, _) = server
        .post(
            &cg_token,
            "/codes/verify",
            json!({ "code_check": "123 456 789 0" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_requests_without_session_are_unauthorized() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/codes"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = server.get("not-a-real-token", "/progress").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// PROGRESS
// ============================================================================

#[tokio::test]
async fn test_invalid_bar_date_is_bad_request() {
    let server = TestServer::start().await;
    let (_, token) = server.user("cr1", Role::Recipient);

    let (status, _) = server
        .get(&token, "/progress/bars?bar_date=2024-13-40")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.get(&token, "/progress/bars").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bars_count_words_per_hour() {
    let server = TestServer::start().await;
    let (user_id, token) = server.user("cr1", Role::Recipient);

    {
        let conn = server.pool.get().unwrap();
        for (text, time) in [
            ("hello world", "09:15:00"),
            ("one", "09:45:00"),
            ("late night words", "23:59:59"),
        ] {
            conn.execute(
                "INSERT INTO histories (text, date, time, user_id) VALUES (?1, '2024-05-01', ?2, ?3)",
                params![text, time, user_id],
            )
            .unwrap();
        }
    }

    let (status, body) = server
        .get(&token, "/progress/bars?bar_date=2024-05-01")
        .await;
    assert_eq!(status, StatusCode::OK);
    let bar = body["bar"].as_array().unwrap();
    assert_eq!(bar.len(), 24);
    assert_eq!(bar[9], 3);
    assert_eq!(bar[23], 3);
    assert_eq!(bar.iter().filter_map(Value::as_u64).sum::<u64>(), 6);

    let (_, body) = server
        .get(&token, "/progress/bars?bar_date=2024-05-02")
        .await;
    assert!(body["bar"]
        .as_array()
        .unwrap()
        .iter()
        .all(|n| n.as_u64() == Some(0)));
}

#[tokio::test]
async fn test_speak_then_progress_summary() {
    let server = TestServer::start().await;
    let (_, token) = server.user("cr1", Role::Recipient);

    let (status, main) = server.post(&token, "/boards", json!({ "name": "Main" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, food) = server.post(&token, "/boards", json!({ "name": "Food" })).await;

    for (text, board) in [
        ("i want water", &main),
        ("hello", &main),
        ("apple please", &food),
        ("yes", &main),
    ] {
        let (status, body) = server
            .post(
                &token,
                "/speak",
                json!({ "input_data": text, "board_id": board["id"] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "speak failed: {}", body);
        assert_eq!(body["success"], true);
    }

    let (status, body) = server.get(&token, "/progress").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_recipient"], true);
    assert_eq!(body["histories"].as_array().unwrap().len(), 4);
    assert_eq!(body["histories"][0]["text"], "yes");

    let names: Vec<&str> = body["board_names"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(names, vec!["Main", "Food"]);
    let shares: Vec<f64> = body["board_representation"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_f64)
        .collect();
    assert_eq!(shares, vec![75.0, 25.0]);
}

#[tokio::test]
async fn test_speaking_on_missing_board_is_not_found() {
    let server = TestServer::start().await;
    let (_, token) = server.user("cg1", Role::Caregiver);

    let (status, _) = server
        .post(&token, "/speak", json!({ "input_data": "hi", "board_id": 999 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = server.get(&token, "/progress").await;
    assert_eq!(body["is_recipient"], false);
    assert!(body["histories"].as_array().unwrap().is_empty());
}

// ============================================================================
// PROFILE, BOARDS AND LIBRARY
// ============================================================================

#[tokio::test]
async fn test_profile_reports_role_and_number_id() {
    let server = TestServer::start().await;
    let (cg_id, cg_token) = server.user("cg1", Role::Caregiver);
    let (_, nobody_token) = server.user("nobody", Role::Unknown);

    let (status, body) = server.get(&cg_token, "/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "cg1");
    assert_eq!(body["role"], "caregiver");
    assert_eq!(body["is_cg"], true);
    assert_eq!(body["is_cr"], false);
    assert_eq!(body["number_id"], format!("{:06}", cg_id).as_str());

    let (status, body) = server.get(&nobody_token, "/profile").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User role not recognized.");

    // No recipient profile for a caregiver
    let (status, _) = server.get(&cg_token, "/recipient/caregivers").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_board_tab_and_placement_flow() {
    let server = TestServer::start().await;
    let (_, token) = server.user("cg1", Role::Caregiver);

    let (status, board) = server.post(&token, "/boards", json!({ "name": "Daily" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, again) = server.post(&token, "/boards", json!({ "name": "Daily" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["id"], again["id"]);

    let tabs_path = format!("/boards/{}/tabs", board["id"]);
    let (_, body) = server.get(&token, &tabs_path).await;
    assert_eq!(body["tabs"][0]["name"], "Main");
    assert_eq!(body["tabs"][0]["straps_num"], 5);

    let (status, _) = server
        .post(&token, &tabs_path, json!({ "name": "Food", "straps_num": 6 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, category) = server
        .post(&token, "/categories", json!({ "name": "Family" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["display_name"], "Family (private)");

    let (status, image) = server
        .post(
            &token,
            "/images",
            json!({
                "label": "mum",
                "category_id": category["id"],
                "image_path": "uploads/mum.png",
                "public": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(image["public"], false);

    let tab_id = body["tabs"][0]["id"].clone();
    let placement_path = format!("/tabs/{}/images", tab_id);
    let (status, placed) = server
        .post(&token, &placement_path, json!({ "image_id": image["id"] }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["created"], true);
    assert_eq!(placed["position_x"], "0");

    let (status, placed) = server
        .post(&token, &placement_path, json!({ "image_id": image["id"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(placed["created"], false);

    let (_, listed) = server.get(&token, &placement_path).await;
    assert_eq!(listed["images"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_overlong_speech_is_bad_request() {
    let server = TestServer::start().await;
    let (_, token) = server.user("cr1", Role::Recipient);
    let (_, board) = server.post(&token, "/boards", json!({ "name": "Main" })).await;

    let (status, _) = server
        .post(
            &token,
            "/speak",
            json!({ "input_data": "a".repeat(251), "board_id": board["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// TEST SEED
// ============================================================================

#[tokio::test]
async fn test_seed_registers_user_and_issues_session() {
    let server = TestServer::start_seeded().await;

    let resp = server
        .client
        .get(server.url("/test/seed?username=cr1&role=recipient"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("carelink_session="));
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let (status, profile) = server.get(&token, "/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "cr1");
    assert_eq!(profile["is_cr"], true);

    // Seeding again reuses the user
    let (_, again) = server.get(&token, "/test/seed?username=cr1&role=recipient").await;
    assert_eq!(again["user_id"], body["user_id"]);
    assert_ne!(again["token"], body["token"]);
}

#[tokio::test]
async fn test_seed_is_not_mounted_by_default() {
    let server = TestServer::start().await;
    let resp = server
        .client
        .get(server.url("/test/seed"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
