//! API integration tests
//!
//! They talk to a running server (with its database and Redis) and are
//! ignored by default. Borrow and reservation flows need a seeded reader with
//! a reader type and an available copy, passed as TEST_READER_ID and
//! TEST_COPY_ID, plus TEST_SECOND_COPY_ID: another available copy of the same
//! book. Run them one at a time (`--test-threads=1`), they share the copy.

use circulation_server::models::user::{Role, UserClaims};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

/// Mint a token the server will accept
fn token_for(role: Role) -> String {
    let now = chrono::Utc::now().timestamp();
    UserClaims {
        sub: Uuid::new_v4(),
        username: "thuthu".to_string(),
        role,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&jwt_secret())
    .expect("Failed to sign token")
}

fn seeded(name: &str) -> Uuid {
    std::env::var(name)
        .unwrap_or_else(|_| panic!("{} must be set", name))
        .parse()
        .expect("Invalid UUID")
}

async fn post_action(client: &Client, token: &str, path: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .header("Idempotency-Key", Uuid::new_v4().to_string())
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

async fn get_json(client: &Client, token: &str, path: &str) -> Value {
    let response = client
        .get(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success(), "GET {} failed: {}", path, response.status());
    response.json().await.expect("Failed to parse response")
}

async fn copy_status(client: &Client, token: &str, copy_id: Uuid) -> String {
    let copy = get_json(client, token, &format!("/physical-copies/{}", copy_id)).await;
    copy["status"].as_str().expect("No copy status").to_string()
}

async fn book_of(client: &Client, token: &str, copy_id: Uuid) -> String {
    let copy = get_json(client, token, &format!("/physical-copies/{}", copy_id)).await;
    copy["book_id"].as_str().expect("No book id").to_string()
}

/// Reserve `copy_id` (which must be available) for `reader_id`
async fn reserve_copy(client: &Client, token: &str, reader_id: &str, copy_id: Uuid) -> String {
    let book_id = book_of(client, token, copy_id).await;
    let response = post_action(
        client,
        token,
        "/reservations",
        json!({ "reader_id": reader_id, "book_id": book_id, "physical_copy_id": copy_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let reservation: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(reservation["status"], "pending");
    assert_eq!(copy_status(client, token, copy_id).await, "reserved");
    reservation["id"].as_str().expect("No id").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrow-records", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_reader_role_is_forbidden() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrow-records", BASE_URL))
        .bearer_auth(token_for(Role::Reader))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_list_borrow_records() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrow-records?status=borrowed&page=1&limit=5", BASE_URL))
        .bearer_auth(token_for(Role::Librarian))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_borrow_for_unknown_reader() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrow-records", BASE_URL))
        .bearer_auth(token_for(Role::Librarian))
        .json(&json!({ "reader_id": Uuid::new_v4(), "copy_id": Uuid::new_v4() }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_failed_request_frees_idempotency_key() {
    let client = Client::new();
    let token = token_for(Role::Librarian);
    let key = Uuid::new_v4().to_string();
    let path = format!("{}/borrow-records/{}/cancel", BASE_URL, Uuid::new_v4());

    // both attempts reach the handler: the first failure gave the key back
    for _ in 0..2 {
        let response = client
            .post(&path)
            .bearer_auth(&token)
            .header("Idempotency-Key", &key)
            .json(&json!({}))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
#[ignore]
async fn test_malformed_renewal_body_is_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrow-records/{}/renew", BASE_URL, Uuid::new_v4()))
        .bearer_auth(token_for(Role::Librarian))
        .header("Content-Type", "application/json")
        .body(r#"{"new_due_date":"20-01-2024"}"#)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_borrow_lifecycle() {
    let client = Client::new();
    let token = token_for(Role::Librarian);
    let reader_id = seeded("TEST_READER_ID");
    let copy_id = seeded("TEST_COPY_ID");

    // Request
    let response = post_action(
        &client,
        &token,
        "/borrow-records",
        json!({ "reader_id": reader_id, "copy_id": copy_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let record: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(record["status"], "pending_approval");
    // a pending request does not hold the copy
    assert_eq!(record["physical_copy"]["status"], "available");
    let id = record["id"].as_str().expect("No id").to_string();

    // A second request for the same copy is refused
    let response = post_action(
        &client,
        &token,
        "/borrow-records",
        json!({ "reader_id": reader_id, "copy_id": copy_id }),
    )
    .await;
    assert!(response.status().is_client_error());

    // Approve
    let approve_key = Uuid::new_v4().to_string();
    let approve = || {
        client
            .post(format!("{}/borrow-records/{}/approve", BASE_URL, id))
            .bearer_auth(&token)
            .header("Idempotency-Key", &approve_key)
            .json(&json!({}))
            .send()
    };
    let response = approve().await.expect("Failed to send request");
    assert!(response.status().is_success());
    let record: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(record["status"], "borrowed");
    assert_eq!(record["physical_copy"]["status"], "borrowed");

    // Replaying a completed request is refused
    let response = approve().await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Renew by the default extension
    let due_before = record["due_date"].as_str().expect("No due date").to_string();
    let response = post_action(&client, &token, &format!("/borrow-records/{}/renew", id), json!({})).await;
    assert!(response.status().is_success());
    let record: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(record["status"], "renewed");
    assert_eq!(record["renewal_count"], 1);
    assert!(record["due_date"].as_str().expect("No due date") > due_before.as_str());

    // Return
    let response = post_action(
        &client,
        &token,
        &format!("/borrow-records/{}/return", id),
        json!({ "return_notes": "Sách còn tốt" }),
    )
    .await;
    assert!(response.status().is_success());
    let record: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(record["status"], "returned");
    assert!(record["return_date"].is_string());
    assert_eq!(record["physical_copy"]["status"], "available");

    // Returned records are terminal
    let response = post_action(&client, &token, &format!("/borrow-records/{}/renew", id), json!({})).await;
    assert!(response.status().is_client_error());

    // And may be deleted
    let response = client
        .delete(format!("{}/borrow-records/{}", BASE_URL, id))
        .bearer_auth(&token)
        .header("Idempotency-Key", Uuid::new_v4().to_string())
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn test_fine_requires_overdue_or_amount() {
    let client = Client::new();
    let token = token_for(Role::Librarian);
    let reader_id = seeded("TEST_READER_ID");
    let copy_id = seeded("TEST_COPY_ID");

    let response = post_action(
        &client,
        &token,
        "/borrow-records",
        json!({ "reader_id": reader_id, "copy_id": copy_id, "status": "borrowed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let record: Value = response.json().await.expect("Failed to parse response");
    let id = record["id"].as_str().expect("No id").to_string();

    // Not overdue and no amount given
    let response = post_action(&client, &token, &format!("/borrow-records/{}/fine", id), json!({})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Explicit amount closes the loan with a fine
    let response = post_action(
        &client,
        &token,
        &format!("/borrow-records/{}/fine", id),
        json!({ "amount": "20000", "reason": "Làm rách bìa" }),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["fine"]["status"], "unpaid");
    assert_eq!(body["borrow_record"]["status"], "returned");

    // Partial then full payment
    let fine_id = body["fine"]["id"].as_str().expect("No fine id").to_string();
    let response = post_action(
        &client,
        &token,
        &format!("/fines/{}/pay", fine_id),
        json!({ "amount": "5000", "payment_method": "cash" }),
    )
    .await;
    let fine: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(fine["status"], "unpaid");

    let response = post_action(
        &client,
        &token,
        &format!("/fines/{}/pay", fine_id),
        json!({ "amount": "15000", "payment_method": "cash" }),
    )
    .await;
    let fine: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(fine["status"], "paid");
}

#[tokio::test]
#[ignore]
async fn test_stats_endpoints() {
    let client = Client::new();
    let token = token_for(Role::Librarian);

    for path in ["/stats/borrow-records", "/stats/overdue", "/stats/fines", "/stats/reservations"] {
        let response = client
            .get(format!("{}{}", BASE_URL, path))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success(), "{} failed", path);
    }
}

#[tokio::test]
#[ignore]
async fn test_fulfill_reservation() {
    let client = Client::new();
    let token = token_for(Role::Librarian);
    let reader_id = seeded("TEST_READER_ID").to_string();
    let copy_id = seeded("TEST_COPY_ID");

    let reservation_id = reserve_copy(&client, &token, &reader_id, copy_id).await;

    let response = post_action(
        &client,
        &token,
        &format!("/reservations/{}/fulfill", reservation_id),
        json!({}),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["reservation"]["status"], "fulfilled");
    assert_eq!(body["borrow_record"]["status"], "borrowed");
    assert_eq!(body["borrow_record"]["copy_id"], copy_id.to_string());
    assert_eq!(copy_status(&client, &token, copy_id).await, "borrowed");

    // Give the copy back
    let borrow_id = body["borrow_record"]["id"].as_str().expect("No borrow id").to_string();
    let response = post_action(&client, &token, &format!("/borrow-records/{}/return", borrow_id), json!({})).await;
    assert!(response.status().is_success());
    assert_eq!(copy_status(&client, &token, copy_id).await, "available");
}

#[tokio::test]
#[ignore]
async fn test_fulfill_with_another_copy_releases_the_hold() {
    let client = Client::new();
    let token = token_for(Role::Librarian);
    let reader_id = seeded("TEST_READER_ID").to_string();
    let held = seeded("TEST_COPY_ID");
    // another copy of the same book
    let lent = seeded("TEST_SECOND_COPY_ID");

    let reservation_id = reserve_copy(&client, &token, &reader_id, held).await;

    let response = post_action(
        &client,
        &token,
        &format!("/reservations/{}/fulfill", reservation_id),
        json!({ "copy_id": lent }),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["borrow_record"]["copy_id"], lent.to_string());
    assert_eq!(copy_status(&client, &token, lent).await, "borrowed");
    assert_eq!(copy_status(&client, &token, held).await, "available");

    let borrow_id = body["borrow_record"]["id"].as_str().expect("No borrow id").to_string();
    let response = post_action(&client, &token, &format!("/borrow-records/{}/return", borrow_id), json!({})).await;
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_fulfill_without_reader_type_changes_nothing() {
    let client = Client::new();
    let token = token_for(Role::Librarian);
    let copy_id = seeded("TEST_COPY_ID");

    // A reader with no reader type
    let card_number = format!("HS{}", &Uuid::new_v4().simple().to_string()[..10]);
    let response = post_action(
        &client,
        &token,
        "/readers",
        json!({ "full_name": "Nguyễn Văn An", "card_number": card_number }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let reader: Value = response.json().await.expect("Failed to parse response");
    let reader_id = reader["id"].as_str().expect("No reader id").to_string();

    let reservation_id = reserve_copy(&client, &token, &reader_id, copy_id).await;

    let response = post_action(
        &client,
        &token,
        &format!("/reservations/{}/fulfill", reservation_id),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing was written
    let reservation = get_json(&client, &token, &format!("/reservations/{}", reservation_id)).await;
    assert_eq!(reservation["status"], "pending");
    assert_eq!(copy_status(&client, &token, copy_id).await, "reserved");
    let records = get_json(&client, &token, &format!("/borrow-records?q={}", card_number)).await;
    assert_eq!(records["total"], 0);

    // Cancelling releases the hold
    let response = post_action(
        &client,
        &token,
        &format!("/reservations/{}/cancel", reservation_id),
        json!({ "reason": "Chưa có loại bạn đọc" }),
    )
    .await;
    assert!(response.status().is_success());
    let reservation: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(reservation["status"], "cancelled");
    assert_eq!(copy_status(&client, &token, copy_id).await, "available");
}

#[tokio::test]
#[ignore]
async fn test_expire_reservation_releases_copy() {
    let client = Client::new();
    let token = token_for(Role::Librarian);
    let reader_id = seeded("TEST_READER_ID").to_string();
    let copy_id = seeded("TEST_COPY_ID");

    let reservation_id = reserve_copy(&client, &token, &reader_id, copy_id).await;

    let response = post_action(
        &client,
        &token,
        &format!("/reservations/{}/expire", reservation_id),
        json!({}),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["reservation"]["status"], "expired");
    assert_eq!(copy_status(&client, &token, copy_id).await, "available");

    // An expired reservation cannot be fulfilled
    let response = post_action(
        &client,
        &token,
        &format!("/reservations/{}/fulfill", reservation_id),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
