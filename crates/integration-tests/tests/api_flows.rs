//! End-to-end flows over HTTP.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`stowline migrate`)
//! - The API server running against it (`cargo run -p stowline-api`)
//!
//! Accounts are created directly in the database and signed in by planting
//! a known login code, so no SMS or email credentials are needed.
//!
//! Run with: cargo test -p stowline-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use chrono::{TimeDelta, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;

use stowline_api::db::VerificationCodeRepository;
use stowline_api::services::auth::{code_key, hash_code};
use stowline_core::{AccountKind, Contact};
use stowline_integration_tests::{api_base_url, database_url};

const CODE: &str = "424242";

async fn pool() -> PgPool {
    PgPool::connect(&database_url())
        .await
        .expect("Failed to connect to test database")
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A suffix that keeps emails and unit numbers unique across runs.
fn unique() -> String {
    Utc::now().timestamp_nanos_opt().unwrap_or_default().to_string()
}

/// A ten-digit phone number unlikely to be taken by an earlier run.
fn unique_phone() -> String {
    let nanos = unique();
    let tail = nanos.get(nanos.len().saturating_sub(9)..).unwrap_or_default();
    format!("5{tail:0>9}")
}

async fn plant_code(pool: &PgPool, contact: &str, kind: AccountKind) {
    let key = code_key(kind, &Contact::parse(contact).unwrap());
    VerificationCodeRepository::new(pool)
        .create(&key, &hash_code(&key, CODE), Utc::now() + TimeDelta::minutes(10))
        .await
        .unwrap();
}

/// Sign `client` in and return the account JSON.
async fn sign_in(client: &Client, pool: &PgPool, contact: &str, kind: AccountKind) -> Value {
    plant_code(pool, contact, kind).await;
    let resp = client
        .post(format!("{}/api/auth/verify-code", api_base_url()))
        .json(&json!({ "contact": contact, "accountType": kind, "code": CODE }))
        .send()
        .await
        .expect("Failed to verify code");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

async fn create_admin(pool: &PgPool, role: &str) -> String {
    let email = format!("admin-{}@stowline.test", unique());
    sqlx::query("INSERT INTO admins (email, name, role) VALUES ($1, 'Test Admin', $2::admin_role)")
        .bind(&email)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
    email
}

async fn create_customer(pool: &PgPool) -> (i32, String) {
    let email = format!("customer-{}@stowline.test", unique());
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO users (first_name, last_name, email) VALUES ('Casey', 'Test', $1) RETURNING id",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap();
    (id, email)
}

async fn create_appointment(pool: &PgPool, user_id: i32) -> i32 {
    sqlx::query_scalar(
        r"
        INSERT INTO appointments (user_id, appointment_type, date, address, zipcode)
        VALUES ($1, 'Initial Pickup', NOW() + INTERVAL '3 days', '1 Main St', '94105')
        RETURNING id
        ",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn audit_rows(pool: &PgPool, target_type: &str, target_id: i32, action: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM admin_logs WHERE target_type = $1 AND target_id = $2 AND action = $3",
    )
    .bind(target_type)
    .bind(target_id)
    .bind(action)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn signed_in_admin(pool: &PgPool) -> Client {
    let client = client();
    let email = create_admin(pool, &AccountKind::Admin.to_string()).await;
    sign_in(&client, pool, &email, AccountKind::Admin).await;
    client
}

// ============================================================================
// Sign-in
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_sign_in_session_and_logout() {
    let pool = pool().await;
    let client = client();
    let (id, email) = create_customer(&pool).await;

    let account = sign_in(&client, &pool, &email, AccountKind::Customer).await;
    assert_eq!(account["id"], id);
    assert_eq!(account["kind"], "customer");

    let resp = client
        .get(format!("{}/api/auth/session", api_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/api/auth/logout", api_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{}/api/auth/session", api_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_code_is_single_use() {
    let pool = pool().await;
    let (_, email) = create_customer(&pool).await;
    sign_in(&client(), &pool, &email, AccountKind::Customer).await;

    let resp = client()
        .post(format!("{}/api/auth/verify-code", api_base_url()))
        .json(&json!({ "contact": email, "accountType": "customer", "code": CODE }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_code_burns_after_too_many_wrong_guesses() {
    let pool = pool().await;
    let (_, email) = create_customer(&pool).await;
    plant_code(&pool, &email, AccountKind::Customer).await;

    let verify = |code: &'static str| {
        let email = email.clone();
        async move {
            client()
                .post(format!("{}/api/auth/verify-code", api_base_url()))
                .json(&json!({ "contact": email, "accountType": "customer", "code": code }))
                .send()
                .await
                .unwrap()
        }
    };

    for _ in 0..5 {
        assert_eq!(verify("000000").await.status(), StatusCode::UNAUTHORIZED);
    }
    // The right code no longer works either.
    assert_eq!(verify(CODE).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_send_code_for_unknown_account_is_not_found() {
    let resp = client()
        .post(format!("{}/api/auth/send-code", api_base_url()))
        .json(&json!({ "contact": format!("nobody-{}@stowline.test", unique()), "accountType": "customer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_code_only_signs_in_the_account_type_it_was_sent_for() {
    let pool = pool().await;
    let suffix = unique();
    let phone = unique_phone();

    sqlx::query(
        "INSERT INTO users (first_name, last_name, email, phone_number) VALUES ('Casey', 'Test', $1, $2)",
    )
    .bind(format!("customer-{suffix}@stowline.test"))
    .bind(&phone)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO drivers (first_name, last_name, email, phone_number) VALUES ('Dana', 'Test', $1, $2)",
    )
    .bind(format!("driver-{suffix}@stowline.test"))
    .bind(&phone)
    .execute(&pool)
    .await
    .unwrap();

    plant_code(&pool, &phone, AccountKind::Driver).await;

    let verify = |account_type: &'static str| {
        let phone = phone.clone();
        async move {
            client()
                .post(format!("{}/api/auth/verify-code", api_base_url()))
                .json(&json!({ "contact": phone, "accountType": account_type, "code": CODE }))
                .send()
                .await
                .unwrap()
        }
    };

    assert_eq!(verify("customer").await.status(), StatusCode::UNAUTHORIZED);
    let resp = verify("driver").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let account: Value = resp.json().await.unwrap();
    assert_eq!(account["kind"], "driver");
}

// ============================================================================
// Phone numbers
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_phone_number_change_rules() {
    let pool = pool().await;
    let client = client();
    let (id, email) = create_customer(&pool).await;
    sign_in(&client, &pool, &email, AccountKind::Customer).await;

    let taken = unique_phone();
    sqlx::query(
        "INSERT INTO users (first_name, last_name, email, phone_number) VALUES ('Other', 'Test', $1, $2)",
    )
    .bind(format!("other-{}@stowline.test", unique()))
    .bind(&taken)
    .execute(&pool)
    .await
    .unwrap();

    let url = format!("{}/api/users/{id}/phone-number", api_base_url());
    let change = |phone: String| client.patch(&url).json(&json!({ "phoneNumber": phone })).send();

    let resp = change("555-0100".to_string()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = change(taken).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Phone number is already in use");

    sqlx::query("UPDATE users SET verified_phone_number = TRUE WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let fresh = unique_phone();
    let resp = change(fresh.clone()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["phoneNumber"], fresh);
    assert_eq!(user["verifiedPhoneNumber"], false);
}

// ============================================================================
// Appointments
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_book_and_cancel_appointment() {
    let pool = pool().await;
    let client = client();
    let (_, email) = create_customer(&pool).await;
    sign_in(&client, &pool, &email, AccountKind::Customer).await;

    let resp = client
        .post(format!("{}/api/appointments", api_base_url()))
        .json(&json!({
            "appointmentType": "Initial Pickup",
            "date": (Utc::now() + TimeDelta::days(7)).to_rfc3339(),
            "address": "500 Howard St",
            "zipcode": "94105",
            "numberOfUnits": 2,
            "quotedPrice": "189.00",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let appointment: Value = resp.json().await.unwrap();
    assert_eq!(appointment["status"], "Scheduled");
    let id = appointment["id"].as_i64().unwrap();

    let cancel = || {
        client
            .patch(format!("{}/api/appointments/{id}/cancel", api_base_url()))
            .send()
    };
    let resp = cancel().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let canceled: Value = resp.json().await.unwrap();
    assert_eq!(canceled["status"], "Canceled");

    // Canceled is terminal.
    assert_eq!(cancel().await.unwrap().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_booking_reports_field_errors() {
    let pool = pool().await;
    let client = client();
    let (_, email) = create_customer(&pool).await;
    sign_in(&client, &pool, &email, AccountKind::Customer).await;

    let resp = client
        .post(format!("{}/api/appointments", api_base_url()))
        .json(&json!({
            "appointmentType": "Initial Pickup",
            "date": (Utc::now() - TimeDelta::days(1)).to_rfc3339(),
            "address": " ",
            "zipcode": "9410",
            "numberOfUnits": 0,
            "quotedPrice": "10",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    for field in ["date", "address", "zipcode", "numberOfUnits"] {
        assert!(body["details"][field].is_string(), "{field}");
    }
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_customers_cannot_see_each_others_appointments() {
    let pool = pool().await;
    let (owner_id, _) = create_customer(&pool).await;
    let appointment_id = create_appointment(&pool, owner_id).await;

    let client = client();
    let (_, email) = create_customer(&pool).await;
    sign_in(&client, &pool, &email, AccountKind::Customer).await;

    let resp = client
        .get(format!("{}/api/appointments/{appointment_id}", api_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_partner_contact_on_unknown_appointment_writes_nothing() {
    let pool = pool().await;
    let client = signed_in_admin(&pool).await;
    let missing = 999_999_999;

    let resp = client
        .patch(format!(
            "{}/api/admin/appointments/{missing}/partner-contact",
            api_base_url()
        ))
        .json(&json!({ "contacted": true, "reached": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Appointment not found");
    assert_eq!(
        audit_rows(&pool, "appointment", missing, "UPDATE_PARTNER_CONTACT").await,
        0
    );
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_partner_contact_is_recorded_and_audited() {
    let pool = pool().await;
    let client = signed_in_admin(&pool).await;
    let (user_id, _) = create_customer(&pool).await;
    let appointment_id = create_appointment(&pool, user_id).await;
    let url = format!(
        "{}/api/admin/appointments/{appointment_id}/partner-contact",
        api_base_url()
    );

    let resp = client
        .patch(&url)
        .json(&json!({ "contacted": "yes" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .patch(&url)
        .json(&json!({ "contacted": true, "reached": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let appointment: Value = resp.json().await.unwrap();
    assert_eq!(appointment["partnerContacted"], true);
    assert_eq!(appointment["partnerReached"], false);
    assert!(appointment["partnerContactedAt"].is_string());

    let details: Vec<Value> = sqlx::query_scalar(
        r"
        SELECT details FROM admin_logs
        WHERE target_type = 'appointment' AND target_id = $1 AND action = 'UPDATE_PARTNER_CONTACT'
        ",
    )
    .bind(appointment_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(details, vec![json!({ "contacted": true, "reached": false })]);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_every_status_change_notifies_the_customer() {
    let pool = pool().await;
    let client = signed_in_admin(&pool).await;
    let (user_id, _) = create_customer(&pool).await;
    let appointment_id = create_appointment(&pool, user_id).await;

    let resp = client
        .patch(format!(
            "{}/api/admin/appointments/{appointment_id}/status",
            api_base_url()
        ))
        .json(&json!({ "status": "Pending" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let kinds: Vec<String> = sqlx::query_scalar(
        r"
        SELECT kind FROM notifications
        WHERE recipient_type = 'customer' AND recipient_id = $1 AND appointment_id = $2
        ",
    )
    .bind(user_id)
    .bind(appointment_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(kinds, vec!["APPOINTMENT_UPDATED".to_string()]);
}

// ============================================================================
// Storage units
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_cleaning_requires_photos_and_empties_the_unit() {
    let pool = pool().await;
    let client = signed_in_admin(&pool).await;

    let resp = client
        .post(format!("{}/api/admin/storage-units", api_base_url()))
        .json(&json!({ "unitNumber": format!("T-{}", unique()) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let unit: Value = resp.json().await.unwrap();
    let id = i32::try_from(unit["id"].as_i64().unwrap()).unwrap();

    sqlx::query("UPDATE storage_units SET status = 'Pending Cleaning' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let status = || {
        sqlx::query_scalar::<_, String>("SELECT status::TEXT FROM storage_units WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
    };
    let cleanings = || {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM storage_unit_cleanings WHERE storage_unit_id = $1",
        )
        .bind(id)
        .fetch_one(&pool)
    };

    let url = format!("{}/api/admin/storage-units/{id}/cleaning", api_base_url());
    let resp = client
        .post(&url)
        .json(&json!({ "photos": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // A rejected cleaning leaves no trace.
    assert_eq!(status().await.unwrap(), "Pending Cleaning");
    assert_eq!(cleanings().await.unwrap(), 0);
    assert_eq!(audit_rows(&pool, "storage_unit", id, "CLEAN_STORAGE_UNIT").await, 0);

    let resp = client
        .post(&url)
        .json(&json!({
            "photos": ["https://res.cloudinary.com/stowline/image/upload/unit.jpg"],
            "notes": "Swept and wiped down",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["storageUnit"]["status"], "Empty");
    assert!(body["storageUnit"]["lastCleanedAt"].is_string());
    assert_eq!(body["cleaning"]["photos"].as_array().unwrap().len(), 1);

    assert_eq!(status().await.unwrap(), "Empty");
    assert_eq!(cleanings().await.unwrap(), 1);
    assert_eq!(audit_rows(&pool, "storage_unit", id, "CLEAN_STORAGE_UNIT").await, 1);
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_cleaning_unknown_unit_is_not_found() {
    let pool = pool().await;
    let client = signed_in_admin(&pool).await;

    let resp = client
        .post(format!(
            "{}/api/admin/storage-units/999999999/cleaning",
            api_base_url()
        ))
        .json(&json!({ "photos": ["https://example.com/a.jpg"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Storage unit not found");
}

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_viewer_admins_are_read_only() {
    let pool = pool().await;
    let client = client();
    let email = create_admin(&pool, "viewer").await;
    sign_in(&client, &pool, &email, AccountKind::Admin).await;

    let resp = client
        .get(format!("{}/api/admin/storage-units", api_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/api/admin/storage-units", api_base_url()))
        .json(&json!({ "unitNumber": format!("V-{}", unique()) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Onboarding
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and PostgreSQL"]
async fn test_partner_activates_once_every_requirement_is_met() {
    let pool = pool().await;
    let client = signed_in_admin(&pool).await;
    let suffix = unique();

    let partner_id: i32 = sqlx::query_scalar(
        "INSERT INTO moving_partners (name, email) VALUES ('Test Movers', $1) RETURNING id",
    )
    .bind(format!("partner-{suffix}@stowline.test"))
    .fetch_one(&pool)
    .await
    .unwrap();
    let driver_id: i32 = sqlx::query_scalar(
        "INSERT INTO drivers (first_name, last_name, email) VALUES ('Dana', 'Test', $1) RETURNING id",
    )
    .bind(format!("driver-{suffix}@stowline.test"))
    .fetch_one(&pool)
    .await
    .unwrap();

    let base = format!("{}/api/admin/moving-partners/{partner_id}", api_base_url());

    let resp = client
        .patch(format!("{base}/approval"))
        .json(&json!({ "approved": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["activated"], false);

    let resp = client
        .patch(format!("{base}/dispatch-team"))
        .json(&json!({ "onfleetTeamId": "team-123" }))
        .send()
        .await
        .unwrap();
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["activated"], false);

    let resp = client
        .post(format!("{base}/drivers"))
        .json(&json!({ "driverId": driver_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["activated"], false);
    assert_eq!(outcome["check"]["approvedDrivers"], 0);

    // Approving the last linked driver completes activation.
    let resp = client
        .patch(format!(
            "{}/api/admin/drivers/{driver_id}/approval",
            api_base_url()
        ))
        .json(&json!({ "approved": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let approval: Value = resp.json().await.unwrap();
    assert_eq!(approval["activations"][0]["activated"], true);
    assert_eq!(approval["activations"][0]["movingPartner"]["status"], "ACTIVE");

    let resp = client.get(&base).send().await.unwrap();
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["movingPartner"]["status"], "ACTIVE");
    assert!(detail["unmet"].as_array().unwrap().is_empty());
}
