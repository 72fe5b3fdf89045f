//! API integration tests
//!
//! Run against a live server started with a bootstrap staff account:
//! `SHELFMARK__BOOTSTRAP_ADMIN__USERNAME=admin SHELFMARK__BOOTSTRAP_ADMIN__PASSWORD=admin`

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8000/api";

/// Short suffix keeping usernames and ISBNs unique across runs
fn unique() -> String {
    format!("{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() % 10_000_000_000)
}

async fn get_token(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send token request");

    let body: Value = response.json().await.expect("Failed to parse token response");
    body["access"].as_str().expect("No access token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    get_token(client, "admin", "admin").await
}

/// Register a patron and return (user id, access token)
async fn new_patron(client: &Client) -> (i64, String) {
    let username = format!("patron{}", unique());
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "username": username, "password": "pass123" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let id = body["id"].as_i64().expect("No id in response");
    (id, get_token(client, &username, "pass123").await)
}

/// Create an author and a book, returning the book id
async fn new_book(client: &Client, token: &str, copies: i64, lost_fine: &str) -> i64 {
    let author: Value = client
        .post(format!("{}/authors", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "name": "Test Author" }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "Test Book",
            "isbn": format!("T{}", unique()),
            "author_id": author["id"],
            "copies_available": copies,
            "lost_fine": lost_fine
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No id in response")
}

async fn book_copies(client: &Client, book_id: i64) -> i64 {
    let body: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["copies_available"].as_i64().expect("No copies_available")
}

async fn borrow(client: &Client, token: &str, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/borrow", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn post_borrow_action(client: &Client, token: &str, action: &str, borrow_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/{}", BASE_URL, action))
        .bearer_auth(token)
        .json(&json!({ "borrow_id": borrow_id }))
        .send()
        .await
        .expect("Failed to send request")
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
async fn test_token_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_refresh_rejects_access_token() {
    let client = Client::new();
    let access = admin_token(&client).await;

    let response = client
        .post(format!("{}/token/refresh", BASE_URL))
        .json(&json!({ "refresh": access }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_rejected() {
    let client = Client::new();
    let username = format!("dup{}", unique());

    for expected in [201, 400] {
        let response = client
            .post(format!("{}/auth/register", BASE_URL))
            .json(&json!({ "username": username, "password": "pass123" }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
#[ignore]
async fn test_borrow_requires_authentication() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .json(&json!({ "book_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_patron_cannot_create_books() {
    let client = Client::new();
    let (_, token) = new_patron(&client).await;

    let response = client
        .post(format!("{}/authors", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "name": "Nobody" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 1, "20.00").await;

    let response = borrow(&client, &patron, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "borrowed");
    let borrow_id = body["id"].as_i64().expect("No borrow id");
    assert_eq!(book_copies(&client, book_id).await, 0);

    // Same user, same book, still active
    let response = borrow(&client, &patron, book_id).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["detail"], "User already has an active borrow for this book");

    let response = post_borrow_action(&client, &patron, "return", borrow_id).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "returned");
    assert_eq!(body["fine_due"], "0.00");
    assert_eq!(body["fine_paid"], true);
    assert_eq!(book_copies(&client, book_id).await, 1);

    let response = post_borrow_action(&client, &patron, "return", borrow_id).await;
    assert_eq!(response.status(), 400);

    // A returned record does not block borrowing again
    let response = borrow(&client, &patron, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let second_id = body["id"].as_i64().expect("No borrow id");
    assert_eq!(book_copies(&client, book_id).await, 0);

    // Returning again replaces the older returned record
    let response = post_borrow_action(&client, &patron, "return", second_id).await;
    assert_eq!(response.status(), 200);
    assert_eq!(book_copies(&client, book_id).await, 1);

    let borrows: Value = client
        .get(format!("{}/my-borrows", BASE_URL))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let for_book: Vec<&Value> = borrows
        .as_array()
        .expect("Expected a list")
        .iter()
        .filter(|b| b["book"]["id"].as_i64() == Some(book_id))
        .collect();
    assert_eq!(for_book.len(), 1);
    assert_eq!(for_book[0]["id"].as_i64(), Some(second_id));
    assert_eq!(for_book[0]["status"], "returned");
}

#[tokio::test]
#[ignore]
async fn test_borrow_without_copies() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 0, "0.00").await;

    let response = borrow(&client, &patron, book_id).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["detail"], "No copies available");
}

#[tokio::test]
#[ignore]
async fn test_blocked_user_cannot_borrow() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (patron_id, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 1, "0.00").await;

    let response = client
        .post(format!("{}/admin/users/{}/status", BASE_URL, patron_id))
        .bearer_auth(&admin)
        .json(&json!({ "is_blocked": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["is_blocked"], true);

    let response = borrow(&client, &patron, book_id).await;
    assert_eq!(response.status(), 403);
    assert_eq!(book_copies(&client, book_id).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_staff_borrows_on_behalf_of_unknown_user() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = new_book(&client, &admin, 1, "0.00").await;

    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "book_id": book_id, "username": "no-such-user" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["detail"], "username 'no-such-user' not found");
}

#[tokio::test]
#[ignore]
async fn test_lost_book_settled_by_saw_claim() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 1, "20.00").await;

    let body: Value = borrow(&client, &patron, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");

    let response = post_borrow_action(&client, &patron, "report-lost", borrow_id).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "lost");
    assert_eq!(body["fine_due"], "20.00");

    let response = client
        .post(format!("{}/claims", BASE_URL))
        .bearer_auth(&patron)
        .json(&json!({ "borrow_id": borrow_id, "type": "saw", "offered_amount": "20.00" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let claim: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(claim["status"], "pending");
    let claim_id = claim["id"].as_i64().expect("No claim id");

    let response = client
        .post(format!("{}/claims/{}/approve", BASE_URL, claim_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let claim: Value = client
        .get(format!("{}/claims/{}", BASE_URL, claim_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(claim["status"], "approved");
    assert_eq!(claim["borrow"]["status"], "returned");
    assert_eq!(claim["borrow"]["fine_paid"], true);
    assert_eq!(book_copies(&client, book_id).await, 1);

    // Reviewed claims are final
    let response = client
        .post(format!("{}/claims/review", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "claim_id": claim_id, "approve": false }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_declined_claim_leaves_borrow_untouched() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 1, "20.00").await;

    let body: Value = borrow(&client, &patron, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");
    post_borrow_action(&client, &patron, "report-lost", borrow_id).await;

    let response = client
        .post(format!("{}/claims", BASE_URL))
        .bearer_auth(&patron)
        .json(&json!({ "borrow_id": borrow_id, "type": "saw", "offered_amount": "5.00" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let claim: Value = response.json().await.expect("Failed to parse response");
    let claim_id = claim["id"].as_i64().expect("No claim id");

    let response = client
        .post(format!("{}/claims/{}/decline", BASE_URL, claim_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["detail"], "claim declined");

    let claim: Value = client
        .get(format!("{}/claims/{}", BASE_URL, claim_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(claim["status"], "declined");
    assert!(claim["reviewed_by"].as_i64().is_some());
    assert!(!claim["reviewed_at"].is_null());
    assert_eq!(claim["offered_amount"], "5.00");
    assert_eq!(claim["borrow"]["status"], "lost");
    assert_eq!(claim["borrow"]["fine_due"], "20.00");
    assert_eq!(claim["borrow"]["fine_paid"], false);
    assert_eq!(book_copies(&client, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_return_racing_review_of_stale_claim() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 1, "8.00").await;

    let body: Value = borrow(&client, &patron, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let first_id = body["id"].as_i64().expect("No borrow id");
    post_borrow_action(&client, &patron, "report-lost", first_id).await;

    let claim: Value = client
        .post(format!("{}/claims", BASE_URL))
        .bearer_auth(&patron)
        .json(&json!({ "borrow_id": first_id, "type": "returned", "message": "found it" }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let claim_id = claim["id"].as_i64().expect("No claim id");

    // Fine settled while the claim is still pending
    let response = post_borrow_action(&client, &admin, "approve-fine", first_id).await;
    assert_eq!(response.status(), 200);

    let body: Value = borrow(&client, &patron, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let second_id = body["id"].as_i64().expect("No borrow id");

    let review = client
        .post(format!("{}/claims/{}/approve", BASE_URL, claim_id))
        .bearer_auth(&admin)
        .send();
    let (review, returned) = tokio::join!(review, post_borrow_action(&client, &patron, "return", second_id));
    let review = review.expect("Failed to send request");

    assert_eq!(returned.status(), 200);
    assert!(
        review.status() == 200 || review.status() == 404,
        "unexpected review status {}",
        review.status()
    );
    assert_eq!(book_copies(&client, book_id).await, 1);

    // The stale record and its claim are gone
    let response = client
        .get(format!("{}/claims/{}", BASE_URL, claim_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_claim_offer_above_fine_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 1, "10.00").await;

    let body: Value = borrow(&client, &patron, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");
    post_borrow_action(&client, &patron, "report-lost", borrow_id).await;

    let response = client
        .post(format!("{}/claims", BASE_URL))
        .bearer_auth(&patron)
        .json(&json!({ "borrow_id": borrow_id, "type": "saw", "offered_amount": "10.01" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_approve_fine_requires_staff() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, patron) = new_patron(&client).await;
    let book_id = new_book(&client, &admin, 1, "5.00").await;

    let body: Value = borrow(&client, &patron, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().expect("No borrow id");
    post_borrow_action(&client, &patron, "report-lost", borrow_id).await;

    let response = post_borrow_action(&client, &patron, "approve-fine", borrow_id).await;
    assert_eq!(response.status(), 403);

    let response = post_borrow_action(&client, &admin, "approve-fine", borrow_id).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "returned");
    assert_eq!(book_copies(&client, book_id).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = new_book(&client, &admin, 1, "0.00").await;

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Copy",
            "isbn": book["isbn"],
            "author_id": book["author"]["id"]
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["detail"], "A book with this ISBN already exists.");
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?available=true&ordering=-publication_year", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_anonymous_support_message() {
    let client = Client::new();

    let response = client
        .post(format!("{}/support", BASE_URL))
        .json(&json!({ "name": "Visitor", "message": "Opening hours?" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["processed"], false);

    let response = client
        .post(format!("{}/support", BASE_URL))
        .json(&json!({ "message": "" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}
