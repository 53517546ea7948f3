mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{expect_data, expect_status, TestServer};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.get("/health", None).send().await?;
    let data = expect_data(res, StatusCode::OK).await?;
    assert_eq!(data, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn register_login_current_logout() -> Result<()> {
    let server = TestServer::start().await?;

    let user = server.register("alice", "alice@example.com", "correct-horse").await?;
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("password").is_none());
    assert!(user.get("token").is_none());

    let token = server.login("alice@example.com", "correct-horse").await?;

    let res = server.get("/api/users/current", Some(&token)).send().await?;
    let current = expect_data(res, StatusCode::OK).await?;
    assert_eq!(current["id"], user["id"]);

    let res = server.post("/api/users/logout", Some(&token)).send().await?;
    assert_eq!(expect_data(res, StatusCode::OK).await?, json!(true));

    // Logout revokes the stored token
    let res = server.get("/api/users/current", Some(&token)).send().await?;
    expect_status(res, StatusCode::UNAUTHORIZED).await?;
    Ok(())
}

#[tokio::test]
async fn bare_token_header_is_accepted() -> Result<()> {
    let server = TestServer::start().await?;
    server.register("bob", "bob@example.com", "pw-bob").await?;
    let token = server.login("bob@example.com", "pw-bob").await?;

    let res = server
        .client
        .get(server.url("/api/users/current"))
        .header("Authorization", token.as_str())
        .send()
        .await?;
    let current = expect_data(res, StatusCode::OK).await?;
    assert_eq!(current["username"], "bob");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> Result<()> {
    let server = TestServer::start().await?;
    server.register("carol", "carol@example.com", "pw").await?;

    let res = server
        .post("/api/users/register", None)
        .json(&json!({ "username": "carol2", "email": "carol@example.com", "password": "pw" }))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::CONFLICT).await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let server = TestServer::start().await?;
    server.register("dave", "dave@example.com", "right").await?;

    for (email, password) in [("dave@example.com", "wrong"), ("nobody@example.com", "right")] {
        let res = server
            .post("/api/users/login", None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        expect_status(res, StatusCode::UNAUTHORIZED).await?;
    }
    Ok(())
}

#[tokio::test]
async fn malformed_and_invalid_bodies_are_bad_requests() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .post("/api/users/register", None)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    let body = expect_status(res, StatusCode::BAD_REQUEST).await?;
    assert_eq!(body["code"], "INVALID_JSON");

    let res = server
        .post("/api/users/register", None)
        .json(&json!({ "email": "", "password": "pw" }))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::BAD_REQUEST).await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["username"].is_string());
    Ok(())
}

#[tokio::test]
async fn public_profile_lookup() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.register("erin", "erin@example.com", "pw").await?;
    let id = user["id"].as_str().unwrap_or_default();

    let res = server.get(&format!("/api/users/user/{}", id), None).send().await?;
    let found = expect_data(res, StatusCode::OK).await?;
    assert_eq!(found["email"], "erin@example.com");

    let res = server.get("/api/users/user/not-a-uuid", None).send().await?;
    expect_status(res, StatusCode::NOT_FOUND).await?;
    Ok(())
}

#[tokio::test]
async fn update_own_profile_is_sparse() -> Result<()> {
    let server = TestServer::start().await?;
    let (_, token) = server.user_token("frank").await?;

    let res = server
        .put("/api/users", Some(&token))
        .json(&json!({ "phone_number": "555-0100" }))
        .send()
        .await?;
    let updated = expect_data(res, StatusCode::OK).await?;
    assert_eq!(updated["phone_number"], "555-0100");
    assert_eq!(updated["username"], "frank");
    assert_eq!(updated["grade_level"], 7);
    Ok(())
}

#[tokio::test]
async fn admin_routes_check_token_before_role() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.get("/api/admin/users", None).send().await?;
    expect_status(res, StatusCode::UNAUTHORIZED).await?;

    let res = server.get("/api/admin/users", Some("garbage")).send().await?;
    expect_status(res, StatusCode::UNAUTHORIZED).await?;

    let (_, user_token) = server.user_token("grace").await?;
    let res = server.get("/api/admin/users", Some(&user_token)).send().await?;
    let body = expect_status(res, StatusCode::FORBIDDEN).await?;
    assert_eq!(body["code"], "FORBIDDEN");

    let admin = server.admin_token().await?;
    let res = server.get("/api/admin/users", Some(&admin)).send().await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["paging"]["total_item"], 2);
    Ok(())
}

#[tokio::test]
async fn admin_searches_updates_and_deletes_users() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;
    let (henry_id, _) = server.user_token("henry").await?;
    server.user_token("ivy").await?;

    let res = server.get("/api/admin/users?username=hen", Some(&admin)).send().await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(body["data"][0]["id"], henry_id.as_str());
    assert_eq!(body["paging"]["total_item"], 1);

    let res = server.get("/api/admin/users?birth_date=yesterday", Some(&admin)).send().await?;
    expect_status(res, StatusCode::BAD_REQUEST).await?;

    let res = server.get("/api/admin/users?size=0", Some(&admin)).send().await?;
    expect_status(res, StatusCode::BAD_REQUEST).await?;

    let res = server
        .put(&format!("/api/admin/users/{}", henry_id), Some(&admin))
        .json(&json!({ "grade_level": 9 }))
        .send()
        .await?;
    assert_eq!(expect_data(res, StatusCode::OK).await?["grade_level"], 9);

    let res = server.delete(&format!("/api/admin/users/{}", henry_id), Some(&admin)).send().await?;
    assert_eq!(expect_data(res, StatusCode::OK).await?, json!(true));

    let res = server.get(&format!("/api/users/user/{}", henry_id), None).send().await?;
    expect_status(res, StatusCode::NOT_FOUND).await?;
    Ok(())
}
