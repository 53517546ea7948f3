mod common;

use std::collections::HashSet;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{expect_data, expect_status, TestServer};

fn course_ids(items: &Value) -> HashSet<String> {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["course"]["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn user_sees_only_granted_courses_paged() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;
    let math = server.create_subject(&admin, "Math").await?;
    let algebra = server.create_course(&admin, &math, "Algebra").await?;
    let geometry = server.create_course(&admin, &math, "Geometry").await?;
    let calculus = server.create_course(&admin, &math, "Calculus").await?;

    let (user_id, token) = server.user_token("amy").await?;
    let (other_id, _) = server.user_token("ben").await?;
    server.grant(&admin, &user_id, &[algebra.as_str(), geometry.as_str()]).await?;
    server.grant(&admin, &other_id, &[calculus.as_str()]).await?;

    let res = server.get("/api/courses?size=1", Some(&token)).send().await?;
    let first = expect_status(res, StatusCode::OK).await?;
    assert_eq!(first["paging"], json!({ "page": 1, "size": 1, "total_item": 2, "total_page": 2 }));

    let res = server.get("/api/courses?size=1&page=2", Some(&token)).send().await?;
    let second = expect_status(res, StatusCode::OK).await?;

    let mut seen = course_ids(&first["data"]);
    seen.extend(course_ids(&second["data"]));
    let expected: HashSet<String> = [algebra.clone(), geometry.clone()].into_iter().collect();
    assert_eq!(seen, expected);

    // A user_id in the query never widens the listing to someone else's grants
    let res = server
        .get(&format!("/api/courses?user_id={}", other_id), Some(&token))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(course_ids(&body["data"]), expected);

    let res = server.get("/api/courses", None).send().await?;
    expect_status(res, StatusCode::UNAUTHORIZED).await?;
    Ok(())
}

#[tokio::test]
async fn batch_grant_is_all_or_nothing() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;
    let math = server.create_subject(&admin, "Math").await?;
    let first = server.create_course(&admin, &math, "One").await?;
    let second = server.create_course(&admin, &math, "Two").await?;
    let (user_id, _) = server.user_token("carl").await?;

    let res = server
        .post("/api/admin/user-courses", Some(&admin))
        .json(&json!({
            "user_id": user_id,
            "course_ids": [first, second, "1f0e8c2a-1111-4222-8333-944455556666"]
        }))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::NOT_FOUND).await?;
    assert_eq!(body["message"], "Course not found");
    assert_eq!(server.store.counts().await.user_courses, 0);

    let res = server
        .post("/api/admin/user-courses", Some(&admin))
        .json(&json!({ "user_id": "1f0e8c2a-1111-4222-8333-944455556666", "course_ids": [first] }))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::NOT_FOUND).await?;
    assert_eq!(body["message"], "User not found");

    let empty = server.grant(&admin, &user_id, &[]).await?;
    assert_eq!(empty, json!([]));
    assert_eq!(server.store.counts().await.user_courses, 0);

    let granted = server.grant(&admin, &user_id, &[first.as_str(), second.as_str()]).await?;
    assert_eq!(granted.as_array().map(Vec::len), Some(2));
    assert_eq!(granted[0]["user"]["id"], user_id.as_str());
    assert_eq!(server.store.counts().await.user_courses, 2);

    let res = server
        .post("/api/admin/user-courses", Some(&admin))
        .json(&json!({ "user_id": user_id, "course_ids": [first] }))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::CONFLICT).await?;
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(server.store.counts().await.user_courses, 2);
    Ok(())
}

#[tokio::test]
async fn opening_a_course_stamps_access_time() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;
    let math = server.create_subject(&admin, "Math").await?;
    let granted = server.create_course(&admin, &math, "Granted").await?;
    let withheld = server.create_course(&admin, &math, "Withheld").await?;
    let (user_id, token) = server.user_token("dora").await?;
    server.grant(&admin, &user_id, &[granted.as_str()]).await?;

    let res = server.get(&format!("/api/courses/{}", granted), Some(&token)).send().await?;
    let first = expect_data(res, StatusCode::OK).await?;
    assert_eq!(first["course"]["course_name"], "Granted");
    assert_eq!(first["course"]["subject"]["subject_name"], "Math");
    let first_access = first["accessed_at"].as_str().unwrap_or_default().to_string();
    assert!(!first_access.is_empty());

    let res = server.get(&format!("/api/courses/{}", granted), Some(&token)).send().await?;
    let second = expect_data(res, StatusCode::OK).await?;
    let second_access = second["accessed_at"].as_str().unwrap_or_default().to_string();
    let parse = |s: &str| chrono::DateTime::parse_from_rfc3339(s);
    assert!(parse(&second_access)? > parse(&first_access)?);

    let res = server.get(&format!("/api/courses/{}", withheld), Some(&token)).send().await?;
    expect_status(res, StatusCode::NOT_FOUND).await?;
    Ok(())
}

#[tokio::test]
async fn admin_lists_grants_by_subject_and_deletes() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;
    let math = server.create_subject(&admin, "Math").await?;
    let art = server.create_subject(&admin, "Art").await?;
    let algebra = server.create_course(&admin, &math, "Algebra").await?;
    let drawing = server.create_course(&admin, &art, "Drawing").await?;
    let (user_id, _) = server.user_token("eve").await?;
    server.grant(&admin, &user_id, &[algebra.as_str(), drawing.as_str()]).await?;

    let res = server
        .get(&format!("/api/admin/user-courses?subject_id={}", art), Some(&admin))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(body["paging"]["total_item"], 1);
    assert_eq!(body["data"][0]["course"]["id"], drawing.as_str());
    let grant_id = body["data"][0]["id"].as_str().unwrap_or_default().to_string();

    let res = server
        .get(&format!("/api/admin/user-courses?user_id={}", user_id), Some(&admin))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(body["paging"]["total_item"], 2);

    let res = server
        .delete(&format!("/api/admin/user-courses/{}", grant_id), Some(&admin))
        .send()
        .await?;
    assert_eq!(expect_data(res, StatusCode::OK).await?["id"], grant_id.as_str());
    assert_eq!(server.store.counts().await.user_courses, 1);

    let res = server
        .delete(&format!("/api/admin/user-courses/{}", grant_id), Some(&admin))
        .send()
        .await?;
    expect_status(res, StatusCode::NOT_FOUND).await?;
    Ok(())
}
