mod common;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::json;

use common::{expect_data, expect_status, TestServer};

#[tokio::test]
async fn course_search_by_subject_returns_exactly_that_course() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;

    let math = server.create_subject(&admin, "Math").await?;
    let biology = server.create_subject(&admin, "Biology").await?;
    let algebra = server.create_course(&admin, &math, "Algebra I").await?;
    server.create_course(&admin, &biology, "Cells").await?;

    let res = server
        .get(&format!("/api/admin/courses?subject_id={}", math), Some(&admin))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(body["paging"]["total_item"], 1);
    assert_eq!(body["data"][0]["id"], algebra.as_str());
    assert_eq!(body["data"][0]["subject"]["subject_name"], "Math");
    // Listings leave out the content body
    assert!(body["data"][0].get("content").is_none());

    // A malformed identifier filter is ignored
    let res = server.get("/api/admin/courses?subject_id=nope", Some(&admin)).send().await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(body["paging"]["total_item"], 2);

    let res = server.get("/api/admin/courses?course_name=Alg", Some(&admin)).send().await?;
    let body = expect_status(res, StatusCode::OK).await?;
    assert_eq!(body["paging"]["total_item"], 1);
    Ok(())
}

#[tokio::test]
async fn course_with_unknown_subject_is_not_created() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;

    let res = server
        .post("/api/admin/courses", Some(&admin))
        .json(&json!({
            "course_name": "Orphan",
            "subject_id": "1f0e8c2a-1111-4222-8333-944455556666",
            "content": []
        }))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::NOT_FOUND).await?;
    assert_eq!(body["message"], "Subject not found");
    assert_eq!(server.store.counts().await.courses, 0);

    let res = server
        .post("/api/admin/courses", Some(&admin))
        .json(&json!({ "course_name": "Orphan", "subject_id": "not-a-uuid" }))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::BAD_REQUEST).await?;
    assert!(body["field_errors"]["subject_id"].is_string());
    Ok(())
}

#[tokio::test]
async fn course_get_and_sparse_update() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;
    let math = server.create_subject(&admin, "Math").await?;
    let physics = server.create_subject(&admin, "Physics").await?;
    let course = server.create_course(&admin, &math, "Motion").await?;

    let res = server.get(&format!("/api/admin/courses/{}", course), Some(&admin)).send().await?;
    let found = expect_data(res, StatusCode::OK).await?;
    assert_eq!(found["content"], json!([{ "type": "text", "data": "Welcome to Motion" }]));
    assert_eq!(found["subject"]["id"], math.as_str());

    let res = server
        .put(&format!("/api/admin/courses/{}", course), Some(&admin))
        .json(&json!({ "subject_id": physics }))
        .send()
        .await?;
    let updated = expect_data(res, StatusCode::OK).await?;
    assert_eq!(updated["course_name"], "Motion");
    assert_eq!(updated["content"], found["content"]);
    assert_eq!(updated["subject"]["subject_name"], "Physics");

    let res = server
        .put(&format!("/api/admin/courses/{}", course), Some(&admin))
        .json(&json!({ "subject_id": "1f0e8c2a-1111-4222-8333-944455556666" }))
        .send()
        .await?;
    expect_status(res, StatusCode::NOT_FOUND).await?;

    let res = server.delete(&format!("/api/admin/courses/{}", course), Some(&admin)).send().await?;
    assert_eq!(expect_data(res, StatusCode::OK).await?["id"], course.as_str());
    assert_eq!(server.store.counts().await.courses, 0);
    Ok(())
}

#[tokio::test]
async fn upload_stores_file_and_serves_it() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;

    let part = Part::bytes(b"lesson notes".to_vec())
        .file_name("drafts/notes.txt")
        .mime_str("text/plain")?;
    let res = server
        .post("/api/admin/courses/upload", Some(&admin))
        .multipart(Form::new().part("file", part))
        .send()
        .await?;
    let data = expect_data(res, StatusCode::OK).await?;
    assert!(data.is_string(), "upload should return a bare URL, got {}", data);
    let url = data.as_str().unwrap_or_default().to_string();
    assert!(url.starts_with("/images/courses/20240101_"), "unexpected url {}", url);
    assert!(url.ends_with("_notes.txt"), "unexpected url {}", url);

    let res = server.client.get(server.url(&url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "lesson notes");
    Ok(())
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin_token().await?;

    let res = server
        .post("/api/admin/courses/upload", Some(&admin))
        .multipart(Form::new().text("other", "value"))
        .send()
        .await?;
    let body = expect_status(res, StatusCode::BAD_REQUEST).await?;
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}
