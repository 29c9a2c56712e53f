use httpmock::prelude::*;
use pincer::core::http::RequestOptions;
use pincer::{HttpClient, PincerError};
use reqwest::Method;
use serde_json::json;
use std::time::Duration;

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::builder("test-token")
        .base_url(server.base_url())
        .max_retries(3)
        .retry_unit(Duration::from_millis(1))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_get_sends_auth_and_user_agent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v10/users/@me")
                .header("authorization", "Bot test-token")
                .header_exists("user-agent");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"id": "80351110224678912", "username": "Nelly"}));
        })
        .await;

    let client = client_for(&server);
    let body = client.get("users/@me", None).await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(body["username"], "Nelly");
}

#[tokio::test]
async fn test_no_content_returns_none() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/v10/channels/1/messages/2");
            then.status(204);
        })
        .await;

    let client = client_for(&server);
    let body = tokio_test::assert_ok!(client.delete("channels/1/messages/2").await);

    mock.assert_async().await;
    assert!(body.is_none());
}

#[tokio::test]
async fn test_query_params_and_json_body() {
    let server = MockServer::start_async().await;
    let get_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v10/invites/abc")
                .query_param("with_counts", "true");
            then.status(200).json_body(json!({"code": "abc"}));
        })
        .await;
    let post_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v10/channels/9/messages")
                .header("content-type", "application/json")
                .json_body(json!({"content": "hi"}));
            then.status(200).json_body(json!({"id": "3"}));
        })
        .await;

    let client = client_for(&server);
    client
        .get("invites/abc", Some(json!({"with_counts": true})))
        .await
        .unwrap();
    let sent = client
        .post("channels/9/messages", json!({"content": "hi"}))
        .await
        .unwrap();

    get_mock.assert_async().await;
    post_mock.assert_async().await;
    assert_eq!(sent.unwrap()["id"], "3");
}

#[tokio::test]
async fn test_custom_content_type_and_headers() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/v10/guilds/1/bans/2")
                .header("content-type", "text/plain")
                .header("x-audit-log-reason", "spam");
            then.status(204);
        })
        .await;

    let client = client_for(&server);
    let options = RequestOptions {
        body: Some("raw".to_string()),
        content_type: Some("text/plain".to_string()),
        headers: Some(json!({"X-Audit-Log-Reason": "spam"})),
        params: None,
    };
    client
        .request(Method::PUT, "guilds/1/bans/2", options)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_mapped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v10/channels/404");
            then.status(404).json_body(json!({"message": "Unknown Channel", "code": 10003}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v10/channels/403");
            then.status(403);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v10/channels/418");
            then.status(418);
        })
        .await;

    let client = client_for(&server);

    assert!(matches!(
        client.get("channels/404", None).await,
        Err(PincerError::NotFound { .. })
    ));
    assert!(matches!(
        client.get("channels/403", None).await,
        Err(PincerError::Forbidden { .. })
    ));
    assert!(matches!(
        client.get("channels/418", None).await,
        Err(PincerError::UnexpectedStatus { status: 418, .. })
    ));
}

#[tokio::test]
async fn test_server_errors_are_retried_until_exhausted() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v10/gateway/bot");
            then.status(502);
        })
        .await;

    let client = client_for(&server);
    let result = client.get("gateway/bot", None).await;

    match result {
        Err(PincerError::ServerError { message }) => {
            assert!(message.contains("gateway/bot"));
        }
        other => panic!("expected ServerError, got {:?}", other),
    }
    assert_eq!(mock.hits_async().await, 3);
}

#[tokio::test]
async fn test_rate_limit_headers_are_recorded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v10/channels/5");
            then.status(200)
                .header("x-ratelimit-bucket", "abcd1234")
                .header("x-ratelimit-limit", "5")
                .header("x-ratelimit-remaining", "4")
                .header("x-ratelimit-reset-after", "1.0")
                .json_body(json!({"id": "5", "type": 0}));
        })
        .await;

    let client = client_for(&server);
    client.get("channels/5", None).await.unwrap();

    let bucket = client
        .rate_limiter()
        .bucket_for("channels/5", &Method::GET)
        .unwrap();
    assert_eq!(bucket.remaining, 4);
}

#[tokio::test]
async fn test_rate_limited_request_is_resent_without_using_retries() {
    let server = MockServer::start_async().await;
    let mut limited = server
        .mock_async(|when, then| {
            when.method(GET).path("/v10/users/@me");
            then.status(429)
                .header("x-ratelimit-scope", "user")
                .json_body(json!({"message": "You are being rate limited.", "retry_after": 0.3, "global": false}));
        })
        .await;

    // A single attempt: the resend after a 429 must not count against it.
    let client = HttpClient::builder("test-token")
        .base_url(server.base_url())
        .max_retries(1)
        .retry_unit(Duration::from_millis(1))
        .build()
        .unwrap();
    let request = tokio::spawn(async move { client.get("users/@me", None).await });

    while limited.hits_async().await == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    limited.delete_async().await;
    let ok = server
        .mock_async(|when, then| {
            when.method(GET).path("/v10/users/@me");
            then.status(200)
                .json_body(json!({"id": "80351110224678912", "username": "Nelly"}));
        })
        .await;

    let body = request.await.unwrap().unwrap().unwrap();
    ok.assert_async().await;
    assert_eq!(body["username"], "Nelly");
}
