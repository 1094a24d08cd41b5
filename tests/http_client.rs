use anchor_verify::http::{JsonClient, ReqwestClient, RequestOptions};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_ok_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/receipt/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": "ChainpointSHA256v2" })))
        .mount(&server)
        .await;

    let client = ReqwestClient::new();
    let body = client
        .request(&format!("{}/receipt/abc", server.uri()), RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(body, Some(json!({ "type": "ChainpointSHA256v2" })));
}

#[tokio::test]
async fn test_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/receipt/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ReqwestClient::new();
    let body = client
        .request(&format!("{}/receipt/missing", server.uri()), RequestOptions::get())
        .await
        .unwrap();
    assert!(body.is_none());
}

#[tokio::test]
async fn test_other_statuses_are_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pending"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ReqwestClient::new();
    for (route, expected) in [("/pending", 202u16), ("/broken", 500u16)] {
        let err = client
            .request(&format!("{}{route}", server.uri()), RequestOptions::get())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "http_error");
        match err {
            anchor_verify::error::VerifyError::Http { status, .. } => assert_eq!(status, expected),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/anchorIds"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [], "last": true })))
        .mount(&server)
        .await;

    let client = ReqwestClient::new();
    let body = client
        .request(
            &format!("{}/anchorIds", server.uri()),
            RequestOptions::get().with_token(Some("secret")),
        )
        .await
        .unwrap();
    assert!(body.is_some());
}

#[tokio::test]
async fn test_invalid_json_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = ReqwestClient::new()
        .request(&server.uri(), RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "serialization_error");
}
