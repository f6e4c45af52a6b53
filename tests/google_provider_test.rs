//! Google provider HTTP contract tests against a mock server.

use formgate::error::AppError;
use formgate::oauth::{GoogleProvider, IdentityProvider};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> GoogleProvider {
    GoogleProvider::with_endpoints(
        "client-id".to_string(),
        "client-secret".to_string(),
        format!("{}/auth", server.uri()),
        format!("{}/token", server.uri()),
        format!("{}/userinfo", server.uri()),
    )
}

#[tokio::test]
async fn test_exchange_code_returns_verified_identity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "provider-access-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "1234567890",
            "email": "bob@acme.com",
            "given_name": "Bob",
            "family_name": "Builder"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let identity = provider
        .exchange_code("auth-code-1", "http://localhost:3000/auth")
        .await
        .unwrap();

    assert_eq!(identity.email, "bob@acme.com");
    assert_eq!(identity.first_name, "Bob");
    assert_eq!(identity.last_name, "Builder");
}

#[tokio::test]
async fn test_exchange_code_surfaces_provider_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .exchange_code("stale-code", "http://localhost:3000/auth")
        .await
        .unwrap_err();

    match err {
        AppError::Provider(msg) => assert!(msg.contains("invalid_grant")),
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_userinfo_without_names_defaults_to_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "provider-access-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"email": "terse@acme.com"})),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let identity = provider
        .exchange_code("auth-code", "http://localhost:3000/auth")
        .await
        .unwrap();

    assert_eq!(identity.email, "terse@acme.com");
    assert_eq!(identity.first_name, "");
    assert_eq!(identity.last_name, "");
}

#[tokio::test]
async fn test_userinfo_failure_surfaces_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "provider-access-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .exchange_code("auth-code", "http://localhost:3000/auth")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Provider(_)));
}
