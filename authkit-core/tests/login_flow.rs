//! End-to-end handshake tests over HTTP against a mock account service.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::json;

use authkit_core::{
    backend::HttpAccountBackend,
    config::SessionConfig,
    keys::{KeyMaterial, Mnemonic},
    payload::{seal, PayloadKind},
    session::{NullSink, SessionManager},
    types::{DeviceInfo, ProfileInfo},
    AuthKitError,
};

fn phrase() -> String {
    Mnemonic::from_entropy(&[11u8; 32]).unwrap().phrase()
}

fn profile() -> ProfileInfo {
    ProfileInfo {
        username: "mara".to_string(),
        display_name: None,
        locale: Some("de-DE".to_string()),
    }
}

fn manager_for(url: &str) -> SessionManager<HttpAccountBackend> {
    SessionManager::new(
        HttpAccountBackend::with_base_url(url.to_string()),
        DeviceInfo::new("Test Device", "linux", "0.0.0"),
        Arc::new(NullSink),
        SessionConfig::default(),
    )
}

/// Seals the profile the way the account service stores it: under the
/// seed derived from the same phrase the client will log in with.
fn sealed_profile(phrase: &str) -> String {
    let keys = KeyMaterial::from_phrase(phrase).unwrap();
    seal(keys.payload_seed(), PayloadKind::Profile, &profile())
        .unwrap()
        .to_base64()
}

#[tokio::test]
async fn login_handshake_over_http() {
    let mut server = mockito::Server::new_async().await;
    let phrase = phrase();
    let public_key = KeyMaterial::from_phrase(&phrase).unwrap().public_key_base64();
    let challenge = URL_SAFE_NO_PAD.encode(b"c1");

    let challenge_mock = server
        .mock("POST", "/v1/auth/login/challenge")
        .match_body(mockito::Matcher::PartialJson(json!({
            "public_key": public_key,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "challenge": challenge }).to_string())
        .create_async()
        .await;

    let login_mock = server
        .mock("POST", "/v1/auth/login")
        .match_body(mockito::Matcher::PartialJson(json!({
            "challenge": challenge,
            "public_key": public_key,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "token": "tok-1", "session_id": "sess-1" }).to_string())
        .create_async()
        .await;

    let user_mock = server
        .mock("GET", "/v1/me")
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "acct-1",
                "created_at": 1_690_000_000u64,
                "profile": sealed_profile(&phrase),
            })
            .to_string(),
        )
        .create_async()
        .await;

    let manager = manager_for(&server.url());
    let user = manager.login(&phrase).await.unwrap();

    assert_eq!(user.id, "acct-1");
    assert_eq!(user.profile, profile());
    assert!(manager.is_authenticated());
    let session = manager.current_session().unwrap();
    assert_eq!(session.session_id(), "sess-1");

    challenge_mock.assert_async().await;
    login_mock.assert_async().await;
    user_mock.assert_async().await;
}

#[tokio::test]
async fn invalid_mnemonic_reaches_no_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let challenge_mock = server
        .mock("POST", "/v1/auth/login/challenge")
        .expect(0)
        .create_async()
        .await;

    let manager = manager_for(&server.url());
    let err = manager.login("not a mnemonic at all").await.unwrap_err();

    assert!(matches!(err, AuthKitError::InvalidMnemonic { .. }));
    challenge_mock.assert_async().await;
}

#[tokio::test]
async fn register_handshake_over_http() {
    let mut server = mockito::Server::new_async().await;
    let phrase = phrase();
    let public_key = KeyMaterial::from_phrase(&phrase).unwrap().public_key_base64();
    let challenge = URL_SAFE_NO_PAD.encode(b"r1");

    let challenge_mock = server
        .mock("POST", "/v1/auth/register/challenge")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "challenge": challenge }).to_string())
        .create_async()
        .await;

    let register_mock = server
        .mock("POST", "/v1/auth/register")
        .match_body(mockito::Matcher::PartialJson(json!({
            "challenge": challenge,
            "public_key": public_key,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "token": "tok-2",
                "session_id": "sess-2",
                "user": {
                    "id": "acct-2",
                    "created_at": 1_700_000_000u64,
                    "profile": sealed_profile(&phrase),
                },
            })
            .to_string(),
        )
        .create_async()
        .await;

    let manager = manager_for(&server.url());
    let user = manager.register(&phrase, &profile()).await.unwrap();

    assert_eq!(user.id, "acct-2");
    assert_eq!(user.profile, profile());
    assert!(manager.is_authenticated());

    challenge_mock.assert_async().await;
    register_mock.assert_async().await;
}

#[tokio::test]
async fn login_rejection_surfaces_status() {
    let mut server = mockito::Server::new_async().await;
    let phrase = phrase();
    let challenge = URL_SAFE_NO_PAD.encode(b"c9");

    server
        .mock("POST", "/v1/auth/login/challenge")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "challenge": challenge }).to_string())
        .create_async()
        .await;

    server
        .mock("POST", "/v1/auth/login")
        .with_status(401)
        .create_async()
        .await;

    let manager = manager_for(&server.url());
    let err = manager.login(&phrase).await.unwrap_err();

    let AuthKitError::Login { source } = err else {
        panic!("expected login wrapper, got {err:?}");
    };
    assert!(matches!(
        *source,
        AuthKitError::Network {
            status: Some(401),
            ..
        }
    ));
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn logout_clears_state_when_revoke_returns_server_error() {
    let mut server = mockito::Server::new_async().await;
    let phrase = phrase();
    let challenge = URL_SAFE_NO_PAD.encode(b"c3");

    server
        .mock("POST", "/v1/auth/login/challenge")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "challenge": challenge }).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/v1/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "token": "tok-3", "session_id": "sess-3" }).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/v1/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "acct-3",
                "created_at": 1_690_000_000u64,
                "profile": sealed_profile(&phrase),
            })
            .to_string(),
        )
        .create_async()
        .await;

    let revoke_mock = server
        .mock("DELETE", "/v1/sessions/sess-3")
        .match_header("authorization", "Bearer tok-3")
        .with_status(500)
        .create_async()
        .await;

    let manager = manager_for(&server.url());
    manager.login(&phrase).await.unwrap();
    assert!(manager.is_authenticated());

    manager.logout().await.unwrap();

    assert!(!manager.is_authenticated());
    revoke_mock.assert_async().await;
}
