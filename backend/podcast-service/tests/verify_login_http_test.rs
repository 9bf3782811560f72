//! HTTP-level tests for the login-verification endpoint.

use actix_web::{test, web, App};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use podcast_service::handlers;
use podcast_service::services::LoginVerifier;
use rand::rngs::OsRng;
use std::sync::Arc;

const SPKI_PREFIX: &str = "302a300506032b6570032100";

fn signed_payload(signing: &SigningKey) -> (serde_json::Value, String, String) {
    let user = serde_json::json!({"username": "pi_listener", "uid": "uid-42"});
    let jwt = "header.payload.sig".to_string();
    let message =
        serde_json::to_string(&serde_json::json!({"user": user, "jwt": jwt})).unwrap();
    let signature = BASE64.encode(signing.sign(message.as_bytes()).to_bytes());
    (user, jwt, signature)
}

fn verifier_for(signing: &SigningKey) -> Arc<LoginVerifier> {
    let spki = format!(
        "{}{}",
        SPKI_PREFIX,
        hex::encode(signing.verifying_key().as_bytes())
    );
    Arc::new(LoginVerifier::from_spki_hex(&spki).unwrap())
}

#[actix_web::test]
async fn valid_signature_returns_the_asserted_identity() {
    let signing = SigningKey::generate(&mut OsRng);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(verifier_for(&signing)))
            .route("/verify-login", web::post().to(handlers::auth::verify_login)),
    )
    .await;

    let (user, jwt, signature) = signed_payload(&signing);
    let req = test::TestRequest::post()
        .uri("/verify-login")
        .set_json(serde_json::json!({"user": user, "jwt": jwt, "signature": signature}))
        .to_request();

    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["username"], "pi_listener");
    assert_eq!(body["uid"], "uid-42");
}

#[actix_web::test]
async fn tampered_jwt_is_unauthorized() {
    let signing = SigningKey::generate(&mut OsRng);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(verifier_for(&signing)))
            .route("/verify-login", web::post().to(handlers::auth::verify_login)),
    )
    .await;

    let (user, _jwt, signature) = signed_payload(&signing);
    let req = test::TestRequest::post()
        .uri("/verify-login")
        .set_json(serde_json::json!({"user": user, "jwt": "forged", "signature": signature}))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn missing_fields_are_a_bad_request() {
    let signing = SigningKey::generate(&mut OsRng);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(verifier_for(&signing)))
            .route("/verify-login", web::post().to(handlers::auth::verify_login)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/verify-login")
        .set_json(serde_json::json!({"user": {"username": "x"}}))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
}
