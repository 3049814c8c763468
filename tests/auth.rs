use actix_web::{dev::Payload, test, FromRequest};
use chrono::Utc;
use phreddit::auth::{create_jwt, hash_password, roles_for, token_for, verify_password, Auth, Role};
use phreddit::models::User;
use serial_test::serial;
use std::env;

// Helper that guarantees a sufficiently long secret for tests.
fn set_secret() {
    env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

fn user(id: i64, is_admin: bool) -> User {
    User {
        id,
        email: "u@example.com".into(),
        display_name: "tester".into(),
        first_name: "T".into(),
        last_name: "U".into(),
        password_hash: String::new(),
        reputation: 100,
        joined_at: Utc::now(),
        is_admin,
    }
}

#[actix_web::test]
#[serial]
async fn jwt_roundtrip_ok() {
    set_secret();
    let token = create_jwt(42, "tester", vec![Role::User]).expect("token");
    // The Auth extractor is the public way to validate, so use it here.
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert_eq!(auth.0.sub, "42");
    assert_eq!(auth.0.user_id(), Some(42));
    assert_eq!(auth.0.name, "tester");
    assert!(!auth.0.is_admin());
}

#[actix_web::test]
#[serial]
async fn extractor_rejects_invalid_token() {
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", "Bearer notatoken"))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
#[serial]
async fn extractor_requires_header() {
    set_secret();
    let req = test::TestRequest::default().to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
#[serial]
async fn token_signed_with_other_secret_is_rejected() {
    env::set_var("JWT_SECRET", "another-secret-that-is-also-32-bytes!");
    let token = create_jwt(7, "eve", vec![Role::Admin]).expect("token");
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
#[serial]
async fn admin_tokens_carry_admin_role() {
    set_secret();
    assert_eq!(roles_for(&user(1, false)), vec![Role::User]);
    let token = token_for(&user(1, true)).expect("token");
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert!(auth.0.is_admin());
}

#[::core::prelude::v1::test]
fn password_hashing() {
    let hash = hash_password("s3cret", 4).expect("hash");
    assert_ne!(hash, "s3cret");
    assert!(verify_password("s3cret", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("s3cret", "not-a-bcrypt-hash"));
}
