use super::*;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";
const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

fn claims(aud: &str, exp: usize) -> SupabaseClaims {
    SupabaseClaims {
        sub: USER_ID.to_string(),
        role: "authenticated".to_string(),
        email: Some("reader@example.com".to_string()),
        aud: aud.to_string(),
        exp,
    }
}

fn sign(claims: &SupabaseClaims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_validate_supabase_jwt_success() {
    let my_claims = claims("authenticated", 9999999999);
    let token = sign(&my_claims, SECRET);

    let claims = validate_supabase_jwt(&token, SECRET).expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.email, my_claims.email);
}

#[test]
fn test_validate_supabase_jwt_expired() {
    let token = sign(&claims("authenticated", 1), SECRET);

    assert!(validate_supabase_jwt(&token, SECRET).is_err());
}

#[test]
fn test_validate_supabase_jwt_invalid_signature() {
    let token = sign(&claims("authenticated", 9999999999), "wrongsecret");

    assert!(validate_supabase_jwt(&token, SECRET).is_err());
}

#[test]
fn test_validate_supabase_jwt_wrong_audience() {
    let token = sign(&claims("anon", 9999999999), SECRET);

    assert!(validate_supabase_jwt(&token, SECRET).is_err());
}
