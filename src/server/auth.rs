//! Bearer token authentication.
//!
//! Tokens are standard HS256 JWTs signed with the configured secret. Access
//! tokens carry the user's role and a short expiry; refresh tokens only carry
//! the subject and live longer. The user table is the demo pair baked into
//! the service (admin/user); passwords are stored as SHA-256 hex digests.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::AuthConfig;
use crate::server::AppState;
use crate::server::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

pub const TOKEN_ACCESS: &str = "access";
pub const TOKEN_REFRESH: &str = "refresh";

/// A known user.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Role, present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// "access" or "refresh"
    #[serde(rename = "type")]
    pub token_kind: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

/// Token issuance and verification.
pub struct AuthService {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    users: HashMap<String, User>,
}

impl AuthService {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret_key.as_bytes().to_vec(),
            access_ttl: Duration::minutes(config.access_token_expire_mins),
            refresh_ttl: Duration::days(config.refresh_token_expire_days),
            users: default_users(),
        }
    }

    /// Seconds an access token stays valid, for the login response.
    pub fn access_expires_in(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Look up a user by name.
    pub fn user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    /// Check a username/password pair against the user table.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&User> {
        let user = self.users.get(username)?;
        (hash_password(password) == user.password_hash).then_some(user)
    }

    /// Issue an access token carrying the user's role.
    pub fn issue_access_token(&self, user: &User) -> Result<String> {
        self.encode(&Claims {
            sub: user.username.clone(),
            role: Some(user.role.clone()),
            token_kind: TOKEN_ACCESS.to_string(),
            exp: (Utc::now() + self.access_ttl).timestamp(),
        })
    }

    /// Issue a refresh token.
    pub fn issue_refresh_token(&self, user: &User) -> Result<String> {
        self.encode(&Claims {
            sub: user.username.clone(),
            role: None,
            token_kind: TOKEN_REFRESH.to_string(),
            exp: (Utc::now() + self.refresh_ttl).timestamp(),
        })
    }

    fn encode(&self, claims: &Claims) -> Result<String> {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes()));
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token's signature, expiry, and kind, returning its claims.
    pub fn verify(&self, token: &str, expected_kind: &str) -> Result<Claims> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::auth("malformed token"));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::auth("malformed token signature"))?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts any key length");
        mac.update(format!("{header}.{payload}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::auth("invalid token signature"))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AppError::auth("malformed token payload"))?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| AppError::auth("malformed claims"))?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::auth("token expired"));
        }
        if claims.token_kind != expected_kind {
            return Err(AppError::auth("wrong token type"));
        }
        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts any key length");
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

/// SHA-256 hex digest of a password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Demo user table matching the original service.
fn default_users() -> HashMap<String, User> {
    [
        User {
            username: "admin".to_string(),
            password_hash: hash_password("admin123"),
            role: ROLE_ADMIN.to_string(),
        },
        User {
            username: "user".to_string(),
            password_hash: hash_password("user123"),
            role: ROLE_USER.to_string(),
        },
    ]
    .into_iter()
    .map(|user| (user.username.clone(), user))
    .collect()
}

/// Extractor for any authenticated user (valid access token).
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::unauthorized("missing bearer token"))?;

        let claims = state
            .auth
            .verify(bearer.token(), TOKEN_ACCESS)
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;

        let user = state
            .auth
            .user(&claims.sub)
            .ok_or_else(|| ApiError::unauthorized("unknown user"))?;

        Ok(AuthUser(user.clone()))
    }
}

/// Extractor for admin users.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(ApiError::forbidden("admin access required"));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::from_config(&AuthConfig {
            secret_key: "test-secret".to_string(),
            access_token_expire_mins: 30,
            refresh_token_expire_days: 7,
        })
    }

    #[test]
    fn test_authenticate_default_users() {
        let auth = service();
        assert!(auth.authenticate("admin", "admin123").is_some());
        assert!(auth.authenticate("admin", "wrong").is_none());
        assert!(auth.authenticate("ghost", "admin123").is_none());

        let user = auth.authenticate("user", "user123").unwrap();
        assert_eq!(user.role, ROLE_USER);
    }

    #[test]
    fn test_access_token_roundtrip() {
        let auth = service();
        let user = auth.user("admin").unwrap().clone();
        let token = auth.issue_access_token(&user).unwrap();

        let claims = auth.verify(&token, TOKEN_ACCESS).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role.as_deref(), Some(ROLE_ADMIN));
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let auth = service();
        let user = auth.user("admin").unwrap().clone();
        let token = auth.issue_refresh_token(&user).unwrap();

        assert!(auth.verify(&token, TOKEN_ACCESS).is_err());
        assert!(auth.verify(&token, TOKEN_REFRESH).is_ok());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let auth = service();
        let user = auth.user("admin").unwrap().clone();
        let token = auth.issue_access_token(&user).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('A');
        assert!(auth.verify(&tampered, TOKEN_ACCESS).is_err());

        assert!(auth.verify("not.a.token", TOKEN_ACCESS).is_err());
        assert!(auth.verify("garbage", TOKEN_ACCESS).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let auth = service();
        let other = AuthService::from_config(&AuthConfig {
            secret_key: "another-secret".to_string(),
            access_token_expire_mins: 30,
            refresh_token_expire_days: 7,
        });

        let user = auth.user("admin").unwrap().clone();
        let token = auth.issue_access_token(&user).unwrap();
        assert!(other.verify(&token, TOKEN_ACCESS).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = AuthService::from_config(&AuthConfig {
            secret_key: "test-secret".to_string(),
            access_token_expire_mins: -5,
            refresh_token_expire_days: 7,
        });
        let user = auth.user("admin").unwrap().clone();
        let token = auth.issue_access_token(&user).unwrap();

        assert!(auth.verify(&token, TOKEN_ACCESS).is_err());
    }

    #[test]
    fn test_hash_password_is_hex_sha256() {
        let digest = hash_password("admin123");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, hash_password("admin123"));
        assert_ne!(digest, hash_password("admin124"));
    }
}
