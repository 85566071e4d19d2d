use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};

use crate::models::UserProfile;

/// The subset of token claims the client reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>, // Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Credentials of a logged-in viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: UserProfile,
}

impl Session {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Session for a bare token, e.g. one supplied through configuration.
    /// The viewer identity is recovered from the token claims when possible.
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let user = match read_claims(&token) {
            Some(claims) => UserProfile {
                id: claims.sub.or(claims.id),
                email: claims.email,
                ..UserProfile::default()
            },
            None => UserProfile::default(),
        };
        Self { token, user }
    }

    /// Value of the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn viewer_id(&self) -> Option<&str> {
        self.user.id.as_deref()
    }

    /// Expiry from the token's `exp` claim. Opaque tokens have none.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        read_claims(&self.token)
            .and_then(|claims| claims.exp)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires| expires <= now)
    }
}

/// Reads the claims without verifying the signature; only the service can
/// do that. Tokens that are not HMAC-signed JWTs are treated as opaque.
fn read_claims(token: &str) -> Option<Claims> {
    let header = decode_header(token).ok()?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}
