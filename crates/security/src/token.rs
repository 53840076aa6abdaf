//! HS256 bearer tokens.
//!
//! A token is `base64url(header).base64url(claims).base64url(signature)` with
//! the signature computed as HMAC-SHA256 over the first two segments. Only the
//! `HS256` algorithm is accepted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use campusdesk_config::AuthConfig;
use campusdesk_core::{Actor, Role, UserRecord};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Allowed clock skew when checking expiry, in seconds.
const LEEWAY_SECS: i64 = 30;

/// Why a presented credential was rejected. Each message tells the caller
/// what to do next.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("No token provided, please log in")]
    Missing,

    #[error("Malformed token, please log in again")]
    Malformed,

    #[error("Invalid token signature, please log in again")]
    BadSignature,

    #[error("Token was issued by another service, please log in again")]
    WrongIssuer,

    #[error("Token has expired, please log in again")]
    Expired,
}

/// The signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.sub.clone(),
            role: self.role,
            department: self.department.clone(),
            courses: self.courses.clone(),
        }
    }
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Issues and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.secret(),
            config.issuer.clone(),
            Duration::hours(i64::from(config.token_ttl_hours)),
        )
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length")
    }

    /// Issue a token for a directory entry.
    pub fn issue(&self, user: &UserRecord) -> String {
        self.issue_for(&user.to_actor(), Utc::now())
    }

    /// Issue a token for an actor as of `now`.
    pub fn issue_for(&self, actor: &Actor, now: DateTime<Utc>) -> String {
        let claims = Claims {
            sub: actor.id.clone(),
            role: actor.role,
            department: actor.department.clone(),
            courses: actor.courses.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            iss: self.issuer.clone(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> String {
        // Claims hold only strings, integers and a unit enum.
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{signing_input}.{signature}")
    }

    /// Verify a token as of the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, payload) = signing_input
            .split_once('.')
            .filter(|(_, payload)| !payload.contains('.'))
            .ok_or(TokenError::Malformed)?;

        let header: Header = decode_json(header)?;
        if header.alg != "HS256" {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_json(payload)?;
        if claims.iss != self.issuer {
            return Err(TokenError::WrongIssuer);
        }
        if claims.exp + LEEWAY_SECS < now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(token.trim())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret-at-least-16", "campusdesk", Duration::hours(1))
    }

    fn lecturer() -> Actor {
        Actor::new("lect1", Role::LecturerAdmin)
            .with_department("cs")
            .with_courses(["csc101", "csc201"])
    }

    #[test]
    fn issued_token_verifies_to_same_actor() {
        let token = signer().issue_for(&lecturer(), Utc::now());
        let claims = signer().verify(&token).unwrap();
        assert_eq!(claims.to_actor(), lecturer());
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let token = signer().issue_for(&lecturer(), Utc::now());
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            role: Role::SystemAdmin,
            ..signer().verify(&token).unwrap()
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(signer().verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn other_secret_fails_signature() {
        let token = signer().issue_for(&lecturer(), Utc::now());
        let other = TokenSigner::new("a-different-secret-value", "campusdesk", Duration::hours(1));
        assert_eq!(other.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_token_is_rejected_after_leeway() {
        let issued = Utc::now() - Duration::hours(2);
        let token = signer().issue_for(&lecturer(), issued);
        assert_eq!(signer().verify(&token), Err(TokenError::Expired));

        let within_leeway = issued + Duration::hours(1) + Duration::seconds(10);
        assert!(signer().verify_at(&token, within_leeway).is_ok());
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(signer().verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(signer().verify("a.b.c"), Err(TokenError::Malformed));
        assert_eq!(signer().verify("   "), Err(TokenError::Missing));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let other = TokenSigner::new("test-secret-at-least-16", "elsewhere", Duration::hours(1));
        let token = other.issue_for(&lecturer(), Utc::now());
        assert_eq!(signer().verify(&token), Err(TokenError::WrongIssuer));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   xyz "), Some("xyz"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", signer());
        assert!(!debug.contains("test-secret"));
    }
}
