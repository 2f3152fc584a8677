//! Shared token authority for LearnHub services.
//!
//! Every service verifies credentials locally with the same derived key; there
//! is no verification round trip to auth-service. Verification is pure
//! computation with no I/O and no shared mutable state, so a single
//! [`JwtAuthority`] can be shared across any number of concurrent requests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;
use std::str::FromStr;

const JWT_ALGORITHM: Algorithm = Algorithm::HS512;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 24 * 3600;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 3600;

/// Business role carried in every credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "INSTRUCTOR" => Ok(Role::Instructor),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Token type claim. A refresh token must never be accepted where an access
/// token is required, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Signed claim set. Never persisted; expires by timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// User id from auth-service
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    /// Token type: access or refresh
    pub typ: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Verification failures. Expired and invalid are distinct on purpose: clients
/// only attempt a silent refresh on expiry, and operators log the two
/// differently (forgery vs normal churn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Access/refresh pair returned by the issuance endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Issues and verifies HS512-signed credentials.
pub struct JwtAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtAuthority {
    /// Builds an authority from the shared operator secret.
    ///
    /// The signing key is `SHA-512(secret)`: HS512 wants a fixed 64-byte key,
    /// and hashing normalizes an arbitrary-length secret into one. The
    /// derivation is deterministic, so every service instance configured with
    /// the same secret accepts the same tokens.
    pub fn new(secret: &str, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        let key = Sha512::digest(secret.as_bytes());
        Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    fn ttl(&self, typ: TokenType) -> Duration {
        match typ {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        }
    }

    /// Signs a credential for the given identity.
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
        typ: TokenType,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            user_id,
            username: username.to_string(),
            role,
            typ,
            iat: now.timestamp(),
            exp: (now + self.ttl(typ)).timestamp(),
        };

        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|_| TokenError::Invalid)?;
        tracing::debug!(subject = %username, typ = typ.as_str(), exp = claims.exp, "credential issued");
        Ok(token)
    }

    /// Issues the access + refresh pair handed out by login/refresh.
    pub fn issue_pair(
        &self,
        user_id: i64,
        username: &str,
        role: Role,
    ) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, username, role, TokenType::Access)?,
            refresh_token: self.issue(user_id, username, role, TokenType::Refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Recomputes the signature and checks expiry.
    ///
    /// Expiry and signature mismatch are reported as distinct errors; callers
    /// must not collapse them before logging.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }

    /// Verifies and additionally requires the given type claim.
    pub fn verify_typed(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.typ != expected {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-for-unit-tests-only";

    fn authority() -> JwtAuthority {
        JwtAuthority::new(SECRET, DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS)
    }

    #[test]
    fn round_trip_preserves_identity_claims() {
        let auth = authority();
        let token = auth.issue(7, "alice", Role::Student, TokenType::Access).unwrap();

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.typ, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn same_secret_verifies_across_instances() {
        // Two services configured with the same secret must accept each
        // other's tokens without talking to each other.
        let issuer = authority();
        let verifier = JwtAuthority::new(SECRET, 60, 120);

        let token = issuer.issue(3, "bob", Role::Instructor, TokenType::Access).unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.user_id, 3);
        assert_eq!(claims.role, Role::Instructor);
    }

    #[test]
    fn different_secret_is_invalid_not_expired() {
        let issuer = authority();
        let other = JwtAuthority::new("another-secret", 60, 120);

        let token = issuer.issue(1, "alice", Role::Student, TokenType::Access).unwrap();
        assert_eq!(other.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_token_is_reported_distinctly() {
        let auth = JwtAuthority::new(SECRET, -120, -120);
        let token = auth.issue(1, "alice", Role::Student, TokenType::Access).unwrap();

        assert_eq!(auth.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let auth = authority();
        let token = auth.issue(1, "alice", Role::Student, TokenType::Access).unwrap();

        // Flip a character in the payload segment.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = format!("x{}", &parts[1][1..]);
        let tampered = parts.join(".");

        assert_eq!(auth.verify(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        let auth = authority();
        assert_eq!(auth.verify("not.a.token"), Err(TokenError::Invalid));
        assert_eq!(auth.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn typed_verification_rejects_wrong_type() {
        let auth = authority();
        let refresh = auth.issue(1, "alice", Role::Student, TokenType::Refresh).unwrap();
        let access = auth.issue(1, "alice", Role::Student, TokenType::Access).unwrap();

        assert_eq!(
            auth.verify_typed(&refresh, TokenType::Access),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            auth.verify_typed(&access, TokenType::Refresh),
            Err(TokenError::Invalid)
        );
        assert!(auth.verify_typed(&access, TokenType::Access).is_ok());
        assert!(auth.verify_typed(&refresh, TokenType::Refresh).is_ok());
    }

    #[test]
    fn refresh_expiry_is_later_than_access() {
        let auth = authority();
        let access = auth.issue(1, "alice", Role::Student, TokenType::Access).unwrap();
        let refresh = auth.issue(1, "alice", Role::Student, TokenType::Refresh).unwrap();

        let a = auth.verify(&access).unwrap();
        let r = auth.verify(&refresh).unwrap();
        assert!(r.exp > a.exp);
    }

    #[test]
    fn pair_carries_bearer_metadata() {
        let auth = authority();
        let pair = auth.issue_pair(9, "carol", Role::Admin).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, DEFAULT_ACCESS_TTL_SECS);
        assert!(auth.verify_typed(&pair.access_token, TokenType::Access).is_ok());
        assert!(auth.verify_typed(&pair.refresh_token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn wire_claim_names_are_stable() {
        let auth = authority();
        let token = auth.issue(5, "dave", Role::Instructor, TokenType::Access).unwrap();
        let claims = auth.verify(&token).unwrap();

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 5);
        assert_eq!(json["role"], "INSTRUCTOR");
        assert_eq!(json["typ"], "access");
        assert_eq!(json["sub"], "dave");
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("ROOT".parse::<Role>().is_err());
    }
}
