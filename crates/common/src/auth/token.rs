//! Stateless bearer tokens
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 (`HS256`). The claims carry the
//! user id as `jti` and the expiry as `exp` (unix seconds). There is no revocation
//! list: a token is good until it expires or the signing key changes.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Authentication scheme prefixed to issued tokens
pub const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token subject must not be empty")]
    InvalidSubject,
    #[error("invalid token: {0}")]
    InvalidToken(&'static str),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("token validity of {0:?} cannot be represented")]
    Validity(Duration),
}

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    jti: String,
    exp: i64,
}

/// Mints and verifies bearer tokens with one server-wide secret
pub struct TokenIssuer {
    key: Zeroizing<Vec<u8>>,
    validity: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(signing_key: impl Into<Vec<u8>>, validity: Duration) -> Self {
        Self {
            key: Zeroizing::new(signing_key.into()),
            validity,
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Fails when `now + validity` does not fit a timestamp, e.g. a TTL of centuries
    pub fn expiry_at(&self, now: OffsetDateTime) -> Result<OffsetDateTime, TokenError> {
        time::Duration::try_from(self.validity)
            .ok()
            .and_then(|validity| now.checked_add(validity))
            .ok_or(TokenError::Validity(self.validity))
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issue a token for `subject`, returned as a full `Authorization` header value
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, subject: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::InvalidSubject);
        }

        let claims = Claims {
            jti: subject.to_string(),
            exp: self.expiry_at(now)?.unix_timestamp(),
        };

        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        };
        let header = serde_json::to_vec(&header).map_err(|e| TokenError::Signing(e.to_string()))?;
        let payload = serde_json::to_vec(&claims).map_err(|e| TokenError::Signing(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{} {}.{}", BEARER_SCHEME, signing_input, signature))
    }

    /// Verify an `Authorization` header value and return the subject it was issued to
    ///
    /// The value must be exactly `Bearer <token>`. Every failure maps to
    /// [`TokenError::InvalidToken`]; the reason is for logs only.
    pub fn verify(&self, header_value: &str) -> Result<String, TokenError> {
        self.verify_at(header_value, OffsetDateTime::now_utc())
    }

    pub fn verify_at(&self, header_value: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        let mut parts = header_value.split(' ');
        let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) => (scheme, token),
            _ => return Err(TokenError::InvalidToken("expected `Bearer <token>`")),
        };
        if scheme != BEARER_SCHEME {
            return Err(TokenError::InvalidToken("unsupported authorization scheme"));
        }

        let (signing_input, signature) = token
            .rsplit_once('.')
            .ok_or(TokenError::InvalidToken("malformed token"))?;
        let (header, payload) = signing_input
            .split_once('.')
            .ok_or(TokenError::InvalidToken("malformed token"))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidToken("malformed signature"))?;
        let mut mac = self
            .mac()
            .map_err(|_| TokenError::InvalidToken("signing key unusable"))?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidToken("bad signature"))?;

        let header: Header = URL_SAFE_NO_PAD
            .decode(header)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TokenError::InvalidToken("malformed header"))?;
        if header.alg != ALGORITHM {
            return Err(TokenError::InvalidToken("unexpected signing algorithm"));
        }

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TokenError::InvalidToken("malformed claims"))?;

        if now.unix_timestamp() > claims.exp {
            return Err(TokenError::InvalidToken("token expired"));
        }
        if claims.jti.is_empty() {
            return Err(TokenError::InvalidToken("token has no subject"));
        }

        Ok(claims.jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-signing-key".to_vec(), Duration::from_secs(60 * 60))
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = issuer();
        let header = issuer.issue("user-1").unwrap();
        assert!(header.starts_with("Bearer "));
        assert_eq!(issuer.verify(&header).unwrap(), "user-1");
    }

    #[test]
    fn test_empty_subject() {
        assert!(matches!(issuer().issue(""), Err(TokenError::InvalidSubject)));
    }

    #[test]
    fn test_expired() {
        let issuer = issuer();
        let issued_at = OffsetDateTime::now_utc() - time::Duration::hours(2);
        let header = issuer.issue_at("user-1", issued_at).unwrap();

        assert!(matches!(
            issuer.verify(&header),
            Err(TokenError::InvalidToken(_))
        ));
        // still good right before expiry
        let just_before = issued_at + time::Duration::minutes(59);
        assert_eq!(issuer.verify_at(&header, just_before).unwrap(), "user-1");
    }

    #[test]
    fn test_different_signing_key() {
        let header = issuer().issue("user-1").unwrap();
        let other = TokenIssuer::new(b"another-key".to_vec(), Duration::from_secs(3600));
        assert!(matches!(
            other.verify(&header),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_malformed_headers() {
        let issuer = issuer();
        let header = issuer.issue("user-1").unwrap();
        let token = header.trim_start_matches("Bearer ");

        for bad in [
            String::new(),
            token.to_string(),
            format!("Basic {}", token),
            format!("Bearer  {}", token),
            format!("Bearer {} extra", token),
            "Bearer not.a.jwt".to_string(),
            "Bearer abc".to_string(),
        ] {
            assert!(
                matches!(issuer.verify(&bad), Err(TokenError::InvalidToken(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_tampered_claims() {
        let issuer = issuer();
        let header = issuer.issue("user-1").unwrap();
        let token = header.trim_start_matches("Bearer ");
        let parts: Vec<&str> = token.split('.').collect();

        let forged = URL_SAFE_NO_PAD.encode(br#"{"jti":"user-2","exp":9999999999}"#);
        let tampered = format!("Bearer {}.{}.{}", parts[0], forged, parts[2]);
        assert!(matches!(
            issuer.verify(&tampered),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_unrepresentable_validity() {
        let issuer = TokenIssuer::new(b"k".to_vec(), Duration::from_secs(u64::MAX / 4));
        assert!(matches!(
            issuer.expiry_at(OffsetDateTime::now_utc()),
            Err(TokenError::Validity(_))
        ));
        assert!(matches!(issuer.issue("user-1"), Err(TokenError::Validity(_))));

        // fits time::Duration but runs past the last representable date
        let issuer = TokenIssuer::new(b"k".to_vec(), Duration::from_secs(20_000 * 365 * 86_400));
        assert!(matches!(issuer.issue("user-1"), Err(TokenError::Validity(_))));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", issuer());
        assert!(!debug.contains("test-signing-key"));
        assert!(!debug.contains("116, 101, 115, 116"));
    }
}
