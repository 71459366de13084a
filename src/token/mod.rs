//! Compact signed bearer tokens.
//!
//! A token is `base64url(header).base64url(claims).base64url(signature)`
//! with an HMAC-SHA256 signature over the first two segments. Verification
//! is pure computation: no I/O, no suspension. Expiry is carried inside the
//! claims and checked by the caller against the wall clock, never here.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// The signed payload carried inside a token: subject plus expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// A claim expires once its `exp` instant lies in the past.
    #[must_use]
    pub fn is_expired(&self, now_unix_seconds: i64) -> bool {
        self.exp < now_unix_seconds
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid signing key")]
    Key,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[must_use]
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Signs and verifies tokens with a process-wide secret.
///
/// The secret is injected once at construction and owned by the codec, so
/// nothing else in the process ever touches the raw key material.
#[derive(Clone)]
pub struct TokenCodec {
    secret: SecretString,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).map_err(|_| Error::Key)
    }

    /// Issue a token for `subject` expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded or the signing key
    /// is unusable.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, Error> {
        let now = unix_now();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.sign_at(subject, now, now.saturating_add(ttl))
    }

    /// Issue a token with explicit instants. `issue` delegates here; tests
    /// that need clock control call it directly.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TokenCodec::issue`].
    pub fn sign_at(&self, subject: &str, issued_at: i64, expires_at: i64) -> Result<String, Error> {
        self.sign(&Claims {
            sub: subject.to_string(),
            exp: expires_at,
            iat: issued_at,
        })
    }

    /// Serialize and sign a claims set.
    ///
    /// # Errors
    ///
    /// Returns an error if the header/claims JSON cannot be encoded or the
    /// signing key is unusable.
    pub fn sign(&self, claims: &Claims) -> Result<String, Error> {
        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token's structure and signature and return its claims.
    ///
    /// Expiry is NOT checked here; callers compare [`Claims::exp`] against
    /// their own clock via [`Claims::is_expired`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, carries an unexpected
    /// algorithm, or the signature does not verify.
    pub fn parse(&self, token: &str) -> Result<Claims, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
        if parts.next().is_some() {
            return Err(Error::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
        let mut mac = self.mac()?;
        mac.update(format!("{header_b64}.{claims_b64}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        b64d_json(claims_b64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(SecretString::from("unit-test-secret".to_string()))
    }

    #[test]
    fn sign_and_parse_roundtrip() -> Result<(), Error> {
        let codec = codec();
        let token = codec.sign_at("alice", NOW, NOW + 60)?;
        let claims = codec.parse(&token)?;

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 60);
        Ok(())
    }

    #[test]
    fn signing_is_deterministic() -> Result<(), Error> {
        let codec = codec();
        let first = codec.sign_at("alice", NOW, NOW + 60)?;
        let second = codec.sign_at("alice", NOW, NOW + 60)?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn issue_embeds_ttl() -> Result<(), Error> {
        let codec = codec();
        let token = codec.issue("alice", Duration::from_secs(60))?;
        let claims = codec.parse(&token)?;

        assert_eq!(claims.exp - claims.iat, 60);
        assert!(!claims.is_expired(claims.iat));
        Ok(())
    }

    #[test]
    fn expiry_is_strict() {
        let claims = Claims {
            sub: "alice".to_string(),
            exp: NOW,
            iat: NOW - 60,
        };

        // A token expires only once the clock moves past `exp`.
        assert!(!claims.is_expired(NOW));
        assert!(claims.is_expired(NOW + 1));
    }

    #[test]
    fn rejects_tampered_claims() -> Result<(), Error> {
        let codec = codec();
        let token = codec.sign_at("alice", NOW, NOW + 60)?;

        let forged_claims = b64e_json(&Claims {
            sub: "mallory".to_string(),
            exp: NOW + 3600,
            iat: NOW,
        })?;
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_claims;
        let forged = parts.join(".");

        assert!(matches!(
            codec.parse(&forged),
            Err(Error::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn rejects_wrong_secret() -> Result<(), Error> {
        let token = codec().sign_at("alice", NOW, NOW + 60)?;
        let other = TokenCodec::new(SecretString::from("a-different-secret".to_string()));

        assert!(matches!(other.parse(&token), Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_unsupported_algorithm() -> Result<(), Error> {
        let codec = codec();
        let header = b64e_json(&TokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })?;
        let claims = b64e_json(&Claims {
            sub: "alice".to_string(),
            exp: NOW + 60,
            iat: NOW,
        })?;
        let token = format!("{header}.{claims}.");

        assert!(matches!(
            codec.parse(&token),
            Err(Error::UnsupportedAlg(alg)) if alg == "none"
        ));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() {
        let codec = codec();

        assert!(matches!(codec.parse(""), Err(Error::TokenFormat)));
        assert!(matches!(codec.parse("a.b"), Err(Error::TokenFormat)));
        assert!(matches!(codec.parse("a.b.c.d"), Err(Error::TokenFormat)));
        assert!(matches!(
            codec.parse("!!!.???.###"),
            Err(Error::Base64)
        ));
    }
}
