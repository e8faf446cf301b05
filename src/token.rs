//! Access token issuance.
//!
//! Two swappable schemes behind one type, both resolving to "the email
//! before the first `:`":
//!
//! - [`TokenIssuer::Plain`] — base64 of `email:issued_at_millis`. Reversible
//!   and unsigned: anyone can forge a token for any email. This matches the
//!   original wire format and is NOT a security boundary. Dev only.
//! - [`TokenIssuer::Signed`] — the same payload plus an expiry, HMAC-SHA256
//!   signed with a server secret. Set ACCESS_TOKEN_SECRET to enable.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signed-token lifetime: 30 days.
const SIGNED_TOKEN_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub enum TokenIssuer {
    Plain,
    Signed { secret: String },
}

impl TokenIssuer {
    pub fn from_secret(secret: Option<String>) -> Self {
        match secret {
            Some(secret) if !secret.is_empty() => TokenIssuer::Signed { secret },
            _ => TokenIssuer::Plain,
        }
    }

    pub fn issue(&self, email: &str, now_ms: i64) -> String {
        match self {
            TokenIssuer::Plain => BASE64.encode(format!("{}:{}", email, now_ms)),
            TokenIssuer::Signed { secret } => {
                let expires_ms = now_ms + SIGNED_TOKEN_TTL_MS;
                let payload = format!("{}:{}", email, expires_ms);
                let sig = sign(secret, &payload);
                BASE64.encode(format!("{}:{}", payload, sig))
            }
        }
    }

    /// Resolve a token back to its email, or None if the token is
    /// undecodable, tampered with, or expired.
    pub fn resolve(&self, token: &str, now_ms: i64) -> Option<String> {
        let decoded = BASE64.decode(token.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;

        match self {
            TokenIssuer::Plain => {
                let email = decoded.split(':').next()?;
                (!email.is_empty()).then(|| email.to_string())
            }
            TokenIssuer::Signed { secret } => {
                // email:expires_ms:hexsig — email may not contain ':'.
                let (payload, sig) = decoded.rsplit_once(':')?;
                let expected = sign(secret, payload);
                if !bool::from(expected.as_bytes().ct_eq(sig.as_bytes())) {
                    return None;
                }
                let (email, expires_ms) = payload.rsplit_once(':')?;
                let expires_ms: i64 = expires_ms.parse().ok()?;
                if expires_ms < now_ms || email.is_empty() {
                    return None;
                }
                Some(email.to_string())
            }
        }
    }
}

fn sign(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_MS: i64 = 1_700_000_000_000;

    #[test]
    fn plain_round_trip() {
        let issuer = TokenIssuer::Plain;
        let token = issuer.issue("user@x.com", NOW_MS);
        assert_eq!(issuer.resolve(&token, NOW_MS).as_deref(), Some("user@x.com"));
    }

    #[test]
    fn plain_resolves_hand_built_token() {
        // The plain scheme is reversible by design; any base64 of
        // "email:timestamp" resolves.
        let issuer = TokenIssuer::Plain;
        let token = BASE64.encode("user@x.com:1700000000000");
        assert_eq!(issuer.resolve(&token, NOW_MS).as_deref(), Some("user@x.com"));
    }

    #[test]
    fn plain_rejects_garbage() {
        let issuer = TokenIssuer::Plain;
        assert_eq!(issuer.resolve("not-base64!!!", NOW_MS), None);
        assert_eq!(issuer.resolve(&BASE64.encode(":123"), NOW_MS), None);
    }

    #[test]
    fn signed_round_trip() {
        let issuer = TokenIssuer::Signed {
            secret: "test-secret".into(),
        };
        let token = issuer.issue("user@x.com", NOW_MS);
        assert_eq!(issuer.resolve(&token, NOW_MS).as_deref(), Some("user@x.com"));
    }

    #[test]
    fn signed_rejects_tampered_email() {
        let issuer = TokenIssuer::Signed {
            secret: "test-secret".into(),
        };
        let token = issuer.issue("user@x.com", NOW_MS);
        let decoded = String::from_utf8(BASE64.decode(&token).unwrap()).unwrap();
        let forged = BASE64.encode(decoded.replacen("user@x.com", "evil@x.com", 1));
        assert_eq!(issuer.resolve(&forged, NOW_MS), None);
    }

    #[test]
    fn signed_rejects_expired() {
        let issuer = TokenIssuer::Signed {
            secret: "test-secret".into(),
        };
        let token = issuer.issue("user@x.com", NOW_MS);
        let later = NOW_MS + SIGNED_TOKEN_TTL_MS + 1;
        assert_eq!(issuer.resolve(&token, later), None);
    }

    #[test]
    fn signed_rejects_plain_token() {
        let issuer = TokenIssuer::Signed {
            secret: "test-secret".into(),
        };
        let plain = TokenIssuer::Plain.issue("user@x.com", NOW_MS);
        assert_eq!(issuer.resolve(&plain, NOW_MS), None);
    }

    #[test]
    fn from_secret_picks_scheme() {
        assert!(matches!(TokenIssuer::from_secret(None), TokenIssuer::Plain));
        assert!(matches!(
            TokenIssuer::from_secret(Some(String::new())),
            TokenIssuer::Plain
        ));
        assert!(matches!(
            TokenIssuer::from_secret(Some("s".into())),
            TokenIssuer::Signed { .. }
        ));
    }
}
