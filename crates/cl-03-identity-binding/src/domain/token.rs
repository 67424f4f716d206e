//! # Session Tokens
//!
//! `hex(claims_json) "." hex(hmac_sha256(secret, claims_json))`
//!
//! The claims are the serialized [`Session`]. Tokens are bearer credentials;
//! there is no revocation list, only expiry.

use shared_types::{hmac_sign, hmac_verify, Session, MIN_SECRET_LEN};
use std::fmt;
use zeroize::Zeroizing;

use super::errors::IdentityError;

pub struct SessionCodec {
    secret: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: &[u8]) -> Result<Self, IdentityError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(IdentityError::Configuration(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                secret.len()
            )));
        }
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
        })
    }

    pub fn encode(&self, session: &Session) -> Result<String, IdentityError> {
        let claims =
            serde_json::to_vec(session).map_err(|e| IdentityError::Internal(e.to_string()))?;
        let tag = hmac_sign(&self.secret, &claims)
            .ok_or_else(|| IdentityError::Internal("hmac key rejected".into()))?;
        Ok(format!("{}.{}", hex::encode(&claims), hex::encode(tag)))
    }

    /// MAC first, then expiry against `now`.
    pub fn decode(&self, token: &str, now: u64) -> Result<Session, IdentityError> {
        let (claims_hex, tag_hex) = token.split_once('.').ok_or(IdentityError::InvalidToken)?;
        let claims = hex::decode(claims_hex).map_err(|_| IdentityError::InvalidToken)?;
        let tag = hex::decode(tag_hex).map_err(|_| IdentityError::InvalidToken)?;

        if !hmac_verify(&self.secret, &claims, &tag) {
            return Err(IdentityError::InvalidToken);
        }
        let session: Session =
            serde_json::from_slice(&claims).map_err(|_| IdentityError::InvalidToken)?;
        if session.is_expired(now) {
            return Err(IdentityError::SessionExpired);
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Address, Role};
    use std::collections::BTreeSet;

    fn session() -> Session {
        Session::new(
            Address([3; 20]),
            BTreeSet::from([Role::Issuer, Role::Student]),
            1_000,
            60,
        )
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            SessionCodec::new(&[1u8; 16]),
            Err(IdentityError::Configuration(_))
        ));
    }

    #[test]
    fn test_token_carries_session() {
        let codec = SessionCodec::new(&[9u8; 32]).unwrap();
        let s = session();
        let token = codec.encode(&s).unwrap();
        assert_eq!(codec.decode(&token, 1_010).unwrap(), s);
    }

    #[test]
    fn test_expired_token() {
        let codec = SessionCodec::new(&[9u8; 32]).unwrap();
        let token = codec.encode(&session()).unwrap();
        assert_eq!(
            codec.decode(&token, 1_060),
            Err(IdentityError::SessionExpired)
        );
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let codec = SessionCodec::new(&[9u8; 32]).unwrap();
        let token = codec.encode(&session()).unwrap();
        let (_, tag) = token.split_once('.').unwrap();

        let mut forged = session();
        forged.roles.insert(Role::Admin);
        let claims = hex::encode(serde_json::to_vec(&forged).unwrap());
        assert_eq!(
            codec.decode(&format!("{claims}.{tag}"), 1_010),
            Err(IdentityError::InvalidToken)
        );
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = SessionCodec::new(&[9u8; 32])
            .unwrap()
            .encode(&session())
            .unwrap();
        let other = SessionCodec::new(&[8u8; 32]).unwrap();
        assert_eq!(other.decode(&token, 1_010), Err(IdentityError::InvalidToken));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = SessionCodec::new(&[9u8; 32]).unwrap();
        assert_eq!(codec.decode("nope", 0), Err(IdentityError::InvalidToken));
        assert_eq!(codec.decode("zz.zz", 0), Err(IdentityError::InvalidToken));
    }
}
