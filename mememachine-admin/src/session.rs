use std::fmt;

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("At least one session secret is required")]
    NoSecrets,
    #[error("Session secret cannot be used as a key")]
    InvalidKey,
}

/// Signs and verifies the session cookie value, which carries the user id.
///
/// Values look like `<user id>.<base64url HMAC-SHA256>`. The first secret
/// signs, every secret verifies, so secrets can be rotated by prepending
/// a new one.
#[derive(Clone)]
pub struct SessionKeys {
    secrets: Vec<Vec<u8>>,
}

impl SessionKeys {
    pub const COOKIE_NAME: &'static str = "_session";

    pub fn new<I, S>(secrets: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let secrets: Vec<_> = secrets
            .into_iter()
            .map(|s| s.as_ref().as_bytes().to_vec())
            .filter(|s| !s.is_empty())
            .collect();

        if secrets.is_empty() {
            return Err(SessionError::NoSecrets);
        }

        Ok(Self { secrets })
    }

    /// Produces a signed cookie value for the user
    pub fn sign(&self, user_id: &str) -> Result<String, SessionError> {
        let mac = Self::mac(&self.secrets[0], user_id)?;
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{user_id}.{signature}"))
    }

    /// Returns the user id if the value was signed with any of the secrets
    pub fn verify(&self, value: &str) -> Option<String> {
        let (user_id, signature) = value.rsplit_once('.')?;
        let signature = Base64UrlUnpadded::decode_vec(signature).ok()?;

        let is_valid = self.secrets.iter().any(|secret| {
            Self::mac(secret, user_id)
                .map(|mac| mac.verify_slice(&signature).is_ok())
                .unwrap_or(false)
        });

        is_valid.then(|| user_id.to_string())
    }

    fn mac(secret: &[u8], payload: &str) -> Result<HmacSha256, SessionError> {
        let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SessionError::InvalidKey)?;
        mac.update(payload.as_bytes());

        Ok(mac)
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{SessionError, SessionKeys};

    #[test]
    fn signed_values_verify_to_the_user_id() {
        let keys = SessionKeys::new(["secret"]).unwrap();
        let value = keys.sign("0190b1c2-user").unwrap();

        assert!(value.starts_with("0190b1c2-user."));
        assert_eq!(keys.verify(&value).as_deref(), Some("0190b1c2-user"));
    }

    #[test]
    fn tampered_values_are_rejected() {
        let keys = SessionKeys::new(["secret"]).unwrap();
        let value = keys.sign("alice").unwrap();
        let (_, signature) = value.rsplit_once('.').unwrap();

        assert_eq!(keys.verify(&format!("mallory.{signature}")), None);
        assert_eq!(keys.verify("alice"), None);
        assert_eq!(keys.verify("alice.not-base64!"), None);
    }

    #[test]
    fn values_signed_with_a_retired_secret_still_verify() {
        let old = SessionKeys::new(["old"]).unwrap();
        let rotated = SessionKeys::new(["new", "old"]).unwrap();
        let unrelated = SessionKeys::new(["other"]).unwrap();

        let value = old.sign("alice").unwrap();

        assert_eq!(rotated.verify(&value).as_deref(), Some("alice"));
        assert_eq!(unrelated.verify(&value), None);
    }

    #[test]
    fn at_least_one_secret_is_required() {
        let empty: [&str; 0] = [];

        assert!(matches!(SessionKeys::new(empty), Err(SessionError::NoSecrets)));
        assert!(matches!(SessionKeys::new([""]), Err(SessionError::NoSecrets)));
    }
}
