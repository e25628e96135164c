//! Salted, hour-windowed identity hashing
//!
//! A content id is never sent in the clear. Each request carries
//! `HMAC-SHA256(group_key, "{value}:{base64(salt)}:{YYYYMMDDHH}:{build_id}")`
//! together with a fresh random salt, so only a holder of the same group
//! key and build, hashing the same value within the same UTC hour, can
//! recognise it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fmt::Display;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Digest length in bytes
pub const DIGEST_LENGTH: usize = 32;

/// Salt length in bytes
pub const SALT_LENGTH: usize = 16;

/// Build identifier mixed into every digest unless overridden
pub const DEFAULT_BUILD_ID: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Invalid group key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, HashError>;

/// A digest and the salt it was computed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedIdentifier {
    pub digest: [u8; DIGEST_LENGTH],
    pub salt: [u8; SALT_LENGTH],
}

/// 16 bytes from the OS CSPRNG
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);
    salt
}

fn hour_window(when: DateTime<Utc>) -> String {
    when.format("%Y%m%d%H").to_string()
}

/// Keyed hasher for one group key and build
#[derive(Clone)]
pub struct IdentityHasher {
    keyed: HmacSha256,
    build_id: String,
}

impl IdentityHasher {
    /// Create a hasher keyed by `group_key`
    ///
    /// An empty group key is allowed; everyone without a private group
    /// shares it.
    pub fn new(group_key: &[u8], build_id: impl Into<String>) -> Result<Self> {
        let keyed = HmacSha256::new_from_slice(group_key)
            .map_err(|e| HashError::InvalidKey(e.to_string()))?;

        Ok(Self {
            keyed,
            build_id: build_id.into(),
        })
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Digest `value` with `salt` in the current hour window
    pub fn hash(&self, value: impl Display, salt: &[u8; SALT_LENGTH]) -> [u8; DIGEST_LENGTH] {
        self.hash_at(value, salt, Utc::now())
    }

    /// Digest `value` with `salt` in the hour window containing `when`
    pub fn hash_at(
        &self,
        value: impl Display,
        salt: &[u8; SALT_LENGTH],
        when: DateTime<Utc>,
    ) -> [u8; DIGEST_LENGTH] {
        self.mac_for(value, salt, when).finalize().into_bytes().into()
    }

    /// Digest `value` with a newly generated salt
    pub fn hash_with_fresh_salt(&self, value: impl Display) -> HashedIdentifier {
        let salt = generate_salt();
        HashedIdentifier {
            digest: self.hash(value, &salt),
            salt,
        }
    }

    /// Constant-time check that `digest` belongs to `value` in the current window
    pub fn verify(&self, value: impl Display, salt: &[u8; SALT_LENGTH], digest: &[u8]) -> bool {
        self.verify_at(value, salt, digest, Utc::now())
    }

    pub fn verify_at(
        &self,
        value: impl Display,
        salt: &[u8; SALT_LENGTH],
        digest: &[u8],
        when: DateTime<Utc>,
    ) -> bool {
        self.mac_for(value, salt, when).verify_slice(digest).is_ok()
    }

    /// First candidate whose digest matches, used to resolve a received
    /// update against a known friend list
    pub fn find_match<'a, V>(
        &self,
        candidates: impl IntoIterator<Item = &'a V>,
        digest: &[u8],
        salt: &[u8; SALT_LENGTH],
    ) -> Option<&'a V>
    where
        V: Display + 'a,
    {
        let now = Utc::now();
        candidates
            .into_iter()
            .find(|candidate| self.verify_at(candidate, salt, digest, now))
    }

    fn mac_for(&self, value: impl Display, salt: &[u8; SALT_LENGTH], when: DateTime<Utc>) -> HmacSha256 {
        let message = format!(
            "{}:{}:{}:{}",
            value,
            BASE64.encode(salt),
            hour_window(when),
            self.build_id
        );

        let mut mac = self.keyed.clone();
        mac.update(message.as_bytes());
        mac
    }
}

impl std::fmt::Debug for IdentityHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityHasher")
            .field("build_id", &self.build_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hasher() -> IdentityHasher {
        IdentityHasher::new(b"private-group", "test-build").unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_same_inputs_same_window_match() {
        let salt = [7u8; SALT_LENGTH];
        let first = hasher().hash_at(1234567890u64, &salt, at(14, 1));
        let second = hasher().hash_at(1234567890u64, &salt, at(14, 59));
        assert_eq!(first, second);
    }

    #[test]
    fn test_known_digest() {
        // HMAC-SHA256("private-group", "42:AAAAAAAAAAAAAAAAAAAAAA==:2024030914:test-build")
        let expected = {
            let mut mac = HmacSha256::new_from_slice(b"private-group").unwrap();
            mac.update(b"42:AAAAAAAAAAAAAAAAAAAAAA==:2024030914:test-build");
            let bytes: [u8; 32] = mac.finalize().into_bytes().into();
            bytes
        };
        assert_eq!(hasher().hash_at(42u64, &[0u8; SALT_LENGTH], at(14, 30)), expected);
    }

    #[test]
    fn test_salt_window_key_and_build_change_digest() {
        let salt = [7u8; SALT_LENGTH];
        let base = hasher().hash_at(99u64, &salt, at(10, 0));

        assert_ne!(base, hasher().hash_at(99u64, &[8u8; SALT_LENGTH], at(10, 0)));
        assert_ne!(base, hasher().hash_at(99u64, &salt, at(11, 0)));
        assert_ne!(base, hasher().hash_at(100u64, &salt, at(10, 0)));

        let other_key = IdentityHasher::new(b"another-group", "test-build").unwrap();
        assert_ne!(base, other_key.hash_at(99u64, &salt, at(10, 0)));

        let other_build = IdentityHasher::new(b"private-group", "other-build").unwrap();
        assert_ne!(base, other_build.hash_at(99u64, &salt, at(10, 0)));
    }

    #[test]
    fn test_fresh_salts_differ() {
        let first = hasher().hash_with_fresh_salt(5u64);
        let second = hasher().hash_with_fresh_salt(5u64);
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.digest, second.digest);
    }

    #[test]
    fn test_verify_and_find_match() {
        let hasher = hasher();
        let identifier = hasher.hash_with_fresh_salt(2002u64);

        assert!(hasher.verify(2002u64, &identifier.salt, &identifier.digest));
        assert!(!hasher.verify(2003u64, &identifier.salt, &identifier.digest));
        assert!(!hasher.verify(2002u64, &identifier.salt, &identifier.digest[..16]));

        let friends = [1001u64, 2002, 3003];
        assert_eq!(
            hasher.find_match(&friends, &identifier.digest, &identifier.salt),
            Some(&2002)
        );
        assert_eq!(
            hasher.find_match(&friends[..1], &identifier.digest, &identifier.salt),
            None
        );
    }

    #[test]
    fn test_empty_group_key_is_allowed() {
        let hasher = IdentityHasher::new(b"", DEFAULT_BUILD_ID).unwrap();
        let salt = generate_salt();
        assert_eq!(hasher.hash(1u64, &salt).len(), DIGEST_LENGTH);
        assert!(DEFAULT_BUILD_ID.starts_with("goodfriend-client/"));
    }
}
