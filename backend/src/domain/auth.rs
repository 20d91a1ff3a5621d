//! Authentication primitives: login credentials and stored password digests.
//!
//! Inbound adapters parse raw strings into [`LoginCredentials`] before
//! calling the login port. Stored credentials are salted SHA-256 digests in
//! the form `sha256$<salt-hex>$<digest-hex>` and are compared in constant
//! time.

use std::fmt;

use sha2::{Digest, Sha256};
use uuid::Uuid;
use zeroize::Zeroizing;

const DIGEST_SCHEME: &str = "sha256";

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    EmptyUsername,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials.
///
/// ## Invariants
/// - `username` is trimmed and non-empty.
/// - `password` is non-empty and kept verbatim; it is zeroed on drop.
///
/// # Examples
/// ```
/// use college_backend::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" registrar ", "s3cret").unwrap();
/// assert_eq!(creds.username(), "registrar");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = username.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            username: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Username used for directory lookups.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password supplied by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Error returned when a stored digest string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored password digest is malformed")]
pub struct MalformedDigest;

/// Salted password digest persisted alongside a principal.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl PasswordDigest {
    /// Hash `password` with a fresh random salt.
    pub fn derive(password: &str) -> Self {
        let salt = Uuid::new_v4().as_bytes().to_vec();
        let digest = hash(&salt, password);
        Self { salt, digest }
    }

    /// Check `password` against this digest in constant time.
    pub fn matches(&self, password: &str) -> bool {
        constant_time_eq(&hash(&self.salt, password), &self.digest)
    }

    /// Encoded form suitable for storage.
    pub fn encode(&self) -> String {
        format!(
            "{DIGEST_SCHEME}${}${}",
            hex::encode(&self.salt),
            hex::encode(&self.digest)
        )
    }

    /// Parse the encoded storage form.
    pub fn decode(encoded: &str) -> Result<Self, MalformedDigest> {
        let mut parts = encoded.split('$');
        let (Some(DIGEST_SCHEME), Some(salt), Some(digest), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MalformedDigest);
        };
        let salt = hex::decode(salt).map_err(|_| MalformedDigest)?;
        let digest = hex::decode(digest).map_err(|_| MalformedDigest)?;
        if salt.is_empty() || digest.len() != 32 {
            return Err(MalformedDigest);
        }
        Ok(Self { salt, digest })
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

fn hash(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Compare two byte strings without short-circuiting on the first mismatch.
pub(crate) fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "pw", LoginValidationError::EmptyUsername)]
    #[case("   ", "pw", LoginValidationError::EmptyUsername)]
    #[case("user", "", LoginValidationError::EmptyPassword)]
    fn invalid_credentials(
        #[case] username: &str,
        #[case] password: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = LoginCredentials::try_from_parts(username, password)
            .expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn digest_matches_only_the_original_password() {
        let digest = PasswordDigest::derive("correct horse");
        assert!(digest.matches("correct horse"));
        assert!(!digest.matches("correct horse "));
    }

    #[rstest]
    fn digests_are_salted() {
        let first = PasswordDigest::derive("same");
        let second = PasswordDigest::derive("same");
        assert_ne!(first.encode(), second.encode());
    }

    #[rstest]
    fn encoded_digest_round_trips() {
        let digest = PasswordDigest::derive("pw");
        let decoded = PasswordDigest::decode(&digest.encode()).expect("decodes");
        assert!(decoded.matches("pw"));
    }

    #[rstest]
    #[case("")]
    #[case("md5$00$00")]
    #[case("sha256$zz$00")]
    #[case("sha256$00$00")]
    #[case("sha256$00$00$extra")]
    fn malformed_digests_are_rejected(#[case] encoded: &str) {
        assert_eq!(PasswordDigest::decode(encoded), Err(MalformedDigest));
    }

    #[rstest]
    #[case(b"abc", b"abc", true)]
    #[case(b"abc", b"abd", false)]
    #[case(b"abc", b"ab", false)]
    fn constant_time_comparison(#[case] left: &[u8], #[case] right: &[u8], #[case] equal: bool) {
        assert_eq!(constant_time_eq(left, right), equal);
    }
}
