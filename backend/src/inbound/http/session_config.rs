//! Session cookie settings validation.
//!
//! The server loads raw toggles through its configuration layer and hands
//! them here, so debug and release builds apply the same rules wherever the
//! values came from. Debug builds fall back to defaults with a warning;
//! release builds insist on explicit, safe values.

use std::path::{Path, PathBuf};

use actix_web::cookie::{Key, SameSite};
use sha2::{Digest, Sha256};
use tracing::warn;
use zeroize::Zeroize;

/// Key file read when no path is configured.
pub const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
const SESSION_KEY_MIN_LEN: usize = 64;
const FINGERPRINT_BYTES: usize = 8;
const SAMESITE_EXPECTED: &str = "Strict|Lax|None";

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate defaults and emit warnings for missing toggles.
    Debug,
    /// Release builds require explicit, valid session toggles.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use college_backend::inbound::http::session_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// if cfg!(debug_assertions) {
    ///     assert_eq!(mode, BuildMode::Debug);
    /// } else {
    ///     assert_eq!(mode, BuildMode::Release);
    /// }
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Raw session toggles as loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionToggles {
    /// Path of the signing key file.
    pub key_file: Option<PathBuf>,
    /// Whether cookies carry the `Secure` attribute.
    pub cookie_secure: Option<bool>,
    /// `SameSite` policy name.
    pub same_site: Option<String>,
    /// Allow a generated key when the key file is unreadable.
    pub allow_ephemeral: Option<bool>,
}

/// Validated session settings.
pub struct SessionSettings {
    /// Signing key for cookie sessions.
    pub key: Key,
    /// Whether session cookies are marked `Secure`.
    pub cookie_secure: bool,
    /// Configured `SameSite` policy for session cookies.
    pub same_site: SameSite,
}

/// Errors raised while validating session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    /// A setting required in release builds is missing.
    #[error("missing required session setting: {name}")]
    MissingSetting { name: &'static str },
    /// A setting is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Reading the session key file failed.
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The session key file exists but is too short for release builds.
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    /// `SameSite=None` requires a secure cookie in release builds.
    #[error("same_site=None requires cookie_secure=true")]
    InsecureSameSiteNone,
    /// Release builds must not allow ephemeral session keys.
    #[error("allow_ephemeral must be false in release builds")]
    EphemeralNotAllowed,
}

/// Validate session toggles for the given build mode.
///
/// # Examples
///
/// ```rust
/// use college_backend::inbound::http::session_config::{
///     BuildMode, SessionToggles, session_settings,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("college_session_key_example");
/// std::fs::write(&key_path, vec![b'a'; 64])?;
///
/// let settings = session_settings(
///     SessionToggles {
///         key_file: Some(key_path.clone()),
///         cookie_secure: Some(true),
///         same_site: Some("Strict".into()),
///         allow_ephemeral: Some(false),
///     },
///     BuildMode::Release,
/// )?;
/// assert!(settings.cookie_secure);
///
/// std::fs::remove_file(&key_path)?;
/// # Ok(())
/// # }
/// ```
pub fn session_settings(
    toggles: SessionToggles,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let cookie_secure = cookie_secure(toggles.cookie_secure, mode)?;
    let same_site = same_site(toggles.same_site, mode, cookie_secure)?;
    let allow_ephemeral = allow_ephemeral(toggles.allow_ephemeral, mode)?;
    let path = toggles
        .key_file
        .unwrap_or_else(|| PathBuf::from(SESSION_KEY_DEFAULT_PATH));
    let key = session_key(&path, mode, allow_ephemeral)?;

    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site,
    })
}

/// Truncated SHA-256 fingerprint of the signing key, for startup logs.
///
/// # Examples
///
/// ```rust
/// use actix_web::cookie::Key;
/// use college_backend::inbound::http::session_config::key_fingerprint;
///
/// let fp = key_fingerprint(&Key::generate());
/// assert_eq!(fp.len(), 16);
/// assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

fn cookie_secure(value: Option<bool>, mode: BuildMode) -> Result<bool, SessionConfigError> {
    match value {
        Some(flag) => Ok(flag),
        None if mode.is_debug() => {
            warn!("cookie_secure not set; defaulting to secure");
            Ok(true)
        }
        None => Err(SessionConfigError::MissingSetting {
            name: "cookie_secure",
        }),
    }
}

fn same_site(
    value: Option<String>,
    mode: BuildMode,
    cookie_secure: bool,
) -> Result<SameSite, SessionConfigError> {
    let default_same_site = if mode.is_debug() {
        SameSite::Lax
    } else {
        SameSite::Strict
    };

    let Some(value) = value else {
        if mode.is_debug() {
            warn!("same_site not set; using default");
            return Ok(default_same_site);
        }
        return Err(SessionConfigError::MissingSetting { name: "same_site" });
    };

    match value.to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" if cookie_secure => Ok(SameSite::None),
        "none" if mode.is_debug() => {
            warn!("same_site=None with insecure cookies; browsers may reject them");
            Ok(SameSite::None)
        }
        "none" => Err(SessionConfigError::InsecureSameSiteNone),
        _ if mode.is_debug() => {
            warn!(value = %value, "invalid same_site, using default");
            Ok(default_same_site)
        }
        _ => Err(SessionConfigError::InvalidSetting {
            name: "same_site",
            value,
            expected: SAMESITE_EXPECTED,
        }),
    }
}

fn allow_ephemeral(value: Option<bool>, mode: BuildMode) -> Result<bool, SessionConfigError> {
    match (value, mode) {
        (Some(true), BuildMode::Release) => Err(SessionConfigError::EphemeralNotAllowed),
        (Some(flag), _) => Ok(flag),
        (None, _) => Ok(false),
    }
}

fn session_key(
    path: &Path,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<Key, SessionConfigError> {
    match std::fs::read(path) {
        Ok(mut bytes) => {
            let length = bytes.len();
            if mode == BuildMode::Release && length < SESSION_KEY_MIN_LEN {
                bytes.zeroize();
                return Err(SessionConfigError::KeyTooShort {
                    path: path.to_path_buf(),
                    length,
                    min_len: SESSION_KEY_MIN_LEN,
                });
            }
            let key = Key::derive_from(&bytes);
            bytes.zeroize();
            Ok(key)
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary session key (dev only)"
            );
            Ok(Key::generate())
        }
        Err(error) => Err(SessionConfigError::KeyRead {
            path: path.to_path_buf(),
            source: error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key_file(name: &str, len: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!("college_session_{name}_{len}"));
        std::fs::write(&path, vec![b'k'; len]).expect("write key file");
        path
    }

    fn release_toggles(path: PathBuf) -> SessionToggles {
        SessionToggles {
            key_file: Some(path),
            cookie_secure: Some(true),
            same_site: Some("Strict".into()),
            allow_ephemeral: Some(false),
        }
    }

    #[rstest]
    fn debug_defaults_fill_missing_toggles() {
        let settings = session_settings(
            SessionToggles {
                key_file: Some(PathBuf::from("/nonexistent/college/key")),
                ..SessionToggles::default()
            },
            BuildMode::Debug,
        )
        .expect("debug settings");
        assert!(settings.cookie_secure);
        assert_eq!(settings.same_site, SameSite::Lax);
    }

    #[rstest]
    fn release_accepts_explicit_toggles() {
        let path = key_file("release_ok", 64);
        let settings =
            session_settings(release_toggles(path.clone()), BuildMode::Release).expect("settings");
        assert_eq!(settings.same_site, SameSite::Strict);
        std::fs::remove_file(path).expect("cleanup");
    }

    #[rstest]
    fn release_rejects_short_key() {
        let path = key_file("release_short", 16);
        let err = session_settings(release_toggles(path.clone()), BuildMode::Release)
            .err()
            .expect("short key rejected");
        assert!(matches!(err, SessionConfigError::KeyTooShort { length: 16, .. }));
        std::fs::remove_file(path).expect("cleanup");
    }

    #[rstest]
    #[case(
        SessionToggles { cookie_secure: None, ..release_toggles(PathBuf::new()) },
        "cookie_secure"
    )]
    #[case(SessionToggles { same_site: None, ..release_toggles(PathBuf::new()) }, "same_site")]
    fn release_requires_explicit_values(
        #[case] toggles: SessionToggles,
        #[case] expected: &'static str,
    ) {
        let err = session_settings(toggles, BuildMode::Release)
            .err()
            .expect("missing setting rejected");
        assert!(matches!(err, SessionConfigError::MissingSetting { name } if name == expected));
    }

    #[rstest]
    fn release_rejects_insecure_same_site_none() {
        let toggles = SessionToggles {
            cookie_secure: Some(false),
            same_site: Some("None".into()),
            ..release_toggles(PathBuf::new())
        };
        let err = session_settings(toggles, BuildMode::Release)
            .err()
            .expect("insecure none rejected");
        assert!(matches!(err, SessionConfigError::InsecureSameSiteNone));
    }

    #[rstest]
    fn release_rejects_ephemeral_keys() {
        let toggles = SessionToggles {
            allow_ephemeral: Some(true),
            ..release_toggles(PathBuf::new())
        };
        let err = session_settings(toggles, BuildMode::Release)
            .err()
            .expect("ephemeral rejected");
        assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
    }

    #[rstest]
    fn release_missing_key_file_is_an_error() {
        let err = session_settings(
            release_toggles(PathBuf::from("/nonexistent/college/key")),
            BuildMode::Release,
        )
        .err()
        .expect("unreadable key rejected");
        assert!(matches!(err, SessionConfigError::KeyRead { .. }));
    }

    #[rstest]
    fn fingerprint_is_stable_per_key() {
        let key = Key::derive_from(&[b'a'; 64]);
        assert_eq!(key_fingerprint(&key), key_fingerprint(&key));
        assert_ne!(
            key_fingerprint(&key),
            key_fingerprint(&Key::derive_from(&[b'b'; 64]))
        );
    }
}
