//! Application settings loaded via OrthoConfig, and the server configuration
//! derived from them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use zeroize::Zeroizing;

use college_backend::domain::{
    GradingError, GradingScale, RegistrationPolicy, UnknownWaiverScope, WaiverScope,
};
use college_backend::inbound::http::session_config::SessionToggles;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_PAYSTACK_TIMEOUT_SECS: u64 = 10;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not a socket address.
    #[error("invalid bind address '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// The waiver scope is not recognised.
    #[error(transparent)]
    WaiverScope(#[from] UnknownWaiverScope),
    /// The grading scale is not five descending bounds.
    #[error("invalid grading scale '{value}': {source}")]
    GradingScale {
        value: String,
        #[source]
        source: GradingError,
    },
    /// The gateway base URL does not parse.
    #[error("invalid paystack base url '{value}': {source}")]
    PaystackUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Settings read from `COLLEGE_*` environment variables, configuration
/// files, and command-line flags.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COLLEGE")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub pool_size: Option<u32>,
    /// Path of the session signing key.
    pub session_key_file: Option<PathBuf>,
    /// Whether session cookies carry the `Secure` attribute.
    pub cookie_secure: Option<bool>,
    /// `SameSite` policy for the session cookie.
    pub same_site: Option<String>,
    /// Allow a generated session key when the key file is unreadable.
    pub allow_ephemeral_session: Option<bool>,
    /// Registrations allowed to finalise without paid tuition.
    pub waiver_limit: Option<u32>,
    /// `per_term` or `lifetime`.
    pub waiver_scope: Option<String>,
    /// Maximum active registrations per student per term.
    pub course_load_limit: Option<u32>,
    /// Lower bounds of the `A`..`E` bands, e.g. `70,60,50,45,40`.
    pub grading_scale: Option<String>,
    /// Paystack API base URL.
    pub paystack_base_url: Option<String>,
    /// Paystack secret key; the sandbox gateway is used when absent.
    pub paystack_secret: Option<String>,
    /// Gateway request timeout in seconds.
    pub paystack_timeout_secs: Option<u64>,
    /// Page payers return to after checkout.
    pub paystack_callback_url: Option<String>,
    /// Username of the super admin created on first start.
    pub bootstrap_admin_username: Option<String>,
    /// Password of the bootstrap super admin.
    pub bootstrap_admin_password: Option<String>,
}

/// Paystack connection details.
pub struct PaystackSettings {
    pub base: url::Url,
    pub secret: Zeroizing<String>,
    pub timeout: Duration,
}

/// Credentials for the bootstrap super admin.
pub struct BootstrapAdmin {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl AppSettings {
    /// Return the bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    /// Return the pool size, falling back to the pool default.
    pub fn pool_size(&self) -> u32 {
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }

    /// Registration tunables with defaults for unset values.
    pub fn registration_policy(&self) -> Result<RegistrationPolicy, SettingsError> {
        let defaults = RegistrationPolicy::default();
        let waiver_scope = match self.waiver_scope.as_deref() {
            Some(raw) => raw.parse::<WaiverScope>()?,
            None => defaults.waiver_scope,
        };
        Ok(RegistrationPolicy {
            waiver_limit: self.waiver_limit.unwrap_or(defaults.waiver_limit),
            waiver_scope,
            course_load_limit: self
                .course_load_limit
                .unwrap_or(defaults.course_load_limit),
        })
    }

    /// Score-to-letter table, defaulting to 70/60/50/45/40.
    pub fn grading_scale(&self) -> Result<GradingScale, SettingsError> {
        self.grading_scale
            .as_deref()
            .map_or(Ok(GradingScale::default()), |raw| {
                GradingScale::parse(raw).map_err(|source| SettingsError::GradingScale {
                    value: raw.to_owned(),
                    source,
                })
            })
    }

    /// Gateway settings, or `None` when no secret is configured.
    pub fn paystack(&self) -> Result<Option<PaystackSettings>, SettingsError> {
        let Some(secret) = self.paystack_secret.as_ref() else {
            return Ok(None);
        };
        let raw = self
            .paystack_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PAYSTACK_BASE_URL);
        let base = url::Url::parse(raw).map_err(|source| SettingsError::PaystackUrl {
            value: raw.to_owned(),
            source,
        })?;
        Ok(Some(PaystackSettings {
            base,
            secret: Zeroizing::new(secret.clone()),
            timeout: Duration::from_secs(
                self.paystack_timeout_secs
                    .unwrap_or(DEFAULT_PAYSTACK_TIMEOUT_SECS),
            ),
        }))
    }

    /// Bootstrap admin credentials when both parts are configured.
    pub fn bootstrap_admin(&self) -> Option<BootstrapAdmin> {
        match (&self.bootstrap_admin_username, &self.bootstrap_admin_password) {
            (Some(username), Some(password)) => Some(BootstrapAdmin {
                username: username.clone(),
                password: Zeroizing::new(password.clone()),
            }),
            _ => None,
        }
    }

    /// Raw session toggles for validation.
    pub fn session_toggles(&self) -> SessionToggles {
        SessionToggles {
            key_file: self.session_key_file.clone(),
            cookie_secure: self.cookie_secure,
            same_site: self.same_site.clone(),
            allow_ephemeral: self.allow_ephemeral_session,
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration from validated session settings.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
