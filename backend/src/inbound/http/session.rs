//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Wraps the Actix cookie session so handlers only persist, read, or clear
//! the authenticated principal id, and resolve it to a [`Principal`].

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::ports::PrincipalDirectory;
use crate::domain::{Error, Principal, PrincipalId};

pub(crate) const PRINCIPAL_ID_KEY: &str = "principal_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated principal's id in the session cookie.
    pub fn persist_principal(&self, id: &PrincipalId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(PRINCIPAL_ID_KEY, id.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Drop every value held by the session.
    pub fn clear(&self) {
        self.0.purge();
    }

    /// Fetch the current principal id from the session, if present.
    pub fn principal_id(&self) -> Result<Option<PrincipalId>, Error> {
        let raw = self
            .0
            .get::<String>(PRINCIPAL_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        match raw {
            Some(raw) => match raw.parse::<PrincipalId>() {
                Ok(id) => Ok(Some(id)),
                Err(error) => {
                    tracing::warn!("invalid principal id in session cookie: {error}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Require an authenticated principal id or return `401 Unauthorized`.
    pub fn require_principal_id(&self) -> Result<PrincipalId, Error> {
        self.principal_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Resolve the session's principal through the directory.
    pub async fn require_principal(
        &self,
        directory: &dyn PrincipalDirectory,
    ) -> Result<Principal, Error> {
        let id = self.require_principal_id()?;
        directory.resolve(&id).await
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
