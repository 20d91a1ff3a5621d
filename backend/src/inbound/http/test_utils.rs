//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};

use crate::domain::ports::{
    MockGradeWorkflow, MockLedgerWorkflow, MockLoginService, MockOfferingCatalogue,
    MockPrincipalDirectory, MockRegistrationWorkflow,
};
use crate::domain::{Principal, PrincipalId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::validation::{FieldName, parse_id};

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Mocked driving ports; unexpected calls panic.
#[derive(Default)]
pub(crate) struct MockPorts {
    pub login: MockLoginService,
    pub directory: MockPrincipalDirectory,
    pub catalogue: MockOfferingCatalogue,
    pub registrations: MockRegistrationWorkflow,
    pub grades: MockGradeWorkflow,
    pub ledger: MockLedgerWorkflow,
}

impl MockPorts {
    /// Resolve every session to `principal`.
    pub(crate) fn acting_as(mut self, principal: &Principal) -> Self {
        let principal = principal.clone();
        self.directory
            .expect_resolve()
            .returning(move |_| Ok(principal.clone()));
        self
    }

    pub(crate) fn into_state(self) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(HttpStatePorts {
            login: Arc::new(self.login),
            directory: Arc::new(self.directory),
            catalogue: Arc::new(self.catalogue),
            registrations: Arc::new(self.registrations),
            grades: Arc::new(self.grades),
            ledger: Arc::new(self.ledger),
        }))
    }
}

const SIGN_IN_PATH: &str = "/test/sign-in";

async fn sign_in(session: SessionContext, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id: PrincipalId = parse_id(&path.into_inner(), FieldName::new("principalId"))?;
    session.persist_principal(&id)?;
    Ok(HttpResponse::Ok().finish())
}

/// App with a session layer, a sign-in shortcut, and `routes` under `/api/v1`.
pub(crate) fn test_app<F>(
    state: web::Data<HttpState>,
    routes: F,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    F: FnOnce(&mut web::ServiceConfig),
{
    App::new()
        .app_data(state)
        .wrap(test_session_middleware())
        .route(&format!("{SIGN_IN_PATH}/{{id}}"), web::get().to(sign_in))
        .service(web::scope("/api/v1").configure(routes))
}

/// Session cookie for `principal`, minted through the sign-in shortcut.
pub(crate) async fn session_cookie<S, B>(app: &S, principal: &Principal) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let request = test::TestRequest::get()
        .uri(&format!("{SIGN_IN_PATH}/{}", principal.id()))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "sign-in shortcut failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Read a JSON body.
pub(crate) async fn json_body<B>(response: ServiceResponse<B>) -> serde_json::Value
where
    B: MessageBody,
{
    let bytes = test::read_body(response).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}
