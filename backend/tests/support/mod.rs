//! Shared wiring for integration tests: the full HTTP surface over the
//! in-memory store, with a bootstrap super admin and the sandbox gateway.

#![allow(
    dead_code,
    reason = "each integration test binary uses a different subset"
)]

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use mockable::DefaultClock;
use serde_json::{Value, json};

use college_backend::Trace;
use college_backend::domain::ports::{
    CatalogueRepository, FixturePaymentGateway, GradeRepository, LedgerRepository,
    NoOpWorkflowMetrics, PrincipalRepository, RegistrationRepository,
};
use college_backend::domain::{
    CatalogueService, GradingScale, GradingService, GradingServicePorts, LedgerService,
    LedgerServicePorts, PrincipalDirectoryService, RegistrationPolicy, RegistrationService,
    RegistrationServicePorts,
};
use college_backend::inbound::http::routes::api_routes;
use college_backend::inbound::http::state::{HttpState, HttpStatePorts};
use college_backend::outbound::memory::InMemoryCollegeStore;

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const PASSWORD: &str = "password123";
pub const SESSION: &str = "2024/2025";
pub const SEMESTER: &str = "first";

/// HTTP state over one shared in-memory store, with a super admin seeded.
pub async fn college_state(policy: RegistrationPolicy) -> web::Data<HttpState> {
    let store = Arc::new(InMemoryCollegeStore::new());
    let clock = Arc::new(DefaultClock);
    let metrics = Arc::new(NoOpWorkflowMetrics);
    let principals: Arc<dyn PrincipalRepository> = store.clone();
    let catalogue: Arc<dyn CatalogueRepository> = store.clone();
    let registrations: Arc<dyn RegistrationRepository> = store.clone();
    let grades: Arc<dyn GradeRepository> = store.clone();
    let ledger_repo: Arc<dyn LedgerRepository> = store.clone();

    let directory = Arc::new(PrincipalDirectoryService::new(store.clone()));
    directory
        .ensure_bootstrap_admin(ADMIN_USERNAME, ADMIN_PASSWORD)
        .await
        .expect("bootstrap admin");

    let ledger = Arc::new(LedgerService::new(
        LedgerServicePorts {
            ledger: ledger_repo,
            principals: principals.clone(),
            gateway: Arc::new(FixturePaymentGateway::default()),
            metrics: metrics.clone(),
        },
        clock.clone(),
    ));
    let registration_service = RegistrationService::new(
        RegistrationServicePorts {
            registrations: registrations.clone(),
            catalogue: catalogue.clone(),
            grades: grades.clone(),
            tuition: ledger.clone(),
            metrics: metrics.clone(),
        },
        clock.clone(),
        policy,
    );
    let grading_service = GradingService::new(
        GradingServicePorts {
            grades,
            catalogue,
            registrations,
            principals,
            metrics,
        },
        clock,
        GradingScale::default(),
    );

    web::Data::new(HttpState::new(HttpStatePorts {
        login: directory.clone(),
        directory,
        catalogue: Arc::new(CatalogueService::new(store.clone(), store)),
        registrations: Arc::new(registration_service),
        grades: Arc::new(grading_service),
        ledger,
    }))
}

/// The production route table behind a test session layer.
pub fn college_app(
    state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();
    App::new()
        .app_data(state)
        .wrap(Trace)
        .service(web::scope("/api/v1").wrap(session).configure(api_routes))
}

/// Issue a request and decode the JSON answer.
pub async fn send<S, B>(app: &S, request: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let response = test::call_service(app, request.to_request()).await;
    let status = response.status();
    let bytes = test::read_body(response).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, body)
}

/// Log in and return the session cookie.
pub async fn login<S, B>(app: &S, username: &str, password: &str) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let response = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "username": username, "password": password }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login as {username}");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Register a principal as the super admin and return its JSON view.
pub async fn register<S, B>(app: &S, admin: &Cookie<'static>, body: Value) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, created) = send(
        app,
        test::TestRequest::post()
            .uri("/api/v1/principals")
            .cookie(admin.clone())
            .set_json(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register principal: {created}");
    created
}

pub fn staff_body(username: &str, role: &str) -> Value {
    json!({
        "username": username,
        "password": PASSWORD,
        "fullName": format!("{username} staff"),
        "email": format!("{username}@college.test"),
        "role": role,
    })
}

pub fn lecturer_body(username: &str, department: &str) -> Value {
    json!({
        "username": username,
        "password": PASSWORD,
        "fullName": format!("Dr {username}"),
        "email": format!("{username}@college.test"),
        "role": "lecturer",
        "department": department,
    })
}

pub fn hod_body(username: &str, department: &str) -> Value {
    let mut body = lecturer_body(username, department);
    body["role"] = json!("hod");
    body
}

pub fn student_body(username: &str, matric: &str) -> Value {
    json!({
        "username": username,
        "password": PASSWORD,
        "fullName": format!("{username} student"),
        "email": format!("{username}@college.test"),
        "role": "student",
        "matricNumber": matric,
        "department": "CSC",
        "level": 100,
    })
}

/// Open an offering taught by `lecturer_id` and return its id.
pub async fn open_offering<S, B>(
    app: &S,
    admin: &Cookie<'static>,
    code: &str,
    lecturer_id: &str,
    capacity: u32,
    prerequisites: &[&str],
) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, offering) = send(
        app,
        test::TestRequest::post()
            .uri("/api/v1/offerings")
            .cookie(admin.clone())
            .set_json(json!({
                "code": code,
                "title": format!("{code} course"),
                "creditUnits": 3,
                "department": "CSC",
                "session": SESSION,
                "semester": SEMESTER,
                "lecturerId": lecturer_id,
                "capacity": capacity,
                "prerequisites": prerequisites,
            })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "open offering: {offering}");
    offering["id"].as_str().expect("offering id").to_owned()
}

/// `POST` with an empty JSON body.
pub fn post(uri: &str, cookie: &Cookie<'static>) -> test::TestRequest {
    test::TestRequest::post().uri(uri).cookie(cookie.clone())
}

/// `GET` with a session cookie.
pub fn get(uri: &str, cookie: &Cookie<'static>) -> test::TestRequest {
    test::TestRequest::get().uri(uri).cookie(cookie.clone())
}
