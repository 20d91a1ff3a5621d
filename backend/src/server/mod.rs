//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod state_builders;

pub use config::{AppSettings, ServerConfig};

#[cfg(feature = "metrics")]
use metrics::MetricsLayer;
use state_builders::build_http_state;

use std::sync::Arc;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::time::Duration;
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use college_backend::Trace;
#[cfg(debug_assertions)]
use college_backend::doc::ApiDoc;
use college_backend::domain::ports::{NoOpWorkflowMetrics, WorkflowMetrics};
use college_backend::inbound::http::health::{HealthState, live, ready};
use college_backend::inbound::http::routes::api_routes;
use college_backend::inbound::http::session_config::BuildMode;
use college_backend::inbound::http::state::HttpState;
#[cfg(feature = "metrics")]
use college_backend::outbound::metrics::PrometheusWorkflowMetrics;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

const SESSION_COOKIE: &str = "session";
const SESSION_TTL_HOURS: i64 = 2;
#[cfg(debug_assertions)]
const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn session_layer(
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_path("/".to_owned())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(Duration::hours(SESSION_TTL_HOURS)),
        )
        .build()
}

/// Health checks and docs sit outside the session layer; everything under
/// `/api/v1` needs it.
fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(
            web::scope("/api/v1")
                .wrap(session_layer(key, cookie_secure, same_site))
                .configure(api_routes),
        )
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url(OPENAPI_PATH, ApiDoc::openapi()));

    app
}

#[cfg(feature = "metrics")]
fn workflow_metrics(config: &ServerConfig) -> std::io::Result<Arc<dyn WorkflowMetrics>> {
    match &config.prometheus {
        Some(prom) => {
            let metrics = PrometheusWorkflowMetrics::new(&prom.registry).map_err(|e| {
                std::io::Error::other(format!("workflow metrics registration failed: {e}"))
            })?;
            Ok(Arc::new(metrics))
        }
        None => Ok(Arc::new(NoOpWorkflowMetrics)),
    }
}

#[cfg(not(feature = "metrics"))]
fn workflow_metrics(_config: &ServerConfig) -> std::io::Result<Arc<dyn WorkflowMetrics>> {
    Ok(Arc::new(NoOpWorkflowMetrics))
}

/// Construct an Actix HTTP server from settings and a validated
/// [`ServerConfig`].
///
/// # Errors
/// Returns [`std::io::Error`] when wiring the adapters, binding the socket,
/// or registering metrics fails.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    settings: &AppSettings,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let metrics = workflow_metrics(&config)?;
    let http_state = build_http_state(settings, metrics, BuildMode::from_debug_assertions())
        .await
        .map_err(std::io::Error::other)?;
    let server_health_state = health_state.clone();
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;

    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from(prometheus);

    let server = HttpServer::new(move || {
        let app = build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        });

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
