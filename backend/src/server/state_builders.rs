//! Composition of the domain services over the configured adapters.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use college_backend::domain::ports::{
    CatalogueRepository, FixturePaymentGateway, GradeRepository, LedgerRepository,
    PaymentGateway, PrincipalRepository, RegistrationRepository, WorkflowMetrics,
};
use college_backend::domain::{
    CatalogueService, GradingScale, GradingService, GradingServicePorts, LedgerService,
    LedgerServicePorts, PrincipalDirectoryService, RegistrationPolicy, RegistrationService,
    RegistrationServicePorts,
};
use college_backend::inbound::http::session_config::BuildMode;
use college_backend::inbound::http::state::{HttpState, HttpStatePorts};
use college_backend::outbound::memory::InMemoryCollegeStore;
use college_backend::outbound::paystack::PaystackGateway;
use college_backend::outbound::persistence::{
    DbPool, DieselCatalogueRepository, DieselGradeRepository, DieselLedgerRepository,
    DieselPrincipalRepository, DieselRegistrationRepository, PoolConfig, run_pending_migrations,
};

use super::config::{AppSettings, SettingsError};

/// Failures while wiring the application.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("database setup failed: {0}")]
    Database(#[from] college_backend::outbound::persistence::PoolError),
    #[error("payment gateway client failed: {0}")]
    Gateway(#[from] reqwest::Error),
    #[error("bootstrap admin failed: {0}")]
    Bootstrap(#[from] college_backend::domain::Error),
    #[error("release builds need COLLEGE_PAYSTACK_SECRET; the sandbox gateway is debug-only")]
    SandboxGatewayInRelease,
}

/// Repository adapters handed to the services.
///
/// The directory and catalogue services are generic over their
/// repositories, so those two stay concrete.
struct Repositories<P, C> {
    principals: Arc<P>,
    catalogue: Arc<C>,
    registrations: Arc<dyn RegistrationRepository>,
    grades: Arc<dyn GradeRepository>,
    ledger: Arc<dyn LedgerRepository>,
}

/// Non-repository collaborators shared by the services.
struct Collaborators {
    gateway: Arc<dyn PaymentGateway>,
    metrics: Arc<dyn WorkflowMetrics>,
    clock: Arc<dyn Clock>,
    policy: RegistrationPolicy,
    scale: GradingScale,
    callback_url: Option<String>,
}

fn compose<P, C>(repos: Repositories<P, C>, with: Collaborators) -> HttpState
where
    P: PrincipalRepository + 'static,
    C: CatalogueRepository + 'static,
{
    let principal_port: Arc<dyn PrincipalRepository> = repos.principals.clone();
    let catalogue_port: Arc<dyn CatalogueRepository> = repos.catalogue.clone();

    let ledger = Arc::new(
        LedgerService::new(
            LedgerServicePorts {
                ledger: repos.ledger,
                principals: principal_port.clone(),
                gateway: with.gateway,
                metrics: with.metrics.clone(),
            },
            with.clock.clone(),
        )
        .with_callback_url(with.callback_url),
    );
    let registrations = RegistrationService::new(
        RegistrationServicePorts {
            registrations: repos.registrations.clone(),
            catalogue: catalogue_port.clone(),
            grades: repos.grades.clone(),
            tuition: ledger.clone(),
            metrics: with.metrics.clone(),
        },
        with.clock.clone(),
        with.policy,
    );
    let grades = GradingService::new(
        GradingServicePorts {
            grades: repos.grades,
            catalogue: catalogue_port,
            registrations: repos.registrations,
            principals: principal_port,
            metrics: with.metrics,
        },
        with.clock,
        with.scale,
    );
    let directory = Arc::new(PrincipalDirectoryService::new(repos.principals.clone()));

    HttpState::new(HttpStatePorts {
        login: directory.clone(),
        directory,
        catalogue: Arc::new(CatalogueService::new(repos.catalogue, repos.principals)),
        registrations: Arc::new(registrations),
        grades: Arc::new(grades),
        ledger,
    })
}

fn build_gateway(
    settings: &AppSettings,
    mode: BuildMode,
) -> Result<Arc<dyn PaymentGateway>, BuildError> {
    match settings.paystack()? {
        Some(paystack) => {
            info!(base = %paystack.base, "using Paystack gateway");
            Ok(Arc::new(PaystackGateway::new(
                paystack.base,
                paystack.secret,
                paystack.timeout,
            )?))
        }
        None if mode == BuildMode::Release => Err(BuildError::SandboxGatewayInRelease),
        None => {
            warn!("no Paystack secret configured; using the sandbox gateway");
            Ok(Arc::new(FixturePaymentGateway::default()))
        }
    }
}

async fn ensure_bootstrap_admin<P>(
    settings: &AppSettings,
    principals: Arc<P>,
) -> Result<(), BuildError>
where
    P: PrincipalRepository + 'static,
{
    let Some(admin) = settings.bootstrap_admin() else {
        return Ok(());
    };
    let directory = PrincipalDirectoryService::new(principals);
    if directory
        .ensure_bootstrap_admin(&admin.username, admin.password.as_str())
        .await?
        .is_none()
    {
        info!(username = %admin.username, "bootstrap admin already present");
    }
    Ok(())
}

/// Build the shared HTTP state from settings.
///
/// With a database URL the Diesel repositories are used after applying
/// pending migrations; otherwise every port is served by one in-memory
/// store. Release builds refuse to start on the sandbox payment gateway.
pub(super) async fn build_http_state(
    settings: &AppSettings,
    metrics: Arc<dyn WorkflowMetrics>,
    mode: BuildMode,
) -> Result<web::Data<HttpState>, BuildError> {
    let with = Collaborators {
        gateway: build_gateway(settings, mode)?,
        metrics,
        clock: Arc::new(DefaultClock),
        policy: settings.registration_policy()?,
        scale: settings.grading_scale()?,
        callback_url: settings.paystack_callback_url.clone(),
    };

    let state = match settings.database_url.as_deref() {
        Some(url) => {
            run_pending_migrations(url).await?;
            let pool =
                DbPool::new(PoolConfig::new(url).with_max_size(settings.pool_size())).await?;
            let principals = Arc::new(DieselPrincipalRepository::new(pool.clone()));
            ensure_bootstrap_admin(settings, principals.clone()).await?;
            compose(
                Repositories {
                    principals,
                    catalogue: Arc::new(DieselCatalogueRepository::new(pool.clone())),
                    registrations: Arc::new(DieselRegistrationRepository::new(pool.clone())),
                    grades: Arc::new(DieselGradeRepository::new(pool.clone())),
                    ledger: Arc::new(DieselLedgerRepository::new(pool)),
                },
                with,
            )
        }
        None => {
            warn!("no database URL configured; state lives in memory only");
            let store = Arc::new(InMemoryCollegeStore::new());
            ensure_bootstrap_admin(settings, store.clone()).await?;
            compose(
                Repositories {
                    principals: store.clone(),
                    catalogue: store.clone(),
                    registrations: store.clone(),
                    grades: store.clone(),
                    ledger: store,
                },
                with,
            )
        }
    };
    Ok(web::Data::new(state))
}
