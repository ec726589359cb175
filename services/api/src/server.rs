use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryEnrollmentRepository};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use enrollment_wizard::config::AppConfig;
use enrollment_wizard::error::AppError;
use enrollment_wizard::telemetry;
use enrollment_wizard::workflows::enrollment::EnrollmentIntake;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryEnrollmentRepository::default());
    let intake = Arc::new(EnrollmentIntake::new(
        repository,
        config.wizard.form_validity_days,
    ));

    let app = with_enrollment_routes(intake, config.wizard.validation_policy())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        min_emergency_contacts = config.wizard.min_emergency_contacts,
        "enrollment wizard service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
