use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryNotifier, InMemoryRequestStore};
use crate::routes::with_request_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hostel_core::config::AppConfig;
use hostel_core::error::AppError;
use hostel_core::telemetry;
use hostel_core::workflows::residency::requests::RequestService;
use hostel_core::workflows::residency::ConflictChecker;
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

    let store = Arc::new(InMemoryRequestStore::default());
    store.seed_directory();
    let notifier = Arc::new(InMemoryNotifier::default());
    let request_service = Arc::new(
        RequestService::new(store, notifier)
            .with_checker(ConflictChecker::new(config.checker.grace_minutes)),
    );

    let app = with_request_routes(request_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hostel operations service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
