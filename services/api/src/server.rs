use crate::cli::ServeArgs;
use crate::infra::{seed_vendors, AppState, Services};
use crate::routes::with_workflow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use leasekeeper::config::AppConfig;
use leasekeeper::error::AppError;
use leasekeeper::notify::{transport_from_config, FlushReport, MailTransport, OutboundQueue};
use leasekeeper::telemetry;
use leasekeeper::workflows::WorkflowError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;
    if config.tokens.signing_secret.is_none() {
        warn!("APP_SIGNING_SECRET is not set; sessions and signup links are disabled");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = Services::build(&config);
    let vendors = seed_vendors(&services.store).map_err(WorkflowError::from)?;
    info!(vendors = vendors.len(), "vendor directory loaded");

    let transport = transport_from_config(&config.mail)?;
    spawn_outbox_flusher(
        Arc::clone(&services.outbox),
        transport,
        Duration::from_secs(config.mail.flush_interval_secs.max(1)),
    );

    let app = with_workflow_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "leasekeeper api ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Drains the outbox on a fixed interval. Delivery is blocking, so each pass runs off the runtime.
fn spawn_outbox_flusher(
    outbox: Arc<OutboundQueue>,
    transport: Arc<dyn MailTransport>,
    every: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if outbox.is_empty() {
                continue;
            }

            let queue = Arc::clone(&outbox);
            let transport = Arc::clone(&transport);
            match tokio::task::spawn_blocking(move || queue.flush(transport.as_ref())).await {
                Ok(report) if report != FlushReport::default() => info!(
                    delivered = report.delivered,
                    requeued = report.requeued,
                    dropped = report.dropped,
                    "outbox flushed"
                ),
                Ok(_) => {}
                Err(err) => error!(error = %err, "outbox flush task failed"),
            }
        }
    });
}
