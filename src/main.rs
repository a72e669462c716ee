// src/main.rs
use anyhow::Result;
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use routing_server::{
    config::{self, MetricsConfig},
    dispatch::{HttpDispatcher, ReqwestDispatcher},
    health::{HealthMonitor, HealthRegistry, HealthScheduler},
    metrics::MetricsRegistry,
    proxy::Router,
    selector::create_selector,
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("routing_server=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;
    let backends = config.routing.servers.clone();

    // Initialize metrics
    let metrics_registry = MetricsRegistry::new()?;
    let metrics = config.metrics.enabled.then(|| metrics_registry.collector());
    if config.metrics.enabled {
        start_metrics_server(&config.metrics, metrics_registry)?;
    }

    let dispatcher: Arc<dyn HttpDispatcher> = Arc::new(ReqwestDispatcher::new(&config.dispatch)?);
    let registry = Arc::new(HealthRegistry::new());

    // Start health checks
    let monitor = Arc::new(HealthMonitor::new(
        &config.health_check,
        registry.clone(),
        dispatcher.clone(),
        metrics.clone(),
    ));
    let scheduler = Arc::new(HealthScheduler::new(monitor, config.health_check.interval()));
    let health_task = tokio::spawn(scheduler.clone().start(backends.clone()));

    // Create router and request handler
    let selector = create_selector(config.routing.selector, registry);
    let router = Arc::new(Router::new(selector, dispatcher, metrics));
    let handler = RequestHandler::new(router, backends.clone());

    let addr = config.server.listen_addr;
    info!(
        backends = backends.len(),
        selector = ?config.routing.selector,
        "Starting routing server on {}",
        addr
    );

    let served = ServerBuilder::new(addr)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await;

    scheduler.shutdown();
    if let Err(e) = health_task.await {
        error!("Health scheduler task failed: {}", e);
    }
    info!("Routing server stopped");

    served
}

fn start_metrics_server(config: &MetricsConfig, registry: MetricsRegistry) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(config.path.clone());
    let service_path = metrics_path.clone();

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move { Ok::<_, Infallible>(metrics_response(&req, &path, &registry)) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

fn metrics_response(req: &Request<Body>, path: &str, registry: &MetricsRegistry) -> Response<Body> {
    if req.uri().path() != path {
        let mut response = Response::new(Body::from("Not Found"));
        *response.status_mut() = StatusCode::NOT_FOUND;
        return response;
    }

    match registry.gather() {
        Ok(metrics) => {
            let mut response = Response::new(Body::from(metrics));
            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(e) => {
            error!("Failed to gather metrics: {:#}", e);
            let mut response = Response::new(Body::from("Failed to gather metrics"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
