//! Pressroom: on-demand document generation service.
//!
//! Accepts HTTP generation requests, renders declarative TOML templates into
//! single-page PDF artifacts, and serves those artifacts back until a
//! retention sweep evicts them. The pipeline is deliberately small:
//!
//! 1. **Intake** ([`api`]): validate the request and resolve its template
//! 2. **Render** ([`render`]): stamp parameters, derived dates, and static
//!    text onto a page, deterministically
//! 3. **Store** ([`store`]): persist the bytes with atomic promotion, index
//!    them, and evict them once retention lapses
//!
//! Every request yields a fresh artifact; nothing is deduplicated or cached.
//! [`Application`] wires the three together with configuration, telemetry,
//! and graceful shutdown.

pub mod api;
pub mod config;
pub mod errors;
pub mod openapi;
pub mod render;
pub mod store;
pub mod telemetry;
pub mod types;

use crate::api::handlers::{documents, health};
use crate::openapi::ApiDoc;
use crate::render::TemplateRegistry;
use crate::store::{ArtifactStore, sweeper::EvictionSweeper};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, warn};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

pub use types::{ArtifactId, RequestId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<ArtifactStore>,
    pub templates: Arc<TemplateRegistry>,
    pub config: Config,
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = if config.cors_allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors_allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new().allow_origin(origin).allow_methods(tower_http::cors::Any))
}

/// Build the application router with all endpoints and middleware.
///
/// - Document API under `/api/v1`
/// - Health and service info at `/healthz` and `/`
/// - Interactive API docs at `/docs`
/// - Optional Prometheus metrics at `/internal/metrics`
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let document_routes = Router::new()
        .route(
            "/documents",
            post(documents::generate_document).get(documents::list_documents),
        )
        .route("/documents/sample", get(documents::generate_sample))
        .route(
            "/documents/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/documents/{id}/content", get(documents::download_document))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(health::health))
        .route("/", get(health::home))
        .with_state(state.clone())
        .nest("/api/v1", document_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/docs"));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Container for background tasks and their lifecycle management.
///
/// Holds the eviction sweeper's join handle and the shutdown token that
/// stops it. Dropping the struct cancels the token via the drop guard, so
/// tasks never outlive the application even on an error path.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that it can be disarmed when shutdown is driven explicitly
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shut down all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

fn setup_background_services(
    store: Arc<ArtifactStore>,
    config: &Config,
    shutdown_token: tokio_util::sync::CancellationToken,
) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    let sweeper = EvictionSweeper::new(
        store,
        config.storage.retention,
        config.storage.eviction_grace,
        config.storage.sweep_interval,
    );
    background_tasks.push(tokio::spawn(sweeper.run(shutdown_token.clone())));

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] opens the artifact store, loads the
///    template registry, and starts the eviction sweeper
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
/// 3. **Shutdown**: on signal, stops accepting connections and waits for
///    background tasks to finish
pub struct Application {
    router: Router,
    config: Config,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting pressroom with configuration: {:#?}", config);

        let store = Arc::new(ArtifactStore::open(&config.storage.root).await?);
        let templates = Arc::new(TemplateRegistry::load_dir(&config.templates_dir)?);
        if templates.is_empty() {
            warn!(
                "No templates loaded from {:?}; generation requests will fail until templates are provided",
                config.templates_dir
            );
        } else {
            info!("Loaded {} template(s): {:?}", templates.len(), templates.names());
        }

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(store.clone(), &config, shutdown_token);

        let state = AppState::builder()
            .store(store)
            .templates(templates)
            .config(config.clone())
            .build();
        let router = build_router(&state)?;

        Ok(Self {
            router,
            config,
            bg_services,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Pressroom listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down background services...");
        self.bg_services.shutdown().await;

        Ok(())
    }
}
