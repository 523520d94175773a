use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use boxoffice_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Provider clients; both secrets were validated at startup
    let payments = Arc::new(api::payments::PaymentClient::new(
        cfg.payment_secret_key.clone(),
        cfg.payment_api_base.clone(),
    )?);
    let email = Arc::new(api::services::email::EmailService::from_config(&cfg.email)?);

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        Arc::new(event_sender.clone()),
        payments,
        email,
        &cfg,
    );

    // Compose shared app state
    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        event_sender,
        services,
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".into());
    };

    // Build router: root + health + full v1 API + Swagger UI
    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "boxoffice-api up" }))
        .route("/health", get(api::handlers::health::health_check))
        .nest("/api/v1", api::api_v1_routes())
        .merge(api::openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(TraceLayer::new_for_http())
        // Apply compression and the request time budget
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            cfg.request_timeout_secs,
        )))
        // Apply CORS
        .layer(cors_layer)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            api::middleware::request_id_middleware,
        ))
        .with_state(app_state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("boxoffice-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
