use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use marketplace_api::{app_router, auth, config, db, events, handlers, AppState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let pool = db::connect(&cfg).await?;
    if cfg.auto_migrate {
        db::run_migrations(&pool).await.map_err(|e| {
            error!("Migrations failed: {}", e);
            e
        })?;
    }
    let pool = Arc::new(pool);

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = events::EventSender::new(event_tx);
    tokio::spawn(events::process_events(event_rx));

    let auth_service = Arc::new(auth::AuthService::new(&cfg));
    let services = handlers::AppServices::new(
        pool.clone(),
        Arc::new(event_sender.clone()),
        auth_service.clone(),
        &cfg,
    );

    let state = AppState {
        db: pool,
        config: cfg.clone(),
        event_sender,
        auth: auth_service,
        services,
    };

    let cors = cors_layer(&cfg)?;

    // Request ids are stamped outside the trace layer
    let app = app_router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!("marketplace-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// CORS from config: an explicit origin list when one is given, the
/// permissive layer when the environment allows it, otherwise a
/// startup error.
fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    if let Some(origins) = parsed_origins(cfg) {
        return Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    if cfg.allows_any_origin() {
        if cfg.is_development() {
            info!("CORS open to any origin (development default)");
        } else {
            info!("CORS open to any origin (APP__CORS_ALLOW_ANY_ORIGIN set)");
        }
        return Ok(CorsLayer::permissive());
    }

    error!("CORS is not configured; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
    Err("missing CORS configuration".into())
}

fn parsed_origins(cfg: &config::AppConfig) -> Option<Vec<HeaderValue>> {
    let raw = cfg.cors_allowed_origins.as_deref()?;
    let origins: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    if origins.is_empty() {
        None
    } else {
        Some(origins)
    }
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

    info!("Shutdown signal received; draining connections");
}
