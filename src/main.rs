use std::{net::SocketAddr, sync::Arc};

use tokio::{signal, sync::mpsc};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use storefront_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let (event_tx, event_rx) = mpsc::channel(api::events::EVENT_CHANNEL_CAPACITY);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    if cfg.payment_secret_key().is_none() {
        warn!("Payment secret key not configured; checkout will be rejected");
    }
    let payments = Arc::new(api::services::commerce::StripePaymentAuthorizer::from_config(
        &cfg,
    )?);

    let state = Arc::new(api::AppState::new(
        Arc::new(db_pool),
        cfg.clone(),
        event_sender,
        payments,
    ));

    let mut app = api::app_router(state);
    if cfg.should_allow_permissive_cors() {
        info!("Using permissive CORS");
        app = app.layer(CorsLayer::permissive());
    }

    let host: std::net::IpAddr = cfg.host.parse()?;
    let addr = SocketAddr::new(host, cfg.port);
    info!("storefront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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
