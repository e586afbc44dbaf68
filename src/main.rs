use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use lumiere_api::clients::stripe::StripeClient;
use lumiere_api::clients::twilio::TwilioClient;
use lumiere_api::config::{self, AppConfig};
use lumiere_api::{app, openapi, AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(config::load_config()?);
    config::init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        "starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let gateway = Arc::new(StripeClient::new(config.stripe_secret_key.clone()));
    let sms = Arc::new(TwilioClient::from_config(&config));
    if !config.has_twilio_credentials() {
        warn!("Twilio is not configured; outbound SMS is disabled");
    }

    let state = AppState::new(config.clone(), gateway, sms);

    let router = app(state)
        .merge(openapi::swagger_ui())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer(&config));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if let Some(raw) = &config.cors_allowed_origins {
        let origins: Vec<HeaderValue> = raw
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = trimmed, "ignoring unparseable CORS origin");
                        None
                    }
                }
            })
            .collect();
        if !origins.is_empty() {
            return CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any);
        }
    }

    if config.should_allow_permissive_cors() {
        warn!("permissive CORS enabled");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
