//! Backend for Rastreando, a cancer-screening guidance site.
//!
//! # General Infrastructure
//! - The SPA (or `rastreando-admin`) talks to this server only
//! - Identity lives with an external provider, this server just wraps it
//! - Reference content lives in a document store, Redis in deployment
//! - Payments are relayed to Mercado Pago with a fresh idempotency key each
//!
//!
//!
//! # Content Model
//!
//! Content is organised per sex/neoplasia combination (per sex for
//! consultation locations). Each administrator holds a copy, public reads
//! merge all copies, see [`content`].
//!
//! Valid combinations:
//! - homem: pulmão, colorretal, próstata
//! - mulher: pulmão, colorretal, mama, colo de útero
//!
//!
//!
//! # Routes
//!
//! | method   | path                                             |
//! |----------|--------------------------------------------------|
//! | GET      | `/`                                              |
//! | GET      | `/neoplasias?sexo=`                              |
//! | POST     | `/auth/sign-up`, `/auth/sign-in`, `/auth/password-reset` |
//! | GET, PUT | `/sinais-sintomas/{sexo}/{neoplasia}`            |
//! | GET, PUT | `/sinais-alarme-fatores-risco/{sexo}/{neoplasia}`|
//! | GET, PUT | `/indicacoes-rastreio/{sexo}/{neoplasia}`        |
//! | GET, PUT | `/conduta-manejo-resultado/{sexo}/{neoplasia}`   |
//! | GET, PUT | `/marque-consulta/{sexo}`                        |
//! | GET, POST| `/tipos-cancer`                                  |
//! | POST     | `/process_payment`, `/criar-pix`, `/v1/webhook`  |
//!
//! Writes need `Authorization: Bearer <idToken>` from an administrator.
//! Reads take `?scope=own` to return only the caller's copy.
//!
//!
//!
//! # Setup
//!
//! Run with the in-memory store.
//! ```sh
//! RUST_LOG=info cargo run -p rastreando-backend
//! ```
//!
//! Run against Redis.
//! ```sh
//! DOCUMENT_STORE=redis REDIS_URL=redis://127.0.0.1:6379 cargo run -p rastreando-backend
//! ```
//!
//! Secrets `IDENTITY_API_KEY` and `MERCADO_PAGO_ACCESS_TOKEN` are read from the
//! environment or from `/run/secrets/`.
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use catalog::{Locations, Outcomes, RiskFactors, Symptoms};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod payments;
pub mod routes;
pub mod state;

use config::Config;
use routes::*;
use state::AppState;

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = app(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

pub fn app(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse()
                .map_err(|_| warn!("Ignoring invalid origin {origin}"))
                .ok()
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(index_handler))
        .route("/neoplasias", get(neoplasias_handler))
        .route("/auth/sign-up", post(sign_up_handler))
        .route("/auth/sign-in", post(sign_in_handler))
        .route("/auth/password-reset", post(password_reset_handler))
        .route(
            "/sinais-sintomas/{sexo}/{neoplasia}",
            get(get_combination_list::<Symptoms>).put(put_combination_list::<Symptoms>),
        )
        .route(
            "/sinais-alarme-fatores-risco/{sexo}/{neoplasia}",
            get(get_combination_list::<RiskFactors>).put(put_combination_list::<RiskFactors>),
        )
        .route(
            "/conduta-manejo-resultado/{sexo}/{neoplasia}",
            get(get_combination_list::<Outcomes>).put(put_combination_list::<Outcomes>),
        )
        .route(
            "/indicacoes-rastreio/{sexo}/{neoplasia}",
            get(get_indication_handler).put(put_indication_handler),
        )
        .route(
            "/marque-consulta/{sexo}",
            get(get_sex_list::<Locations>).put(put_sex_list::<Locations>),
        )
        .route(
            "/tipos-cancer",
            get(list_cancer_types_handler).post(add_cancer_type_handler),
        )
        .route("/process_payment", post(process_payment_handler))
        .route("/criar-pix", post(create_pix_handler))
        .route("/v1/webhook", post(webhook_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
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
}
