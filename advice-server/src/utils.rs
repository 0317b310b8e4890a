use actix_cors::Cors;
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::application::advice_ledger::AdviceLedger;
use crate::application::auth_service::AuthService;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::handlers;
use crate::presentation::middleware::RequestTracing;

pub async fn start_rest_server(
    config: AppConfig,
    auth_service: AuthService,
    advice_ledger: AdviceLedger,
) -> anyhow::Result<()> {
    let bind_address = (config.host.clone(), config.port);
    info!(host = %bind_address.0, port = bind_address.1, "HTTP server starting");

    let auth_data = web::Data::new(auth_service);
    let ledger_data = web::Data::new(advice_ledger);

    HttpServer::new(move || {
        let cors = build_cors(&config);
        let keys = auth_data.keys().clone();

        App::new()
            .wrap(RequestTracing)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "no-referrer"))
                    .add(("Permissions-Policy", "geolocation=()"))
                    .add(("Cross-Origin-Opener-Policy", "same-origin")),
            )
            .wrap(cors)
            .app_data(auth_data.clone())
            .app_data(ledger_data.clone())
            .configure(|cfg| configure_api(cfg, keys))
    })
    .bind(bind_address)?
    .run()
    .await
    .map_err(anyhow::Error::new)?;

    info!("HTTP server stopped");
    Ok(())
}

/// Mounts everything under `/api`. Bearer checks are attached per resource
/// so unknown paths still fall through to 404.
pub fn configure_api(cfg: &mut web::ServiceConfig, keys: JwtKeys) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .service(handlers::auth::scope())
            .service(handlers::advice::scope(keys.clone()))
            .service(handlers::user::scope(keys)),
    );
}

fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .max_age(3600);

    if config.cors_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        cors = cors.supports_credentials();
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}
