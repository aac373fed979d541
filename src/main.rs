//! Tomato Scraper API Server
//!
//! Main entry point for the review-site scraper REST API service.

use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tomato_scraper::config::Config;
use tomato_scraper::logging;
use tomato_scraper::routes::{configure_routes, ApiDoc, AppState};
use tomato_scraper::scraper::{Fetch, HttpFetcher};

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// The blocking HTTP client owns an internal runtime, so it is created and
// finally dropped here, outside the actix system.
fn main() -> std::io::Result<()> {
    let config = Config::from_env();
    logging::init(&config.debug_log_path());

    let fetcher: Arc<dyn Fetch> = match HttpFetcher::new(&config.base_url) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            error!("{}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
        }
    };

    let bind_address = format!("{}:{}", config.host, config.port);
    let app_state = web::Data::new(AppState::new(config.clone(), fetcher.clone()));
    if let Err(e) = app_state.client.cache().ensure_dirs() {
        error!("Cache directory unavailable, continuing without it: {}", e);
    }

    info!(
        "Starting Tomato Scraper API server on {} (cache at {})",
        bind_address,
        config.cache_dir.display()
    );

    let openapi = ApiDoc::openapi();

    let result = actix_rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .route("/health", web::get().to(health_check))
                .service(
                    SwaggerUi::new("/swagger-ui/{_:.*}")
                        .url("/api-docs/openapi.json", openapi.clone())
                )
                .configure(configure_routes)
        })
        .bind(&bind_address)?
        .run()
        .await
    });

    drop(fetcher);
    result
}
