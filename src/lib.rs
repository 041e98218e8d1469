use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod print;
pub mod state;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

/// Request bodies carry whole documents with inlined images.
const MAX_JSON_BODY: usize = 32 * 1024 * 1024;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::print::handlers::invoke_print,
        crate::print::handlers::send_print,
        crate::print::handlers::print_events
    ),
    components(
        schemas(
            print::models::PrintRequest,
            print::models::PrintResult,
            print::models::PrintMode,
            print::handlers::SendAccepted,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Print Service", description = "Print and save-as-PDF endpoints.")
    )
)]
pub struct ApiDoc;

pub async fn run() -> std::io::Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::from_config(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise the print pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("docprint_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    log::info!(
        "Starting print server at http://{}:{} (assets: {}, exports: {})",
        config.bind_host,
        config.port,
        config.assets_dir.display(),
        config.export_dir.display()
    );

    let assets_dir = config.assets_dir.clone();
    let port = config.port;

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&format!("http://localhost:{port}"))
            .allowed_origin(&format!("http://127.0.0.1:{port}"))
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(app_state.clone())
            .app_data(
                web::JsonConfig::default()
                    .limit(MAX_JSON_BODY)
                    .error_handler(print::handlers::json_error_handler),
            )
            .service(web::scope("/api").configure(print::handlers::config))
            .service(Files::new("/assets", assets_dir.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.bind_host.as_str(), config.port))?
    .run()
    .await
}
