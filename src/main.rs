use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use dvf_comps::config::Settings;
use dvf_comps::core::Analyzer;
use dvf_comps::render::DashboardRenderer;
use dvf_comps::routes::{self, comparables::AppState};
use dvf_comps::services::{ComparablesService, GeoplateformeClient, SupabaseClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error body for malformed query strings
#[derive(Debug, serde::Serialize)]
pub struct QueryError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for QueryError {}

impl error::ResponseError for QueryError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    QueryError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        io_error("Configuration error", e)
    })?;

    init_logging(&settings.logging.level, &settings.logging.format);
    info!("Starting DVF comparables service...");

    let geocoder = GeoplateformeClient::new(
        settings.geocoder.endpoint.clone(),
        Duration::from_secs(settings.geocoder.timeout_secs),
    )
    .map_err(|e| {
        error!("Failed to build geocoder client: {}", e);
        io_error("Geocoder client", e)
    })?;

    info!("Geocoder client initialized ({})", settings.geocoder.endpoint);

    let store = SupabaseClient::new(
        settings.datastore.url.clone(),
        settings.datastore.api_key.clone(),
        settings.datastore.table.clone(),
        Duration::from_secs(settings.datastore.timeout_secs),
    )
    .map_err(|e| {
        error!("Failed to build transactions store client: {}", e);
        io_error("Store client", e)
    })?
    .with_section_median(settings.datastore.section_median);

    info!(
        "Transactions store client initialized (table: {}, max rows: {}, section medians: {})",
        settings.datastore.table, settings.datastore.max_rows, settings.datastore.section_median
    );

    let analyzer_config = settings.analyzer_config();
    info!("Analyzer initialized with config: {:?}", analyzer_config);

    let service = ComparablesService::new(
        Arc::new(geocoder),
        Arc::new(store),
        Analyzer::new(analyzer_config),
        settings.datastore.max_rows,
    );

    let renderer = DashboardRenderer::new().map_err(|e| {
        error!("Failed to load dashboard templates: {:?}", e);
        io_error("Template error", e)
    })?;

    let app_state = AppState {
        service: Arc::new(service),
        renderer: Arc::new(renderer),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
