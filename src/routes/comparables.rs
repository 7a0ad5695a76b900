use actix_web::{http::header::ContentType, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::models::{ComparablesQuery, ComparablesResponse, ErrorResponse, HealthResponse};
use crate::render::DashboardRenderer;
use crate::services::{ComparablesService, LookupError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ComparablesService>,
    pub renderer: Arc<DashboardRenderer>,
}

/// Configure the comparables routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/dvf", web::get().to(comparables));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn lookup_error_response(err: &LookupError) -> HttpResponse {
    use actix_web::http::StatusCode;

    match err {
        LookupError::AddressNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "Adresse introuvable", err.to_string())
        }
        LookupError::NoComparables(_) => {
            error_response(StatusCode::NOT_FOUND, "Aucune vente", err.to_string())
        }
        LookupError::Geocoder(_) => {
            error_response(StatusCode::BAD_GATEWAY, "Erreur géocodage", err.to_string())
        }
        LookupError::Store(_) => {
            error_response(StatusCode::BAD_GATEWAY, "Erreur Supabase", err.to_string())
        }
    }
}

/// Comparable sales around an address
///
/// GET /api/v1/dvf?adresse=...&type_bien=Maison&surface=80&prix=350000&pieces=4&rayon=500&format=html
async fn comparables(
    state: web::Data<AppState>,
    query: web::Query<ComparablesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        tracing::info!("Validation failed for comparables request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        "[{}] Comparables for {:?} (type: {:?}, surface: {:?}, format: {:?})",
        request_id,
        query.adresse,
        query.type_bien,
        query.surface,
        query.format
    );

    let lookup = match state.service.lookup(&query).await {
        Ok(lookup) => lookup,
        Err(e) => {
            match &e {
                LookupError::Geocoder(_) | LookupError::Store(_) => {
                    tracing::error!("[{}] Lookup failed: {}", request_id, e)
                }
                _ => tracing::info!("[{}] Lookup returned nothing: {}", request_id, e),
            }
            return lookup_error_response(&e);
        }
    };

    if query.wants_html() {
        return match state.renderer.render(&lookup) {
            Ok(html) => HttpResponse::Ok()
                .content_type(ContentType::html())
                .body(html),
            Err(e) => {
                tracing::error!("[{}] Template error: {:?}", request_id, e);
                error_response(
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Erreur Serveur",
                    format!("Template error: {}", e),
                )
            }
        };
    }

    let analysis = lookup.analysis;
    let response = ComparablesResponse {
        request_id,
        adresse_normalisee: lookup.address.label,
        code_postal: lookup.address.postcode,
        latitude: lookup.address.location.latitude(),
        longitude: lookup.address.location.longitude(),
        stats: analysis.summary,
        estimation: analysis.estimate,
        analyse: analysis.comparison,
        transactions: analysis.comparables,
        total_candidates: analysis.total_candidates,
    };

    HttpResponse::Ok().json(response)
}
