use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::handler::SignalRequestHandler;
use crate::metrics;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn prometheus_metrics() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::render())
}

/// Adapts a plain HTTP request onto the platform envelope and back.
pub async fn analyze_chart(
    req: HttpRequest,
    body: web::Bytes,
    handler: web::Data<SignalRequestHandler>,
) -> HttpResponse {
    let body = if body.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&body).into_owned())
    };

    let envelope = RequestEnvelope::new(req.method().as_str(), body);
    into_http_response(handler.handle(envelope).await)
}

pub fn into_http_response(envelope: ResponseEnvelope) -> HttpResponse {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = HttpResponse::build(status);
    for (name, value) in &envelope.headers {
        builder.insert_header((name.as_str(), value.as_str()));
    }
    builder.body(envelope.body)
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)))
        .service(web::resource("/metrics").route(web::get().to(prometheus_metrics)))
        .service(web::resource(["/", "/analyze-chart"]).route(web::route().to(analyze_chart)));
}
