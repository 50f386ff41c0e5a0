//! HTTP API for the generation pipeline
//!
//! All bodies are JSON with camelCase keys. Errors come back as
//! `{ "error": <kind>, "message": <text> }` with a status derived from the
//! pipeline error.

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, web};
use serde::{Deserialize, Serialize};
use testgen_core::test_gen::TestCase;
use testgen_core::{GenerationOptions, GenerationReport, Orchestrator, PipelineError, TicketKey};
use tracing::{error, info, warn};

#[cfg(test)]
mod tests;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub ticket_key: String,
    #[serde(default = "default_true")]
    pub include_regression: bool,
    #[serde(default)]
    pub include_security: bool,
    #[serde(default)]
    pub include_performance: bool,
    /// Defaults per endpoint: false to generate, true to regenerate
    #[serde(default)]
    pub force: Option<bool>,
}

impl GenerateRequest {
    fn options(&self, default_force: bool) -> GenerationOptions {
        GenerationOptions {
            include_regression: self.include_regression,
            include_security: self.include_security,
            include_performance: self.include_performance,
            force: self.force.unwrap_or(default_force),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ResponseWarning {
    LowYield { produced: usize, minimum: usize },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub test_cases: Vec<TestCase>,
    pub count: usize,
    pub ticket_key: TicketKey,
    pub cache_hit: bool,
    pub discarded: usize,
    pub flagged_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ResponseWarning>,
}

impl From<GenerationReport> for GenerateResponse {
    fn from(report: GenerationReport) -> Self {
        Self {
            warning: report
                .low_yield
                .map(|w| ResponseWarning::LowYield { produced: w.produced, minimum: w.minimum }),
            test_cases: report.test_cases,
            count: report.count,
            ticket_key: report.ticket_key,
            cache_hit: report.cache_hit,
            discarded: report.discarded,
            flagged_steps: report.flagged_steps,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateResponse {
    pub ticket_key: TicketKey,
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::TicketNotFound { .. } => StatusCode::NOT_FOUND,
        PipelineError::NoValidTestCases { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Parse(_) | PipelineError::Provider(_) => StatusCode::BAD_GATEWAY,
        PipelineError::ConfigMissing { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::TicketSource(_) | PipelineError::Storage(_) | PipelineError::Cancelled => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: &PipelineError) -> HttpResponse {
    let status = status_for(err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request failed: {}", err);
    }
    HttpResponse::build(status).json(ErrorBody { error: err.kind(), message: err.to_string() })
}

async fn run_generation(orchestrator: &Orchestrator, req: GenerateRequest, default_force: bool) -> HttpResponse {
    let key = TicketKey::new(&req.ticket_key);
    let options = req.options(default_force);
    info!("Generation requested for {} (force={})", key, options.force);

    match orchestrator.generate_tests(&key, options).await {
        Ok(report) => HttpResponse::Ok().json(GenerateResponse::from(report)),
        Err(e) => error_response(&e),
    }
}

#[post("/generate-tests")]
async fn generate_tests(data: web::Data<Orchestrator>, req: web::Json<GenerateRequest>) -> impl Responder {
    run_generation(&data, req.into_inner(), false).await
}

#[post("/regenerate-tests")]
async fn regenerate_tests(data: web::Data<Orchestrator>, req: web::Json<GenerateRequest>) -> impl Responder {
    run_generation(&data, req.into_inner(), true).await
}

/// Hook for ticket updated or transitioned events
#[post("/tickets/{key}/invalidate")]
async fn invalidate(data: web::Data<Orchestrator>, path: web::Path<String>) -> impl Responder {
    let key = TicketKey::new(path.into_inner());
    match data.invalidate(&key).await {
        Ok(removed) => HttpResponse::Ok().json(InvalidateResponse { ticket_key: key, removed }),
        Err(e) => error_response(&e),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok", "version": testgen_core::VERSION}))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(generate_tests).service(regenerate_tests).service(invalidate);
}

pub async fn run(orchestrator: Orchestrator, host: &str, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(orchestrator);

    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind((host, port))?
        .run();

    info!("Listening on http://{}:{}", host, port);
    server.await
}
