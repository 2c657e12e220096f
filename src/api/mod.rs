//! HTTP service layer.
//!
//! Maps the three external request shapes (remote URL, inline markup,
//! uploaded markup file) onto capture requests, persists rendered images
//! under retrievable temp paths, and owns admission control through a
//! bounded job queue drained by a fixed pool of capture workers.

pub mod config;
pub mod models;
pub mod sweeper;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::api::config::{ApiConfig, QUEUE_SIZE};
use crate::api::models::{
    CaptureSettings, ConvertJob, ConvertMarkupRequest, ConvertResponse, ConvertUrlRequest,
    ErrorResponse, HealthStatus,
};
use crate::renderer::model::{CaptureRequest, ImageFormat, InputSource};
use crate::renderer::Renderer;

const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Validates, enqueues and awaits one conversion.
async fn submit_and_wait(
    request: CaptureRequest,
    config: &ApiConfig,
    job_tx: &mpsc::Sender<ConvertJob>,
) -> HttpResponse {
    if let Err(e) = request.validate() {
        warn!("Rejected invalid conversion request: {}", e);
        return HttpResponse::BadRequest().json(ErrorResponse::new(e.to_string()));
    }

    let (response_tx, response_rx) = oneshot::channel();
    let job = ConvertJob {
        request,
        response_tx,
    };

    debug!("Enqueueing conversion job");
    if job_tx.try_send(job).is_err() {
        warn!("Queue full, rejecting request");
        return HttpResponse::TooManyRequests()
            .json(ErrorResponse::new("Server is busy, try again later."));
    }

    match timeout(config.request_timeout, response_rx).await {
        Ok(Ok(Ok(file_name))) => {
            info!("Conversion completed: {}", file_name);
            HttpResponse::Ok().json(ConvertResponse {
                success: true,
                image_url: format!("/temp/{}", file_name),
            })
        }
        Ok(Ok(Err(message))) => {
            error!("Conversion failed: {}", message);
            HttpResponse::InternalServerError().json(ErrorResponse::new(message))
        }
        Ok(Err(_)) => {
            error!("Worker channel closed unexpectedly");
            HttpResponse::InternalServerError().json(ErrorResponse::new("Worker dropped."))
        }
        Err(_) => {
            error!("Request timed out after {:?}", config.request_timeout);
            HttpResponse::RequestTimeout().json(ErrorResponse::new("Request timed out."))
        }
    }
}

#[instrument(skip_all, fields(url = %body.url))]
async fn convert_url(
    body: web::Json<ConvertUrlRequest>,
    config: web::Data<ApiConfig>,
    job_tx: web::Data<mpsc::Sender<ConvertJob>>,
) -> impl Responder {
    info!("Received /convert/url request");
    let ConvertUrlRequest { url, settings } = body.into_inner();
    let request = settings.to_request(InputSource::RemoteUrl(url));
    submit_and_wait(request, &config, &job_tx).await
}

#[instrument(skip_all)]
async fn convert_html(
    body: web::Json<ConvertMarkupRequest>,
    config: web::Data<ApiConfig>,
    job_tx: web::Data<mpsc::Sender<ConvertJob>>,
) -> impl Responder {
    info!("Received /convert/html request, {} bytes of markup", body.html.len());
    let ConvertMarkupRequest { html, settings } = body.into_inner();
    let request = settings.to_request(InputSource::InlineMarkup(html));
    submit_and_wait(request, &config, &job_tx).await
}

/// Accepts the markup file as the raw request body; capture settings ride
/// in the query string. The upload is persisted to the temp dir for the
/// duration of the conversion and removed afterwards.
#[instrument(skip_all)]
async fn convert_file(
    body: web::Bytes,
    settings: web::Query<CaptureSettings>,
    config: web::Data<ApiConfig>,
    job_tx: web::Data<mpsc::Sender<ConvertJob>>,
) -> impl Responder {
    info!("Received /convert/file request, {} bytes", body.len());
    if body.is_empty() {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("Markup file content is required"));
    }

    let upload_path = config.temp_dir.join(format!("{}.html", Uuid::new_v4()));
    if let Err(e) = tokio::fs::write(&upload_path, &body).await {
        error!("Failed to persist upload: {}", e);
        return HttpResponse::InternalServerError()
            .json(ErrorResponse::new("Failed to persist uploaded file"));
    }

    let request = settings
        .into_inner()
        .to_request(InputSource::LocalFile(upload_path.clone()));
    let response = submit_and_wait(request, &config, &job_tx).await;

    if let Err(e) = tokio::fs::remove_file(&upload_path).await {
        warn!("Failed to remove upload {}: {}", upload_path.display(), e);
    }
    response
}

/// Serves a persisted render artifact. Only uuid-named files with a known
/// image extension resolve, so the handler cannot be steered outside the
/// temp dir.
async fn serve_artifact(
    file_name: web::Path<String>,
    config: web::Data<ApiConfig>,
) -> impl Responder {
    let file_name = file_name.into_inner();
    let Some(format) = parse_artifact_name(&file_name) else {
        return HttpResponse::NotFound().json(ErrorResponse::new("No such artifact"));
    };

    match tokio::fs::read(config.temp_dir.join(&file_name)).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(format.mime_type())
            .body(bytes),
        Err(_) => HttpResponse::NotFound().json(ErrorResponse::new("No such artifact")),
    }
}

fn parse_artifact_name(file_name: &str) -> Option<ImageFormat> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    Uuid::parse_str(stem).ok()?;
    match extension {
        "png" => Some(ImageFormat::Png),
        "jpeg" => Some(ImageFormat::Jpeg),
        "webp" => Some(ImageFormat::Webp),
        _ => None,
    }
}

#[instrument(skip_all)]
async fn health_check(
    renderer: web::Data<Arc<Renderer>>,
    active_captures: web::Data<Arc<AtomicUsize>>,
) -> impl Responder {
    let engine_running = renderer.is_running().await;
    let active = active_captures.load(Ordering::Acquire);
    let status = if engine_running { "healthy" } else { "degraded" };
    debug!("Health check: status={}, active={}", status, active);
    HttpResponse::Ok().json(HealthStatus {
        status: status.to_string(),
        engine_running,
        active_captures: active,
    })
}

/// Renders one job and persists the result under a fresh uuid name.
async fn process_job(
    renderer: &Renderer,
    temp_dir: &Path,
    request: &CaptureRequest,
) -> Result<String> {
    let buffer = renderer.capture(request).await?;
    let file_name = format!("{}.{}", Uuid::new_v4(), request.format.extension());
    let path = temp_dir.join(&file_name);
    tokio::fs::write(&path, &buffer)
        .await
        .with_context(|| format!("failed to persist render to {}", path.display()))?;
    Ok(file_name)
}

/// Starts the API server with the specified configuration.
#[instrument(skip(config))]
pub async fn start_server(host: &str, port: u16, config: ApiConfig) -> Result<()> {
    info!("Starting web-to-image API server on {}:{}", host, port);

    std::fs::create_dir_all(&config.temp_dir)
        .with_context(|| format!("failed to create temp dir {}", config.temp_dir.display()))?;

    let renderer = Arc::new(Renderer::new(config.webdriver_url.as_deref()));
    if let Err(e) = renderer.init().await {
        error!("Failed to initialize rendering engine: {}", e);
        return Err(e.into());
    }

    let sweeper = sweeper::spawn_sweeper(&config.temp_dir, config.retention, config.sweep_interval);

    debug!("Creating job queue with capacity {}", QUEUE_SIZE);
    let (job_tx, job_rx) = mpsc::channel::<ConvertJob>(QUEUE_SIZE);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let active_captures = Arc::new(AtomicUsize::new(0));

    info!("Spawning {} capture workers", config.workers);
    for worker_id in 0..config.workers {
        let renderer = renderer.clone();
        let job_rx = job_rx.clone();
        let active_captures = active_captures.clone();
        let temp_dir = config.temp_dir.clone();
        tokio::spawn(async move {
            debug!("Worker {} started", worker_id);
            loop {
                trace!("Worker {} waiting for job", worker_id);
                let job = { job_rx.lock().await.recv().await };
                let Some(job) = job else {
                    info!("Worker {} shutting down - channel closed", worker_id);
                    break;
                };

                active_captures.fetch_add(1, Ordering::AcqRel);
                let result = process_job(&renderer, &temp_dir, &job.request).await;
                active_captures.fetch_sub(1, Ordering::AcqRel);

                match &result {
                    Ok(file_name) => debug!("Worker {} finished job: {}", worker_id, file_name),
                    Err(e) => warn!("Worker {} job failed: {:#}", worker_id, e),
                }
                if job
                    .response_tx
                    .send(result.map_err(|e| format!("{e:#}")))
                    .is_err()
                {
                    warn!("Worker {} failed to send response - receiver dropped", worker_id);
                }
            }
        });
    }

    let config_data = web::Data::new(config.clone());
    let job_tx_data = web::Data::new(job_tx.clone());
    let renderer_data = web::Data::new(renderer.clone());
    let active_data = web::Data::new(active_captures.clone());

    info!("Starting HTTP server at {}:{}", host, port);
    let server_result = HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES))
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .app_data(config_data.clone())
            .app_data(job_tx_data.clone())
            .app_data(renderer_data.clone())
            .app_data(active_data.clone())
            .service(web::resource("/convert/url").route(web::post().to(convert_url)))
            .service(web::resource("/convert/html").route(web::post().to(convert_html)))
            .service(web::resource("/convert/file").route(web::post().to(convert_file)))
            .service(web::resource("/temp/{file_name}").route(web::get().to(serve_artifact)))
            .service(web::resource("/health").route(web::get().to(health_check)))
    })
    .bind((host, port))
    .map_err(|e| {
        error!("Failed to bind to {}:{}: {}", host, port, e);
        e
    })?
    .run()
    .await;

    info!("Server shutting down, cleaning up resources");
    sweeper.abort();
    renderer.close().await;

    server_result.context("server error")?;
    info!("Server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_must_be_uuid_with_image_extension() {
        let name = format!("{}.png", Uuid::new_v4());
        assert_eq!(parse_artifact_name(&name), Some(ImageFormat::Png));

        let name = format!("{}.webp", Uuid::new_v4());
        assert_eq!(parse_artifact_name(&name), Some(ImageFormat::Webp));

        assert_eq!(parse_artifact_name("../../etc/passwd"), None);
        assert_eq!(parse_artifact_name("not-a-uuid.png"), None);
        let name = format!("{}.html", Uuid::new_v4());
        assert_eq!(parse_artifact_name(&name), None);
    }
}
