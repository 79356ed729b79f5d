use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::error::ErrorInternalServerError;
use actix_web::http::header;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use log::{error, info, warn};
use shared::{flag_str, DetectionOutcome, ResultQuery};
use std::path::PathBuf;
use std::sync::Arc;

use crate::locator;
use crate::pipeline;
use crate::state::AppState;
use crate::templates::{Page, ResultView};
use crate::upload::{self, UploadError};

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: PathBuf) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/about").route(web::get().to(about)))
        .service(web::resource("/contact").route(web::get().to(contact)))
        .service(web::resource("/prediction_page").route(web::get().to(prediction_page)))
        .service(web::resource("/results").route(web::get().to(results)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/result/{name}").route(web::get().to(result)))
        .service(Files::new("/static", static_dir));
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn plain_text(message: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(message)
}

async fn index(state: web::Data<AppState>) -> HttpResponse {
    html(state.templates.render(Page::Index))
}

async fn about(state: web::Data<AppState>) -> HttpResponse {
    html(state.templates.render(Page::About))
}

async fn contact(state: web::Data<AppState>) -> HttpResponse {
    html(state.templates.render(Page::Contact))
}

async fn prediction_page(state: web::Data<AppState>) -> HttpResponse {
    html(state.templates.render(Page::Prediction))
}

async fn results(state: web::Data<AppState>) -> HttpResponse {
    html(state.templates.render(Page::Results))
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

fn result_location(outcome: &DetectionOutcome) -> String {
    format!(
        "/result/{}?drowning={}&run={}",
        urlencoding::encode(&outcome.filename),
        flag_str(outcome.drowning),
        urlencoding::encode(&outcome.run_id)
    )
}

async fn predict(
    req: HttpRequest,
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    if !is_multipart(&req) {
        warn!("Prediction request without a multipart body");
        return Ok(plain_text(UploadError::NoFilePart.to_string()));
    }

    let upload = match upload::receive(
        payload,
        &state.upload_dir(),
        state.config.upload.max_bytes,
    )
    .await
    {
        Ok(upload) => upload,
        Err(e) if e.is_rejection() => {
            info!("Rejected upload: {}", e);
            return Ok(plain_text(e.to_string()));
        }
        Err(UploadError::Multipart(e)) => {
            warn!("Malformed multipart body: {}", e);
            return Ok(HttpResponse::BadRequest().body(format!("Malformed upload: {}", e)));
        }
        Err(e) => {
            error!("Failed to store upload: {}", e);
            return Err(ErrorInternalServerError(e));
        }
    };
    info!("Received {:?} upload {}", upload.kind, upload.filename);

    let detector = Arc::clone(&state.detector);
    let root = state.prediction_dir();
    let target = state.config.model.target_label.clone();
    let outcome = web::block(move || {
        pipeline::run_detection(detector.as_ref(), &upload, &root, &target)
    })
    .await?
    .map_err(|e| {
        error!("Detection failed: {}", e);
        ErrorInternalServerError(e)
    })?;
    info!(
        "Run {} for {}: drowning={} across {} frame(s)",
        outcome.run_id, outcome.filename, outcome.drowning, outcome.frames
    );

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, result_location(&outcome)))
        .finish())
}

async fn result(
    path: web::Path<String>,
    query: web::Query<ResultQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let name = path.into_inner();
    let query = query.into_inner();
    let drowning = query.drowning_flag();
    let root = state.prediction_dir();

    let located = web::block(move || match query.run.as_deref() {
        Some(run) => locator::locate_run(&root, run),
        None => locator::locate_latest(&root),
    })
    .await?;

    match located {
        Ok(found) => {
            info!(
                "Serving result {}/{} for {} (drowning: {})",
                found.run, found.file, name, drowning
            );
            let view = ResultView::new(found.url(), &found.file, drowning);
            Ok(html(state.templates.render_results(Some(&view))))
        }
        Err(e) if e.is_missing() => {
            warn!("No result for {}: {}", name, e);
            Ok(plain_text(e.to_string()))
        }
        Err(e) => {
            error!("Failed to locate result for {}: {}", name, e);
            Err(ErrorInternalServerError(e))
        }
    }
}
