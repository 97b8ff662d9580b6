use std::path::PathBuf;

use actix_files::{Files, NamedFile};
use actix_multipart::Multipart;
use actix_web::error::BlockingError;
use actix_web::{web, HttpResponse, ResponseError};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use shared::{ErrorResponse, ExpiryResponse, WebcamRequest};

use crate::error::PipelineError;
use crate::expiry::DateExtractor;
use crate::freshness::FreshnessAnalyzer;
use crate::imaging::ImageSource;
use crate::ocr::OcrHandler;
use crate::storage::upload_store::{FRESHNESS_EXTENSIONS, OCR_EXTENSIONS};
use crate::storage::{allowed_file, UploadError, UploadStore};

/// Process-wide services handed to every worker.
#[derive(Clone)]
pub struct AppContext {
    pub analyzer: web::Data<FreshnessAnalyzer>,
    pub ocr: web::Data<OcrHandler>,
    pub dates: web::Data<DateExtractor>,
    pub uploads: web::Data<UploadStore>,
    pub static_dir: PathBuf,
}

#[derive(Clone)]
struct StaticDir(PathBuf);

pub fn configure_routes(cfg: &mut web::ServiceConfig, ctx: &AppContext) {
    // Base64 inflates webcam frames by a third, plus JSON framing.
    let json_limit = ctx.uploads.max_bytes() / 3 * 4 + 1024;

    cfg.app_data(ctx.analyzer.clone())
        .app_data(ctx.ocr.clone())
        .app_data(ctx.dates.clone())
        .app_data(ctx.uploads.clone())
        .app_data(web::Data::new(StaticDir(ctx.static_dir.clone())))
        .app_data(web::PayloadConfig::new(json_limit))
        .service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/predict_webcam").route(web::post().to(predict_webcam)))
        .service(web::resource("/upload").route(web::post().to(upload_image)))
        .service(Files::new("/static", &ctx.static_dir));
}

async fn index(static_dir: web::Data<StaticDir>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(static_dir.0.join("index.html")).await?)
}

async fn predict(
    analyzer: web::Data<FreshnessAnalyzer>,
    uploads: web::Data<UploadStore>,
    payload: Multipart,
) -> HttpResponse {
    let file_path = match receive_upload(payload, &uploads, FRESHNESS_EXTENSIONS).await {
        Ok(path) => path,
        Err(e) => return upload_error_response(e),
    };

    let analyzer = analyzer.into_inner();
    match web::block(move || analyzer.predict(ImageSource::Path(file_path))).await {
        Ok(Ok(prediction)) => {
            info!(
                "Predicted {} ({:.1}%)",
                prediction.label, prediction.confidence
            );
            HttpResponse::Ok().json(prediction)
        }
        Ok(Err(e)) => {
            error!("Freshness prediction failed: {}", e);
            e.error_response()
        }
        Err(e) => blocking_error_response(e),
    }
}

async fn predict_webcam(
    analyzer: web::Data<FreshnessAnalyzer>,
    body: Result<web::Bytes, actix_web::Error>,
) -> HttpResponse {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Rejected webcam frame: {}", e);
            return HttpResponse::build(e.as_response_error().status_code())
                .json(ErrorResponse::new(e.to_string()));
        }
    };

    let image = match serde_json::from_slice::<WebcamRequest>(&body) {
        Ok(WebcamRequest { image: Some(image) }) => image,
        _ => {
            return HttpResponse::BadRequest()
                .json(ErrorResponse::new("No image data provided"));
        }
    };

    let analyzer = analyzer.into_inner();
    match web::block(move || analyzer.predict_base64(&image)).await {
        Ok(Ok(prediction)) => HttpResponse::Ok().json(prediction),
        Ok(Err(e)) => {
            error!("Webcam prediction failed: {}", e);
            e.error_response()
        }
        Err(e) => blocking_error_response(e),
    }
}

async fn upload_image(
    ocr: web::Data<OcrHandler>,
    dates: web::Data<DateExtractor>,
    uploads: web::Data<UploadStore>,
    payload: Multipart,
) -> HttpResponse {
    let file_path = match receive_upload(payload, &uploads, OCR_EXTENSIONS).await {
        Ok(path) => path,
        Err(e) => return upload_error_response(e),
    };

    let ocr = ocr.into_inner();
    let extracted_text =
        match web::block(move || ocr.extract_text(ImageSource::Path(file_path))).await {
            Ok(text) => text,
            Err(e) => return blocking_error_response(e),
        };

    let expiry_date = dates.extract(&extracted_text).await;
    HttpResponse::Ok().json(ExpiryResponse {
        extracted_text,
        expiry_date,
    })
}

struct Upload {
    filename: String,
    data: Vec<u8>,
}

/// Pulls the `file` field out of the form, checks it and stores it.
async fn receive_upload(
    payload: Multipart,
    uploads: &UploadStore,
    allowed: &[&str],
) -> Result<PathBuf, UploadError> {
    let upload = read_file_field(payload, allowed, uploads.max_bytes()).await?;
    uploads.save(&upload.data, &upload.filename)
}

/// The name is checked from the part headers before any of the body is buffered.
async fn read_file_field(
    mut payload: Multipart,
    allowed: &[&str],
    max_bytes: usize,
) -> Result<Upload, UploadError> {
    let mut upload = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let is_file_field = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .is_some_and(|name| name == "file");

        if !is_file_field || upload.is_some() {
            while let Some(Ok(_)) = field.next().await {}
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if filename.is_empty() {
            return Err(UploadError::NoSelectedFile);
        }
        if !allowed_file(&filename, allowed) {
            return Err(UploadError::InvalidFileType);
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::Malformed(e.to_string()))?;
            if data.len() + chunk.len() > max_bytes {
                return Err(UploadError::FileTooLarge);
            }
            data.extend_from_slice(&chunk);
        }
        upload = Some(Upload { filename, data });
    }

    upload.ok_or(UploadError::NoFilePart)
}

fn upload_error_response(e: UploadError) -> HttpResponse {
    match e {
        UploadError::Io(_) => {
            error!("{}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
        }
        _ => {
            warn!("Rejected upload: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse::new(e.to_string()))
        }
    }
}

fn blocking_error_response(e: BlockingError) -> HttpResponse {
    error!("Blocking task failed: {}", e);
    PipelineError::Inference(e.to_string()).error_response()
}
