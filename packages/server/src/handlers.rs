//! HTTP handler functions for the blood report API.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::Path;

use actix_web::error::BlockingError;
use actix_web::{HttpResponse, web};
use blood_report::{DEFAULT_PREVIEW_CHARS, ExtractError, ReportError, persist};
use blood_report_models::{Document, DocumentKind};
use blood_report_server_models::{
    ApiDebug, ApiError, ApiHealth, ApiIndex, ParseTextResponse, UploadQuery, UploadResponse,
};

use crate::AppState;

/// `GET /`
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let endpoints = BTreeMap::from([
        ("upload".to_string(), "/ocr/upload".to_string()),
        ("parse_text".to_string(), "/parse-text".to_string()),
        ("health".to_string(), "/api/health".to_string()),
        ("debug".to_string(), "/debug".to_string()),
    ]);

    HttpResponse::Ok().json(ApiIndex {
        message: "Blood Report Parser API".to_string(),
        endpoints,
        output_directory: state.output_dir.display().to_string(),
        directory_writable: is_writable(&state.output_dir),
    })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /debug`
///
/// Reports where records are written and what is already there.
pub async fn debug(state: web::Data<AppState>) -> HttpResponse {
    let files_in_directory = match std::fs::read_dir(&state.output_dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort_unstable();
            names
        }
        Err(e) => {
            log::warn!("Failed to list {}: {e}", state.output_dir.display());
            Vec::new()
        }
    };

    HttpResponse::Ok().json(ApiDebug {
        output_directory: state.output_dir.display().to_string(),
        directory_writable: is_writable(&state.output_dir),
        pdf_backend: "pdf-extract".to_string(),
        files_in_directory,
    })
}

/// `POST /ocr/upload?filename=<name>`
///
/// The request body is the raw file. A `filename` ending in `.pdf` selects
/// PDF extraction; anything else is decoded as UTF-8 text. The parsed
/// record is saved to the output directory before it is returned.
pub async fn upload(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> HttpResponse {
    let filename = query.into_inner().filename.unwrap_or_default();
    log::debug!("Received file '{filename}' ({} bytes)", body.len());

    if body.is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new("Empty file"));
    }

    let kind = DocumentKind::from_filename(&filename);
    let output_dir = state.output_dir.clone();

    let result = web::block(move || {
        let report = blood_report::process(&Document::new(&body, kind))?;
        let path = persist::save_record(&output_dir, &report.record, &chrono::Local::now())?;
        Ok::<_, ReportError>((report, path))
    })
    .await;

    match result {
        Ok(Ok((report, path))) => HttpResponse::Ok().json(UploadResponse {
            message: "Report processed successfully".to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            filepath: path.display().to_string(),
            extracted_text_length: report.text_length(),
            extracted_text_preview: report.preview(DEFAULT_PREVIEW_CHARS).to_string(),
            data: report.record,
        }),
        Ok(Err(e)) => report_error_response(&e),
        Err(e) => blocking_error_response(&e),
    }
}

/// `POST /parse-text`
///
/// Parses a UTF-8 text body and returns the record without saving it.
pub async fn parse_text(body: web::Bytes) -> HttpResponse {
    let result =
        web::block(move || blood_report::process(&Document::new(&body, DocumentKind::Text)))
            .await;

    match result {
        Ok(Ok(report)) => HttpResponse::Ok().json(ParseTextResponse {
            matched_fields: report.record.matched_count(),
            data: report.record,
        }),
        Ok(Err(e)) => report_error_response(&e),
        Err(e) => blocking_error_response(&e),
    }
}

fn blocking_error_response(e: &BlockingError) -> HttpResponse {
    log::error!("Report processing task failed: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(format!("Processing error: {e}")))
}

fn report_error_response(e: &ReportError) -> HttpResponse {
    match e {
        ReportError::Extract(ExtractError::InvalidEncoding(_)) => {
            log::warn!("Rejected upload: {e}");
            HttpResponse::BadRequest().json(ApiError::new(
                "Unable to decode file. Please upload a valid text or PDF file",
            ))
        }
        ReportError::Extract(ExtractError::MalformedDocument(message)) => {
            log::warn!("Rejected upload: {e}");
            HttpResponse::BadRequest()
                .json(ApiError::new(format!("Error extracting PDF: {message}")))
        }
        ReportError::EmptyText => {
            HttpResponse::BadRequest().json(ApiError::new("No text extracted from file"))
        }
        ReportError::Io(_) | ReportError::Json(_) => {
            log::error!("Failed to save parsed report: {e}");
            HttpResponse::InternalServerError()
                .json(ApiError::new(format!("Could not save JSON file: {e}")))
        }
    }
}

/// Whether this process can create files in `dir`.
///
/// Creates and removes a uniquely named empty file, so ownership and ACLs
/// are accounted for as well as the permission bits.
fn is_writable(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }

    let check = dir.join(format!(".write_check_{}", uuid::Uuid::new_v4()));
    match OpenOptions::new().write(true).create_new(true).open(&check) {
        Ok(file) => {
            drop(file);
            if let Err(e) = std::fs::remove_file(&check) {
                log::warn!("Failed to remove {}: {e}", check.display());
            }
            true
        }
        Err(e) => {
            log::debug!("{} is not writable: {e}", dir.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};

    use super::*;
    use crate::configure;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("blood_report_server_test_{}", uuid::Uuid::new_v4()))
    }

    fn state(dir: &Path) -> web::Data<AppState> {
        web::Data::new(AppState {
            output_dir: dir.to_path_buf(),
        })
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: ApiHealth = test::call_and_read_body_json(&app, req).await;
        assert!(body.healthy);
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn index_lists_endpoints() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body: ApiIndex = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.endpoints["upload"], "/ocr/upload");
        assert_eq!(body.endpoints["parse_text"], "/parse-text");
        assert!(!body.directory_writable, "directory does not exist yet");
    }

    #[actix_web::test]
    async fn upload_text_report_saves_and_returns_record() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/ocr/upload?filename=report.txt")
            .set_payload("Age/Sex 45 Years/Male\nFasting Blood Sugar Elevated\n")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: UploadResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, "Report processed successfully");
        assert_eq!(body.data.age, Some(45));
        assert_eq!(body.data.sex.as_deref(), Some("Male"));
        assert_eq!(body.data.fbs, Some(1));
        assert_eq!(body.extracted_text_length, 51);
        assert!(body.filename.starts_with("blood_report_"));
        assert!(Path::new(&body.filepath).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[actix_web::test]
    async fn debug_lists_saved_reports() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/ocr/upload?filename=report.txt")
            .set_payload("Serum Cholesterol 233")
            .to_request();
        let saved: UploadResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get().uri("/debug").to_request();
        let body: ApiDebug = test::call_and_read_body_json(&app, req).await;
        assert!(body.directory_writable);
        assert_eq!(body.files_in_directory, vec![saved.filename]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[actix_web::test]
    async fn empty_upload_is_rejected() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/ocr/upload?filename=report.txt")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.detail, "Empty file");
        assert!(!dir.exists());
    }

    #[actix_web::test]
    async fn invalid_utf8_upload_is_rejected() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/ocr/upload?filename=report.txt")
            .set_payload(vec![0x41_u8, 0xff, 0xfe])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(
            body.detail,
            "Unable to decode file. Please upload a valid text or PDF file"
        );
        assert!(!dir.exists());
    }

    #[actix_web::test]
    async fn malformed_pdf_upload_is_rejected() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/ocr/upload?filename=Report.PDF")
            .set_payload("not a pdf")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert!(body.detail.starts_with("Error extracting PDF"), "{}", body.detail);
    }

    #[actix_web::test]
    async fn whitespace_upload_has_no_text() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/ocr/upload")
            .set_payload(" \n\n ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.detail, "No text extracted from file");
    }

    #[actix_web::test]
    async fn parse_text_returns_record_without_saving() {
        let dir = scratch_dir();
        let app =
            test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/parse-text")
            .set_payload("Thalassemia (thal) Reversible Defect\nResting ECG Normal")
            .to_request();
        let body: ParseTextResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.matched_fields, 2);
        assert_eq!(body.data.thal, Some(3));
        assert_eq!(body.data.restecg, Some(0));
        assert!(!dir.exists());
    }

    #[actix_web::test]
    async fn parse_text_rejects_invalid_utf8() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/parse-text")
            .set_payload(vec![0xc3_u8, 0x28])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[::core::prelude::v1::test]
    fn writable_check_creates_nothing() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();

        assert!(is_writable(&dir));
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[::core::prelude::v1::test]
    fn missing_or_non_directory_paths_are_not_writable() {
        let dir = scratch_dir();
        assert!(!is_writable(&dir));

        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("not_a_dir.json");
        std::fs::write(&file, "{}").unwrap();
        assert!(!is_writable(&file));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
