//! Spreadsheet upload.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
};
use rentroll_core::{spreadsheet, ImportReport, Importer};
use tracing::{info, instrument, warn};

use super::{ok, ApiResponse};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Multipart field carrying the workbook.
pub const FILE_FIELD: &str = "file";

/// Imports every worksheet of an uploaded `.xlsx`/`.xls` workbook.
#[instrument(name = "import_workbook", skip(state, multipart))]
pub async fn import_workbook(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<ImportReport>> {
    let mut multipart = multipart.map_err(|e| ApiError::Validation(e.body_text()))?;

    let (file_name, bytes) = loop {
        let field = multipart.next_field().await.map_err(multipart_error)?.ok_or_else(|| {
            ApiError::Validation(format!("Multipart field '{FILE_FIELD}' is required"))
        })?;

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if !spreadsheet::is_supported_file_name(&file_name) {
            warn!(file_name = %file_name, "Rejected upload with unsupported extension");
            return Err(ApiError::Validation(
                "Only Excel files (.xlsx, .xls) are accepted".to_string(),
            ));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        break (file_name, bytes);
    };

    if bytes.len() > state.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "Upload of {} bytes exceeds the {} byte limit",
            bytes.len(),
            state.max_upload_bytes
        )));
    }

    info!(file_name = %file_name, size_bytes = bytes.len(), "Reading workbook");

    let sheets = tokio::task::spawn_blocking(move || spreadsheet::read_workbook(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("workbook reader task failed: {e}")))??;

    let report = Importer::new(state.storage.clone(), state.clock.clone()).import(sheets).await;

    info!(
        file_name = %file_name,
        imported = report.total_imported,
        errors = report.error_count,
        "Workbook import finished"
    );

    Ok(ok(report))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::Validation(err.body_text())
    }
}
