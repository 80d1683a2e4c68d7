//! Image upload handler.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use tracing::instrument;

use crate::{
    error::{AppError, Result},
    extract::ApiPath,
    middleware::RequireAccount,
    services::image_host::{MAX_UPLOAD_BYTES, UploadFolder, UploadedImage},
    state::AppState,
};

/// Room for multipart framing around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the uploads router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/uploads/{folder}",
        post(upload).layer(DefaultBodyLimit::max(
            MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES,
        )),
    )
}

/// Check the file part's content type and size.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for non-image content or oversized files.
pub fn validate_image(content_type: Option<&str>, size: usize) -> Result<String> {
    let content_type = content_type
        .filter(|ct| ct.starts_with("image/"))
        .ok_or_else(|| AppError::BadRequest("Only image uploads are allowed".to_string()))?;
    if size == 0 {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(format!(
            "File is too large (max {} MB)",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(content_type.to_string())
}

/// Upload one image from multipart field `file` into `folder`.
#[instrument(skip(state, account, multipart), fields(account_id = account.id))]
pub async fn upload(
    RequireAccount(account): RequireAccount,
    State(state): State<AppState>,
    ApiPath(folder): ApiPath<UploadFolder>,
    mut multipart: Multipart,
) -> Result<Json<UploadedImage>> {
    let image_host = state
        .image_host()
        .ok_or_else(|| AppError::Internal("Image uploads are not configured".to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let content_type = validate_image(content_type.as_deref(), bytes.len())?;

        let uploaded = image_host
            .upload(folder, file_name, &content_type, bytes.to_vec())
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;
        return Ok(Json(uploaded));
    }

    Err(AppError::BadRequest("Missing file field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_images_accepted() {
        assert!(validate_image(Some("image/jpeg"), 10).is_ok());
        assert!(validate_image(Some("application/pdf"), 10).is_err());
        assert!(validate_image(None, 10).is_err());
    }

    #[test]
    fn test_size_limits() {
        assert!(validate_image(Some("image/png"), 0).is_err());
        assert!(validate_image(Some("image/png"), MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_image(Some("image/png"), MAX_UPLOAD_BYTES + 1).is_err());
    }
}
