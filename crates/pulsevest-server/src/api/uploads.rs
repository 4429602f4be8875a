//! Object storage handlers.
//!
//! - `POST /api/v1/uploads`          multipart `mediaFile` + `coverImage`,
//!   both forwarded to storage concurrently
//! - `POST /api/v1/upload-signature` sign parameters for a direct client upload

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    Extension, Json,
};
use pulsevest_storage::{ResourceType, StorageClient, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{parse_json, ApiError, ApiResponse, AppState, ErrorKind, ResponseMeta};

const MEDIA_FIELD: &str = "mediaFile";
const COVER_FIELD: &str = "coverImage";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignUploadRequest {
    pub params_to_sign: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUploadResponse {
    pub signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UploadResponse {
    pub media_url: String,
    pub image_url: String,
}

/// One file pulled out of the multipart body.
#[derive(Debug)]
struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn storage_client(state: &AppState, request_id: &str) -> Result<Arc<StorageClient>, ApiError> {
    state.storage.clone().ok_or_else(|| {
        tracing::error!(request_id, "object storage credentials are not configured");
        ApiError::new(ErrorKind::Downstream, "object storage is not configured")
    })
}

fn map_storage_error(request_id: &str, error: &StorageError) -> ApiError {
    tracing::error!(request_id, error = %error, "object storage upload failed");
    ApiError::new(ErrorKind::Downstream, "upload to object storage failed")
}

async fn read_file(field: Field<'_>, default_name: &str) -> Result<UploadedFile, ApiError> {
    let filename = field
        .file_name()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(default_name)
        .to_owned();
    let content_type = field
        .content_type()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_owned();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?;

    Ok(UploadedFile {
        filename,
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// POST /api/v1/uploads
pub(super) async fn upload_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;
    let storage = storage_client(&state, &req_id.0)?;

    let mut media = None;
    let mut cover = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(MEDIA_FIELD) => media = Some(read_file(field, "media").await?),
            Some(COVER_FIELD) => cover = Some(read_file(field, "cover").await?),
            _ => {}
        }
    }

    let (Some(media), Some(cover)) = (media, cover) else {
        return Err(ApiError::validation("Media file or cover image is missing."));
    };
    if media.bytes.is_empty() || cover.bytes.is_empty() {
        return Err(ApiError::validation("Media file or cover image is empty."));
    }

    let media_type = ResourceType::for_media_content_type(&media.content_type);
    let (media_url, image_url) = tokio::try_join!(
        storage.upload(
            media.bytes,
            &media.filename,
            &media.content_type,
            media_type
        ),
        storage.upload(
            cover.bytes,
            &cover.filename,
            &cover.content_type,
            ResourceType::Image
        ),
    )
    .map_err(|e| map_storage_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data: UploadResponse {
            media_url,
            image_url,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/upload-signature
pub(super) async fn sign_upload(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SignUploadRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SignUploadResponse>>, ApiError> {
    let body = parse_json(body)?;
    let params = body
        .params_to_sign
        .ok_or_else(|| ApiError::validation("paramsToSign is required"))?;
    let storage = storage_client(&state, &req_id.0)?;

    Ok(Json(ApiResponse {
        data: SignUploadResponse {
            signature: storage.sign(&params),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
