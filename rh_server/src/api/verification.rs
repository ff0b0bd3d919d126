//! Signup-with-proof handlers.
//!
//! The signup form is multipart: text fields plus one `image` part holding the
//! payment screenshot. The text fields are checked before the image is
//! written, and a stored image is removed again if the signup fails.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use referral_hub::UserId;
use referral_hub::storage::validate_image;
use referral_hub::verification::{SignupReceipt, SignupRequest, VerificationStatus};
use serde::Deserialize;
use std::collections::HashMap;

use super::{AppState, error::ApiError, extract::ApiQuery};
use crate::metrics;

/// Name of the multipart part carrying the screenshot
pub const IMAGE_FIELD: &str = "image";

/// Parsed multipart body: text fields by name and the optional image
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<(Vec<u8>, String)>,
}

impl UploadForm {
    /// Read every part of a multipart body
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                form.image = Some((bytes.to_vec(), content_type));
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Validate and store the screenshot, returning its URL
    pub async fn store_image(&mut self, state: &AppState) -> Result<String, ApiError> {
        let (bytes, content_type) = self
            .image
            .take()
            .ok_or_else(|| ApiError::bad_request("Payment screenshot is required"))?;

        validate_image(&bytes, &content_type)?;
        Ok(state.images.store(bytes, &content_type).await?)
    }
}

/// Delete an upload whose submission was refused
pub async fn discard_upload(state: &AppState, image_url: &str) {
    if let Err(err) = state.images.remove(image_url).await {
        tracing::warn!(image_url, error = %err, "Failed to remove orphaned upload");
    }
}

/// Submit a signup with its payment screenshot.
///
/// # Request Body (multipart/form-data)
///
/// `name`, `email`, `phone`, `password`, optional `telegram_username` and
/// `referral_code`, and an `image` part (JPEG, PNG or WebP, at most 5 MiB).
///
/// # Response
///
/// `201 Created` with `{"user_id": 12, "proof_id": 34}`
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid field, bad image
/// - `409 Conflict`: Email already registered
pub async fn submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SignupReceipt>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;

    let mut request = SignupRequest {
        name: form.text("name"),
        email: form.text("email"),
        phone: form.text("phone"),
        telegram_username: form.optional("telegram_username"),
        password: form.text("password"),
        image_url: String::new(),
        referral_code: form.optional("referral_code"),
    };
    state.verification.precheck(&request).await?;

    request.image_url = form.store_image(&state).await?;
    let image_url = request.image_url.clone();

    let receipt = match state.verification.submit(request).await {
        Ok(receipt) => receipt,
        Err(err) => {
            discard_upload(&state, &image_url).await;
            return Err(err.into());
        }
    };
    metrics::signups_total();

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub user_id: UserId,
}

/// Verification status of an account.
///
/// `status` is `null` when the account never submitted a proof.
pub async fn status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<VerificationStatus>, ApiError> {
    Ok(Json(state.verification.check_status(query.user_id).await?))
}
