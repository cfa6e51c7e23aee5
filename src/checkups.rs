// ABOUTME: HTTP endpoints for requesting, completing, listing and viewing checkups
// ABOUTME: Applies role checks, parses multipart updates, and delegates to the lifecycle service

use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, header},
};
use uuid::Uuid;

use crate::auth_helpers::CurrentUser;
use crate::entities::user::Role;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::lifecycle::Completion;
use crate::types::*;
use crate::uploads;
use crate::AppState;

pub async fn request_checkup(
    State(state): State<AppState>,
    current: CurrentUser,
    body: Result<ApiJson<RequestCheckupRequest>>,
) -> Result<(StatusCode, Json<CheckupResponse>)> {
    current.require_role(Role::Patient)?;
    let ApiJson(req) = body?;

    let checkup = state.checkups.request(current.id(), req.dentist_id).await?;
    Ok((StatusCode::CREATED, Json(CheckupResponse::bare(checkup))))
}

pub async fn patient_checkups(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<CheckupResponse>>> {
    current.require_role(Role::Patient)?;
    Ok(Json(state.checkups.list_for_patient(current.id()).await?))
}

pub async fn dentist_checkups(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<CheckupResponse>>> {
    current.require_role(Role::Dentist)?;
    Ok(Json(state.checkups.list_for_dentist(current.id()).await?))
}

pub async fn get_checkup(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(checkup_id): ApiPath<Uuid>,
) -> Result<Json<CheckupResponse>> {
    Ok(Json(state.checkups.get(checkup_id, current.id()).await?))
}

/// Parses an `If-Match` version, accepting both `3` and `"3"`.
fn expected_version(headers: &HeaderMap) -> Result<Option<i32>> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .map(|v| v.trim().trim_start_matches("W/").trim_matches('"'))
        .and_then(|v| v.parse::<i32>().ok())
        .map(Some)
        .ok_or_else(|| AppError::Validation("If-Match must carry a checkup version".to_string()))
}

pub async fn update_checkup(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(checkup_id): ApiPath<Uuid>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<CheckupResponse>> {
    current.require_role(Role::Dentist)?;
    let expected_version = expected_version(&headers)?;

    // Reject callers before accepting any upload bytes
    state
        .checkups
        .assigned_checkup(checkup_id, current.id())
        .await?;

    let form = uploads::read_update_form(&mut multipart).await?;
    if form.images.is_empty() {
        return Err(AppError::Validation(
            "Please upload at least one image".to_string(),
        ));
    }

    let images = state.uploads.save_all(form.images, form.descriptions).await?;
    let completion = Completion {
        notes: form.notes,
        images: images.clone(),
        expected_version,
    };

    match state.checkups.complete(checkup_id, current.id(), completion).await {
        Ok(updated) => Ok(Json(CheckupResponse::bare(updated))),
        Err(err) => {
            state.uploads.remove_all(&images.0).await;
            Err(err)
        }
    }
}
