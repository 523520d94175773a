use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::profile;
use crate::services::profiles::CreateProfileRequest;
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub profile_category: String,
    pub verification_status: String,
    pub created_at: DateTime<Utc>,
}

impl From<profile::Model> for ProfileResponse {
    fn from(model: profile::Model) -> Self {
        Self {
            id: model.id,
            display_name: model.display_name,
            email: model.email,
            profile_category: model.profile_category,
            verification_status: model.verification_status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateProfileBody {
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub profile_category: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct VerificationUpdateBody {
    #[validate(length(min = 1))]
    pub status: String,
}

/// Create a purchaser profile (starts in the pending verification state)
#[utoipa::path(
    post,
    path = "/api/v1/profiles",
    request_body = CreateProfileBody,
    responses(
        (status = 201, description = "Profile created", body = ApiResponse<ProfileResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    tag = "Profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    Json(body): Json<CreateProfileBody>,
) -> Result<impl IntoResponse, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .services
        .profiles
        .create_profile(CreateProfileRequest {
            display_name: body.display_name,
            email: body.email,
            profile_category: body.profile_category,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ProfileResponse::from(created))),
    ))
}

/// Get a profile
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<ProfileResponse>),
        (status = 404, description = "Profile not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProfileResponse>>, ServiceError> {
    let profile = state
        .services
        .profiles
        .get_profile(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Profile with ID {} not found", id)))?;

    Ok(Json(ApiResponse::success(ProfileResponse::from(profile))))
}

/// Transition a profile's verification status; a change triggers the
/// verification-status email
#[utoipa::path(
    put,
    path = "/api/v1/profiles/{id}/verification",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = VerificationUpdateBody,
    responses(
        (status = 200, description = "Verification status updated", body = ApiResponse<ProfileResponse>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Profile not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Profiles"
)]
pub async fn update_verification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<VerificationUpdateBody>,
) -> Result<Json<ApiResponse<ProfileResponse>>, ServiceError> {
    body.validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .profiles
        .set_verification_status(id, &body.status)
        .await?;

    Ok(Json(ApiResponse::success(ProfileResponse::from(updated))))
}
