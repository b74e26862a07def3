use std::sync::Arc;

use axum::extract::Extension;

use crm_users::UserInfo;

use crate::app::dto::{LoginRequest, ProfileRequest, RegisterRequest, TokenResponse};
use crate::app::errors::{ApiError, ValidJson};
use crate::app::response::SuccessEnvelope;
use crate::app::services::AppServices;
use crate::context::AuthenticatedUser;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<SuccessEnvelope<TokenResponse>, ApiError> {
    let registration = body.into_registration()?;
    let token = services.users.register(registration).await?;

    Ok(SuccessEnvelope::created(TokenResponse { token })
        .with_message("User registered successfully"))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<SuccessEnvelope<TokenResponse>, ApiError> {
    let (email, password) = body.into_credentials()?;
    let token = services.users.login(&email, &password).await?;

    Ok(SuccessEnvelope::ok(TokenResponse { token }).with_message("User login successfully"))
}

pub async fn info(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<SuccessEnvelope<UserInfo>, ApiError> {
    let info = services.users.user_info(user.user_id()).await?;

    Ok(SuccessEnvelope::ok(info).with_message("User details retrieved successfully"))
}

pub async fn update_info(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidJson(body): ValidJson<ProfileRequest>,
) -> Result<SuccessEnvelope<UserInfo>, ApiError> {
    let update = body.into_update()?;
    let info = services.users.update_profile(user.user_id(), update).await?;

    Ok(SuccessEnvelope::ok(info).with_message("User details updated successfully"))
}
