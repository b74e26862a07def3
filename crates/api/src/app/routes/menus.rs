use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Router,
};

use crm_core::{MenuId, RoleId};
use crm_menus::{Menu, RoleMenu};

use crate::app::dto::{AssignMenuRequest, CreateMenuRequest, UpdateMenuRequest};
use crate::app::errors::{ApiError, ValidJson};
use crate::app::response::SuccessEnvelope;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/create", post(create_menu))
        .route("/role/:role_id", get(menus_for_role))
        .route("/role/:role_id/assign", post(assign_menu))
        .route("/details/:menu_id", get(menu_details))
        .route("/update/:menu_id", post(update_menu))
        .route("/delete/:menu_id", post(delete_menu))
        .method_not_allowed_fallback(super::system::method_not_allowed)
}

pub async fn create_menu(
    Extension(services): Extension<Arc<AppServices>>,
    ValidJson(body): ValidJson<CreateMenuRequest>,
) -> Result<SuccessEnvelope<Menu>, ApiError> {
    let menu = services.menus.create(body.into_menu()?).await?;

    Ok(SuccessEnvelope::created(menu).with_message("Menu created successfully"))
}

pub async fn menus_for_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(role_id): Path<String>,
) -> Result<SuccessEnvelope<Vec<Menu>>, ApiError> {
    let role_id: RoleId = role_id.parse()?;
    let menus = services.menus.menus_for_role(role_id).await?;

    Ok(SuccessEnvelope::ok(menus).with_message("Menus retrieved successfully"))
}

pub async fn menu_details(
    Extension(services): Extension<Arc<AppServices>>,
    Path(menu_id): Path<String>,
) -> Result<SuccessEnvelope<Menu>, ApiError> {
    let menu_id: MenuId = menu_id.parse()?;
    let menu = services.menus.details(menu_id).await?;

    Ok(SuccessEnvelope::ok(menu).with_message("Menu details retrieved successfully"))
}

pub async fn update_menu(
    Extension(services): Extension<Arc<AppServices>>,
    Path(menu_id): Path<String>,
    ValidJson(body): ValidJson<UpdateMenuRequest>,
) -> Result<SuccessEnvelope<Menu>, ApiError> {
    let menu_id: MenuId = menu_id.parse()?;
    let menu = services.menus.update(menu_id, body.into_update()?).await?;

    Ok(SuccessEnvelope::ok(menu).with_message("Menu updated successfully"))
}

pub async fn delete_menu(
    Extension(services): Extension<Arc<AppServices>>,
    Path(menu_id): Path<String>,
) -> Result<SuccessEnvelope<()>, ApiError> {
    let menu_id: MenuId = menu_id.parse()?;
    services.menus.delete(menu_id).await?;

    Ok(SuccessEnvelope::ok(()).with_message("Menu deleted successfully"))
}

pub async fn assign_menu(
    Extension(services): Extension<Arc<AppServices>>,
    Path(role_id): Path<String>,
    ValidJson(body): ValidJson<AssignMenuRequest>,
) -> Result<SuccessEnvelope<RoleMenu>, ApiError> {
    let role_id: RoleId = role_id.parse()?;
    let grant = services
        .menus
        .assign_to_role(role_id, body.menu_id()?)
        .await?;

    Ok(SuccessEnvelope::created(grant).with_message("Menu assigned to role successfully"))
}
