use axum::{
    extract::{Json, State, rejection::JsonRejection},
    response::IntoResponse,
};

use crate::{AppState, error::DirectoryError};

use super::model::{AddUserRequest, INVALID_BODY};

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, DirectoryError> {
    let listing = state.directory.list_users().await?;
    Ok(Json(listing))
}

#[axum::debug_handler]
pub async fn add_user(
    State(state): State<AppState>,
    payload: Result<Json<AddUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DirectoryError> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => request_from_rejection(rejection)?,
    };

    let name = req.name.unwrap_or_default();
    let user = state.directory.add_user(&name).await?;
    Ok(Json(user))
}

// 没有 JSON 请求体或 name 类型不对时按空对象处理，交给目录服务返回 name required；
// 无法解析的请求体同样以 JSON 错误返回
fn request_from_rejection(rejection: JsonRejection) -> Result<AddUserRequest, DirectoryError> {
    match rejection {
        JsonRejection::MissingJsonContentType(_) | JsonRejection::JsonDataError(_) => {
            Ok(AddUserRequest::default())
        }
        rejection => {
            tracing::debug!(error = %rejection, "Rejected add user body");
            Err(DirectoryError::Validation(INVALID_BODY))
        }
    }
}
