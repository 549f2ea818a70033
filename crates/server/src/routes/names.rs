use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use service::NameInput;
use tracing::{error, warn};

use crate::errors::ApiError;
use crate::routes::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NameCreated {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NameList {
    pub names: Vec<String>,
}

/// 新增名字：先检查数据库连接；缺少/无法解析的请求体与空白名字统一返回 400
pub async fn create_name(
    State(state): State<AppState>,
    payload: Result<Json<NameInput>, JsonRejection>,
) -> Result<(StatusCode, Json<NameCreated>), ApiError> {
    if !state.names.is_connected() {
        error!("cannot add name: database not connected");
        return Err(ApiError::StoreUnavailable);
    }
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            warn!(err = %rejection.body_text(), "unreadable name payload");
            return Err(ApiError::Validation);
        }
    };

    let record = state.names.add(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(NameCreated { message: "Name added successfully".into(), id: record.id }),
    ))
}

/// 列出全部名字
pub async fn list_names(State(state): State<AppState>) -> Result<Json<NameList>, ApiError> {
    let names = state.names.list().await?;
    Ok(Json(NameList { names }))
}
