use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::extract::AppJson,
    error::{AppError, AppResult},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn subscribe(
    State(state): State<AppState>,
    AppJson(req): AppJson<SubscribeRequest>,
) -> AppResult<Json<MessageResponse>> {
    let token = req
        .token
        .ok_or_else(|| AppError::InvalidInput("Token is required.".to_string()))?;

    state.registry.register(&token).await?;

    Ok(Json(MessageResponse {
        message: "Token saved successfully".to_string(),
    }))
}
