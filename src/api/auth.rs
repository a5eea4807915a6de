use crate::api::AppState;
use crate::error::Result;
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<Value>> {
    let session = state.auth_service.login(&req.email, &req.password).await?;
    Ok(Json(session))
}
