//! Router factory for the table-driven CRUD endpoints. One call per
//! registered table produces the full list/get/create/replace/patch/delete
//! surface for that table.

use crate::api::AppState;
use crate::api::middleware::MaybeAuthUser;
use crate::domain::table::TableDescriptor;
use crate::error::{AppError, Result};
use crate::services::crud_service::ListParams;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    page: Option<u32>,
    page_size: Option<u32>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

impl From<ListQuery> for ListParams {
    fn from(q: ListQuery) -> Self {
        Self { page: q.page, page_size: q.page_size, sort_by: q.sort_by, sort_order: q.sort_order }
    }
}

/// Builds the router for one table. The id route shape follows the
/// descriptor: one segment for single-column keys, two for composite keys.
pub fn table_router(desc: &'static TableDescriptor) -> Router<AppState> {
    let root = Router::new().route(
        "/",
        get(move |state, query| list(desc, state, query)).post(move |auth, state, body| create(desc, auth, state, body)),
    );

    match desc.id_columns.len() {
        1 => root.route(
            "/{id}",
            get(move |State(state): State<AppState>, Path(id): Path<String>| async move {
                fetch(desc, &state, vec![id]).await
            })
            .put(
                move |auth: MaybeAuthUser,
                      State(state): State<AppState>,
                      Path(id): Path<String>,
                      Json(body): Json<Value>| async move {
                    replace(desc, &auth, &state, vec![id], &body).await
                },
            )
            .patch(
                move |auth: MaybeAuthUser,
                      State(state): State<AppState>,
                      Path(id): Path<String>,
                      Json(body): Json<Value>| async move {
                    patch(desc, &auth, &state, vec![id], &body).await
                },
            )
            .delete(
                move |auth: MaybeAuthUser, State(state): State<AppState>, Path(id): Path<String>| async move {
                    remove(desc, &auth, &state, vec![id]).await
                },
            ),
        ),
        _ => root.route(
            "/{id_a}/{id_b}",
            get(move |State(state): State<AppState>, Path((a, b)): Path<(String, String)>| async move {
                fetch(desc, &state, vec![a, b]).await
            })
            .put(
                move |auth: MaybeAuthUser,
                      State(state): State<AppState>,
                      Path((a, b)): Path<(String, String)>,
                      Json(body): Json<Value>| async move {
                    replace(desc, &auth, &state, vec![a, b], &body).await
                },
            )
            .patch(
                move |auth: MaybeAuthUser,
                      State(state): State<AppState>,
                      Path((a, b)): Path<(String, String)>,
                      Json(body): Json<Value>| async move {
                    patch(desc, &auth, &state, vec![a, b], &body).await
                },
            )
            .delete(
                move |auth: MaybeAuthUser, State(state): State<AppState>, Path((a, b)): Path<(String, String)>| async move {
                    remove(desc, &auth, &state, vec![a, b]).await
                },
            ),
        ),
    }
}

async fn list(
    desc: &'static TableDescriptor,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>> {
    let envelope = state.crud_service.list(desc, &query.into()).await?;
    Ok(Json(envelope))
}

async fn create(
    desc: &'static TableDescriptor,
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    require_write_auth(desc, &auth)?;
    let row = state.crud_service.create(desc, &body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn fetch(desc: &'static TableDescriptor, state: &AppState, segments: Vec<String>) -> Result<Json<Value>> {
    let row = state.crud_service.get(desc, &segments).await?;
    Ok(Json(row))
}

async fn replace(
    desc: &'static TableDescriptor,
    auth: &MaybeAuthUser,
    state: &AppState,
    segments: Vec<String>,
    body: &Value,
) -> Result<Json<Value>> {
    require_write_auth(desc, auth)?;
    let row = state.crud_service.replace(desc, &segments, body).await?;
    Ok(Json(row))
}

async fn patch(
    desc: &'static TableDescriptor,
    auth: &MaybeAuthUser,
    state: &AppState,
    segments: Vec<String>,
    body: &Value,
) -> Result<Json<Value>> {
    require_write_auth(desc, auth)?;
    let row = state.crud_service.patch(desc, &segments, body).await?;
    Ok(Json(row))
}

async fn remove(
    desc: &'static TableDescriptor,
    auth: &MaybeAuthUser,
    state: &AppState,
    segments: Vec<String>,
) -> Result<StatusCode> {
    require_write_auth(desc, auth)?;
    state.crud_service.remove(desc, &segments).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_write_auth(desc: &TableDescriptor, auth: &MaybeAuthUser) -> Result<()> {
    if desc.write_requires_auth && auth.0.is_none() {
        return Err(AppError::AuthError);
    }
    Ok(())
}
