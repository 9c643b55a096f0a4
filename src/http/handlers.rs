//! Route handlers.
//!
//! Each handler takes the request's trace context from [`RequestContext`]
//! and opens its own spans under it.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use opentelemetry::{Context, KeyValue};
use serde::{Deserialize, Serialize};

use crate::http::request::RequestContext;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::notes::{Note, NoteRequest};

/// Body of `GET /ping`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub version: String,
    pub message: String,
    pub time: String,
}

pub async fn ping(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
) -> Json<PingResponse> {
    let (cx, span) = state.tracer.start("ping", request.context());
    span.set_attribute(KeyValue::new("service.version", state.version.clone()));
    tracing::info!("pong");

    wait(&state, &cx).await;

    tracing::info!("all completed");
    Json(PingResponse {
        version: state.version.clone(),
        message: "PONG".to_string(),
        time: Utc::now().to_rfc3339(),
    })
}

async fn wait(state: &AppState, parent: &Context) {
    let (cx, _span) = state.tracer.start("wait", parent);
    tokio::time::sleep(state.ping_delay).await;
    tracing::info!(delay_ms = state.ping_delay.as_millis() as u64, "wait completed");

    inner(state, &cx).await;
}

async fn inner(state: &AppState, parent: &Context) {
    let (_cx, _span) = state.tracer.start("inner", parent);
    tokio::time::sleep(Duration::from_micros(500)).await;
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let (cx, span) = state.tracer.start("notes.create", request.context());

    let Json(payload) = payload.map_err(|rejection| {
        let err = ApiError::BadRequest(rejection.body_text());
        span.record_error(&err);
        err
    })?;
    if let Err(reason) = payload.validate() {
        let err = ApiError::BadRequest(reason.to_string());
        span.record_error(&err);
        return Err(err);
    }

    let note = payload.into_note();
    span.set_attribute(KeyValue::new("note.id", note.id.clone()));
    state.store.insert(&cx, note.clone());
    tracing::info!(note_id = %note.id, "note created");

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
) -> Json<BTreeMap<String, Note>> {
    let (cx, _span) = state.tracer.start("notes.all", request.context());
    Json(state.store.all(&cx))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(request): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let (cx, span) = state.tracer.start("notes.single", request.context());
    span.set_attribute(KeyValue::new("note.id", id.clone()));

    match state.store.get(&cx, &id) {
        Some(note) => Ok(Json(note)),
        None => {
            let err = ApiError::NotFound("key not found".to_string());
            span.record_error(&err);
            Err(err)
        }
    }
}
