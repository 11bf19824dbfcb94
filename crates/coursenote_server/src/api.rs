use crate::errors::ApiError;
use crate::model::{
    AnnotationBody, HealthResponse, ListParams, MessageResponse, SavedAnnotation,
};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use coursenote_core::{core_version, ping, Annotation, AnnotationId, AnnotationInput};
use log::debug;

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: ping(),
        version: core_version(),
    })
}

pub(crate) async fn list_annotations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Annotation>>, ApiError> {
    let filter = params.into_filter()?;
    debug!(
        "event=annotation_list module=http owner_id={:?} calendar_day={:?} kind={:?}",
        filter.owner_id, filter.calendar_day, filter.kind
    );
    let annotations = state
        .with_service(move |service| service.list(&filter))
        .await?;
    Ok(Json(annotations))
}

pub(crate) async fn create_annotation(
    State(state): State<AppState>,
    body: Result<Json<AnnotationBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SavedAnnotation>), ApiError> {
    let input = AnnotationInput::from(parse_body(body)?);
    let outcome = state
        .with_service(move |service| service.create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

pub(crate) async fn get_annotation(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Annotation>, ApiError> {
    let id = parse_id(&raw_id)?;
    let annotation = state.with_service(move |service| service.get(id)).await?;
    Ok(Json(annotation))
}

pub(crate) async fn update_annotation(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<AnnotationBody>, JsonRejection>,
) -> Result<Json<SavedAnnotation>, ApiError> {
    let id = parse_id(&raw_id)?;
    let input = AnnotationInput::from(parse_body(body)?);
    let outcome = state
        .with_service(move |service| service.update(id, input))
        .await?;
    Ok(Json(outcome.into()))
}

pub(crate) async fn delete_annotation(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    state.with_service(move |service| service.delete(id)).await?;
    Ok(Json(MessageResponse {
        message: format!("annotation {id} deleted"),
    }))
}

/// Ids that are not UUIDs cannot exist, so they are reported as missing.
fn parse_id(raw: &str) -> Result<AnnotationId, ApiError> {
    AnnotationId::parse_str(raw.trim())
        .map_err(|_| ApiError::not_found(format!("annotation not found: {raw}")))
}

fn parse_body(
    body: Result<Json<AnnotationBody>, JsonRejection>,
) -> Result<AnnotationBody, ApiError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
