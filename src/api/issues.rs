//! Issue endpoints.

use super::blocking;
use super::extract::{Json, Path};
use crate::error::Result;
use crate::model::{
    DescriptionUpdate, HistoryRecord, Issue, IssueFilter, NewIssue, PropertyUpdate, PropertyValue,
};
use crate::service::Services;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

pub async fn all(State(services): State<Services>) -> Result<Json<Vec<Issue>>> {
    blocking(move || services.issues.all()).await.map(Json)
}

pub async fn by_id(State(services): State<Services>, Path(id): Path<i64>) -> Result<Json<Issue>> {
    blocking(move || services.issues.get(id)).await.map(Json)
}

pub async fn by_title(
    State(services): State<Services>,
    Path(title): Path<String>,
) -> Result<Json<Issue>> {
    blocking(move || services.issues.get_by_title(&title))
        .await
        .map(Json)
}

pub async fn by_type(
    State(services): State<Services>,
    Path(value): Path<String>,
) -> Result<Json<Vec<Issue>>> {
    by_property(services, PropertyValue::Type(value.parse()?)).await
}

pub async fn by_severity(
    State(services): State<Services>,
    Path(value): Path<String>,
) -> Result<Json<Vec<Issue>>> {
    by_property(services, PropertyValue::Severity(value.parse()?)).await
}

pub async fn by_status(
    State(services): State<Services>,
    Path(value): Path<String>,
) -> Result<Json<Vec<Issue>>> {
    by_property(services, PropertyValue::Status(value.parse()?)).await
}

pub async fn by_project(
    State(services): State<Services>,
    Path(value): Path<String>,
) -> Result<Json<Vec<Issue>>> {
    by_property(services, PropertyValue::Project(value.parse()?)).await
}

async fn by_property(services: Services, value: PropertyValue) -> Result<Json<Vec<Issue>>> {
    blocking(move || services.issues.by_property(value))
        .await
        .map(Json)
}

pub async fn filter(
    State(services): State<Services>,
    Json(filter): Json<IssueFilter>,
) -> Result<Json<Vec<Issue>>> {
    blocking(move || services.filter.filter(&filter))
        .await
        .map(Json)
}

pub async fn search(
    State(services): State<Services>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Issue>>> {
    blocking(move || services.search.search(params.query.as_deref()))
        .await
        .map(Json)
}

pub async fn create(
    State(services): State<Services>,
    Json(request): Json<NewIssue>,
) -> Result<(StatusCode, Json<Issue>)> {
    let issue = blocking(move || services.issues.create(request)).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn update_properties(
    State(services): State<Services>,
    Json(update): Json<PropertyUpdate>,
) -> Result<Json<Issue>> {
    blocking(move || services.issues.update_properties(&update))
        .await
        .map(Json)
}

pub async fn update_description(
    State(services): State<Services>,
    Json(update): Json<DescriptionUpdate>,
) -> Result<Json<Issue>> {
    blocking(move || services.issues.update_description(&update))
        .await
        .map(Json)
}

/// Responds 200 with an empty body.
pub async fn delete(State(services): State<Services>, Path(id): Path<i64>) -> Result<StatusCode> {
    blocking(move || services.issues.delete(id)).await?;
    Ok(StatusCode::OK)
}

pub async fn history(
    State(services): State<Services>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoryRecord>>> {
    blocking(move || services.history.records_for_issue(id))
        .await
        .map(Json)
}
