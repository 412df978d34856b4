//! achievement endpoints
use super::AppState;
use super::error::ApiError;
use crate::achievement::{AchievementDraft, ContentId, TimeStamp};
use crate::auth::Principal;
use crate::page::{ListQuery, Page, PageParams};
use crate::reference::{AchievementReference, AchievementStatus};
use crate::service::AchievementView;
use crate::stats::AchievementStatistics;
use crate::store::ReferenceFilter;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// success envelope for single-record operations
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: T,
}

fn envelope<T>(message: &'static str, data: T) -> Json<Envelope<T>> {
    Json(Envelope { message, data })
}

/// workflow state of an achievement after a transition
#[derive(Debug, Serialize)]
pub struct ReferenceSummary {
    pub achievement_id: ContentId,
    pub reference_id: String,
    pub status: AchievementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<TimeStamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<TimeStamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_note: Option<String>,
}

impl From<AchievementReference> for ReferenceSummary {
    fn from(reference: AchievementReference) -> Self {
        Self {
            achievement_id: reference.content_id,
            reference_id: reference.id,
            status: reference.status,
            submitted_at: reference.submitted_at,
            verified_at: reference.verified_at,
            verified_by: reference.verified_by,
            rejection_note: reference.rejection_note,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default, alias = "rejectionNote")]
    pub rejection_note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFilterParams {
    pub status: Option<String>,
    pub student_id: Option<String>,
}

impl ListFilterParams {
    fn into_filter(self) -> Result<ReferenceFilter, ApiError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(status) => Some(
                status
                    .parse::<AchievementStatus>()
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?,
            ),
        };
        Ok(ReferenceFilter {
            status,
            student_id: self.student_id.filter(|id| !id.trim().is_empty()),
        })
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text())))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `POST /api/v1/achievements`
pub async fn create_achievement(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<AchievementDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<AchievementView>>), ApiError> {
    let draft = json_body(payload)?;
    let service = state.service.clone();
    let view = state
        .blocking(move || service.create_achievement(&principal, draft))
        .await?;
    Ok((StatusCode::CREATED, envelope("Achievement saved as draft", view)))
}

/// `PUT /api/v1/achievements/{id}`
pub async fn update_achievement(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Result<Json<AchievementDraft>, JsonRejection>,
) -> Result<Json<Envelope<AchievementView>>, ApiError> {
    let draft = json_body(payload)?;
    let service = state.service.clone();
    let view = state
        .blocking(move || service.update_draft(&principal, &id, draft))
        .await?;
    Ok(envelope("Achievement draft updated", view))
}

/// `GET /api/v1/achievements/{id}`
pub async fn achievement_detail(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Envelope<AchievementView>>, ApiError> {
    let service = state.service.clone();
    let view = state
        .blocking(move || service.achievement_detail(&principal, &id))
        .await?;
    Ok(envelope("Achievement found", view))
}

/// `POST /api/v1/achievements/{id}/submit`
pub async fn submit_achievement(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ReferenceSummary>>, ApiError> {
    let service = state.service.clone();
    let reference = state
        .blocking(move || service.submit_for_verification(&principal, &id))
        .await?;
    Ok(envelope("Achievement submitted for verification", reference.into()))
}

/// `DELETE /api/v1/achievements/{id}`
pub async fn delete_achievement(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ReferenceSummary>>, ApiError> {
    let service = state.service.clone();
    let reference = state
        .blocking(move || service.delete_achievement(&principal, &id))
        .await?;
    Ok(envelope("Achievement deleted", reference.into()))
}

/// `POST /api/v1/achievements/{id}/verify`
pub async fn verify_achievement(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ReferenceSummary>>, ApiError> {
    let service = state.service.clone();
    let reference = state
        .blocking(move || service.verify_achievement(&principal, &id))
        .await?;
    Ok(envelope("Achievement verified", reference.into()))
}

/// `POST /api/v1/achievements/{id}/reject`
pub async fn reject_achievement(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> Result<Json<Envelope<ReferenceSummary>>, ApiError> {
    let request = json_body(payload)?;
    let service = state.service.clone();
    let reference = state
        .blocking(move || service.reject_achievement(&principal, &id, &request.rejection_note))
        .await?;
    Ok(envelope("Achievement rejected", reference.into()))
}

/// `GET /api/v1/achievements/my`
pub async fn list_own(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<AchievementView>>, ApiError> {
    let query = ListQuery::resolve(&params, state.page_limits);
    let service = state.service.clone();
    let page = state
        .blocking(move || service.list_own_achievements(&principal, &query))
        .await?;
    Ok(Json(page))
}

/// `GET /api/v1/achievements/advisee`
pub async fn list_advisee(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<AchievementView>>, ApiError> {
    let query = ListQuery::resolve(&params, state.page_limits);
    let service = state.service.clone();
    let page = state
        .blocking(move || service.list_advisee_achievements(&principal, &query))
        .await?;
    Ok(Json(page))
}

/// `GET /api/v1/achievements`
///
/// accepts `status` and `student_id` filters next to the paging parameters
pub async fn list_all(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
    Query(filters): Query<ListFilterParams>,
) -> Result<Json<Page<AchievementView>>, ApiError> {
    let filter = filters.into_filter()?;
    let query = ListQuery::resolve(&params, state.page_limits);
    let service = state.service.clone();
    let page = state
        .blocking(move || service.list_all_achievements(&principal, &filter, &query))
        .await?;
    Ok(Json(page))
}

/// `GET /api/v1/achievements/stats/my`
pub async fn stats_my(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Envelope<AchievementStatistics>>, ApiError> {
    let stats = state.stats.clone();
    let result = state.blocking(move || stats.my_statistics(&principal)).await?;
    Ok(envelope("Achievement statistics", result))
}

/// `GET /api/v1/achievements/stats/advisee`
pub async fn stats_advisee(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Envelope<AchievementStatistics>>, ApiError> {
    let stats = state.stats.clone();
    let result = state
        .blocking(move || stats.advisee_statistics(&principal))
        .await?;
    Ok(envelope("Advisee achievement statistics", result))
}

/// `GET /api/v1/achievements/stats/all`
pub async fn stats_all(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Envelope<AchievementStatistics>>, ApiError> {
    let stats = state.stats.clone();
    let result = state.blocking(move || stats.all_statistics(&principal)).await?;
    Ok(envelope("Achievement statistics", result))
}
