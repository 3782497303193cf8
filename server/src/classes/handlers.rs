//! Class HTTP handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::{AppState, DataResponse, MessageResponse};
use crate::db::Participant;
use crate::permissions::AuthUser;

use super::error::{ClassError, ClassResult};
use super::service::{ClassDetails, ClassSummary};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    #[validate(range(min = 1, max = 255, message = "User limit must be between 1 and 255"))]
    pub user_limit: i16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserQuery {
    pub user_id: i64,
}

/// GET /classes/{id}
pub async fn get_class(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> ClassResult<Json<DataResponse<ClassDetails>>> {
    let class = state.classes.get_class(class_id).await?;
    Ok(Json(DataResponse::new(class)))
}

/// GET /classes/my-classes
pub async fn my_classes(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ClassResult<Json<DataResponse<Vec<ClassSummary>>>> {
    let classes = state.classes.my_classes(&auth_user).await?;
    Ok(Json(DataResponse::new(classes)))
}

/// POST /classes/create
#[tracing::instrument(skip(state, body), fields(account_id = auth_user.id))]
pub async fn create_class(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Result<Json<CreateClassRequest>, JsonRejection>,
) -> ClassResult<(StatusCode, Json<DataResponse<ClassDetails>>)> {
    let Json(body) = body?;
    body.validate()
        .map_err(|e| ClassError::Validation(e.to_string()))?;

    let class = state
        .classes
        .create_class(&auth_user, body.title, body.user_limit)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(class))))
}

/// POST /classes/join/{classId}
pub async fn join_class(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(class_id): Path<i64>,
) -> ClassResult<(StatusCode, Json<DataResponse<Participant>>)> {
    let participant = state.classes.join_class(&auth_user, class_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(participant))))
}

/// DELETE /classes/{classId}/leave
pub async fn leave_class(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(class_id): Path<i64>,
) -> ClassResult<Json<MessageResponse>> {
    state.classes.leave_class(&auth_user, class_id).await?;
    Ok(Json(MessageResponse::new("Successfully left the class.")))
}

/// DELETE /classes/{classId}/remove-user?userId=
pub async fn remove_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(class_id): Path<i64>,
    Query(query): Query<RemoveUserQuery>,
) -> ClassResult<Json<DataResponse<ClassDetails>>> {
    let class = state
        .classes
        .remove_participant(&auth_user, class_id, query.user_id)
        .await?;
    Ok(Json(DataResponse::new(class)))
}
