//! RSVP (attendance) endpoints.

use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use fedevents_common::AppError;
use fedevents_db::entities::attendance::{self, AttendanceStatus};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ok, ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct SetAttendanceInput {
    status: AttendanceStatus,
}

async fn set_attendance(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<SetAttendanceInput>,
) -> Result<ApiResponse<attendance::Model>, AppError> {
    let updated = state
        .attendance_service
        .set_status(&user.id, &event_id, input.status)
        .await?;
    Ok(ApiResponse::ok(updated))
}

async fn clear_attendance(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.attendance_service.clear_status(&user.id, &event_id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events/{event_id}/attendance", put(set_attendance).delete(clear_attendance))
}
