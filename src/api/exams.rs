use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, today_utc};
use crate::db::types::{ExamCategory, ExamStatus};
use crate::repositories;
use crate::repositories::exams::ExamFilter;
use crate::schemas::exam::{
    CategoryCount, ExamCreate, ExamResponse, ExamStatisticsResponse, ExamUpdate,
};
use crate::services::scheduling;

const UPCOMING_EXAMS_LIMIT: i64 = 5;

#[derive(Debug, Deserialize)]
struct ListExamsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    status: Option<ExamStatus>,
    #[serde(default)]
    category: Option<ExamCategory>,
    #[serde(default = "default_sort_by", alias = "sortBy")]
    sort_by: String,
    #[serde(default = "default_sort_order", alias = "sortOrder")]
    sort_order: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(create_exam))
        .route("/statistics", get(statistics))
        .route("/:exam_id", get(get_exam).patch(update_exam).delete(delete_exam))
}

async fn list_exams(
    Query(params): Query<ListExamsQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ExamResponse>>, ApiError> {
    let filter = ExamFilter {
        search: params.search,
        status: params.status,
        category: params.category,
    };

    let items = repositories::exams::list(
        state.db(),
        &filter,
        &params.sort_by,
        &params.sort_order,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    let total_count = repositories::exams::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(ExamResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn create_exam(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    if payload.end_time <= payload.start_time {
        return Err(ApiError::BadRequest("end_time must be after start_time".to_string()));
    }
    if payload.date < today_utc() {
        return Err(ApiError::BadRequest("date must not be in the past".to_string()));
    }

    check_room_availability(
        &state,
        payload.date,
        &payload.room,
        payload.start_time,
        payload.end_time,
        None,
    )
    .await?;

    let now = primitive_now_utc();
    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            subject: &payload.subject,
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            room: &payload.room,
            coefficient: payload.coefficient,
            category: payload.category,
            status: ExamStatus::Scheduled,
            description: payload.description.as_deref(),
            created_by: &user.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(map_exam_write_error)?;

    tracing::info!(
        exam_id = %exam.id,
        room = %exam.room,
        created_by = %user.id,
        action = "exam_create",
        "Exam scheduled"
    );

    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}

async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    Ok(Json(ExamResponse::from_db(exam)))
}

async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let existing = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let Some(existing) = existing else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    // The slot to check is the exam as it would look after the patch.
    let date = payload.date.unwrap_or(existing.date);
    let room = payload.room.clone().unwrap_or_else(|| existing.room.clone());
    let start_time = payload.start_time.unwrap_or(existing.start_time);
    let end_time = payload.end_time.unwrap_or(existing.end_time);

    if end_time <= start_time {
        return Err(ApiError::BadRequest("end_time must be after start_time".to_string()));
    }

    check_room_availability(&state, date, &room, start_time, end_time, Some(&exam_id)).await?;

    repositories::exams::update(
        state.db(),
        &exam_id,
        repositories::exams::UpdateExam {
            subject: payload.subject,
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            room: payload.room,
            coefficient: payload.coefficient,
            category: payload.category,
            status: payload.status,
            description: payload.description,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(map_exam_write_error)?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    tracing::info!(
        exam_id = %updated.id,
        updated_by = %user.id,
        action = "exam_update",
        "Exam updated"
    );

    Ok(Json(ExamResponse::from_db(updated)))
}

async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    if exam.is_none() {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    repositories::exams::delete_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    tracing::info!(
        exam_id = %exam_id,
        deleted_by = %user.id,
        action = "exam_delete",
        "Exam deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn statistics(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamStatisticsResponse>, ApiError> {
    let db = state.db();

    let total_exams = repositories::exams::count_all(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;
    let scheduled_exams = repositories::exams::count_with_status(db, ExamStatus::Scheduled)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count scheduled exams"))?;
    let in_progress_exams = repositories::exams::count_with_status(db, ExamStatus::InProgress)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count in-progress exams"))?;
    let completed_exams = repositories::exams::count_with_status(db, ExamStatus::Completed)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count completed exams"))?;

    let exams_by_category = repositories::exams::counts_by_category(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to group exams by category"))?
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

    let upcoming_exams = repositories::exams::list_upcoming(db, today_utc(), UPCOMING_EXAMS_LIMIT)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list upcoming exams"))?
        .into_iter()
        .map(ExamResponse::from_db)
        .collect();

    Ok(Json(ExamStatisticsResponse {
        total_exams,
        scheduled_exams,
        in_progress_exams,
        completed_exams,
        exams_by_category,
        upcoming_exams,
    }))
}

/// Runs the overlap check against the persisted slots for the target room.
/// The database exclusion constraint remains the backstop for races.
async fn check_room_availability(
    state: &AppState,
    date: time::Date,
    room: &str,
    start_time: time::Time,
    end_time: time::Time,
    exclude_exam_id: Option<&str>,
) -> Result<(), ApiError> {
    let booked = repositories::exams::list_room_slots(state.db(), date, room, exclude_exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load room schedule"))?;

    if let Some(blocking) =
        scheduling::find_room_conflict(date, room, start_time, end_time, &booked)
    {
        return Err(ApiError::RoomConflict {
            detail: format!(
                "Room {room} is already booked by '{}' in this period",
                blocking.subject
            ),
            exam_id: blocking.exam_id.clone(),
        });
    }

    Ok(())
}

fn map_exam_write_error(err: sqlx::Error) -> ApiError {
    if repositories::exams::is_room_exclusion_violation(&err) {
        ApiError::Conflict("Room is already booked for this period".to_string())
    } else {
        ApiError::internal(err, "Failed to write exam")
    }
}

fn default_sort_by() -> String {
    "date".to_string()
}

fn default_sort_order() -> String {
    "desc".to_string()
}
