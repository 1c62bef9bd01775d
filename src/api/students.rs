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
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::repositories;
use crate::repositories::students::StudentFilter;
use crate::schemas::result::{StudentResultEntry, StudentResultsResponse};
use crate::schemas::student::{StudentCreate, StudentResponse, StudentUpdate};
use crate::services::grading::{self, ScoreInput};

#[derive(Debug, Deserialize)]
struct ListStudentsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    search: Option<String>,
    #[serde(default, alias = "className")]
    class_name: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/:student_id", get(get_student).patch(update_student).delete(delete_student))
        .route("/:student_id/results", get(student_results))
}

async fn list_students(
    Query(params): Query<ListStudentsQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<StudentResponse>>, ApiError> {
    let filter = StudentFilter { search: params.search, class_name: params.class_name };

    let items = repositories::students::list(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    let total_count = repositories::students::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(StudentResponse::from_db).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn create_student(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let existing = repositories::students::exists_by_code(state.db(), &payload.code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing student"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Student with this code already exists".to_string()));
    }

    let existing = repositories::students::exists_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing student"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Student with this email already exists".to_string()));
    }

    let now = primitive_now_utc();
    let student = repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            code: &payload.code,
            last_name: &payload.last_name,
            first_name: &payload.first_name,
            email: &payload.email,
            birth_date: payload.birth_date,
            class_name: &payload.class_name,
            academic_year: &payload.academic_year,
            phone: payload.phone.as_deref(),
            address: payload.address.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(map_student_write_error)?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student.id,
        action = "student_create",
        "Student enrolled"
    );

    Ok((StatusCode::CREATED, Json(StudentResponse::from_db(student))))
}

async fn get_student(
    Path(student_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?;

    let Some(student) = student else {
        return Err(ApiError::NotFound("Student not found".to_string()));
    };

    Ok(Json(StudentResponse::from_db(student)))
}

async fn update_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let existing = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?;

    if existing.is_none() {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    repositories::students::update(
        state.db(),
        &student_id,
        repositories::students::UpdateStudent {
            code: payload.code,
            last_name: payload.last_name,
            first_name: payload.first_name,
            email: payload.email,
            birth_date: payload.birth_date,
            class_name: payload.class_name,
            academic_year: payload.academic_year,
            phone: payload.phone,
            address: payload.address,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(map_student_write_error)?;

    let updated = repositories::students::fetch_one_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated student"))?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %updated.id,
        action = "student_update",
        "Student updated"
    );

    Ok(Json(StudentResponse::from_db(updated)))
}

async fn delete_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?;

    if student.is_none() {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    repositories::students::delete_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student"))?;

    tracing::info!(
        admin_id = %admin.id,
        student_id = %student_id,
        action = "student_delete",
        "Student removed"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Result history plus the coefficient-weighted average on the 0-20 scale.
async fn student_results(
    Path(student_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StudentResultsResponse>, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?;

    let Some(student) = student else {
        return Err(ApiError::NotFound("Student not found".to_string()));
    };

    let rows = repositories::results::list_for_student(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list student results"))?;

    let inputs: Vec<ScoreInput> = rows
        .iter()
        .map(|row| ScoreInput {
            score: row.score,
            max_score: row.max_score,
            coefficient: row.coefficient,
        })
        .collect();
    let average = grading::weighted_average(&inputs);

    Ok(Json(StudentResultsResponse {
        student: StudentResponse::from_db(student),
        results: rows.into_iter().map(StudentResultEntry::from_row).collect(),
        average,
    }))
}

fn map_student_write_error(err: sqlx::Error) -> ApiError {
    if db::is_unique_violation(&err) {
        ApiError::Conflict("Student with this code or email already exists".to_string())
    } else {
        ApiError::internal(err, "Failed to write student")
    }
}
