use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::db::types::ResultStatus;
use crate::repositories;
use crate::repositories::results::ResultFilter;
use crate::schemas::result::{
    BulkResultsCreate, ResultCreate, ResultResponse, ResultRowResponse, ResultUpdate,
};

#[derive(Debug, Deserialize)]
struct ListResultsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "examId")]
    exam_id: Option<String>,
    #[serde(default, alias = "studentId")]
    student_id: Option<String>,
    #[serde(default)]
    status: Option<ResultStatus>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_results).post(create_result))
        .route("/bulk", post(bulk_create_results))
        .route("/:result_id", get(get_result).patch(update_result).delete(delete_result))
}

async fn list_results(
    Query(params): Query<ListResultsQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ResultRowResponse>>, ApiError> {
    let filter = ResultFilter {
        exam_id: params.exam_id,
        student_id: params.student_id,
        status: params.status,
    };

    let items = repositories::results::list(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    let total_count = repositories::results::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count results"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(ResultRowResponse::from_row).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn create_result(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ResultCreate>,
) -> Result<(StatusCode, Json<ResultResponse>), ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let exam = repositories::exams::find_by_id(state.db(), &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;
    if exam.is_none() {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let student = repositories::students::find_by_id(state.db(), &payload.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?;
    if student.is_none() {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    let existing =
        repositories::results::exists_for_pair(state.db(), &payload.exam_id, &payload.student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check existing result"))?;
    if existing.is_some() {
        return Err(duplicate_result_error());
    }

    let now = primitive_now_utc();
    let result = repositories::results::create(
        state.db(),
        repositories::results::CreateResult {
            id: &Uuid::new_v4().to_string(),
            exam_id: &payload.exam_id,
            student_id: &payload.student_id,
            score: payload.score,
            max_score: payload.max_score,
            status: payload.status,
            comment: payload.comment.as_deref(),
            evaluated_by: Some(&user.id),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(map_result_write_error)?;

    tracing::info!(
        result_id = %result.id,
        exam_id = %result.exam_id,
        student_id = %result.student_id,
        evaluated_by = %user.id,
        action = "result_create",
        "Result recorded"
    );

    Ok((StatusCode::CREATED, Json(ResultResponse::from_db(result))))
}

async fn get_result(
    Path(result_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ResultResponse>, ApiError> {
    let result = repositories::results::find_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?;

    let Some(result) = result else {
        return Err(ApiError::NotFound("Result not found".to_string()));
    };

    Ok(Json(ResultResponse::from_db(result)))
}

async fn update_result(
    Path(result_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ResultUpdate>,
) -> Result<Json<ResultResponse>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let existing = repositories::results::find_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?;

    if existing.is_none() {
        return Err(ApiError::NotFound("Result not found".to_string()));
    }

    repositories::results::update(
        state.db(),
        &result_id,
        repositories::results::UpdateResult {
            score: payload.score,
            max_score: payload.max_score,
            status: payload.status,
            comment: payload.comment,
            evaluated_by: user.id.clone(),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update result"))?;

    let updated = repositories::results::fetch_one_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated result"))?;

    Ok(Json(ResultResponse::from_db(updated)))
}

async fn delete_result(
    Path(result_id): Path<String>,
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let result = repositories::results::find_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?;

    if result.is_none() {
        return Err(ApiError::NotFound("Result not found".to_string()));
    }

    repositories::results::delete_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete result"))?;

    tracing::info!(
        result_id = %result_id,
        deleted_by = %user.id,
        action = "result_delete",
        "Result deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Inserts the whole batch for one exam atomically: a single duplicate pair
/// aborts the transaction so resubmitting the corrected batch stays simple.
async fn bulk_create_results(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<BulkResultsCreate>,
) -> Result<(StatusCode, Json<Vec<ResultResponse>>), ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let exam = repositories::exams::find_by_id(state.db(), &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;
    if exam.is_none() {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let now = primitive_now_utc();
    let mut created = Vec::with_capacity(payload.results.len());

    for item in &payload.results {
        let result = repositories::results::create(
            &mut *tx,
            repositories::results::CreateResult {
                id: &Uuid::new_v4().to_string(),
                exam_id: &payload.exam_id,
                student_id: &item.student_id,
                score: item.score,
                max_score: item.max_score,
                status: item.status,
                comment: item.comment.as_deref(),
                evaluated_by: Some(&user.id),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                ApiError::Conflict(format!(
                    "A result already exists for student {} on this exam",
                    item.student_id
                ))
            } else {
                map_result_write_error(e)
            }
        })?;

        created.push(ResultResponse::from_db(result));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %payload.exam_id,
        count = created.len(),
        evaluated_by = %user.id,
        action = "result_bulk_create",
        "Results recorded in bulk"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

fn duplicate_result_error() -> ApiError {
    ApiError::Conflict("A result already exists for this student and exam".to_string())
}

fn map_result_write_error(err: sqlx::Error) -> ApiError {
    if db::is_unique_violation(&err) {
        return duplicate_result_error();
    }

    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return ApiError::NotFound("Exam or student not found".to_string());
        }
    }

    ApiError::internal(err, "Failed to write result")
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn evaluator_records_and_corrects_result() {
        let ctx = test_support::setup_test_context().await;

        let teacher =
            test_support::insert_teacher(ctx.state.db(), "martin@example.com", "Prof. Martin")
                .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
        let exam = test_support::insert_exam(
            ctx.state.db(),
            &teacher.id,
            "Mathematics",
            "2030-05-10",
            "09:00",
            "11:00",
            "A101",
            2,
        )
        .await;
        let student = test_support::insert_student(
            ctx.state.db(),
            "STU001",
            "Dupont",
            "Jean",
            "jean@example.com",
            "L1 Info",
        )
        .await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/results",
                Some(&token),
                Some(json!({
                    "exam_id": exam.id,
                    "student_id": student.id,
                    "score": 12.5,
                    "max_score": 20,
                    "status": "passed",
                    "comment": "Solid work"
                })),
            ))
            .await
            .expect("create result");

        let status = response.status();
        let created = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {created}");
        let result_id = created["id"].as_str().expect("result id").to_string();
        assert_eq!(created["score"], 12.5);
        assert_eq!(created["evaluated_by"], teacher.id.as_str());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/v1/results/{result_id}"),
                Some(&token),
                Some(json!({"score": 14.0, "status": "passed"})),
            ))
            .await
            .expect("update result");

        let status = response.status();
        let updated = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {updated}");
        assert_eq!(updated["score"], 14.0);
    }

    #[tokio::test]
    async fn duplicate_result_for_same_pair_conflicts() {
        let ctx = test_support::setup_test_context().await;

        let teacher =
            test_support::insert_teacher(ctx.state.db(), "martin@example.com", "Prof. Martin")
                .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
        let exam = test_support::insert_exam(
            ctx.state.db(),
            &teacher.id,
            "Mathematics",
            "2030-05-10",
            "09:00",
            "11:00",
            "A101",
            2,
        )
        .await;
        let student = test_support::insert_student(
            ctx.state.db(),
            "STU001",
            "Dupont",
            "Jean",
            "jean@example.com",
            "L1 Info",
        )
        .await;

        let payload = json!({
            "exam_id": exam.id,
            "student_id": student.id,
            "score": 12.5
        });

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/results",
                Some(&token),
                Some(payload.clone()),
            ))
            .await
            .expect("first result");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/results",
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("duplicate result");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn bulk_insert_is_atomic_on_duplicates() {
        let ctx = test_support::setup_test_context().await;

        let teacher =
            test_support::insert_teacher(ctx.state.db(), "martin@example.com", "Prof. Martin")
                .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
        let exam = test_support::insert_exam(
            ctx.state.db(),
            &teacher.id,
            "Mathematics",
            "2030-05-10",
            "09:00",
            "11:00",
            "A101",
            2,
        )
        .await;
        let jean = test_support::insert_student(
            ctx.state.db(),
            "STU001",
            "Dupont",
            "Jean",
            "jean@example.com",
            "L1 Info",
        )
        .await;
        let sophie = test_support::insert_student(
            ctx.state.db(),
            "STU002",
            "Martin",
            "Sophie",
            "sophie@example.com",
            "L1 Info",
        )
        .await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/results/bulk",
                Some(&token),
                Some(json!({
                    "exam_id": exam.id,
                    "results": [
                        {"student_id": jean.id, "score": 8.0, "status": "failed"},
                        {"student_id": sophie.id, "score": 16.0, "status": "passed"}
                    ]
                })),
            ))
            .await
            .expect("bulk create");

        let status = response.status();
        let created = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {created}");
        assert_eq!(created.as_array().expect("created results").len(), 2);

        // Re-running the same batch hits the (exam, student) key; nothing new
        // is written.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/results/bulk",
                Some(&token),
                Some(json!({
                    "exam_id": exam.id,
                    "results": [
                        {"student_id": jean.id, "score": 9.0}
                    ]
                })),
            ))
            .await
            .expect("duplicate bulk");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/results?exam_id={}", exam.id),
                Some(&token),
                None,
            ))
            .await
            .expect("list results");

        let status = response.status();
        let list = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {list}");
        assert_eq!(list["total_count"], 2);
        let items = list["items"].as_array().expect("items");
        assert!(items.iter().all(|item| item["exam_subject"] == "Mathematics"));
    }

    #[tokio::test]
    async fn result_for_unknown_exam_is_not_found() {
        let ctx = test_support::setup_test_context().await;

        let teacher =
            test_support::insert_teacher(ctx.state.db(), "martin@example.com", "Prof. Martin")
                .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
        let student = test_support::insert_student(
            ctx.state.db(),
            "STU001",
            "Dupont",
            "Jean",
            "jean@example.com",
            "L1 Info",
        )
        .await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/results",
                Some(&token),
                Some(json!({
                    "exam_id": "missing-exam",
                    "student_id": student.id,
                    "score": 12.0
                })),
            ))
            .await
            .expect("create result");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
