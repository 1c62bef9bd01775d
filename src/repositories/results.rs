use sqlx::{PgPool, Postgres, QueryBuilder};
use time::{Date, PrimitiveDateTime};

use crate::db::models::ExamResult;
use crate::db::types::{ExamCategory, ResultStatus};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, score, max_score, status, comment, evaluated_by, \
    created_at, updated_at";

#[derive(Debug, Default)]
pub(crate) struct ResultFilter {
    pub(crate) exam_id: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) status: Option<ResultStatus>,
}

/// Result row joined with exam and student identity for list views.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ResultRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: i32,
    pub(crate) status: ResultStatus,
    pub(crate) comment: Option<String>,
    pub(crate) evaluated_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) exam_subject: String,
    pub(crate) exam_date: Date,
    pub(crate) student_code: String,
    pub(crate) student_last_name: String,
    pub(crate) student_first_name: String,
}

/// Result row joined with the exam fields the grade aggregator needs.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentResultRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: i32,
    pub(crate) status: ResultStatus,
    pub(crate) comment: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) exam_subject: String,
    pub(crate) exam_date: Date,
    pub(crate) exam_category: ExamCategory,
    pub(crate) coefficient: i32,
}

const JOINED_COLUMNS: &str = "\
    r.id, r.exam_id, r.student_id, r.score, r.max_score, r.status, r.comment, \
    r.evaluated_by, r.created_at, r.updated_at, \
    e.subject AS exam_subject, e.date AS exam_date, \
    s.code AS student_code, s.last_name AS student_last_name, \
    s.first_name AS student_first_name";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!("SELECT {COLUMNS} FROM exam_results WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<ExamResult, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!("SELECT {COLUMNS} FROM exam_results WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn exists_for_pair(
    pool: &PgPool,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM exam_results WHERE exam_id = $1 AND student_id = $2",
    )
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateResult<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub student_id: &'a str,
    pub score: Option<f64>,
    pub max_score: i32,
    pub status: ResultStatus,
    pub comment: Option<&'a str>,
    pub evaluated_by: Option<&'a str>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateResult<'_>,
) -> Result<ExamResult, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "INSERT INTO exam_results (
            id, exam_id, student_id, score, max_score, status, comment, evaluated_by,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(params.score)
    .bind(params.max_score)
    .bind(params.status)
    .bind(params.comment)
    .bind(params.evaluated_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateResult {
    pub score: Option<f64>,
    pub max_score: Option<i32>,
    pub status: Option<ResultStatus>,
    pub comment: Option<String>,
    pub evaluated_by: String,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exam_results SET
            score = COALESCE($1, score),
            max_score = COALESCE($2, max_score),
            status = COALESCE($3, status),
            comment = COALESCE($4, comment),
            evaluated_by = $5,
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.score)
    .bind(params.max_score)
    .bind(params.status)
    .bind(params.comment)
    .bind(params.evaluated_by)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exam_results WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &ResultFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<ResultRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {JOINED_COLUMNS}
         FROM exam_results r
         JOIN exams e ON r.exam_id = e.id
         JOIN students s ON r.student_id = s.id"
    ));
    push_filters(&mut builder, filter);

    builder.push(" ORDER BY r.created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ResultRow>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &ResultFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exam_results r");
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<StudentResultRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentResultRow>(
        "SELECT r.id, r.exam_id, r.score, r.max_score, r.status, r.comment, r.created_at,
                e.subject AS exam_subject, e.date AS exam_date,
                e.category AS exam_category, e.coefficient
         FROM exam_results r
         JOIN exams e ON r.exam_id = e.id
         WHERE r.student_id = $1
         ORDER BY r.created_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ResultFilter) {
    let mut has_where = false;

    if let Some(exam_id) = filter.exam_id.as_ref() {
        builder.push(" WHERE ");
        has_where = true;
        builder.push("r.exam_id = ");
        builder.push_bind(exam_id.clone());
    }

    if let Some(student_id) = filter.student_id.as_ref() {
        if !has_where {
            builder.push(" WHERE ");
            has_where = true;
        } else {
            builder.push(" AND ");
        }
        builder.push("r.student_id = ");
        builder.push_bind(student_id.clone());
    }

    if let Some(status) = filter.status {
        if !has_where {
            builder.push(" WHERE ");
        } else {
            builder.push(" AND ");
        }
        builder.push("r.status = ");
        builder.push_bind(status);
    }
}
