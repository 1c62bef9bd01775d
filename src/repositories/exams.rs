use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::{Date, Time};

use crate::db::models::Exam;
use crate::db::types::{ExamCategory, ExamStatus};
use crate::services::scheduling::RoomSlot;

pub(crate) const COLUMNS: &str = "\
    id, subject, date, start_time, end_time, room, coefficient, category, status, \
    description, created_by, created_at, updated_at";

#[derive(Debug, Default)]
pub(crate) struct ExamFilter {
    pub(crate) search: Option<String>,
    pub(crate) status: Option<ExamStatus>,
    pub(crate) category: Option<ExamCategory>,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

pub(crate) struct CreateExam<'a> {
    pub id: &'a str,
    pub subject: &'a str,
    pub date: Date,
    pub start_time: Time,
    pub end_time: Time,
    pub room: &'a str,
    pub coefficient: i32,
    pub category: ExamCategory,
    pub status: ExamStatus,
    pub description: Option<&'a str>,
    pub created_by: &'a str,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, subject, date, start_time, end_time, room, coefficient, category, status,
            description, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.subject)
    .bind(params.date)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.room)
    .bind(params.coefficient)
    .bind(params.category)
    .bind(params.status)
    .bind(params.description)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateExam {
    pub subject: Option<String>,
    pub date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_time: Option<Time>,
    pub room: Option<String>,
    pub coefficient: Option<i32>,
    pub category: Option<ExamCategory>,
    pub status: Option<ExamStatus>,
    pub description: Option<String>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(pool: &PgPool, id: &str, params: UpdateExam) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exams SET
            subject = COALESCE($1, subject),
            date = COALESCE($2, date),
            start_time = COALESCE($3, start_time),
            end_time = COALESCE($4, end_time),
            room = COALESCE($5, room),
            coefficient = COALESCE($6, coefficient),
            category = COALESCE($7, category),
            status = COALESCE($8, status),
            description = COALESCE($9, description),
            updated_at = $10
         WHERE id = $11",
    )
    .bind(params.subject)
    .bind(params.date)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.room)
    .bind(params.coefficient)
    .bind(params.category)
    .bind(params.status)
    .bind(params.description)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &ExamFilter,
    sort_by: &str,
    sort_order: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exams"));
    push_filters(&mut builder, filter);

    builder.push(format!(" ORDER BY {}", order_clause(sort_by, sort_order)));
    builder.push(" OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Exam>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &ExamFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams");
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Slots already booked for a room on a date; the exam being rescheduled is
/// excluded so it cannot conflict with itself.
pub(crate) async fn list_room_slots(
    pool: &PgPool,
    date: Date,
    room: &str,
    exclude_exam_id: Option<&str>,
) -> Result<Vec<RoomSlot>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT id AS exam_id, subject, date, room, start_time, end_time
         FROM exams
         WHERE date = ",
    );
    builder.push_bind(date);
    builder.push(" AND room = ");
    builder.push_bind(room);

    if let Some(exam_id) = exclude_exam_id {
        builder.push(" AND id <> ");
        builder.push_bind(exam_id);
    }

    builder.build_query_as::<RoomSlot>().fetch_all(pool).await
}

pub(crate) async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exams").fetch_one(pool).await
}

pub(crate) async fn count_with_status(
    pool: &PgPool,
    status: ExamStatus,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exams WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await
}

pub(crate) async fn counts_by_category(
    pool: &PgPool,
) -> Result<Vec<(ExamCategory, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (ExamCategory, i64)>(
        "SELECT category, COUNT(*) FROM exams GROUP BY category",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_upcoming(
    pool: &PgPool,
    from: Date,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE date >= $1 AND status = $2
         ORDER BY date, start_time
         LIMIT $3",
    ))
    .bind(from)
    .bind(ExamStatus::Scheduled)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// SQLSTATE 23P01: the room/date/timerange exclusion constraint fired, i.e.
/// another writer booked an overlapping slot between our check and the write.
pub(crate) fn is_room_exclusion_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23P01");
    }
    false
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ExamFilter) {
    let mut has_where = false;

    if let Some(search) = filter.search.as_ref() {
        builder.push(" WHERE ");
        has_where = true;

        let pattern = format!("%{search}%");
        builder.push("(subject ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR room ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(status) = filter.status {
        if !has_where {
            builder.push(" WHERE ");
            has_where = true;
        } else {
            builder.push(" AND ");
        }
        builder.push("status = ");
        builder.push_bind(status);
    }

    if let Some(category) = filter.category {
        if !has_where {
            builder.push(" WHERE ");
        } else {
            builder.push(" AND ");
        }
        builder.push("category = ");
        builder.push_bind(category);
    }
}

fn order_clause(sort_by: &str, sort_order: &str) -> String {
    let column = match sort_by {
        "subject" => "subject",
        "room" => "room",
        "coefficient" => "coefficient",
        "created_at" => "created_at",
        _ => "date",
    };
    let direction = if sort_order.eq_ignore_ascii_case("asc") { "ASC" } else { "DESC" };

    format!("{column} {direction}")
}
