use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::Date;

use crate::db::models::Student;

pub(crate) const COLUMNS: &str = "\
    id, code, last_name, first_name, email, birth_date, class_name, academic_year, \
    phone, address, created_at, updated_at";

#[derive(Debug, Default)]
pub(crate) struct StudentFilter {
    pub(crate) search: Option<String>,
    pub(crate) class_name: Option<String>,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn exists_by_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM students WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM students WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateStudent<'a> {
    pub id: &'a str,
    pub code: &'a str,
    pub last_name: &'a str,
    pub first_name: &'a str,
    pub email: &'a str,
    pub birth_date: Date,
    pub class_name: &'a str,
    pub academic_year: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, code, last_name, first_name, email, birth_date, class_name, academic_year,
            phone, address, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.code)
    .bind(params.last_name)
    .bind(params.first_name)
    .bind(params.email)
    .bind(params.birth_date)
    .bind(params.class_name)
    .bind(params.academic_year)
    .bind(params.phone)
    .bind(params.address)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateStudent {
    pub code: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<Date>,
    pub class_name: Option<String>,
    pub academic_year: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateStudent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE students SET
            code = COALESCE($1, code),
            last_name = COALESCE($2, last_name),
            first_name = COALESCE($3, first_name),
            email = COALESCE($4, email),
            birth_date = COALESCE($5, birth_date),
            class_name = COALESCE($6, class_name),
            academic_year = COALESCE($7, academic_year),
            phone = COALESCE($8, phone),
            address = COALESCE($9, address),
            updated_at = $10
         WHERE id = $11",
    )
    .bind(params.code)
    .bind(params.last_name)
    .bind(params.first_name)
    .bind(params.email)
    .bind(params.birth_date)
    .bind(params.class_name)
    .bind(params.academic_year)
    .bind(params.phone)
    .bind(params.address)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM students WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &StudentFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Student>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM students"));
    push_filters(&mut builder, filter);

    builder.push(" ORDER BY last_name, first_name OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Student>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &StudentFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students");
    push_filters(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &StudentFilter) {
    let mut has_where = false;

    if let Some(search) = filter.search.as_ref() {
        builder.push(" WHERE ");
        has_where = true;

        let pattern = format!("%{search}%");
        builder.push("(code ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR last_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR first_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(class_name) = filter.class_name.as_ref() {
        if !has_where {
            builder.push(" WHERE ");
        } else {
            builder.push(" AND ");
        }
        builder.push("class_name = ");
        builder.push_bind(class_name.clone());
    }
}
