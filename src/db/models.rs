use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime, Time};

use crate::db::types::{ExamCategory, ExamStatus, ResultStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) last_name: String,
    pub(crate) first_name: String,
    pub(crate) email: String,
    pub(crate) birth_date: Date,
    pub(crate) class_name: String,
    pub(crate) academic_year: String,
    pub(crate) phone: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) subject: String,
    pub(crate) date: Date,
    pub(crate) start_time: Time,
    pub(crate) end_time: Time,
    pub(crate) room: String,
    pub(crate) coefficient: i32,
    pub(crate) category: ExamCategory,
    pub(crate) status: ExamStatus,
    pub(crate) description: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResult {
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
}
