use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::ExamResult;
use crate::db::types::{ExamCategory, ResultStatus};
use crate::repositories::results::{ResultRow, StudentResultRow};
use crate::schemas::student::StudentResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ResultCreate {
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "score must be non-negative"))]
    pub(crate) score: Option<f64>,
    #[serde(default = "default_max_score", alias = "maxScore")]
    #[validate(range(min = 1, message = "max_score must be at least 1"))]
    pub(crate) max_score: i32,
    #[serde(default = "default_status")]
    pub(crate) status: ResultStatus,
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ResultUpdate {
    #[serde(default)]
    #[validate(range(min = 0.0, message = "score must be non-negative"))]
    pub(crate) score: Option<f64>,
    #[serde(default, alias = "maxScore")]
    #[validate(range(min = 1, message = "max_score must be at least 1"))]
    pub(crate) max_score: Option<i32>,
    #[serde(default)]
    pub(crate) status: Option<ResultStatus>,
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct BulkResultItem {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "score must be non-negative"))]
    pub(crate) score: Option<f64>,
    #[serde(default = "default_max_score", alias = "maxScore")]
    #[validate(range(min = 1, message = "max_score must be at least 1"))]
    pub(crate) max_score: i32,
    #[serde(default = "default_status")]
    pub(crate) status: ResultStatus,
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct BulkResultsCreate {
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    #[validate(length(min = 1, message = "results must not be empty"), nested)]
    pub(crate) results: Vec<BulkResultItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: i32,
    pub(crate) status: ResultStatus,
    pub(crate) comment: Option<String>,
    pub(crate) evaluated_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ResultResponse {
    pub(crate) fn from_db(result: ExamResult) -> Self {
        Self {
            id: result.id,
            exam_id: result.exam_id,
            student_id: result.student_id,
            score: result.score,
            max_score: result.max_score,
            status: result.status,
            comment: result.comment,
            evaluated_by: result.evaluated_by,
            created_at: format_primitive(result.created_at),
            updated_at: format_primitive(result.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultRowResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: i32,
    pub(crate) status: ResultStatus,
    pub(crate) comment: Option<String>,
    pub(crate) evaluated_by: Option<String>,
    pub(crate) exam_subject: String,
    pub(crate) exam_date: String,
    pub(crate) student_code: String,
    pub(crate) student_name: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ResultRowResponse {
    pub(crate) fn from_row(row: ResultRow) -> Self {
        let student_name = format!("{} {}", row.student_first_name, row.student_last_name);
        Self {
            id: row.id,
            exam_id: row.exam_id,
            student_id: row.student_id,
            score: row.score,
            max_score: row.max_score,
            status: row.status,
            comment: row.comment,
            evaluated_by: row.evaluated_by,
            exam_subject: row.exam_subject,
            exam_date: format_date(row.exam_date),
            student_code: row.student_code,
            student_name,
            created_at: format_primitive(row.created_at),
            updated_at: format_primitive(row.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResultEntry {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_subject: String,
    pub(crate) exam_date: String,
    pub(crate) exam_category: ExamCategory,
    pub(crate) coefficient: i32,
    pub(crate) score: Option<f64>,
    pub(crate) max_score: i32,
    pub(crate) status: ResultStatus,
    pub(crate) comment: Option<String>,
    pub(crate) created_at: String,
}

impl StudentResultEntry {
    pub(crate) fn from_row(row: StudentResultRow) -> Self {
        Self {
            id: row.id,
            exam_id: row.exam_id,
            exam_subject: row.exam_subject,
            exam_date: format_date(row.exam_date),
            exam_category: row.exam_category,
            coefficient: row.coefficient,
            score: row.score,
            max_score: row.max_score,
            status: row.status,
            comment: row.comment,
            created_at: format_primitive(row.created_at),
        }
    }
}

/// A student's full result history with the weighted average alongside.
#[derive(Debug, Serialize)]
pub(crate) struct StudentResultsResponse {
    pub(crate) student: StudentResponse,
    pub(crate) results: Vec<StudentResultEntry>,
    pub(crate) average: f64,
}

fn default_max_score() -> i32 {
    20
}

fn default_status() -> ResultStatus {
    ResultStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_create_defaults() {
        let payload: ResultCreate = serde_json::from_value(serde_json::json!({
            "exam_id": "exam-1",
            "student_id": "student-1",
            "score": 14.5
        }))
        .expect("payload");

        assert_eq!(payload.max_score, 20);
        assert_eq!(payload.status, ResultStatus::Pending);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn result_create_rejects_negative_score() {
        let payload: ResultCreate = serde_json::from_value(serde_json::json!({
            "exam_id": "exam-1",
            "student_id": "student-1",
            "score": -1.0
        }))
        .expect("payload");

        assert!(payload.validate().is_err());
    }

    #[test]
    fn bulk_create_rejects_empty_batch() {
        let payload: BulkResultsCreate = serde_json::from_value(serde_json::json!({
            "exam_id": "exam-1",
            "results": []
        }))
        .expect("payload");

        assert!(payload.validate().is_err());
    }
}
