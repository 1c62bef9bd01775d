use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{Date, Time};
use validator::Validate;

use crate::core::time::{format_date, format_primitive, format_time, parse_date, parse_time};
use crate::db::models::Exam;
use crate::db::types::{ExamCategory, ExamStatus};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 255, message = "subject must be 1-255 characters"))]
    pub(crate) subject: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) date: Date,
    #[serde(alias = "startTime", deserialize_with = "deserialize_time")]
    pub(crate) start_time: Time,
    #[serde(alias = "endTime", deserialize_with = "deserialize_time")]
    pub(crate) end_time: Time,
    #[validate(length(min = 1, max = 50, message = "room must be 1-50 characters"))]
    pub(crate) room: String,
    #[validate(range(min = 1, max = 10, message = "coefficient must be between 1 and 10"))]
    pub(crate) coefficient: i32,
    #[serde(default = "default_category")]
    pub(crate) category: ExamCategory,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "subject must be 1-255 characters"))]
    pub(crate) subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_date")]
    pub(crate) date: Option<Date>,
    #[serde(default, alias = "startTime", deserialize_with = "deserialize_option_time")]
    pub(crate) start_time: Option<Time>,
    #[serde(default, alias = "endTime", deserialize_with = "deserialize_option_time")]
    pub(crate) end_time: Option<Time>,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "room must be 1-50 characters"))]
    pub(crate) room: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 10, message = "coefficient must be between 1 and 10"))]
    pub(crate) coefficient: Option<i32>,
    #[serde(default)]
    pub(crate) category: Option<ExamCategory>,
    #[serde(default)]
    pub(crate) status: Option<ExamStatus>,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) subject: String,
    pub(crate) date: String,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) room: String,
    pub(crate) coefficient: i32,
    pub(crate) category: ExamCategory,
    pub(crate) status: ExamStatus,
    pub(crate) description: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            subject: exam.subject,
            date: format_date(exam.date),
            start_time: format_time(exam.start_time),
            end_time: format_time(exam.end_time),
            room: exam.room,
            coefficient: exam.coefficient,
            category: exam.category,
            status: exam.status,
            description: exam.description,
            created_by: exam.created_by,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryCount {
    pub(crate) category: ExamCategory,
    pub(crate) count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamStatisticsResponse {
    pub(crate) total_exams: i64,
    pub(crate) scheduled_exams: i64,
    pub(crate) in_progress_exams: i64,
    pub(crate) completed_exams: i64,
    pub(crate) exams_by_category: Vec<CategoryCount>,
    pub(crate) upcoming_exams: Vec<ExamResponse>,
}

fn default_category() -> ExamCategory {
    ExamCategory::Exam
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
}

fn deserialize_option_date<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_date(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid date: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).ok_or_else(|| D::Error::custom(format!("invalid time: {raw}")))
}

fn deserialize_option_time<'de, D>(deserializer: D) -> Result<Option<Time>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_time(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid time: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_create_parses_schedule_fields() {
        let payload: ExamCreate = serde_json::from_value(serde_json::json!({
            "subject": "Mathematics",
            "date": "2026-02-15",
            "start_time": "09:00",
            "end_time": "11:00",
            "room": "A101",
            "coefficient": 2
        }))
        .expect("payload");

        assert_eq!(format_date(payload.date), "2026-02-15");
        assert_eq!(format_time(payload.start_time), "09:00");
        assert_eq!(format_time(payload.end_time), "11:00");
        assert_eq!(payload.category, ExamCategory::Exam);
    }

    #[test]
    fn exam_create_rejects_malformed_time() {
        let parsed = serde_json::from_value::<ExamCreate>(serde_json::json!({
            "subject": "Mathematics",
            "date": "2026-02-15",
            "start_time": "9 o'clock",
            "end_time": "11:00",
            "room": "A101",
            "coefficient": 2
        }));

        assert!(parsed.is_err());
    }

    #[test]
    fn exam_create_validates_coefficient_range() {
        let payload: ExamCreate = serde_json::from_value(serde_json::json!({
            "subject": "Mathematics",
            "date": "2026-02-15",
            "start_time": "09:00",
            "end_time": "11:00",
            "room": "A101",
            "coefficient": 11
        }))
        .expect("payload");

        assert!(payload.validate().is_err());
    }
}
