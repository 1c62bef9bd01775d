use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::core::time::{format_date, format_primitive, parse_date};
use crate::db::models::Student;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub(crate) code: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 255, message = "last_name must be 1-255 characters"))]
    pub(crate) last_name: String,
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 255, message = "first_name must be 1-255 characters"))]
    pub(crate) first_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[serde(alias = "birthDate", deserialize_with = "deserialize_date")]
    pub(crate) birth_date: Date,
    #[serde(alias = "className")]
    #[validate(length(min = 1, max = 255, message = "class_name must be 1-255 characters"))]
    pub(crate) class_name: String,
    #[serde(alias = "academicYear")]
    #[validate(length(min = 1, max = 255, message = "academic_year must be 1-255 characters"))]
    pub(crate) academic_year: String,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub(crate) code: Option<String>,
    #[serde(default, alias = "lastName")]
    #[validate(length(min = 1, max = 255, message = "last_name must be 1-255 characters"))]
    pub(crate) last_name: Option<String>,
    #[serde(default, alias = "firstName")]
    #[validate(length(min = 1, max = 255, message = "first_name must be 1-255 characters"))]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[serde(default, alias = "birthDate", deserialize_with = "deserialize_option_date")]
    pub(crate) birth_date: Option<Date>,
    #[serde(default, alias = "className")]
    #[validate(length(min = 1, max = 255, message = "class_name must be 1-255 characters"))]
    pub(crate) class_name: Option<String>,
    #[serde(default, alias = "academicYear")]
    #[validate(length(min = 1, max = 255, message = "academic_year must be 1-255 characters"))]
    pub(crate) academic_year: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) last_name: String,
    pub(crate) first_name: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) birth_date: String,
    pub(crate) class_name: String,
    pub(crate) academic_year: String,
    pub(crate) phone: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        let full_name = format!("{} {}", student.first_name, student.last_name);
        Self {
            id: student.id,
            code: student.code,
            last_name: student.last_name,
            first_name: student.first_name,
            full_name,
            email: student.email,
            birth_date: format_date(student.birth_date),
            class_name: student.class_name,
            academic_year: student.academic_year,
            phone: student.phone,
            address: student.address,
            created_at: format_primitive(student.created_at),
            updated_at: format_primitive(student.updated_at),
        }
    }
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
