use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::dashboard::{gather_counts, DashboardCounts};
use crate::err::Error;
use crate::models::{Program, Student};
use crate::{proceeds, programs, validate, Payload, RefStr};

#[derive(sqlx::FromRow)]
struct StudentListRow {
    student_id: i32,
    first_name: String,
    last_name: String,
    program_id: Option<i32>,
    email: String,
    number: String,
}

#[derive(sqlx::FromRow)]
struct StudentRecentRow {
    student_id: i32,
    first_name: String,
    last_name: String,
    email: String,
    number: String,
}

#[derive(sqlx::FromRow)]
struct StudentDetailRow {
    student_id: i32,
    first_name: String,
    last_name: String,
    username: String,
    dob: NaiveDate,
    gender: String,
    email: String,
    number: String,
    image_path: Option<String>,
    program_id: i32,
    program_name: String,
    program_type: Option<String>,
    program_category: Option<String>,
}

/// List projection with per-row program composition. A row whose program
/// cannot be resolved still appears with `program: None` instead of failing
/// the whole listing.
pub async fn list_all(pg: &PgPool) -> Result<Vec<Student>, Error> {
    let rows = sqlx::query_as::<_, StudentListRow>(
        "SELECT student_id, first_name, last_name, program_id, email, number FROM student",
    )
    .fetch_all(pg)
    .await
    .map_err(Error::from)?;

    let mut students = Vec::with_capacity(rows.len());
    for row in rows {
        let program = match row.program_id {
            Some(id) => match programs::find_by_id(pg, id).await {
                Ok(found) => found,
                Err(err) => {
                    log::warn!(
                        "Program lookup failed for student {}: {:?}",
                        row.student_id,
                        err
                    );
                    None
                }
            },
            None => None,
        };
        students.push(Student {
            student_id: row.student_id,
            first_name: row.first_name,
            last_name: row.last_name,
            username: None,
            dob: None,
            gender: None,
            email: row.email,
            number: row.number,
            program,
            image_path: None,
        });
    }
    Ok(students)
}

/// Most recent `n` students by descending identifier, program-agnostic.
pub async fn list_recent(pg: &PgPool, n: i64) -> Result<Vec<Student>, Error> {
    let rows = sqlx::query_as::<_, StudentRecentRow>(
        "SELECT student_id, first_name, last_name, email, number \
         FROM student ORDER BY student_id DESC LIMIT $1",
    )
    .bind(n)
    .fetch_all(pg)
    .await
    .map_err(Error::from)?;

    Ok(rows
        .into_iter()
        .map(|row| Student {
            student_id: row.student_id,
            first_name: row.first_name,
            last_name: row.last_name,
            username: None,
            dob: None,
            gender: None,
            email: row.email,
            number: row.number,
            program: None,
            image_path: None,
        })
        .collect())
}

/// Detail projection including the program's type and category.
pub async fn get_by_id(pg: &PgPool, student_id: i32) -> Result<Option<Student>, Error> {
    let row = sqlx::query_as::<_, StudentDetailRow>(
        "SELECT s.student_id, s.first_name, s.last_name, s.username, s.dob, s.gender, \
         s.email, s.number, s.image_path, s.program_id, \
         p.name AS program_name, p.type AS program_type, p.category AS program_category \
         FROM student s \
         JOIN program p ON s.program_id = p.program_id \
         WHERE s.student_id = $1",
    )
    .bind(student_id)
    .fetch_optional(pg)
    .await
    .map_err(Error::from)?;

    Ok(row.map(|row| Student {
        student_id: row.student_id,
        first_name: row.first_name,
        last_name: row.last_name,
        username: Some(row.username),
        dob: Some(row.dob),
        gender: Some(row.gender),
        email: row.email,
        number: row.number,
        program: Some(Program {
            program_id: row.program_id,
            name: row.program_name,
            program_type: row.program_type,
            category: row.program_category,
        }),
        image_path: row.image_path,
    }))
}

/// Fields written by the canonical update operation.
#[derive(Debug, Clone)]
pub struct StudentUpdate {
    pub student_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub email: String,
    pub number: String,
    pub program_name: String,
    pub image_path: Option<String>,
}

/// Overwrites all mutable fields in one statement. The program name must
/// resolve first; an unresolvable name rejects the update without writing.
pub async fn update(pg: &PgPool, submission: &StudentUpdate) -> Result<(), Error> {
    let program_id = match programs::resolve_id(pg, &submission.program_name).await? {
        Some(id) => id,
        None => {
            return Err(Error::UnknownProgram {
                message: format!("Program '{}' does not exist.", submission.program_name),
            })
        }
    };

    let result = sqlx::query(
        "UPDATE student SET first_name = $1, last_name = $2, username = $3, dob = $4, \
         gender = $5, email = $6, number = $7, program_id = $8, image_path = $9 \
         WHERE student_id = $10",
    )
    .bind(&submission.first_name)
    .bind(&submission.last_name)
    .bind(&submission.username)
    .bind(submission.dob)
    .bind(&submission.gender)
    .bind(&submission.email)
    .bind(&submission.number)
    .bind(program_id)
    .bind(&submission.image_path)
    .bind(submission.student_id)
    .execute(pg)
    .await
    .map_err(Error::from)?;

    if result.rows_affected() < 1 {
        return Err(Error::NotFound {
            message: format!("Student not found with ID: {}", submission.student_id),
        });
    }
    Ok(())
}

pub async fn delete(pg: &PgPool, student_id: i32) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM student WHERE student_id = $1")
        .bind(student_id)
        .execute(pg)
        .await
        .map_err(Error::from)?;

    if result.rows_affected() < 1 {
        return Err(Error::NotFound {
            message: format!("Student not found with ID: {}", student_id),
        });
    }
    Ok(())
}

pub async fn count_total(pg: &PgPool) -> Result<i64, Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student")
        .fetch_one(pg)
        .await
        .map_err(Error::from)?;
    Ok(total)
}

pub async fn count_by_program(pg: &PgPool, program_id: i32) -> Result<i64, Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student WHERE program_id = $1")
        .bind(program_id)
        .fetch_one(pg)
        .await
        .map_err(Error::from)?;
    Ok(count)
}

/// Request body for `POST /students`. The `action` discriminator selects
/// the operation; the remaining fields are only read by `update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAction {
    pub action: String,
    pub student_id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub subject: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentsView {
    pub view: RefStr,
    pub students: Vec<Student>,
    pub counts: DashboardCounts,
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateFormView {
    pub view: RefStr,
    pub student: Student,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ModifyOutcome {
    Form(UpdateFormView),
    List(StudentsView),
}

pub async fn list_students(Extension(pg): Extension<PgPool>) -> Payload<StudentsView> {
    let view = refreshed_view(&pg, None, None).await?;
    proceeds(view)
}

pub async fn modify_students(
    Json(req): Json<StudentAction>,
    Extension(pg): Extension<PgPool>,
) -> Payload<ModifyOutcome> {
    match req.action.as_str() {
        "updateForm" => handle_update_form(&pg, req.student_id).await,
        "update" => handle_update(&pg, &req).await,
        "delete" => handle_delete(&pg, req.student_id).await,
        other => Err(Error::InvalidPayload {
            message: format!("Unknown action: {}", other),
        }),
    }
}

async fn handle_update_form(pg: &PgPool, student_id: i32) -> Payload<ModifyOutcome> {
    match get_by_id(pg, student_id).await? {
        Some(student) => proceeds(ModifyOutcome::Form(UpdateFormView {
            view: "update",
            student,
        })),
        None => Err(Error::NotFound {
            message: format!("Student not found with ID: {}", student_id),
        }),
    }
}

async fn handle_update(pg: &PgPool, req: &StudentAction) -> Payload<ModifyOutcome> {
    if let Some(message) = validate::validate_update(req) {
        let view = refreshed_view(pg, None, Some(message)).await?;
        return proceeds(ModifyOutcome::List(view));
    }

    let submission = build_submission(req)?;
    let (success, error) = match update(pg, &submission).await {
        Ok(()) => (
            Some("Student information updated successfully.".to_string()),
            None,
        ),
        Err(Error::UnknownProgram { message }) => (None, Some(message)),
        Err(Error::NotFound { .. }) => {
            (None, Some("Failed to update student information.".to_string()))
        }
        Err(err) => return Err(err),
    };

    let view = refreshed_view(pg, success, error).await?;
    proceeds(ModifyOutcome::List(view))
}

async fn handle_delete(pg: &PgPool, student_id: i32) -> Payload<ModifyOutcome> {
    let (success, error) = match delete(pg, student_id).await {
        Ok(()) => (Some("Student deleted successfully.".to_string()), None),
        Err(Error::NotFound { .. }) => (None, Some("Failed to delete student.".to_string())),
        Err(err) => return Err(err),
    };

    let view = refreshed_view(pg, success, error).await?;
    proceeds(ModifyOutcome::List(view))
}

/// Every mutation outcome re-reads the list so the view reflects storage
/// truth rather than an in-memory patch.
async fn refreshed_view(
    pg: &PgPool,
    success: Option<String>,
    error: Option<String>,
) -> Result<StudentsView, Error> {
    let students = list_all(pg).await?;
    let counts = gather_counts(pg).await;
    Ok(StudentsView {
        view: "students",
        students,
        counts,
        success,
        error,
    })
}

/// Rebuilds the typed submission from a validated request. The dob re-parse
/// cannot fail after validation, so a failure here is an internal error.
fn build_submission(req: &StudentAction) -> Result<StudentUpdate, Error> {
    let dob = NaiveDate::parse_from_str(req.dob.as_deref().unwrap_or(""), "%Y-%m-%d").map_err(
        |err| Error::InternalError {
            kind: "DateError",
            message: err.to_string(),
        },
    )?;
    Ok(StudentUpdate {
        student_id: req.student_id,
        first_name: req.first_name.clone().unwrap_or_default(),
        last_name: req.last_name.clone().unwrap_or_default(),
        username: req.username.clone().unwrap_or_default(),
        dob,
        gender: req.gender.clone().unwrap_or_default(),
        email: req.email.clone().unwrap_or_default(),
        number: req.phone_number.clone().unwrap_or_default(),
        program_name: req.subject.clone().unwrap_or_default(),
        image_path: req.image.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_uses_camel_case_names() {
        let req: StudentAction = serde_json::from_str(
            r#"{
                "action": "update",
                "studentId": 42,
                "firstName": "Anita",
                "lastName": "Shrestha",
                "username": "anita01",
                "dob": "2004-02-29",
                "gender": "female",
                "email": "anita@college.edu.np",
                "phoneNumber": "9812345678",
                "subject": "Computing",
                "image": "uploads/anita.png"
            }"#,
        )
        .unwrap();
        assert_eq!(req.student_id, 42);
        assert_eq!(req.phone_number.as_deref(), Some("9812345678"));
        assert_eq!(req.subject.as_deref(), Some("Computing"));
    }

    #[test]
    fn delete_request_needs_no_update_fields() {
        let req: StudentAction =
            serde_json::from_str(r#"{"action": "delete", "studentId": 7}"#).unwrap();
        assert_eq!(req.action, "delete");
        assert!(req.first_name.is_none());
    }

    #[test]
    fn submission_carries_parsed_dob() {
        let req: StudentAction = serde_json::from_str(
            r#"{
                "action": "update",
                "studentId": 1,
                "firstName": "A",
                "lastName": "B",
                "username": "ab",
                "dob": "2000-01-31",
                "gender": "male",
                "email": "a@b.com",
                "phoneNumber": "9800000000",
                "subject": "Networking"
            }"#,
        )
        .unwrap();
        let submission = build_submission(&req).unwrap();
        assert_eq!(
            submission.dob,
            NaiveDate::from_ymd_opt(2000, 1, 31).unwrap()
        );
        assert_eq!(submission.program_name, "Networking");
        assert_eq!(submission.image_path, None);
    }
}
