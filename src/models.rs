use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Academic track reference data. `program_type` and `category` are only
/// populated by the detail join and the program listing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Program {
    pub program_id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub program_type: Option<String>,
    pub category: Option<String>,
}

/// One student record. The list projection leaves `username`, `dob`,
/// `gender` and `image_path` as `None`; the detail projection fills
/// everything. A `program` of `None` marks an unresolved program reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub student_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub email: String,
    pub number: String,
    pub program: Option<Program>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminData {
    pub uuid: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminSession {
    pub ssid: String,
    pub belongs_to: Uuid,
    pub expires_at: DateTime<Utc>,
}
