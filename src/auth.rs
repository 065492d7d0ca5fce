use std::ops::Add;

use axum::{Extension, Json};
use chrono::{DateTime, Duration, Utc};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand::{thread_rng, Rng};
use rand_core::OsRng;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::err::Error;
use crate::models::{AdminData, AdminSession};
use crate::{breaks, proceeds, Payload};

pub const ADMIN_ROLE: &str = "admin";

const SESSION_LIFETIME_DAYS: i64 = 2;

#[derive(Debug, Clone, Eq, Ord, PartialOrd, PartialEq)]
pub enum AuthResult {
    Success,
    SessionExpired,
    InvalidSession,
}

impl Serialize for AuthResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:?}", self))
    }
}

pub async fn ensure_authenticated(
    session_id: Option<String>,
    pg: &PgPool,
) -> Result<AuthResult, Error> {
    let ssid = match session_id {
        Some(ssid) if !ssid.is_empty() => ssid,
        _ => return Ok(AuthResult::InvalidSession),
    };

    let session =
        sqlx::query_as::<_, AdminSession>("SELECT * FROM admin_sessions WHERE ssid = $1 LIMIT 1")
            .bind(&ssid)
            .fetch_optional(pg)
            .await
            .map_err(Error::from)?;

    if let Some(session) = session {
        if Utc::now().gt(&session.expires_at) {
            sqlx::query("DELETE FROM admin_sessions WHERE ssid = $1")
                .bind(&ssid)
                .execute(pg)
                .await
                .map_err(Error::from)?;
            return Ok(AuthResult::SessionExpired);
        }
        Ok(AuthResult::Success)
    } else {
        Ok(AuthResult::InvalidSession)
    }
}

pub async fn login_admin(
    Json(login): Json<LoginAdmin>,
    Extension(pg): Extension<PgPool>,
) -> Payload<LoggedInAdmin> {
    if login.password.is_empty() {
        return breaks(Error::MissingCredentials {
            message: "Provided password was empty!".to_string(),
        });
    }

    let admin = sqlx::query_as::<_, AdminData>("SELECT * FROM admins WHERE username = $1 LIMIT 1")
        .bind(&login.username)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;

    let admin = if let Some(admin) = admin {
        admin
    } else {
        return breaks(Error::AdminDoesNotExist {
            message: format!("Admin with username `{}` does not exist!", login.username),
        });
    };

    let hash = PasswordHash::new(&admin.password_hash).map_err(Error::from)?;
    let matches = Pbkdf2
        .verify_password(login.password.as_bytes(), &hash)
        .is_ok();
    if !matches {
        return breaks(Error::AuthenticationFailure {
            message: "Passwords do not match!".to_string(),
        });
    }

    let existing = sqlx::query_as::<_, AdminSession>(
        "SELECT * FROM admin_sessions WHERE belongs_to = $1 LIMIT 1",
    )
    .bind(admin.uuid)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    if let Some(existing) = existing {
        if Utc::now().lt(&existing.expires_at) {
            // already authenticated
            return proceeds(LoggedInAdmin {
                session_id: existing.ssid,
                admin_id: existing.belongs_to,
                role: admin.role,
                expires_at: existing.expires_at,
            });
        }
        sqlx::query("DELETE FROM admin_sessions WHERE ssid = $1")
            .bind(&existing.ssid)
            .execute(&pg)
            .await
            .map_err(Error::from)?;
    }

    let ssid = mint_session_id();
    let expires_at = Utc::now().add(Duration::days(SESSION_LIFETIME_DAYS));
    let res = sqlx::query("INSERT INTO admin_sessions VALUES ($1, $2, $3)")
        .bind(&ssid)
        .bind(expires_at)
        .bind(admin.uuid)
        .execute(&pg)
        .await
        .map_err(Error::from)?;

    if res.rows_affected() < 1 {
        return breaks(Error::InternalError {
            kind: "DatabaseError",
            message: "Could not persist session id!".to_string(),
        });
    }

    proceeds(LoggedInAdmin {
        session_id: ssid,
        admin_id: admin.uuid,
        role: admin.role,
        expires_at,
    })
}

pub async fn logout_admin(
    Json(EnsureSession { ssid, value }): Json<EnsureSession<DropSession>>,
    Extension(pg): Extension<PgPool>,
) -> Payload<SessionBasedResponse<SessionDropped>> {
    let auth_result = ensure_authenticated(Some(ssid.clone()), &pg).await?;
    if auth_result != AuthResult::Success {
        return proceeds(SessionBasedResponse {
            auth_result,
            value: None,
        });
    }

    let affected = sqlx::query("DELETE FROM admin_sessions WHERE ssid = $1 AND belongs_to = $2")
        .bind(&ssid)
        .bind(value.uuid)
        .execute(&pg)
        .await
        .map_err(Error::from)?;

    proceeds(SessionBasedResponse {
        auth_result,
        value: Some(SessionDropped {
            admin_id: value.uuid,
            drop_success: affected.rows_affected() >= 1,
            cleared_role: ADMIN_ROLE.to_string(),
        }),
    })
}

/// Seeds a single admin account from `ADMIN_USERNAME`/`ADMIN_PASSWORD` when
/// the admins table is empty. Provisioned admins are never overwritten.
pub async fn ensure_admin_account(pg: &PgPool) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
        .fetch_one(pg)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = match std::env::var("ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => {
            log::warn!("No admins provisioned and ADMIN_PASSWORD is unset, skipping bootstrap");
            return Ok(());
        }
    };

    let password_hash = Pbkdf2
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map_err(|err| anyhow::anyhow!("password hashing failed: {}", err))?
        .to_string();

    let admin = AdminData {
        uuid: Uuid::new_v4(),
        username,
        password_hash,
        role: ADMIN_ROLE.to_string(),
        created_at: Utc::now(),
    };

    let res = sqlx::query("INSERT INTO admins VALUES ($1, $2, $3, $4, $5)")
        .bind(admin.uuid)
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(&admin.role)
        .bind(admin.created_at)
        .execute(pg)
        .await?;

    if res.rows_affected() < 1 {
        anyhow::bail!("could not persist bootstrap admin account");
    }
    log::info!("Provisioned bootstrap admin `{}`", admin.username);
    Ok(())
}

fn mint_session_id() -> String {
    let ssid_bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(ssid_bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDropped {
    pub admin_id: Uuid,
    pub drop_success: bool,
    /// Role marker the client clears alongside the dropped session.
    pub cleared_role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropSession {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionBasedResponse<V> {
    pub auth_result: AuthResult,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub value: Option<V>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnsureSession<V> {
    pub ssid: String,
    #[serde(flatten)]
    pub value: V,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedInAdmin {
    session_id: String,
    admin_id: Uuid,
    role: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginAdmin {
    username: String,
    password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_result_serializes_as_string() {
        let json = serde_json::to_value(AuthResult::InvalidSession).unwrap();
        assert_eq!(json, serde_json::json!("InvalidSession"));
    }

    #[test]
    fn session_ids_are_hex_and_unique() {
        let first = mint_session_id();
        let second = mint_session_id();
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn dropped_value_is_flattened() {
        let json = serde_json::to_value(SessionBasedResponse {
            auth_result: AuthResult::Success,
            value: Some(SessionDropped {
                admin_id: Uuid::nil(),
                drop_success: true,
                cleared_role: ADMIN_ROLE.to_string(),
            }),
        })
        .unwrap();
        assert_eq!(json["auth_result"], "Success");
        assert_eq!(json["drop_success"], true);
        assert_eq!(json["cleared_role"], "admin");
    }

    #[test]
    fn absent_value_is_omitted() {
        let json = serde_json::to_value(SessionBasedResponse::<SessionDropped> {
            auth_result: AuthResult::InvalidSession,
            value: None,
        })
        .unwrap();
        assert_eq!(json["auth_result"], "InvalidSession");
        assert!(json.get("drop_success").is_none());
    }
}
