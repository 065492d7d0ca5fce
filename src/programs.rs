use sqlx::PgPool;

use crate::err::Error;
use crate::models::Program;

/// Exact-name lookup. `Ok(None)` means no program carries that name, which
/// is distinct from the connection-level `Err(Unavailable)`.
pub async fn resolve_id(pg: &PgPool, name: &str) -> Result<Option<i32>, Error> {
    let id: Option<i32> = sqlx::query_scalar("SELECT program_id FROM program WHERE name = $1")
        .bind(name)
        .fetch_optional(pg)
        .await
        .map_err(Error::from)?;
    Ok(id)
}

pub async fn resolve_name(pg: &PgPool, id: i32) -> Result<Option<String>, Error> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM program WHERE program_id = $1")
        .bind(id)
        .fetch_optional(pg)
        .await
        .map_err(Error::from)?;
    Ok(name)
}

pub async fn find_by_id(pg: &PgPool, id: i32) -> Result<Option<Program>, Error> {
    let program = sqlx::query_as::<_, Program>(
        "SELECT program_id, name, type AS program_type, category FROM program WHERE program_id = $1",
    )
    .bind(id)
    .fetch_optional(pg)
    .await
    .map_err(Error::from)?;
    Ok(program)
}

pub async fn list_programs(pg: &PgPool) -> Result<Vec<Program>, Error> {
    let programs = sqlx::query_as::<_, Program>(
        "SELECT program_id, name, type AS program_type, category FROM program ORDER BY program_id",
    )
    .fetch_all(pg)
    .await
    .map_err(Error::from)?;
    Ok(programs)
}
