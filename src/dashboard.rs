use axum::{Extension, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::Student;
use crate::{proceeds, programs, students, Payload, RefStr};

const RECENT_STUDENTS: i64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ProgramCount {
    pub program_id: i32,
    pub name: String,
    /// `None` marks a count whose query failed; the rest of the page is
    /// unaffected.
    pub students: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardCounts {
    pub total: Option<i64>,
    pub programs: Vec<ProgramCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub view: RefStr,
    pub recent: Vec<Student>,
    pub counts: DashboardCounts,
}

pub async fn show_dashboard(Extension(pg): Extension<PgPool>) -> Payload<DashboardView> {
    let recent = students::list_recent(&pg, RECENT_STUDENTS).await?;
    let counts = gather_counts(&pg).await;
    proceeds(DashboardView {
        view: "dashboard",
        recent,
        counts,
    })
}

/// Each count runs as its own query with independent error isolation, so a
/// single failed count surfaces as `None` instead of blocking the page.
pub async fn gather_counts(pg: &PgPool) -> DashboardCounts {
    let total = match students::count_total(pg).await {
        Ok(count) => Some(count),
        Err(err) => {
            log::warn!("Total student count failed: {:?}", err);
            None
        }
    };

    let programs = match programs::list_programs(pg).await {
        Ok(list) => {
            let mut counts = Vec::with_capacity(list.len());
            for program in list {
                let students = match students::count_by_program(pg, program.program_id).await {
                    Ok(count) => Some(count),
                    Err(err) => {
                        log::warn!("Count failed for program {}: {:?}", program.name, err);
                        None
                    }
                };
                counts.push(ProgramCount {
                    program_id: program.program_id,
                    name: program.name,
                    students,
                });
            }
            counts
        }
        Err(err) => {
            log::warn!("Program listing failed: {:?}", err);
            Vec::new()
        }
    };

    DashboardCounts { total, programs }
}
