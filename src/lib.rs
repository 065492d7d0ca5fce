pub mod auth;
pub mod dashboard;
pub mod err;
pub mod models;
pub mod programs;
pub mod students;
pub mod validate;

use axum::handler::Handler;
use axum::{routing::get, routing::post, Extension, Json, Router};
use serde::Serialize;
use sqlx::PgPool;

use crate::err::{Error, Fine, Maybe, Nothing};

pub type RefStr = &'static str;
pub type Payload<T> = axum::response::Result<Json<Maybe<T>>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(Fine(value)))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(Nothing(err)))
}

pub fn app(pool: PgPool) -> Router {
    Router::new()
        .route("/login", post(auth::login_admin))
        .route("/logout", post(auth::logout_admin))
        .route("/dashboard", get(dashboard::show_dashboard))
        .route(
            "/students",
            get(students::list_students).post(students::modify_students),
        )
        .fallback(err::handler404.into_service())
        .layer(Extension(pool))
}
