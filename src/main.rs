use std::net::SocketAddr;

use sqlx::postgres::PgPoolOptions;

use college_server::{app, auth};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let db_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&db_url)?;

    if let Err(err) = auth::ensure_admin_account(&pool).await {
        log::error!("Admin bootstrap failed: {:?}", err);
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    log::info!("Starting College Admin HTTP Server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app(pool).into_make_service())
        .await?;
    Ok(())
}
