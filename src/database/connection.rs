use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::Config,
    error::{query_error, QueryError},
};

pub async fn establish_pool(config: &Config) -> Result<Pool<Postgres>, potion::Error> {
    log::info!(
        "Connecting to database (max {} connections)",
        config.database_max_connections
    );

    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .map_err(query_error)
}

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| -> potion::Error { QueryError::from(e).into() })?;

    log::info!("Database migrations applied");
    Ok(())
}
