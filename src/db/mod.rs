pub mod attendance;
pub mod office;
pub mod tokens;
pub mod users;

use anyhow::{Context, Result};
use sqlx::{MySqlPool, mysql::MySqlPoolOptions};
use tracing::info;

use crate::{auth::password::hash_password, config::Config, model::role::Role};

pub async fn init_db(config: &Config) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    if config.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    Ok(pool)
}

/// Creates the configured admin account on first start; an existing user of that name is left alone.
pub async fn bootstrap_admin(pool: &MySqlPool, config: &Config) -> Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if users::find_by_username(pool, username).await?.is_some() {
        return Ok(());
    }

    let hashed = hash_password(password).map_err(|e| anyhow::anyhow!("{e}"))?;
    users::insert(pool, username, &hashed, Role::Admin).await?;
    info!(username = %username, "Created bootstrap admin account");

    Ok(())
}
