use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::repositories::Repositories;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig, timeout: Duration) -> AppResult<DbPool> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(false);

    let pool = Database::connect(options).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}

/// 按配置选择存储实现：`memory://` 为进程内存储，否则连接 Postgres 并执行迁移
pub async fn open_repositories(config: &DatabaseConfig, timeout: Duration) -> AppResult<Repositories> {
    if config.is_memory() {
        log::warn!("Using in-memory storage, data will be lost on restart");
        return Ok(Repositories::in_memory());
    }
    let pool = create_pool(config, timeout).await?;
    run_migrations(&pool).await?;
    log::info!("Database connected and migrations applied");
    Ok(Repositories::postgres(pool))
}
