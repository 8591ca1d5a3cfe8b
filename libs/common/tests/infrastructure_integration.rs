//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database and Redis cache
//! are properly configured and accessible from the application.

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations, seed_defaults},
};
use sqlx::Row;

/// Verifies that PostgreSQL and Redis are accessible, that the schema
/// applies cleanly, and that the seed is idempotent.
#[tokio::test]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;

    // Running the seed twice must leave exactly one admin account.
    seed_defaults(&pool).await?;
    seed_defaults(&pool).await?;

    let row = sqlx::query("SELECT COUNT(*) AS count FROM users WHERE role = 'ADMIN'")
        .fetch_one(&pool)
        .await?;
    let admins: i64 = row.get("count");
    assert_eq!(admins, 1, "Seed must guarantee exactly one admin account");

    let row = sqlx::query("SELECT COUNT(*) AS count FROM services")
        .fetch_one(&pool)
        .await?;
    let services: i64 = row.get("count");
    assert!(services >= 6, "Service catalog seed missing rows");

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    let test_key = "integration_test_key";
    let test_value = "integration_test_value";

    redis_pool.set(test_key, test_value, Some(10)).await?;

    let retrieved_value = redis_pool.get(test_key).await?;
    assert_eq!(retrieved_value, Some(test_value.to_string()));

    redis_pool.delete(test_key).await?;

    let retrieved_value = redis_pool.get(test_key).await?;
    assert_eq!(retrieved_value, None);

    Ok(())
}
