//! End-to-end booking flow against a live database
//!
//! Walks the data-layer invariants: server-computed cost, the status
//! lifecycle, webhook-style confirmation with the payment insert and the
//! booking update in one transaction, idempotent redelivery, and the
//! no-delete rule for services with bookings.

use common::database::{DatabaseConfig, init_pool, run_migrations, seed_defaults};
use sqlx::{PgPool, Row};
use uuid::Uuid;

async fn setup() -> Result<PgPool, Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    run_migrations(&pool).await?;
    seed_defaults(&pool).await?;
    Ok(pool)
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn booking_is_costed_confirmed_and_completed() -> Result<(), Box<dyn std::error::Error>> {
    let pool = setup().await?;

    let marker = Uuid::new_v4().simple().to_string();
    let email = format!("flow-{}@test.care.xyz", marker);

    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind("Flow Test User")
    .bind(&email)
    .bind("not-a-real-hash")
    .fetch_one(&pool)
    .await?;

    // Duplicate email registration must create no second row.
    let duplicate = sqlx::query("INSERT INTO users (name, email) VALUES ($1, $2)")
        .bind("Impostor")
        .bind(&email)
        .execute(&pool)
        .await;
    assert!(duplicate.is_err(), "duplicate email must be rejected");

    let users_with_email: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await?;
    assert_eq!(users_with_email, 1);

    // Book the seeded 500/unit service for 3 hours: cost must be 1500.
    let service = sqlx::query("SELECT id, base_rate FROM services WHERE slug = 'elderly-care'")
        .fetch_one(&pool)
        .await?;
    let service_id: Uuid = service.get("id");
    let base_rate: i32 = service.get("base_rate");
    assert_eq!(base_rate, 500);

    let total_cost = i64::from(3) * i64::from(base_rate);
    let booking = sqlx::query(
        r#"
        INSERT INTO bookings (user_id, service_id, duration_unit, duration_value,
                              division, district, city, area, address, total_cost, status)
        VALUES ($1, $2, 'HOUR', 3, 'Dhaka', 'Dhaka', 'Dhaka', 'Gulshan',
                'House 12, Road 5', $3, 'PENDING')
        RETURNING id, total_cost, status
        "#,
    )
    .bind(user_id)
    .bind(service_id)
    .bind(total_cost)
    .fetch_one(&pool)
    .await?;

    let booking_id: Uuid = booking.get("id");
    assert_eq!(booking.get::<i64, _>("total_cost"), 1500);
    assert_eq!(booking.get::<String, _>("status"), "PENDING");

    // Simulated succeeded webhook: payment insert and PENDING -> CONFIRMED
    // commit together.
    let intent_id = format!("pi_test_{}", marker);
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO payments (booking_id, amount, currency, provider_intent_id, status)
        VALUES ($1, $2, 'bdt', $3, 'succeeded')
        "#,
    )
    .bind(booking_id)
    .bind(150_000_i64)
    .bind(&intent_id)
    .execute(&mut *tx)
    .await?;
    let updated = sqlx::query(
        "UPDATE bookings SET status = 'CONFIRMED' WHERE id = $1 AND status = 'PENDING'",
    )
    .bind(booking_id)
    .execute(&mut *tx)
    .await?;
    assert_eq!(updated.rows_affected(), 1);
    tx.commit().await?;

    let status: String = sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(status, "CONFIRMED");

    let amount: i64 = sqlx::query_scalar("SELECT amount FROM payments WHERE booking_id = $1")
        .bind(booking_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(amount, 150_000);

    // Redelivered webhook: the unique intent id rejects the insert, leaving
    // exactly one payment row.
    let redelivered = sqlx::query(
        r#"
        INSERT INTO payments (booking_id, amount, currency, provider_intent_id, status)
        VALUES ($1, $2, 'bdt', $3, 'succeeded')
        "#,
    )
    .bind(booking_id)
    .bind(150_000_i64)
    .bind(&intent_id)
    .execute(&pool)
    .await;
    assert!(redelivered.is_err(), "duplicate intent id must be rejected");

    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE booking_id = $1")
        .bind(booking_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(payments, 1);

    // Completion is a compare-and-swap from CONFIRMED only.
    let completed = sqlx::query(
        "UPDATE bookings SET status = 'COMPLETED' WHERE id = $1 AND status = 'CONFIRMED'",
    )
    .bind(booking_id)
    .execute(&pool)
    .await?;
    assert_eq!(completed.rows_affected(), 1);

    // A completed booking can no longer be cancelled.
    let cancelled = sqlx::query(
        "UPDATE bookings SET status = 'CANCELLED' WHERE id = $1 AND status = ANY($2)",
    )
    .bind(booking_id)
    .bind(vec!["PENDING".to_string(), "CONFIRMED".to_string()])
    .execute(&pool)
    .await?;
    assert_eq!(cancelled.rows_affected(), 0);

    // The booked service cannot be hard-deleted while bookings reference it.
    let bookings_for_service: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE service_id = $1")
            .bind(service_id)
            .fetch_one(&pool)
            .await?;
    assert!(bookings_for_service >= 1);

    let delete = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(service_id)
        .execute(&pool)
        .await;
    assert!(delete.is_err(), "service with bookings must not be deletable");

    // A service with no bookings deletes cleanly.
    let disposable_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO services (title, slug, description, category, base_rate)
        VALUES ('Disposable', $1, 'temporary', 'Test', 100)
        RETURNING id
        "#,
    )
    .bind(format!("disposable-{}", marker))
    .fetch_one(&pool)
    .await?;

    let deleted = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(disposable_id)
        .execute(&pool)
        .await?;
    assert_eq!(deleted.rows_affected(), 1);

    // Cleanup: the user cascade removes the booking and its payment.
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await?;

    Ok(())
}
