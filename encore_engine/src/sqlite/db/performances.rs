use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPerformance, Performance},
    traits::RequestGatewayError,
};

/// Creates the performance, or refreshes its price points if it already exists. The caller is responsible for
/// creating the matching queue record in the same transaction.
pub async fn upsert_performance(
    performance: NewPerformance,
    conn: &mut SqliteConnection,
) -> Result<Performance, RequestGatewayError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO performances (performance_id, performer_id, base_price, set_price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (performance_id) DO UPDATE
            SET base_price = excluded.base_price,
                set_price = excluded.set_price,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(&performance.performance_id)
    .bind(&performance.performer_id)
    .bind(performance.base_price)
    .bind(performance.set_price)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Performance [{}] saved", performance.performance_id);
    Ok(result)
}

pub async fn fetch_performance(
    performance_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Performance>, sqlx::Error> {
    let performance = sqlx::query_as("SELECT * FROM performances WHERE performance_id = $1")
        .bind(performance_id)
        .fetch_optional(conn)
        .await?;
    Ok(performance)
}

pub async fn set_accepting_requests(
    performance_id: &str,
    accepting: bool,
    conn: &mut SqliteConnection,
) -> Result<Performance, RequestGatewayError> {
    let performance = sqlx::query_as(
        r#"
            UPDATE performances
            SET is_accepting_requests = $1, updated_at = CURRENT_TIMESTAMP
            WHERE performance_id = $2
            RETURNING *;
        "#,
    )
    .bind(accepting)
    .bind(performance_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| RequestGatewayError::PerformanceNotFound(performance_id.to_string()))?;
    debug!("🗃️ Performance [{performance_id}] is {} accepting requests", if accepting { "now" } else { "no longer" });
    Ok(performance)
}
