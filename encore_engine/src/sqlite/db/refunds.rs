use log::warn;
use sqlx::SqliteConnection;

use crate::{
    db_types::{FailedRefund, RequestId, NEEDS_MANUAL_REVIEW},
    traits::RequestGatewayError,
};

/// Durably records a refund that exhausted its retry budget. These rows are resolved by support staff out-of-band.
pub async fn insert_failed_refund(
    request_id: &RequestId,
    attempts: u32,
    last_error: &str,
    conn: &mut SqliteConnection,
) -> Result<FailedRefund, RequestGatewayError> {
    let record: FailedRefund = sqlx::query_as(
        r#"
            INSERT INTO failed_refunds (request_id, attempts, last_error, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(request_id)
    .bind(i64::from(attempts))
    .bind(last_error)
    .bind(NEEDS_MANUAL_REVIEW)
    .fetch_one(conn)
    .await?;
    warn!("🗃️ Failed refund recorded for request {request_id} after {attempts} attempts: {last_error}");
    Ok(record)
}

pub async fn fetch_for_request(
    request_id: &RequestId,
    conn: &mut SqliteConnection,
) -> Result<Vec<FailedRefund>, sqlx::Error> {
    let records = sqlx::query_as("SELECT * FROM failed_refunds WHERE request_id = $1 ORDER BY created_at ASC")
        .bind(request_id)
        .fetch_all(conn)
        .await?;
    Ok(records)
}
