use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ChargeRecord, NewChargeRecord},
    traits::RequestGatewayError,
};

/// Inserts the charge record, consuming the transaction ref and idempotency key. The unique indices on both columns
/// make this an atomic insert-if-absent; a violation is translated into the matching gateway error so callers can
/// tell a double-spend from a retried submission.
pub async fn insert_charge(
    charge: NewChargeRecord,
    conn: &mut SqliteConnection,
) -> Result<ChargeRecord, RequestGatewayError> {
    let result: Result<ChargeRecord, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO charges (
                transaction_ref,
                idempotency_key,
                request_id,
                performance_id,
                requester_id,
                performer_id,
                gross_amount,
                platform_fee,
                payee_earnings
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(&charge.transaction_ref)
    .bind(&charge.idempotency_key)
    .bind(&charge.request_id)
    .bind(&charge.performance_id)
    .bind(&charge.requester_id)
    .bind(&charge.performer_id)
    .bind(charge.gross_amount)
    .bind(charge.platform_fee)
    .bind(charge.payee_earnings)
    .fetch_one(conn)
    .await;
    match result {
        Ok(record) => {
            debug!("🗃️ Charge [{}] consumed by request {}", record.transaction_ref, record.request_id);
            Ok(record)
        },
        Err(e) => Err(unique_violation(e, &charge)),
    }
}

fn unique_violation(e: sqlx::Error, charge: &NewChargeRecord) -> RequestGatewayError {
    let is_unique = e.as_database_error().map(|db| db.is_unique_violation()).unwrap_or(false);
    if is_unique {
        let message = e.to_string();
        if message.contains("idempotency_key") {
            return RequestGatewayError::IdempotencyKeyAlreadyUsed(charge.idempotency_key.clone());
        }
        return RequestGatewayError::TransactionRefAlreadyUsed(charge.transaction_ref.clone());
    }
    e.into()
}

pub async fn fetch_charge_by_transaction_ref(
    transaction_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ChargeRecord>, sqlx::Error> {
    let charge = sqlx::query_as("SELECT * FROM charges WHERE transaction_ref = $1")
        .bind(transaction_ref)
        .fetch_optional(conn)
        .await?;
    Ok(charge)
}

pub async fn fetch_charge_by_idempotency_key(
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ChargeRecord>, sqlx::Error> {
    let charge =
        sqlx::query_as("SELECT * FROM charges WHERE idempotency_key = $1").bind(key).fetch_optional(conn).await?;
    Ok(charge)
}

/// Flips a completed charge to refunded. The status guard in the WHERE clause makes this exactly-once; a second call
/// for the same charge reports [`RequestGatewayError::ChargeNotRefundable`].
pub async fn mark_refunded(
    transaction_ref: &str,
    refund_id: &str,
    conn: &mut SqliteConnection,
) -> Result<ChargeRecord, RequestGatewayError> {
    let updated: Option<ChargeRecord> = sqlx::query_as(
        r#"
            UPDATE charges
            SET status = 'Refunded', refund_id = $1, refunded_at = CURRENT_TIMESTAMP
            WHERE transaction_ref = $2 AND status = 'Completed'
            RETURNING *;
        "#,
    )
    .bind(refund_id)
    .bind(transaction_ref)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(charge) => {
            debug!("🗃️ Charge [{transaction_ref}] marked refunded (refund id [{refund_id}])");
            Ok(charge)
        },
        None => match fetch_charge_by_transaction_ref(transaction_ref, conn).await? {
            Some(_) => Err(RequestGatewayError::ChargeNotRefundable(transaction_ref.to_string())),
            None => Err(RequestGatewayError::ChargeNotFound(transaction_ref.to_string())),
        },
    }
}
