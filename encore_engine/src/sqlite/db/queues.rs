use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{QueueRecord, RequestId},
    traits::RequestGatewayError,
};

/// The raw queue row. The sequence is stored as a JSON array of request ids in a single TEXT column, so the whole
/// queue is replaced in one statement and the version check covers the entire sequence.
#[derive(Debug, Clone, FromRow)]
struct QueueRow {
    performance_id: String,
    ordered_request_ids: String,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl QueueRow {
    fn into_record(self) -> Result<QueueRecord, RequestGatewayError> {
        let ordered_request_ids: Vec<RequestId> = serde_json::from_str(&self.ordered_request_ids)
            .map_err(|e| RequestGatewayError::DatabaseError(format!("Corrupt queue sequence: {e}")))?;
        Ok(QueueRecord {
            performance_id: self.performance_id,
            ordered_request_ids,
            version: self.version,
            updated_at: self.updated_at,
        })
    }
}

fn to_json(ordered: &[RequestId]) -> Result<String, RequestGatewayError> {
    serde_json::to_string(ordered)
        .map_err(|e| RequestGatewayError::DatabaseError(format!("Cannot serialize queue sequence: {e}")))
}

/// Creates the (empty, version 0) queue record for a performance if it does not exist yet.
pub async fn create_queue(performance_id: &str, conn: &mut SqliteConnection) -> Result<(), RequestGatewayError> {
    sqlx::query("INSERT OR IGNORE INTO queues (performance_id, ordered_request_ids) VALUES ($1, '[]')")
        .bind(performance_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_queue(
    performance_id: &str,
    conn: &mut SqliteConnection,
) -> Result<QueueRecord, RequestGatewayError> {
    let row: Option<QueueRow> = sqlx::query_as("SELECT * FROM queues WHERE performance_id = $1")
        .bind(performance_id)
        .fetch_optional(conn)
        .await?;
    row.ok_or_else(|| RequestGatewayError::PerformanceNotFound(performance_id.to_string()))?.into_record()
}

/// Replaces the queue sequence, conditional on the version the caller read. The version bump and the sequence
/// replacement are one statement, so two writers racing on the same version cannot both succeed.
pub async fn write_queue(
    performance_id: &str,
    ordered: &[RequestId],
    expected_version: i64,
    conn: &mut SqliteConnection,
) -> Result<QueueRecord, RequestGatewayError> {
    let sequence = to_json(ordered)?;
    let row: Option<QueueRow> = sqlx::query_as(
        r#"
            UPDATE queues
            SET ordered_request_ids = $1, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE performance_id = $2 AND version = $3
            RETURNING *;
        "#,
    )
    .bind(&sequence)
    .bind(performance_id)
    .bind(expected_version)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => {
            trace!("🗃️ Queue for [{performance_id}] written at version {}", row.version);
            row.into_record()
        },
        // No row matched: either the queue does not exist, or another writer got in first
        None => match fetch_queue(performance_id, conn).await {
            Ok(_) => Err(RequestGatewayError::QueueVersionConflict {
                performance_id: performance_id.to_string(),
                expected: expected_version,
            }),
            Err(e) => Err(e),
        },
    }
}
