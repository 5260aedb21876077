use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewRequest, Request, RequestId, RequestStatus},
    traits::RequestGatewayError,
};

pub async fn insert_request(request: NewRequest, conn: &mut SqliteConnection) -> Result<Request, RequestGatewayError> {
    let request: Request = sqlx::query_as(
        r#"
            INSERT INTO requests (
                request_id,
                performance_id,
                requester_id,
                performer_id,
                song_title,
                artist_name,
                genre,
                request_class,
                price,
                dedication,
                transaction_ref
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(&request.request_id)
    .bind(&request.performance_id)
    .bind(&request.requester_id)
    .bind(&request.performer_id)
    .bind(&request.song_title)
    .bind(&request.artist_name)
    .bind(&request.genre)
    .bind(request.request_class.to_string())
    .bind(request.price)
    .bind(&request.dedication)
    .bind(&request.transaction_ref)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Request {} saved with id {}", request.request_id, request.id);
    Ok(request)
}

pub async fn fetch_request(
    request_id: &RequestId,
    conn: &mut SqliteConnection,
) -> Result<Option<Request>, sqlx::Error> {
    let request = sqlx::query_as("SELECT * FROM requests WHERE request_id = $1")
        .bind(request_id)
        .fetch_optional(conn)
        .await?;
    Ok(request)
}

pub async fn fetch_pending_requests(
    performance_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Request>, sqlx::Error> {
    let requests = sqlx::query_as("SELECT * FROM requests WHERE performance_id = $1 AND status = 'Pending'")
        .bind(performance_id)
        .fetch_all(conn)
        .await?;
    Ok(requests)
}

/// Transitions the request to a new status after validating the transition against the current one. Leaving `Pending`
/// clears the queue position; a reason is only stored for vetoes.
pub async fn update_status(
    request_id: &RequestId,
    new_status: RequestStatus,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Request, RequestGatewayError> {
    let current = fetch_request(request_id, &mut *conn)
        .await?
        .ok_or_else(|| RequestGatewayError::RequestNotFound(request_id.clone()))?;
    current.status.validate_transition(new_status)?;
    let veto_reason = if new_status == RequestStatus::Vetoed { reason } else { None };
    let updated: Request = sqlx::query_as(
        r#"
            UPDATE requests
            SET status = $1,
                veto_reason = COALESCE($2, veto_reason),
                queue_position = CASE WHEN $1 = 'Pending' THEN queue_position ELSE NULL END,
                updated_at = CURRENT_TIMESTAMP
            WHERE request_id = $3
            RETURNING *;
        "#,
    )
    .bind(new_status.to_string())
    .bind(veto_reason)
    .bind(request_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Request {request_id} moved from {} to {new_status}", current.status);
    Ok(updated)
}

/// Overwrites `queue_position` for the performance's pending requests: the listed ids get their 1-based index, any
/// other pending request gets `NULL`. Call inside the same transaction as the queue sequence write.
pub async fn renumber_positions(
    performance_id: &str,
    ordered: &[RequestId],
    conn: &mut SqliteConnection,
) -> Result<(), RequestGatewayError> {
    sqlx::query("UPDATE requests SET queue_position = NULL WHERE performance_id = $1 AND status = 'Pending'")
        .bind(performance_id)
        .execute(&mut *conn)
        .await?;
    for (i, request_id) in ordered.iter().enumerate() {
        sqlx::query("UPDATE requests SET queue_position = $1 WHERE request_id = $2")
            .bind(i as i64 + 1)
            .bind(request_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
