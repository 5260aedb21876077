use encore_common::Cents;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{PayeeBalance, RequesterStats, Tier},
    traits::RequestGatewayError,
};

/// Fetches the stats row for a requester, creating a zeroed Bronze row on first sight.
pub async fn fetch_or_create_stats(
    requester_id: &str,
    conn: &mut SqliteConnection,
) -> Result<RequesterStats, RequestGatewayError> {
    sqlx::query("INSERT OR IGNORE INTO requester_stats (requester_id) VALUES ($1)")
        .bind(requester_id)
        .execute(&mut *conn)
        .await?;
    let stats = sqlx::query_as("SELECT * FROM requester_stats WHERE requester_id = $1")
        .bind(requester_id)
        .fetch_one(conn)
        .await?;
    Ok(stats)
}

/// Bumps `total_requests`, and `performances_attended` the first time this requester appears at this performance.
pub async fn record_admission(
    requester_id: &str,
    performance_id: &str,
    conn: &mut SqliteConnection,
) -> Result<RequesterStats, RequestGatewayError> {
    fetch_or_create_stats(requester_id, &mut *conn).await?;
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO requester_performances (requester_id, performance_id) VALUES ($1, $2)",
    )
    .bind(requester_id)
    .bind(performance_id)
    .execute(&mut *conn)
    .await?;
    let first_appearance = inserted.rows_affected() > 0;
    let attended_bump = i64::from(first_appearance);
    let stats = sqlx::query_as(
        r#"
            UPDATE requester_stats
            SET total_requests = total_requests + 1,
                performances_attended = performances_attended + $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE requester_id = $2
            RETURNING *;
        "#,
    )
    .bind(attended_bump)
    .bind(requester_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Admission recorded for requester [{requester_id}] at [{performance_id}]");
    Ok(stats)
}

pub async fn record_successful_request(
    requester_id: &str,
    conn: &mut SqliteConnection,
) -> Result<RequesterStats, RequestGatewayError> {
    fetch_or_create_stats(requester_id, &mut *conn).await?;
    let stats = sqlx::query_as(
        r#"
            UPDATE requester_stats
            SET successful_requests = successful_requests + 1, updated_at = CURRENT_TIMESTAMP
            WHERE requester_id = $1
            RETURNING *;
        "#,
    )
    .bind(requester_id)
    .fetch_one(conn)
    .await?;
    Ok(stats)
}

/// Stores a recomputed tier. Returns `false` when the stored tier already matches.
pub async fn update_tier(
    requester_id: &str,
    tier: Tier,
    conn: &mut SqliteConnection,
) -> Result<bool, RequestGatewayError> {
    let updated = sqlx::query(
        "UPDATE requester_stats SET tier = $1, updated_at = CURRENT_TIMESTAMP WHERE requester_id = $2 AND tier <> $1",
    )
    .bind(tier.to_string())
    .bind(requester_id)
    .execute(conn)
    .await?;
    let changed = updated.rows_affected() > 0;
    if changed {
        debug!("🗃️ Requester [{requester_id}] is now {tier}");
    }
    Ok(changed)
}

pub async fn credit_payee(
    performer_id: &str,
    earnings: Cents,
    gross: Cents,
    conn: &mut SqliteConnection,
) -> Result<(), RequestGatewayError> {
    sqlx::query(
        r#"
            INSERT INTO payee_balances (performer_id, available_balance, total_earnings)
            VALUES ($1, $2, $3)
            ON CONFLICT (performer_id) DO UPDATE
            SET available_balance = available_balance + excluded.available_balance,
                total_earnings = total_earnings + excluded.total_earnings,
                updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(performer_id)
    .bind(earnings)
    .bind(gross)
    .execute(conn)
    .await?;
    trace!("🗃️ Credited {earnings} to payee [{performer_id}] (gross {gross})");
    Ok(())
}

pub async fn fetch_payee_balance(
    performer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PayeeBalance>, sqlx::Error> {
    let balance = sqlx::query_as("SELECT * FROM payee_balances WHERE performer_id = $1")
        .bind(performer_id)
        .fetch_optional(conn)
        .await?;
    Ok(balance)
}
