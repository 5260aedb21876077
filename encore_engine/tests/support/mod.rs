//! Shared scaffolding for the integration tests.

use encore_common::Cents;
use encore_engine::{
    db_types::{NewPerformance, Performance},
    events::EventProducers,
    test_utils::{prepare_test_env, random_db_path, TestPaymentProvider},
    traits::RequestGatewayDatabase,
    AdmissionApi,
    NewRequestSubmission,
    SqliteDatabase,
};

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn seed_performance(db: &SqliteDatabase, performance_id: &str, performer_id: &str, price: Cents) -> Performance {
    db.upsert_performance(NewPerformance::new(performance_id, performer_id, price))
        .await
        .expect("Error creating performance")
}

pub fn admission_api(db: &SqliteDatabase, provider: &TestPaymentProvider) -> AdmissionApi<SqliteDatabase, TestPaymentProvider> {
    AdmissionApi::new(db.clone(), provider.clone(), EventProducers::default())
}

/// A paid submission for `song` with a matching successful charge already registered with the provider.
pub fn paid_submission(
    provider: &TestPaymentProvider,
    requester_id: &str,
    performance_id: &str,
    song: &str,
    charge_ref: &str,
    amount: Cents,
) -> NewRequestSubmission {
    provider.add_successful_charge(charge_ref, amount);
    let idempotency_key = format!("ik_{charge_ref}");
    NewRequestSubmission::new(requester_id, performance_id, song, "Test Artist", charge_ref, idempotency_key.as_str())
}
