mod support;

use encore_common::Cents;
use encore_engine::{
    db_types::{ChargeStatus, RequestStatus},
    traits::{QueueManagement, RequestGatewayDatabase, StatsManagement},
    test_utils::TestPaymentProvider,
    AdmissionError,
};

use crate::support::{admission_api, new_db, paid_submission, seed_performance};

#[tokio::test]
async fn paid_request_is_admitted_at_position_one() {
    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    let submission = paid_submission(&provider, "alice", "perf-1", "Karma Police", "ch_1", Cents::from_rands(50));
    let outcome = api.admit(submission).await.expect("Admission failed");

    assert!(!outcome.deduplicated);
    assert_eq!(outcome.request.status, RequestStatus::Pending);
    assert_eq!(outcome.request.queue_position, Some(1));
    assert_eq!(outcome.request.price, Cents::from_rands(50));
    // 15% platform commission on R50
    assert_eq!(outcome.charge.platform_fee, Cents::from(750));
    assert_eq!(outcome.charge.payee_earnings, Cents::from(4250));
    assert_eq!(outcome.charge.status, ChargeStatus::Completed);

    let queue = db.fetch_queue("perf-1").await.unwrap();
    assert_eq!(queue.ordered_request_ids, vec![outcome.request.request_id.clone()]);

    let balance = db.fetch_payee_balance("dj-1").await.unwrap().expect("No payee balance");
    // The payee share goes to the available balance; lifetime earnings track the gross amount
    assert_eq!(balance.available_balance, Cents::from(4250));
    assert_eq!(balance.total_earnings, Cents::from_rands(50));

    let stats = db.fetch_or_create_requester_stats("alice").await.unwrap();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.performances_attended, 1);
}

#[tokio::test]
async fn lifetime_earnings_accumulate_the_gross_amount() {
    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    let first = paid_submission(&provider, "alice", "perf-1", "Karma Police", "ch_1", Cents::from_rands(50));
    api.admit(first).await.expect("Admission failed");
    let second = paid_submission(&provider, "bob", "perf-1", "Paranoid Android", "ch_2", Cents::from_rands(50));
    api.admit(second).await.expect("Admission failed");

    let balance = db.fetch_payee_balance("dj-1").await.unwrap().expect("No payee balance");
    // 2 x R42.50 available, 2 x R50.00 lifetime
    assert_eq!(balance.available_balance, Cents::from(8500));
    assert_eq!(balance.total_earnings, Cents::from_rands(100));
}

#[tokio::test]
async fn retrying_a_submission_returns_the_prior_result() {
    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    let submission = paid_submission(&provider, "alice", "perf-1", "Lithium", "ch_1", Cents::from_rands(50));
    let first = api.admit(submission.clone()).await.expect("Admission failed");
    let second = api.admit(submission).await.expect("Retry failed");

    assert!(second.deduplicated);
    assert_eq!(second.request.request_id, first.request.request_id);
    assert_eq!(second.charge.transaction_ref, first.charge.transaction_ref);

    // Exactly one request made it into the queue
    let queue = db.fetch_queue("perf-1").await.unwrap();
    assert_eq!(queue.ordered_request_ids.len(), 1);
    let stats = db.fetch_or_create_requester_stats("alice").await.unwrap();
    assert_eq!(stats.total_requests, 1);
}

#[tokio::test]
async fn a_retry_completes_a_partially_admitted_request() {
    use encore_engine::{
        db_types::{NewChargeRecord, NewRequest, RequestClass},
        RequestId,
    };

    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    // An earlier attempt committed the charge and request, then died before the queue write
    let request_id = RequestId("req_1718000000000_deadbeef".to_string());
    let charge = NewChargeRecord {
        transaction_ref: "ch_1".to_string(),
        idempotency_key: "ik_ch_1".to_string(),
        request_id: request_id.clone(),
        performance_id: "perf-1".to_string(),
        requester_id: "alice".to_string(),
        performer_id: "dj-1".to_string(),
        gross_amount: Cents::from_rands(50),
        platform_fee: Cents::from(750),
        payee_earnings: Cents::from(4250),
    };
    let request = NewRequest {
        request_id: request_id.clone(),
        performance_id: "perf-1".to_string(),
        requester_id: "alice".to_string(),
        performer_id: "dj-1".to_string(),
        song_title: "Karma Police".to_string(),
        artist_name: "Radiohead".to_string(),
        genre: "Unknown".to_string(),
        request_class: RequestClass::Standard,
        price: Cents::from_rands(50),
        dedication: None,
        transaction_ref: "ch_1".to_string(),
    };
    db.insert_charge_with_request(charge, request).await.unwrap();
    assert!(db.fetch_queue("perf-1").await.unwrap().ordered_request_ids.is_empty());

    // The same-key retry converges: the pending request ends up in the queue
    let submission = paid_submission(&provider, "alice", "perf-1", "Karma Police", "ch_1", Cents::from_rands(50));
    let outcome = api.admit(submission).await.expect("Retry failed");
    assert!(outcome.deduplicated);
    assert_eq!(outcome.request.request_id, request_id);
    assert_eq!(outcome.request.queue_position, Some(1));
    let queue = db.fetch_queue("perf-1").await.unwrap();
    assert_eq!(queue.ordered_request_ids, vec![request_id]);
}

#[tokio::test]
async fn a_charge_can_only_be_spent_once() {
    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    let submission = paid_submission(&provider, "alice", "perf-1", "Creep", "ch_1", Cents::from_rands(50));
    api.admit(submission).await.expect("Admission failed");

    // Same charge ref, different idempotency key. This is a double-spend, not a retry.
    let mut reuse = paid_submission(&provider, "bob", "perf-1", "Angie", "ch_1", Cents::from_rands(50));
    reuse.idempotency_key = "ik_different".to_string();
    let err = api.admit(reuse).await.unwrap_err();
    assert!(matches!(err, AdmissionError::PaymentAlreadyUsed));
    assert_eq!(err.error_code(), "PAYMENT_ALREADY_USED");
}

#[tokio::test]
async fn amounts_outside_tolerance_are_rejected() {
    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    // Paid R40 for a R50 request
    let submission = paid_submission(&provider, "alice", "perf-1", "Zombie", "ch_1", Cents::from_rands(40));
    let err = api.admit(submission).await.unwrap_err();
    assert_eq!(err.error_code(), "AMOUNT_MISMATCH");

    // No request or charge was written
    assert!(db.fetch_charge_by_transaction_ref("ch_1").await.unwrap().is_none());
    assert!(db.fetch_queue("perf-1").await.unwrap().ordered_request_ids.is_empty());
}

#[tokio::test]
async fn small_provider_rounding_is_tolerated() {
    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    // 50c over the price point, within the 100c tolerance
    let submission = paid_submission(&provider, "alice", "perf-1", "Hey Jude", "ch_1", Cents::from(5050));
    let outcome = api.admit(submission).await.expect("Admission failed");
    // The recorded price is the performance's price point, not the reported charge amount
    assert_eq!(outcome.request.price, Cents::from_rands(50));
    assert_eq!(outcome.charge.gross_amount, Cents::from_rands(50));
}

#[tokio::test]
async fn closed_performances_reject_submissions() {
    let db = new_db().await;
    seed_performance(&db, "perf-1", "dj-1", Cents::from_rands(50)).await;
    db.set_accepting_requests("perf-1", false).await.unwrap();
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    let submission = paid_submission(&provider, "alice", "perf-1", "Wonderwall", "ch_1", Cents::from_rands(50));
    let err = api.admit(submission).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_ACCEPTING_REQUESTS");
}

#[tokio::test]
async fn unknown_performances_are_not_found() {
    let db = new_db().await;
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    let submission = paid_submission(&provider, "alice", "perf-none", "Yesterday", "ch_1", Cents::from_rands(50));
    let err = api.admit(submission).await.unwrap_err();
    assert!(matches!(err, AdmissionError::PerformanceNotFound));
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn set_price_overrides_the_base_price() {
    let db = new_db().await;
    let perf = encore_engine::db_types::NewPerformance::new("perf-1", "dj-1", Cents::from_rands(50))
        .with_set_price(Cents::from_rands(80));
    db.upsert_performance(perf).await.unwrap();
    let provider = TestPaymentProvider::new();
    let api = admission_api(&db, &provider);

    // Paying the base price is now a mismatch
    let submission = paid_submission(&provider, "alice", "perf-1", "Hallelujah", "ch_1", Cents::from_rands(50));
    let err = api.admit(submission).await.unwrap_err();
    assert_eq!(err.error_code(), "AMOUNT_MISMATCH");

    let submission = paid_submission(&provider, "alice", "perf-1", "Hallelujah", "ch_2", Cents::from_rands(80));
    let outcome = api.admit(submission).await.expect("Admission failed");
    assert_eq!(outcome.request.price, Cents::from_rands(80));
}
