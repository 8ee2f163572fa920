// [libs/core/ledger-engine/tests/scenarios.rs]
//! Concrete end-to-end scenarios for reserve/deduct/finalize, run against
//! the in-process fakes so they are deterministic and infra-free.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use grainledger_core::ledger::{FinalizeRequest, ReservationLedger};
use grainledger_core::test_support::{FakeDurableStore, FakeHotStore};
use grainledger_durable_store::DurableStoreAdapter;
use grainledger_hot_store::HotStoreAdapter;
use grainledger_models::RequestStatus;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

async fn ledger_seeded(customer_id: &str, balance_grains: i64) -> ReservationLedger {
    let hot = FakeHotStore::default();
    hot.set_balance(customer_id, balance_grains);
    let durable = FakeDurableStore::default();
    ReservationLedger::bootstrap(
        Arc::new(hot),
        Arc::new(durable),
        1_000,
        2,
        Duration::from_millis(1),
        3,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn happy_path() {
    let cancel = CancellationToken::new();
    let ledger = ledger_seeded("cust_c", 100_000_000).await;

    let reservation = ledger
        .check_and_reserve("cust_c", "tenant_1", "req1", "gpt-5", "openai", 60_000, 50_000, Value::Null, &cancel)
        .await
        .unwrap();
    assert!(reservation.approved);
    assert_eq!(reservation.remaining_available, 99_940_000);

    let mut balance = 0;
    for _ in 0..3 {
        let outcome = ledger.deduct("cust_c", "req1", 20_000, 100, &cancel).await.unwrap();
        assert!(outcome.success);
        balance = outcome.remaining_balance;
    }
    assert_eq!(balance, 99_940_000);

    let finalization = ledger
        .finalize(
            FinalizeRequest {
                customer_id: "cust_c",
                request_id: "req1",
                status: RequestStatus::Completed,
                actual_cost_grains: 55_000,
                prompt_tokens: Some(300),
                completion_tokens: Some(150),
            },
            &cancel,
        )
        .await
        .unwrap();
    assert!(finalization.success);
    assert_eq!(finalization.refunded_grains, 5_000);
    assert_eq!(finalization.final_balance, 99_945_000);

    let view = ledger.get_balance("cust_c").await.unwrap();
    assert_eq!(view.reserved, 0);
}

#[tokio::test]
async fn concurrent_contention_admits_exactly_one() {
    let cancel = CancellationToken::new();
    let ledger = Arc::new(ledger_seeded("cust_c", 100_000_000).await);

    let a = {
        let ledger = ledger.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            ledger
                .check_and_reserve("cust_c", "tenant_1", "req_a", "gpt-5", "openai", 60_000_000, 50_000_000, Value::Null, &cancel)
                .await
                .unwrap()
        })
    };
    let b = {
        let ledger = ledger.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            ledger
                .check_and_reserve("cust_c", "tenant_1", "req_b", "gpt-5", "openai", 60_000_000, 50_000_000, Value::Null, &cancel)
                .await
                .unwrap()
        })
    };

    let (outcome_a, outcome_b) = (a.await.unwrap(), b.await.unwrap());
    let approvals = [&outcome_a, &outcome_b].into_iter().filter(|o| o.approved).count();
    assert_eq!(approvals, 1);

    let rejected = if outcome_a.approved { &outcome_b } else { &outcome_a };
    assert_eq!(rejected.rejection_reason, "INSUFFICIENT_BALANCE");

    let approved = if outcome_a.approved { &outcome_a } else { &outcome_b };
    assert_eq!(approved.remaining_available, 40_000_000);
}

#[tokio::test]
async fn kill_switch_on_insufficient_balance() {
    let cancel = CancellationToken::new();
    let ledger = ledger_seeded("cust_c", 50_000).await;

    let reservation = ledger
        .check_and_reserve("cust_c", "tenant_1", "req1", "gpt-5", "openai", 50_000, 40_000, Value::Null, &cancel)
        .await
        .unwrap();
    assert!(reservation.approved);

    let first = ledger.deduct("cust_c", "req1", 40_000, 200, &cancel).await.unwrap();
    assert!(first.success);
    assert_eq!(first.remaining_balance, 10_000);

    let second = ledger.deduct("cust_c", "req1", 20_000, 100, &cancel).await.unwrap();
    assert!(!second.success);
    assert_eq!(second.remaining_balance, 10_000);
    assert_eq!(second.error_code, "INSUFFICIENT_BALANCE");

    let finalization = ledger
        .finalize(
            FinalizeRequest {
                customer_id: "cust_c",
                request_id: "req1",
                status: RequestStatus::Killed,
                actual_cost_grains: 40_000,
                prompt_tokens: None,
                completion_tokens: None,
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(finalization.refunded_grains, 0);
    assert_eq!(finalization.final_balance, 10_000);
    assert_eq!(ledger.get_balance("cust_c").await.unwrap().reserved, 0);
}

#[tokio::test]
async fn undercharge_refunds_against_consumed() {
    let cancel = CancellationToken::new();
    let ledger = ledger_seeded("cust_c", 100_000).await;

    ledger
        .check_and_reserve("cust_c", "tenant_1", "req1", "gpt-5", "openai", 10_000, 8_000, Value::Null, &cancel)
        .await
        .unwrap();
    ledger.deduct("cust_c", "req1", 8_000, 100, &cancel).await.unwrap();

    let finalization = ledger
        .finalize(
            FinalizeRequest {
                customer_id: "cust_c",
                request_id: "req1",
                status: RequestStatus::Completed,
                actual_cost_grains: 12_000,
                prompt_tokens: None,
                completion_tokens: None,
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(finalization.refunded_grains, -2_000);
    assert_eq!(finalization.final_balance, 88_000);
    assert_eq!(ledger.get_balance("cust_c").await.unwrap().reserved, 0);
}

#[tokio::test]
async fn undercharge_shortfall_clamps_to_zero() {
    let cancel = CancellationToken::new();
    let ledger = ledger_seeded("cust_c", 5_000).await;

    ledger
        .check_and_reserve("cust_c", "tenant_1", "req1", "gpt-5", "openai", 5_000, 5_000, Value::Null, &cancel)
        .await
        .unwrap();
    ledger.deduct("cust_c", "req1", 5_000, 50, &cancel).await.unwrap();

    let finalization = ledger
        .finalize(
            FinalizeRequest {
                customer_id: "cust_c",
                request_id: "req1",
                status: RequestStatus::Completed,
                actual_cost_grains: 6_000,
                prompt_tokens: None,
                completion_tokens: None,
            },
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(finalization.final_balance, 0);
    assert_eq!(finalization.refunded_grains, -5_000);
}

#[tokio::test]
async fn finalize_is_idempotent() {
    let cancel = CancellationToken::new();
    let ledger = ledger_seeded("cust_c", 100_000).await;

    ledger
        .check_and_reserve("cust_c", "tenant_1", "req1", "gpt-5", "openai", 10_000, 10_000, Value::Null, &cancel)
        .await
        .unwrap();
    ledger.deduct("cust_c", "req1", 10_000, 50, &cancel).await.unwrap();

    let first = ledger
        .finalize(
            FinalizeRequest {
                customer_id: "cust_c",
                request_id: "req1",
                status: RequestStatus::Completed,
                actual_cost_grains: 10_000,
                prompt_tokens: None,
                completion_tokens: None,
            },
            &cancel,
        )
        .await
        .unwrap();

    let second = ledger
        .finalize(
            FinalizeRequest {
                customer_id: "cust_c",
                request_id: "req1",
                status: RequestStatus::Failed,
                actual_cost_grains: 999_999,
                prompt_tokens: None,
                completion_tokens: None,
            },
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(second.refunded_grains, 0);
    assert_eq!(second.final_balance, first.final_balance);
}

#[tokio::test]
async fn pricing_falls_through_to_durable_store_on_miss() {
    use grainledger_models::ModelPricing;

    let hot = FakeHotStore::default();
    let durable = Arc::new(FakeDurableStore::default());

    // Bootstrap warms the cache from whatever the durable store has *now*
    // (nothing yet), so the lookup below is a genuine cache miss.
    let ledger = ReservationLedger::bootstrap(
        Arc::new(hot),
        durable.clone(),
        16,
        1,
        Duration::from_millis(1),
        1,
    )
    .await
    .unwrap();

    durable.seed_pricing(ModelPricing {
        model: "gpt-5".to_string(),
        provider: "openai".to_string(),
        input_per_million_grains: 500_000,
        output_per_million_grains: 1_500_000,
        effective_from: Utc::now(),
        effective_until: None,
    });

    let pricing = ledger.get_model_pricing("gpt-5", "openai").await.unwrap();
    assert_eq!(pricing.input_per_million_grains, 500_000);
}
