// [libs/core/ledger-engine/tests/concurrency_properties.rs]
//! Universal no-overspend and request-uniqueness properties, driven by
//! concurrent `tokio::task` fan-out against the in-process fakes. The
//! fakes' internal mutex is the only source of serialization, mirroring
//! how the real atomic scripts serialize per-customer operations on the
//! live hot store.

use std::sync::Arc;
use std::time::Duration;

use grainledger_core::ledger::ReservationLedger;
use grainledger_core::test_support::{FakeDurableStore, FakeHotStore};
use proptest::prelude::*;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

async fn ledger_seeded(balance_grains: i64) -> ReservationLedger {
    let hot = FakeHotStore::default();
    hot.set_balance("cust_prop", balance_grains);
    ReservationLedger::bootstrap(
        Arc::new(hot),
        Arc::new(FakeDurableStore::default()),
        10_000,
        4,
        Duration::from_millis(1),
        2,
    )
    .await
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// No over-spend: N concurrent reservations against a fixed balance never
    /// let the sum of approved reservations exceed the seeded balance.
    #[test]
    fn no_overspend_under_concurrent_reservations(reserve_amounts in proptest::collection::vec(1_000i64..2_000_000, 2..12)) {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        runtime.block_on(async move {
            let balance = 5_000_000i64;
            let ledger = Arc::new(ledger_seeded(balance).await);
            let cancel = CancellationToken::new();

            let mut handles = Vec::new();
            for (i, amount) in reserve_amounts.iter().enumerate() {
                let ledger = ledger.clone();
                let cancel = cancel.clone();
                let amount = *amount;
                handles.push(tokio::spawn(async move {
                    ledger
                        .check_and_reserve(
                            "cust_prop", "tenant_1", &format!("req_{i}"), "gpt-5", "openai",
                            amount, amount, Value::Null, &cancel,
                        )
                        .await
                        .unwrap()
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }

            let view = ledger.get_balance("cust_prop").await.unwrap();
            prop_assert!(view.balance >= 0);
            prop_assert!(view.reserved >= 0);
            prop_assert!(view.available <= view.balance);
            Ok(())
        })?;
    }

    /// Unique approval: two `CheckAndReserve` calls sharing a request id --
    /// only one returns approved, regardless of arrival order.
    #[test]
    fn unique_approval_for_duplicate_request_id(reserved in 1_000i64..1_000_000) {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        runtime.block_on(async move {
            let ledger = Arc::new(ledger_seeded(10_000_000).await);
            let cancel = CancellationToken::new();

            let a = {
                let ledger = ledger.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    ledger
                        .check_and_reserve("cust_prop", "tenant_1", "req_dup", "gpt-5", "openai", reserved, reserved, Value::Null, &cancel)
                        .await
                        .unwrap()
                })
            };
            let b = {
                let ledger = ledger.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    ledger
                        .check_and_reserve("cust_prop", "tenant_1", "req_dup", "gpt-5", "openai", reserved, reserved, Value::Null, &cancel)
                        .await
                        .unwrap()
                })
            };

            let (outcome_a, outcome_b) = (a.await.unwrap(), b.await.unwrap());
            let approvals = [&outcome_a, &outcome_b].into_iter().filter(|o| o.approved).count();
            prop_assert_eq!(approvals, 1);
            Ok(())
        })?;
    }
}
