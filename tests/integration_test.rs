//! Integration Tests - Use Cases Against a Mocked Ledger
//!
//! Drives the allowance manager, price monitor, swap executor, and
//! trading loop through a mockall `LedgerGateway`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use mockall::{mock, Sequence};
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use sunswap_limit_bot::domain::error::{Stage, TradeError};
use sunswap_limit_bot::domain::order::pow10;
use sunswap_limit_bot::domain::receipt::{PendingTx, ReceiptStatus, TransactionReceipt};
use sunswap_limit_bot::domain::route::TradeRoute;
use sunswap_limit_bot::domain::token::{TokenAsset, TokenRegistry, SUNSWAP_V2_ROUTER};
use sunswap_limit_bot::ports::ledger::{ContractCall, LedgerGateway};
use sunswap_limit_bot::usecases::allowance::approval_threshold;
use sunswap_limit_bot::usecases::{
    AllowanceManager, ApprovalOutcome, DecimalsCache, MonitorOutcome, PriceMonitor, RunStatus,
    SwapExecutor, TradingLoop, TradingSettings,
};

// ---- Mock Definitions ----

mock! {
    pub Ledger {}

    #[async_trait::async_trait]
    impl LedgerGateway for Ledger {
        async fn resolve_decimals(&self, token: Address) -> anyhow::Result<u8>;
        async fn get_balance(&self, owner: Address, token: Address) -> anyhow::Result<U256>;
        async fn get_allowance(
            &self,
            owner: Address,
            spender: Address,
            token: Address,
        ) -> anyhow::Result<U256>;
        async fn simulate_amounts_out(
            &self,
            amount_in: U256,
            path: &[Address],
        ) -> anyhow::Result<Vec<U256>>;
        async fn submit(
            &self,
            call: &ContractCall,
            owner: Address,
            gas_limit: Option<u64>,
        ) -> anyhow::Result<PendingTx>;
        async fn wait_for_receipt(&self, pending: &PendingTx) -> anyhow::Result<TransactionReceipt>;
    }
}

// ---- Fixtures ----

const GAS_LIMIT: Option<u64> = Some(250_000);

fn wallet() -> Address {
    Address::repeat_byte(0x77)
}

fn usdt_sun() -> TradeRoute {
    TradeRoute::from_symbols(&TokenRegistry::builtin(), &["USDT", "SUN"]).unwrap()
}

fn sun(units: u64) -> U256 {
    U256::from(units) * pow10(18).unwrap()
}

fn usdt(units: u64) -> U256 {
    U256::from(units) * pow10(6).unwrap()
}

fn receipt(tx_hash: B256, status: ReceiptStatus) -> TransactionReceipt {
    TransactionReceipt {
        tx_hash,
        status,
        payload: serde_json::json!({ "transactionHash": tx_hash.to_string() }),
    }
}

fn settings(dry_run: bool) -> TradingSettings {
    TradingSettings {
        wallet: wallet(),
        router: SUNSWAP_V2_ROUTER,
        gas_limit: GAS_LIMIT,
        dry_run,
    }
}

fn is_approve(call: &ContractCall) -> bool {
    matches!(call, ContractCall::Approve { .. })
}

fn is_swap(call: &ContractCall) -> bool {
    matches!(call, ContractCall::SwapExactTokensForTokens { .. })
}

/// Receipts echo the pending hash with the given status.
fn expect_receipts(mock: &mut MockLedger, status: ReceiptStatus) {
    mock.expect_wait_for_receipt()
        .returning(move |pending| Ok(receipt(pending.tx_hash, status)));
}

// ---- AllowanceManager ----

#[tokio::test]
async fn test_sufficient_allowance_submits_nothing() {
    for granted in [U256::MAX, approval_threshold()] {
        let mut mock = MockLedger::new();
        mock.expect_get_allowance()
            .times(1)
            .returning(move |_, _, _| Ok(granted));
        mock.expect_submit().never();
        mock.expect_wait_for_receipt().never();

        let manager = AllowanceManager::new(Arc::new(mock), wallet(), SUNSWAP_V2_ROUTER, GAS_LIMIT);
        let outcome = manager
            .ensure_allowance(usdt_sun().first())
            .await
            .unwrap();
        assert!(matches!(outcome, ApprovalOutcome::Skipped { granted: g } if g == granted));
    }
}

#[tokio::test]
async fn test_low_allowance_submits_one_max_approval() {
    let token = usdt_sun().first().clone();
    let token_address = token.address;

    let mut mock = MockLedger::new();
    mock.expect_get_allowance()
        .withf(move |owner, spender, tok| {
            *owner == wallet() && *spender == SUNSWAP_V2_ROUTER && *tok == token_address
        })
        .returning(|_, _, _| Ok(approval_threshold() - U256::from(1u8)));
    mock.expect_submit()
        .times(1)
        .withf(move |call, owner, fee| {
            *call
                == ContractCall::Approve {
                    token: token_address,
                    spender: SUNSWAP_V2_ROUTER,
                    amount: U256::MAX,
                }
                && *owner == wallet()
                && *fee == GAS_LIMIT
        })
        .returning(|_, _, _| Ok(PendingTx { tx_hash: B256::repeat_byte(1) }));
    expect_receipts(&mut mock, ReceiptStatus::Success);

    let manager = AllowanceManager::new(Arc::new(mock), wallet(), SUNSWAP_V2_ROUTER, GAS_LIMIT);
    let outcome = manager.ensure_allowance(&token).await.unwrap();
    let approved = outcome.receipt().expect("approval receipt");
    assert_eq!(approved.tx_hash, B256::repeat_byte(1));
    assert!(approved.is_success());
}

#[tokio::test]
async fn test_failed_approval_is_rejected() {
    let mut mock = MockLedger::new();
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::ZERO));
    mock.expect_submit()
        .times(1)
        .returning(|_, _, _| Ok(PendingTx { tx_hash: B256::repeat_byte(2) }));
    expect_receipts(&mut mock, ReceiptStatus::Failure);

    let manager = AllowanceManager::new(Arc::new(mock), wallet(), SUNSWAP_V2_ROUTER, GAS_LIMIT);
    let err = manager
        .ensure_allowance(usdt_sun().first())
        .await
        .unwrap_err();
    match err {
        TradeError::ApprovalRejected { token, receipt } => {
            assert_eq!(token, "USDT");
            assert_eq!(receipt.status, ReceiptStatus::Failure);
        }
        other => panic!("expected ApprovalRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_allowance_read_failure_is_transient_query() {
    let mut mock = MockLedger::new();
    mock.expect_get_allowance()
        .returning(|_, _, _| Err(anyhow::anyhow!("rpc timeout")));
    mock.expect_submit().never();

    let manager = AllowanceManager::new(Arc::new(mock), wallet(), SUNSWAP_V2_ROUTER, GAS_LIMIT);
    let err = manager
        .ensure_allowance(usdt_sun().first())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::AllowanceCheck));
    assert!(matches!(err, TradeError::TransientQuery { .. }));
}

// ---- PriceMonitor ----

#[tokio::test]
async fn test_query_price_usdt_sun() {
    let route = usdt_sun();
    let expected_path = route.addresses();

    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .times(1)
        .withf(move |amount, path| *amount == usdt(1) && path == expected_path.as_slice())
        .returning(|_, _| Ok(vec![usdt(1), sun(200)]));
    mock.expect_resolve_decimals().never();

    let ledger = Arc::new(mock);
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::new(DecimalsCache::new(ledger)));
    let price = monitor.query_price(&route).await.unwrap();
    assert_eq!(price, dec!(0.005));
}

#[tokio::test]
async fn test_missing_decimals_resolved_once_per_run() {
    let jst = TokenAsset::new("JST", Address::repeat_byte(0x18), None);
    let route = TradeRoute::new(vec![jst.clone(), usdt_sun().first().clone()]).unwrap();

    let mut mock = MockLedger::new();
    mock.expect_resolve_decimals()
        .times(1)
        .withf(move |token| *token == jst.address)
        .returning(|_| Ok(18));
    mock.expect_simulate_amounts_out()
        .times(2)
        .withf(|amount, _| *amount == pow10(18).unwrap())
        .returning(|_, _| Ok(vec![pow10(18).unwrap(), usdt(40)]));

    let ledger = Arc::new(mock);
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::new(DecimalsCache::new(ledger)));
    assert_eq!(monitor.query_price(&route).await.unwrap(), dec!(0.025));
    assert_eq!(monitor.query_price(&route).await.unwrap(), dec!(0.025));
}

#[tokio::test]
async fn test_unresolvable_decimals_is_invalid_route() {
    let unknown = TokenAsset::new("XYZ", Address::repeat_byte(0x99), None);
    let route = TradeRoute::new(vec![usdt_sun().first().clone(), unknown]).unwrap();

    let mut mock = MockLedger::new();
    mock.expect_resolve_decimals()
        .returning(|_| Err(anyhow::anyhow!("execution reverted")));
    mock.expect_simulate_amounts_out().never();

    let ledger = Arc::new(mock);
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::new(DecimalsCache::new(ledger)));
    let err = monitor.query_price(&route).await.unwrap_err();
    assert!(matches!(err, TradeError::InvalidRoute(_)));
}

/// Output legs for successive one-USDT quotes: ~0.0060, ~0.0058, 0.0050.
fn falling_price_quotes() -> impl FnMut(U256, &[Address]) -> anyhow::Result<Vec<U256>> + Send + 'static {
    let outs = [
        U256::from(166_666_666_666_666_666_666u128),
        U256::from(172_413_793_103_448_275_862u128),
        sun(200),
    ];
    let calls = AtomicUsize::new(0);
    move |_: U256, _: &[Address]| {
        let i = calls.fetch_add(1, Ordering::SeqCst).min(outs.len() - 1);
        Ok(vec![usdt(1), outs[i]])
    }
}

#[tokio::test]
async fn test_monitor_triggers_on_first_price_at_or_below_threshold() {
    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .times(3)
        .returning(falling_price_quotes());

    let ledger = Arc::new(mock);
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::new(DecimalsCache::new(ledger)));
    let outcome = monitor
        .monitor_and_trigger(&usdt_sun(), dec!(0.0054), Duration::from_millis(1), None)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MonitorOutcome::Triggered {
            price: dec!(0.005),
            polls: 3
        }
    );
}

#[tokio::test]
async fn test_price_equal_to_threshold_triggers() {
    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .times(1)
        .returning(|_, _| Ok(vec![usdt(1), sun(200)]));

    let ledger = Arc::new(mock);
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::new(DecimalsCache::new(ledger)));
    let outcome = monitor
        .monitor_and_trigger(&usdt_sun(), dec!(0.005), Duration::from_millis(1), None)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MonitorOutcome::Triggered {
            price: dec!(0.005),
            polls: 1
        }
    );
}

#[tokio::test]
async fn test_closed_shutdown_channel_keeps_polling() {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    drop(shutdown_tx);

    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .times(3)
        .returning(falling_price_quotes());

    let ledger = Arc::new(mock);
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::new(DecimalsCache::new(ledger)));
    let outcome = monitor
        .monitor_and_trigger(
            &usdt_sun(),
            dec!(0.0054),
            Duration::from_millis(1),
            Some(&mut shutdown_rx),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, MonitorOutcome::Triggered { polls: 3, .. }));
}

#[tokio::test]
async fn test_monitor_price_failure_stops_loop() {
    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("503 Service Unavailable")));

    let ledger = Arc::new(mock);
    let monitor = PriceMonitor::new(Arc::clone(&ledger), Arc::new(DecimalsCache::new(ledger)));
    let err = monitor
        .monitor_and_trigger(&usdt_sun(), dec!(0.0054), Duration::from_millis(1), None)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::PriceQuery));
}

// ---- SwapExecutor ----

#[tokio::test]
async fn test_swap_builds_min_out_and_deadline() {
    let route = usdt_sun();
    let submitted = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&submitted);

    let mut mock = MockLedger::new();
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::MAX));
    mock.expect_simulate_amounts_out()
        .withf(|amount, _| *amount == U256::from(2_500_000u64))
        .returning(|amount, _| Ok(vec![amount, U256::from(499_999_999_999_999_999_999u128)]));
    mock.expect_submit()
        .times(1)
        .withf(|call, owner, _| is_swap(call) && *owner == wallet())
        .returning(move |call, _, _| {
            captured.lock().unwrap().push(call.clone());
            Ok(PendingTx { tx_hash: B256::repeat_byte(3) })
        });
    expect_receipts(&mut mock, ReceiptStatus::Success);

    let ledger = Arc::new(mock);
    let executor = SwapExecutor::new(
        Arc::clone(&ledger),
        Arc::new(DecimalsCache::new(ledger)),
        wallet(),
        SUNSWAP_V2_ROUTER,
        GAS_LIMIT,
    );

    let before = Utc::now().timestamp();
    let execution = executor.execute_swap(dec!(2.5), &route).await.unwrap();
    let after = Utc::now().timestamp();

    assert!(matches!(execution.approval, ApprovalOutcome::Skipped { .. }));
    assert!(execution.receipt.is_success());
    // floor(499999999999999999999 * 0.992)
    let expected_min = U256::from(495_999_999_999_999_999_999u128);
    assert_eq!(execution.order.minimum_amount_out, expected_min);

    let calls = submitted.lock().unwrap();
    match &calls[0] {
        ContractCall::SwapExactTokensForTokens {
            router,
            amount_in,
            amount_out_min,
            path,
            to,
            deadline,
        } => {
            assert_eq!(*router, SUNSWAP_V2_ROUTER);
            assert_eq!(*amount_in, U256::from(2_500_000u64));
            assert_eq!(*amount_out_min, expected_min);
            assert_eq!(*path, route.addresses());
            assert_eq!(*to, wallet());
            let deadline = i64::try_from(*deadline).unwrap();
            assert!(deadline >= before + 300 && deadline <= after + 300);
        }
        other => panic!("expected swap call, got {other:?}"),
    }
}

#[tokio::test]
async fn test_approval_precedes_swap_when_allowance_is_zero() {
    let mut seq = Sequence::new();
    let mut mock = MockLedger::new();
    mock.expect_get_balance().returning(|_, _| Ok(usdt(10)));
    mock.expect_get_allowance()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(U256::ZERO));
    mock.expect_submit()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|call, _, _| is_approve(call))
        .returning(|_, _, _| Ok(PendingTx { tx_hash: B256::repeat_byte(4) }));
    mock.expect_wait_for_receipt()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|p| p.tx_hash == B256::repeat_byte(4))
        .returning(|p| Ok(receipt(p.tx_hash, ReceiptStatus::Success)));
    mock.expect_simulate_amounts_out()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|amount, _| Ok(vec![amount, sun(200)]));
    mock.expect_submit()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|call, _, _| is_swap(call))
        .returning(|_, _, _| Ok(PendingTx { tx_hash: B256::repeat_byte(5) }));
    mock.expect_wait_for_receipt()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|p| p.tx_hash == B256::repeat_byte(5))
        .returning(|p| Ok(receipt(p.tx_hash, ReceiptStatus::Success)));

    let ledger = Arc::new(mock);
    let trading = TradingLoop::new(Arc::clone(&ledger), settings(false));
    let route = usdt_sun();

    assert_eq!(trading.balance_of(route.first()).await.unwrap(), dec!(10));

    let execution = trading.executor().execute_swap(dec!(1), &route).await.unwrap();
    let approval = execution.approval.receipt().expect("approval happened");
    assert_eq!(approval.tx_hash, B256::repeat_byte(4));
    assert_eq!(execution.receipt.tx_hash, B256::repeat_byte(5));
}

#[tokio::test]
async fn test_rejected_approval_aborts_before_swap() {
    let mut mock = MockLedger::new();
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::ZERO));
    mock.expect_submit()
        .times(1)
        .withf(|call, _, _| is_approve(call))
        .returning(|_, _, _| Ok(PendingTx { tx_hash: B256::repeat_byte(6) }));
    expect_receipts(&mut mock, ReceiptStatus::Failure);
    mock.expect_simulate_amounts_out().never();

    let ledger = Arc::new(mock);
    let executor = SwapExecutor::new(
        Arc::clone(&ledger),
        Arc::new(DecimalsCache::new(ledger)),
        wallet(),
        SUNSWAP_V2_ROUTER,
        GAS_LIMIT,
    );
    let err = executor.execute_swap(dec!(1), &usdt_sun()).await.unwrap_err();
    assert!(matches!(err, TradeError::ApprovalRejected { .. }));
    assert_eq!(err.receipt().unwrap().tx_hash, B256::repeat_byte(6));
}

#[tokio::test]
async fn test_invalid_amount_rejected_before_any_ledger_call() {
    let mut mock = MockLedger::new();
    mock.expect_get_allowance().never();
    mock.expect_submit().never();

    let ledger = Arc::new(mock);
    let executor = SwapExecutor::new(
        Arc::clone(&ledger),
        Arc::new(DecimalsCache::new(ledger)),
        wallet(),
        SUNSWAP_V2_ROUTER,
        GAS_LIMIT,
    );
    let err = executor.execute_swap(dec!(0), &usdt_sun()).await.unwrap_err();
    assert!(matches!(err, TradeError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_each_attempt_gets_a_fresh_deadline() {
    let deadlines = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&deadlines);

    let mut mock = MockLedger::new();
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::MAX));
    mock.expect_simulate_amounts_out()
        .returning(|amount, _| Ok(vec![amount, sun(200)]));
    mock.expect_submit().times(2).returning(move |call, _, _| {
        if let ContractCall::SwapExactTokensForTokens { deadline, .. } = call {
            captured.lock().unwrap().push(*deadline);
        }
        Ok(PendingTx { tx_hash: B256::repeat_byte(7) })
    });
    expect_receipts(&mut mock, ReceiptStatus::Failure);

    let ledger = Arc::new(mock);
    let executor = SwapExecutor::new(
        Arc::clone(&ledger),
        Arc::new(DecimalsCache::new(ledger)),
        wallet(),
        SUNSWAP_V2_ROUTER,
        GAS_LIMIT,
    );

    let route = usdt_sun();
    let first = executor.execute_swap(dec!(1), &route).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = executor.execute_swap(dec!(1), &route).await.unwrap();

    assert!(second.order.deadline > first.order.deadline);
    let deadlines = deadlines.lock().unwrap();
    assert_eq!(deadlines.len(), 2);
    assert!(deadlines[1] > deadlines[0]);
}

// ---- TradingLoop ----

#[tokio::test]
async fn test_run_swaps_exactly_once_on_third_poll() {
    let one_usdt = usdt(1);
    let swaps = Arc::new(AtomicUsize::new(0));
    let swap_count = Arc::clone(&swaps);

    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .times(3)
        .withf(move |amount, _| *amount == one_usdt)
        .returning(falling_price_quotes());
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::MAX));
    mock.expect_simulate_amounts_out()
        .times(1)
        .withf(|amount, _| *amount == usdt(2))
        .returning(|amount, _| Ok(vec![amount, sun(400)]));
    mock.expect_submit()
        .times(1)
        .withf(|call, _, _| is_swap(call))
        .returning(move |_, _, _| {
            swap_count.fetch_add(1, Ordering::SeqCst);
            Ok(PendingTx { tx_hash: B256::repeat_byte(8) })
        });
    expect_receipts(&mut mock, ReceiptStatus::Success);

    let mut trading = TradingLoop::new(Arc::new(mock), settings(false));
    let report = trading
        .run(&usdt_sun(), dec!(0.0054), dec!(2), Duration::from_millis(1))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Swapped);
    assert_eq!(report.polls, 3);
    assert_eq!(report.trigger_price, Some(dec!(0.005)));
    assert_eq!(swaps.load(Ordering::SeqCst), 1);
    assert_eq!(
        report.order.unwrap().minimum_amount_out,
        U256::from(396_800_000_000_000_000_000u128)
    );
    assert_eq!(report.last_receipt.unwrap().tx_hash, B256::repeat_byte(8));
}

#[tokio::test]
async fn test_run_reports_rejected_swap_with_receipt() {
    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .returning(|amount, _| Ok(vec![amount, sun(200)]));
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::MAX));
    mock.expect_submit()
        .times(1)
        .returning(|_, _, _| Ok(PendingTx { tx_hash: B256::repeat_byte(9) }));
    expect_receipts(&mut mock, ReceiptStatus::Failure);

    let mut trading = TradingLoop::new(Arc::new(mock), settings(false));
    let err = trading
        .run(&usdt_sun(), dec!(0.0054), dec!(1), Duration::from_millis(1))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::SwapRejected { .. }));
    assert_eq!(err.stage(), Some(Stage::Swap));
    assert_eq!(err.receipt().unwrap().tx_hash, B256::repeat_byte(9));
}

#[tokio::test]
async fn test_swap_failure_after_approval_keeps_approval_receipt() {
    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .returning(|amount, _| Ok(vec![amount, sun(200)]));
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::ZERO));
    mock.expect_submit()
        .times(1)
        .withf(|call, _, _| is_approve(call))
        .returning(|_, _, _| Ok(PendingTx { tx_hash: B256::repeat_byte(0xaa) }));
    mock.expect_submit()
        .times(1)
        .withf(|call, _, _| is_swap(call))
        .returning(|_, _, _| Err(anyhow::anyhow!("nonce too low")));
    expect_receipts(&mut mock, ReceiptStatus::Success);

    let mut trading = TradingLoop::new(Arc::new(mock), settings(false));
    let err = trading
        .run(&usdt_sun(), dec!(0.0054), dec!(1), Duration::from_millis(1))
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::AfterApproval { .. }));
    assert_eq!(err.stage(), Some(Stage::Swap));
    let approval = err.receipt().expect("approval receipt kept");
    assert_eq!(approval.tx_hash, B256::repeat_byte(0xaa));
    assert!(approval.is_success());
    assert!(format!("{err}").contains("nonce too low"));
}

#[tokio::test]
async fn test_swap_failure_without_approval_is_unwrapped() {
    let mut mock = MockLedger::new();
    mock.expect_get_allowance().returning(|_, _, _| Ok(U256::MAX));
    mock.expect_simulate_amounts_out()
        .returning(|_, _| Err(anyhow::anyhow!("execution reverted")));
    mock.expect_submit().never();

    let ledger = Arc::new(mock);
    let executor = SwapExecutor::new(
        Arc::clone(&ledger),
        Arc::new(DecimalsCache::new(ledger)),
        wallet(),
        SUNSWAP_V2_ROUTER,
        GAS_LIMIT,
    );
    let err = executor.execute_swap(dec!(1), &usdt_sun()).await.unwrap_err();
    assert!(matches!(err, TradeError::TransientQuery { stage: Stage::Quote, .. }));
    assert!(err.receipt().is_none());
}

#[tokio::test]
async fn test_dry_run_submits_nothing() {
    let mut mock = MockLedger::new();
    mock.expect_simulate_amounts_out()
        .returning(|amount, _| Ok(vec![amount, sun(200)]));
    mock.expect_get_allowance().never();
    mock.expect_submit().never();

    let mut trading = TradingLoop::new(Arc::new(mock), settings(true));
    let report = trading
        .run(&usdt_sun(), dec!(0.0054), dec!(1), Duration::from_millis(1))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::DryRun);
    assert!(report.last_receipt.is_none());
    assert_eq!(
        report.order.unwrap().minimum_amount_out,
        U256::from(198_400_000_000_000_000_000u128)
    );
}

#[tokio::test]
async fn test_shutdown_cancels_monitoring() {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let mut mock = MockLedger::new();
    // 0.01 USDT/SUN, above the threshold.
    mock.expect_simulate_amounts_out()
        .times(1)
        .returning(|amount, _| Ok(vec![amount, sun(100)]));
    mock.expect_submit().never();

    let mut trading = TradingLoop::new(Arc::new(mock), settings(false)).with_shutdown(shutdown_rx);
    shutdown_tx.send(()).unwrap();

    let report = trading
        .run(&usdt_sun(), dec!(0.0054), dec!(1), Duration::from_secs(3600))
        .await
        .unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.polls, 1);
}
