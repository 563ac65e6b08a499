//! Full-cycle scenarios: gating, learning loop, failures, cancellation
//! and concurrent cycles over shared stores.

use std::sync::Arc;
use std::time::Duration;

use tradenet::config::CycleConfig;
use tradenet::engine::cycle::{Collaborators, Pipeline, PipelineOptions, Stores};
use tradenet::engine::tracker::PlaceholderSettlement;
use tradenet::engine::CancelToken;
use tradenet::memory::PatternKey;
use tradenet::signals::StaticSignalSource;
use tradenet::types::*;

use crate::mock_collaborators::{batch, MockBroker, MockNotifier};

struct Harness {
    pipeline: Pipeline,
    source: Arc<StaticSignalSource>,
    broker: MockBroker,
    notifier: MockNotifier,
}

fn harness_with(broker: MockBroker, stores: Stores, timeout: Duration) -> Harness {
    let source = Arc::new(StaticSignalSource::default());
    let notifier = MockNotifier::new();
    let pipeline = Pipeline::new(
        Collaborators {
            source: source.clone(),
            broker: Arc::new(broker.clone()),
            notifier: Arc::new(notifier.clone()),
            settlement: Arc::new(PlaceholderSettlement),
        },
        stores,
        PipelineOptions {
            collaborator_timeout: timeout,
            weights_path: None,
        },
    );
    Harness {
        pipeline,
        source,
        broker,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(MockBroker::new(), Stores::in_memory(), Duration::from_secs(1))
}

fn lite_auto() -> CycleConfig {
    CycleConfig::new(ExecutionMode::Auto, PlanTier::Lite)
}

// ---------------------------------------------------------------------------
// Gating scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_lite_plan_rejects_68() {
    let h = harness();
    h.source.set(batch(&[("BTCUSDT", Direction::Buy, 65, "RSI oversold")]));

    let report = h.pipeline.run_cycle(&lite_auto()).await.unwrap();

    assert_eq!(report.boosted[0].confidence, 68);
    assert!(report.dispatched.is_empty());
    assert!(h.broker.orders().is_empty());
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_pattern_memory_gets_signal_dispatched() {
    let stores = Stores::in_memory();
    for _ in 0..3 {
        stores.memory.record_occurrence(&PatternKey::from("BTCUSDT_BUY_60+_rsi"));
    }
    let h = harness_with(MockBroker::new(), stores, Duration::from_secs(1));
    h.source.set(batch(&[("BTCUSDT", Direction::Buy, 65, "RSI oversold")]));

    let report = h.pipeline.run_cycle(&lite_auto()).await.unwrap();

    assert_eq!(report.dispatched.len(), 1);
    let orders = h.broker.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].confidence, 73);
    assert_eq!(orders[0].mode, ExecutionMode::Auto);
    assert!(orders[0].reason.starts_with("RSI oversold | OutcomeBoost 3%"));
    assert_eq!(h.notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_stale_approval_creates_nothing() {
    let h = harness();
    let manual = CycleConfig::new(ExecutionMode::Manual, PlanTier::Lite);

    h.source.set(batch(&[("ETHUSDT", Direction::Buy, 90, "MACD bullish")]));
    h.pipeline.run_cycle(&manual).await.unwrap();
    h.pipeline.approve("ETHUSDT").unwrap();

    h.source.set(batch(&[("BTCUSDT", Direction::Buy, 90, "RSI oversold")]));
    let report = h.pipeline.run_cycle(&manual).await.unwrap();

    assert!(report.dispatched.is_empty());
    assert!(report.has_event(|e| matches!(e, DispatchEvent::StaleApproval { symbol } if symbol == "ETHUSDT")));
    assert!(h.pipeline.stores().log.is_empty());
}

#[tokio::test]
async fn test_free_plan_blocks_everything() {
    let h = harness();
    h.source.set(batch(&[
        ("BTCUSDT", Direction::Buy, 100, "RSI oversold, MACD bullish, volume spike"),
        ("ETHUSDT", Direction::Sell, 99, "volume spike"),
    ]));

    let config = CycleConfig::new(ExecutionMode::Auto, PlanTier::Free);
    let report = h.pipeline.run_cycle(&config).await.unwrap();

    assert!(report.dispatched.is_empty());
    assert!(report.has_event(|e| matches!(e, DispatchEvent::TierBlocked { signals: 2, .. })));
    assert!(h.broker.orders().is_empty());
}

#[tokio::test]
async fn test_unknown_plan_uses_override() {
    let h = harness();
    h.source.set(batch(&[
        ("BTCUSDT", Direction::Buy, 70, "breakout"),
        ("ETHUSDT", Direction::Buy, 55, "breakout"),
    ]));

    let config = CycleConfig::new(ExecutionMode::Auto, PlanTier::parse("gold")).with_override(75);
    let report = h.pipeline.run_cycle(&config).await.unwrap();

    assert_eq!(report.threshold, Threshold::Min(75));
    // 70 + 7 = 77 passes, 55 + 0 = 55 does not
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].symbol, "BTCUSDT");
}

// ---------------------------------------------------------------------------
// Feedback loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_learning_loop_unlocks_pattern_boost() {
    let h = harness();
    let key = PatternKey::from("BTCUSDT_BUY_80+_rsi");
    h.source.set(batch(&[("BTCUSDT", Direction::Buy, 75, "RSI oversold")]));

    for cycle in 1..=3u64 {
        let report = h.pipeline.run_cycle(&lite_auto()).await.unwrap();
        assert_eq!(report.dispatched[0].confidence, 82);
        // 82 < 85: the placeholder calls it a loss, and it is still counted
        assert_eq!(report.losses, 1);
        assert_eq!(h.pipeline.stores().memory.get(&key), cycle);
    }

    let fourth = h.pipeline.run_cycle(&lite_auto()).await.unwrap();
    assert_eq!(fourth.dispatched[0].confidence, 87);
    assert_eq!(fourth.wins, 1);
    assert!(fourth.dispatched[0].reason.contains(&"PatternBoost 5%".to_string()));

    let weights = h.pipeline.refine_strategy();
    assert_eq!(weights["BTCUSDT"], 0.25);
}

#[tokio::test]
async fn test_stores_survive_restart() {
    let dir = std::env::temp_dir().join(format!("tradenet_it_{}", uuid::Uuid::new_v4()));
    let storage = tradenet::config::StorageConfig { data_dir: dir.clone() };

    {
        let h = harness_with(MockBroker::new(), Stores::open(&storage), Duration::from_secs(1));
        h.source.set(batch(&[("SOLUSDT", Direction::Buy, 90, "volume spike")]));
        h.pipeline.run_cycle(&lite_auto()).await.unwrap();
    }

    let reopened = Stores::open(&storage);
    assert_eq!(reopened.log.len(), 1);
    assert_eq!(reopened.log.records()[0].outcome, Outcome::Win);
    assert_eq!(reopened.memory.get(&PatternKey::from("SOLUSDT_BUY_80+_volume")), 1);
    assert_eq!(reopened.signal_log.entries()[0].action, "dispatched");

    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_broker_failure_non_fatal_and_not_learned() {
    let h = harness();
    h.broker.reject("BTCUSDT");
    h.source.set(batch(&[
        ("BTCUSDT", Direction::Buy, 90, "RSI oversold"),
        ("ETHUSDT", Direction::Buy, 90, "RSI oversold"),
    ]));

    let report = h.pipeline.run_cycle(&lite_auto()).await.unwrap();

    assert_eq!(report.dispatched.len(), 2);
    assert!(report.has_event(|e| matches!(e, DispatchEvent::OrderFailed { symbol, .. } if symbol == "BTCUSDT")));
    let btc = &report.dispatched[0];
    assert_eq!(btc.order_status, OrderStatus::Failed);

    let log = h.pipeline.stores().log.records();
    assert_eq!(log[0].outcome, Outcome::Pending);
    assert_eq!(log[1].outcome, Outcome::Win);
    assert_eq!(report.patterns_learned, 1);

    // both attempts were still announced
    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("FAILED"));
}

#[tokio::test]
async fn test_everything_failing_still_completes_cycle() {
    let h = harness();
    h.broker.set_error("exchange offline");
    h.notifier.set_error("chat offline");
    h.source.set(batch(&[("BTCUSDT", Direction::Buy, 95, "RSI oversold")]));

    let report = h.pipeline.run_cycle(&lite_auto()).await.unwrap();
    assert_eq!(report.dispatched.len(), 1);
    assert!(report.has_event(|e| matches!(e, DispatchEvent::OrderFailed { .. })));
    assert!(report.has_event(|e| matches!(e, DispatchEvent::NotifyFailed { .. })));
    assert_eq!(report.resolved(), 0);

    h.broker.clear_error();
    let next = h.pipeline.run_cycle(&lite_auto()).await.unwrap();
    assert_eq!(next.wins, 1);
    assert_eq!(h.broker.orders().len(), 1);
}

#[tokio::test]
async fn test_slow_broker_times_out() {
    let h = harness_with(
        MockBroker::slow(Duration::from_secs(5)),
        Stores::in_memory(),
        Duration::from_millis(50),
    );
    h.source.set(batch(&[("BTCUSDT", Direction::Buy, 95, "RSI oversold")]));

    let started = std::time::Instant::now();
    let report = h.pipeline.run_cycle(&lite_auto()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(report.has_event(|e| matches!(
        e,
        DispatchEvent::OrderFailed { error, .. } if error.contains("timed out")
    )));
}

// ---------------------------------------------------------------------------
// Cancellation and concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cancel_between_symbols() {
    let h = Arc::new(harness_with(
        MockBroker::slow(Duration::from_millis(200)),
        Stores::in_memory(),
        Duration::from_secs(2),
    ));
    h.source.set(batch(&[
        ("AAAUSDT", Direction::Buy, 95, "x"),
        ("BBBUSDT", Direction::Buy, 95, "x"),
        ("CCCUSDT", Direction::Buy, 95, "x"),
    ]));

    let cancel = CancelToken::new();
    let task = {
        let h = Arc::clone(&h);
        let cancel = cancel.clone();
        tokio::spawn(async move { h.pipeline.run_cycle_with_cancel(&lite_auto(), &cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let report = task.await.unwrap().unwrap();
    assert!(report.cancelled);
    // the symbol in flight finished; the rest never started
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(h.broker.orders().len(), 1);
    assert_eq!(h.pipeline.stores().log.len(), 1);
    assert!(report.has_event(|e| matches!(e, DispatchEvent::Cancelled { remaining: 2 })));
}

#[tokio::test]
async fn test_approval_during_cycle_carries_to_next_cycle() {
    let h = Arc::new(harness_with(
        MockBroker::slow(Duration::from_millis(300)),
        Stores::in_memory(),
        Duration::from_secs(2),
    ));
    let manual = CycleConfig::new(ExecutionMode::Manual, PlanTier::Lite);
    h.source.set(batch(&[
        ("BTCUSDT", Direction::Buy, 90, "RSI oversold"),
        ("ETHUSDT", Direction::Buy, 90, "MACD bullish"),
    ]));

    h.pipeline.run_cycle(&manual).await.unwrap();
    assert_eq!(h.pipeline.get_approval_queue().len(), 2);
    h.pipeline.approve("BTCUSDT").unwrap();

    let task = {
        let h = Arc::clone(&h);
        let manual = manual.clone();
        tokio::spawn(async move { h.pipeline.run_cycle(&manual).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.pipeline.approve("ETHUSDT").unwrap();

    let report = task.await.unwrap().unwrap();
    let symbols: Vec<_> = report.dispatched.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BTCUSDT"]);
    assert!(h.pipeline.stores().approvals.approved_symbols().contains("ETHUSDT"));
    assert!(h.pipeline.get_approval_queue().is_empty());

    let report = h.pipeline.run_cycle(&manual).await.unwrap();
    let symbols: Vec<_> = report.dispatched.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["ETHUSDT"]);
    assert!(h.pipeline.stores().approvals.approved().is_empty());
}

#[tokio::test]
async fn test_concurrent_cycles_do_not_lose_updates() {
    let h = Arc::new(harness());
    h.source.set(batch(&[
        ("BTCUSDT", Direction::Buy, 90, "RSI oversold"),
        ("ETHUSDT", Direction::Sell, 90, "MACD bullish"),
    ]));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.pipeline.run_cycle(&lite_auto()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stores = h.pipeline.stores();
    assert_eq!(stores.log.len(), 16);
    assert!(stores.log.awaiting_settlement().is_empty());
    let total: u64 = stores.memory.snapshot().values().sum();
    assert_eq!(total, 16);
}
