//! TRADENET: confidence-boosted, plan-gated signal execution
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the persistent stores and runs the boost → gate → dispatch →
//! learn loop until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use tradenet::broker::webhook::WebhookBroker;
use tradenet::broker::{DryRunBroker, OrderPlacer};
use tradenet::config::{self, CycleConfig};
use tradenet::engine::cycle::{Collaborators, Pipeline, PipelineOptions, Stores};
use tradenet::engine::tracker::PlaceholderSettlement;
use tradenet::engine::CancelToken;
use tradenet::notify::telegram::TelegramNotifier;
use tradenet::notify::{LogNotifier, Notifier};
use tradenet::signals::JsonFileSignalSource;
use tradenet::types::CycleReport;

const CONFIG_PATH: &str = "config.toml";

const BANNER: &str = r#"
 _____ ____      _    ____  _____ _   _ _____ _____
|_   _|  _ \    / \  |  _ \| ____| \ | | ____|_   _|
  | | | |_) |  / _ \ | | | |  _| |  \| |  _|   | |
  | | |  _ <  / ___ \| |_| | |___| |\  | |___  | |
  |_| |_| \_\/_/   \_\____/|_____|_| \_|_____| |_|

  Signal boosting · plan gating · pattern memory
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load(CONFIG_PATH)?;
    init_logging();

    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        cycle_interval_secs = cfg.agent.cycle_interval_secs,
        data_dir = %cfg.storage.data_dir.display(),
        dry_run = cfg.execution.dry_run,
        "TRADENET starting up"
    );

    // -- Initialise components -------------------------------------------

    let timeout = Duration::from_millis(cfg.execution.collaborator_timeout_ms);

    let broker: Arc<dyn OrderPlacer> = match (cfg.execution.dry_run, cfg.broker.webhook_url.as_deref()) {
        (false, Some(url)) => {
            info!(url, "Orders routed to webhook broker");
            Arc::new(WebhookBroker::new(url, timeout)?)
        }
        (false, None) => {
            warn!("dry_run disabled but no webhook_url configured, staging orders locally");
            Arc::new(DryRunBroker::new())
        }
        (true, _) => Arc::new(DryRunBroker::new()),
    };

    let notifier: Arc<dyn Notifier> = match (
        cfg.notifier.telegram_bot_token_env.as_deref(),
        cfg.notifier.telegram_chat_id_env.as_deref(),
    ) {
        (Some(token_env), Some(chat_env)) => match TelegramNotifier::from_env(token_env, chat_env, timeout) {
            Ok(telegram) => {
                info!("Telegram notifications enabled");
                Arc::new(telegram)
            }
            Err(e) => {
                warn!(error = %e, "Telegram unavailable, notifications go to the log");
                Arc::new(LogNotifier)
            }
        },
        _ => Arc::new(LogNotifier),
    };

    warn!("Outcomes come from the placeholder settlement rule, not market fills");

    let pipeline = Pipeline::new(
        Collaborators {
            source: Arc::new(JsonFileSignalSource::new(&cfg.signals.path)),
            broker,
            notifier,
            settlement: Arc::new(PlaceholderSettlement),
        },
        Stores::open(&cfg.storage),
        PipelineOptions {
            collaborator_timeout: timeout,
            weights_path: Some(cfg.storage.weights_path()),
        },
    );

    // -- Main loop -------------------------------------------------------

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received.");
                cancel.cancel();
            }
        });
    }

    let mut cycle_config = cfg.cycle_config();
    let mut interval = tokio::time::interval(Duration::from_secs(cfg.agent.cycle_interval_secs));

    info!(
        interval_secs = cfg.agent.cycle_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    let mut cycles = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                cycle_config = reload_cycle_config(cycle_config);

                match pipeline.run_cycle_with_cancel(&cycle_config, &cancel).await {
                    Ok(report) => {
                        cycles += 1;
                        log_cycle_report(&report);
                    }
                    Err(e) => error!(error = format!("{e:#}"), "Cycle failed, continuing to next"),
                }

                if cancel.is_cancelled() {
                    break;
                }
                pipeline.resolve_pending().await;
                pipeline.refine_strategy();
            }
            _ = cancel.cancelled() => break,
        }
    }

    info!(
        cycles,
        executions = pipeline.stores().log.len(),
        patterns = pipeline.stores().memory.len(),
        "TRADENET shut down cleanly."
    );
    Ok(())
}

/// Re-read `[execution]` so mode and plan can change without a restart.
/// A config that fails to load keeps the previous cycle's settings.
fn reload_cycle_config(previous: CycleConfig) -> CycleConfig {
    match config::AppConfig::load(CONFIG_PATH) {
        Ok(cfg) => cfg.cycle_config(),
        Err(e) => {
            warn!(error = format!("{e:#}"), "Config reload failed, keeping previous settings");
            previous
        }
    }
}

fn log_cycle_report(report: &CycleReport) {
    info!(
        cycle_id = %report.cycle_id,
        mode = %report.mode,
        plan = %report.plan,
        threshold = %report.threshold,
        signals = report.signals_in,
        dispatched = report.dispatched.len(),
        queued = report.queued_for_approval,
        wins = report.wins,
        losses = report.losses,
        learned = report.patterns_learned,
        cancelled = report.cancelled,
        "Cycle complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tradenet=info"));

    let json_logging = std::env::var("TRADENET_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
