use std::sync::Arc;

use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use stock_ledger as ledger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = ledger::config::load_config()?;
    ledger::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = ledger::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        ledger::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = ledger::events::EventSender::new(event_tx);
    let event_worker = tokio::spawn(ledger::events::process_events(event_rx));

    let (intake_tx, intake_rx) = mpsc::channel(cfg.intake_channel_capacity);
    let intake_worker = tokio::spawn(ledger::commands::intake::run_intake(
        intake_rx,
        db_arc.clone(),
        Arc::new(event_sender.clone()),
    ));

    let state = ledger::AppState::new(db_arc.clone(), cfg, event_sender);
    info!(
        environment = %state.config.environment,
        "Stock ledger started; intake channel ready"
    );

    // The intake sender would be handed to a transport adapter here. None
    // ships in this build, so the process idles until asked to stop.
    shutdown_signal().await;
    info!("Shutdown signal received, draining workers");

    drop(intake_tx);
    drop(state);
    let _ = intake_worker.await;
    let _ = event_worker.await;

    if let Ok(db) = Arc::try_unwrap(db_arc) {
        ledger::db::close_pool(db).await?;
    }
    info!("Stock ledger stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
