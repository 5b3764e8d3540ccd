use std::path::PathBuf;
use std::sync::{Arc, Once};

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use confsync_core::{NullRemote, SyncConfig, SyncEngine, SyncEvent};
use confsync_daemon::SyncScheduler;

static LOGGING_INIT: Once = Once::new();

const DEFAULT_CONFIG_FILE: &str = "confsync.toml";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = SyncConfig::from_file(&config_path)?;
    config.validate()?;

    let engine = Arc::new(SyncEngine::new(config, Arc::new(NullRemote)));
    let scheduler = SyncScheduler::new(Arc::clone(&engine));

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::SyncStarted(op)) => {
                    info!("sync {} started ({:?})", op.id, op.kind);
                }
                Ok(SyncEvent::SyncCompleted(op)) => {
                    info!("sync {} completed with {} change(s)", op.id, op.changes.len());
                }
                Ok(SyncEvent::SyncFailed(op)) => {
                    warn!(
                        "sync {} failed: {}",
                        op.id,
                        op.error.as_deref().unwrap_or("unknown error")
                    );
                }
                Ok(SyncEvent::ConflictResolved(conflict)) => {
                    info!("conflict on {} resolved", conflict.path.display());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("event stream lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    scheduler.start().await?;
    info!("confsync daemon running, press ctrl-c to stop");

    signal::ctrl_c().await?;
    info!("shutting down");
    if let Err(err) = scheduler.stop().await {
        error!("shutdown failed: {}", err);
    }

    Ok(())
}

fn init_logging() {
    LOGGING_INIT.call_once(|| {
        let builder = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
            .with_target(false)
            .with_span_events(FmtSpan::NONE);

        let _ = builder.try_init();
    });
}
