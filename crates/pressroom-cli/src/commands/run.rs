//! Run command implementation.
//!
//! Starts the externalizer service and the publish scheduler against one
//! store. Version ids read from stdin, one per line, are queued for
//! externalization; every successful run re-arms the publish timers.

use super::open_store;
use crate::config::Config;
use crate::error::Result;
use pressroom_domain::traits::Rescheduler;
use pressroom_domain::VersionId;
use pressroom_externalizer::{Externalizer, ExternalizerService};
use pressroom_publisher::PublishScheduler;
use pressroom_store::SqliteStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

/// Execute the run command until Ctrl+C.
pub async fn execute_run(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let destinations = config.destinations();
    tracing::info!(
        store = %config.store.path.display(),
        destinations = destinations.len(),
        "Starting pressroom"
    );

    let scheduler = PublishScheduler::new(
        Arc::clone(&store),
        Arc::new(destinations),
        config.publisher.clone(),
    );
    let engine = Externalizer::new(store, config.externalizer.clone())
        .with_rescheduler(Arc::new(scheduler.clone()));
    let service = ExternalizerService::start(engine);
    scheduler.reschedule();

    let (stop, stopped) = oneshot::channel::<()>();
    let timer = tokio::spawn({
        let scheduler = scheduler.clone();
        async move {
            scheduler
                .run(async {
                    let _ = stopped.await;
                })
                .await
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => submit(&service, line.trim()),
                Ok(None) => {
                    tracing::debug!("stdin closed, no further requests");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    let _ = stop.send(());
    if let Err(e) = timer.await {
        tracing::error!("Publish scheduler ended abnormally: {}", e);
    }
    service.shutdown().await;
    Ok(())
}

fn submit(service: &ExternalizerService<SqliteStore>, line: &str) {
    if line.is_empty() {
        return;
    }
    let version_id = match VersionId::from_string(line) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(input = line, "Ignoring request: {}", e);
            return;
        }
    };

    let handle = service.externalize_async(version_id);
    tokio::spawn(async move {
        match handle.wait().await {
            Ok(files) => tracing::info!(
                version_id = %version_id,
                artifacts = files.len(),
                "Externalized"
            ),
            Err(e) => tracing::error!(version_id = %version_id, "Externalization failed: {}", e),
        }
    });
}
