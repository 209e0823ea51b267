//! Run — wire the filesystem watcher to the dispatcher and loop until
//! shutdown.
//!
//! Single consumer: each notification is handled to completion before the
//! next one is looked at, so reads of the same file never overlap and an
//! in-flight insert finishes its transaction before shutdown is observed.

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ShipperConfig;
use crate::runtime::stop::shutdown_signal;
use crate::store::Gateway;
use crate::tail::Dispatcher;

/// Watch the configured directories and ship new log lines until a
/// shutdown signal arrives. Releases the database session on the way out.
pub async fn run(
    config: ShipperConfig,
    gateway: Gateway,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut dispatcher = Dispatcher::new(gateway);

    // The notify callback runs on the watcher's own thread; it only
    // forwards events into the channel the async loop drains.
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
        match result {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => warn!("watch error: {}", e),
        }
    })?;

    for dir in config.watch_dirs() {
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!("Watching directory: {}", dir.display());
    }
    info!("Log shipper is ready; press Ctrl+C to shut down");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            event = rx.recv() => match event {
                Some(event) if event.kind.is_modify() => {
                    for path in &event.paths {
                        dispatcher.handle_modify(path).await;
                    }
                }
                Some(_) => {} // create/remove/access events are not tail triggers
                None => {
                    warn!("watcher channel closed, stopping");
                    break;
                }
            }
        }
    }

    drop(watcher);
    dispatcher.shutdown().await?;
    info!("Log monitoring stopped");
    Ok(())
}
