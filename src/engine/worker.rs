//! Timer trigger: runs a cycle on start, then once per interval until stopped

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::cycle::Engine;

/// Timer trigger: runs a cycle, sleeps, repeats
pub struct CycleWorker {
    engine: Arc<Engine>,
    interval: Duration,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl CycleWorker {
    pub fn new(engine: Arc<Engine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            shutdown_tx: None,
        }
    }

    /// Start the background loop
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let engine = Arc::clone(&self.engine);
        let interval = self.interval;

        tokio::spawn(async move {
            tracing::info!("Cycle worker started with interval {:?}", interval);

            loop {
                let report = engine.run_cycle().await;
                tracing::debug!(outcome = ?report.outcome, "Timer cycle finished");

                tracing::info!("Sleeping {} minutes...", interval.as_secs() / 60);
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            tracing::info!("Cycle worker stopped");
        })
    }

    /// Stop the background loop
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}
