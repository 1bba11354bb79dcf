//! Main runtime manager.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::poller::{PollingLoop, Sources};

/// Owns the background polling task and its stop signal.
pub struct Runtime {
    config: RuntimeConfig,
    sources: Sources,
    /// Handle to the polling task.
    poller_handle: Option<JoinHandle<()>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (for cloning to the loop).
    shutdown_rx: watch::Receiver<bool>,
    started: bool,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, sources: Sources) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            sources,
            poller_handle: None,
            shutdown_tx,
            shutdown_rx,
            started: false,
        }
    }

    /// Spawn the polling loop.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(RuntimeError::AlreadyStarted);
        }

        info!("Starting runtime");

        let mut polling = PollingLoop::new(
            self.config.clone(),
            self.sources.clone(),
            self.shutdown_rx.clone(),
        );
        let handle = tokio::spawn(async move {
            polling.run().await;
        });

        self.poller_handle = Some(handle);
        self.started = true;

        debug!("Runtime started");

        Ok(())
    }

    /// Signal the loop to stop and wait for it.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Err(RuntimeError::NotStarted);
        }

        info!("Shutting down runtime");

        self.shutdown_tx.send(true).map_err(|e| {
            RuntimeError::Shutdown(format!("failed to send shutdown signal: {}", e))
        })?;

        if let Some(handle) = self.poller_handle.take() {
            debug!("Waiting for polling loop to stop");
            handle
                .await
                .map_err(|e| RuntimeError::Shutdown(format!("polling task panicked: {}", e)))?;
        }

        self.started = false;

        info!("Runtime stopped");

        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.started {
            let _ = self.shutdown_tx.send(true);
        }
    }
}
