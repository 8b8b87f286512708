// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: builds the print pipeline once at startup and
// exposes the operations the method channel dispatches to.
//
// The worker is a plain thread and the gate answers through oneshot
// channels, so nothing here holds a lock across an await.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::{info, warn};

use struk_bridge::{PlatformBridge, platform_bridge};
use struk_core::AppConfig;
use struk_core::error::{Result, StrukError};
use struk_core::types::{BondedDevice, JobId, PrintRequest};
use struk_print::{Accepted, AdmissionGate, PrintJob, PrintWorker, RetryController, WorkerStats};

use super::host_authorizer::HostAuthorizer;
use crate::channel::Outbound;

/// Shared application services. Cheap to clone.
#[derive(Clone)]
pub struct AppServices {
    config: Arc<AppConfig>,
    bridge: PlatformBridge,
    authorizer: Arc<HostAuthorizer>,
    worker: Arc<PrintWorker>,
    gate: Arc<AdmissionGate>,
}

impl AppServices {
    /// Initialise with the bridge for this platform.
    pub fn init(config: AppConfig, outbound: UnboundedSender<Outbound>) -> Result<Self> {
        let bridge = platform_bridge(&config);
        Self::with_bridge(config, bridge, outbound)
    }

    pub fn with_bridge(
        config: AppConfig,
        bridge: PlatformBridge,
        outbound: UnboundedSender<Outbound>,
    ) -> Result<Self> {
        info!(bridge = bridge.name, devices = config.devices.len(), "initialising print pipeline");

        let controller = RetryController::new(bridge.radio.clone(), &config)?;
        let worker = Arc::new(PrintWorker::spawn(controller)?);
        let authorizer = Arc::new(HostAuthorizer::new(
            bridge.authorizer.clone(),
            config.platform_api_level,
            outbound,
        ));
        let gate = Arc::new(AdmissionGate::new(authorizer.clone(), worker.clone()));

        Ok(Self {
            config: Arc::new(config),
            bridge,
            authorizer,
            worker,
            gate,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Paired printers known to the radio.
    pub fn bonded_devices(&self) -> Result<Vec<BondedDevice>> {
        let adapter = self.bridge.radio.adapter().ok_or(StrukError::NoAdapter)?;
        adapter.bonded_devices()
    }

    /// Encode `request` and hand it to the gate. Resolves once the job is
    /// queued, parked and later resumed, or refused.
    pub async fn print(&self, request: PrintRequest) -> Result<Accepted> {
        let job = PrintJob::encode(&request)?;
        let (sink, reply) = oneshot::channel();
        let admission = self.gate.admit(job, sink);
        tracing::debug!(?admission, "print request admitted");
        reply.await.map_err(|_| StrukError::WorkerStopped)?
    }

    /// Deliver the host's answer to an authorization prompt.
    pub fn authorization_result(&self, granted: bool) -> Option<JobId> {
        self.authorizer.set_host_granted(granted);
        self.gate.on_authorization_result(granted)
    }

    pub fn stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    /// The host has gone away: no further prompts, and a parked job is
    /// refused.
    pub fn close_host(&self) {
        self.authorizer.close();
        if self.gate.has_pending() {
            warn!("host channel closed with a parked print job");
            self.gate.on_authorization_result(false);
        }
    }

    /// Close the host side, drain the worker, and join it. Blocks.
    pub fn shutdown(&self) {
        self.close_host();
        self.worker.shutdown();
        let stats = self.worker.stats();
        info!(
            submitted = stats.submitted,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "print pipeline stopped"
        );
    }
}
