// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Admission gate in front of the print worker.
//
// With authorization in place a job goes straight to the worker and the
// caller is answered at once. Without it the job is parked in a single slot
// and an authorization prompt is started, unless one is already
// outstanding. A newer job replaces the parked one and the displaced caller
// is told so. When the prompt resolves the parked job is either handed to
// the worker or refused, and the slot is cleared in both cases.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use struk_bridge::traits::Authorizer;
use struk_core::error::{Result, StrukError};
use struk_core::types::JobId;

use crate::job::PrintJob;
use crate::worker::PrintWorker;

/// Positive answer to a print request: the job is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub job_id: JobId,
}

/// What the gate did with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Handed to the worker; the caller has been answered.
    Queued,
    /// Parked until the authorization prompt resolves.
    Parked,
    /// The worker refused it; the caller has been answered with the error.
    Rejected,
}

/// One-shot reply channel back to the caller.
pub type ResponseSink = oneshot::Sender<Result<Accepted>>;

struct PendingJob {
    job: PrintJob,
    sink: ResponseSink,
    parked_at: DateTime<Utc>,
}

#[derive(Default)]
struct GateState {
    pending: Option<PendingJob>,
    awaiting_authorization: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn respond(sink: ResponseSink, result: Result<Accepted>) {
    if sink.send(result).is_err() {
        debug!("caller dropped before the response was ready");
    }
}

pub struct AdmissionGate {
    authorizer: Arc<dyn Authorizer>,
    worker: Arc<PrintWorker>,
    state: Mutex<GateState>,
}

impl AdmissionGate {
    pub fn new(authorizer: Arc<dyn Authorizer>, worker: Arc<PrintWorker>) -> Self {
        Self {
            authorizer,
            worker,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Admit `job`, answering on `sink` now or when authorization resolves.
    pub fn admit(&self, job: PrintJob, sink: ResponseSink) -> Admission {
        let mut state = lock(&self.state);

        if self.authorizer.is_authorized() {
            // Submitting under the lock orders this job against a resume.
            let result = self.worker.submit(job).map(|job_id| Accepted { job_id });
            drop(state);
            let admission = if result.is_ok() {
                Admission::Queued
            } else {
                Admission::Rejected
            };
            respond(sink, result);
            return admission;
        }

        let job_id = job.id;
        let displaced = state.pending.replace(PendingJob {
            job,
            sink,
            parked_at: Utc::now(),
        });
        let prompt = !state.awaiting_authorization;
        state.awaiting_authorization = true;
        drop(state);

        if let Some(old) = displaced {
            info!(job_id = %old.job.id, replaced_by = %job_id, "parked print job superseded");
            respond(old.sink, Err(StrukError::Superseded));
        }
        info!(job_id = %job_id, "print job parked awaiting authorization");

        if prompt {
            let scopes = self.authorizer.required_scopes();
            if let Err(e) = self.authorizer.request_authorization(&scopes) {
                warn!(error = %e, "authorization request could not be started");
                self.on_authorization_result(false);
            }
        }
        Admission::Parked
    }

    /// Resolve the outstanding prompt. Returns the id of a resumed job.
    pub fn on_authorization_result(&self, granted: bool) -> Option<JobId> {
        let mut state = lock(&self.state);
        state.awaiting_authorization = false;
        let Some(pending) = state.pending.take() else {
            debug!(granted, "authorization resolved with nothing parked");
            return None;
        };
        let waited_ms = (Utc::now() - pending.parked_at).num_milliseconds();

        if granted {
            let result = self.worker.submit(pending.job).map(|job_id| Accepted { job_id });
            drop(state);
            let resumed = result.as_ref().ok().map(|a| a.job_id);
            if let Some(id) = resumed {
                info!(job_id = %id, waited_ms, "authorization granted, parked job queued");
            }
            respond(pending.sink, result);
            resumed
        } else {
            drop(state);
            info!(job_id = %pending.job.id, waited_ms, "authorization denied, parked job dropped");
            respond(pending.sink, Err(StrukError::AuthorizationDenied));
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    pub fn pending_job_id(&self) -> Option<JobId> {
        lock(&self.state).pending.as_ref().map(|p| p.job.id)
    }

    pub fn awaiting_authorization(&self) -> bool {
        lock(&self.state).awaiting_authorization
    }

    pub fn worker(&self) -> &PrintWorker {
        &self.worker
    }
}
