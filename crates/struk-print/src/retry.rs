// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded retry of transport attempts.
//
// Each job gets at most `max_attempts` sessions. Errors are classified into
// Transient (retry after a fixed backoff), UserAction and Permanent (stop
// at once). A missing radio and revoked permission are never retried, and
// a revoked permission is reported as its own outcome.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use struk_bridge::traits::RadioProvider;
use struk_core::config::{AppConfig, PacingConfig};
use struk_core::error::{Result, StrukError};
use struk_core::types::{ErrorClass, JobId};

use crate::job::PrintJob;
use crate::session::{Endpoint, TransportSession};

/// Hard ceiling on sessions per job, whatever the config says.
pub const MAX_ATTEMPTS: u32 = 2;

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to `1..=MAX_ATTEMPTS`.
    pub fn from_config(config: &AppConfig) -> Self {
        let max_attempts = config.max_attempts.clamp(1, MAX_ATTEMPTS);
        if max_attempts != config.max_attempts {
            warn!(configured = config.max_attempts, using = max_attempts, "max_attempts out of range");
        }
        Self {
            max_attempts,
            backoff: config.pacing.backoff(),
        }
    }

    /// Delay before the attempt after `attempt`, or `None` when `attempt`
    /// was the last one allowed.
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then_some(self.backoff)
    }
}

/// Classify a `StrukError` into an `ErrorClass` for retry decisions.
pub fn classify_error(err: &StrukError) -> ErrorClass {
    match err {
        // Transient: the link dropped or never came up
        StrukError::Connect(_) => ErrorClass::Transient,
        StrukError::Write(_) => ErrorClass::Transient,
        StrukError::Bridge(_) => ErrorClass::Transient,

        // User action needed
        StrukError::AuthorizationDenied => ErrorClass::UserAction,

        // Permanent: nothing a second attempt could change
        StrukError::NoAdapter => ErrorClass::Permanent,
        StrukError::PlatformUnavailable => ErrorClass::Permanent,
        StrukError::NoAddress => ErrorClass::Permanent,
        StrukError::NoOrder => ErrorClass::Permanent,
        StrukError::InvalidArguments(_) => ErrorClass::Permanent,
        StrukError::Encode(_) => ErrorClass::Permanent,
        StrukError::Superseded => ErrorClass::Permanent,
        StrukError::WorkerStopped => ErrorClass::Permanent,
        StrukError::NotImplemented(_) => ErrorClass::Permanent,
        StrukError::Serialization(_) => ErrorClass::Permanent,

        // IO errors depend on the kind
        StrukError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorClass::UserAction,
            std::io::ErrorKind::NotFound => ErrorClass::Permanent,
            _ => ErrorClass::Transient,
        },
    }
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure(StrukError),
    FatalFailure(StrukError),
}

impl AttemptOutcome {
    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) if classify_error(&e) == ErrorClass::Transient => Self::RetryableFailure(e),
            Err(e) => Self::FatalFailure(e),
        }
    }
}

/// States of one job's retry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting(u32),
    Succeeded,
    Failed,
}

/// Terminal outcome of a job.
#[derive(Debug)]
pub struct JobReport {
    pub job_id: JobId,
    /// Attempts actually made.
    pub attempts: u32,
    /// `Err` holds the last error observed.
    pub result: Result<()>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives transport sessions for one job at a time.
pub struct RetryController {
    radio: Arc<dyn RadioProvider>,
    policy: RetryPolicy,
    pacing: PacingConfig,
    service: Uuid,
    fallback_channel: u8,
}

impl RetryController {
    pub fn new(radio: Arc<dyn RadioProvider>, config: &AppConfig) -> Result<Self> {
        let service = Uuid::parse_str(&config.service_uuid).map_err(|e| {
            StrukError::InvalidArguments(format!("service_uuid '{}': {e}", config.service_uuid))
        })?;
        Ok(Self {
            radio,
            policy: RetryPolicy::from_config(config),
            pacing: config.pacing,
            service,
            fallback_channel: config.fallback_channel,
        })
    }

    /// Run `job` to a terminal state. Never more than `max_attempts` sessions.
    pub fn run(&self, job: &PrintJob) -> JobReport {
        let mut state = RetryState::Attempting(1);
        let mut attempts = 0;
        let mut last_error = None;

        loop {
            state = match state {
                RetryState::Attempting(n) => {
                    attempts = n;
                    match self.attempt(job) {
                        AttemptOutcome::Success => RetryState::Succeeded,
                        AttemptOutcome::FatalFailure(e) => {
                            error!(job_id = %job.id, attempt = n, error = %e, "print attempt failed, not retrying");
                            last_error = Some(e);
                            RetryState::Failed
                        }
                        AttemptOutcome::RetryableFailure(e) => {
                            warn!(job_id = %job.id, attempt = n, error = %e, "print attempt failed");
                            last_error = Some(e);
                            match self.policy.backoff_after(n) {
                                Some(delay) => {
                                    debug!(job_id = %job.id, delay_ms = delay.as_millis() as u64, "scheduling retry");
                                    thread::sleep(delay);
                                    RetryState::Attempting(n + 1)
                                }
                                None => RetryState::Failed,
                            }
                        }
                    }
                }
                RetryState::Succeeded => {
                    info!(job_id = %job.id, attempts, "print job delivered");
                    return JobReport {
                        job_id: job.id,
                        attempts,
                        result: Ok(()),
                    };
                }
                RetryState::Failed => {
                    let e = last_error
                        .take()
                        .unwrap_or_else(|| StrukError::Connect("unknown error".into()));
                    error!(job_id = %job.id, attempts, error = %e, "all print attempts failed");
                    return JobReport {
                        job_id: job.id,
                        attempts,
                        result: Err(e),
                    };
                }
            };
        }
    }

    fn attempt(&self, job: &PrintJob) -> AttemptOutcome {
        let Some(adapter) = self.radio.adapter() else {
            return AttemptOutcome::FatalFailure(StrukError::NoAdapter);
        };
        let endpoint = Endpoint {
            address: job.address.clone(),
            service: self.service,
            fallback_channel: self.fallback_channel,
        };
        let result = TransportSession::open(adapter.as_ref(), &endpoint, self.pacing).and_then(
            |mut session| {
                let sent = session.send(&job.document);
                session.close();
                sent
            },
        );
        AttemptOutcome::from_result(result)
    }
}
