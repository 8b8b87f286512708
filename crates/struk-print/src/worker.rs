// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The single print worker.
//
// One named thread drains a FIFO channel and runs each job through the
// retry controller to completion before taking the next, so at most one
// transport session exists process-wide. Outcomes are logged and counted;
// callers were already answered at submission time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use tracing::{debug, info, warn};

use struk_core::error::{Result, StrukError};
use struk_core::types::JobId;

use crate::job::PrintJob;
use crate::retry::{JobReport, RetryController};

/// Counters for finished work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl WorkerStats {
    /// Jobs submitted but not yet finished.
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.succeeded)
            .saturating_sub(self.failed)
    }
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, report: &JobReport) {
        if report.succeeded() {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle to the worker thread. Dropping it drains the queue and joins.
pub struct PrintWorker {
    sender: Mutex<Option<mpsc::Sender<PrintJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl PrintWorker {
    /// Start the worker thread.
    pub fn spawn(controller: RetryController) -> Result<Self> {
        Self::spawn_with(controller, |_| {})
    }

    /// Start the worker thread, calling `on_report` after every job.
    pub fn spawn_with<F>(controller: RetryController, on_report: F) -> Result<Self>
    where
        F: Fn(&JobReport) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<PrintJob>();
        let counters = Arc::new(Counters::default());
        let thread_counters = counters.clone();

        let handle = thread::Builder::new()
            .name("print-worker".into())
            .spawn(move || {
                info!("print worker started");
                for job in receiver {
                    let queued_ms = (Utc::now() - job.created_at).num_milliseconds();
                    debug!(job_id = %job.id, kind = %job.kind, address = %job.address, queued_ms, "print job started");
                    let report = controller.run(&job);
                    thread_counters.record(&report);
                    on_report(&report);
                }
                info!("print worker stopped");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            counters,
        })
    }

    /// Enqueue `job` behind any earlier ones.
    pub fn submit(&self, job: PrintJob) -> Result<JobId> {
        let id = job.id;
        let guard = lock(&self.sender);
        let sender = guard.as_ref().ok_or(StrukError::WorkerStopped)?;
        // Counted before the send so a finished job is never ahead of it.
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).is_err() {
            self.counters.submitted.fetch_sub(1, Ordering::SeqCst);
            return Err(StrukError::WorkerStopped);
        }
        debug!(job_id = %id, "print job queued");
        Ok(id)
    }

    /// Snapshot of the counters. `succeeded + failed <= submitted` always
    /// holds in the result.
    pub fn stats(&self) -> WorkerStats {
        let succeeded = self.counters.succeeded.load(Ordering::SeqCst);
        let failed = self.counters.failed.load(Ordering::SeqCst);
        WorkerStats {
            submitted: self.counters.submitted.load(Ordering::SeqCst),
            succeeded,
            failed,
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.sender).is_some()
    }

    /// Stop accepting jobs, finish the queued ones, and join the thread.
    pub fn shutdown(&self) {
        drop(lock(&self.sender).take());
        if let Some(handle) = lock(&self.handle).take() {
            if handle.join().is_err() {
                warn!("print worker panicked");
            }
        }
    }
}

impl Drop for PrintWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use struk_bridge::memory::{MemoryAdapter, MemoryRadio};
    use struk_core::config::{AppConfig, PacingConfig};
    use struk_core::types::{BusinessInfo, PrintRequest, TestReceipt};

    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            pacing: PacingConfig::immediate(),
            ..AppConfig::default()
        }
    }

    fn job(address: &str) -> PrintJob {
        PrintJob::encode(&PrintRequest::Test(TestReceipt {
            address: address.into(),
            paper_width_mm: 58,
            business: BusinessInfo {
                name: address.into(),
                ..BusinessInfo::default()
            },
        }))
        .expect("encode")
    }

    #[test]
    fn jobs_run_in_submission_order() {
        let adapter = MemoryAdapter::new();
        let controller =
            RetryController::new(Arc::new(MemoryRadio::new(adapter.clone())), &config()).expect("controller");
        let worker = PrintWorker::spawn(controller).expect("spawn");

        let jobs: Vec<PrintJob> = ["A", "B", "C"].into_iter().map(job).collect();
        let expected: Vec<Vec<u8>> = jobs.iter().map(|j| j.document.to_vec()).collect();
        for j in jobs {
            worker.submit(j).expect("submit");
        }
        worker.shutdown();

        assert_eq!(adapter.written(), expected);
        assert_eq!(
            worker.stats(),
            WorkerStats {
                submitted: 3,
                succeeded: 3,
                failed: 0
            }
        );
    }

    #[test]
    fn failures_are_counted_and_reported() {
        let controller =
            RetryController::new(Arc::new(MemoryRadio::absent()), &config()).expect("controller");
        let (tx, rx) = channel();
        let worker = PrintWorker::spawn_with(controller, move |report| {
            let _ = tx.send(report.result.as_ref().map_err(StrukError::code).err());
        })
        .expect("spawn");

        worker.submit(job("AA")).expect("submit");
        assert_eq!(rx.recv().expect("report"), Some("NO_ADAPTER"));
        worker.shutdown();
        assert_eq!(worker.stats().failed, 1);
        assert_eq!(worker.stats().in_flight(), 0);
    }

    #[test]
    fn stats_never_show_more_finished_than_submitted() {
        let controller =
            RetryController::new(Arc::new(MemoryRadio::absent()), &config()).expect("controller");
        let worker = Arc::new(PrintWorker::spawn(controller).expect("spawn"));
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let poller = {
            let worker = worker.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut snapshots = 0u64;
                loop {
                    let stats = worker.stats();
                    assert!(stats.succeeded + stats.failed <= stats.submitted, "{stats:?}");
                    let _ = stats.in_flight();
                    snapshots += 1;
                    if done.load(Ordering::SeqCst) {
                        break snapshots;
                    }
                }
            })
        };

        let template = job("AA");
        for _ in 0..2000 {
            let mut next = template.clone();
            next.id = JobId::new();
            worker.submit(next).expect("submit");
        }
        worker.shutdown();
        done.store(true, Ordering::SeqCst);
        assert!(poller.join().expect("poller") > 0);
        assert_eq!(worker.stats().failed, 2000);
        assert_eq!(worker.stats().in_flight(), 0);
    }

    #[test]
    fn in_flight_saturates() {
        let stats = WorkerStats {
            submitted: 1,
            succeeded: 1,
            failed: 1,
        };
        assert_eq!(stats.in_flight(), 0);
    }

    #[test]
    fn submit_after_shutdown_is_refused() {
        let controller =
            RetryController::new(Arc::new(MemoryRadio::absent()), &config()).expect("controller");
        let worker = PrintWorker::spawn(controller).expect("spawn");
        worker.shutdown();
        assert!(!worker.is_running());
        assert!(matches!(worker.submit(job("AA")), Err(StrukError::WorkerStopped)));
    }
}
