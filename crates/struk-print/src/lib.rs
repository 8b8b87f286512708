// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Struk Print: admission, the serialized worker, bounded retry, and paced
// transport sessions. Built on the document encoder from `struk-document`
// and the collaborator traits from `struk-bridge`.

pub mod gate;
pub mod job;
pub mod retry;
pub mod session;
pub mod worker;

pub use gate::{Accepted, Admission, AdmissionGate, ResponseSink};
pub use job::PrintJob;
pub use retry::{JobReport, MAX_ATTEMPTS, RetryController, RetryPolicy};
pub use session::{Endpoint, TransportSession};
pub use worker::{PrintWorker, WorkerStats};
