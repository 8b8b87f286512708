// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A print job: an encoded document bound for one printer address.
//
// Encoding happens when the job is built, before admission, so a document
// that cannot be encoded is rejected to the caller and never reaches the
// worker.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use struk_core::error::{Result, StrukError};
use struk_core::types::{JobId, JobKind, PrintRequest};
use struk_document::{encode_order, encode_test, hash_bytes};

/// A fully encoded job ready for the worker.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: JobId,
    pub kind: JobKind,
    pub address: String,
    /// Complete ESC/POS document. Shared so retries never copy it.
    pub document: Arc<[u8]>,
    /// SHA-256 of `document`, for log correlation.
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    /// Validate the target address and encode the request.
    pub fn encode(request: &PrintRequest) -> Result<Self> {
        let address = request.address().trim();
        if address.is_empty() {
            return Err(StrukError::NoAddress);
        }

        let document = match request {
            PrintRequest::Test(receipt) => encode_test(receipt),
            PrintRequest::Order(receipt) => encode_order(&receipt.order, &receipt.business)?,
        };

        let job = Self {
            id: JobId::new(),
            kind: request.kind(),
            address: address.to_owned(),
            digest: hash_bytes(&document),
            document: document.into(),
            created_at: Utc::now(),
        };
        debug!(job_id = %job.id, kind = %job.kind, bytes = job.document.len(), digest = %job.digest, "job encoded");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use struk_core::types::{BusinessInfo, Order, OrderReceipt, TestReceipt};

    fn test_request(address: &str) -> PrintRequest {
        PrintRequest::Test(TestReceipt {
            address: address.into(),
            paper_width_mm: 58,
            business: BusinessInfo::default(),
        })
    }

    #[test]
    fn blank_address_is_rejected() {
        assert!(matches!(
            PrintJob::encode(&test_request("  ")),
            Err(StrukError::NoAddress)
        ));
    }

    #[test]
    fn test_job_carries_document_and_digest() {
        let job = PrintJob::encode(&test_request(" AA:BB ")).expect("encode");
        assert_eq!(job.kind, JobKind::Test);
        assert_eq!(job.address, "AA:BB");
        assert_eq!(job.digest, hash_bytes(&job.document));
        assert!(job.document.starts_with(&[0x1B, 0x40]));
    }

    #[test]
    fn unencodable_order_never_becomes_a_job() {
        let request = PrintRequest::Order(OrderReceipt {
            address: "AA:BB".into(),
            business: BusinessInfo::default(),
            order: Order {
                id: json!([1, 2]),
                customer_name: String::new(),
                order_date_raw: String::new(),
                payment_method: String::new(),
                items: Vec::new(),
                total_amount: json!(0),
            },
        });
        assert!(matches!(PrintJob::encode(&request), Err(StrukError::Encode(_))));
    }
}
