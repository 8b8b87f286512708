// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where no radio is available.
//
// Permissions are always granted (there is nothing to ask) and the radio is
// always absent, so every print attempt ends in `NoAdapter`.

use std::sync::Arc;

use struk_core::error::Result;
use struk_core::types::AuthorizationScope;

use crate::traits::{Authorizer, RadioProvider, TransportAdapter};

/// No-op bridge returned on platforms without a radio.
pub struct StubBridge;

impl Authorizer for StubBridge {
    fn is_authorized(&self) -> bool {
        true
    }

    fn request_authorization(&self, _scopes: &[AuthorizationScope]) -> Result<()> {
        tracing::warn!("Authorizer::request_authorization called on stub bridge");
        Ok(())
    }
}

impl RadioProvider for StubBridge {
    fn adapter(&self) -> Option<Arc<dyn TransportAdapter>> {
        tracing::debug!("RadioProvider::adapter called on stub bridge");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_has_no_radio_but_is_authorized() {
        assert!(StubBridge.adapter().is_none());
        assert!(StubBridge.is_authorized());
        assert!(StubBridge.request_authorization(&[]).is_ok());
    }
}
