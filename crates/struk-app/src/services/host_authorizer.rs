// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Authorizer that delegates the prompt to the host over the method channel.
//
// Printing is authorized while both the platform authorizer and the host's
// last `authorizationResult` say so. A prompt is an outbound
// `requestAuthorization` event; the answer comes back as a method call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use struk_bridge::traits::Authorizer;
use struk_core::error::{Result, StrukError};
use struk_core::types::AuthorizationScope;

use crate::channel::{HostEvent, Outbound};

pub struct HostAuthorizer {
    platform: Arc<dyn Authorizer>,
    host_granted: AtomicBool,
    closed: AtomicBool,
    api_level: Option<u32>,
    outbound: UnboundedSender<Outbound>,
}

impl HostAuthorizer {
    pub fn new(
        platform: Arc<dyn Authorizer>,
        api_level: Option<u32>,
        outbound: UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            platform,
            host_granted: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            api_level,
            outbound,
        }
    }

    /// Record the host's latest answer.
    pub fn set_host_granted(&self, granted: bool) {
        self.host_granted.store(granted, Ordering::SeqCst);
    }

    /// Refuse all further prompts.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Authorizer for HostAuthorizer {
    fn is_authorized(&self) -> bool {
        self.host_granted.load(Ordering::SeqCst) && self.platform.is_authorized()
    }

    fn request_authorization(&self, scopes: &[AuthorizationScope]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StrukError::Bridge("host channel closed".into()));
        }
        info!(?scopes, "asking host for authorization");
        self.outbound
            .send(Outbound::Event(HostEvent::RequestAuthorization {
                scopes: scopes.to_vec(),
            }))
            .map_err(|_| StrukError::Bridge("host channel closed".into()))
    }

    fn required_scopes(&self) -> Vec<AuthorizationScope> {
        AuthorizationScope::for_api_level(self.api_level)
    }
}

#[cfg(test)]
mod tests {
    use struk_bridge::memory::ManualAuthorizer;
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn needs_both_platform_and_host() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let platform = Arc::new(ManualAuthorizer::granted());
        let auth = HostAuthorizer::new(platform.clone(), None, tx);
        assert!(auth.is_authorized());

        auth.set_host_granted(false);
        assert!(!auth.is_authorized());

        auth.set_host_granted(true);
        platform.set_granted(false);
        assert!(!auth.is_authorized());
    }

    #[test]
    fn scopes_follow_api_level() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let legacy = HostAuthorizer::new(Arc::new(ManualAuthorizer::granted()), Some(30), tx.clone());
        assert_eq!(legacy.required_scopes(), vec![AuthorizationScope::FineLocation]);

        let modern = HostAuthorizer::new(Arc::new(ManualAuthorizer::granted()), Some(31), tx);
        assert_eq!(
            modern.required_scopes(),
            vec![AuthorizationScope::BluetoothScan, AuthorizationScope::BluetoothConnect]
        );
    }

    #[test]
    fn prompt_is_an_outbound_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let auth = HostAuthorizer::new(Arc::new(ManualAuthorizer::granted()), None, tx);
        auth.request_authorization(&[AuthorizationScope::BluetoothConnect])
            .expect("request");
        assert_eq!(
            rx.try_recv().expect("event"),
            Outbound::Event(HostEvent::RequestAuthorization {
                scopes: vec![AuthorizationScope::BluetoothConnect]
            })
        );

        drop(rx);
        assert!(auth.request_authorization(&[]).is_err());
    }

    #[test]
    fn closed_authorizer_refuses_prompts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let auth = HostAuthorizer::new(Arc::new(ManualAuthorizer::granted()), None, tx);
        auth.close();
        assert!(auth.request_authorization(&[AuthorizationScope::BluetoothConnect]).is_err());
        assert!(rx.try_recv().is_err());
    }
}
