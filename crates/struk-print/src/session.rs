// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One connection attempt to a printer.
//
// Opening cancels discovery, waits for the radio to settle, obtains a stream
// (service id first, channel number second when the adapter supports it)
// and connects. Sending writes, flushes, and waits for the controller to
// drain. Releasing closes the write half and the connection independently,
// then cools down before another session may open.
//
// The settle, drain, and cooldown pauses run on success and failure alike.
// Release happens in `Drop`, so a session cannot leak its connection or skip
// the cooldown on any exit path.

use std::thread;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use struk_bridge::traits::{RfcommStream, TransportAdapter};
use struk_core::config::PacingConfig;
use struk_core::error::{Result, StrukError};

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub address: String,
    pub service: Uuid,
    pub fallback_channel: u8,
}

/// An open, connected stream plus the pacing it must honour.
pub struct TransportSession {
    address: String,
    stream: Option<Box<dyn RfcommStream>>,
    pacing: PacingConfig,
    released: bool,
}

impl TransportSession {
    /// Connect to `endpoint`. On failure the partial session is released
    /// (including the cooldown) before the error is returned.
    #[instrument(skip_all, fields(address = %endpoint.address))]
    pub fn open(
        adapter: &dyn TransportAdapter,
        endpoint: &Endpoint,
        pacing: PacingConfig,
    ) -> Result<Self> {
        let mut session = Self {
            address: endpoint.address.clone(),
            stream: None,
            pacing,
            released: false,
        };

        let cancelled = adapter.cancel_discovery();
        thread::sleep(pacing.settle());
        cancelled?;

        let stream = session.stream.insert(obtain_stream(adapter, endpoint)?);
        stream.connect()?;
        debug!("session connected");
        Ok(session)
    }

    /// Write and flush the whole document, then wait out the drain delay.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| StrukError::Write("session already released".into()))?;
        let sent = stream.write_all(bytes).and_then(|()| stream.flush());
        thread::sleep(self.pacing.drain());
        if sent.is_ok() {
            debug!(address = %self.address, bytes = bytes.len(), "document flushed");
        }
        sent
    }

    /// Release the session now rather than at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close_output() {
                debug!(address = %self.address, error = %e, "closing output stream failed");
            }
            if let Err(e) = stream.close() {
                debug!(address = %self.address, error = %e, "closing connection failed");
            }
        }
        thread::sleep(self.pacing.cooldown());
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.release();
    }
}

fn obtain_stream(adapter: &dyn TransportAdapter, endpoint: &Endpoint) -> Result<Box<dyn RfcommStream>> {
    match adapter.open_session(&endpoint.address, &endpoint.service) {
        Ok(stream) => Ok(stream),
        Err(StrukError::AuthorizationDenied) => Err(StrukError::AuthorizationDenied),
        Err(e) if adapter.supports_channel_sessions() => {
            warn!(
                error = %e,
                channel = endpoint.fallback_channel,
                "service negotiation failed, trying channel session"
            );
            adapter.open_session_by_channel(&endpoint.address, endpoint.fallback_channel)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use struk_bridge::memory::{LinkEvent, MemoryAdapter, OpenPath};

    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            address: "AA:BB:CC:DD:EE:FF".into(),
            service: Uuid::nil(),
            fallback_channel: 1,
        }
    }

    fn open_event(via: OpenPath) -> LinkEvent {
        LinkEvent::Open {
            address: "AA:BB:CC:DD:EE:FF".into(),
            via,
        }
    }

    #[test]
    fn successful_send_runs_full_lifecycle() {
        let adapter = MemoryAdapter::new();
        let mut session =
            TransportSession::open(&adapter, &endpoint(), PacingConfig::immediate()).expect("open");
        session.send(b"doc").expect("send");
        session.close();

        assert_eq!(
            adapter.events(),
            vec![
                LinkEvent::CancelDiscovery,
                open_event(OpenPath::Service(Uuid::nil())),
                LinkEvent::Connect,
                LinkEvent::Write(b"doc".to_vec()),
                LinkEvent::Flush,
                LinkEvent::CloseOutput,
                LinkEvent::Close,
            ]
        );
    }

    #[test]
    fn failed_connect_still_releases_stream() {
        let adapter = MemoryAdapter::new();
        adapter.fail_next_connects(1);

        let result = TransportSession::open(&adapter, &endpoint(), PacingConfig::immediate());
        assert!(matches!(result, Err(StrukError::Connect(_))));
        assert_eq!(
            adapter.events(),
            vec![
                LinkEvent::CancelDiscovery,
                open_event(OpenPath::Service(Uuid::nil())),
                LinkEvent::CloseOutput,
                LinkEvent::Close,
            ]
        );
    }

    #[test]
    fn channel_fallback_when_supported() {
        let adapter = MemoryAdapter::new().with_channel_sessions();
        adapter.fail_service_open(true);

        let session =
            TransportSession::open(&adapter, &endpoint(), PacingConfig::immediate()).expect("open");
        session.close();
        assert!(adapter.events().contains(&open_event(OpenPath::Channel(1))));
    }

    #[test]
    fn no_fallback_without_capability() {
        let adapter = MemoryAdapter::new();
        adapter.fail_service_open(true);

        let result = TransportSession::open(&adapter, &endpoint(), PacingConfig::immediate());
        assert!(matches!(result, Err(StrukError::Connect(_))));
        assert_eq!(adapter.events(), vec![LinkEvent::CancelDiscovery]);
    }

    #[test]
    fn dropping_a_session_closes_it() {
        let adapter = MemoryAdapter::new();
        {
            let _session = TransportSession::open(&adapter, &endpoint(), PacingConfig::immediate())
                .expect("open");
        }
        assert_eq!(adapter.events().last(), Some(&LinkEvent::Close));
        assert!(adapter.spans()[0].closed.is_some());
    }

    #[test]
    fn pauses_are_applied_in_place() {
        let pacing = PacingConfig {
            settle_ms: 30,
            drain_ms: 30,
            cooldown_ms: 30,
            backoff_ms: 0,
        };
        let adapter = MemoryAdapter::new();
        let start = Instant::now();
        let mut session = TransportSession::open(&adapter, &endpoint(), pacing).expect("open");
        session.send(b"x").expect("send");
        session.close();
        assert!(start.elapsed() >= Duration::from_millis(90));

        let timeline = adapter.timeline();
        let at = |wanted: &LinkEvent| {
            timeline
                .iter()
                .find(|(_, e)| e == wanted)
                .map(|(t, _)| *t)
                .expect("event recorded")
        };
        let cancel = at(&LinkEvent::CancelDiscovery);
        let connect = at(&LinkEvent::Connect);
        let flush = at(&LinkEvent::Flush);
        let close_output = at(&LinkEvent::CloseOutput);
        assert!(connect.duration_since(cancel) >= Duration::from_millis(30));
        assert!(close_output.duration_since(flush) >= Duration::from_millis(30));
    }

    #[test]
    fn failed_write_still_drains_and_cools_down() {
        let pacing = PacingConfig {
            settle_ms: 0,
            drain_ms: 25,
            cooldown_ms: 25,
            backoff_ms: 0,
        };
        let adapter = MemoryAdapter::new();
        adapter.fail_next_writes(1);
        let mut session = TransportSession::open(&adapter, &endpoint(), pacing).expect("open");

        let start = Instant::now();
        assert!(matches!(session.send(b"x"), Err(StrukError::Write(_))));
        session.close();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
