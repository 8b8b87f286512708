// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory radio and authorizer.
//
// Records every adapter and stream call with a timestamp, and can be told to
// fail upcoming connects, writes, or service negotiation. Used for dry runs
// and by the pipeline tests to check call order, attempt counts, and that
// no two sessions are ever open at the same time.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use struk_core::error::{Result, StrukError};
use struk_core::types::{AuthorizationScope, BondedDevice};

use crate::traits::{Authorizer, RadioProvider, RfcommStream, TransportAdapter};

/// How a stream was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenPath {
    Service(Uuid),
    Channel(u8),
}

/// One recorded adapter or stream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    CancelDiscovery,
    Open { address: String, via: OpenPath },
    Connect,
    Write(Vec<u8>),
    Flush,
    CloseOutput,
    Close,
}

/// Lifetime of one stream, from creation to `close`.
#[derive(Debug, Clone, Copy)]
pub struct SessionSpan {
    pub opened: Instant,
    pub closed: Option<Instant>,
}

#[derive(Default)]
struct Script {
    fail_connects: u32,
    fail_writes: u32,
    fail_service_open: bool,
    deny_access: bool,
    connect_delay: Duration,
}

#[derive(Default)]
struct Shared {
    devices: Vec<BondedDevice>,
    channel_sessions: bool,
    script: Mutex<Script>,
    events: Mutex<Vec<(Instant, LinkEvent)>>,
    spans: Mutex<Vec<SessionSpan>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Shared {
    fn record(&self, event: LinkEvent) {
        lock(&self.events).push((Instant::now(), event));
    }
}

/// Recording adapter. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryAdapter {
    shared: Arc<Shared>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<BondedDevice>) -> Self {
        Self {
            shared: Arc::new(Shared {
                devices,
                ..Default::default()
            }),
        }
    }

    /// Enable the channel-number fallback path.
    pub fn with_channel_sessions(self) -> Self {
        let shared = Shared {
            devices: self.shared.devices.clone(),
            channel_sessions: true,
            ..Default::default()
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Make the next `n` connects fail.
    pub fn fail_next_connects(&self, n: u32) {
        lock(&self.shared.script).fail_connects = n;
    }

    /// Make the next `n` writes fail.
    pub fn fail_next_writes(&self, n: u32) {
        lock(&self.shared.script).fail_writes = n;
    }

    /// Make service-id negotiation fail until reset.
    pub fn fail_service_open(&self, fail: bool) {
        lock(&self.shared.script).fail_service_open = fail;
    }

    /// Report access revoked on every connect.
    pub fn deny_access(&self, deny: bool) {
        lock(&self.shared.script).deny_access = deny;
    }

    /// Hold every connect for `delay` to widen race windows.
    pub fn set_connect_delay(&self, delay: Duration) {
        lock(&self.shared.script).connect_delay = delay;
    }

    pub fn events(&self) -> Vec<LinkEvent> {
        lock(&self.shared.events)
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn timeline(&self) -> Vec<(Instant, LinkEvent)> {
        lock(&self.shared.events).clone()
    }

    pub fn spans(&self) -> Vec<SessionSpan> {
        lock(&self.shared.spans).clone()
    }

    /// Documents that were written, one entry per successful write.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.shared.events)
            .iter()
            .filter_map(|(_, e)| match e {
                LinkEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, LinkEvent::Connect))
            .count()
    }

    /// Highest number of streams that were open at once.
    pub fn max_concurrent_sessions(&self) -> usize {
        self.shared.max_active.load(Ordering::SeqCst)
    }

    fn new_stream(&self, address: &str, via: OpenPath) -> Box<dyn RfcommStream> {
        self.shared.record(LinkEvent::Open {
            address: address.to_owned(),
            via,
        });
        let active = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_active.fetch_max(active, Ordering::SeqCst);

        let mut spans = lock(&self.shared.spans);
        spans.push(SessionSpan {
            opened: Instant::now(),
            closed: None,
        });
        Box::new(MemoryStream {
            shared: self.shared.clone(),
            span: spans.len() - 1,
            closed: false,
        })
    }
}

impl TransportAdapter for MemoryAdapter {
    fn bonded_devices(&self) -> Result<Vec<BondedDevice>> {
        Ok(self.shared.devices.clone())
    }

    fn cancel_discovery(&self) -> Result<()> {
        self.shared.record(LinkEvent::CancelDiscovery);
        Ok(())
    }

    fn open_session(&self, address: &str, service: &Uuid) -> Result<Box<dyn RfcommStream>> {
        if lock(&self.shared.script).fail_service_open {
            return Err(StrukError::Connect("service discovery failed".into()));
        }
        Ok(self.new_stream(address, OpenPath::Service(*service)))
    }

    fn supports_channel_sessions(&self) -> bool {
        self.shared.channel_sessions
    }

    fn open_session_by_channel(&self, address: &str, channel: u8) -> Result<Box<dyn RfcommStream>> {
        if !self.shared.channel_sessions {
            return Err(StrukError::PlatformUnavailable);
        }
        Ok(self.new_stream(address, OpenPath::Channel(channel)))
    }
}

struct MemoryStream {
    shared: Arc<Shared>,
    span: usize,
    closed: bool,
}

impl RfcommStream for MemoryStream {
    fn connect(&mut self) -> Result<()> {
        let (delay, deny, fail) = {
            let mut script = lock(&self.shared.script);
            let fail = script.fail_connects > 0;
            if fail {
                script.fail_connects -= 1;
            }
            (script.connect_delay, script.deny_access, fail)
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if deny {
            return Err(StrukError::AuthorizationDenied);
        }
        if fail {
            return Err(StrukError::Connect("read failed, socket might closed".into()));
        }
        self.shared.record(LinkEvent::Connect);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        {
            let mut script = lock(&self.shared.script);
            if script.fail_writes > 0 {
                script.fail_writes -= 1;
                return Err(StrukError::Write("broken pipe".into()));
            }
        }
        self.shared.record(LinkEvent::Write(bytes.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.shared.record(LinkEvent::Flush);
        Ok(())
    }

    fn close_output(&mut self) -> Result<()> {
        self.shared.record(LinkEvent::CloseOutput);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.shared.spans)[self.span].closed = Some(Instant::now());
            self.shared.active.fetch_sub(1, Ordering::SeqCst);
        }
        self.shared.record(LinkEvent::Close);
        Ok(())
    }
}

/// Radio whose adapter is a [`MemoryAdapter`], or absent.
pub struct MemoryRadio {
    adapter: Option<MemoryAdapter>,
}

impl MemoryRadio {
    pub fn new(adapter: MemoryAdapter) -> Self {
        Self {
            adapter: Some(adapter),
        }
    }

    /// A device without a radio.
    pub fn absent() -> Self {
        Self { adapter: None }
    }
}

impl RadioProvider for MemoryRadio {
    fn adapter(&self) -> Option<Arc<dyn TransportAdapter>> {
        let adapter: Arc<dyn TransportAdapter> = Arc::new(self.adapter.clone()?);
        Some(adapter)
    }
}

/// Authorizer whose state the caller flips by hand.
#[derive(Default)]
pub struct ManualAuthorizer {
    granted: AtomicBool,
    requests: Mutex<Vec<Vec<AuthorizationScope>>>,
}

impl ManualAuthorizer {
    pub fn granted() -> Self {
        let auth = Self::default();
        auth.set_granted(true);
        auth
    }

    pub fn denied() -> Self {
        Self::default()
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    /// Number of prompts started so far.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<Vec<AuthorizationScope>> {
        lock(&self.requests).clone()
    }
}

impl Authorizer for ManualAuthorizer {
    fn is_authorized(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_authorization(&self, scopes: &[AuthorizationScope]) -> Result<()> {
        lock(&self.requests).push(scopes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_connect_failures_are_consumed() {
        let adapter = MemoryAdapter::new();
        adapter.fail_next_connects(1);

        let mut first = adapter.open_session("AA", &Uuid::nil()).expect("open");
        assert!(first.connect().is_err());
        first.close().expect("close");

        let mut second = adapter.open_session("AA", &Uuid::nil()).expect("open");
        assert!(second.connect().is_ok());
        second.close().expect("close");

        assert_eq!(adapter.connect_count(), 1);
        assert_eq!(adapter.max_concurrent_sessions(), 1);
    }

    #[test]
    fn overlapping_streams_are_counted() {
        let adapter = MemoryAdapter::new();
        let mut a = adapter.open_session("AA", &Uuid::nil()).expect("open a");
        let mut b = adapter.open_session("BB", &Uuid::nil()).expect("open b");
        a.close().expect("close a");
        b.close().expect("close b");
        assert_eq!(adapter.max_concurrent_sessions(), 2);
        assert!(adapter.spans().iter().all(|s| s.closed.is_some()));
    }

    #[test]
    fn channel_path_requires_capability() {
        let plain = MemoryAdapter::new();
        assert!(plain.open_session_by_channel("AA", 1).is_err());

        let capable = MemoryAdapter::new().with_channel_sessions();
        assert!(capable.supports_channel_sessions());
        assert!(capable.open_session_by_channel("AA", 1).is_ok());
    }

    #[test]
    fn manual_authorizer_records_prompts() {
        let auth = ManualAuthorizer::denied();
        assert!(!auth.is_authorized());
        auth.request_authorization(&[AuthorizationScope::BluetoothConnect])
            .expect("request");
        assert_eq!(auth.request_count(), 1);
        auth.set_granted(true);
        assert!(auth.is_authorized());
    }
}
