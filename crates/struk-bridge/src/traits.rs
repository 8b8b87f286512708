// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the collaborators the print
// pipeline depends on but does not own: the permission system and the radio.

use std::sync::Arc;

use uuid::Uuid;

use struk_core::error::Result;
use struk_core::types::{AuthorizationScope, BondedDevice};

/// Runtime permission check and prompt.
///
/// `request_authorization` only starts the prompt. The platform delivers the
/// user's answer later through `AdmissionGate::on_authorization_result`,
/// possibly on another thread.
pub trait Authorizer: Send + Sync {
    /// Whether every scope needed for printing is currently granted.
    fn is_authorized(&self) -> bool;

    /// Start an asynchronous permission prompt for `scopes`.
    fn request_authorization(&self, scopes: &[AuthorizationScope]) -> Result<()>;

    /// Scopes this platform needs before printing.
    fn required_scopes(&self) -> Vec<AuthorizationScope> {
        AuthorizationScope::for_api_level(None)
    }
}

/// Access to the local radio.
pub trait RadioProvider: Send + Sync {
    /// The default adapter, or `None` when the device has no radio.
    fn adapter(&self) -> Option<Arc<dyn TransportAdapter>>;
}

/// A radio adapter able to open RFCOMM-style byte streams.
///
/// Implementations return `StrukError::AuthorizationDenied` when the
/// platform revokes access mid-operation.
pub trait TransportAdapter: Send + Sync {
    /// Paired devices known to the adapter.
    fn bonded_devices(&self) -> Result<Vec<BondedDevice>>;

    /// Stop any passive discovery; it competes with new connections.
    fn cancel_discovery(&self) -> Result<()>;

    /// Create an unconnected stream to `address` negotiated by service id.
    fn open_session(&self, address: &str, service: &Uuid) -> Result<Box<dyn RfcommStream>>;

    /// Whether `open_session_by_channel` is available on this adapter.
    fn supports_channel_sessions(&self) -> bool {
        false
    }

    /// Create an unconnected stream to a fixed channel, skipping service
    /// discovery. Only called when `supports_channel_sessions` is true.
    fn open_session_by_channel(&self, address: &str, channel: u8) -> Result<Box<dyn RfcommStream>> {
        let _ = (address, channel);
        Err(struk_core::StrukError::PlatformUnavailable)
    }
}

/// One duplex stream to a printer. Only the write half is used.
pub trait RfcommStream: Send {
    fn connect(&mut self) -> Result<()>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push buffered bytes to the controller. Does not imply delivery.
    fn flush(&mut self) -> Result<()>;

    /// Release the write half.
    fn close_output(&mut self) -> Result<()>;

    /// Release the underlying connection.
    fn close(&mut self) -> Result<()>;
}
