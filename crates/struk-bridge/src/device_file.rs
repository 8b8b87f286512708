// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RFCOMM through bound character devices.
//
// On Linux a paired printer can be bound to `/dev/rfcommN` with
// `rfcomm bind`; the kernel then opens the link when the device file is
// opened. Each binding from the config maps one printer address to one
// such path. There is no channel-level API here, so the fallback path is
// reported as unsupported.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use struk_core::config::DeviceBinding;
use struk_core::error::{Result, StrukError};
use struk_core::types::BondedDevice;

use crate::traits::{RadioProvider, RfcommStream, TransportAdapter};

/// Adapter over the configured device bindings.
pub struct DeviceFileAdapter {
    bindings: Vec<DeviceBinding>,
}

impl DeviceFileAdapter {
    pub fn new(bindings: Vec<DeviceBinding>) -> Self {
        Self { bindings }
    }

    fn binding(&self, address: &str) -> Option<&DeviceBinding> {
        self.bindings
            .iter()
            .find(|b| b.address.eq_ignore_ascii_case(address))
    }
}

impl TransportAdapter for DeviceFileAdapter {
    fn bonded_devices(&self) -> Result<Vec<BondedDevice>> {
        Ok(self
            .bindings
            .iter()
            .map(|b| BondedDevice {
                name: b.name.clone(),
                address: b.address.clone(),
            })
            .collect())
    }

    fn cancel_discovery(&self) -> Result<()> {
        // Bound devices are never discovered, so there is nothing to stop.
        Ok(())
    }

    fn open_session(&self, address: &str, service: &Uuid) -> Result<Box<dyn RfcommStream>> {
        let binding = self
            .binding(address)
            .ok_or_else(|| StrukError::Connect(format!("no device bound for {address}")))?;
        debug!(address, service = %service, path = %binding.path.display(), "device file session");
        Ok(Box::new(DeviceFileStream {
            path: binding.path.clone(),
            file: None,
        }))
    }
}

/// Radio backed by a single [`DeviceFileAdapter`].
pub struct DeviceFileRadio {
    adapter: Arc<DeviceFileAdapter>,
}

impl DeviceFileRadio {
    pub fn new(bindings: Vec<DeviceBinding>) -> Self {
        info!(devices = bindings.len(), "using RFCOMM device file bindings");
        Self {
            adapter: Arc::new(DeviceFileAdapter::new(bindings)),
        }
    }
}

impl RadioProvider for DeviceFileRadio {
    fn adapter(&self) -> Option<Arc<dyn TransportAdapter>> {
        let adapter: Arc<dyn TransportAdapter> = self.adapter.clone();
        Some(adapter)
    }
}

struct DeviceFileStream {
    path: PathBuf,
    file: Option<File>,
}

impl DeviceFileStream {
    fn file(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| StrukError::Write("stream is not connected".into()))
    }
}

fn open_error(path: &std::path::Path, e: std::io::Error) -> StrukError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => StrukError::AuthorizationDenied,
        _ => StrukError::Connect(format!("{}: {e}", path.display())),
    }
}

impl RfcommStream for DeviceFileStream {
    fn connect(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| open_error(&self.path, e))?;
        self.file = Some(file);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.file()?
            .write_all(bytes)
            .map_err(|e| StrukError::Write(e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        self.file()?
            .flush()
            .map_err(|e| StrukError::Write(e.to_string()))
    }

    fn close_output(&mut self) -> Result<()> {
        self.file.take();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.file.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(path: PathBuf) -> DeviceBinding {
        DeviceBinding {
            name: "RPP02N".into(),
            address: "66:22:AB:CD:03:04".into(),
            path,
        }
    }

    #[test]
    fn lists_bindings_as_bonded_devices() {
        let adapter = DeviceFileAdapter::new(vec![binding("/dev/rfcomm0".into())]);
        let devices = adapter.bonded_devices().expect("devices");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "RPP02N");
    }

    #[test]
    fn writes_reach_the_bound_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rfcomm0");
        std::fs::write(&path, b"").expect("create");

        let adapter = DeviceFileAdapter::new(vec![binding(path.clone())]);
        let mut stream = adapter
            .open_session("66:22:AB:CD:03:04", &Uuid::nil())
            .expect("open");
        stream.connect().expect("connect");
        stream.write_all(b"\x1b@hello\n").expect("write");
        stream.flush().expect("flush");
        stream.close_output().expect("close output");
        stream.close().expect("close");

        assert_eq!(std::fs::read(&path).expect("read"), b"\x1b@hello\n");
    }

    #[test]
    fn address_match_ignores_case() {
        let adapter = DeviceFileAdapter::new(vec![binding("/dev/rfcomm0".into())]);
        assert!(adapter.open_session("66:22:ab:cd:03:04", &Uuid::nil()).is_ok());
    }

    #[test]
    fn unknown_address_is_a_connect_error() {
        let adapter = DeviceFileAdapter::new(Vec::new());
        let err = adapter.open_session("00:00", &Uuid::nil()).err().expect("error");
        assert!(matches!(err, StrukError::Connect(_)));
        assert!(!adapter.supports_channel_sessions());
    }

    #[test]
    fn missing_device_file_fails_on_connect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let adapter = DeviceFileAdapter::new(vec![binding(dir.path().join("absent"))]);
        let mut stream = adapter
            .open_session("66:22:AB:CD:03:04", &Uuid::nil())
            .expect("open");
        assert!(matches!(stream.connect(), Err(StrukError::Connect(_))));
        assert!(matches!(stream.write_all(b"x"), Err(StrukError::Write(_))));
    }
}
