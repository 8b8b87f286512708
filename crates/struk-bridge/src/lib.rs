// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Struk Bridge: collaborator boundaries for the print pipeline.
//
// The pipeline never talks to a permission system or a radio directly. It
// holds an `Authorizer` and a `RadioProvider`, and the host picks the
// implementations: device-file RFCOMM on Linux, the in-memory recorder for
// dry runs, or the stub when no radio exists.

pub mod device_file;
pub mod memory;
pub mod stub;
pub mod traits;

use std::sync::Arc;

use struk_core::AppConfig;

pub use traits::{Authorizer, RadioProvider, RfcommStream, TransportAdapter};

/// The pair of collaborators a host hands to the pipeline.
#[derive(Clone)]
pub struct PlatformBridge {
    pub name: &'static str,
    pub authorizer: Arc<dyn Authorizer>,
    pub radio: Arc<dyn RadioProvider>,
}

/// Select the bridge for this build and configuration.
///
/// Device bindings in the config enable the device-file radio; without them
/// the stub is used and every print fails with `NoAdapter`.
pub fn platform_bridge(config: &AppConfig) -> PlatformBridge {
    if cfg!(target_os = "linux") && !config.devices.is_empty() {
        PlatformBridge {
            name: "Linux (rfcomm device files)",
            authorizer: Arc::new(stub::StubBridge),
            radio: Arc::new(device_file::DeviceFileRadio::new(config.devices.clone())),
        }
    } else {
        PlatformBridge {
            name: "Desktop (stub)",
            authorizer: Arc::new(stub::StubBridge),
            radio: Arc::new(stub::StubBridge),
        }
    }
}
