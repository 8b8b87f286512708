// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Struk.

use thiserror::Error;

/// Top-level error type for all Struk operations.
#[derive(Debug, Error)]
pub enum StrukError {
    // -- Caller input --
    #[error("No Bluetooth address provided")]
    NoAddress,

    #[error("Order data missing")]
    NoOrder,

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    // -- Admission --
    #[error("Required permissions not granted")]
    AuthorizationDenied,

    #[error("parked print request superseded by a newer request")]
    Superseded,

    // -- Document --
    #[error("Failed build receipt: {0}")]
    Encode(String),

    // -- Transport --
    #[error("Device has no Bluetooth adapter")]
    NoAdapter,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("write failed: {0}")]
    Write(String),

    // -- Worker --
    #[error("print worker is not running")]
    WorkerStopped,

    // -- Host dispatch --
    #[error("method not implemented: {0}")]
    NotImplemented(String),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StrukError {
    /// Error code reported to the host method channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoAddress => "NO_ADDRESS",
            Self::NoOrder => "NO_ORDER",
            Self::NoAdapter => "NO_ADAPTER",
            Self::AuthorizationDenied => "PERMISSION",
            Self::Superseded => "SUPERSEDED",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            _ => "ERROR",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StrukError>;
