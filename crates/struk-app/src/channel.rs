// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host method channel.
//
// The host sends one JSON object per line: `{"id"?, "method", "arguments"}`.
// Each call is answered with `{"id"?, "result"}` or
// `{"id"?, "error": {"code", "message"}}`. The process may also emit
// unsolicited events such as `{"event": "requestAuthorization", "scopes"}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use struk_core::error::{Result, StrukError};
use struk_core::types::{AuthorizationScope, OrderReceipt, PrintRequest, TestReceipt};

use crate::services::app_services::AppServices;

/// One inbound call.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodCall {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Answer to one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl MethodResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, err: &StrukError) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody {
                code: err.code().to_owned(),
                message: err.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Unsolicited messages to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    RequestAuthorization { scopes: Vec<AuthorizationScope> },
}

/// Anything written to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Response(MethodResponse),
    Event(HostEvent),
}

/// Parse one input line. A malformed line still gets an answer.
pub fn parse_line(line: &str) -> std::result::Result<MethodCall, MethodResponse> {
    serde_json::from_str(line).map_err(|e| {
        MethodResponse::failure(None, &StrukError::InvalidArguments(format!("malformed call: {e}")))
    })
}

/// Run one call to completion.
pub async fn dispatch(services: &AppServices, call: MethodCall) -> MethodResponse {
    let MethodCall {
        id,
        method,
        arguments,
    } = call;
    debug!(%method, "method call");
    match handle(services, &method, arguments).await {
        Ok(result) => MethodResponse::success(id, result),
        Err(e) => {
            warn!(%method, code = e.code(), error = %e, "method call failed");
            MethodResponse::failure(id, &e)
        }
    }
}

async fn handle(services: &AppServices, method: &str, arguments: Value) -> Result<Value> {
    match method {
        "getBondedDevices" | "listBondedDevices" => {
            Ok(serde_json::to_value(services.bonded_devices()?)?)
        }
        "printTest" => {
            let receipt = test_receipt(arguments, &services.config().default_business_name)?;
            debug!(width = receipt.paper_width_mm, "test receipt requested");
            services.print(PrintRequest::Test(receipt)).await?;
            Ok(Value::Bool(true))
        }
        "printOrder" => {
            let receipt = order_receipt(arguments, &services.config().default_business_name)?;
            services.print(PrintRequest::Order(receipt)).await?;
            Ok(Value::Bool(true))
        }
        "authorizationResult" => {
            let granted = arguments
                .get("granted")
                .and_then(Value::as_bool)
                .ok_or_else(|| StrukError::InvalidArguments("granted must be a boolean".into()))?;
            services.authorization_result(granted);
            Ok(Value::Bool(true))
        }
        other => Err(StrukError::NotImplemented(other.to_owned())),
    }
}

fn require_address(arguments: &Value) -> Result<()> {
    match arguments.get("address").and_then(Value::as_str) {
        Some(address) if !address.trim().is_empty() => Ok(()),
        _ => Err(StrukError::NoAddress),
    }
}

/// Fill in the configured business name when the caller sent none.
fn with_business_default(arguments: Value, default_name: &str) -> Result<Map<String, Value>> {
    let Value::Object(mut map) = arguments else {
        return Err(StrukError::InvalidArguments("arguments must be an object".into()));
    };
    if map.get("businessName").is_none_or(Value::is_null) {
        map.insert("businessName".into(), Value::String(default_name.to_owned()));
    }
    Ok(map)
}

fn test_receipt(arguments: Value, default_name: &str) -> Result<TestReceipt> {
    require_address(&arguments)?;
    let map = with_business_default(arguments, default_name)?;
    serde_json::from_value(Value::Object(map))
        .map_err(|e| StrukError::InvalidArguments(e.to_string()))
}

fn order_receipt(arguments: Value, default_name: &str) -> Result<OrderReceipt> {
    require_address(&arguments)?;
    if arguments.get("order").is_none_or(Value::is_null) {
        return Err(StrukError::NoOrder);
    }
    let map = with_business_default(arguments, default_name)?;
    serde_json::from_value(Value::Object(map))
        .map_err(|e| StrukError::InvalidArguments(e.to_string()))
}
