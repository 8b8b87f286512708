// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Struk receipt pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business name printed when the caller supplies none.
pub const DEFAULT_BUSINESS_NAME: &str = "Laundry App";

/// Paper width assumed for test prints when the caller supplies none.
pub const DEFAULT_PAPER_WIDTH_MM: u32 = 58;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which receipt layout a job prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    Test,
    Order,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => f.write_str("test"),
            Self::Order => f.write_str("order"),
        }
    }
}

/// Header block printed centred at the top of every receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    #[serde(
        rename = "businessName",
        default = "default_business_name",
        deserialize_with = "lenient::business_name"
    )]
    pub name: String,
    #[serde(rename = "businessAddress", default, deserialize_with = "lenient::optional_string")]
    pub address: Option<String>,
    #[serde(rename = "businessPhone", default, deserialize_with = "lenient::optional_string")]
    pub phone: Option<String>,
}

impl Default for BusinessInfo {
    fn default() -> Self {
        Self {
            name: default_business_name(),
            address: None,
            phone: None,
        }
    }
}

fn default_business_name() -> String {
    DEFAULT_BUSINESS_NAME.to_owned()
}

fn default_paper_width() -> u32 {
    DEFAULT_PAPER_WIDTH_MM
}

/// Diagnostic receipt with fixed sample content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReceipt {
    pub address: String,
    /// Paper width in millimetres. Informational; the test layout is fixed.
    #[serde(
        rename = "width",
        default = "default_paper_width",
        deserialize_with = "lenient::width"
    )]
    pub paper_width_mm: u32,
    #[serde(flatten)]
    pub business: BusinessInfo,
}

/// A customer order receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub address: String,
    #[serde(flatten)]
    pub business: BusinessInfo,
    pub order: Order,
}

/// Order payload as delivered by the host.
///
/// `id` and `total_amount` are kept as raw JSON scalars because hosts send
/// either strings or numbers; the encoder renders them verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default, deserialize_with = "lenient::string")]
    pub customer_name: String,
    /// Free-text timestamp, usually ISO-8601.
    #[serde(alias = "orderDate", default, deserialize_with = "lenient::string")]
    pub order_date_raw: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub payment_method: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total_amount: serde_json::Value,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient::string")]
    pub item_name: String,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub quantity: i64,
    #[serde(alias = "price", default, deserialize_with = "lenient::integer")]
    pub unit_price: i64,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub note: Option<String>,
}

/// A request accepted from the host, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintRequest {
    Test(TestReceipt),
    Order(OrderReceipt),
}

impl PrintRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Test(_) => JobKind::Test,
            Self::Order(_) => JobKind::Order,
        }
    }

    /// Transport address of the target printer.
    pub fn address(&self) -> &str {
        match self {
            Self::Test(t) => &t.address,
            Self::Order(o) => &o.address,
        }
    }
}

/// A paired printer as reported by the radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondedDevice {
    pub name: String,
    pub address: String,
}

/// Runtime permissions needed before a print job may touch the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationScope {
    BluetoothScan,
    BluetoothConnect,
    /// Pre-API-31 platforms gate classic discovery behind location access.
    FineLocation,
}

impl AuthorizationScope {
    /// First platform API level with the dedicated Bluetooth permissions.
    pub const SPLIT_PERMISSION_API_LEVEL: u32 = 31;

    /// Scopes to request on a platform with the given API level.
    ///
    /// An unknown level is treated as modern.
    pub fn for_api_level(level: Option<u32>) -> Vec<Self> {
        match level {
            Some(l) if l < Self::SPLIT_PERMISSION_API_LEVEL => vec![Self::FineLocation],
            _ => vec![Self::BluetoothScan, Self::BluetoothConnect],
        }
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Connection blip, busy radio: safe to retry automatically.
    Transient,
    /// User must act first (grant permission, switch the radio on).
    UserAction,
    /// Retrying cannot help.
    Permanent,
}

/// Tolerant field decoders matching what hosts actually send.
mod lenient {
    use serde::Deserialize;
    use serde::de::{Deserializer, Error};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(optional_string(d)?.unwrap_or_default())
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(D::Error::custom(format!("expected a scalar, got {other}"))),
        }
    }

    /// A null name falls back to the default business name.
    pub fn business_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(optional_string(d)?.unwrap_or_else(super::default_business_name))
    }

    /// Only a non-negative integer is taken; anything else means the default.
    pub fn width<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value
            .as_u64()
            .and_then(|w| u32::try_from(w).ok())
            .unwrap_or_else(super::default_paper_width))
    }

    /// Numbers are truncated to integers; anything else counts as zero.
    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn business_defaults_apply() {
        let t: TestReceipt = serde_json::from_value(json!({ "address": "AA:BB" })).unwrap();
        assert_eq!(t.business.name, "Laundry App");
        assert_eq!(t.business.address, None);
        assert_eq!(t.paper_width_mm, 58);
    }

    #[test]
    fn unusable_width_falls_back_to_default() {
        for width in [json!(null), json!("58"), json!(57.5), json!(-1), json!(u64::MAX)] {
            let t: TestReceipt =
                serde_json::from_value(json!({ "address": "AA", "width": width })).unwrap();
            assert_eq!(t.paper_width_mm, 58, "width {width}");
        }
        let t: TestReceipt = serde_json::from_value(json!({ "address": "AA", "width": 80 })).unwrap();
        assert_eq!(t.paper_width_mm, 80);
    }

    #[test]
    fn null_business_name_falls_back() {
        let t: TestReceipt = serde_json::from_value(json!({
            "address": "AA:BB",
            "businessName": null,
            "businessPhone": "0812"
        }))
        .unwrap();
        assert_eq!(t.business.name, "Laundry App");
        assert_eq!(t.business.phone.as_deref(), Some("0812"));
    }

    #[test]
    fn order_accepts_legacy_field_names() {
        let o: Order = serde_json::from_value(json!({
            "id": 42,
            "customerName": "Budi",
            "orderDate": "2024-05-01T14:30:00+07:00",
            "paymentMethod": "Cash",
            "items": [{ "itemName": "Kemeja", "quantity": 2, "price": 7000, "note": "no starch" }],
            "totalAmount": 14000
        }))
        .unwrap();
        assert_eq!(o.order_date_raw, "2024-05-01T14:30:00+07:00");
        assert_eq!(o.items[0].unit_price, 7000);
        assert_eq!(o.items[0].note.as_deref(), Some("no starch"));
        assert_eq!(o.id, json!(42));
    }

    #[test]
    fn missing_item_fields_default_to_zero() {
        let item: LineItem = serde_json::from_value(json!({ "quantity": "three" })).unwrap();
        assert_eq!(item.item_name, "");
        assert_eq!(item.quantity, 0);
        assert_eq!(item.unit_price, 0);
        assert!(item.note.is_none());
    }

    #[test]
    fn nested_object_as_customer_name_is_rejected() {
        let res: std::result::Result<Order, _> =
            serde_json::from_value(json!({ "customerName": { "first": "Budi" } }));
        assert!(res.is_err());
    }

    #[test]
    fn scopes_follow_api_level() {
        assert_eq!(
            AuthorizationScope::for_api_level(Some(30)),
            vec![AuthorizationScope::FineLocation]
        );
        assert_eq!(
            AuthorizationScope::for_api_level(Some(34)),
            vec![AuthorizationScope::BluetoothScan, AuthorizationScope::BluetoothConnect]
        );
        assert_eq!(AuthorizationScope::for_api_level(None).len(), 2);
    }
}
