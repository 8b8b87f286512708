// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt layouts: the fixed diagnostic receipt and the order receipt.
//
// Both share a centred business header, a left-aligned body between dash
// separators, three feed lines, and a full cut. Encoding is pure: the same
// input always yields the same bytes and nothing from the input is retained.

use serde_json::Value;
use tracing::debug;

use struk_core::error::{Result, StrukError};
use struk_core::types::{BusinessInfo, LineItem, Order, TestReceipt};

use crate::escpos::{EscPosBuilder, TRAILING_FEED_LINES};
use crate::order_date::OrderTimestamp;

/// Separator width on the diagnostic receipt.
pub const TEST_SEPARATOR_WIDTH: usize = 30;

/// Separator width on order receipts (full 58 mm line at font A).
pub const ORDER_SEPARATOR_WIDTH: usize = 32;

/// Item names longer than this are cut.
pub const ITEM_NAME_WIDTH: usize = 16;

/// Encode the diagnostic receipt.
pub fn encode_test(receipt: &TestReceipt) -> Vec<u8> {
    let mut doc = EscPosBuilder::new();
    header(&mut doc, &receipt.business, TEST_SEPARATOR_WIDTH);
    doc.line("Sample Receipt")
        .line("Item 1    1 x 10.00")
        .line("Total     10.00");
    footer(&mut doc);

    let bytes = doc.build();
    debug!(bytes = bytes.len(), width_mm = receipt.paper_width_mm, "test receipt encoded");
    bytes
}

/// Encode an order receipt.
///
/// Fails only when the order id or total is not a scalar and therefore has
/// no printable form.
pub fn encode_order(order: &Order, business: &BusinessInfo) -> Result<Vec<u8>> {
    let id = scalar_text("id", &order.id, "")?;
    let total = scalar_text("totalAmount", &order.total_amount, "0")?;
    let ts = OrderTimestamp::derive(&order.order_date_raw);

    let mut doc = EscPosBuilder::new();
    header(&mut doc, business, ORDER_SEPARATOR_WIDTH);
    doc.line(&format!("Order: #{id}"))
        .line(&format!("Nama: {}", order.customer_name))
        .line(&format!("Tanggal: {} {}", ts.date, ts.time))
        .line(&format!("Metode: {}", order.payment_method))
        .separator(ORDER_SEPARATOR_WIDTH);

    for item in &order.items {
        doc.line(&item_line(item));
        if let Some(note) = &item.note {
            doc.line(&format!("  * {note}"));
        }
    }

    doc.separator(ORDER_SEPARATOR_WIDTH)
        .line(&format!("Total: Rp{total}"));
    footer(&mut doc);

    let bytes = doc.build();
    debug!(bytes = bytes.len(), items = order.items.len(), "order receipt encoded");
    Ok(bytes)
}

/// `name(16) qty(3) x price(7)`, name left-aligned and cut to 16 characters.
pub fn item_line(item: &LineItem) -> String {
    let name: String = item.item_name.chars().take(ITEM_NAME_WIDTH).collect();
    format!(
        "{name:<width$} {:>3} x {:>7}",
        item.quantity,
        item.unit_price,
        width = ITEM_NAME_WIDTH
    )
}

fn header(doc: &mut EscPosBuilder, business: &BusinessInfo, separator: usize) {
    doc.init().center().line(&business.name);
    if let Some(address) = non_blank(business.address.as_deref()) {
        doc.line(address);
    }
    if let Some(phone) = non_blank(business.phone.as_deref()) {
        doc.line(&format!("Tel: {phone}"));
    }
    doc.left().separator(separator);
}

fn footer(doc: &mut EscPosBuilder) {
    doc.feed(TRAILING_FEED_LINES).cut();
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn scalar_text(field: &str, value: &Value, missing: &str) -> Result<String> {
    match value {
        Value::Null => Ok(missing.to_owned()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => Err(StrukError::Encode(format!(
            "order field '{field}' is not a printable value"
        ))),
    }
}
