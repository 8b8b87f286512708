// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Struk Document: turns print requests into ESC/POS byte streams.
//
// Everything here is pure: no I/O, no retry, no shared state. The output of
// each encoder is a self-contained document that can be sent any number of
// times.

pub mod escpos;
pub mod integrity;
pub mod order_date;
pub mod receipt;

pub use escpos::EscPosBuilder;
pub use integrity::hash_bytes;
pub use order_date::OrderTimestamp;
pub use receipt::{encode_order, encode_test, item_line};
