// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Order timestamp → printed date and time.
//
// Hosts send whatever their backend stored, so parsing degrades in stages:
// offset timestamp, then local timestamp, then plain text extraction. It
// never fails; the worst case echoes the raw string as the date.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}:\d{2}").expect("static clock pattern is valid"));

static LEADING_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}").expect("static clock pattern is valid"));

/// Date and time as printed on the `Tanggal:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTimestamp {
    /// `yyyy-MM-dd` when the input parsed, otherwise extracted or raw text.
    pub date: String,
    /// `HH:mm`, or empty when no time could be found.
    pub time: String,
}

impl OrderTimestamp {
    pub fn derive(raw: &str) -> Self {
        parse_offset(raw)
            .or_else(|| parse_local(raw))
            .unwrap_or_else(|| extract(raw))
    }
}

fn parse_offset(raw: &str) -> Option<OrderTimestamp> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z"))
        .ok()?;
    // Keep the wall clock of the sender's offset; no conversion to local time.
    Some(from_naive(ts.naive_local()))
}

fn parse_local(raw: &str) -> Option<OrderTimestamp> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(from_naive)
}

fn from_naive(ts: NaiveDateTime) -> OrderTimestamp {
    OrderTimestamp {
        date: ts.format(DATE_FORMAT).to_string(),
        time: ts.format(TIME_FORMAT).to_string(),
    }
}

/// With a `T`, the time must open the segment right after it. Without one,
/// the first clock anywhere in the text is taken.
fn extract(raw: &str) -> OrderTimestamp {
    let mut segments = raw.split('T');
    let (date, clock) = match (segments.next(), segments.next()) {
        (Some(date), Some(after)) => (date, LEADING_CLOCK.find(after)),
        _ => (raw, CLOCK.find(raw)),
    };
    let time = clock.map(|m| m.as_str().to_owned()).unwrap_or_default();
    OrderTimestamp {
        date: date.to_owned(),
        time,
    }
}
