// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS command bytes and a small append-only document builder.
//
// Only the handful of commands the receipts use are defined here. The byte
// values are fixed by the printer firmware and must not change.

/// `ESC @`: reset the printer to power-on state.
pub const INIT: [u8; 2] = [0x1B, 0x40];

/// `ESC a 1`: centre subsequent lines.
pub const ALIGN_CENTER: [u8; 3] = [0x1B, 0x61, 0x01];

/// `ESC a 0`: left-align subsequent lines.
pub const ALIGN_LEFT: [u8; 3] = [0x1B, 0x61, 0x00];

/// `GS V 0`: full paper cut.
pub const CUT: [u8; 3] = [0x1D, 0x56, 0x00];

/// Line feeds emitted before the cut so the last line clears the blade.
pub const TRAILING_FEED_LINES: usize = 3;

/// Builds a printer document as a flat byte buffer.
///
/// Text is written as UTF-8 and every `line` is terminated with `\n`.
#[derive(Debug, Default, Clone)]
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self) -> &mut Self {
        self.raw(&INIT)
    }

    pub fn center(&mut self) -> &mut Self {
        self.raw(&ALIGN_CENTER)
    }

    pub fn left(&mut self) -> &mut Self {
        self.raw(&ALIGN_LEFT)
    }

    pub fn line(&mut self, text: &str) -> &mut Self {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(b'\n');
        self
    }

    /// A row of `width` dashes.
    pub fn separator(&mut self, width: usize) -> &mut Self {
        self.line(&"-".repeat(width))
    }

    pub fn feed(&mut self, lines: usize) -> &mut Self {
        self.buf.extend(std::iter::repeat_n(b'\n', lines));
        self
    }

    pub fn cut(&mut self) -> &mut Self {
        self.raw(&CUT)
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_in_call_order() {
        let mut b = EscPosBuilder::new();
        b.init().center().line("Hi").left().separator(3).feed(2).cut();
        let bytes = b.build();

        let mut expected = Vec::new();
        expected.extend_from_slice(&INIT);
        expected.extend_from_slice(&ALIGN_CENTER);
        expected.extend_from_slice(b"Hi\n");
        expected.extend_from_slice(&ALIGN_LEFT);
        expected.extend_from_slice(b"---\n");
        expected.extend_from_slice(b"\n\n");
        expected.extend_from_slice(&CUT);
        assert_eq!(bytes, expected);
    }
}
