/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! [AtaString] holds the space-padded ASCII fields of an identify block.
//!
//! Identify strings store the first character of each pair in the high byte of its word,
//! so after little-endian serialization every byte pair appears swapped.

use binrw::binrw;
use std::{convert::Infallible, str::FromStr};

#[binrw]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtaString<const N: usize> {
    raw: [u8; N],
}

impl<const N: usize> Default for AtaString<N> {
    fn default() -> Self {
        Self { raw: [b' '; N] }
    }
}

impl<const N: usize> FromStr for AtaString<N> {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [b' '; N];
        let bytes = s.as_bytes();
        let len = bytes.len().min(N);
        raw[..len].copy_from_slice(&bytes[..len]);

        for pair in raw.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
        Ok(Self { raw })
    }
}

impl<const N: usize> AtaString<N> {
    /// Build a field from `s`, truncating or space-padding to N bytes.
    pub fn new(s: &str) -> Self {
        match s.parse() {
            Ok(field) => field,
            Err(never) => match never {},
        }
    }

    /// Recover the text, trailing padding removed.
    pub fn to_text(&self) -> String {
        let mut plain = self.raw;
        for pair in plain.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
        String::from_utf8_lossy(&plain).trim_end().to_string()
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ata_string_swaps_pairs() {
        let s = AtaString::<8>::new("CDROM");
        assert_eq!(s.raw(), b"DCOR M  ");
        assert_eq!(s.to_text(), "CDROM");
    }

    #[test]
    fn ata_string_truncates() {
        let s = AtaString::<4>::new("MARTYPC");
        assert_eq!(s.to_text(), "MART");
    }
}
