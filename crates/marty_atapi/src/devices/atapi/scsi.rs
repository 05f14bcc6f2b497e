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

//! The boundary between the ATAPI controller and the SCSI device behind it.
//!
//! The controller never interprets SCSI commands beyond a handful of opcodes that need
//! register-level side effects. Everything else is the device's business.
//!
//! Byte order conversions between the 16-bit data register and the device's byte streams
//! happen only in the functions at the bottom of this module.

use crate::devices::atapi::atapi_error::ScsiError;
use strum_macros::{Display, FromRepr};

/// Length of an ATAPI command packet.
pub const CDB_LEN: usize = 12;
/// Number of data register words that make up a command packet.
pub const CDB_WORDS: usize = CDB_LEN / 2;

pub type Cdb = [u8; CDB_LEN];

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, FromRepr)]
pub enum ScsiOpcode {
    TestUnitReady = 0x00,
    RequestSense = 0x03,
    Inquiry = 0x12,
    ModeSelect6 = 0x15,
    ModeSense6 = 0x1A,
    StartStopUnit = 0x1B,
    ReadCapacity = 0x25,
    Read10 = 0x28,
    ReadSubChannel = 0x42,
    ReadToc = 0x43,
    PlayAudio10 = 0x45,
    PlayAudioTrackIndex = 0x48,
    PauseResume = 0x4B,
    ModeSelect10 = 0x55,
    ModeSense10 = 0x5A,
    PlayAudio12 = 0xA5,
    Read12 = 0xA8,
    SetCdSpeed = 0xBB,
}

/// A SCSI block device addressed through ATAPI packets.
///
/// Implementations are synchronous: `exec_command` must finish before it returns, and the
/// result bytes it announces are then pulled with `read_data` in sector-sized pieces.
pub trait ScsiDevice {
    /// Execute a command packet. Returns the number of result bytes the device has ready.
    fn exec_command(&mut self, cdb: &Cdb) -> Result<usize, ScsiError>;
    /// Fill `buf` with the next result bytes. `buf` is never longer than one sector.
    fn read_data(&mut self, buf: &mut [u8]);
    /// Accept a parameter list sent after a command such as MODE SELECT.
    fn write_data(&mut self, data: &[u8]);
}

/// Decompose packet words into CDB bytes. Each word contributes its low byte first.
pub fn words_to_cdb_bytes(words: &[u16; CDB_WORDS]) -> Cdb {
    let mut cdb = [0u8; CDB_LEN];
    for (pair, word) in cdb.chunks_exact_mut(2).zip(words.iter()) {
        pair.copy_from_slice(&word.to_le_bytes());
    }
    cdb
}

/// Decompose an arbitrary run of parameter words into bytes, low byte first.
pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Pack device bytes into data register words, little-endian. A trailing odd byte is
/// padded with zero in the high half.
pub fn pack_sector_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

/// Pack device bytes into 32-bit words for delivery into system RAM, little-endian.
pub fn unpack_dma_dwords(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes.chunks(4).map(|quad| {
        let mut b = [0u8; 4];
        b[..quad.len()].copy_from_slice(quad);
        u32::from_le_bytes(b)
    })
}

/// Parameter list length of a MODE SELECT (10) packet, in bytes (CDB bytes 7..8, big-endian).
pub fn mode_select_parameter_length(cdb: &Cdb) -> usize {
    u16::from_be_bytes([cdb[7], cdb[8]]) as usize
}
