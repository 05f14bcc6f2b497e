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

//! The ATAPI task file: eight byte-wide registers shared by the host and the controller.

use crate::devices::atapi::atapi_error::AtapiError;
use modular_bitfield::prelude::*;
use strum_macros::{Display, FromRepr};

pub const STATUS_BSY: u8 = 0x80;
pub const STATUS_DRDY: u8 = 0x40;
pub const STATUS_DMA_READY: u8 = 0x20;
pub const STATUS_SERVICE_DSC: u8 = 0x10;
pub const STATUS_DRQ: u8 = 0x08;
pub const STATUS_CORR: u8 = 0x04;
pub const STATUS_CHECK: u8 = 0x01;

pub const INTREASON_COMMAND: u8 = 0x01;
pub const INTREASON_IO: u8 = 0x02;
pub const INTREASON_RELEASE: u8 = 0x04;

/// Sense key reported in the Error register when the device rejects a packet.
pub const SENSE_ILLEGAL_REQUEST: u8 = 0x50;

// Reset signature. ATAPI devices report 0xEB14 in the byte count registers after reset so
// that host software can tell them apart from plain ATA disks.
pub const SIGNATURE_ERROR: u8 = 0x01;
pub const SIGNATURE_COUNT_LOW: u8 = 0x14;
pub const SIGNATURE_COUNT_HIGH: u8 = 0xEB;

#[repr(usize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, FromRepr)]
pub enum AtapiRegister {
    Data = 0,
    ErrorFeature = 1,
    InterruptReason = 2,
    SectorCountTag = 3,
    ByteCountLow = 4,
    ByteCountHigh = 5,
    DriveSelect = 6,
    CommandStatus = 7,
}

impl AtapiRegister {
    pub const ALL: [AtapiRegister; 8] = [
        AtapiRegister::Data,
        AtapiRegister::ErrorFeature,
        AtapiRegister::InterruptReason,
        AtapiRegister::SectorCountTag,
        AtapiRegister::ByteCountLow,
        AtapiRegister::ByteCountHigh,
        AtapiRegister::DriveSelect,
        AtapiRegister::CommandStatus,
    ];
}

impl TryFrom<usize> for AtapiRegister {
    type Error = AtapiError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        AtapiRegister::from_repr(index).ok_or(AtapiError::InvalidRegister(index))
    }
}

#[bitfield]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtapiStatusRegister {
    pub check: bool,       // Check condition (error)
    pub idx: bool,         // Index (obsolete)
    pub corr: bool,        // Corrected data
    pub drq: bool,         // Data Request
    pub service_dsc: bool, // Service / Seek Complete
    pub dma_ready: bool,   // DMA Ready
    pub ready: bool,       // Drive Ready
    pub busy: bool,        // Drive Busy
}

impl AtapiStatusRegister {
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self::from_bytes([byte])
    }
    #[inline]
    pub fn byte(&self) -> u8 {
        self.into_bytes()[0]
    }
}

#[bitfield]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtapiInterruptReason {
    pub cod: bool, // Command (1) or data (0)
    pub io:  bool, // Direction: device to host when set
    pub rel: bool, // Bus release
    #[skip]
    __: B5,
}

impl AtapiInterruptReason {
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self::from_bytes([byte])
    }
    #[inline]
    pub fn byte(&self) -> u8 {
        self.into_bytes()[0]
    }
}

/// Byte-wide register file. Reads and writes through [TaskFile::read] and [TaskFile::write]
/// are raw storage accesses; the command semantics of the CommandStatus register live in
/// the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskFile {
    regs: [u8; 8],
}

impl Default for TaskFile {
    fn default() -> Self {
        let mut tf = TaskFile { regs: [0; 8] };
        tf.load_signature();
        tf
    }
}

impl TaskFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the reset signature. Registers outside the signature keep their contents.
    pub fn load_signature(&mut self) {
        self.regs[AtapiRegister::CommandStatus as usize] = 0;
        self.regs[AtapiRegister::ErrorFeature as usize] = SIGNATURE_ERROR;
        self.regs[AtapiRegister::ByteCountLow as usize] = SIGNATURE_COUNT_LOW;
        self.regs[AtapiRegister::ByteCountHigh as usize] = SIGNATURE_COUNT_HIGH;
    }

    #[inline]
    pub fn read(&self, reg: AtapiRegister) -> u8 {
        self.regs[reg as usize]
    }

    #[inline]
    pub fn write(&mut self, reg: AtapiRegister, byte: u8) {
        self.regs[reg as usize] = byte;
    }

    #[inline]
    pub fn status(&self) -> AtapiStatusRegister {
        AtapiStatusRegister::from_byte(self.read(AtapiRegister::CommandStatus))
    }

    #[inline]
    pub fn set_status(&mut self, byte: u8) {
        self.write(AtapiRegister::CommandStatus, byte);
    }

    #[inline]
    pub fn interrupt_reason(&self) -> AtapiInterruptReason {
        AtapiInterruptReason::from_byte(self.read(AtapiRegister::InterruptReason))
    }

    #[inline]
    pub fn set_interrupt_reason(&mut self, byte: u8) {
        self.write(AtapiRegister::InterruptReason, byte);
    }

    #[inline]
    pub fn set_error(&mut self, byte: u8) {
        self.write(AtapiRegister::ErrorFeature, byte);
    }

    /// Return the 16-bit byte count formed by ByteCountHigh:ByteCountLow.
    pub fn byte_count(&self) -> u16 {
        u16::from_le_bytes([
            self.read(AtapiRegister::ByteCountLow),
            self.read(AtapiRegister::ByteCountHigh),
        ])
    }

    /// Store the low 16 bits of `count` in the byte count registers.
    pub fn set_byte_count(&mut self, count: usize) {
        self.write(AtapiRegister::ByteCountLow, (count & 0xFF) as u8);
        self.write(AtapiRegister::ByteCountHigh, ((count >> 8) & 0xFF) as u8);
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.regs
    }
}
