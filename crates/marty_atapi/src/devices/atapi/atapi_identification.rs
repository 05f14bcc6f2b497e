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

//! The IDENTIFY PACKET DEVICE response block.

use crate::devices::atapi::{
    ata_string::AtaString,
    atapi_error::AtapiError,
    scsi::pack_sector_words,
};
use binrw::{binrw, BinWrite};
use std::io::Cursor;

/// Size of the identify block in bytes (ATA's fixed 256 words).
pub const IDENTIFY_BLOCK_SIZE: usize = 512;

/// Word 0: ATAPI device, CD-ROM command set (5), DRQ asserted within 3ms of PACKET.
pub const GENERAL_CONFIG_ATAPI_CDROM: u16 = 0x8500;
/// Word 49: IORDY may be disabled.
pub const CAPABILITIES_IORDY_DISABLE: u16 = 0x0400;

#[binrw]
#[brw(little)]
#[derive(Clone, Debug)]
pub struct AtapiIdentification {
    pub general: u16,
    pub reserved0: [u16; 9],
    pub serial_no: AtaString<20>,
    pub reserved1: [u16; 3],
    pub firmware_revision: AtaString<8>,
    pub model_number: AtaString<40>,
    pub reserved2: [u16; 2],
    pub capabilities: u16,
    pub reserved3: [u16; 206],
}

impl AtapiIdentification {
    pub fn new(model: &str, firmware: &str, serial: &str) -> Self {
        AtapiIdentification {
            general: GENERAL_CONFIG_ATAPI_CDROM,
            reserved0: [0; 9],
            serial_no: AtaString::new(serial),
            reserved1: [0; 3],
            firmware_revision: AtaString::new(firmware),
            model_number: AtaString::new(model),
            reserved2: [0; 2],
            capabilities: CAPABILITIES_IORDY_DISABLE,
            reserved3: [0; 206],
        }
    }

    /// Serialize the block into the 256 data register words the host will read.
    pub fn to_words(&self) -> Result<Vec<u16>, AtapiError> {
        let mut cursor = Cursor::new(Vec::with_capacity(IDENTIFY_BLOCK_SIZE));
        self.write(&mut cursor)?;
        Ok(pack_sector_words(cursor.get_ref()))
    }
}

impl Default for AtapiIdentification {
    fn default() -> Self {
        Self::new("MARTYPC ATAPI CD-ROM", "1.00", "0000000000000MARTYPC")
    }
}
