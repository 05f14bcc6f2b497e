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

//! PIO delivery: result words read by the host one at a time through the Data register.

use crate::{
    bus::HostInterface,
    devices::atapi::{
        atapi_controller::{AtapiController, AtapiState},
        atapi_registers::*,
        atapi_transfer::{TransferPath, CD_SECTOR_SIZE},
        scsi::pack_sector_words,
    },
};

impl AtapiController {
    /// Read one result word from the Data register.
    ///
    /// When the staging buffer runs dry and the current chunk still has bytes, the whole chunk
    /// is pulled from the device in sector-sized reads before the first word is returned.
    /// Reads past the end of the data return 0 without side effects.
    pub fn pio_read_word(&mut self, host: &mut dyn HostInterface) -> u16 {
        if self.staging.is_drained() {
            if self.xfer.chunk_remaining() == 0 {
                match self.state {
                    AtapiState::PacketBuild => log::trace!("ATAPI: Data register read during packet phase"),
                    _ => log::warn!("ATAPI: Data register read past end of data in state {}", self.state),
                }
                return 0;
            }
            if !self.xfer.claim(TransferPath::Pio) {
                log::warn!("ATAPI: PIO read while transfer is owned by DMA; ignored");
                return 0;
            }
            self.state = AtapiState::DataPio;
            self.stage_chunk();
            self.next_chunk(host);
        }

        let Some(word) = self.staging.pop()
        else {
            return 0;
        };
        self.stats.pio_words_read += 1;

        if self.staging.is_drained() {
            self.staging.clear();
            if self.xfer.is_empty() {
                log::debug!("ATAPI: PIO transfer complete, dropping DRQ");
                self.regs.set_status(0);
                self.regs.set_interrupt_reason(INTREASON_IO);
                self.state = AtapiState::Complete;
                self.raise_interrupt(host);
            }
        }
        word
    }

    /// Pull the remainder of the current chunk from the device into the staging buffer.
    fn stage_chunk(&mut self) {
        let mut sector = [0u8; CD_SECTOR_SIZE];
        self.staging.clear();
        while self.xfer.chunk_remaining() > 0 {
            let n = self.xfer.consume(CD_SECTOR_SIZE);
            self.device.read_data(&mut sector[..n]);
            self.staging.extend(&pack_sector_words(&sector[..n]));
            self.stats.sectors_read += 1;
        }
    }

    /// Carve the next chunk out of the remaining total and announce it to the host.
    fn next_chunk(&mut self, host: &mut dyn HostInterface) {
        self.xfer.refill();
        let chunk = self.xfer.chunk_remaining();
        log::debug!(
            "ATAPI: staged {} words, next chunk {} bytes, {} left after it",
            self.staging.len(),
            chunk,
            self.xfer.total_remaining()
        );

        self.regs.set_byte_count(chunk);
        if chunk != 0 {
            self.regs.set_status(STATUS_DRQ | STATUS_SERVICE_DSC);
            self.regs.set_interrupt_reason(INTREASON_IO);
        }
        else {
            self.regs.set_status(0);
            self.regs.set_interrupt_reason(INTREASON_IO | INTREASON_COMMAND);
        }
        self.raise_interrupt(host);
    }
}
