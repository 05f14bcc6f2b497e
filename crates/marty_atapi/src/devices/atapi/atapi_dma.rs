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

//! DMA delivery: timed bursts of whole chunks written directly into system RAM.

use crate::{
    bus::{AtapiEvent, HostInterface},
    devices::atapi::{
        atapi_controller::{AtapiController, AtapiState},
        atapi_registers::*,
        atapi_transfer::{TransferPath, CD_SECTOR_SIZE},
        scsi::unpack_dma_dwords,
    },
};

impl AtapiController {
    /// Cycles until a burst of `bytes` is delivered. Whole sectors only.
    #[inline]
    fn burst_cycles(&self, bytes: usize) -> u64 {
        self.config
            .cycles_per_sector
            .saturating_mul((bytes / CD_SECTOR_SIZE) as u64)
    }

    /// The DMA engine has been programmed to receive the current chunk at `address`.
    pub fn dma_burst_requested(&mut self, address: u32, host: &mut dyn HostInterface) {
        log::debug!(
            "ATAPI: DMA burst requested to {:08X}, chunk {} bytes",
            address,
            self.xfer.chunk_remaining()
        );

        match self.state {
            AtapiState::DataPio | AtapiState::DataDma => {}
            _ => {
                log::warn!("ATAPI: DMA requested in state {} with no data phase; ignored", self.state);
                return;
            }
        }
        if !self.xfer.claim(TransferPath::Dma) {
            log::warn!("ATAPI: DMA requested while transfer is owned by PIO; ignored");
            return;
        }

        self.state = AtapiState::DataDma;
        self.dma_address = Some(address);
        self.play_pending = false;
        host.cancel_event(AtapiEvent::PlayComplete);
        host.schedule_event(AtapiEvent::DmaBurst, self.burst_cycles(self.xfer.chunk_remaining()));
    }

    /// Deliver the current chunk into RAM, then either arm the next burst or finish.
    pub(super) fn dma_burst(&mut self, host: &mut dyn HostInterface) {
        let Some(mut address) = self.dma_address
        else {
            log::debug!("ATAPI: stale DMA burst ignored");
            return;
        };
        if self.state != AtapiState::DataDma {
            log::debug!("ATAPI: DMA burst fired in state {}; ignored", self.state);
            return;
        }

        let mut sector = [0u8; CD_SECTOR_SIZE];
        while self.xfer.chunk_remaining() > 0 {
            let n = self.xfer.consume(CD_SECTOR_SIZE);
            self.device.read_data(&mut sector[..n]);
            self.stats.sectors_read += 1;
            for dword in unpack_dma_dwords(&sector[..n]) {
                host.write_ram_u32(address, dword);
                address = address.wrapping_add(4);
                self.stats.dma_dwords_written += 1;
            }
        }
        self.dma_address = Some(address);

        self.xfer.refill();
        let chunk = self.xfer.chunk_remaining();
        self.regs.set_byte_count(chunk);

        if chunk > 0 {
            log::debug!("ATAPI: starting next piece of multi-part transfer, {} bytes", chunk);
            host.schedule_event(AtapiEvent::DmaBurst, self.burst_cycles(chunk));
        }
        else {
            log::debug!("ATAPI: DMA transfer complete, dropping DRQ");
            self.regs.set_status(STATUS_DRDY);
            self.regs.set_interrupt_reason(INTREASON_IO | INTREASON_COMMAND);
            self.dma_address = None;
            self.state = AtapiState::Complete;
        }
        self.raise_interrupt(host);
    }
}
