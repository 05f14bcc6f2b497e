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

    bus::mod.rs

    Bus lane decoding and the host interface a controller uses to reach the
    rest of the machine.

*/

use crate::{devices::atapi::atapi_registers::AtapiRegister, scheduler::Scheduler};

/// Mask value for the 16-bit data word path (low half of the bus word driven).
pub const WORD_LANE_MASK: u32 = 0x0000_FFFF;
/// Mask value for a byte access on the upper half of the bus word.
pub const HIGH_BYTE_LANE_MASK: u32 = 0x00FF_0000;
/// Mask value for a byte access on the lower half of the bus word.
pub const LOW_BYTE_LANE_MASK: u32 = 0x0000_00FF;

/// Bytes of address space decoded by one register block: four 32-bit bus words.
pub const REGISTER_BLOCK_SIZE: u32 = 0x10;

/// Value read back from lanes that no register drives.
pub const NO_BUS_DATA: u32 = 0;

/// Events a controller may place on the machine's scheduler. Both variants are driven by the
/// same transfer timer, so arming one cancels the other.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AtapiEvent {
    /// A DMA burst is due to be delivered into system memory.
    DmaBurst,
    /// A PLAY command has finished its one-sector busy period.
    PlayComplete,
}

/// Which half of a 32-bit bus access is active.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusLanes {
    /// Wide access to the Data register. Used for packet words and result words only.
    Word,
    /// Byte access on bits 0..7. Selects the even register of the pair.
    LowByte,
    /// Byte access on bits 16..23. Selects the odd register of the pair.
    HighByte,
}

impl BusLanes {
    /// Decode an active-lane mask. Set bits in `mask` mark the lanes the CPU drives.
    pub fn decode(mask: u32) -> BusLanes {
        if mask == WORD_LANE_MASK {
            BusLanes::Word
        }
        else if (mask & HIGH_BYTE_LANE_MASK) != 0 && (mask & WORD_LANE_MASK) == 0 {
            BusLanes::HighByte
        }
        else {
            BusLanes::LowByte
        }
    }

    /// Resolve the task-file register index for a byte access at a 32-bit word `offset`.
    /// Wide accesses have no byte register and return None.
    pub fn register_index(&self, offset: u32) -> Option<usize> {
        match self {
            BusLanes::Word => None,
            BusLanes::LowByte => Some((offset as usize) << 1),
            BusLanes::HighByte => Some(((offset as usize) << 1) + 1),
        }
    }

    /// Bit position of the byte carried on these lanes.
    #[inline]
    pub fn shift(&self) -> u32 {
        match self {
            BusLanes::HighByte => 16,
            _ => 0,
        }
    }
}

/// The services a controller needs from the machine it is plugged into: the interrupt
/// controller, system RAM for DMA delivery, and the global event queue.
///
/// All calls are synchronous. A controller never blocks on any of them.
pub trait HostInterface {
    fn raise_interrupt(&mut self, vector: u32);
    fn write_ram_u32(&mut self, address: u32, value: u32);
    /// Arm `event` to fire after `cycles` CPU cycles, replacing any pending instance of it.
    fn schedule_event(&mut self, event: AtapiEvent, cycles: u64);
    fn cancel_event(&mut self, event: AtapiEvent);
}

/// A minimal machine: an event queue, a flat RAM array of 32-bit words, and a record of
/// raised interrupt vectors. This is what the headless test harness and benchmarks drive.
#[derive(Default)]
pub struct SimpleHost {
    pub scheduler: Scheduler<AtapiEvent>,
    pub ram: Vec<u32>,
    pub interrupts: Vec<u32>,
}

impl SimpleHost {
    pub fn new(ram_bytes: usize) -> Self {
        Self {
            scheduler: Scheduler::new(),
            ram: vec![0; ram_bytes / 4],
            interrupts: Vec::new(),
        }
    }

    /// Read back a byte of RAM as the CPU would see it (little-endian).
    pub fn ram_u8(&self, address: usize) -> u8 {
        self.ram
            .get(address / 4)
            .map(|dword| (dword >> ((address & 3) * 8)) as u8)
            .unwrap_or(0)
    }
}

impl HostInterface for SimpleHost {
    fn raise_interrupt(&mut self, vector: u32) {
        self.interrupts.push(vector);
    }

    fn write_ram_u32(&mut self, address: u32, value: u32) {
        match self.ram.get_mut(address as usize / 4) {
            Some(dword) => *dword = value,
            None => log::warn!("DMA write outside of RAM: {:08X}", address),
        }
    }

    fn schedule_event(&mut self, event: AtapiEvent, cycles: u64) {
        self.scheduler.schedule(event, cycles);
    }

    fn cancel_event(&mut self, event: AtapiEvent) {
        self.scheduler.cancel(event);
    }
}

/// Produce a list of (register name, bus address) tuples for a register block at `base`.
/// Each 32-bit bus word carries two byte registers.
pub fn register_list(base: u32) -> Vec<(String, u32)> {
    AtapiRegister::ALL
        .iter()
        .map(|reg| {
            let idx = *reg as u32;
            let lane = if idx & 1 != 0 { "hi" } else { "lo" };
            (format!("ATAPI {} ({})", reg, lane), base + (idx >> 1) * 4)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_decode_to_register_pairs() {
        assert_eq!(BusLanes::decode(WORD_LANE_MASK), BusLanes::Word);
        assert_eq!(BusLanes::decode(LOW_BYTE_LANE_MASK), BusLanes::LowByte);
        assert_eq!(BusLanes::decode(HIGH_BYTE_LANE_MASK), BusLanes::HighByte);

        assert_eq!(BusLanes::LowByte.register_index(3), Some(6));
        assert_eq!(BusLanes::HighByte.register_index(3), Some(7));
        assert_eq!(BusLanes::Word.register_index(0), None);
        assert_eq!(BusLanes::HighByte.shift(), 16);
    }

    #[test]
    fn register_list_covers_block() {
        let list = register_list(0x1F48_0000);
        assert_eq!(list.len(), 8);
        assert_eq!(list[0].1, 0x1F48_0000);
        assert_eq!(list[7].1, 0x1F48_000C);
    }
}
