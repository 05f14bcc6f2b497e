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

    tests::common::mod.rs

    Shared fixtures for controller tests: a scripted CD-ROM device and bus
    helpers.

*/

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use marty_atapi::{
    bus::{HIGH_BYTE_LANE_MASK, LOW_BYTE_LANE_MASK, WORD_LANE_MASK},
    devices::atapi::atapi_registers::AtapiRegister,
    AtapiConfig,
    AtapiController,
    Cdb,
    ScsiDevice,
    ScsiError,
    SimpleHost,
};

pub const RAM_SIZE: usize = 256 * 1024;

/// Byte the fake device returns at absolute result offset `i`. 251 is prime so that
/// misplaced sectors or swapped words show up.
pub fn pattern(i: usize) -> u8 {
    (i % 251) as u8
}

#[derive(Default, Debug)]
pub struct DeviceLog {
    pub cdbs: Vec<Cdb>,
    pub reads: Vec<usize>,
    pub writes: Vec<Vec<u8>>,
}

pub struct FakeCdrom {
    result: Result<usize, ScsiError>,
    offset: usize,
    log: Rc<RefCell<DeviceLog>>,
}

impl FakeCdrom {
    pub fn new(result: Result<usize, ScsiError>) -> (Self, Rc<RefCell<DeviceLog>>) {
        let log = Rc::new(RefCell::new(DeviceLog::default()));
        (
            Self {
                result,
                offset: 0,
                log: log.clone(),
            },
            log,
        )
    }
}

impl ScsiDevice for FakeCdrom {
    fn exec_command(&mut self, cdb: &Cdb) -> Result<usize, ScsiError> {
        self.log.borrow_mut().cdbs.push(*cdb);
        self.offset = 0;
        self.result
    }

    fn read_data(&mut self, buf: &mut [u8]) {
        assert!(buf.len() <= 2048, "device read larger than one sector");
        for b in buf.iter_mut() {
            *b = pattern(self.offset);
            self.offset += 1;
        }
        self.log.borrow_mut().reads.push(buf.len());
    }

    fn write_data(&mut self, data: &[u8]) {
        self.log.borrow_mut().writes.push(data.to_vec());
    }
}

pub fn controller(result: Result<usize, ScsiError>) -> (AtapiController, SimpleHost, Rc<RefCell<DeviceLog>>) {
    let (dev, log) = FakeCdrom::new(result);
    let ctrl = AtapiController::new(AtapiConfig::default(), Box::new(dev));
    (ctrl, SimpleHost::new(RAM_SIZE), log)
}

/// Bus offset and lane mask of a task file register.
pub fn reg_lanes(reg: AtapiRegister) -> (u32, u32) {
    let idx = reg as u32;
    let mask = if idx & 1 != 0 {
        HIGH_BYTE_LANE_MASK
    }
    else {
        LOW_BYTE_LANE_MASK
    };
    (idx >> 1, mask)
}

pub fn read_reg(ctrl: &mut AtapiController, host: &mut SimpleHost, reg: AtapiRegister) -> u8 {
    let (offset, mask) = reg_lanes(reg);
    let shift = if mask == HIGH_BYTE_LANE_MASK { 16 } else { 0 };
    (ctrl.read(offset, mask, host) >> shift) as u8
}

pub fn write_reg(ctrl: &mut AtapiController, host: &mut SimpleHost, reg: AtapiRegister, byte: u8) {
    let (offset, mask) = reg_lanes(reg);
    let shift = if mask == HIGH_BYTE_LANE_MASK { 16 } else { 0 };
    ctrl.write(offset, mask, (byte as u32) << shift, host);
}

pub fn read_word(ctrl: &mut AtapiController, host: &mut SimpleHost) -> u16 {
    ctrl.read(0, WORD_LANE_MASK, host) as u16
}

pub fn write_word(ctrl: &mut AtapiController, host: &mut SimpleHost, word: u16) {
    ctrl.write(0, WORD_LANE_MASK, word as u32, host);
}

/// Issue PACKET and write the six words of `cdb`.
pub fn send_packet(ctrl: &mut AtapiController, host: &mut SimpleHost, cdb: Cdb) {
    write_reg(ctrl, host, AtapiRegister::CommandStatus, 0xA0);
    for pair in cdb.chunks_exact(2) {
        write_word(ctrl, host, u16::from_le_bytes([pair[0], pair[1]]));
    }
}

pub fn cdb(opcode: u8) -> Cdb {
    let mut cdb = [0u8; 12];
    cdb[0] = opcode;
    cdb
}

/// Fire scheduled events until the queue is empty.
pub fn run_events(ctrl: &mut AtapiController, host: &mut SimpleHost) -> usize {
    let mut fired = 0;
    loop {
        let events = host.scheduler.advance_to_next();
        if events.is_empty() {
            break;
        }
        for event in events {
            ctrl.handle_event(event, host);
            fired += 1;
        }
    }
    fired
}

pub fn byte_count(ctrl: &AtapiController) -> usize {
    ctrl.task_file().byte_count() as usize
}
