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

    devices::atapi::tests.rs

    Controller unit tests against an in-memory disc image.

*/

use super::{
    atapi_controller::{AtapiController, AtapiState},
    atapi_error::ScsiError,
    atapi_registers::*,
    atapi_transfer::CD_SECTOR_SIZE,
    scsi::{Cdb, ScsiDevice, ScsiOpcode},
};
use crate::{
    bus::{AtapiEvent, SimpleHost, WORD_LANE_MASK},
    config::AtapiConfig,
};

/// A disc of `sectors` sectors where every byte of sector `n` is `n`.
struct ImageDevice {
    sectors: u32,
    lba: u32,
    offset: usize,
    mode_pages: Vec<u8>,
}

impl ImageDevice {
    fn new(sectors: u32) -> Self {
        Self {
            sectors,
            lba: 0,
            offset: 0,
            mode_pages: Vec::new(),
        }
    }
}

impl ScsiDevice for ImageDevice {
    fn exec_command(&mut self, cdb: &Cdb) -> Result<usize, ScsiError> {
        match ScsiOpcode::from_repr(cdb[0]) {
            Some(ScsiOpcode::Read12) => {
                let lba = u32::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5]]);
                let count = u32::from_be_bytes([cdb[6], cdb[7], cdb[8], cdb[9]]);
                if lba + count > self.sectors {
                    return Err(ScsiError::AddressOutOfRange(lba));
                }
                self.lba = lba;
                self.offset = 0;
                Ok(count as usize * CD_SECTOR_SIZE)
            }
            Some(ScsiOpcode::ReadCapacity) => Ok(8),
            Some(ScsiOpcode::ModeSelect10)
            | Some(ScsiOpcode::TestUnitReady)
            | Some(ScsiOpcode::PlayAudio10) => Ok(0),
            _ => Err(ScsiError::UnsupportedCommand(cdb[0])),
        }
    }

    fn read_data(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = (self.lba + (self.offset / CD_SECTOR_SIZE) as u32) as u8;
            self.offset += 1;
        }
    }

    fn write_data(&mut self, data: &[u8]) {
        self.mode_pages.extend_from_slice(data);
    }
}

fn setup(sectors: u32) -> (AtapiController, SimpleHost) {
    let ctrl = AtapiController::new(AtapiConfig::default(), Box::new(ImageDevice::new(sectors)));
    (ctrl, SimpleHost::new(64 * 1024))
}

fn issue(ctrl: &mut AtapiController, host: &mut SimpleHost, cdb: Cdb) {
    ctrl.command_write(0xA0, host);
    for pair in cdb.chunks_exact(2) {
        ctrl.packet_word_write(u16::from_le_bytes([pair[0], pair[1]]), host);
    }
}

fn read12(lba: u32, count: u32) -> Cdb {
    let mut cdb = [0u8; 12];
    cdb[0] = ScsiOpcode::Read12 as u8;
    cdb[2..6].copy_from_slice(&lba.to_be_bytes());
    cdb[6..10].copy_from_slice(&count.to_be_bytes());
    cdb
}

#[test]
fn read_streams_requested_sectors() {
    let (mut ctrl, mut host) = setup(16);
    issue(&mut ctrl, &mut host, read12(5, 2));
    assert_eq!(ctrl.state(), AtapiState::DataPio);
    assert_eq!(ctrl.last_packet_opcode(), Some(0xA8));

    let words: Vec<u16> = (0..2048).map(|_| ctrl.pio_read_word(&mut host)).collect();
    assert!(words[..1024].iter().all(|w| *w == 0x0505));
    assert!(words[1024..].iter().all(|w| *w == 0x0606));

    let stats = ctrl.stats();
    assert_eq!(stats.commands, 1);
    assert_eq!(stats.sectors_read, 2);
    assert_eq!(stats.pio_words_read, 2048);
    assert_eq!(stats.packet_words_written, 6);
    assert_eq!(stats.interrupts, host.interrupts.len() as u64);
    assert_eq!(ctrl.state(), AtapiState::Complete);
}

#[test]
fn out_of_range_read_sets_check_condition() {
    let (mut ctrl, mut host) = setup(4);
    issue(&mut ctrl, &mut host, read12(3, 2));

    assert!(ctrl.status().check());
    assert!(ctrl.status().drq());
    assert_eq!(ctrl.peek_register(AtapiRegister::ErrorFeature), SENSE_ILLEGAL_REQUEST);
    assert_eq!(ctrl.state(), AtapiState::Complete);
    assert_eq!(ctrl.stats().device_errors, 1);
}

#[test]
fn short_result_is_padded_to_a_word() {
    let (mut ctrl, mut host) = setup(4);
    let mut cdb = [0u8; 12];
    cdb[0] = ScsiOpcode::ReadCapacity as u8;
    issue(&mut ctrl, &mut host, cdb);

    assert_eq!(ctrl.task_file().byte_count(), 8);
    for _ in 0..4 {
        ctrl.pio_read_word(&mut host);
    }
    assert!(ctrl.transfer().is_empty());
    assert!(!ctrl.status().drq());
}

#[test]
fn sub_sector_dma_fires_immediately() {
    let (mut ctrl, mut host) = setup(4);
    let mut cdb = [0u8; 12];
    cdb[0] = ScsiOpcode::ReadCapacity as u8;
    issue(&mut ctrl, &mut host, cdb);

    ctrl.dma_burst_requested(0x100, &mut host);
    assert_eq!(host.scheduler.next_deadline(), Some(0));
    for event in host.scheduler.advance(0) {
        ctrl.handle_event(event, &mut host);
    }
    assert_eq!(ctrl.stats().dma_dwords_written, 2);
    assert_eq!(ctrl.state(), AtapiState::Complete);
}

#[test]
fn dma_request_without_data_phase_is_ignored() {
    let (mut ctrl, mut host) = setup(4);
    ctrl.dma_burst_requested(0x100, &mut host);
    assert!(host.scheduler.is_empty());
    assert_eq!(ctrl.state(), AtapiState::Ready);
}

#[test]
fn stale_events_are_ignored() {
    let (mut ctrl, mut host) = setup(4);
    let before = ctrl.task_file().clone();
    ctrl.handle_event(AtapiEvent::DmaBurst, &mut host);
    ctrl.handle_event(AtapiEvent::PlayComplete, &mut host);
    assert_eq!(ctrl.task_file(), &before);
    assert!(host.interrupts.is_empty());
}

#[test]
fn dma_request_after_play_is_refused() {
    let (mut ctrl, mut host) = setup(16);
    let mut play = [0u8; 12];
    play[0] = ScsiOpcode::PlayAudio10 as u8;
    issue(&mut ctrl, &mut host, play);
    assert!(host.scheduler.is_pending(AtapiEvent::PlayComplete));

    // PLAY leaves no data phase, so the DMA request is refused and PLAY keeps the timer.
    ctrl.dma_burst_requested(0x100, &mut host);
    assert!(host.scheduler.is_pending(AtapiEvent::PlayComplete));
    assert!(!host.scheduler.is_pending(AtapiEvent::DmaBurst));
}

#[test]
fn mode_select_odd_length_rounds_up() {
    let (mut ctrl, mut host) = setup(4);
    let mut cdb = [0u8; 12];
    cdb[0] = ScsiOpcode::ModeSelect10 as u8;
    cdb[8] = 5;
    issue(&mut ctrl, &mut host, cdb);
    assert_eq!(ctrl.state(), AtapiState::ModeParamWait);
    assert_eq!(ctrl.peek_register(AtapiRegister::InterruptReason), 0);

    for w in [0x2211u16, 0x4433, 0x0055] {
        ctrl.packet_word_write(w, &mut host);
    }
    assert_eq!(ctrl.state(), AtapiState::Ready);
    assert_eq!(ctrl.peek_register(AtapiRegister::CommandStatus), 0);
}

#[test]
fn mode_select_without_parameters_completes() {
    let (mut ctrl, mut host) = setup(4);
    let mut cdb = [0u8; 12];
    cdb[0] = ScsiOpcode::ModeSelect10 as u8;
    issue(&mut ctrl, &mut host, cdb);
    assert_eq!(ctrl.state(), AtapiState::Complete);
    assert_eq!(ctrl.peek_register(AtapiRegister::CommandStatus), STATUS_DRDY);
}

#[test]
fn wide_read_goes_to_data_register() {
    let (mut ctrl, mut host) = setup(4);
    issue(&mut ctrl, &mut host, read12(2, 1));
    assert_eq!(ctrl.read(0, WORD_LANE_MASK, &mut host), 0x0202);
    assert_eq!(ctrl.staged_words(), 1023);
}

#[test]
fn identify_block_carries_model_string() {
    let config = AtapiConfig {
        model: "TEST DRIVE".to_string(),
        ..AtapiConfig::default()
    };
    let mut ctrl = AtapiController::new(config, Box::new(ImageDevice::new(1)));
    let mut host = SimpleHost::new(4096);
    ctrl.command_write(0xA1, &mut host);

    let words: Vec<u16> = (0..256).map(|_| ctrl.pio_read_word(&mut host)).collect();
    let model: Vec<u8> = words[27..47].iter().flat_map(|w| w.to_be_bytes()).collect();
    assert!(model.starts_with(b"TEST DRIVE"));
    assert_eq!(ctrl.state(), AtapiState::Complete);
}
