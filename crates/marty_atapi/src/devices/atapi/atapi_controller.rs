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

//! An [AtapiController] implements the task file and packet command sequencer of an ATAPI
//! CD-ROM interface sitting on a 32-bit bus.
//!
//! Command packets and result data travel through the Data register as 16-bit words using
//! the wide bus access pattern. All other registers are byte-wide and are reached through
//! either half of a 32-bit bus word.

use crate::{
    bus::{register_list, AtapiEvent, BusLanes, HostInterface, NO_BUS_DATA, REGISTER_BLOCK_SIZE},
    config::AtapiConfig,
    devices::atapi::{
        atapi_identification::{
            AtapiIdentification,
            CAPABILITIES_IORDY_DISABLE,
            GENERAL_CONFIG_ATAPI_CDROM,
            IDENTIFY_BLOCK_SIZE,
        },
        atapi_registers::*,
        atapi_transfer::{TransferPath, TransferState, WordBuffer},
        scsi::{mode_select_parameter_length, words_to_bytes, words_to_cdb_bytes, ScsiDevice, ScsiOpcode, CDB_WORDS},
    },
};
use strum_macros::Display;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum AtaCommand {
    Packet = 0xA0,
    IdentifyPacketDevice = 0xA1,
    SetFeatures = 0xEF,
}

impl AtaCommand {
    pub fn from_byte(byte: u8) -> Option<AtaCommand> {
        match byte {
            0xA0 => Some(AtaCommand::Packet),
            0xA1 => Some(AtaCommand::IdentifyPacketDevice),
            0xEF => Some(AtaCommand::SetFeatures),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum AtapiState {
    /// Waiting for a command register write.
    Ready,
    /// Collecting the six words of a command packet.
    PacketBuild,
    /// Collecting a MODE SELECT parameter list.
    ModeParamWait,
    /// Result data is (or may be) streamed through the Data register.
    DataPio,
    /// Result data is delivered by timed bursts into system memory.
    DataDma,
    /// The last command finished. Status and byte count registers hold its outcome.
    Complete,
}

/// Parameter words expected after a MODE SELECT packet.
#[derive(Clone, Debug, Default)]
pub(super) struct ModeParameterBuffer {
    pub(super) expected: usize,
    pub(super) words: Vec<u16>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AtapiStats {
    pub commands: u64,
    pub device_errors: u64,
    pub packet_words_written: u64,
    pub pio_words_read: u64,
    pub dma_dwords_written: u64,
    pub sectors_read: u64,
    pub interrupts: u64,
}

pub struct AtapiController {
    pub(super) config: AtapiConfig,
    pub(super) device: Box<dyn ScsiDevice>,
    pub(super) regs: TaskFile,
    pub(super) state: AtapiState,
    pub(super) packet: Vec<u16>,
    pub(super) mode_params: Option<ModeParameterBuffer>,
    pub(super) xfer: TransferState,
    pub(super) staging: WordBuffer,
    pub(super) dma_address: Option<u32>,
    pub(super) play_pending: bool,
    pub(super) identify_words: Vec<u16>,
    pub(super) last_packet: Option<u8>,
    reset_line: u32,
    pub(super) stats: AtapiStats,
}

impl AtapiController {
    /// Create a controller with `device` attached. The register file starts in its reset state.
    pub fn new(config: AtapiConfig, device: Box<dyn ScsiDevice>) -> Self {
        let identify_words = AtapiIdentification::new(&config.model, &config.firmware, &config.serial)
            .to_words()
            .unwrap_or_else(|e| {
                log::error!("Failed to build ATAPI identify block: {}", e);
                let mut words = vec![0; IDENTIFY_BLOCK_SIZE / 2];
                words[0] = GENERAL_CONFIG_ATAPI_CDROM;
                words[49] = CAPABILITIES_IORDY_DISABLE;
                words
            });

        let mut controller = Self {
            config,
            device,
            regs: TaskFile::new(),
            state: AtapiState::Ready,
            packet: Vec::with_capacity(CDB_WORDS),
            mode_params: None,
            xfer: TransferState::default(),
            staging: WordBuffer::new(),
            dma_address: None,
            play_pending: false,
            identify_words,
            last_packet: None,
            reset_line: 0,
            stats: AtapiStats::default(),
        };
        controller.reset();
        controller
    }

    /// Soft reset. Loads the ATAPI signature and discards any command in flight.
    pub fn reset(&mut self) {
        log::trace!("Resetting AtapiController...");
        self.regs.load_signature();
        self.packet.clear();
        self.mode_params = None;
        self.xfer.clear();
        self.staging.clear();
        self.dma_address = None;
        self.play_pending = false;
        self.state = AtapiState::Ready;
    }

    /// Drive the external reset input. A reset occurs on a transition from zero to nonzero.
    pub fn write_reset_line(&mut self, value: u32, host: &mut dyn HostInterface) {
        let edge = self.reset_line == 0 && value != 0;
        self.reset_line = value;
        if edge {
            log::debug!("ATAPI reset line asserted");
            host.cancel_event(AtapiEvent::DmaBurst);
            host.cancel_event(AtapiEvent::PlayComplete);
            self.reset();
        }
    }

    pub fn config(&self) -> &AtapiConfig {
        &self.config
    }

    pub fn device(&self) -> &dyn ScsiDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn ScsiDevice {
        self.device.as_mut()
    }

    #[inline]
    pub fn state(&self) -> AtapiState {
        self.state
    }

    #[inline]
    pub fn transfer(&self) -> &TransferState {
        &self.xfer
    }

    #[inline]
    pub fn status(&self) -> AtapiStatusRegister {
        self.regs.status()
    }

    #[inline]
    pub fn task_file(&self) -> &TaskFile {
        &self.regs
    }

    #[inline]
    pub fn stats(&self) -> &AtapiStats {
        &self.stats
    }

    /// Opcode of the most recently dispatched command packet.
    pub fn last_packet_opcode(&self) -> Option<u8> {
        self.last_packet
    }

    /// Words staged for the host but not yet read.
    pub fn staged_words(&self) -> usize {
        self.staging.len() - self.staging.read_ptr()
    }

    /// Read a register without side effects, for debugger displays.
    pub fn peek_register(&self, reg: AtapiRegister) -> u8 {
        self.regs.read(reg)
    }

    /// Register names and bus addresses of this controller's block.
    pub fn register_list(&self) -> Vec<(String, u32)> {
        register_list(self.config.base_address)
    }

    /// Word offset of `address` within the configured register block.
    fn block_offset(&self, address: u32) -> Option<u32> {
        let rel = address.wrapping_sub(self.config.base_address);
        (rel < REGISTER_BLOCK_SIZE).then_some(rel >> 2)
    }

    /// Handle a bus read at an absolute `address`.
    pub fn mmio_read(&mut self, address: u32, mask: u32, host: &mut dyn HostInterface) -> u32 {
        match self.block_offset(address) {
            Some(offset) => self.read(offset, mask, host),
            None => {
                log::warn!("ATAPI: read from unmapped address {:08X}", address);
                NO_BUS_DATA
            }
        }
    }

    /// Handle a bus write at an absolute `address`. The reset register sits outside the
    /// register block.
    pub fn mmio_write(&mut self, address: u32, mask: u32, data: u32, host: &mut dyn HostInterface) {
        if address == self.config.reset_address {
            self.write_reset_line(data, host);
            return;
        }
        match self.block_offset(address) {
            Some(offset) => self.write(offset, mask, data, host),
            None => log::warn!("ATAPI: write to unmapped address {:08X}: {:08X}", address, data),
        }
    }

    /// A DMA controller channel has been programmed for a transfer to `address`. Requests on
    /// channels other than the configured one are not for this device.
    pub fn dma_request(&mut self, channel: u8, address: u32, host: &mut dyn HostInterface) {
        if channel != self.config.dma_channel {
            log::trace!("ATAPI: ignoring DMA request on channel {}", channel);
            return;
        }
        self.dma_burst_requested(address, host);
    }

    /// Handle a 32-bit bus read at word `offset` within the register block. `mask` marks the
    /// active byte lanes.
    pub fn read(&mut self, offset: u32, mask: u32, host: &mut dyn HostInterface) -> u32 {
        let lanes = BusLanes::decode(mask);
        if let BusLanes::Word = lanes {
            return self.pio_read_word(host) as u32;
        }

        let reg = match lanes.register_index(offset).map(AtapiRegister::try_from) {
            Some(Ok(reg)) => reg,
            Some(Err(e)) => {
                log::warn!("ATAPI read at offset {:X} mask {:08X}: {}", offset, mask, e);
                return NO_BUS_DATA;
            }
            None => return NO_BUS_DATA,
        };

        let byte = self.regs.read(reg);
        if self.config.trace {
            log::trace!("atapi read {}: {:02X}", reg, byte);
        }
        (byte as u32) << lanes.shift()
    }

    /// Handle a 32-bit bus write at word `offset` within the register block.
    pub fn write(&mut self, offset: u32, mask: u32, data: u32, host: &mut dyn HostInterface) {
        let lanes = BusLanes::decode(mask);
        if let BusLanes::Word = lanes {
            self.packet_word_write(data as u16, host);
            return;
        }

        let reg = match lanes.register_index(offset).map(AtapiRegister::try_from) {
            Some(Ok(reg)) => reg,
            Some(Err(e)) => {
                log::warn!("ATAPI write at offset {:X} mask {:08X}: {}", offset, mask, e);
                return;
            }
            None => return,
        };

        let byte = (data >> lanes.shift()) as u8;
        if self.config.trace {
            log::trace!("atapi write {}: {:02X}", reg, byte);
        }

        match reg {
            AtapiRegister::CommandStatus => self.command_write(byte, host),
            _ => self.regs.write(reg, byte),
        }
    }

    #[inline]
    pub(super) fn raise_interrupt(&mut self, host: &mut dyn HostInterface) {
        self.stats.interrupts += 1;
        host.raise_interrupt(self.config.irq_vector);
    }

    /// True while the device is busy with a timed operation that a new command must not
    /// clobber.
    fn busy(&self) -> bool {
        self.play_pending || (self.state == AtapiState::DataDma && self.dma_address.is_some())
    }

    /// Discard whatever command is in flight.
    fn abort_in_flight(&mut self) {
        let in_flight = match self.state {
            AtapiState::PacketBuild => !self.packet.is_empty(),
            AtapiState::ModeParamWait => true,
            AtapiState::DataPio | AtapiState::DataDma => !self.xfer.is_empty() || !self.staging.is_drained(),
            AtapiState::Ready | AtapiState::Complete => false,
        };
        if in_flight {
            log::warn!(
                "Command received in state {} with transfer in flight ({} + {} bytes, {} words staged); aborting it",
                self.state,
                self.xfer.chunk_remaining(),
                self.xfer.total_remaining(),
                self.staged_words()
            );
        }
        self.packet.clear();
        self.mode_params = None;
        self.xfer.clear();
        self.staging.clear();
        self.dma_address = None;
    }

    /// Handle a write to the command register.
    pub fn command_write(&mut self, byte: u8, host: &mut dyn HostInterface) {
        let Some(command) = AtaCommand::from_byte(byte)
        else {
            log::debug!("ATAPI: Unknown IDE command {:02X}", byte);
            return;
        };

        if self.busy() {
            log::error!("ATAPI: {} command rejected while device is busy", command);
            return;
        }

        log::debug!("ATAPI: {} command received", command);
        self.abort_in_flight();

        match command {
            AtaCommand::Packet => {
                self.regs.set_status(STATUS_DRQ);
                self.regs.set_interrupt_reason(INTREASON_COMMAND);
                self.state = AtapiState::PacketBuild;
            }
            AtaCommand::IdentifyPacketDevice => {
                self.staging.extend(&self.identify_words);
                // The identify block is PIO-only data; no device transfer follows it.
                self.xfer.claim(TransferPath::Pio);
                self.regs.set_status(STATUS_DRQ);
                self.regs.set_byte_count(IDENTIFY_BLOCK_SIZE);
                self.state = AtapiState::DataPio;
                self.raise_interrupt(host);
            }
            AtaCommand::SetFeatures => {
                self.regs.set_status(0);
                self.state = AtapiState::Ready;
                self.raise_interrupt(host);
            }
        }
    }

    /// Handle a wide write to the Data register.
    pub fn packet_word_write(&mut self, word: u16, host: &mut dyn HostInterface) {
        self.stats.packet_words_written += 1;
        match self.state {
            AtapiState::PacketBuild => {
                self.packet.push(word);
                if self.packet.len() == CDB_WORDS {
                    self.dispatch_packet(host);
                }
            }
            AtapiState::ModeParamWait => {
                let Some(params) = self.mode_params.as_mut()
                else {
                    log::error!("ATAPI: ModeParamWait without parameter buffer");
                    self.state = AtapiState::Ready;
                    return;
                };
                params.words.push(word);
                if params.words.len() >= params.expected {
                    let bytes = words_to_bytes(&params.words);
                    log::debug!("ATAPI: MODE SELECT parameter list complete, {} bytes", bytes.len());
                    self.mode_params = None;
                    self.xfer.clear();
                    self.staging.clear();
                    self.device.write_data(&bytes);
                    self.raise_interrupt(host);
                    self.regs.set_status(0);
                    self.state = AtapiState::Ready;
                }
            }
            _ => {
                log::warn!("ATAPI: Data word {:04X} written in state {}; ignored", word, self.state);
            }
        }
    }

    /// Send a completed command packet to the device and set up its data phase.
    fn dispatch_packet(&mut self, host: &mut dyn HostInterface) {
        let mut words = [0u16; CDB_WORDS];
        words.copy_from_slice(&self.packet);
        self.packet.clear();
        self.staging.clear();

        let cdb = words_to_cdb_bytes(&words);
        let opcode = cdb[0];
        self.last_packet = Some(opcode);
        self.stats.commands += 1;

        match self.device.exec_command(&cdb) {
            Ok(byte_count) => {
                log::debug!(
                    "ATAPI: SCSI command {:02X} ({}) returned {} bytes",
                    opcode,
                    ScsiOpcode::from_repr(opcode).map_or("unknown".to_string(), |op| op.to_string()),
                    byte_count
                );
                self.xfer = TransferState::new(byte_count);
                self.regs.set_byte_count(self.xfer.chunk_remaining());

                if self.xfer.chunk_remaining() == 0 {
                    self.regs.set_status(STATUS_DRDY);
                    self.regs.set_interrupt_reason(INTREASON_IO | INTREASON_COMMAND);
                    self.state = AtapiState::Complete;
                }
                else {
                    self.regs.set_status(STATUS_DRQ | STATUS_SERVICE_DSC);
                    self.regs.set_interrupt_reason(INTREASON_IO);
                    self.state = AtapiState::DataPio;
                }

                self.apply_opcode_side_effects(&cdb, host);
                self.raise_interrupt(host);
            }
            Err(e) => {
                log::error!("ATAPI: SCSI device returned error for command {:02X}: {}", opcode, e);
                self.stats.device_errors += 1;
                self.xfer.clear();
                self.regs.set_status(STATUS_DRQ | STATUS_CHECK);
                self.regs.set_error(SENSE_ILLEGAL_REQUEST);
                self.regs.set_byte_count(0);
                self.state = AtapiState::Complete;
            }
        }
    }

    fn apply_opcode_side_effects(&mut self, cdb: &[u8; 12], host: &mut dyn HostInterface) {
        match ScsiOpcode::from_repr(cdb[0]) {
            Some(ScsiOpcode::ModeSelect10) => {
                let expected = mode_select_parameter_length(cdb).div_ceil(2);
                if expected > 0 {
                    log::debug!("ATAPI: MODE SELECT expects {} parameter words", expected);
                    // The data register now carries parameter words; no result data follows.
                    self.xfer.clear();
                    self.mode_params = Some(ModeParameterBuffer {
                        expected,
                        words: Vec::with_capacity(expected),
                    });
                    self.regs.set_status(STATUS_DRQ);
                    self.regs.set_interrupt_reason(0);
                    self.state = AtapiState::ModeParamWait;
                }
            }
            Some(ScsiOpcode::TestUnitReady) | Some(ScsiOpcode::SetCdSpeed) => {
                self.regs.set_status(0);
            }
            Some(ScsiOpcode::PlayAudio10) => {
                self.regs.set_status(STATUS_BSY);
                self.play_pending = true;
                host.cancel_event(AtapiEvent::DmaBurst);
                host.schedule_event(AtapiEvent::PlayComplete, self.config.cycles_per_sector);
            }
            _ => {}
        }
    }

    /// Service an event previously armed on the host scheduler.
    pub fn handle_event(&mut self, event: AtapiEvent, host: &mut dyn HostInterface) {
        match event {
            AtapiEvent::DmaBurst => self.dma_burst(host),
            AtapiEvent::PlayComplete => self.play_complete(host),
        }
    }

    fn play_complete(&mut self, host: &mut dyn HostInterface) {
        if !self.play_pending {
            log::debug!("ATAPI: stale PLAY completion ignored");
            return;
        }
        log::debug!("ATAPI: PLAY complete");
        self.play_pending = false;
        self.xfer.clear();
        self.staging.clear();
        self.regs.set_status(STATUS_DRDY);
        self.regs.set_interrupt_reason(INTREASON_IO | INTREASON_COMMAND);
        self.state = AtapiState::Complete;
        self.raise_interrupt(host);
    }
}
