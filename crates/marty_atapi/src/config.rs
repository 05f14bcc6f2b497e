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

    config.rs

    Configuration for an ATAPI controller instance, read from the machine's
    TOML configuration.

*/

use crate::devices::atapi::atapi_error::AtapiError;
use serde_derive::Deserialize;

/// Default delay per 2048-byte sector before a DMA burst or PLAY completes. Boot firmware
/// misbehaves below roughly 2000 cycles.
pub const DEFAULT_CYCLES_PER_SECTOR: u64 = 5000;
pub const DEFAULT_IRQ_VECTOR: u32 = 0x400;
pub const DEFAULT_BASE_ADDRESS: u32 = 0x1F48_0000;
pub const DEFAULT_RESET_ADDRESS: u32 = 0x1F56_0000;
pub const DEFAULT_DMA_CHANNEL: u8 = 5;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AtapiConfig {
    pub cycles_per_sector: u64,
    pub irq_vector: u32,
    pub base_address: u32,
    pub reset_address: u32,
    pub dma_channel: u8,
    /// Log every task file register access at trace level.
    pub trace: bool,
    pub model: String,
    pub firmware: String,
    pub serial: String,
}

impl Default for AtapiConfig {
    fn default() -> Self {
        Self {
            cycles_per_sector: DEFAULT_CYCLES_PER_SECTOR,
            irq_vector: DEFAULT_IRQ_VECTOR,
            base_address: DEFAULT_BASE_ADDRESS,
            reset_address: DEFAULT_RESET_ADDRESS,
            dma_channel: DEFAULT_DMA_CHANNEL,
            trace: false,
            model: "MARTYPC ATAPI CD-ROM".to_string(),
            firmware: "1.00".to_string(),
            serial: "0000000000000MARTYPC".to_string(),
        }
    }
}

impl AtapiConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, AtapiError> {
        let config: AtapiConfig = toml::from_str(toml_str)?;
        if config.cycles_per_sector < 2000 {
            log::warn!(
                "ATAPI cycles_per_sector of {} is below 2000; boot firmware may fail.",
                config.cycles_per_sector
            );
        }
        Ok(config)
    }
}
