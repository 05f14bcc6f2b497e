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

//! Error types for the ATAPI controller and its attached SCSI device.

use thiserror::Error;

/// An error returned by an attached [ScsiDevice](super::scsi::ScsiDevice) when it cannot
/// execute a command. The controller reports every variant to the host identically, as
/// ILLEGAL REQUEST; the detail exists for logging only.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScsiError {
    #[error("Unsupported SCSI opcode: {0:02X}")]
    UnsupportedCommand(u8),
    #[error("No medium present.")]
    NoMedium,
    #[error("Logical block address out of range: {0}")]
    AddressOutOfRange(u32),
    #[error("Invalid field in command descriptor block.")]
    InvalidField,
}

/// Errors surfaced by the controller's non-bus API. Bus accesses themselves never fail.
#[derive(Error, Debug)]
pub enum AtapiError {
    #[error("Invalid task file register index: {0}")]
    InvalidRegister(usize),
    #[error("Failed to parse ATAPI configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Failed to build identify block: {0}")]
    Identification(#[from] binrw::Error),
}
