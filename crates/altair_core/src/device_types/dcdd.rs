/*
    AltairPC

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

    device_types::dcdd.rs

    Register definitions and wire formats for the MITS 88-DCDD disk controller.
*/

//! Types describing the 88-DCDD's registers.
//!
//! The status register is active-low: a `0` bit means the condition is true. [DriveStatus]
//! hides the inversion so that callers can speak in positive logic.

use std::fmt::Display;

use modular_bitfield::{bitfield, prelude::*};
use strum::IntoEnumIterator;
use strum_macros::{Display as StrumDisplay, EnumIter};

pub const MAX_DRIVES: usize = 4;
pub const DRIVE_SELECT_MASK: u8 = 0x0F;

pub const SECTOR_SIZE: usize = 137;
// Two bytes of slack after the sector payload absorb a runaway write.
pub const SECTOR_BUFFER_SIZE: usize = SECTOR_SIZE + 2;
pub const SECTORS_PER_TRACK: usize = 32;
pub const MAX_TRACKS: usize = 77;
pub const TRACK_SIZE: usize = SECTORS_PER_TRACK * SECTOR_SIZE;
pub const DISK_SIZE: usize = MAX_TRACKS * TRACK_SIZE;

pub const SECTOR_SHIFT_BITS: u8 = 1;
/// Bits 7-6 of the sector position register always read as 1.
pub const SECTOR_FIXED_BITS: u8 = 0b1100_0000;
/// Value returned by the sector position register when no disk is in the drive.
pub const SECTOR_NO_DISK: u8 = SECTOR_FIXED_BITS;
/// Value returned by the data register when no disk is in the drive.
pub const READ_NO_DISK: u8 = 0x00;

// Status register bit definitions (active-low)
pub const STATUS_ENWD: u8 = 0b0000_0001;
pub const STATUS_MOVE_HEAD: u8 = 0b0000_0010;
pub const STATUS_HEAD: u8 = 0b0000_0100;
pub const STATUS_SECTOR: u8 = 0b0000_1000;
pub const STATUS_IE: u8 = 0b0010_0000;
pub const STATUS_TRACK_0: u8 = 0b0100_0000;
pub const STATUS_NRDA: u8 = 0b1000_0000;

pub const STATUS_DEFAULT: u8 =
    STATUS_ENWD | STATUS_MOVE_HEAD | STATUS_HEAD | STATUS_IE | STATUS_TRACK_0 | STATUS_NRDA;

/// Named lines of the drive status register.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, StrumDisplay)]
pub enum StatusFlag {
    #[strum(to_string = "ENWD")]
    WriteEnable = STATUS_ENWD,
    #[strum(to_string = "MH")]
    MoveHead = STATUS_MOVE_HEAD,
    #[strum(to_string = "HS")]
    HeadStatus = STATUS_HEAD,
    #[strum(to_string = "SECT")]
    SectorTrue = STATUS_SECTOR,
    #[strum(to_string = "INTE")]
    InterruptEnable = STATUS_IE,
    #[strum(to_string = "TRK0")]
    TrackZero = STATUS_TRACK_0,
    #[strum(to_string = "NRDA")]
    ReadDataAvailable = STATUS_NRDA,
}

impl StatusFlag {
    #[inline]
    pub fn mask(self) -> u8 {
        self as u8
    }
}

/// The drive status register.
///
/// Stored exactly as the CPU reads it, so a flag is asserted (true) when its bit is clear.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DriveStatus(u8);

impl Default for DriveStatus {
    /// Nothing happening: head unloaded, not at track 0, no data.
    fn default() -> Self {
        Self(STATUS_DEFAULT)
    }
}

impl From<DriveStatus> for u8 {
    fn from(status: DriveStatus) -> Self {
        status.0
    }
}

impl Display for DriveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X} [", self.0)?;
        let mut first = true;
        for flag in StatusFlag::iter().filter(|flag| self.is_asserted(*flag)) {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", flag)?;
            first = false;
        }
        write!(f, "]")
    }
}

impl DriveStatus {
    /// Status of a freshly loaded disk: positioned at track 0, sector 0, head free to move.
    pub fn loaded() -> Self {
        let mut status = Self::default();
        status.assert_flag(StatusFlag::MoveHead);
        status.assert_flag(StatusFlag::TrackZero);
        status.assert_flag(StatusFlag::SectorTrue);
        status
    }

    /// Drive a status line true (clears the bit).
    #[inline]
    pub fn assert_flag(&mut self, flag: StatusFlag) {
        self.0 &= !flag.mask();
    }

    /// Drive a status line false (sets the bit).
    #[inline]
    pub fn negate_flag(&mut self, flag: StatusFlag) {
        self.0 |= flag.mask();
    }

    #[inline]
    pub fn set_flag(&mut self, flag: StatusFlag, state: bool) {
        if state {
            self.assert_flag(flag);
        }
        else {
            self.negate_flag(flag);
        }
    }

    #[inline]
    pub fn is_asserted(&self, flag: StatusFlag) -> bool {
        self.0 & flag.mask() == 0
    }

    /// Return the raw register byte as read from the status port.
    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// The control byte written to the drive function port.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct ControlByte {
    pub step_in: bool,
    pub step_out: bool,
    pub head_load: bool,
    pub head_unload: bool,
    pub interrupt_enable: bool,
    pub interrupt_disable: bool,
    pub head_current_switch: bool,
    pub write_enable: bool,
}

impl From<u8> for ControlByte {
    fn from(byte: u8) -> Self {
        ControlByte::from_bytes([byte])
    }
}

/// Encode the value read from the sector position register.
///
/// Bits 7-6 are fixed, bits 5-1 hold the sector number, bit 0 is low while the head is at
/// the start of the sector.
#[inline]
pub fn encode_sector_position(sector: u8, sector_true: bool) -> u8 {
    SECTOR_FIXED_BITS | ((sector & 0x1F) << SECTOR_SHIFT_BITS) | if sector_true { 0 } else { 1 }
}
