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

    devices::dcdd::mod.rs

    Implements the MITS 88-DCDD floppy disk controller.

    The controller presents three I/O ports to the CPU:

      base + 0  OUT: drive select        IN: drive status
      base + 1  OUT: drive function      IN: sector position
      base + 2  OUT: write data          IN: read data

    All operations act on the currently selected drive. An empty drive
    behaves like an empty drive bay: commands are ignored and reads return
    fixed values.
*/

pub mod drive;
pub mod media;
pub mod patch_pool;

use std::path::{Path, PathBuf};

use crate::{
    bus::IoDevice,
    device_types::dcdd::{ControlByte, DRIVE_SELECT_MASK, MAX_DRIVES},
};

pub use drive::DiskDrive;
pub use media::{CowMedia, DiskMedia, FileMedia};
pub use patch_pool::{PatchPool, PatchPoolStats};

pub const DCDD_IO_BASE: u16 = 0x08;

pub const DCDD_SELECT_STATUS_REGISTER: u16 = 0x00;
pub const DCDD_FUNCTION_SECTOR_REGISTER: u16 = 0x01;
pub const DCDD_DATA_REGISTER: u16 = 0x02;

#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("Invalid drive number: {0}")]
    InvalidDrive(usize),
    #[error("Disk image already exists: {}", .0.display())]
    ImageExists(PathBuf),
    #[error("Disk image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CowDiskController = DiskController<CowMedia>;
pub type FileDiskController = DiskController<FileMedia>;

pub struct DiskController<M: DiskMedia> {
    drives: [DiskDrive<M>; MAX_DRIVES],
    selected: usize,
    shared: M::Shared,
    io_base: u16,
}

impl<M: DiskMedia> DiskController<M> {
    pub fn new(shared: M::Shared) -> Self {
        Self {
            drives: std::array::from_fn(DiskDrive::new),
            selected: 0,
            shared,
            io_base: DCDD_IO_BASE,
        }
    }

    /// Place the controller's ports at `io_base` instead of the default.
    pub fn with_io_base(mut self, io_base: u16) -> Self {
        self.io_base = io_base;
        self
    }

    pub fn io_base(&self) -> u16 {
        self.io_base
    }

    /// Return the port number of a controller register, or None if it lies past the end of
    /// the port space.
    pub fn port(&self, register: u16) -> Option<u16> {
        self.io_base.checked_add(register)
    }

    /// Insert media into a drive. Any media already in the drive is released first.
    pub fn load(&mut self, drive_n: usize, media: M) -> Result<(), DiskError> {
        let drive = self.drives.get_mut(drive_n).ok_or(DiskError::InvalidDrive(drive_n))?;
        log::info!("Loading drive {}: {}", drive_n, media.describe());
        drive.load(&mut self.shared, media);
        Ok(())
    }

    /// Remove the media from a drive and return it. Returns `Ok(None)` for an empty drive.
    pub fn eject(&mut self, drive_n: usize) -> Result<Option<M>, DiskError> {
        let drive = self.drives.get_mut(drive_n).ok_or(DiskError::InvalidDrive(drive_n))?;
        let media = drive.eject(&mut self.shared);
        if media.is_some() {
            log::info!("Ejected drive {}", drive_n);
        }
        Ok(media)
    }

    /// Return the index of the selected drive.
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn drive(&self, drive_n: usize) -> Option<&DiskDrive<M>> {
        self.drives.get(drive_n)
    }

    pub fn drives(&self) -> impl Iterator<Item = &DiskDrive<M>> {
        self.drives.iter()
    }

    /// Write any pending sector on every drive back to its media.
    pub fn flush_all(&mut self) {
        for drive in self.drives.iter_mut() {
            drive.flush(&mut self.shared);
        }
    }

    pub fn shared(&self) -> &M::Shared {
        &self.shared
    }

    /// Select a drive. The index is masked to four bits; a drive number the controller
    /// doesn't have selects drive 0.
    pub fn select(&mut self, drive_n: u8) {
        let masked = (drive_n & DRIVE_SELECT_MASK) as usize;
        self.selected = if masked < MAX_DRIVES {
            masked
        }
        else {
            log::debug!("Select of nonexistent drive {}, selecting drive 0", masked);
            0
        };
    }

    /// Return the status register of the selected drive.
    pub fn status(&self) -> u8 {
        self.drives[self.selected].status().bits()
    }

    /// Apply a control byte to the selected drive.
    pub fn function(&mut self, control: u8) {
        self.drives[self.selected].function(&mut self.shared, ControlByte::from(control));
    }

    /// Advance the selected drive to its next sector and return the sector position register.
    pub fn sector(&mut self) -> u8 {
        self.drives[self.selected].sector_position(&mut self.shared)
    }

    pub fn write(&mut self, data: u8) {
        self.drives[self.selected].write_byte(&mut self.shared, data);
    }

    pub fn read(&mut self) -> u8 {
        self.drives[self.selected].read_byte(&mut self.shared)
    }
}

impl DiskController<CowMedia> {
    /// Create a controller whose drives share a patch pool of `pool_size` sectors.
    pub fn with_patch_pool(pool_size: usize) -> Self {
        Self::new(PatchPool::new(pool_size))
    }

    /// Load an image file into memory and insert it in a drive.
    pub fn load_image(&mut self, drive_n: usize, path: impl AsRef<Path>) -> Result<(), DiskError> {
        self.load(drive_n, CowMedia::from_file(path)?)
    }

    pub fn patch_stats(&self) -> PatchPoolStats {
        self.shared.stats()
    }
}

impl DiskController<FileMedia> {
    /// Open an image file for direct access and insert it in a drive.
    pub fn load_file(&mut self, drive_n: usize, path: impl AsRef<Path>) -> Result<(), DiskError> {
        self.load(drive_n, FileMedia::open(path)?)
    }
}

impl<M: DiskMedia> Drop for DiskController<M> {
    fn drop(&mut self) {
        self.flush_all();
    }
}

impl<M: DiskMedia> IoDevice for DiskController<M> {
    fn read_u8(&mut self, port: u16) -> u8 {
        match port.wrapping_sub(self.io_base) {
            DCDD_SELECT_STATUS_REGISTER => self.status(),
            DCDD_FUNCTION_SECTOR_REGISTER => self.sector(),
            DCDD_DATA_REGISTER => self.read(),
            _ => unreachable!("DCDD: Bad port #"),
        }
    }

    fn write_u8(&mut self, port: u16, data: u8) {
        match port.wrapping_sub(self.io_base) {
            DCDD_SELECT_STATUS_REGISTER => self.select(data),
            DCDD_FUNCTION_SECTOR_REGISTER => self.function(data),
            DCDD_DATA_REGISTER => self.write(data),
            _ => unreachable!("DCDD: Bad port #"),
        }
    }

    fn port_list(&self) -> Vec<(String, u16)> {
        [
            ("DCDD Drive Select/Status", DCDD_SELECT_STATUS_REGISTER),
            ("DCDD Drive Function/Sector Position", DCDD_FUNCTION_SECTOR_REGISTER),
            ("DCDD Data", DCDD_DATA_REGISTER),
        ]
        .into_iter()
        .filter_map(|(desc, register)| match self.port(register) {
            Some(port) => Some((String::from(desc), port)),
            None => {
                log::error!(
                    "DCDD: {} register is out of range at base port {:04X}",
                    desc,
                    self.io_base
                );
                None
            }
        })
        .collect()
    }
}
