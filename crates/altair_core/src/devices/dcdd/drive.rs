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

    devices::dcdd::drive.rs

    Implements a single 8" drive attached to the 88-DCDD.
    The drive tracks head position, caches the sector under the head and
    owns whatever media is inserted.
*/

use crate::{
    device_types::{
        dcdd::{
            encode_sector_position,
            ControlByte,
            DriveStatus,
            StatusFlag,
            READ_NO_DISK,
            SECTOR_BUFFER_SIZE,
            SECTOR_NO_DISK,
            SECTOR_SIZE,
        },
        geometry::DiskGeometry,
    },
    devices::dcdd::media::DiskMedia,
};

pub struct DiskDrive<M> {
    drive_n: usize,
    geometry: DiskGeometry,
    track: u8,
    sector: u8,
    status: DriveStatus,
    write_count: usize,
    sector_buf: [u8; SECTOR_BUFFER_SIZE],
    sector_ptr: usize,
    disk_pointer: u64,
    dirty: bool,
    have_sector: bool,
    media: Option<M>,
}

impl<M: DiskMedia> DiskDrive<M> {
    pub fn new(drive_n: usize) -> Self {
        Self {
            drive_n,
            geometry: DiskGeometry::default(),
            track: 0,
            sector: 0,
            status: DriveStatus::default(),
            write_count: 0,
            sector_buf: [0; SECTOR_BUFFER_SIZE],
            sector_ptr: 0,
            disk_pointer: 0,
            dirty: false,
            have_sector: false,
            media: None,
        }
    }

    /// Insert media into the drive, releasing anything previously inserted.
    /// The head is positioned at track 0, sector 0.
    pub(crate) fn load(&mut self, shared: &mut M::Shared, media: M) {
        if let Some(mut old) = self.take_media(shared) {
            log::debug!("Drive {}: replacing {}", self.drive_n, old.describe());
            old.release(shared);
        }

        log::debug!("Drive {}: loaded {}", self.drive_n, media.describe());
        self.reset_position();
        self.status = DriveStatus::loaded();
        self.media = Some(media);
    }

    /// Remove the media from the drive, flushing any pending sector first.
    pub(crate) fn eject(&mut self, shared: &mut M::Shared) -> Option<M> {
        let mut media = self.take_media(shared)?;
        media.release(shared);
        log::debug!("Drive {}: ejected {}", self.drive_n, media.describe());
        Some(media)
    }

    fn take_media(&mut self, shared: &mut M::Shared) -> Option<M> {
        self.flush(shared);
        let media = self.media.take();
        self.reset_position();
        self.status = DriveStatus::default();
        media
    }

    fn reset_position(&mut self) {
        self.track = 0;
        self.sector = 0;
        self.write_count = 0;
        self.sector_ptr = 0;
        self.disk_pointer = 0;
        self.dirty = false;
        self.have_sector = false;
        self.sector_buf.fill(0);
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.media.is_some()
    }

    pub fn media(&self) -> Option<&M> {
        self.media.as_ref()
    }

    #[inline]
    pub fn status(&self) -> DriveStatus {
        self.status
    }

    #[inline]
    pub fn track(&self) -> u8 {
        self.track
    }

    /// The sector that will be reported by the next read of the sector position register.
    #[inline]
    pub fn sector(&self) -> u8 {
        self.sector
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Byte offset into the image of the current sector.
    #[inline]
    pub fn disk_pointer(&self) -> u64 {
        self.disk_pointer
    }

    /// Write the cached sector back to the media if it has been modified.
    pub fn flush(&mut self, shared: &mut M::Shared) {
        if !self.dirty {
            return;
        }

        if let Some(media) = &mut self.media {
            log::trace!(
                "Drive {}: flushing sector at offset {:06X}",
                self.drive_n,
                self.disk_pointer
            );
            if let Err(e) = media.write_sector(shared, self.disk_pointer, &self.sector_buf[..SECTOR_SIZE]) {
                log::error!(
                    "Drive {}: failed to write sector at offset {:06X}: {}",
                    self.drive_n,
                    self.disk_pointer,
                    e
                );
            }
        }

        self.dirty = false;
        self.have_sector = false;
        self.sector_ptr = 0;
    }

    fn seek_to_track(&mut self, shared: &mut M::Shared) {
        self.flush(shared);
        self.disk_pointer = self.geometry.track_offset(self.track);
        self.sector = 0;
        self.sector_ptr = 0;
        self.have_sector = false;
    }

    /// Execute a byte written to the drive function register.
    pub(crate) fn function(&mut self, shared: &mut M::Shared, control: ControlByte) {
        if !self.is_loaded() {
            return;
        }

        if control.step_in() {
            self.step_in(shared);
        }
        if control.step_out() {
            self.step_out(shared);
        }
        if control.head_load() {
            self.status.assert_flag(StatusFlag::HeadStatus);
            self.status.assert_flag(StatusFlag::ReadDataAvailable);
        }
        if control.head_unload() {
            self.status.negate_flag(StatusFlag::HeadStatus);
        }
        if control.interrupt_enable() || control.interrupt_disable() || control.head_current_switch() {
            log::trace!("Drive {}: ignoring control bits {:02X?}", self.drive_n, control.into_bytes());
        }
        if control.write_enable() {
            self.status.assert_flag(StatusFlag::WriteEnable);
            self.write_count = 0;
        }
    }

    fn step_in(&mut self, shared: &mut M::Shared) {
        if self.track < self.geometry.max_track() {
            self.track += 1;
        }
        if self.track != 0 {
            self.status.negate_flag(StatusFlag::TrackZero);
        }
        log::trace!("Drive {}: step in to track {}", self.drive_n, self.track);
        self.seek_to_track(shared);
    }

    fn step_out(&mut self, shared: &mut M::Shared) {
        self.track = self.track.saturating_sub(1);
        if self.track == 0 {
            self.status.assert_flag(StatusFlag::TrackZero);
        }
        log::trace!("Drive {}: step out to track {}", self.drive_n, self.track);
        self.seek_to_track(shared);
    }

    /// Advance to the next sector and return the sector position register.
    pub(crate) fn sector_position(&mut self, shared: &mut M::Shared) -> u8 {
        if !self.is_loaded() {
            return SECTOR_NO_DISK;
        }

        if self.sector >= self.geometry.s() {
            self.sector = 0;
        }

        self.flush(shared);
        self.disk_pointer = self.geometry.offset(self.track, self.sector);
        self.sector_ptr = 0;
        self.have_sector = false;

        let position = encode_sector_position(self.sector, self.sector_ptr == 0);
        self.sector += 1;
        position
    }

    /// Store a byte in the sector buffer. The sector is written to the media once a full
    /// sector has been received since write enable.
    pub(crate) fn write_byte(&mut self, shared: &mut M::Shared, data: u8) {
        if !self.is_loaded() {
            return;
        }

        if self.sector_ptr >= SECTOR_BUFFER_SIZE {
            self.sector_ptr = SECTOR_BUFFER_SIZE - 1;
        }
        self.sector_buf[self.sector_ptr] = data;
        self.sector_ptr += 1;
        self.dirty = true;
        self.have_sector = true;

        self.write_count += 1;
        if self.write_count == SECTOR_SIZE {
            self.flush(shared);
            self.write_count = 0;
            self.status.negate_flag(StatusFlag::WriteEnable);
        }
    }

    /// Return the next byte of the sector under the head.
    pub(crate) fn read_byte(&mut self, shared: &mut M::Shared) -> u8 {
        let Some(media) = &mut self.media
        else {
            return READ_NO_DISK;
        };

        if !self.have_sector {
            self.sector_ptr = 0;
            self.sector_buf.fill(0);
            match media.read_sector(shared, self.disk_pointer, &mut self.sector_buf[..SECTOR_SIZE]) {
                Ok(read) => {
                    if read < SECTOR_SIZE {
                        log::trace!(
                            "Drive {}: short read at offset {:06X} ({} bytes)",
                            self.drive_n,
                            self.disk_pointer,
                            read
                        );
                    }
                    self.have_sector = true;
                }
                Err(e) => {
                    log::error!(
                        "Drive {}: failed to read sector at offset {:06X}: {}",
                        self.drive_n,
                        self.disk_pointer,
                        e
                    );
                }
            }
        }

        let byte = self.sector_buf[self.sector_ptr];
        if self.sector_ptr < SECTOR_BUFFER_SIZE - 1 {
            self.sector_ptr += 1;
        }
        byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::dcdd::media::FileMedia;
    use crate::device_types::dcdd::{DISK_SIZE, MAX_TRACKS, TRACK_SIZE};
    use std::io::Cursor;

    type TestDrive = DiskDrive<FileMedia<Cursor<Vec<u8>>>>;

    fn loaded_drive() -> TestDrive {
        let image: Vec<u8> = (0..DISK_SIZE).map(|i| (i / TRACK_SIZE) as u8).collect();
        let mut drive = TestDrive::new(0);
        drive.load(&mut (), FileMedia::from_stream(Cursor::new(image)).unwrap());
        drive
    }

    #[test]
    fn empty_drive_returns_no_disk_values() {
        let mut drive = TestDrive::new(1);
        assert_eq!(drive.sector_position(&mut ()), SECTOR_NO_DISK);
        assert_eq!(drive.read_byte(&mut ()), READ_NO_DISK);
        drive.function(&mut (), ControlByte::from(0x04));
        assert_eq!(drive.status().bits(), 0xE7);
        drive.write_byte(&mut (), 0x55);
        assert!(!drive.is_dirty());
    }

    #[test]
    fn step_clamps_at_both_ends() {
        let mut drive = loaded_drive();
        drive.function(&mut (), ControlByte::from(0x02));
        assert_eq!(drive.track(), 0);
        assert!(drive.status().is_asserted(StatusFlag::TrackZero));

        for _ in 0..100 {
            drive.function(&mut (), ControlByte::from(0x01));
        }
        assert_eq!(drive.track(), (MAX_TRACKS - 1) as u8);
        assert!(!drive.status().is_asserted(StatusFlag::TrackZero));
        assert_eq!(drive.disk_pointer(), ((MAX_TRACKS - 1) * TRACK_SIZE) as u64);
    }

    #[test]
    fn seek_resets_sector() {
        let mut drive = loaded_drive();
        drive.sector_position(&mut ());
        drive.sector_position(&mut ());
        assert_eq!(drive.sector(), 2);
        drive.function(&mut (), ControlByte::from(0x01));
        assert_eq!(drive.sector(), 0);
    }

    #[test]
    fn read_fetches_track_data() {
        let mut drive = loaded_drive();
        for _ in 0..5 {
            drive.function(&mut (), ControlByte::from(0x01));
        }
        drive.sector_position(&mut ());
        assert!((0..SECTOR_SIZE).all(|_| drive.read_byte(&mut ()) == 5));
    }

    #[test]
    fn runaway_read_saturates() {
        let mut drive = loaded_drive();
        drive.sector_position(&mut ());
        for _ in 0..1000 {
            drive.read_byte(&mut ());
        }
        assert_eq!(drive.read_byte(&mut ()), 0);
    }

    #[test]
    fn write_enable_and_auto_flush() {
        let mut drive = loaded_drive();
        drive.function(&mut (), ControlByte::from(0x80));
        assert!(drive.status().is_asserted(StatusFlag::WriteEnable));

        drive.sector_position(&mut ());
        for _ in 0..SECTOR_SIZE - 1 {
            drive.write_byte(&mut (), 0xAA);
        }
        assert!(drive.is_dirty());
        assert!(drive.status().is_asserted(StatusFlag::WriteEnable));

        drive.write_byte(&mut (), 0xAA);
        assert!(!drive.is_dirty());
        assert!(!drive.status().is_asserted(StatusFlag::WriteEnable));

        let media = drive.eject(&mut ()).unwrap();
        let image = media.into_inner().into_inner();
        assert!(image[..SECTOR_SIZE].iter().all(|b| *b == 0xAA));
        assert_eq!(image[SECTOR_SIZE], 0);
    }

    #[test]
    fn runaway_write_is_clamped() {
        let mut drive = loaded_drive();
        drive.sector_position(&mut ());
        for i in 0..SECTOR_SIZE - 1 {
            drive.write_byte(&mut (), i as u8);
        }
        // Keep the auto flush from firing.
        drive.write_count = 0;
        for _ in 0..10 {
            drive.write_byte(&mut (), 0xEE);
        }
        assert_eq!(drive.sector_ptr, SECTOR_BUFFER_SIZE);
        assert_eq!(drive.sector_buf[SECTOR_BUFFER_SIZE - 1], 0xEE);
    }

    #[test]
    fn eject_restores_default_status() {
        let mut drive = loaded_drive();
        assert_eq!(drive.status().bits(), 0xA5);
        assert!(drive.eject(&mut ()).is_some());
        assert!(!drive.is_loaded());
        assert_eq!(drive.status().bits(), 0xE7);
        assert!(drive.eject(&mut ()).is_none());
    }
}
