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
*/

//! Define a [DiskGeometry] that represents the track and sector layout of a
//! hard-sectored disk image.
//! Altair disks have a single head, so only tracks and sectors are modelled.

use crate::device_types::dcdd::{MAX_TRACKS, SECTORS_PER_TRACK, SECTOR_SIZE};
use std::fmt::Display;

/// A structure representing how sectors are laid out in a flat disk image.
///  - Track count (t)
///  - Sectors per track (s)
///  - Sector size in bytes (size)
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct DiskGeometry {
    pub(crate) t: u8,
    pub(crate) s: u8,
    pub(crate) size: usize,
}

impl Default for DiskGeometry {
    fn default() -> Self {
        Self::ALTAIR_8IN
    }
}

impl Display for DiskGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[t:{:2} s:{:2} size:{}]", self.t, self.s, self.size)
    }
}

impl DiskGeometry {
    /// The standard 8" Altair floppy: 77 tracks of 32 sectors of 137 bytes.
    pub const ALTAIR_8IN: DiskGeometry = DiskGeometry {
        t: MAX_TRACKS as u8,
        s: SECTORS_PER_TRACK as u8,
        size: SECTOR_SIZE,
    };

    /// Return the track count (t) field.
    #[inline]
    pub fn t(&self) -> u8 {
        self.t
    }
    /// Return the sectors per track (s) field.
    #[inline]
    pub fn s(&self) -> u8 {
        self.s
    }
    /// Return the last valid track number.
    #[inline]
    pub fn max_track(&self) -> u8 {
        self.t.saturating_sub(1)
    }
    /// Return the size of a track in bytes.
    #[inline]
    pub fn track_size(&self) -> usize {
        self.s as usize * self.size
    }
    /// Return the byte offset of the start of a track.
    #[inline]
    pub fn track_offset(&self, track: u8) -> u64 {
        (track as usize * self.track_size()) as u64
    }
    /// Return the byte offset of a sector.
    #[inline]
    pub fn offset(&self, track: u8, sector: u8) -> u64 {
        self.track_offset(track) + (sector as usize * self.size) as u64
    }
    /// Return the logical sector index (track * sectors per track + sector) of a byte offset.
    #[inline]
    pub fn sector_index(&self, offset: u64) -> u16 {
        (offset / self.size as u64) as u16
    }
    /// Return a boolean indicating whether the specified track and sector exist on this geometry.
    pub fn contains(&self, track: u8, sector: u8) -> bool {
        track < self.t && sector < self.s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_types::dcdd::{DISK_SIZE, TRACK_SIZE};

    #[test]
    fn altair_geometry_sizes() {
        let geom = DiskGeometry::ALTAIR_8IN;
        assert_eq!(geom.track_size(), TRACK_SIZE);
        assert_eq!(geom.track_offset(geom.t()) as usize, DISK_SIZE);
        assert_eq!(DISK_SIZE, 337_568);
        assert_eq!(geom.max_track(), 76);
    }

    #[test]
    fn offsets_and_indices_agree() {
        let geom = DiskGeometry::ALTAIR_8IN;
        assert_eq!(geom.offset(0, 0), 0);
        assert_eq!(geom.offset(3, 0), 3 * 4384);
        assert_eq!(geom.offset(3, 5), 3 * 4384 + 5 * 137);

        for (track, sector) in [(0u8, 0u8), (1, 31), (76, 31), (40, 7)] {
            let index = geom.sector_index(geom.offset(track, sector));
            assert_eq!(index as usize, track as usize * 32 + sector as usize);
        }
        assert_eq!(geom.sector_index(DISK_SIZE as u64 - 1), 2463);
    }

    #[test]
    fn contains_checks_bounds() {
        let geom = DiskGeometry::ALTAIR_8IN;
        assert!(geom.contains(76, 31));
        assert!(!geom.contains(77, 0));
        assert!(!geom.contains(0, 32));
    }
}
