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

    devices::dcdd::media.rs

    Backing stores for disk drives: a read-only image with copy-on-write
    patches, and a directly writable image file.

*/

use std::{
    borrow::Cow,
    fs,
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};

use crate::{
    device_types::{
        dcdd::{DISK_SIZE, SECTOR_SIZE, TRACK_SIZE},
        geometry::DiskGeometry,
    },
    devices::dcdd::{
        patch_pool::{PatchPool, PatchTable},
        DiskError,
    },
};

/// Fill byte for freshly created images. CP/M treats 0xE5 as an empty directory entry.
pub const BLANK_FILL_BYTE: u8 = 0xE5;

/// A backing store for one drive.
///
/// Some media need a resource that is shared between all drives of a controller, such as the
/// patch pool. The controller owns one `Shared` value and lends it to the media of the drive
/// being operated on.
pub trait DiskMedia {
    type Shared;

    /// Return the size of the underlying image in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one sector at `offset` into `buf`. Returns the number of bytes actually read; a
    /// short count means the image ended early.
    fn read_sector(&mut self, shared: &mut Self::Shared, offset: u64, buf: &mut [u8]) -> Result<usize, DiskError>;

    /// Write one sector at `offset`.
    fn write_sector(&mut self, shared: &mut Self::Shared, offset: u64, buf: &[u8]) -> Result<(), DiskError>;

    /// Called when the media is removed from a drive.
    fn release(&mut self, _shared: &mut Self::Shared) {}

    /// A short description of the media for logging.
    fn describe(&self) -> String;
}

/// A read-only disk image. Writes are captured as sector patches in the controller's
/// [PatchPool]; the image itself is never modified.
pub struct CowMedia {
    image: Cow<'static, [u8]>,
    patches: PatchTable,
    name: Option<String>,
}

impl CowMedia {
    pub fn new(image: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            image: image.into(),
            patches: PatchTable::default(),
            name: None,
        }
    }

    /// Read an image file into memory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DiskError> {
        let path = path.as_ref();
        let image = fs::read(path)?;
        if image.len() < DISK_SIZE {
            log::warn!(
                "{} is smaller than expected ({} bytes, expected {})",
                path.display(),
                image.len(),
                DISK_SIZE
            );
        }
        Ok(Self::new(image).with_name(path.display().to_string()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Return the table of patches applied to this image.
    pub fn patches(&self) -> &PatchTable {
        &self.patches
    }
}

impl DiskMedia for CowMedia {
    type Shared = PatchPool;

    fn len(&self) -> u64 {
        self.image.len() as u64
    }

    fn read_sector(&mut self, pool: &mut PatchPool, offset: u64, buf: &mut [u8]) -> Result<usize, DiskError> {
        let mut read = 0;
        if let Ok(start) = usize::try_from(offset) {
            if start < self.image.len() {
                let end = (start + buf.len()).min(self.image.len());
                read = end - start;
                buf[..read].copy_from_slice(&self.image[start..end]);
            }
        }

        let index = DiskGeometry::ALTAIR_8IN.sector_index(offset);
        if let Some(patch) = pool.patch(&self.patches, index) {
            let len = buf.len().min(SECTOR_SIZE);
            buf[..len].copy_from_slice(&patch[..len]);
            read = len;
        }
        Ok(read)
    }

    fn write_sector(&mut self, pool: &mut PatchPool, offset: u64, buf: &[u8]) -> Result<(), DiskError> {
        let index = DiskGeometry::ALTAIR_8IN.sector_index(offset);
        // A full pool drops the write. The pool reports the condition.
        pool.store(&mut self.patches, index, buf);
        Ok(())
    }

    fn release(&mut self, pool: &mut PatchPool) {
        let freed = pool.clear(&mut self.patches);
        if freed > 0 {
            log::debug!("Released {} sector patches", freed);
        }
    }

    fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{} (copy-on-write, {} bytes)", name, self.image.len()),
            None => format!("<memory> (copy-on-write, {} bytes)", self.image.len()),
        }
    }
}

/// A disk image that is read and written in place.
pub struct FileMedia<F = File> {
    stream: F,
    len: u64,
    path: Option<PathBuf>,
}

impl FileMedia<File> {
    /// Open an image file for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DiskError> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path).map_err(|e| {
            log::error!("Failed to open {}: {}", path.display(), e);
            e
        })?;

        let mut media = Self::from_stream(file)?;
        if media.len < DISK_SIZE as u64 {
            log::warn!(
                "{} is smaller than expected ({} bytes, expected {})",
                path.display(),
                media.len,
                DISK_SIZE
            );
        }
        media.path = Some(path.to_path_buf());
        Ok(media)
    }
}

impl<F: Read + Write + Seek> FileMedia<F> {
    /// Use any seekable stream as a disk image.
    pub fn from_stream(mut stream: F) -> Result<Self, DiskError> {
        let len = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;
        Ok(Self {
            stream,
            len,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn into_inner(self) -> F {
        self.stream
    }
}

impl<F: Read + Write + Seek> DiskMedia for FileMedia<F> {
    type Shared = ();

    fn len(&self) -> u64 {
        self.len
    }

    fn read_sector(&mut self, _shared: &mut (), offset: u64, buf: &mut [u8]) -> Result<usize, DiskError> {
        self.stream.seek(SeekFrom::Start(offset))?;

        let mut total = 0;
        while total < buf.len() {
            match self.stream.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }

    fn write_sector(&mut self, _shared: &mut (), offset: u64, buf: &[u8]) -> Result<(), DiskError> {
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.write_all(buf)?;
        self.stream.flush()?;
        self.len = self.len.max(offset + buf.len() as u64);
        Ok(())
    }

    fn release(&mut self, _shared: &mut ()) {
        if let Err(e) = self.stream.flush() {
            log::error!("Failed to flush disk image: {}", e);
        }
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("{} ({} bytes)", path.display(), self.len),
            None => format!("<stream> ({} bytes)", self.len),
        }
    }
}

/// Create a blank, full-size disk image. An existing file is never overwritten.
pub fn create_blank_image(path: impl AsRef<Path>) -> Result<PathBuf, anyhow::Error> {
    let path = path.as_ref();

    if fs::metadata(path).is_ok() {
        log::warn!("Requested disk image already exists: {}", path.display());
        bail!(DiskError::ImageExists(path.to_path_buf()));
    }

    let mut image_file = File::create(path).context("Failed to create the requested disk image")?;

    let track_buf = vec![BLANK_FILL_BYTE; TRACK_SIZE];
    for _ in 0..(DISK_SIZE / TRACK_SIZE) {
        image_file
            .write_all(&track_buf)
            .context("Error writing disk image to disk.")?;
    }
    image_file.flush()?;

    log::info!("Created blank disk image {} ({} bytes)", path.display(), DISK_SIZE);
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn patterned_image() -> Vec<u8> {
        (0..DISK_SIZE).map(|i| (i / SECTOR_SIZE) as u8).collect()
    }

    #[test]
    fn cow_read_returns_image_then_patch() {
        let mut pool = PatchPool::new(4);
        let mut media = CowMedia::new(patterned_image());
        let mut buf = [0u8; SECTOR_SIZE];

        let offset = (5 * SECTOR_SIZE) as u64;
        assert_eq!(media.read_sector(&mut pool, offset, &mut buf).unwrap(), SECTOR_SIZE);
        assert!(buf.iter().all(|b| *b == 5));

        media.write_sector(&mut pool, offset, &[0x42; SECTOR_SIZE]).unwrap();
        media.read_sector(&mut pool, offset, &mut buf).unwrap();
        assert!(buf.iter().all(|b| *b == 0x42));

        // The image itself is untouched.
        assert!(media.image()[5 * SECTOR_SIZE..6 * SECTOR_SIZE].iter().all(|b| *b == 5));
    }

    #[test]
    fn cow_short_image_reads_partial() {
        let mut pool = PatchPool::new(4);
        let mut media = CowMedia::new(vec![0x11u8; 200]);
        let mut buf = [0u8; SECTOR_SIZE];

        assert_eq!(media.read_sector(&mut pool, SECTOR_SIZE as u64, &mut buf).unwrap(), 63);
        assert_eq!(media.read_sector(&mut pool, 10 * SECTOR_SIZE as u64, &mut buf).unwrap(), 0);
    }

    #[test]
    fn cow_release_clears_patches() {
        let mut pool = PatchPool::new(4);
        let mut media = CowMedia::new(vec![0u8; DISK_SIZE]);
        media.write_sector(&mut pool, 0, &[1; SECTOR_SIZE]).unwrap();
        assert_eq!(pool.used(), 1);
        media.release(&mut pool);
        assert_eq!(pool.used(), 0);
        assert!(media.patches().is_empty());
    }

    #[test]
    fn file_media_reads_and_writes_in_place() {
        let mut media = FileMedia::from_stream(Cursor::new(patterned_image())).unwrap();
        assert_eq!(media.len(), DISK_SIZE as u64);

        let offset = (40 * SECTOR_SIZE) as u64;
        media.write_sector(&mut (), offset, &[0x99; SECTOR_SIZE]).unwrap();

        let mut buf = [0u8; SECTOR_SIZE];
        media.read_sector(&mut (), offset, &mut buf).unwrap();
        assert!(buf.iter().all(|b| *b == 0x99));

        let image = media.into_inner().into_inner();
        assert!(image[40 * SECTOR_SIZE..41 * SECTOR_SIZE].iter().all(|b| *b == 0x99));
        assert!(image[41 * SECTOR_SIZE..42 * SECTOR_SIZE].iter().all(|b| *b == 41));
    }

    #[test]
    fn file_media_short_read_at_end() {
        let mut media = FileMedia::from_stream(Cursor::new(vec![7u8; 150])).unwrap();
        let mut buf = [0u8; SECTOR_SIZE];
        assert_eq!(media.read_sector(&mut (), SECTOR_SIZE as u64, &mut buf).unwrap(), 13);
        assert_eq!(media.read_sector(&mut (), 1000, &mut buf).unwrap(), 0);
    }

    #[test]
    fn create_blank_image_refuses_overwrite() {
        let path = std::env::temp_dir().join(format!("altair_blank_{}.dsk", std::process::id()));
        let _ = fs::remove_file(&path);

        create_blank_image(&path).unwrap();
        let image = fs::read(&path).unwrap();
        assert_eq!(image.len(), DISK_SIZE);
        assert!(image.iter().all(|b| *b == BLANK_FILL_BYTE));

        assert!(create_blank_image(&path).is_err());

        let media = FileMedia::open(&path).unwrap();
        assert_eq!(media.len(), DISK_SIZE as u64);
        assert_eq!(media.path(), Some(path.as_path()));

        drop(media);
        fs::remove_file(&path).unwrap();
    }
}
