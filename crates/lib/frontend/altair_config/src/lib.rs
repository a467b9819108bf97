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

//! The `altair_config` crate parses AltairPC's configuration file and overlays command line
//! arguments on top of it. Command line arguments always take priority over the configuration
//! file.
//!
//! Features:
//! - `use_bpaf`: Enable BPAF support for command line argument parsing.

mod bpaf_config;
pub mod mount;

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

pub use bpaf_config::CmdLineArgs;
#[cfg(feature = "use_bpaf")]
use bpaf_config::cli_args;

use altair_core::{
    device_types::{dcdd::MAX_DRIVES, geometry::DiskGeometry},
    devices::{
        dcdd::{patch_pool::PATCH_POOL_SIZE, DCDD_DATA_REGISTER, DCDD_IO_BASE},
        sense_switches::SENSE_SWITCH_PORT,
    },
};
use anyhow::{bail, ensure};
use cfg_if::cfg_if;
use mount::MountableDeviceType;
use serde_derive::Deserialize;
use strum_macros::{Display as StrumDisplay, EnumString};

/// The 8080 addresses 256 I/O ports.
pub const MAX_IO_PORT: u16 = 0xFF;

/// Images mounted in drives A through D when no drives are configured.
pub const DEFAULT_DRIVE_IMAGES: [&str; MAX_DRIVES] = [
    "Disks/cpm63k.dsk",
    "Disks/bdsc-v1.60.dsk",
    "Disks/escape-posix.dsk",
    "Disks/blank.dsk",
];

fn _default_basedir() -> PathBuf {
    PathBuf::from(".")
}
const fn _default_patch_pool_size() -> usize {
    PATCH_POOL_SIZE
}
const fn _default_io_base() -> u16 {
    DCDD_IO_BASE
}

/// How disk images are attached to drives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, EnumString, StrumDisplay)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DiskBackend {
    /// Images are read into memory and never modified. Writes are kept in a patch pool.
    #[default]
    Cow,
    /// Images are read and written in place.
    File,
}

/// A track and sector on a disk, written as `track:sector`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SectorAddress {
    pub track:  u8,
    pub sector: u8,
}

impl FromStr for SectorAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (t, s) = s.split_once(':').ok_or("Expected track:sector")?;
        let track: u8 = t.trim().parse().map_err(|_| format!("Invalid track: {t}"))?;
        let sector: u8 = s.trim().parse().map_err(|_| format!("Invalid sector: {s}"))?;

        if !DiskGeometry::ALTAIR_8IN.contains(track, sector) {
            return Err(format!("Sector {track}:{sector} is not on the disk"));
        }
        Ok(SectorAddress { track, sector })
    }
}

impl Display for SectorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.track, self.sector)
    }
}

#[derive(Debug, Deserialize)]
pub struct Emulator {
    #[serde(default = "_default_basedir")]
    pub basedir: PathBuf,
    #[serde(default)]
    pub boot: bool,
    #[serde(skip)]
    pub create_blank: Option<PathBuf>,
    #[serde(skip)]
    pub dump_sector: Option<SectorAddress>,
}

impl Default for Emulator {
    fn default() -> Self {
        Self {
            basedir: _default_basedir(),
            boot: false,
            create_blank: None,
            dump_sector: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DriveConfigEntry {
    pub drive: usize,
    pub filename: String,
    /// Create a blank image if the file doesn't exist.
    #[serde(default)]
    pub create: bool,
}

#[derive(Debug, Deserialize)]
pub struct Disk {
    #[serde(default)]
    pub backend: DiskBackend,
    #[serde(default = "_default_patch_pool_size")]
    pub patch_pool_size: usize,
    #[serde(default = "_default_io_base")]
    pub io_base: u16,
    #[serde(default)]
    pub sense_switches: u8,
    pub drive: Option<Vec<DriveConfigEntry>>,
}

impl Default for Disk {
    fn default() -> Self {
        Self {
            backend: DiskBackend::default(),
            patch_pool_size: _default_patch_pool_size(),
            io_base: _default_io_base(),
            sense_switches: 0,
            drive: None,
        }
    }
}

impl Disk {
    /// Return the drives to load, in drive order. Falls back to [DEFAULT_DRIVE_IMAGES] when no
    /// drives are configured.
    pub fn drives(&self) -> Vec<DriveConfigEntry> {
        let mut drives = match &self.drive {
            Some(drives) if !drives.is_empty() => drives.clone(),
            _ => DEFAULT_DRIVE_IMAGES
                .iter()
                .enumerate()
                .map(|(drive, filename)| DriveConfigEntry {
                    drive,
                    filename: filename.to_string(),
                    create: false,
                })
                .collect(),
        };
        drives.sort_by_key(|d| d.drive);
        drives
    }

    /// Check that the controller's registers fit in the port space and stay clear of the
    /// sense switches.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        ensure!(
            self.io_base <= MAX_IO_PORT - DCDD_DATA_REGISTER,
            "Disk controller io_base {:02X} must be at most {:02X}",
            self.io_base,
            MAX_IO_PORT - DCDD_DATA_REGISTER
        );
        if (self.io_base..=self.io_base + DCDD_DATA_REGISTER).contains(&SENSE_SWITCH_PORT) {
            bail!(
                "Disk controller io_base {:02X} overlaps the sense switches at port {:02X}",
                self.io_base,
                SENSE_SWITCH_PORT
            );
        }
        Ok(())
    }

    /// Insert or replace the entry for a drive.
    pub fn set_drive(&mut self, entry: DriveConfigEntry) {
        let drives = self.drive.get_or_insert_with(Vec::new);
        drives.retain(|d| d.drive != entry.drive);
        drives.push(entry);
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileParams {
    #[serde(default)]
    pub emulator: Emulator,
    #[serde(default)]
    pub disk: Disk,
}

impl ConfigFileParams {
    pub fn overlay(&mut self, shell_args: CmdLineArgs) {
        if let Some(basedir) = shell_args.base_dir {
            self.emulator.basedir = basedir;
        }
        if let Some(backend) = shell_args.backend {
            self.disk.backend = backend;
        }
        if let Some(patch_pool_size) = shell_args.patch_pool_size {
            self.disk.patch_pool_size = patch_pool_size;
        }

        self.emulator.boot |= shell_args.boot;
        self.emulator.create_blank = shell_args.create_blank;
        self.emulator.dump_sector = shell_args.dump_sector;

        for mount in shell_args.mounts {
            match mount.device {
                MountableDeviceType::Floppy => {
                    let create = mount.flag("create");
                    self.disk.set_drive(DriveConfigEntry {
                        drive: mount.index,
                        filename: mount.path.to_string_lossy().into_owned(),
                        create,
                    });
                }
            }
        }
    }

    /// Resolve a drive's image path against the base directory.
    pub fn resolve_drive_path(&self, entry: &DriveConfigEntry) -> PathBuf {
        altair_common::resolve_media_path(&self.emulator.basedir, &entry.filename)
    }
}

/// Parse a TOML configuration string and overlay the given command line arguments.
pub fn read_config(toml_string: impl AsRef<str>, shell_args: CmdLineArgs) -> Result<ConfigFileParams, anyhow::Error> {
    let mut toml_args: ConfigFileParams = toml::from_str(toml_string.as_ref())?;

    // Command line arguments override config file arguments
    toml_args.overlay(shell_args);
    toml_args.disk.validate()?;

    Ok(toml_args)
}

fn read_shell_args() -> CmdLineArgs {
    let shell_args: CmdLineArgs;

    cfg_if! {
        if #[cfg(feature = "use_bpaf")] {
            log::debug!("Reading command line arguments...");
            shell_args = cli_args().run();
        } else {
            log::debug!("Argument reading disabled...");
            shell_args = CmdLineArgs::default();
        }
    }

    shell_args
}

/// Read the TOML configuration from a file path, parse and overlay command line arguments.
///
/// A missing configuration file is not an error when `optional` is set; defaults are used
/// instead.
pub fn read_config_file<P>(default_path: P, optional: bool) -> Result<ConfigFileParams, anyhow::Error>
where
    P: AsRef<Path>,
{
    let shell_args = read_shell_args();

    // Allow configuration file path to be overridden by command line argument 'config_file'
    let toml_string = if let Some(configfile_path) = shell_args.config_file.as_ref() {
        std::fs::read_to_string(configfile_path)?
    }
    else {
        match std::fs::read_to_string(default_path.as_ref()) {
            Ok(s) => s,
            Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "No configuration file at {}, using defaults",
                    default_path.as_ref().display()
                );
                String::new()
            }
            Err(e) => return Err(e.into()),
        }
    };

    read_config(toml_string, shell_args)
}

/// Read the TOML configuration from a string, parse and overlay command line arguments.
pub fn read_config_string(toml_string: impl AsRef<str>) -> Result<ConfigFileParams, anyhow::Error> {
    let shell_args = read_shell_args();
    read_config(toml_string, shell_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::MountSpec;

    const SAMPLE: &str = r#"
        [emulator]
        basedir = "/opt/altair"

        [disk]
        backend = "file"
        patch_pool_size = 64

        [[disk.drive]]
        drive = 1
        filename = "Disks/bdsc-v1.60.dsk"

        [[disk.drive]]
        drive = 0
        filename = "Disks/cpm63k.dsk"
    "#;

    #[test]
    fn parse_full_config() {
        let config = read_config(SAMPLE, CmdLineArgs::default()).unwrap();
        assert_eq!(config.emulator.basedir, PathBuf::from("/opt/altair"));
        assert_eq!(config.disk.backend, DiskBackend::File);
        assert_eq!(config.disk.patch_pool_size, 64);
        assert_eq!(config.disk.io_base, 0x08);

        let drives = config.disk.drives();
        assert_eq!(drives.len(), 2);
        assert_eq!(drives[0].filename, "Disks/cpm63k.dsk");
        assert_eq!(drives[1].drive, 1);
        assert_eq!(
            config.resolve_drive_path(&drives[0]),
            PathBuf::from("/opt/altair/Disks/cpm63k.dsk")
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = read_config("", CmdLineArgs::default()).unwrap();
        assert_eq!(config.disk.backend, DiskBackend::Cow);
        assert_eq!(config.disk.patch_pool_size, PATCH_POOL_SIZE);
        assert!(!config.emulator.boot);

        let drives = config.disk.drives();
        assert_eq!(drives.len(), MAX_DRIVES);
        assert_eq!(drives[3].filename, "Disks/blank.dsk");
    }

    #[test]
    fn command_line_overrides_file() {
        let args = CmdLineArgs {
            backend: Some(DiskBackend::Cow),
            patch_pool_size: Some(8),
            boot: true,
            dump_sector: Some("2:5".parse().unwrap()),
            mounts: vec![
                "fd:1:other.dsk".parse::<MountSpec>().unwrap(),
                "fd:2:new.dsk?create".parse::<MountSpec>().unwrap(),
            ],
            ..Default::default()
        };
        let config = read_config(SAMPLE, args).unwrap();
        assert_eq!(config.disk.backend, DiskBackend::Cow);
        assert_eq!(config.disk.patch_pool_size, 8);
        assert!(config.emulator.boot);
        assert_eq!(config.emulator.dump_sector, Some(SectorAddress { track: 2, sector: 5 }));

        let drives = config.disk.drives();
        assert_eq!(drives.len(), 3);
        assert_eq!(drives[1].filename, "other.dsk");
        assert!(!drives[1].create);
        assert!(drives[2].create);
    }

    #[test]
    fn backend_names() {
        assert_eq!("COW".parse::<DiskBackend>().unwrap(), DiskBackend::Cow);
        assert_eq!("file".parse::<DiskBackend>().unwrap(), DiskBackend::File);
        assert!("flash".parse::<DiskBackend>().is_err());
        assert_eq!(DiskBackend::File.to_string(), "file");
    }

    #[test]
    fn sector_address_bounds() {
        assert_eq!(
            "76:31".parse::<SectorAddress>().unwrap(),
            SectorAddress { track: 76, sector: 31 }
        );
        assert!("77:0".parse::<SectorAddress>().is_err());
        assert!("0:32".parse::<SectorAddress>().is_err());
        assert!("12".parse::<SectorAddress>().is_err());
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(read_config("[disk]\nbackend = \"tape\"", CmdLineArgs::default()).is_err());
    }

    #[test]
    fn io_base_must_fit_port_space() {
        let toml = "[disk]\nio_base = 0xFFFF\n";
        assert!(read_config(toml, CmdLineArgs::default()).is_err());

        let toml = "[disk]\nio_base = 0xFE\n";
        assert!(read_config(toml, CmdLineArgs::default()).is_err());
    }

    #[test]
    fn io_base_must_not_shadow_sense_switches() {
        let err = read_config("[disk]\nio_base = 0xFD\n", CmdLineArgs::default()).unwrap_err();
        assert!(err.to_string().contains("sense switches"));

        let config = read_config("[disk]\nio_base = 0xFC\n", CmdLineArgs::default()).unwrap();
        assert_eq!(config.disk.io_base, 0xFC);
    }
}
