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

    boot.rs

    Drive the disk controller through the bus the way the boot loader ROM
    and a simple BIOS would, without a CPU.
*/

use altair_core::{
    bus::IoBus,
    device_types::dcdd::{
        ControlByte,
        MAX_TRACKS,
        SECTORS_PER_TRACK,
        SECTOR_SIZE,
        STATUS_HEAD,
        STATUS_TRACK_0,
    },
    devices::dcdd::{DiskMedia, DCDD_DATA_REGISTER, DCDD_FUNCTION_SECTOR_REGISTER, DCDD_SELECT_STATUS_REGISTER},
};

/// Number of times a status register is polled before giving up.
pub const POLL_LIMIT: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("No disk controller is installed on the bus")]
    NoController,
    #[error("Drive {0} never loaded its head. Is there a disk in the drive?")]
    HeadNotLoaded(u8),
    #[error("Timed out waiting for the start of sector {0}")]
    SectorTimeout(u8),
    #[error("Drive {0} never reached track 0")]
    NoTrackZero(u8),
    #[error("Memory of {0} bytes is too small for a sector")]
    MemoryTooSmall(usize),
    #[error("Disk controller base port {0:04X} leaves registers outside the port space")]
    PortOutOfRange(u16),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BootReport {
    /// Sector number reported when the transfer started.
    pub sector: u8,
    /// Number of bytes copied to memory.
    pub bytes: usize,
    /// Address execution would continue at.
    pub entry: u16,
}

struct Ports {
    status: u16,
    function: u16,
    data: u16,
}

fn controller_ports<M: DiskMedia>(bus: &IoBus<M>) -> Result<Ports, BootError> {
    let dcdd = bus.disk_controller().ok_or(BootError::NoController)?;
    let port = |register| dcdd.port(register).ok_or(BootError::PortOutOfRange(dcdd.io_base()));
    Ok(Ports {
        status: port(DCDD_SELECT_STATUS_REGISTER)?,
        function: port(DCDD_FUNCTION_SECTOR_REGISTER)?,
        data: port(DCDD_DATA_REGISTER)?,
    })
}

fn control(f: impl FnOnce(ControlByte) -> ControlByte) -> u8 {
    f(ControlByte::new()).into_bytes()[0]
}

/// Select a drive and load its head, waiting for head status.
fn select_and_load<M: DiskMedia>(bus: &mut IoBus<M>, ports: &Ports, drive: u8) -> Result<(), BootError> {
    bus.io_write_u8(ports.status, drive);
    bus.io_write_u8(ports.function, control(|c| c.with_head_load(true)));

    for _ in 0..POLL_LIMIT {
        if bus.io_read_u8(ports.status) & STATUS_HEAD == 0 {
            return Ok(());
        }
    }
    Err(BootError::HeadNotLoaded(drive))
}

/// Read one sector's worth of bytes from the data port.
fn read_data<M: DiskMedia>(bus: &mut IoBus<M>, ports: &Ports, buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        *byte = bus.io_read_u8(ports.data);
    }
}

/// Perform the disk boot loader's sequence: select drive 0, load the head, wait for the start of
/// a sector and copy it to address 0 of `memory`.
pub fn simulate_boot<M: DiskMedia>(bus: &mut IoBus<M>, memory: &mut [u8]) -> Result<BootReport, BootError> {
    if memory.len() < SECTOR_SIZE {
        return Err(BootError::MemoryTooSmall(memory.len()));
    }
    let ports = controller_ports(bus)?;
    select_and_load(bus, &ports, 0)?;

    let mut position = None;
    for _ in 0..POLL_LIMIT {
        let sector_reg = bus.io_read_u8(ports.function);
        if sector_reg & 0x01 == 0 {
            position = Some(sector_reg);
            break;
        }
    }
    let sector_reg = position.ok_or(BootError::SectorTimeout(0))?;

    read_data(bus, &ports, &mut memory[..SECTOR_SIZE]);

    let report = BootReport {
        sector: (sector_reg >> 1) & 0x1F,
        bytes: SECTOR_SIZE,
        entry: 0x0000,
    };
    log::debug!("Boot sector loaded: {:?}", report);
    Ok(report)
}

/// Seek drive 0 to `track` and wait for `sector` to come around, then read it.
pub fn read_sector_at<M: DiskMedia>(bus: &mut IoBus<M>, track: u8, sector: u8) -> Result<[u8; SECTOR_SIZE], BootError> {
    let ports = controller_ports(bus)?;
    select_and_load(bus, &ports, 0)?;

    let step_in = control(|c| c.with_step_in(true));
    let step_out = control(|c| c.with_step_out(true));

    let mut at_zero = false;
    for _ in 0..MAX_TRACKS {
        if bus.io_read_u8(ports.status) & STATUS_TRACK_0 == 0 {
            at_zero = true;
            break;
        }
        bus.io_write_u8(ports.function, step_out);
    }
    if !at_zero {
        return Err(BootError::NoTrackZero(0));
    }

    for _ in 0..track {
        bus.io_write_u8(ports.function, step_in);
    }

    // The sector position register reports the next sector each time it is read.
    let mut found = false;
    for _ in 0..SECTORS_PER_TRACK * 2 {
        let sector_reg = bus.io_read_u8(ports.function);
        if sector_reg & 0x01 == 0 && (sector_reg >> 1) & 0x1F == sector {
            found = true;
            break;
        }
    }
    if !found {
        return Err(BootError::SectorTimeout(sector));
    }

    let mut buf = [0u8; SECTOR_SIZE];
    read_data(bus, &ports, &mut buf);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use altair_core::{
        device_types::dcdd::{DISK_SIZE, TRACK_SIZE},
        devices::dcdd::{CowDiskController, CowMedia},
        rom::{load_disk_loader, DISK_LOADER_ADDRESS, DISK_LOADER_ROM},
    };

    fn boot_image() -> Vec<u8> {
        let mut image = vec![0u8; DISK_SIZE];
        for (i, byte) in image[..SECTOR_SIZE].iter_mut().enumerate() {
            *byte = i as u8 ^ 0x5A;
        }
        for (i, byte) in image.iter_mut().enumerate().skip(SECTOR_SIZE) {
            *byte = (i / SECTOR_SIZE) as u8;
        }
        image
    }

    fn bus_with(image: Option<Vec<u8>>) -> IoBus<CowMedia> {
        let mut dcdd = CowDiskController::with_patch_pool(16);
        if let Some(image) = image {
            dcdd.load(0, CowMedia::new(image)).unwrap();
        }
        let mut bus = IoBus::new();
        bus.install_disk_controller(dcdd);
        bus
    }

    #[test]
    fn boot_copies_first_sector_to_zero() {
        let image = boot_image();
        let mut bus = bus_with(Some(image.clone()));
        let mut memory = vec![0u8; 0x10000];
        load_disk_loader(&mut memory, DISK_LOADER_ADDRESS).unwrap();

        let report = simulate_boot(&mut bus, &mut memory).unwrap();
        assert_eq!(report.sector, 0);
        assert_eq!(report.bytes, SECTOR_SIZE);
        assert_eq!(&memory[..SECTOR_SIZE], &image[..SECTOR_SIZE]);
        assert_eq!(memory[SECTOR_SIZE], 0);
        assert_eq!(&memory[0xFF00..0xFF00 + DISK_LOADER_ROM.len()], &DISK_LOADER_ROM[..]);
    }

    #[test]
    fn boot_fails_on_empty_drive() {
        let mut bus = bus_with(None);
        let mut memory = vec![0u8; 0x10000];
        assert!(matches!(
            simulate_boot(&mut bus, &mut memory),
            Err(BootError::HeadNotLoaded(0))
        ));
    }

    #[test]
    fn boot_requires_controller() {
        let mut bus: IoBus<CowMedia> = IoBus::new();
        let mut memory = vec![0u8; 256];
        assert!(matches!(simulate_boot(&mut bus, &mut memory), Err(BootError::NoController)));
        assert!(matches!(
            simulate_boot(&mut bus, &mut memory[..16]),
            Err(BootError::MemoryTooSmall(16))
        ));
    }

    #[test]
    fn read_sector_at_finds_sector() {
        let mut bus = bus_with(Some(boot_image()));
        let data = read_sector_at(&mut bus, 3, 7).unwrap();
        let expected = ((3 * TRACK_SIZE + 7 * SECTOR_SIZE) / SECTOR_SIZE) as u8;
        assert!(data.iter().all(|b| *b == expected));

        // Seeking back out from a higher track works too.
        let data = read_sector_at(&mut bus, 1, 0).unwrap();
        assert!(data.iter().all(|b| *b == 32));
    }

    #[test]
    fn boot_rejects_controller_past_port_space() {
        let mut dcdd = CowDiskController::with_patch_pool(16).with_io_base(0xFFFE);
        dcdd.load(0, CowMedia::new(boot_image())).unwrap();
        let mut bus = IoBus::new();
        bus.install_disk_controller(dcdd);
        let mut memory = vec![0u8; 256];
        assert!(matches!(
            simulate_boot(&mut bus, &mut memory),
            Err(BootError::PortOutOfRange(0xFFFE))
        ));
    }
}
