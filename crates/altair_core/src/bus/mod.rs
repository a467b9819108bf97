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

    bus::mod.rs

    Implement the I/O side of the system bus. Devices register the ports
    they service and the bus routes IN and OUT instructions to them.

*/

use altair_common::AltairHashMap;

use crate::devices::{
    dcdd::{DiskController, DiskMedia},
    sense_switches::SenseSwitches,
};

pub const NO_IO_BYTE: u8 = 0xFF; // This is the byte read from an unconnected IO address.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IoDeviceType {
    DiskController,
    SenseSwitches,
}

pub trait IoDevice {
    /// Read a byte from the specified port. The default implementation returns NO_IO_BYTE (0xFF).
    fn read_u8(&mut self, _port: u16) -> u8 {
        NO_IO_BYTE
    }

    /// Write a byte to the specified port. The default implementation does nothing.
    fn write_u8(&mut self, _port: u16, _data: u8) {}

    /// Return a list of ports the device should service, comprised of a vector of tuples of
    /// (port description, port number).
    fn port_list(&self) -> Vec<(String, u16)>;
}

#[derive(Clone, Debug, Default)]
pub struct IoDeviceStats {
    pub last_read: u8,
    pub last_write: u8,
    pub reads: usize,
    pub writes: usize,
}

impl IoDeviceStats {
    pub fn one_read(byte: u8) -> Self {
        Self {
            last_read: byte,
            reads: 1,
            ..Default::default()
        }
    }

    pub fn one_write(byte: u8) -> Self {
        Self {
            last_write: byte,
            writes: 1,
            ..Default::default()
        }
    }
}

macro_rules! add_io_device {
    ($self:expr, $device:expr, $device_type:expr) => {{
        let port_list = $device.port_list();
        for (desc, port) in port_list.iter() {
            if let Some(existing) = $self.io_map.get(port) {
                log::warn!("{} at port {:02X} replaces {:?}", desc, port, existing);
            }
        }
        $self.io_desc_map.extend(port_list.iter().map(|p| (p.1, p.0.clone())));
        $self.io_map.extend(port_list.into_iter().map(|p| (p.1, $device_type)));
    }};
}

/// The I/O bus of a machine with a disk controller using media `M`.
pub struct IoBus<M: DiskMedia> {
    dcdd: Option<DiskController<M>>,
    sense_switches: Option<SenseSwitches>,
    io_map: AltairHashMap<u16, IoDeviceType>,
    io_desc_map: AltairHashMap<u16, String>,
    // The flag records whether the port was mapped to a device.
    io_stats: AltairHashMap<u16, (bool, IoDeviceStats)>,
}

impl<M: DiskMedia> Default for IoBus<M> {
    fn default() -> Self {
        Self {
            dcdd: None,
            sense_switches: None,
            io_map: AltairHashMap::default(),
            io_desc_map: AltairHashMap::default(),
            io_stats: AltairHashMap::default(),
        }
    }
}

impl<M: DiskMedia> IoBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install_disk_controller(&mut self, dcdd: DiskController<M>) {
        add_io_device!(self, dcdd, IoDeviceType::DiskController);
        log::debug!("Installed disk controller at base port {:02X}", dcdd.io_base());
        self.dcdd = Some(dcdd);
    }

    pub fn install_sense_switches(&mut self, switches: SenseSwitches) {
        add_io_device!(self, switches, IoDeviceType::SenseSwitches);
        self.sense_switches = Some(switches);
    }

    pub fn disk_controller(&self) -> Option<&DiskController<M>> {
        self.dcdd.as_ref()
    }

    pub fn disk_controller_mut(&mut self) -> Option<&mut DiskController<M>> {
        self.dcdd.as_mut()
    }

    pub fn sense_switches_mut(&mut self) -> Option<&mut SenseSwitches> {
        self.sense_switches.as_mut()
    }

    /// Remove the disk controller from the bus, unmapping its ports.
    pub fn remove_disk_controller(&mut self) -> Option<DiskController<M>> {
        self.io_map.retain(|_, device| *device != IoDeviceType::DiskController);
        let io_map = &self.io_map;
        self.io_desc_map.retain(|port, _| io_map.contains_key(port));
        self.dcdd.take()
    }

    /// Read an 8-bit value from an IO port. Unmapped ports read as NO_IO_BYTE.
    pub fn io_read_u8(&mut self, port: u16) -> u8 {
        let mut byte = None;
        if let Some(device_id) = self.io_map.get(&port) {
            match device_id {
                IoDeviceType::DiskController => {
                    if let Some(dcdd) = &mut self.dcdd {
                        byte = Some(dcdd.read_u8(port));
                    }
                }
                IoDeviceType::SenseSwitches => {
                    if let Some(switches) = &mut self.sense_switches {
                        byte = Some(switches.read_u8(port));
                    }
                }
            }
        }

        let byte_val = byte.unwrap_or(NO_IO_BYTE);

        self.io_stats
            .entry(port)
            .and_modify(|e| {
                e.1.last_read = byte_val;
                e.1.reads += 1;
            })
            .or_insert((byte.is_some(), IoDeviceStats::one_read(byte_val)));

        byte_val
    }

    /// Write an 8-bit value to an IO port. Writes to unmapped ports are ignored.
    pub fn io_write_u8(&mut self, port: u16, data: u8) {
        let mut resolved = false;
        if let Some(device_id) = self.io_map.get(&port) {
            match device_id {
                IoDeviceType::DiskController => {
                    if let Some(dcdd) = &mut self.dcdd {
                        dcdd.write_u8(port, data);
                        resolved = true;
                    }
                }
                IoDeviceType::SenseSwitches => {
                    if let Some(switches) = &mut self.sense_switches {
                        switches.write_u8(port, data);
                        resolved = true;
                    }
                }
            }
        }

        self.io_stats
            .entry(port)
            .and_modify(|e| {
                e.1.last_write = data;
                e.1.writes += 1;
            })
            .or_insert((resolved, IoDeviceStats::one_write(data)));
    }

    pub fn port_description(&self, port: u16) -> Option<&str> {
        self.io_desc_map.get(&port).map(|s| s.as_str())
    }

    pub fn io_stats(&self, port: u16) -> Option<&IoDeviceStats> {
        self.io_stats.get(&port).map(|(_, stats)| stats)
    }

    /// Return a sorted list of (port, description, stats) for every port that has seen traffic.
    pub fn dump_io_stats(&self) -> Vec<(u16, String, IoDeviceStats)> {
        let mut stats: Vec<_> = self
            .io_stats
            .iter()
            .map(|(port, (mapped, stats))| {
                let desc = match (mapped, self.io_desc_map.get(port)) {
                    (true, Some(desc)) => desc.clone(),
                    _ => String::from("Unmapped"),
                };
                (*port, desc, stats.clone())
            })
            .collect();
        stats.sort_by_key(|(port, _, _)| *port);
        stats
    }
}
