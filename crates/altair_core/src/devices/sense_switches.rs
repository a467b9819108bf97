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

    devices::sense_switches.rs

    The front panel sense switches, read by the CPU from port 0xFF.
*/

use crate::bus::IoDevice;

pub const SENSE_SWITCH_PORT: u16 = 0xFF;

/// The eight front panel sense switches. No switches are up unless configured.
#[derive(Copy, Clone, Debug, Default)]
pub struct SenseSwitches {
    value: u8,
}

impl SenseSwitches {
    pub fn new(value: u8) -> Self {
        Self { value }
    }

    pub fn set(&mut self, value: u8) {
        self.value = value;
    }

    pub fn get(&self) -> u8 {
        self.value
    }
}

impl IoDevice for SenseSwitches {
    fn read_u8(&mut self, _port: u16) -> u8 {
        self.value
    }

    fn write_u8(&mut self, _port: u16, data: u8) {
        log::trace!("Write to sense switch port ignored: {:02X}", data);
    }

    fn port_list(&self) -> Vec<(String, u16)> {
        vec![(String::from("Front Panel Sense Switches"), SENSE_SWITCH_PORT)]
    }
}
