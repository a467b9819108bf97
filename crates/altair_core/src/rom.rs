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

    rom.rs

    The 88-DCDD disk boot loader ROM.
*/

use anyhow::ensure;

/// Address the boot loader normally occupies.
pub const DISK_LOADER_ADDRESS: u16 = 0xFF00;

/// 8080 boot program. Selects drive 0, loads the head, waits for the head and the start
/// of a sector, reads 137 bytes to address 0 and jumps there.
#[rustfmt::skip]
pub const DISK_LOADER_ROM: [u8; 41] = [
    0x31, 0x00, 0x00,   // FF00  LXI SP,0000h
    0x3E, 0x00,         // FF03  MVI A,00h
    0xD3, 0x08,         // FF05  OUT 08h       ; select drive 0
    0x3E, 0x04,         // FF07  MVI A,04h
    0xD3, 0x09,         // FF09  OUT 09h       ; load head
    0xDB, 0x08,         // FF0B  IN 08h        ; drive status
    0xE6, 0x04,         // FF0D  ANI 04h
    0xC2, 0x0B, 0xFF,   // FF0F  JNZ FF0Bh     ; wait for head loaded
    0x06, 0x89,         // FF12  MVI B,89h     ; 137 bytes
    0x21, 0x00, 0x00,   // FF14  LXI H,0000h
    0xDB, 0x09,         // FF17  IN 09h        ; sector position
    0xE6, 0x01,         // FF19  ANI 01h
    0xC2, 0x17, 0xFF,   // FF1B  JNZ FF17h     ; wait for sector true
    0xDB, 0x0A,         // FF1E  IN 0Ah        ; read data
    0x77,               // FF20  MOV M,A
    0x23,               // FF21  INX H
    0x05,               // FF22  DCR B
    0xC2, 0x1E, 0xFF,   // FF23  JNZ FF1Eh
    0xC3, 0x00, 0x00,   // FF26  JMP 0000h
];

/// Copy the disk boot loader into `memory` at `address`.
pub fn load_disk_loader(memory: &mut [u8], address: u16) -> Result<(), anyhow::Error> {
    let start = address as usize;
    let end = start + DISK_LOADER_ROM.len();
    ensure!(
        end <= memory.len(),
        "Boot loader at {:04X} does not fit in {} bytes of memory",
        address,
        memory.len()
    );
    memory[start..end].copy_from_slice(&DISK_LOADER_ROM);
    log::debug!("Loaded disk boot loader at {:04X}", address);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OP_IN: u8 = 0xDB;
    const OP_JNZ: u8 = 0xC2;

    #[test]
    fn loader_fits_at_top_of_memory() {
        let mut memory = vec![0u8; 0x10000];
        load_disk_loader(&mut memory, DISK_LOADER_ADDRESS).unwrap();
        assert_eq!(&memory[0xFF00..0xFF29], &DISK_LOADER_ROM[..]);
        assert!(load_disk_loader(&mut memory, 0xFFF0).is_err());
    }

    #[test]
    fn wait_loops_reread_their_port() {
        let targets: Vec<usize> = DISK_LOADER_ROM
            .windows(3)
            .filter(|w| w[0] == OP_JNZ && w[2] == 0xFF)
            .map(|w| w[1] as usize)
            .collect();
        assert_eq!(targets.len(), 3);
        for target in targets {
            assert_eq!(DISK_LOADER_ROM[target], OP_IN, "JNZ target {:02X} is not an IN", target);
        }
    }
}
