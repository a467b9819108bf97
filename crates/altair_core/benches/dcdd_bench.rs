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

    ---------------------------------------------------------------------------

    benches::dcdd_bench.rs

    Benchmarks for the 88-DCDD disk controller.

*/

use std::io::Cursor;

use altair_core::{
    device_types::dcdd::{DISK_SIZE, SECTORS_PER_TRACK, SECTOR_SIZE},
    devices::dcdd::{CowDiskController, CowMedia, DiskController, FileMedia},
};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

pub fn dcdd_sector_bench(c: &mut Criterion) {
    c.bench_function("dcdd_bench_read_track_cow", |b| {
        let mut dcdd = CowDiskController::with_patch_pool(256);
        dcdd.load(0, CowMedia::new(vec![0xE5u8; DISK_SIZE])).unwrap();

        b.iter(|| {
            for _ in 0..SECTORS_PER_TRACK {
                dcdd.sector();
                for _ in 0..SECTOR_SIZE {
                    black_box(dcdd.read());
                }
            }
        });
    });

    c.bench_function("dcdd_bench_write_track_cow", |b| {
        let mut dcdd = CowDiskController::with_patch_pool(256);
        dcdd.load(0, CowMedia::new(vec![0xE5u8; DISK_SIZE])).unwrap();

        b.iter(|| {
            for _ in 0..SECTORS_PER_TRACK {
                dcdd.sector();
                dcdd.function(0x80);
                for i in 0..SECTOR_SIZE {
                    dcdd.write(black_box(i as u8));
                }
            }
        });
    });

    c.bench_function("dcdd_bench_read_track_file", |b| {
        let media = FileMedia::from_stream(Cursor::new(vec![0xE5u8; DISK_SIZE])).unwrap();
        let mut dcdd = DiskController::new(());
        dcdd.load(0, media).unwrap();

        b.iter(|| {
            for _ in 0..SECTORS_PER_TRACK {
                dcdd.sector();
                for _ in 0..SECTOR_SIZE {
                    black_box(dcdd.read());
                }
            }
        });
    });

    c.bench_function("dcdd_bench_seek_full_stroke", |b| {
        let mut dcdd = CowDiskController::with_patch_pool(256);
        dcdd.load(0, CowMedia::new(vec![0xE5u8; DISK_SIZE])).unwrap();

        b.iter(|| {
            for _ in 0..76 {
                dcdd.function(0x01);
            }
            for _ in 0..76 {
                dcdd.function(0x02);
            }
        });
    });
}

criterion_group!(benches, dcdd_sector_bench);
criterion_main!(benches);
