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

//! AltairPC headless front-end main library component.

#![forbid(unsafe_code)]

pub mod boot;

use std::path::Path;

use anyhow::Context;
use web_time::Instant;

use altair_common::util::{format_duration, format_size};
use altair_config::{ConfigFileParams, DiskBackend};
use altair_core::{
    bus::IoBus,
    device_types::dcdd::DISK_SIZE,
    devices::{
        dcdd::{media::create_blank_image, CowDiskController, CowMedia, DiskController, DiskError, DiskMedia, FileMedia},
        sense_switches::SenseSwitches,
    },
    rom::{load_disk_loader, DISK_LOADER_ADDRESS},
};

pub const MEMORY_SIZE: usize = 0x10000;

pub fn run() {
    env_logger::init();

    let config = match altair_config::read_config_file("./altairpc.toml", true) {
        Ok(config) => config,
        Err(e) => match e.downcast_ref::<std::io::Error>() {
            Some(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("Configuration file not found! Check the path given with --configfile.");
                std::process::exit(1);
            }
            Some(e) => {
                eprintln!("Unknown IO error reading configuration file:\n{}", e);
                std::process::exit(1);
            }
            None => {
                eprintln!(
                    "Failed to parse configuration file. There may be a typo or otherwise invalid toml:\n{}",
                    e
                );
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = run_config(&config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Run the headless frontend with an already resolved configuration.
pub fn run_config(config: &ConfigFileParams) -> Result<(), anyhow::Error> {
    if let Some(path) = &config.emulator.create_blank {
        let path = altair_common::resolve_media_path(&config.emulator.basedir, path);
        let path = create_blank_image(&path)?;
        println!("Created {} ({})", path.display(), format_size(DISK_SIZE));
        return Ok(());
    }

    log::debug!("Using {} disk backend", config.disk.backend);
    match config.disk.backend {
        DiskBackend::Cow => {
            let dcdd = CowDiskController::with_patch_pool(config.disk.patch_pool_size);
            let bus = run_machine(config, dcdd, |path| CowMedia::from_file(path))?;
            if let Some(dcdd) = bus.disk_controller() {
                let stats = dcdd.patch_stats();
                println!(
                    "Patch pool: {}/{} sectors used, {} writes dropped",
                    stats.used, stats.capacity, stats.dropped_writes
                );
            }
        }
        DiskBackend::File => {
            let dcdd: DiskController<FileMedia> = DiskController::new(());
            run_machine(config, dcdd, |path| FileMedia::open(path))?;
        }
    }
    Ok(())
}

/// Load the configured drives, install the controller on a bus and perform the requested
/// actions. Returns the bus so the caller can inspect the controller afterwards.
fn run_machine<M, F>(config: &ConfigFileParams, mut dcdd: DiskController<M>, open: F) -> Result<IoBus<M>, anyhow::Error>
where
    M: DiskMedia,
    F: Fn(&Path) -> Result<M, DiskError>,
{
    for entry in config.disk.drives() {
        let path = config.resolve_drive_path(&entry);

        if entry.create && !path.exists() {
            create_blank_image(&path).with_context(|| format!("Creating image for drive {}", entry.drive))?;
        }

        match open(&path) {
            Ok(media) => {
                dcdd.load(entry.drive, media)?;
            }
            Err(e) => {
                log::warn!("Drive {}: couldn't open {}: {}", entry.drive, path.display(), e);
            }
        }
    }

    for (n, drive) in dcdd.drives().enumerate() {
        match drive.media() {
            Some(media) => println!("Drive {}: {}", n, media.describe()),
            None => println!("Drive {}: <empty>", n),
        }
    }

    let mut bus = IoBus::new();
    bus.install_disk_controller(dcdd.with_io_base(config.disk.io_base));
    bus.install_sense_switches(SenseSwitches::new(config.disk.sense_switches));

    if config.emulator.boot {
        let mut memory = vec![0u8; MEMORY_SIZE];
        load_disk_loader(&mut memory, DISK_LOADER_ADDRESS)?;

        let boot_start = Instant::now();
        let report = boot::simulate_boot(&mut bus, &mut memory).context("Boot failed")?;
        println!(
            "Booted: {} bytes from sector {} in {}, jumping to {:04X}",
            report.bytes,
            report.sector,
            format_duration(boot_start.elapsed()),
            report.entry
        );
        print!("{}", hex_dump(&memory[..report.bytes], 0));
    }

    if let Some(address) = config.emulator.dump_sector {
        let data = boot::read_sector_at(&mut bus, address.track, address.sector)
            .with_context(|| format!("Reading sector {}", address))?;
        println!("Track {} sector {}:", address.track, address.sector);
        print!("{}", hex_dump(&data, 0));
    }

    if let Some(dcdd) = bus.disk_controller_mut() {
        dcdd.flush_all();
        if let Some(drive) = dcdd.drive(dcdd.selected()) {
            log::debug!(
                "Drive {} at track {}, status {}",
                dcdd.selected(),
                drive.track(),
                drive.status()
            );
        }
    }

    for (port, desc, stats) in bus.dump_io_stats() {
        log::debug!(
            "Port {:02X} {:<40} reads: {:5} writes: {:5}",
            port,
            desc,
            stats.reads,
            stats.writes
        );
    }

    Ok(bus)
}

/// Format `data` as rows of 16 hex bytes followed by printable ASCII.
pub fn hex_dump(data: &[u8], base: usize) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:04X}: {:<47}  {}\n", base + row * 16, hex.join(" "), ascii));
    }
    out
}
