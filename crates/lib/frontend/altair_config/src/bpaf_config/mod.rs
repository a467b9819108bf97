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

    bpaf_config::mod.rs

    Command line arguments. These take priority over the configuration file.
*/

use std::path::PathBuf;

use crate::{mount::MountSpec, DiskBackend, SectorAddress};

#[cfg(feature = "use_bpaf")]
use bpaf::{Bpaf, Parser};

#[cfg(feature = "use_bpaf")]
fn mount_arg() -> impl Parser<Vec<MountSpec>> {
    bpaf::short('m')
        .long("mount")
        .help("Mount a disk image with syntax: fd:0:disk.dsk")
        .argument::<String>("mountspec")
        .parse(|s| s.parse::<MountSpec>())
        .many()
}

#[cfg_attr(feature = "use_bpaf", derive(Bpaf))]
#[cfg_attr(feature = "use_bpaf", bpaf(options, version, generate(cli_args)))]
#[derive(Debug, Default)]
pub struct CmdLineArgs {
    #[cfg_attr(feature = "use_bpaf", bpaf(long("config_file"), long("configfile")))]
    pub config_file: Option<PathBuf>,

    #[cfg_attr(feature = "use_bpaf", bpaf(long("base_dir"), long("basedir")))]
    pub base_dir: Option<PathBuf>,

    /// Disk backend: cow (read-only images with in-memory patches) or file (write through)
    #[cfg_attr(feature = "use_bpaf", bpaf(long))]
    pub backend: Option<DiskBackend>,

    #[cfg_attr(feature = "use_bpaf", bpaf(long("patch_pool_size")))]
    pub patch_pool_size: Option<usize>,

    /// Run the disk boot loader against drive 0
    #[cfg_attr(feature = "use_bpaf", bpaf(long, switch))]
    pub boot: bool,

    /// Create a blank disk image and exit
    #[cfg_attr(feature = "use_bpaf", bpaf(long("create_blank")))]
    pub create_blank: Option<PathBuf>,

    /// Dump a sector of drive 0, given as track:sector
    #[cfg_attr(feature = "use_bpaf", bpaf(long("dump_sector")))]
    pub dump_sector: Option<SectorAddress>,

    #[cfg_attr(feature = "use_bpaf", bpaf(external(mount_arg)))]
    pub mounts: Vec<MountSpec>,
}
