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

    mount.rs

    Parse media mount specifications given on the command line.
*/

use altair_common::AltairHashMap;
use std::{path::PathBuf, str::FromStr};

#[derive(Debug, PartialEq)]
pub enum MountableDeviceType {
    Floppy,
}

/// A request to insert media into a drive, written as `fd:<drive>:<path>[?key=value&...]`.
///
/// Recognized options:
///  - `create`: create a blank image at `path` if it doesn't exist.
#[derive(Debug, PartialEq)]
pub struct MountSpec {
    pub device:  MountableDeviceType,
    pub index:   usize,
    pub path:    PathBuf,
    pub options: AltairHashMap<String, String>,
}

impl MountSpec {
    /// Return true if the option `key` is present and not set to a false value.
    pub fn flag(&self, key: &str) -> bool {
        self.options
            .get(key)
            .is_some_and(|v| !matches!(v.as_str(), "false" | "0" | "no"))
    }
}

impl FromStr for MountSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (main, opt_str) = match s.split_once('?') {
            Some((left, right)) => (left, Some(right)),
            None => (s, None),
        };

        let mut parts = main.splitn(3, ':');

        let device_str = parts.next().ok_or("Missing device type")?;
        let index_str = parts.next().ok_or("Missing drive number")?;
        let path_str = parts.next().ok_or("Missing file path")?;

        let device = match device_str {
            "fd" => MountableDeviceType::Floppy,
            other => return Err(format!("Unknown device type: {other}")),
        };

        let index: usize = index_str
            .parse()
            .map_err(|_| format!("Invalid drive number: {index_str}"))?;

        if path_str.is_empty() {
            return Err("Missing file path".to_string());
        }
        let path = PathBuf::from(path_str);
        let mut options = AltairHashMap::default();

        if let Some(opts) = opt_str {
            for entry in opts.split('&').filter(|e| !e.is_empty()) {
                let (k, v) = entry.split_once('=').unwrap_or((entry, "true"));
                options.insert(k.to_string(), v.to_string());
            }
        }

        Ok(MountSpec {
            device,
            index,
            path,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_mount() {
        let spec: MountSpec = "fd:1:Disks/bdsc-v1.60.dsk".parse().unwrap();
        assert_eq!(spec.device, MountableDeviceType::Floppy);
        assert_eq!(spec.index, 1);
        assert_eq!(spec.path, PathBuf::from("Disks/bdsc-v1.60.dsk"));
        assert!(spec.options.is_empty());
    }

    #[test]
    fn parse_options() {
        let spec: MountSpec = "fd:3:scratch.dsk?create&label=work".parse().unwrap();
        assert!(spec.flag("create"));
        assert_eq!(spec.options.get("label").map(String::as_str), Some("work"));

        let spec: MountSpec = "fd:3:scratch.dsk?create=no".parse().unwrap();
        assert!(!spec.flag("create"));
    }

    #[test]
    fn windows_paths_keep_their_colon() {
        let spec: MountSpec = r"fd:0:C:\disks\cpm63k.dsk".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from(r"C:\disks\cpm63k.dsk"));
    }

    #[test]
    fn reject_bad_specs() {
        assert!("hd:0:disk.img".parse::<MountSpec>().is_err());
        assert!("fd:x:disk.img".parse::<MountSpec>().is_err());
        assert!("fd:0".parse::<MountSpec>().is_err());
        assert!("fd:0:".parse::<MountSpec>().is_err());
    }
}
