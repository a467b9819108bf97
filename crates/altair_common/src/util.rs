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

    common::util.rs

    Common emulator library.
    Define utility methods.
*/

use web_time::Duration;

/// Format the provided Duration using the most appropriate unit given the magnitude of the Duration.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    let millis = secs * 1_000.0;
    let micros = millis * 1_000.0;
    let nanos = micros * 1_000.0;

    if nanos < 1_000.0 {
        format!("{:.0}ns", nanos)
    }
    else if micros < 1_000.0 {
        format!("{:.3}µs", micros)
    }
    else if millis < 1_000.0 {
        format!("{:.3}ms", millis)
    }
    else {
        format!("{:.3}s", secs)
    }
}

/// Format a byte count as a human-readable size, in the units used for disk images.
pub fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    }
    else {
        format!("{:.1}K ({} bytes)", bytes as f64 / 1024.0, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_picks_unit() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_micros(2)), "2.000µs");
        assert_eq!(format_duration(Duration::from_millis(5)), "5.000ms");
        assert_eq!(format_duration(Duration::from_secs(3)), "3.000s");
    }

    #[test]
    fn format_size_works() {
        assert_eq!(format_size(137), "137 bytes");
        assert_eq!(format_size(337_568), "329.7K (337568 bytes)");
    }
}
